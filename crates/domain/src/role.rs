use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use catalogue_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved selection value meaning "no role in this category".
pub const NO_ROLE_SELECTION: &str = "none";

const MACHINE_NAME_MAX_LENGTH: usize = 64;

/// Unique identifier for a role category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleCategoryId(Uuid);

impl RoleCategoryId {
    /// Creates a random category identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a category identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleCategoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleCategoryId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Unique identifier for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RoleId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated machine name for categories and roles.
///
/// Lowercase ASCII letters, digits and underscores, starting with a letter.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MachineName(String);

impl MachineName {
    /// Creates a validated machine name.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        let trimmed = value.trim();

        if trimmed.is_empty() || trimmed.len() > MACHINE_NAME_MAX_LENGTH {
            return Err(AppError::Validation(format!(
                "machine name must be between 1 and {MACHINE_NAME_MAX_LENGTH} characters"
            )));
        }

        let mut characters = trimmed.chars();
        let starts_with_letter = characters
            .next()
            .is_some_and(|character| character.is_ascii_lowercase());
        let rest_is_valid = characters.all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '_'
        });

        if !starts_with_letter || !rest_is_valid {
            return Err(AppError::Validation(format!(
                "machine name '{trimmed}' must match [a-z][a-z0-9_]*"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the machine name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Display for MachineName {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.0.as_str())
    }
}

/// Authority rank of a role inside its category.
///
/// The stored weight is inverted: a smaller weight carries more authority.
/// Two roles of one category never share a weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleRank(i32);

impl RoleRank {
    /// Creates a rank from its stored weight.
    #[must_use]
    pub fn from_weight(weight: i32) -> Self {
        Self(weight)
    }

    /// Returns the stored weight.
    #[must_use]
    pub fn weight(&self) -> i32 {
        self.0
    }

    /// Returns whether this rank carries strictly more authority than `other`.
    #[must_use]
    pub fn is_senior_to(&self, other: RoleRank) -> bool {
        self.0 < other.0
    }

    /// Returns whether this rank carries at least the authority of `other`.
    #[must_use]
    pub fn is_at_least(&self, other: RoleRank) -> bool {
        self.0 <= other.0
    }

    /// Orders two ranks by authority; `Greater` means `self` is more senior.
    #[must_use]
    pub fn authority_cmp(&self, other: RoleRank) -> Ordering {
        other.0.cmp(&self.0)
    }
}

/// Named partition of authority; one node of the category tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleCategory {
    id: RoleCategoryId,
    machine_name: MachineName,
    parent_id: Option<RoleCategoryId>,
    sibling_weight: i32,
}

impl RoleCategory {
    /// Creates a role category.
    #[must_use]
    pub fn new(
        id: RoleCategoryId,
        machine_name: MachineName,
        parent_id: Option<RoleCategoryId>,
        sibling_weight: i32,
    ) -> Self {
        Self {
            id,
            machine_name,
            parent_id,
            sibling_weight,
        }
    }

    /// Returns the category identifier.
    #[must_use]
    pub fn id(&self) -> RoleCategoryId {
        self.id
    }

    /// Returns the unique machine name.
    #[must_use]
    pub fn machine_name(&self) -> &MachineName {
        &self.machine_name
    }

    /// Returns the parent category, `None` for the root.
    #[must_use]
    pub fn parent_id(&self) -> Option<RoleCategoryId> {
        self.parent_id
    }

    /// Returns the ordering weight among siblings.
    #[must_use]
    pub fn sibling_weight(&self) -> i32 {
        self.sibling_weight
    }

    /// Returns whether this category is the tree root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Role owned by exactly one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    category_id: RoleCategoryId,
    machine_name: MachineName,
    alias: Option<String>,
    rank: RoleRank,
}

impl Role {
    /// Creates a role, rejecting the reserved `none` name.
    pub fn new(
        id: RoleId,
        category_id: RoleCategoryId,
        machine_name: MachineName,
        alias: Option<String>,
        rank: RoleRank,
    ) -> AppResult<Self> {
        if machine_name.as_str() == NO_ROLE_SELECTION {
            return Err(AppError::Validation(format!(
                "role machine name '{NO_ROLE_SELECTION}' is reserved"
            )));
        }

        let alias = alias
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        Ok(Self {
            id,
            category_id,
            machine_name,
            alias,
            rank,
        })
    }

    /// Returns the role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the owning category.
    #[must_use]
    pub fn category_id(&self) -> RoleCategoryId {
        self.category_id
    }

    /// Returns the machine name, unique within the category.
    #[must_use]
    pub fn machine_name(&self) -> &MachineName {
        &self.machine_name
    }

    /// Returns the optional human alias.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Returns the alias when present, the machine name otherwise.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.alias().unwrap_or(self.machine_name.as_str())
    }

    /// Returns the authority rank.
    #[must_use]
    pub fn rank(&self) -> RoleRank {
        self.rank
    }
}

/// Requested role state for one category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleSelection {
    /// No role in the category.
    None,
    /// The role with this machine name.
    Role(MachineName),
}

impl RoleSelection {
    /// Parses a transport value; the literal `none` selects no role.
    pub fn parse(value: &str) -> AppResult<Self> {
        if value.trim() == NO_ROLE_SELECTION {
            return Ok(Self::None);
        }

        MachineName::new(value).map(Self::Role)
    }

    /// Returns the transport representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::None => NO_ROLE_SELECTION,
            Self::Role(name) => name.as_str(),
        }
    }
}
