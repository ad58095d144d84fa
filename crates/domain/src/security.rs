use std::str::FromStr;

use catalogue_core::AppError;
use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role category is created.
    RoleCategoryCreated,
    /// Emitted when a role is created.
    RoleCreated,
    /// Emitted when a user's role in a category is granted, changed or revoked.
    RoleChanged,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleCategoryCreated => "security.role_category.created",
            Self::RoleCreated => "security.role.created",
            Self::RoleChanged => "security.role.changed",
        }
    }
}

impl FromStr for AuditAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "security.role_category.created" => Ok(Self::RoleCategoryCreated),
            "security.role.created" => Ok(Self::RoleCreated),
            "security.role.changed" => Ok(Self::RoleChanged),
            _ => Err(AppError::Validation(format!(
                "unknown audit action value '{value}'"
            ))),
        }
    }
}
