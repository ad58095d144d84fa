use std::collections::{HashMap, HashSet};

use catalogue_core::{AppError, AppResult};

use crate::role::{Role, RoleCategory, RoleCategoryId, RoleId};
use crate::tree::CategoryTree;

/// Validated lookup table over every category and role.
///
/// Roles of each category are kept senior first. Building the catalog is the
/// single place where seed-data defects are detected.
#[derive(Debug, Clone)]
pub struct RoleCatalog {
    tree: CategoryTree,
    categories: HashMap<RoleCategoryId, RoleCategory>,
    category_ids_by_name: HashMap<String, RoleCategoryId>,
    roles: HashMap<RoleId, Role>,
    roles_by_category: HashMap<RoleCategoryId, Vec<RoleId>>,
    superuser_role: Role,
}

impl RoleCatalog {
    /// Builds the catalog from category and role rows.
    pub fn build(categories: Vec<RoleCategory>, roles: Vec<Role>) -> AppResult<Self> {
        let tree = CategoryTree::build(categories)?;

        let categories: HashMap<RoleCategoryId, RoleCategory> = tree
            .categories()
            .map(|category| (category.id(), category.clone()))
            .collect();
        let category_ids_by_name = categories
            .values()
            .map(|category| (category.machine_name().as_str().to_owned(), category.id()))
            .collect();

        let mut roles_by_category: HashMap<RoleCategoryId, Vec<RoleId>> = HashMap::new();
        let mut seen_names = HashSet::new();
        let mut seen_weights = HashSet::new();
        let mut role_map = HashMap::with_capacity(roles.len());

        for role in roles {
            let category = categories.get(&role.category_id()).ok_or_else(|| {
                AppError::Internal(format!(
                    "role '{}' references unknown category '{}'",
                    role.machine_name(),
                    role.category_id()
                ))
            })?;

            if !seen_names.insert((role.category_id(), role.machine_name().clone())) {
                return Err(AppError::Internal(format!(
                    "role '{}' appears more than once in category '{}'",
                    role.machine_name(),
                    category.machine_name()
                )));
            }

            if !seen_weights.insert((role.category_id(), role.rank().weight())) {
                return Err(AppError::Internal(format!(
                    "rank weight {} is shared by several roles in category '{}'",
                    role.rank().weight(),
                    category.machine_name()
                )));
            }

            roles_by_category
                .entry(role.category_id())
                .or_default()
                .push(role.id());
            if role_map.insert(role.id(), role).is_some() {
                return Err(AppError::Internal(
                    "role id appears more than once".to_owned(),
                ));
            }
        }

        for role_ids in roles_by_category.values_mut() {
            role_ids.sort_by_key(|role_id| {
                role_map
                    .get(role_id)
                    .map(|role| role.rank().weight())
                    .unwrap_or(i32::MAX)
            });
        }

        let root_id = tree.root_category().id();
        let superuser_role = roles_by_category
            .get(&root_id)
            .and_then(|role_ids| role_ids.first())
            .and_then(|role_id| role_map.get(role_id))
            .cloned()
            .ok_or_else(|| {
                AppError::Internal(
                    "root category has no roles, so no superuser role exists".to_owned(),
                )
            })?;

        Ok(Self {
            tree,
            categories,
            category_ids_by_name,
            roles: role_map,
            roles_by_category,
            superuser_role,
        })
    }

    /// Returns the category hierarchy.
    #[must_use]
    pub fn tree(&self) -> &CategoryTree {
        &self.tree
    }

    /// Returns the root category.
    #[must_use]
    pub fn root_category(&self) -> &RoleCategory {
        self.tree.root_category()
    }

    /// Looks a category up by identifier.
    #[must_use]
    pub fn category(&self, category_id: RoleCategoryId) -> Option<&RoleCategory> {
        self.categories.get(&category_id)
    }

    /// Looks a category up by machine name.
    #[must_use]
    pub fn category_by_name(&self, machine_name: &str) -> Option<&RoleCategory> {
        self.category_ids_by_name
            .get(machine_name)
            .and_then(|category_id| self.categories.get(category_id))
    }

    /// Looks a role up by identifier.
    #[must_use]
    pub fn role(&self, role_id: RoleId) -> Option<&Role> {
        self.roles.get(&role_id)
    }

    /// Returns the roles of a category, most senior first.
    #[must_use]
    pub fn roles_in(&self, category_id: RoleCategoryId) -> Vec<&Role> {
        self.roles_by_category
            .get(&category_id)
            .map(|role_ids| {
                role_ids
                    .iter()
                    .filter_map(|role_id| self.roles.get(role_id))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Looks a role up by its machine name inside a category.
    #[must_use]
    pub fn role_by_name(&self, category_id: RoleCategoryId, machine_name: &str) -> Option<&Role> {
        self.roles_in(category_id)
            .into_iter()
            .find(|role| role.machine_name().as_str() == machine_name)
    }

    /// Returns the least senior role of a category.
    #[must_use]
    pub fn lowest_role(&self, category_id: RoleCategoryId) -> Option<&Role> {
        self.roles_in(category_id).into_iter().last()
    }

    /// Returns the most senior role of the root category.
    #[must_use]
    pub fn superuser_role(&self) -> &Role {
        &self.superuser_role
    }

    /// Returns whether the role is the superuser role.
    #[must_use]
    pub fn is_superuser_role(&self, role_id: RoleId) -> bool {
        self.superuser_role.id() == role_id
    }
}
