use std::sync::Arc;

use catalogue_core::{AppError, AppResult, UserId, UserIdentity};
use catalogue_domain::{
    MachineName, RoleCatalog, RoleCategory, RoleChangeRecord, RoleChangeRejection,
    RoleChangeRequest, RoleSelection,
};

use crate::{
    AuditRepository, CatalogueUser, CategoryTreeCache, RoleMembershipRepository, UserRepository,
};

mod form;
mod transaction;

/// Result of one role change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChangeOutcome {
    /// The change was persisted. A failed audit append is logged, not returned.
    Committed(RoleChangeRecord),
    /// A domain rule refused the change and nothing was written.
    Rejected(RoleChangeRejection),
}

/// Category that a role form submission acted on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedRoleChange {
    /// Category machine name.
    pub category: MachineName,
    /// Result of the change in that category.
    pub outcome: RoleChangeOutcome,
}

/// Result of a role form submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFormOutcome {
    /// The single change that was executed, if any selection differed.
    pub applied: Option<AppliedRoleChange>,
    /// Further changed categories that were ignored.
    pub skipped_categories: Vec<MachineName>,
}

/// Application service that grants and cancels roles.
#[derive(Clone)]
pub struct RoleAssignmentService {
    tree_cache: Arc<CategoryTreeCache>,
    user_repository: Arc<dyn UserRepository>,
    membership_repository: Arc<dyn RoleMembershipRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RoleAssignmentService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        tree_cache: Arc<CategoryTreeCache>,
        user_repository: Arc<dyn UserRepository>,
        membership_repository: Arc<dyn RoleMembershipRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            tree_cache,
            user_repository,
            membership_repository,
            audit_repository,
        }
    }

    /// Sets the role a subject holds in one category.
    ///
    /// `role` is a role machine name of that category or `none`. Rule
    /// violations come back as [`RoleChangeOutcome::Rejected`]; errors are
    /// reserved for unknown names and storage failures.
    pub async fn change_role(
        &self,
        actor: &UserIdentity,
        subject_id: UserId,
        category_machine_name: &str,
        role: &str,
    ) -> AppResult<RoleChangeOutcome> {
        let selection = RoleSelection::parse(role)?;
        let catalog = self.tree_cache.catalog().await?;
        let request = resolve_request(&catalog, category_machine_name, selection)?;
        require_user(self.user_repository.as_ref(), subject_id).await?;

        self.execute_role_change(actor, subject_id, &catalog, request)
            .await
    }
}

pub(crate) async fn require_user(
    user_repository: &dyn UserRepository,
    user_id: UserId,
) -> AppResult<CatalogueUser> {
    user_repository
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{user_id}' does not exist")))
}

pub(crate) fn require_category<'a>(
    catalog: &'a RoleCatalog,
    machine_name: &str,
) -> AppResult<&'a RoleCategory> {
    catalog.category_by_name(machine_name).ok_or_else(|| {
        AppError::NotFound(format!("role category '{machine_name}' does not exist"))
    })
}

fn resolve_request(
    catalog: &RoleCatalog,
    category_machine_name: &str,
    selection: RoleSelection,
) -> AppResult<RoleChangeRequest> {
    let category = require_category(catalog, category_machine_name).inspect_err(|_| {
        tracing::warn!(
            category = category_machine_name,
            "role change names an unknown category"
        );
    })?;
    if let RoleSelection::Role(machine_name) = &selection {
        if catalog
            .role_by_name(category.id(), machine_name.as_str())
            .is_none()
        {
            tracing::warn!(
                category = category_machine_name,
                role = machine_name.as_str(),
                "role change names an unknown role"
            );
            return Err(AppError::NotFound(format!(
                "role '{machine_name}' does not exist in category '{category_machine_name}'"
            )));
        }
    }

    Ok(RoleChangeRequest {
        category_id: category.id(),
        selection,
    })
}
