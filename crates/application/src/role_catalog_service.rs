use std::sync::Arc;

use catalogue_core::{AppError, AppResult, UserIdentity};
use catalogue_domain::{
    AuditAction, MachineName, RankEngine, Role, RoleCatalog, RoleCategory, RoleCategoryId,
    RoleHoldings, RoleId, RoleRank,
};
use serde_json::json;

use crate::role_assignment_service::require_category;
use crate::{
    AuditEvent, AuditRepository, CategoryTreeCache, CreateRoleCategoryInput, CreateRoleInput,
    RoleCatalogRepository, RoleMembershipRepository,
};

/// Administrative service for the category tree and role definitions.
#[derive(Clone)]
pub struct RoleCatalogService {
    tree_cache: Arc<CategoryTreeCache>,
    repository: Arc<dyn RoleCatalogRepository>,
    membership_repository: Arc<dyn RoleMembershipRepository>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl RoleCatalogService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        tree_cache: Arc<CategoryTreeCache>,
        repository: Arc<dyn RoleCatalogRepository>,
        membership_repository: Arc<dyn RoleMembershipRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            tree_cache,
            repository,
            membership_repository,
            audit_repository,
        }
    }

    /// Returns the full catalog to users holding any root category role.
    pub async fn catalog(&self, actor: &UserIdentity) -> AppResult<Arc<RoleCatalog>> {
        let catalog = self.tree_cache.catalog().await?;
        let holdings = self.holdings(actor).await?;
        if !RankEngine::new(&catalog)
            .is_qualified_as_category(&holdings, catalog.root_category().id())
        {
            return Err(AppError::Forbidden(
                "a role in the root category is required to read the role catalog".to_owned(),
            ));
        }

        Ok(catalog)
    }

    /// Creates a category below an existing one and emits an audit event.
    pub async fn create_role_category(
        &self,
        actor: &UserIdentity,
        input: CreateRoleCategoryInput,
    ) -> AppResult<RoleCategory> {
        let catalog = self.require_superuser(actor).await?;
        let machine_name = MachineName::new(input.machine_name)?;
        let parent = require_category(&catalog, &input.parent_machine_name)?;

        if catalog.category_by_name(machine_name.as_str()).is_some() {
            return Err(AppError::Conflict(format!(
                "role category '{machine_name}' already exists"
            )));
        }

        let category = RoleCategory::new(
            RoleCategoryId::new(),
            machine_name,
            Some(parent.id()),
            input.sibling_weight,
        );
        self.repository
            .create_role_category(category.clone())
            .await?;
        self.tree_cache.invalidate().await;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action: AuditAction::RoleCategoryCreated,
                resource_type: "role_category".to_owned(),
                resource_id: category.id().to_string(),
                detail: Some(
                    json!({
                        "machine_name": category.machine_name().as_str(),
                        "parent": parent.machine_name().as_str(),
                        "sibling_weight": category.sibling_weight(),
                    })
                    .to_string(),
                ),
            })
            .await?;

        Ok(category)
    }

    /// Creates a role inside a category and emits an audit event.
    ///
    /// Rank weights are unique per category. A root role may not outrank the
    /// current superuser role.
    pub async fn create_role(
        &self,
        actor: &UserIdentity,
        input: CreateRoleInput,
    ) -> AppResult<Role> {
        let catalog = self.require_superuser(actor).await?;
        let category = require_category(&catalog, &input.category_machine_name)?;
        let role = Role::new(
            RoleId::new(),
            category.id(),
            MachineName::new(input.machine_name)?,
            input.alias,
            RoleRank::from_weight(input.rank_weight),
        )?;

        let siblings = catalog.roles_in(category.id());
        if siblings
            .iter()
            .any(|existing| existing.machine_name() == role.machine_name())
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists in category '{}'",
                role.machine_name(),
                category.machine_name()
            )));
        }
        if siblings.iter().any(|existing| existing.rank() == role.rank()) {
            return Err(AppError::Conflict(format!(
                "rank weight {} is already used in category '{}'",
                role.rank().weight(),
                category.machine_name()
            )));
        }
        if category.is_root() && role.rank().is_senior_to(catalog.superuser_role().rank()) {
            return Err(AppError::Conflict(format!(
                "role '{}' would outrank the superuser role",
                role.machine_name()
            )));
        }

        self.repository.create_role(role.clone()).await?;
        self.tree_cache.invalidate().await;

        self.audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action: AuditAction::RoleCreated,
                resource_type: "role".to_owned(),
                resource_id: role.id().to_string(),
                detail: Some(
                    json!({
                        "machine_name": role.machine_name().as_str(),
                        "category": category.machine_name().as_str(),
                        "rank_weight": role.rank().weight(),
                    })
                    .to_string(),
                ),
            })
            .await?;

        Ok(role)
    }

    async fn require_superuser(&self, actor: &UserIdentity) -> AppResult<Arc<RoleCatalog>> {
        let catalog = self.tree_cache.catalog().await?;
        let holdings = self.holdings(actor).await?;
        if !holdings.holds(catalog.superuser_role().id()) {
            return Err(AppError::Forbidden(
                "only the superuser may change the role catalog".to_owned(),
            ));
        }

        Ok(catalog)
    }

    async fn holdings(&self, actor: &UserIdentity) -> AppResult<RoleHoldings> {
        let role_ids = self
            .membership_repository
            .list_role_ids_for_user(actor.user_id())
            .await?;

        Ok(RoleHoldings::new(actor.user_id(), role_ids))
    }
}
