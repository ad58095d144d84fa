use std::sync::Arc;

use catalogue_application::{
    AuditRepository, CategoryTreeCache, RoleAssignmentService, RoleCatalogRepository,
    RoleCatalogService, RoleMembershipRepository, RoleVisibilityService, UserRepository,
};
use catalogue_infrastructure::{
    PostgresAuditRepository, PostgresRoleCatalogRepository, PostgresRoleMembershipRepository,
    PostgresUserRepository,
};
use sqlx::PgPool;

use crate::state::AppState;

/// Ports shared by every role service.
pub struct RepositorySet {
    pub catalog_repository: Arc<dyn RoleCatalogRepository>,
    pub membership_repository: Arc<dyn RoleMembershipRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub audit_repository: Arc<dyn AuditRepository>,
}

pub fn build_app_state(pool: PgPool, frontend_url: &str) -> AppState {
    assemble_app_state(
        RepositorySet {
            catalog_repository: Arc::new(PostgresRoleCatalogRepository::new(pool.clone())),
            membership_repository: Arc::new(PostgresRoleMembershipRepository::new(pool.clone())),
            user_repository: Arc::new(PostgresUserRepository::new(pool.clone())),
            audit_repository: Arc::new(PostgresAuditRepository::new(pool)),
        },
        frontend_url,
    )
}

/// Wires services around one catalog cache.
pub fn assemble_app_state(repositories: RepositorySet, frontend_url: &str) -> AppState {
    let tree_cache = Arc::new(CategoryTreeCache::new(
        repositories.catalog_repository.clone(),
    ));

    AppState {
        role_assignment_service: RoleAssignmentService::new(
            tree_cache.clone(),
            repositories.user_repository.clone(),
            repositories.membership_repository.clone(),
            repositories.audit_repository.clone(),
        ),
        role_visibility_service: RoleVisibilityService::new(
            tree_cache.clone(),
            repositories.user_repository,
            repositories.membership_repository.clone(),
        ),
        role_catalog_service: RoleCatalogService::new(
            tree_cache,
            repositories.catalog_repository,
            repositories.membership_repository,
            repositories.audit_repository,
        ),
        frontend_url: frontend_url.to_owned(),
    }
}
