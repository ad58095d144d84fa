use catalogue_application::{RoleAssignmentService, RoleCatalogService, RoleVisibilityService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub role_assignment_service: RoleAssignmentService,
    pub role_visibility_service: RoleVisibilityService,
    pub role_catalog_service: RoleCatalogService,
    pub frontend_url: String,
}
