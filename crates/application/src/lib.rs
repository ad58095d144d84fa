//! Application services and ports for role administration.

#![forbid(unsafe_code)]

mod category_tree_cache;
mod role_assignment_service;
mod role_catalog_service;
mod role_ports;
mod role_visibility_service;

#[cfg(test)]
mod test_support;

pub use category_tree_cache::{CachedRoleCatalog, CategoryTreeCache};
pub use role_assignment_service::{
    AppliedRoleChange, RoleAssignmentService, RoleChangeOutcome, RoleFormOutcome,
};
pub use role_catalog_service::RoleCatalogService;
pub use role_ports::{
    AuditEvent, AuditRepository, CatalogueUser, CreateRoleCategoryInput, CreateRoleInput,
    RoleCatalogRepository, RoleChangeUnitOfWork, RoleFormSelection, RoleMembershipRepository,
    UserRepository,
};
pub use role_visibility_service::RoleVisibilityService;
