mod common;
mod roles;

pub use common::HealthResponse;
pub use roles::{
    ChangeRoleRequest, CreateRoleCategoryRequest, CreateRoleRequest, RoleCatalogResponse,
    RoleCategoryResponse, RoleChangeRecordResponse, RoleChangeRejectionResponse,
    RoleFormRequest, RoleFormResponse, RoleFormSelectionRequest, RoleResponse,
    RoleTreeNodeResponse, VisibleRoleResponse,
};
