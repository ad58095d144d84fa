use serde::{Deserialize, Serialize};
use ts_rs::TS;

mod conversions;

/// Incoming payload for setting a user's role in one category.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/change-role-request.ts"
)]
pub struct ChangeRoleRequest {
    pub category_machine_name: String,
    /// Role machine name or `none`.
    pub role: String,
}

/// One category selection of the role form.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-form-selection-request.ts"
)]
pub struct RoleFormSelectionRequest {
    pub category_machine_name: String,
    pub role: String,
}

/// Incoming role form submission.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-form-request.ts"
)]
pub struct RoleFormRequest {
    pub selections: Vec<RoleFormSelectionRequest>,
}

/// Incoming payload for role category creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-role-category-request.ts"
)]
pub struct CreateRoleCategoryRequest {
    pub machine_name: String,
    pub parent_machine_name: String,
    #[serde(default)]
    pub sibling_weight: i32,
}

/// Incoming payload for role creation.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/create-role-request.ts"
)]
pub struct CreateRoleRequest {
    pub category_machine_name: String,
    pub machine_name: String,
    #[serde(default)]
    pub alias: Option<String>,
    pub rank_weight: i32,
}

/// API representation of a role.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-response.ts"
)]
pub struct RoleResponse {
    pub role_id: String,
    pub category_id: String,
    pub machine_name: String,
    pub alias: Option<String>,
    pub display_name: String,
    pub rank_weight: i32,
}

/// API representation of a role category with its roles, most senior first.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-category-response.ts"
)]
pub struct RoleCategoryResponse {
    pub category_id: String,
    pub machine_name: String,
    pub parent_id: Option<String>,
    pub sibling_weight: i32,
    pub roles: Vec<RoleResponse>,
}

/// Full role catalog in tree pre-order.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-catalog-response.ts"
)]
pub struct RoleCatalogResponse {
    pub superuser_role_id: String,
    pub categories: Vec<RoleCategoryResponse>,
}

/// Audit record of a committed role change.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-change-record-response.ts"
)]
pub struct RoleChangeRecordResponse {
    pub actor_id: String,
    pub subject_id: String,
    pub category: String,
    pub old_role: Option<String>,
    pub new_role: Option<String>,
    pub recorded_at: String,
}

/// Domain rejection of a role change.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-change-rejection-response.ts"
)]
pub struct RoleChangeRejectionResponse {
    pub error_tag: String,
    pub message: String,
    /// Form categories left untouched because an earlier one changed first.
    pub skipped_categories: Vec<String>,
}

/// Result of a role form submission that did not hit a rejection.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-form-response.ts"
)]
pub struct RoleFormResponse {
    pub applied: Option<RoleChangeRecordResponse>,
    pub skipped_categories: Vec<String>,
}

/// Role entry of the visible role tree.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/visible-role-response.ts"
)]
pub struct VisibleRoleResponse {
    pub role_id: String,
    pub machine_name: String,
    pub display_name: String,
    pub disabled: bool,
    pub checked: bool,
}

/// Category node of the visible role tree.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/role-tree-node-response.ts"
)]
pub struct RoleTreeNodeResponse {
    pub category_id: String,
    pub machine_name: String,
    pub delete_option_disabled: bool,
    pub none_checked: bool,
    pub roles: Vec<VisibleRoleResponse>,
    pub children: Vec<RoleTreeNodeResponse>,
}
