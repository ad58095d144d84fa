use catalogue_domain::{
    MachineName, Role, RoleCatalog, RoleChangeRecord, RoleChangeRejection, TreeNode,
    VisibleCategory, VisibleRole,
};

use super::{
    RoleCatalogResponse, RoleCategoryResponse, RoleChangeRecordResponse,
    RoleChangeRejectionResponse, RoleResponse, RoleTreeNodeResponse, VisibleRoleResponse,
};

impl From<&Role> for RoleResponse {
    fn from(value: &Role) -> Self {
        Self {
            role_id: value.id().to_string(),
            category_id: value.category_id().to_string(),
            machine_name: value.machine_name().as_str().to_owned(),
            alias: value.alias().map(str::to_owned),
            display_name: value.display_name().to_owned(),
            rank_weight: value.rank().weight(),
        }
    }
}

impl From<&RoleCatalog> for RoleCatalogResponse {
    fn from(value: &RoleCatalog) -> Self {
        let categories = value
            .tree()
            .categories()
            .map(|category| RoleCategoryResponse {
                category_id: category.id().to_string(),
                machine_name: category.machine_name().as_str().to_owned(),
                parent_id: category.parent_id().map(|parent_id| parent_id.to_string()),
                sibling_weight: category.sibling_weight(),
                roles: value
                    .roles_in(category.id())
                    .into_iter()
                    .map(RoleResponse::from)
                    .collect(),
            })
            .collect();

        Self {
            superuser_role_id: value.superuser_role().id().to_string(),
            categories,
        }
    }
}

impl From<RoleChangeRecord> for RoleChangeRecordResponse {
    fn from(value: RoleChangeRecord) -> Self {
        Self {
            actor_id: value.actor.to_string(),
            subject_id: value.subject.to_string(),
            category: value.category.as_str().to_owned(),
            old_role: value.old_role.map(machine_name_string),
            new_role: value.new_role.map(machine_name_string),
            recorded_at: value.recorded_at.to_rfc3339(),
        }
    }
}

impl From<RoleChangeRejection> for RoleChangeRejectionResponse {
    fn from(value: RoleChangeRejection) -> Self {
        Self {
            error_tag: value.as_str().to_owned(),
            message: value.message().to_owned(),
            skipped_categories: Vec::new(),
        }
    }
}

impl From<VisibleRole> for VisibleRoleResponse {
    fn from(value: VisibleRole) -> Self {
        Self {
            role_id: value.role_id.to_string(),
            machine_name: value.machine_name.as_str().to_owned(),
            display_name: value.display_name,
            disabled: value.disabled,
            checked: value.checked,
        }
    }
}

impl From<TreeNode<VisibleCategory>> for RoleTreeNodeResponse {
    fn from(value: TreeNode<VisibleCategory>) -> Self {
        let (category, children) = value.into_parts();

        Self {
            category_id: category.category_id.to_string(),
            machine_name: category.machine_name.as_str().to_owned(),
            delete_option_disabled: category.delete_option_disabled,
            none_checked: category.none_checked,
            roles: category
                .roles
                .into_iter()
                .map(VisibleRoleResponse::from)
                .collect(),
            children: children.into_iter().map(Self::from).collect(),
        }
    }
}

fn machine_name_string(value: MachineName) -> String {
    value.as_str().to_owned()
}
