use catalogue_core::{AppError, AppResult};
use serde::Serialize;

use crate::rank::{RankEngine, RoleHoldings};
use crate::role::{MachineName, RoleCategory, RoleCategoryId, RoleId};
use crate::tree::TreeNode;

/// One role entry shown to a viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleRole {
    /// Role identifier.
    pub role_id: RoleId,
    /// Role machine name.
    pub machine_name: MachineName,
    /// Alias or machine name.
    pub display_name: String,
    /// The viewer may not select this role.
    pub disabled: bool,
    /// The subject currently holds this role.
    pub checked: bool,
}

/// Category annotated for one (viewer, subject) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VisibleCategory {
    /// Category identifier.
    pub category_id: RoleCategoryId,
    /// Category machine name.
    pub machine_name: MachineName,
    /// Visible role entries, most senior first.
    pub roles: Vec<VisibleRole>,
    /// The viewer may not clear the subject's role here.
    pub delete_option_disabled: bool,
    /// The subject holds no role here.
    pub none_checked: bool,
}

impl VisibleCategory {
    /// Returns whether the node reveals nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }
}

/// Builds the privilege-filtered role tree of a subject as seen by a viewer.
///
/// The result depends on the viewer's privileges and must be rebuilt for
/// every request.
#[derive(Debug, Clone, Copy)]
pub struct VisibilityTreeBuilder<'a> {
    engine: RankEngine<'a>,
}

impl<'a> VisibilityTreeBuilder<'a> {
    /// Creates a builder on top of a rank engine.
    #[must_use]
    pub fn new(engine: RankEngine<'a>) -> Self {
        Self { engine }
    }

    /// Returns the pruned tree, or `None` when nothing about the subject is
    /// visible to the viewer.
    pub fn build(
        &self,
        viewer: &RoleHoldings,
        subject: &RoleHoldings,
    ) -> AppResult<Option<TreeNode<VisibleCategory>>> {
        let catalog = self.engine.catalog();
        let mut tree = catalog
            .tree()
            .root()
            .try_map(&mut |category| self.annotate(category, viewer, subject))?;

        tree.prune(&VisibleCategory::is_empty);

        if tree.value().is_empty() && tree.children().is_empty() {
            return Ok(None);
        }

        Ok(Some(tree))
    }

    fn annotate(
        &self,
        category: &RoleCategory,
        viewer: &RoleHoldings,
        subject: &RoleHoldings,
    ) -> AppResult<VisibleCategory> {
        let catalog = self.engine.catalog();
        if catalog.category(category.id()).is_none() {
            return Err(AppError::Internal(format!(
                "role category '{}' has no catalog entry",
                category.machine_name()
            )));
        }

        let delete_option_disabled = !(self
            .engine
            .is_qualified_as_category(viewer, category.id())
            && self.engine.is_superior_to(viewer, subject, category.id()));
        let sees_unheld_roles = viewer.is_same_user(subject)
            || self.engine.is_category_moderator(viewer, category.id());

        let roles: Vec<VisibleRole> = catalog
            .roles_in(category.id())
            .into_iter()
            .filter_map(|role| {
                let checked = subject.holds(role.id());
                if !checked && !sees_unheld_roles {
                    return None;
                }

                Some(VisibleRole {
                    role_id: role.id(),
                    machine_name: role.machine_name().clone(),
                    display_name: role.display_name().to_owned(),
                    disabled: delete_option_disabled || !self.engine.is_qualified_as(viewer, role),
                    checked,
                })
            })
            .collect();

        let none_checked = !self
            .engine
            .is_qualified_as_category(subject, category.id());

        Ok(VisibleCategory {
            category_id: category.id(),
            machine_name: category.machine_name().clone(),
            roles,
            delete_option_disabled,
            none_checked,
        })
    }
}
