use std::sync::Arc;

use catalogue_core::{AppResult, UserId, UserIdentity};
use catalogue_domain::{RankEngine, RoleHoldings, TreeNode, VisibilityTreeBuilder, VisibleCategory};

use crate::role_assignment_service::require_user;
use crate::{CategoryTreeCache, RoleMembershipRepository, UserRepository};

/// Read-only service computing what a viewer may see of a subject's roles.
#[derive(Clone)]
pub struct RoleVisibilityService {
    tree_cache: Arc<CategoryTreeCache>,
    user_repository: Arc<dyn UserRepository>,
    membership_repository: Arc<dyn RoleMembershipRepository>,
}

impl RoleVisibilityService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        tree_cache: Arc<CategoryTreeCache>,
        user_repository: Arc<dyn UserRepository>,
        membership_repository: Arc<dyn RoleMembershipRepository>,
    ) -> Self {
        Self {
            tree_cache,
            user_repository,
            membership_repository,
        }
    }

    /// Returns the subject's role tree filtered for the viewer, or `None`
    /// when nothing is visible.
    ///
    /// The result is computed on every call and must not be cached.
    pub async fn visible_role_tree(
        &self,
        viewer: &UserIdentity,
        subject_id: UserId,
    ) -> AppResult<Option<TreeNode<VisibleCategory>>> {
        let catalog = self.tree_cache.catalog().await?;
        require_user(self.user_repository.as_ref(), subject_id).await?;

        let viewer_holdings = self.holdings(viewer.user_id()).await?;
        let subject_holdings = if viewer.user_id() == subject_id {
            viewer_holdings.clone()
        } else {
            self.holdings(subject_id).await?
        };

        VisibilityTreeBuilder::new(RankEngine::new(&catalog))
            .build(&viewer_holdings, &subject_holdings)
    }

    async fn holdings(&self, user_id: UserId) -> AppResult<RoleHoldings> {
        let role_ids = self
            .membership_repository
            .list_role_ids_for_user(user_id)
            .await?;

        Ok(RoleHoldings::new(user_id, role_ids))
    }
}
