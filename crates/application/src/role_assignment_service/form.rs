use catalogue_core::{AppError, AppResult, UserId, UserIdentity};
use catalogue_domain::{
    NO_ROLE_SELECTION, RankEngine, RoleCatalog, RoleChangeRequest, RoleHoldings, RoleSelection,
};

use super::{
    AppliedRoleChange, RoleAssignmentService, RoleFormOutcome, require_user, resolve_request,
};
use crate::RoleFormSelection;

impl RoleAssignmentService {
    /// Applies a submitted role form for a subject.
    ///
    /// Only the first selection that differs from the subject's current
    /// state is executed. Later differing selections are reported in
    /// [`RoleFormOutcome::skipped_categories`] and left untouched.
    pub async fn apply_role_form(
        &self,
        actor: &UserIdentity,
        subject_id: UserId,
        selections: Vec<RoleFormSelection>,
    ) -> AppResult<RoleFormOutcome> {
        let catalog = self.tree_cache.catalog().await?;
        let requests = selections
            .into_iter()
            .map(|selection| {
                let role = RoleSelection::parse(&selection.role)?;
                resolve_request(&catalog, &selection.category_machine_name, role)
            })
            .collect::<AppResult<Vec<_>>>()?;
        require_user(self.user_repository.as_ref(), subject_id).await?;

        let holdings = RoleHoldings::new(
            subject_id,
            self.membership_repository
                .list_role_ids_for_user(subject_id)
                .await?,
        );
        let mut changed: Vec<RoleChangeRequest> = requests
            .into_iter()
            .filter(|request| differs_from_current(&catalog, &holdings, request))
            .collect();
        if changed.is_empty() {
            return Ok(RoleFormOutcome {
                applied: None,
                skipped_categories: Vec::new(),
            });
        }

        let first = changed.remove(0);
        let skipped_categories: Vec<_> = changed
            .iter()
            .filter_map(|request| catalog.category(request.category_id))
            .map(|category| category.machine_name().clone())
            .collect();
        if !skipped_categories.is_empty() {
            tracing::warn!(
                subject = %subject_id,
                skipped = skipped_categories.len(),
                "role form changed several categories; only the first was applied"
            );
        }

        let category = catalog
            .category(first.category_id)
            .map(|category| category.machine_name().clone())
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "role category '{}' is missing from the catalog",
                    first.category_id
                ))
            })?;
        let outcome = self
            .execute_role_change(actor, subject_id, &catalog, first)
            .await?;

        Ok(RoleFormOutcome {
            applied: Some(AppliedRoleChange { category, outcome }),
            skipped_categories,
        })
    }
}

fn differs_from_current(
    catalog: &RoleCatalog,
    holdings: &RoleHoldings,
    request: &RoleChangeRequest,
) -> bool {
    let current = RankEngine::new(catalog)
        .highest_role_of(holdings, request.category_id)
        .map_or(NO_ROLE_SELECTION, |role| role.machine_name().as_str());

    current != request.selection.as_str()
}
