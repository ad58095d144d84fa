use chrono::Utc;

use catalogue_core::{AppError, AppResult, UserId, UserIdentity};
use catalogue_domain::{
    ActorRelation, AuditAction, MachineName, RankEngine, RoleCatalog, RoleChangeDecision,
    RoleChangePlan, RoleChangePlanner, RoleChangeRecord, RoleChangeRequest, RoleChangeState,
    RoleHoldings,
};

use super::{RoleAssignmentService, RoleChangeOutcome};
use crate::{AuditEvent, RoleChangeUnitOfWork};

/// Tracks the lifecycle of one locked role change.
struct RoleChangeTransaction {
    actor: UserId,
    subject: UserId,
    category: MachineName,
    state: RoleChangeState,
}

impl RoleChangeTransaction {
    fn new(actor: UserId, subject: UserId, category: MachineName) -> Self {
        Self {
            actor,
            subject,
            category,
            state: RoleChangeState::Pending,
        }
    }

    fn advance(&mut self, next: RoleChangeState) -> AppResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(AppError::Internal(format!(
                "role change cannot move from '{}' to '{}'",
                self.state.as_str(),
                next.as_str()
            )));
        }

        tracing::debug!(
            actor = %self.actor,
            subject = %self.subject,
            category = %self.category,
            from = self.state.as_str(),
            to = next.as_str(),
            "role change state transition"
        );
        self.state = next;
        Ok(())
    }

    async fn roll_back(&mut self, unit: Box<dyn RoleChangeUnitOfWork>) -> AppResult<()> {
        self.advance(RoleChangeState::RolledBack)?;
        unit.rollback().await
    }

    /// Rolls back and hands the original error back to the caller.
    async fn abort(&mut self, unit: Box<dyn RoleChangeUnitOfWork>, error: AppError) -> AppError {
        if let Err(rollback_error) = self.roll_back(unit).await {
            tracing::error!(
                error = %rollback_error,
                category = %self.category,
                "failed to roll back role change"
            );
        }

        error
    }
}

impl RoleAssignmentService {
    pub(super) async fn execute_role_change(
        &self,
        actor: &UserIdentity,
        subject: UserId,
        catalog: &RoleCatalog,
        request: RoleChangeRequest,
    ) -> AppResult<RoleChangeOutcome> {
        let category = catalog.category(request.category_id).ok_or_else(|| {
            AppError::Internal(format!(
                "role category '{}' is missing from the catalog",
                request.category_id
            ))
        })?;
        let mut transaction =
            RoleChangeTransaction::new(actor.user_id(), subject, category.machine_name().clone());

        let mut unit = match self
            .membership_repository
            .begin_role_change(subject, category.id(), category.is_root())
            .await
        {
            Ok(unit) => unit,
            Err(error) => {
                transaction.advance(RoleChangeState::RolledBack)?;
                return Err(error);
            }
        };
        if let Err(error) = transaction.advance(RoleChangeState::Validating) {
            return Err(transaction.abort(unit, error).await);
        }

        let (decision, relation) =
            match decide(unit.as_mut(), catalog, actor.user_id(), subject, &request).await {
                Ok(decided) => decided,
                Err(error) => return Err(transaction.abort(unit, error).await),
            };

        let plan = match decision {
            RoleChangeDecision::Apply(plan) => plan,
            RoleChangeDecision::Reject(rejection) => {
                transaction.roll_back(unit).await?;
                tracing::warn!(
                    actor = %actor.user_id(),
                    subject = %subject,
                    category = %category.machine_name(),
                    relation = relation.as_str(),
                    rejection = rejection.as_str(),
                    "role change rejected"
                );
                return Ok(RoleChangeOutcome::Rejected(rejection));
            }
        };

        if let Err(error) = apply(unit.as_mut(), subject, &plan).await {
            return Err(transaction.abort(unit, error).await);
        }

        if let Err(error) = unit.commit().await {
            transaction.advance(RoleChangeState::RolledBack)?;
            return Err(error);
        }
        transaction.advance(RoleChangeState::Committed)?;

        let record = RoleChangeRecord::from_plan(
            &RankEngine::new(catalog),
            &plan,
            actor.user_id(),
            subject,
            Utc::now(),
        )?;
        let detail = serde_json::to_string(&record).map_err(|error| {
            AppError::Internal(format!("failed to encode role change record: {error}"))
        })?;

        tracing::info!(
            actor = %actor.user_id(),
            subject = %subject,
            category = %record.category,
            relation = plan.relation().as_str(),
            old_role = record.old_role.as_ref().map(MachineName::as_str),
            new_role = record.new_role.as_ref().map(MachineName::as_str),
            "role change committed"
        );

        // The memberships are already committed, so a lost audit row must not
        // turn the outcome into a failure.
        if let Err(error) = self
            .audit_repository
            .append_event(AuditEvent {
                actor: actor.user_id(),
                action: AuditAction::RoleChanged,
                resource_type: "user_role".to_owned(),
                resource_id: format!("{subject}:{}", record.category),
                detail: Some(detail.clone()),
            })
            .await
        {
            tracing::error!(
                error = %error,
                actor = %actor.user_id(),
                subject = %subject,
                category = %record.category,
                record = %detail,
                "role change committed but audit event was not recorded"
            );
        }

        Ok(RoleChangeOutcome::Committed(record))
    }
}

/// Reads the locked snapshot and runs the grant and cancellation rules.
/// Also returns how the actor ranks against the subject, for logging.
async fn decide(
    unit: &mut dyn RoleChangeUnitOfWork,
    catalog: &RoleCatalog,
    actor: UserId,
    subject: UserId,
    request: &RoleChangeRequest,
) -> AppResult<(RoleChangeDecision, ActorRelation)> {
    let actor_holdings = RoleHoldings::new(actor, unit.list_role_ids_for_user(actor).await?);
    let subject_holdings = if actor == subject {
        actor_holdings.clone()
    } else {
        RoleHoldings::new(subject, unit.list_role_ids_for_user(subject).await?)
    };
    let superuser_holders = unit
        .count_role_holders(catalog.superuser_role().id())
        .await?;

    let engine = RankEngine::new(catalog);
    let relation = engine.relation(&actor_holdings, &subject_holdings, request.category_id);
    let decision = RoleChangePlanner::new(engine).plan(
        &actor_holdings,
        &subject_holdings,
        request,
        superuser_holders,
    )?;

    Ok((decision, relation))
}

async fn apply(
    unit: &mut dyn RoleChangeUnitOfWork,
    subject: UserId,
    plan: &RoleChangePlan,
) -> AppResult<()> {
    for role_id in plan.removals() {
        unit.remove_membership(subject, *role_id).await?;
    }

    if let Some(role_id) = plan.addition() {
        unit.add_membership(subject, role_id).await?;
    }

    Ok(())
}
