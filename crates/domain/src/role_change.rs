use std::fmt::{Display, Formatter};

use catalogue_core::{AppError, AppResult, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rank::{ActorRelation, RankEngine, RoleHoldings};
use crate::role::{MachineName, Role, RoleCategoryId, RoleId, RoleSelection};

/// Domain reasons for refusing a role change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoleChangeRejection {
    /// The change would leave nobody holding the superuser role.
    #[serde(rename = "ErrorCancelSysadmin")]
    CancelSysadmin,
    /// The actor does not outrank the subject in the category.
    #[serde(rename = "ErrorUpdateHigherRankRole")]
    UpdateHigherRankRole,
    /// The requested role carries more authority than the actor's own.
    #[serde(rename = "ErrorUpdateToHigherRankRole")]
    UpdateToHigherRankRole,
}

impl RoleChangeRejection {
    /// Returns the stable error tag surfaced to callers.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CancelSysadmin => "ErrorCancelSysadmin",
            Self::UpdateHigherRankRole => "ErrorUpdateHigherRankRole",
            Self::UpdateToHigherRankRole => "ErrorUpdateToHigherRankRole",
        }
    }

    /// Returns a human-readable explanation.
    #[must_use]
    pub fn message(&self) -> &'static str {
        match self {
            Self::CancelSysadmin => {
                "the last holder of the superuser role cannot lose it"
            }
            Self::UpdateHigherRankRole => {
                "you cannot change the role of a user who is not below you in this category"
            }
            Self::UpdateToHigherRankRole => {
                "you cannot grant a role above your own in this category"
            }
        }
    }
}

impl Display for RoleChangeRejection {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Lifecycle of one role change transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleChangeState {
    /// Request accepted, nothing read yet.
    Pending,
    /// Locks taken, rules being checked.
    Validating,
    /// Changes persisted.
    Committed,
    /// Changes discarded.
    RolledBack,
}

impl RoleChangeState {
    /// Returns a stable storage value for this state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validating => "validating",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }

    /// Returns whether the transaction can move to `next`.
    #[must_use]
    pub fn can_transition_to(&self, next: RoleChangeState) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Validating)
                | (Self::Pending, Self::RolledBack)
                | (Self::Validating, Self::Committed)
                | (Self::Validating, Self::RolledBack)
        )
    }
}

/// One requested change: a category and the role the subject should hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChangeRequest {
    /// Target category.
    pub category_id: RoleCategoryId,
    /// Desired state in that category.
    pub selection: RoleSelection,
}

/// Validated membership mutations for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleChangePlan {
    category_id: RoleCategoryId,
    relation: ActorRelation,
    removals: Vec<RoleId>,
    addition: Option<RoleId>,
    previous_role: Option<RoleId>,
    resulting_role: Option<RoleId>,
}

impl RoleChangePlan {
    /// Returns the category the plan applies to.
    #[must_use]
    pub fn category_id(&self) -> RoleCategoryId {
        self.category_id
    }

    /// Returns how the actor stood towards the subject.
    #[must_use]
    pub fn relation(&self) -> ActorRelation {
        self.relation
    }

    /// Returns memberships to delete.
    #[must_use]
    pub fn removals(&self) -> &[RoleId] {
        self.removals.as_slice()
    }

    /// Returns the membership to insert, if any.
    #[must_use]
    pub fn addition(&self) -> Option<RoleId> {
        self.addition
    }

    /// Returns the subject's most senior role before the change.
    #[must_use]
    pub fn previous_role(&self) -> Option<RoleId> {
        self.previous_role
    }

    /// Returns the subject's most senior role after the change.
    #[must_use]
    pub fn resulting_role(&self) -> Option<RoleId> {
        self.resulting_role
    }

    /// Returns whether applying the plan changes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.removals.is_empty() && self.addition.is_none()
    }
}

/// Outcome of validating a request against the rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleChangeDecision {
    /// Every rule passed.
    Apply(RoleChangePlan),
    /// A rule refused the change.
    Reject(RoleChangeRejection),
}

/// Applies the grant and cancellation rules to one request.
#[derive(Debug, Clone, Copy)]
pub struct RoleChangePlanner<'a> {
    engine: RankEngine<'a>,
}

impl<'a> RoleChangePlanner<'a> {
    /// Creates a planner on top of a rank engine.
    #[must_use]
    pub fn new(engine: RankEngine<'a>) -> Self {
        Self { engine }
    }

    /// Validates a request and derives the membership mutations.
    ///
    /// `superuser_holder_count` is the number of users holding the superuser
    /// role, read under the same lock as the holdings. Both holdings are the
    /// snapshot taken before any mutation.
    pub fn plan(
        &self,
        actor: &RoleHoldings,
        subject: &RoleHoldings,
        request: &RoleChangeRequest,
        superuser_holder_count: u64,
    ) -> AppResult<RoleChangeDecision> {
        let catalog = self.engine.catalog();
        let category = catalog.category(request.category_id).ok_or_else(|| {
            AppError::Internal(format!(
                "role category '{}' is missing from the catalog",
                request.category_id
            ))
        })?;

        let desired_role = match &request.selection {
            RoleSelection::None => None,
            RoleSelection::Role(machine_name) => Some(
                catalog
                    .role_by_name(category.id(), machine_name.as_str())
                    .ok_or_else(|| {
                        AppError::NotFound(format!(
                            "role '{machine_name}' does not exist in category '{}'",
                            category.machine_name()
                        ))
                    })?,
            ),
        };

        let relation = self.engine.relation(actor, subject, category.id());
        if matches!(
            relation,
            ActorRelation::Unrelated | ActorRelation::Subordinate
        ) {
            return Ok(RoleChangeDecision::Reject(
                RoleChangeRejection::UpdateHigherRankRole,
            ));
        }

        let actor_highest = self.engine.highest_role_of(actor, category.id());
        let held = self.engine.roles_held_in(subject, category.id());
        let previous_role = held.first().map(|role| role.id());

        let mut removals = Vec::new();
        let mut retained: Vec<&Role> = Vec::new();

        for role in held {
            if desired_role.is_some_and(|desired| desired.id() == role.id()) {
                retained.push(role);
                continue;
            }

            if !self.engine.is_qualified_as(actor, role) {
                retained.push(role);
                continue;
            }

            let is_actor_rank = actor_highest.is_some_and(|highest| highest.id() == role.id());
            if is_actor_rank && relation != ActorRelation::SelfSubject {
                retained.push(role);
                continue;
            }

            if catalog.is_superuser_role(role.id()) && superuser_holder_count <= 1 {
                return Ok(RoleChangeDecision::Reject(
                    RoleChangeRejection::CancelSysadmin,
                ));
            }

            removals.push(role.id());
        }

        let mut addition = None;
        if let Some(desired) = desired_role {
            if !self.engine.is_qualified_as(actor, desired) {
                return Ok(RoleChangeDecision::Reject(
                    RoleChangeRejection::UpdateToHigherRankRole,
                ));
            }

            if retained.iter().any(|role| role.id() != desired.id()) {
                return Ok(RoleChangeDecision::Reject(
                    RoleChangeRejection::UpdateHigherRankRole,
                ));
            }

            if !subject.holds(desired.id()) {
                addition = Some(desired.id());
            }
        }

        let resulting_role = desired_role
            .map(|role| role.id())
            .or_else(|| retained.first().map(|role| role.id()));

        Ok(RoleChangeDecision::Apply(RoleChangePlan {
            category_id: category.id(),
            relation,
            removals,
            addition,
            previous_role,
            resulting_role,
        }))
    }
}

/// Audit record emitted for every committed change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChangeRecord {
    /// Acting user.
    pub actor: UserId,
    /// User whose role changed.
    pub subject: UserId,
    /// Category machine name.
    pub category: MachineName,
    /// Most senior role before the change.
    pub old_role: Option<MachineName>,
    /// Most senior role after the change.
    pub new_role: Option<MachineName>,
    /// Commit time.
    pub recorded_at: DateTime<Utc>,
}

impl RoleChangeRecord {
    /// Builds the record for a committed plan.
    pub fn from_plan(
        engine: &RankEngine<'_>,
        plan: &RoleChangePlan,
        actor: UserId,
        subject: UserId,
        recorded_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        let catalog = engine.catalog();
        let category = catalog.category(plan.category_id()).ok_or_else(|| {
            AppError::Internal(format!(
                "role category '{}' is missing from the catalog",
                plan.category_id()
            ))
        })?;
        let role_name = |role_id: Option<RoleId>| {
            role_id.and_then(|role_id| {
                catalog
                    .role(role_id)
                    .map(|role| role.machine_name().clone())
            })
        };

        Ok(Self {
            actor,
            subject,
            category: category.machine_name().clone(),
            old_role: role_name(plan.previous_role()),
            new_role: role_name(plan.resulting_role()),
            recorded_at,
        })
    }
}
