use std::cmp::Ordering;
use std::collections::BTreeSet;

use catalogue_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};

use crate::catalog::RoleCatalog;
use crate::role::{Role, RoleCategoryId, RoleId};

/// Roles currently held by one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleHoldings {
    user_id: UserId,
    role_ids: BTreeSet<RoleId>,
}

impl RoleHoldings {
    /// Creates holdings for a user.
    #[must_use]
    pub fn new(user_id: UserId, role_ids: impl IntoIterator<Item = RoleId>) -> Self {
        Self {
            user_id,
            role_ids: role_ids.into_iter().collect(),
        }
    }

    /// Returns the holder.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// Returns whether the user holds the role.
    #[must_use]
    pub fn holds(&self, role_id: RoleId) -> bool {
        self.role_ids.contains(&role_id)
    }

    /// Returns the held role ids.
    #[must_use]
    pub fn role_ids(&self) -> &BTreeSet<RoleId> {
        &self.role_ids
    }

    /// Returns whether both holdings belong to the same user.
    #[must_use]
    pub fn is_same_user(&self, other: &RoleHoldings) -> bool {
        self.user_id == other.user_id
    }
}

/// How an actor stands towards a subject inside one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRelation {
    /// Actor and subject are the same user.
    SelfSubject,
    /// Actor strictly outranks the subject, or the subject holds nothing.
    Superior,
    /// Both hold roles of the same rank.
    Peer,
    /// The subject outranks the actor.
    Subordinate,
    /// The actor holds no role in the category.
    Unrelated,
}

impl ActorRelation {
    /// Returns a stable storage value for this relation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SelfSubject => "self",
            Self::Superior => "superior",
            Self::Peer => "peer",
            Self::Subordinate => "subordinate",
            Self::Unrelated => "unrelated",
        }
    }
}

/// Authority comparisons over a loaded catalog.
///
/// Every comparison stays inside one category; authority held in one
/// category never counts in another.
#[derive(Debug, Clone, Copy)]
pub struct RankEngine<'a> {
    catalog: &'a RoleCatalog,
}

impl<'a> RankEngine<'a> {
    /// Creates an engine bound to a catalog.
    #[must_use]
    pub fn new(catalog: &'a RoleCatalog) -> Self {
        Self { catalog }
    }

    /// Returns the catalog the engine reads from.
    #[must_use]
    pub fn catalog(&self) -> &'a RoleCatalog {
        self.catalog
    }

    /// Returns the held roles of a category, most senior first.
    #[must_use]
    pub fn roles_held_in(
        &self,
        holdings: &RoleHoldings,
        category_id: RoleCategoryId,
    ) -> Vec<&'a Role> {
        self.catalog
            .roles_in(category_id)
            .into_iter()
            .filter(|role| holdings.holds(role.id()))
            .collect()
    }

    /// Returns the most senior held role of a category.
    #[must_use]
    pub fn highest_role_of(
        &self,
        holdings: &RoleHoldings,
        category_id: RoleCategoryId,
    ) -> Option<&'a Role> {
        self.roles_held_in(holdings, category_id).into_iter().next()
    }

    /// Orders two roles of one category by authority.
    ///
    /// `Greater` means `left` is more senior.
    pub fn compare_authority(&self, left: &Role, right: &Role) -> AppResult<Ordering> {
        if left.category_id() != right.category_id() {
            return Err(AppError::Internal(format!(
                "cannot compare role '{}' with role '{}' from another category",
                left.machine_name(),
                right.machine_name()
            )));
        }

        let ordering = left.rank().authority_cmp(right.rank());
        if ordering == Ordering::Equal && left.id() != right.id() {
            return Err(AppError::Internal(format!(
                "roles '{}' and '{}' share rank weight {}",
                left.machine_name(),
                right.machine_name(),
                left.rank().weight()
            )));
        }

        Ok(ordering)
    }

    /// Returns whether the user's authority in the role's category is at
    /// least that of the role.
    #[must_use]
    pub fn is_qualified_as(&self, holdings: &RoleHoldings, role: &Role) -> bool {
        self.highest_role_of(holdings, role.category_id())
            .is_some_and(|highest| highest.rank().is_at_least(role.rank()))
    }

    /// Returns whether the user holds any role in the category.
    #[must_use]
    pub fn is_qualified_as_category(
        &self,
        holdings: &RoleHoldings,
        category_id: RoleCategoryId,
    ) -> bool {
        self.highest_role_of(holdings, category_id).is_some()
    }

    /// Returns whether the actor is the subject or outranks them in the
    /// category.
    #[must_use]
    pub fn is_superior_to(
        &self,
        actor: &RoleHoldings,
        subject: &RoleHoldings,
        category_id: RoleCategoryId,
    ) -> bool {
        matches!(
            self.relation(actor, subject, category_id),
            ActorRelation::SelfSubject | ActorRelation::Superior
        )
    }

    /// Classifies how the actor stands towards the subject in the category.
    #[must_use]
    pub fn relation(
        &self,
        actor: &RoleHoldings,
        subject: &RoleHoldings,
        category_id: RoleCategoryId,
    ) -> ActorRelation {
        if actor.is_same_user(subject) {
            return ActorRelation::SelfSubject;
        }

        let Some(actor_highest) = self.highest_role_of(actor, category_id) else {
            return ActorRelation::Unrelated;
        };

        let Some(subject_highest) = self.highest_role_of(subject, category_id) else {
            return ActorRelation::Superior;
        };

        // Both roles come from one category and a built catalog holds no rank
        // ties, so only identical roles compare equal.
        match self
            .compare_authority(actor_highest, subject_highest)
            .unwrap_or(Ordering::Equal)
        {
            Ordering::Greater => ActorRelation::Superior,
            Ordering::Less => ActorRelation::Subordinate,
            Ordering::Equal => ActorRelation::Peer,
        }
    }

    /// Returns whether the viewer holds a role above the entry-level role of
    /// the category.
    #[must_use]
    pub fn is_category_moderator(
        &self,
        viewer: &RoleHoldings,
        category_id: RoleCategoryId,
    ) -> bool {
        let Some(lowest) = self.catalog.lowest_role(category_id) else {
            return false;
        };

        self.highest_role_of(viewer, category_id)
            .is_some_and(|highest| highest.rank().is_senior_to(lowest.rank()))
    }
}

#[cfg(test)]
mod tests {
    use std::cmp::Ordering;

    use catalogue_core::UserId;
    use proptest::prelude::*;

    use super::{ActorRelation, RankEngine, RoleHoldings};
    use crate::catalog::RoleCatalog;
    use crate::role::{MachineName, Role, RoleCategory, RoleCategoryId, RoleId, RoleRank};

    struct Fixture {
        catalog: RoleCatalog,
        root: RoleCategoryId,
        ops: RoleCategoryId,
        ops_roles: Vec<RoleId>,
    }

    fn name(value: &str) -> MachineName {
        match MachineName::new(value) {
            Ok(name) => name,
            Err(error) => panic!("invalid test machine name: {error}"),
        }
    }

    fn role(category_id: RoleCategoryId, machine_name: &str, weight: i32) -> Role {
        match Role::new(
            RoleId::new(),
            category_id,
            name(machine_name),
            None,
            RoleRank::from_weight(weight),
        ) {
            Ok(role) => role,
            Err(error) => panic!("invalid test role: {error}"),
        }
    }

    fn fixture() -> Fixture {
        let root = RoleCategory::new(RoleCategoryId::new(), name("root"), None, 0);
        let ops = RoleCategory::new(RoleCategoryId::new(), name("ops"), Some(root.id()), 0);
        let superuser = role(root.id(), "superuser", 0);
        let moderator = role(ops.id(), "moderator", 10);
        let editor = role(ops.id(), "editor", 20);
        let contributor = role(ops.id(), "contributor", 30);
        let ops_roles = vec![moderator.id(), editor.id(), contributor.id()];

        let catalog = RoleCatalog::build(
            vec![root.clone(), ops.clone()],
            vec![superuser, moderator, editor, contributor],
        )
        .unwrap_or_else(|error| panic!("{error}"));

        Fixture {
            catalog,
            root: root.id(),
            ops: ops.id(),
            ops_roles,
        }
    }

    #[test]
    fn highest_role_picks_smallest_weight() {
        let fixture = fixture();
        let engine = RankEngine::new(&fixture.catalog);
        let holdings = RoleHoldings::new(
            UserId::new(),
            [fixture.ops_roles[2], fixture.ops_roles[1]],
        );

        let highest = engine.highest_role_of(&holdings, fixture.ops);
        assert_eq!(highest.map(|role| role.id()), Some(fixture.ops_roles[1]));
        assert!(engine.highest_role_of(&holdings, fixture.root).is_none());
    }

    #[test]
    fn relation_covers_decision_table() {
        let fixture = fixture();
        let engine = RankEngine::new(&fixture.catalog);
        let moderator = RoleHoldings::new(UserId::new(), [fixture.ops_roles[0]]);
        let other_moderator = RoleHoldings::new(UserId::new(), [fixture.ops_roles[0]]);
        let editor = RoleHoldings::new(UserId::new(), [fixture.ops_roles[1]]);
        let outsider = RoleHoldings::new(UserId::new(), []);

        assert_eq!(
            engine.relation(&moderator, &moderator, fixture.ops),
            ActorRelation::SelfSubject
        );
        assert_eq!(
            engine.relation(&moderator, &editor, fixture.ops),
            ActorRelation::Superior
        );
        assert_eq!(
            engine.relation(&moderator, &outsider, fixture.ops),
            ActorRelation::Superior
        );
        assert_eq!(
            engine.relation(&moderator, &other_moderator, fixture.ops),
            ActorRelation::Peer
        );
        assert_eq!(
            engine.relation(&editor, &moderator, fixture.ops),
            ActorRelation::Subordinate
        );
        assert_eq!(
            engine.relation(&outsider, &editor, fixture.ops),
            ActorRelation::Unrelated
        );
        assert!(engine.is_superior_to(&moderator, &editor, fixture.ops));
        assert!(!engine.is_superior_to(&moderator, &other_moderator, fixture.ops));
    }

    #[test]
    fn relation_labels_are_stable() {
        let labels: Vec<&str> = [
            ActorRelation::SelfSubject,
            ActorRelation::Superior,
            ActorRelation::Peer,
            ActorRelation::Subordinate,
            ActorRelation::Unrelated,
        ]
        .iter()
        .map(ActorRelation::as_str)
        .collect();

        assert_eq!(
            labels,
            ["self", "superior", "peer", "subordinate", "unrelated"]
        );
    }

    #[test]
    fn moderator_means_above_entry_level() {
        let fixture = fixture();
        let engine = RankEngine::new(&fixture.catalog);
        let editor = RoleHoldings::new(UserId::new(), [fixture.ops_roles[1]]);
        let contributor = RoleHoldings::new(UserId::new(), [fixture.ops_roles[2]]);

        assert!(engine.is_category_moderator(&editor, fixture.ops));
        assert!(!engine.is_category_moderator(&contributor, fixture.ops));
        assert!(!engine.is_category_moderator(&editor, fixture.root));
    }

    #[test]
    fn cross_category_comparison_is_rejected() {
        let fixture = fixture();
        let engine = RankEngine::new(&fixture.catalog);
        let superuser = fixture.catalog.superuser_role();
        let moderator = fixture
            .catalog
            .role(fixture.ops_roles[0])
            .unwrap_or_else(|| panic!("missing moderator"));

        assert!(engine.compare_authority(superuser, moderator).is_err());
        assert!(matches!(
            engine.compare_authority(moderator, moderator),
            Ok(Ordering::Equal)
        ));
    }

    proptest! {
        #[test]
        fn category_qualification_matches_highest_role(mask in 0_u8..8) {
            let fixture = fixture();
            let engine = RankEngine::new(&fixture.catalog);
            let held = fixture
                .ops_roles
                .iter()
                .enumerate()
                .filter(|(index, _)| mask & (1 << index) != 0)
                .map(|(_, role_id)| *role_id);
            let holdings = RoleHoldings::new(UserId::new(), held);

            prop_assert_eq!(
                engine.is_qualified_as_category(&holdings, fixture.ops),
                engine.highest_role_of(&holdings, fixture.ops).is_some()
            );
        }

        #[test]
        fn senior_qualification_implies_junior(
            held in 0_usize..3,
            senior in 0_usize..3,
            junior in 0_usize..3,
        ) {
            prop_assume!(senior < junior);
            let fixture = fixture();
            let engine = RankEngine::new(&fixture.catalog);
            let holdings = RoleHoldings::new(UserId::new(), [fixture.ops_roles[held]]);
            let senior_role = fixture.catalog.role(fixture.ops_roles[senior]);
            let junior_role = fixture.catalog.role(fixture.ops_roles[junior]);
            prop_assume!(senior_role.is_some() && junior_role.is_some());
            let (Some(senior_role), Some(junior_role)) = (senior_role, junior_role) else {
                return Ok(());
            };

            if engine.is_qualified_as(&holdings, senior_role) {
                prop_assert!(engine.is_qualified_as(&holdings, junior_role));
            }
            let junior_holder = RoleHoldings::new(UserId::new(), [junior_role.id()]);
            prop_assert!(!engine.is_qualified_as(&junior_holder, senior_role));
        }
    }
}
