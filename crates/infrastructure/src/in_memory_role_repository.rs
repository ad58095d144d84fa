use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use catalogue_application::{
    AuditEvent, AuditRepository, CatalogueUser, RoleCatalogRepository, RoleChangeUnitOfWork,
    RoleMembershipRepository, UserRepository,
};
use catalogue_core::{AppError, AppResult, UserId};
use catalogue_domain::{Role, RoleCategory, RoleCategoryId, RoleId};

type MembershipTable = HashMap<UserId, BTreeSet<RoleId>>;

/// In-memory users, catalog and memberships.
///
/// Role changes are serialized behind one process-wide lock.
#[derive(Debug, Default)]
pub struct InMemoryRoleRepository {
    categories: RwLock<Vec<RoleCategory>>,
    roles: RwLock<Vec<Role>>,
    users: RwLock<HashMap<UserId, CatalogueUser>>,
    memberships: Arc<RwLock<MembershipTable>>,
    change_lock: Arc<Mutex<()>>,
}

impl InMemoryRoleRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user.
    pub async fn insert_user(&self, user: CatalogueUser) {
        self.users.write().await.insert(user.user_id, user);
    }

    /// Grants a role directly, bypassing the role change rules.
    pub async fn seed_membership(&self, user_id: UserId, role_id: RoleId) {
        self.memberships
            .write()
            .await
            .entry(user_id)
            .or_default()
            .insert(role_id);
    }
}

#[async_trait]
impl RoleCatalogRepository for InMemoryRoleRepository {
    async fn list_role_categories(&self) -> AppResult<Vec<RoleCategory>> {
        Ok(self.categories.read().await.clone())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.roles.read().await.clone())
    }

    async fn create_role_category(&self, category: RoleCategory) -> AppResult<()> {
        let mut categories = self.categories.write().await;
        if categories
            .iter()
            .any(|existing| existing.machine_name() == category.machine_name())
        {
            return Err(AppError::Conflict(format!(
                "role category '{}' already exists",
                category.machine_name()
            )));
        }

        categories.push(category);
        Ok(())
    }

    async fn create_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        if roles.iter().any(|existing| {
            existing.category_id() == role.category_id()
                && (existing.machine_name() == role.machine_name()
                    || existing.rank() == role.rank())
        }) {
            return Err(AppError::Conflict(format!(
                "role '{}' or rank weight {} already exists in its category",
                role.machine_name(),
                role.rank().weight()
            )));
        }

        roles.push(role);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryRoleRepository {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<CatalogueUser>> {
        Ok(self.users.read().await.get(&user_id).cloned())
    }
}

#[async_trait]
impl RoleMembershipRepository for InMemoryRoleRepository {
    async fn list_role_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleId>> {
        Ok(self
            .memberships
            .read()
            .await
            .get(&user_id)
            .map(|role_ids| role_ids.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn begin_role_change(
        &self,
        _subject: UserId,
        _category_id: RoleCategoryId,
        _guard_superuser: bool,
    ) -> AppResult<Box<dyn RoleChangeUnitOfWork>> {
        let guard = self.change_lock.clone().lock_owned().await;
        let staged = self.memberships.read().await.clone();

        Ok(Box::new(InMemoryRoleChangeUnitOfWork {
            _guard: guard,
            staged,
            memberships: self.memberships.clone(),
        }))
    }
}

/// Works on a private copy of the membership table until commit.
struct InMemoryRoleChangeUnitOfWork {
    _guard: OwnedMutexGuard<()>,
    staged: MembershipTable,
    memberships: Arc<RwLock<MembershipTable>>,
}

#[async_trait]
impl RoleChangeUnitOfWork for InMemoryRoleChangeUnitOfWork {
    async fn list_role_ids_for_user(&mut self, user_id: UserId) -> AppResult<Vec<RoleId>> {
        Ok(self
            .staged
            .get(&user_id)
            .map(|role_ids| role_ids.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn count_role_holders(&mut self, role_id: RoleId) -> AppResult<u64> {
        let count = self
            .staged
            .values()
            .filter(|role_ids| role_ids.contains(&role_id))
            .count();

        u64::try_from(count)
            .map_err(|error| AppError::Internal(format!("invalid role holder count: {error}")))
    }

    async fn remove_membership(&mut self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        if let Some(role_ids) = self.staged.get_mut(&user_id) {
            role_ids.remove(&role_id);
        }

        Ok(())
    }

    async fn add_membership(&mut self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        self.staged.entry(user_id).or_default().insert(role_id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self {
            _guard,
            staged,
            memberships,
        } = *self;
        *memberships.write().await = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

/// In-memory append-only audit log.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every appended event, oldest first.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.read().await.clone()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use catalogue_application::{
        CatalogueUser, RoleCatalogRepository, RoleChangeUnitOfWork, RoleMembershipRepository,
        UserRepository,
    };
    use catalogue_core::{AppError, UserId};
    use catalogue_domain::{MachineName, Role, RoleCategory, RoleCategoryId, RoleId, RoleRank};

    use super::InMemoryRoleRepository;

    fn name(value: &str) -> MachineName {
        MachineName::new(value).unwrap_or_else(|error| panic!("{error}"))
    }

    #[tokio::test]
    async fn rank_tie_in_category_is_a_conflict() {
        let repository = InMemoryRoleRepository::new();
        let root = RoleCategory::new(RoleCategoryId::new(), name("root"), None, 0);
        let first = Role::new(
            RoleId::new(),
            root.id(),
            name("superuser"),
            None,
            RoleRank::from_weight(0),
        )
        .unwrap_or_else(|error| panic!("{error}"));
        let tie = Role::new(
            RoleId::new(),
            root.id(),
            name("admin"),
            None,
            RoleRank::from_weight(0),
        )
        .unwrap_or_else(|error| panic!("{error}"));

        assert!(repository.create_role_category(root).await.is_ok());
        assert!(repository.create_role(first).await.is_ok());
        assert!(matches!(
            repository.create_role(tie).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn unit_of_work_is_isolated_until_commit() {
        let repository = InMemoryRoleRepository::new();
        let user_id = UserId::new();
        let role_id = RoleId::new();
        repository
            .insert_user(CatalogueUser {
                user_id,
                display_name: "Ada".to_owned(),
            })
            .await;

        let mut unit = repository
            .begin_role_change(user_id, RoleCategoryId::new(), false)
            .await
            .unwrap_or_else(|error| panic!("{error}"));
        unit.add_membership(user_id, role_id)
            .await
            .unwrap_or_else(|error| panic!("{error}"));
        assert!(
            repository
                .list_role_ids_for_user(user_id)
                .await
                .unwrap_or_else(|error| panic!("{error}"))
                .is_empty()
        );

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            repository.begin_role_change(user_id, RoleCategoryId::new(), false),
        )
        .await;
        assert!(blocked.is_err());

        unit.commit().await.unwrap_or_else(|error| panic!("{error}"));
        assert_eq!(
            repository
                .list_role_ids_for_user(user_id)
                .await
                .unwrap_or_else(|error| panic!("{error}")),
            vec![role_id]
        );
        assert!(
            repository
                .find_user(user_id)
                .await
                .unwrap_or_else(|error| panic!("{error}"))
                .is_some()
        );
    }
}
