use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use catalogue_core::{AppError, AppResult, UserId, UserIdentity};
use catalogue_domain::{MachineName, Role, RoleCategory, RoleCategoryId, RoleId, RoleRank};

use crate::{
    AuditEvent, AuditRepository, CatalogueUser, CategoryTreeCache, RoleAssignmentService,
    RoleCatalogRepository, RoleCatalogService, RoleChangeUnitOfWork, RoleMembershipRepository,
    RoleVisibilityService, UserRepository,
};

pub(crate) fn name(value: &str) -> MachineName {
    MachineName::new(value).unwrap_or_else(|error| panic!("invalid test machine name: {error}"))
}

pub(crate) fn category(
    machine_name: &str,
    parent_id: Option<RoleCategoryId>,
    sibling_weight: i32,
) -> RoleCategory {
    RoleCategory::new(
        RoleCategoryId::new(),
        name(machine_name),
        parent_id,
        sibling_weight,
    )
}

pub(crate) fn role(category_id: RoleCategoryId, machine_name: &str, weight: i32) -> Role {
    Role::new(
        RoleId::new(),
        category_id,
        name(machine_name),
        None,
        RoleRank::from_weight(weight),
    )
    .unwrap_or_else(|error| panic!("invalid test role: {error}"))
}

/// Root with superuser and admin, plus `ops` and `translations` below it.
pub(crate) fn seeded_catalog_rows() -> (Vec<RoleCategory>, Vec<Role>) {
    let root = category("root", None, 0);
    let ops = category("ops", Some(root.id()), 10);
    let translations = category("translations", Some(root.id()), 20);

    let roles = vec![
        role(root.id(), "superuser", 0),
        role(root.id(), "admin", 10),
        role(ops.id(), "moderator", 10),
        role(ops.id(), "editor", 20),
        role(translations.id(), "moderator", 10),
        role(translations.id(), "translator", 20),
    ];

    (vec![root, ops, translations], roles)
}

pub(crate) struct FakeRoleCatalogRepository {
    categories: Mutex<Vec<RoleCategory>>,
    roles: Mutex<Vec<Role>>,
    list_calls: Mutex<usize>,
}

impl FakeRoleCatalogRepository {
    pub(crate) fn new(categories: Vec<RoleCategory>, roles: Vec<Role>) -> Self {
        Self {
            categories: Mutex::new(categories),
            roles: Mutex::new(roles),
            list_calls: Mutex::new(0),
        }
    }

    pub(crate) async fn list_calls(&self) -> usize {
        *self.list_calls.lock().await
    }
}

#[async_trait]
impl RoleCatalogRepository for FakeRoleCatalogRepository {
    async fn list_role_categories(&self) -> AppResult<Vec<RoleCategory>> {
        *self.list_calls.lock().await += 1;
        Ok(self.categories.lock().await.clone())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.roles.lock().await.clone())
    }

    async fn create_role_category(&self, category: RoleCategory) -> AppResult<()> {
        self.categories.lock().await.push(category);
        Ok(())
    }

    async fn create_role(&self, role: Role) -> AppResult<()> {
        self.roles.lock().await.push(role);
        Ok(())
    }
}

type MembershipTable = HashMap<UserId, BTreeSet<RoleId>>;

#[derive(Default)]
pub(crate) struct FakeMembershipRepository {
    memberships: Arc<Mutex<MembershipTable>>,
    change_lock: Arc<Mutex<()>>,
    fail_additions: Arc<AtomicBool>,
    rollbacks: Arc<Mutex<usize>>,
}

impl FakeMembershipRepository {
    pub(crate) async fn grant(&self, user_id: UserId, role_id: RoleId) {
        self.memberships
            .lock()
            .await
            .entry(user_id)
            .or_default()
            .insert(role_id);
    }

    pub(crate) async fn roles_of(&self, user_id: UserId) -> BTreeSet<RoleId> {
        self.memberships
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) async fn rollbacks(&self) -> usize {
        *self.rollbacks.lock().await
    }

    pub(crate) fn fail_additions(&self) {
        self.fail_additions.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RoleMembershipRepository for FakeMembershipRepository {
    async fn list_role_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleId>> {
        Ok(self.roles_of(user_id).await.into_iter().collect())
    }

    async fn begin_role_change(
        &self,
        _subject: UserId,
        _category_id: RoleCategoryId,
        _guard_superuser: bool,
    ) -> AppResult<Box<dyn RoleChangeUnitOfWork>> {
        let guard = self.change_lock.clone().lock_owned().await;
        let staged = self.memberships.lock().await.clone();

        Ok(Box::new(FakeRoleChangeUnitOfWork {
            _guard: guard,
            staged,
            memberships: self.memberships.clone(),
            fail_additions: self.fail_additions.clone(),
            rollbacks: self.rollbacks.clone(),
        }))
    }
}

struct FakeRoleChangeUnitOfWork {
    _guard: OwnedMutexGuard<()>,
    staged: MembershipTable,
    memberships: Arc<Mutex<MembershipTable>>,
    fail_additions: Arc<AtomicBool>,
    rollbacks: Arc<Mutex<usize>>,
}

#[async_trait]
impl RoleChangeUnitOfWork for FakeRoleChangeUnitOfWork {
    async fn list_role_ids_for_user(&mut self, user_id: UserId) -> AppResult<Vec<RoleId>> {
        Ok(self
            .staged
            .get(&user_id)
            .map(|role_ids| role_ids.iter().copied().collect())
            .unwrap_or_default())
    }

    async fn count_role_holders(&mut self, role_id: RoleId) -> AppResult<u64> {
        Ok(self
            .staged
            .values()
            .filter(|role_ids| role_ids.contains(&role_id))
            .count() as u64)
    }

    async fn remove_membership(&mut self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        if let Some(role_ids) = self.staged.get_mut(&user_id) {
            role_ids.remove(&role_id);
        }
        Ok(())
    }

    async fn add_membership(&mut self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        if self.fail_additions.load(Ordering::SeqCst) {
            return Err(AppError::Internal("membership insert failed".to_owned()));
        }

        self.staged.entry(user_id).or_default().insert(role_id);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        *self.memberships.lock().await = self.staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        *self.rollbacks.lock().await += 1;
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeUserRepository {
    users: Mutex<HashSet<UserId>>,
}

#[async_trait]
impl UserRepository for FakeUserRepository {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<CatalogueUser>> {
        Ok(self
            .users
            .lock()
            .await
            .contains(&user_id)
            .then(|| CatalogueUser {
                user_id,
                display_name: format!("user {user_id}"),
            }))
    }
}

#[derive(Default)]
pub(crate) struct FakeAuditRepository {
    events: Mutex<Vec<AuditEvent>>,
    fail_appends: AtomicBool,
}

impl FakeAuditRepository {
    pub(crate) async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.clone()
    }

    pub(crate) fn fail_appends(&self) {
        self.fail_appends.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        if self.fail_appends.load(Ordering::SeqCst) {
            return Err(AppError::Internal("audit insert failed".to_owned()));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Seeded services sharing one set of fakes.
pub(crate) struct Harness {
    pub(crate) catalog_repository: Arc<FakeRoleCatalogRepository>,
    pub(crate) memberships: Arc<FakeMembershipRepository>,
    pub(crate) users: Arc<FakeUserRepository>,
    pub(crate) audit: Arc<FakeAuditRepository>,
    pub(crate) cache: Arc<CategoryTreeCache>,
    role_ids: HashMap<(String, String), RoleId>,
}

impl Harness {
    pub(crate) fn new() -> Self {
        let (categories, roles) = seeded_catalog_rows();
        let names: HashMap<RoleCategoryId, String> = categories
            .iter()
            .map(|category| (category.id(), category.machine_name().as_str().to_owned()))
            .collect();
        let role_ids = roles
            .iter()
            .filter_map(|role| {
                names.get(&role.category_id()).map(|category_name| {
                    (
                        (
                            category_name.clone(),
                            role.machine_name().as_str().to_owned(),
                        ),
                        role.id(),
                    )
                })
            })
            .collect();

        let catalog_repository = Arc::new(FakeRoleCatalogRepository::new(categories, roles));
        let cache = Arc::new(CategoryTreeCache::new(catalog_repository.clone()));

        Self {
            catalog_repository,
            memberships: Arc::new(FakeMembershipRepository::default()),
            users: Arc::new(FakeUserRepository::default()),
            audit: Arc::new(FakeAuditRepository::default()),
            cache,
            role_ids,
        }
    }

    pub(crate) fn role_id(&self, category_name: &str, role_name: &str) -> RoleId {
        self.role_ids
            .get(&(category_name.to_owned(), role_name.to_owned()))
            .copied()
            .unwrap_or_else(|| panic!("unknown seeded role {category_name}/{role_name}"))
    }

    /// Registers a user holding the given `(category, role)` pairs.
    pub(crate) async fn user(&self, roles: &[(&str, &str)]) -> UserIdentity {
        let user_id = UserId::new();
        self.users.users.lock().await.insert(user_id);
        for (category_name, role_name) in roles {
            self.memberships
                .grant(user_id, self.role_id(category_name, role_name))
                .await;
        }

        UserIdentity::new(user_id, format!("user {user_id}"), None)
    }

    pub(crate) async fn holds(
        &self,
        user: &UserIdentity,
        category_name: &str,
        role_name: &str,
    ) -> bool {
        self.memberships
            .roles_of(user.user_id())
            .await
            .contains(&self.role_id(category_name, role_name))
    }

    pub(crate) fn assignment_service(&self) -> RoleAssignmentService {
        RoleAssignmentService::new(
            self.cache.clone(),
            self.users.clone(),
            self.memberships.clone(),
            self.audit.clone(),
        )
    }

    pub(crate) fn visibility_service(&self) -> RoleVisibilityService {
        RoleVisibilityService::new(
            self.cache.clone(),
            self.users.clone(),
            self.memberships.clone(),
        )
    }

    pub(crate) fn catalog_service(&self) -> RoleCatalogService {
        RoleCatalogService::new(
            self.cache.clone(),
            self.catalog_repository.clone(),
            self.memberships.clone(),
            self.audit.clone(),
        )
    }
}
