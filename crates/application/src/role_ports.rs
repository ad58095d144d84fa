use async_trait::async_trait;

use catalogue_core::{AppResult, UserId};
use catalogue_domain::{AuditAction, Role, RoleCategory, RoleCategoryId, RoleId};

/// User projection needed by the role workflows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogueUser {
    /// Stable user identifier.
    pub user_id: UserId,
    /// Display name.
    pub display_name: String,
}

/// Append-only audit event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Acting user.
    pub actor: UserId,
    /// Stable action identifier.
    pub action: AuditAction,
    /// Event resource type.
    pub resource_type: String,
    /// Event resource identifier.
    pub resource_id: String,
    /// Optional JSON-encoded event detail.
    pub detail: Option<String>,
}

/// Input payload for creating a role category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleCategoryInput {
    /// Unique machine name.
    pub machine_name: String,
    /// Machine name of the parent category.
    pub parent_machine_name: String,
    /// Ordering weight among siblings.
    pub sibling_weight: i32,
}

/// Input payload for creating a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRoleInput {
    /// Machine name of the owning category.
    pub category_machine_name: String,
    /// Machine name, unique within the category.
    pub machine_name: String,
    /// Optional human alias.
    pub alias: Option<String>,
    /// Rank weight; lower means more authority.
    pub rank_weight: i32,
}

/// One `(category, role)` pair submitted through the role form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleFormSelection {
    /// Category machine name.
    pub category_machine_name: String,
    /// Role machine name or `none`.
    pub role: String,
}

/// Repository port for user lookups.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Finds a user by identifier.
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<CatalogueUser>>;
}

/// Repository port for the category and role tables.
#[async_trait]
pub trait RoleCatalogRepository: Send + Sync {
    /// Lists every role category.
    async fn list_role_categories(&self) -> AppResult<Vec<RoleCategory>>;

    /// Lists every role.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Persists a new role category.
    async fn create_role_category(&self, category: RoleCategory) -> AppResult<()>;

    /// Persists a new role.
    async fn create_role(&self, role: Role) -> AppResult<()>;
}

/// Repository port for user role memberships.
#[async_trait]
pub trait RoleMembershipRepository: Send + Sync {
    /// Lists role ids held by a user.
    async fn list_role_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleId>>;

    /// Opens a transaction holding the lock for `(subject, category)`.
    ///
    /// With `guard_superuser` the transaction also serializes against every
    /// other change that may remove the superuser role.
    async fn begin_role_change(
        &self,
        subject: UserId,
        category_id: RoleCategoryId,
        guard_superuser: bool,
    ) -> AppResult<Box<dyn RoleChangeUnitOfWork>>;
}

/// Locked, atomic view of the membership table for one role change.
///
/// Dropping the unit of work without committing discards its writes.
#[async_trait]
pub trait RoleChangeUnitOfWork: Send {
    /// Lists role ids held by a user, including writes staged in this unit.
    async fn list_role_ids_for_user(&mut self, user_id: UserId) -> AppResult<Vec<RoleId>>;

    /// Counts users holding a role.
    async fn count_role_holders(&mut self, role_id: RoleId) -> AppResult<u64>;

    /// Deletes one membership.
    async fn remove_membership(&mut self, user_id: UserId, role_id: RoleId) -> AppResult<()>;

    /// Inserts one membership.
    async fn add_membership(&mut self, user_id: UserId, role_id: RoleId) -> AppResult<()>;

    /// Makes staged writes durable.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discards staged writes.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Repository port for audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Appends one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}
