use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use catalogue_application::{RoleChangeUnitOfWork, RoleMembershipRepository};
use catalogue_core::{AppError, AppResult, UserId};
use catalogue_domain::{RoleCategoryId, RoleId};

/// Advisory lock key taken by every change that may remove the superuser role.
const SUPERUSER_LOCK_KEY: &str = "role_change:superuser";

/// PostgreSQL-backed repository for user role memberships.
#[derive(Clone)]
pub struct PostgresRoleMembershipRepository {
    pool: PgPool,
}

impl PostgresRoleMembershipRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleMembershipRepository for PostgresRoleMembershipRepository {
    async fn list_role_ids_for_user(&self, user_id: UserId) -> AppResult<Vec<RoleId>> {
        let role_ids = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT role_id
            FROM user_roles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list user roles: {error}")))?;

        Ok(role_ids.into_iter().map(RoleId::from_uuid).collect())
    }

    async fn begin_role_change(
        &self,
        subject: UserId,
        category_id: RoleCategoryId,
        guard_superuser: bool,
    ) -> AppResult<Box<dyn RoleChangeUnitOfWork>> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Internal(format!("failed to begin transaction: {error}"))
        })?;

        // The superuser lock always comes first so the two keys are taken in
        // one global order.
        if guard_superuser {
            acquire_lock(&mut transaction, SUPERUSER_LOCK_KEY.to_owned()).await?;
        }
        acquire_lock(
            &mut transaction,
            format!("role_change:{subject}:{category_id}"),
        )
        .await?;

        Ok(Box::new(PostgresRoleChangeUnitOfWork { transaction }))
    }
}

async fn acquire_lock(
    transaction: &mut Transaction<'static, Postgres>,
    key: String,
) -> AppResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(key.as_str())
        .execute(&mut **transaction)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to acquire role change lock '{key}': {error}"))
        })?;

    tracing::debug!(lock = key.as_str(), "role change lock acquired");
    Ok(())
}

/// Membership reads and writes inside one locked transaction.
struct PostgresRoleChangeUnitOfWork {
    transaction: Transaction<'static, Postgres>,
}

#[async_trait]
impl RoleChangeUnitOfWork for PostgresRoleChangeUnitOfWork {
    async fn list_role_ids_for_user(&mut self, user_id: UserId) -> AppResult<Vec<RoleId>> {
        let role_ids = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT role_id
            FROM user_roles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list user roles: {error}")))?;

        Ok(role_ids.into_iter().map(RoleId::from_uuid).collect())
    }

    async fn count_role_holders(&mut self, role_id: RoleId) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM user_roles
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_one(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to count role holders: {error}")))?;

        u64::try_from(count)
            .map_err(|error| AppError::Internal(format!("invalid role holder count: {error}")))
    }

    async fn remove_membership(&mut self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        sqlx::query(
            r#"
            DELETE FROM user_roles
            WHERE user_id = $1 AND role_id = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to remove user role: {error}")))?;

        Ok(())
    }

    async fn add_membership(&mut self, user_id: UserId, role_id: RoleId) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO user_roles (user_id, role_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, role_id) DO NOTHING
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&mut *self.transaction)
        .await
        .map_err(|error| AppError::Internal(format!("failed to add user role: {error}")))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.transaction.commit().await.map_err(|error| {
            AppError::Internal(format!("failed to commit transaction: {error}"))
        })
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.transaction.rollback().await.map_err(|error| {
            AppError::Internal(format!("failed to roll back transaction: {error}"))
        })
    }
}
