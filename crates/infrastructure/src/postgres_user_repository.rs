use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use catalogue_application::{CatalogueUser, UserRepository};
use catalogue_core::{AppError, AppResult, UserId};

/// PostgreSQL-backed user lookups.
#[derive(Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: uuid::Uuid,
    display_name: String,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_user(&self, user_id: UserId) -> AppResult<Option<CatalogueUser>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, display_name
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to find user: {error}")))?;

        Ok(row.map(|row| CatalogueUser {
            user_id: UserId::from_uuid(row.id),
            display_name: row.display_name,
        }))
    }
}
