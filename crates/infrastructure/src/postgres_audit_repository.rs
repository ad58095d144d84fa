use async_trait::async_trait;
use sqlx::PgPool;

use catalogue_application::{AuditEvent, AuditRepository};
use catalogue_core::{AppError, AppResult};

/// Append-only audit trail of catalog writes and role changes.
#[derive(Clone)]
pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        let action = event.action.as_str();

        sqlx::query(
            r#"
            INSERT INTO audit_log_entries (actor_id, action, resource_type, resource_id, detail)
            VALUES ($1, $2, $3, $4, CAST($5 AS JSONB))
            "#,
        )
        .bind(event.actor.as_uuid())
        .bind(action)
        .bind(event.resource_type.as_str())
        .bind(event.resource_id.as_str())
        .bind(event.detail)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to record '{action}' for {} '{}': {error}",
                event.resource_type, event.resource_id
            ))
        })?;

        Ok(())
    }
}
