use async_trait::async_trait;
use sqlx::{FromRow, PgPool};

use catalogue_application::RoleCatalogRepository;
use catalogue_core::{AppError, AppResult};
use catalogue_domain::{MachineName, Role, RoleCategory, RoleCategoryId, RoleId, RoleRank};

/// PostgreSQL-backed repository for role categories and roles.
#[derive(Clone)]
pub struct PostgresRoleCatalogRepository {
    pool: PgPool,
}

impl PostgresRoleCatalogRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleCategoryRow {
    id: uuid::Uuid,
    machine_name: String,
    parent_id: Option<uuid::Uuid>,
    sibling_weight: i32,
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    category_id: uuid::Uuid,
    machine_name: String,
    alias: Option<String>,
    rank_weight: i32,
}

#[async_trait]
impl RoleCatalogRepository for PostgresRoleCatalogRepository {
    async fn list_role_categories(&self) -> AppResult<Vec<RoleCategory>> {
        let rows = sqlx::query_as::<_, RoleCategoryRow>(
            r#"
            SELECT id, machine_name, parent_id, sibling_weight
            FROM role_categories
            ORDER BY sibling_weight, machine_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list role categories: {error}"))
        })?;

        rows.into_iter().map(category_from_row).collect()
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, category_id, machine_name, alias, rank_weight
            FROM roles
            ORDER BY category_id, rank_weight
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to list roles: {error}")))?;

        rows.into_iter().map(role_from_row).collect()
    }

    async fn create_role_category(&self, category: RoleCategory) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO role_categories (id, machine_name, parent_id, sibling_weight)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(category.id().as_uuid())
        .bind(category.machine_name().as_str())
        .bind(category.parent_id().map(|parent_id| parent_id.as_uuid()))
        .bind(category.sibling_weight())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                format!("role category '{}' already exists", category.machine_name()),
                "failed to create role category",
            )
        })?;

        Ok(())
    }

    async fn create_role(&self, role: Role) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, category_id, machine_name, alias, rank_weight)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(role.category_id().as_uuid())
        .bind(role.machine_name().as_str())
        .bind(role.alias())
        .bind(role.rank().weight())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_violation(
                error,
                format!(
                    "role '{}' or rank weight {} already exists in its category",
                    role.machine_name(),
                    role.rank().weight()
                ),
                "failed to create role",
            )
        })?;

        Ok(())
    }
}

fn category_from_row(row: RoleCategoryRow) -> AppResult<RoleCategory> {
    let machine_name = MachineName::new(row.machine_name).map_err(|error| {
        AppError::Internal(format!("stored role category name is invalid: {error}"))
    })?;

    Ok(RoleCategory::new(
        RoleCategoryId::from_uuid(row.id),
        machine_name,
        row.parent_id.map(RoleCategoryId::from_uuid),
        row.sibling_weight,
    ))
}

fn role_from_row(row: RoleRow) -> AppResult<Role> {
    let machine_name = MachineName::new(row.machine_name)
        .map_err(|error| AppError::Internal(format!("stored role name is invalid: {error}")))?;

    Role::new(
        RoleId::from_uuid(row.id),
        RoleCategoryId::from_uuid(row.category_id),
        machine_name,
        row.alias,
        RoleRank::from_weight(row.rank_weight),
    )
    .map_err(|error| AppError::Internal(format!("stored role is invalid: {error}")))
}

fn map_unique_violation(error: sqlx::Error, conflict: String, context: &str) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(conflict);
    }

    AppError::Internal(format!("{context}: {error}"))
}
