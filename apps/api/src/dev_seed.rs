use catalogue_application::{CreateRoleCategoryInput, CreateRoleInput, RoleChangeOutcome};
use catalogue_core::{AppError, AppResult, UserId, UserIdentity};
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api_services;
use crate::api_config::ApiConfig;

const DEV_SEED_SUPERUSER_ID: &str = "a2c8ea5f-4f39-4724-97f5-932f97f54f76";
const DEV_SEED_SUPERUSER_NAME: &str = "Catalogue Superuser";
const DEV_SEED_SUPERUSER_EMAIL: &str = "superuser@catalogue.local";
const DEV_SEED_EDITOR_ID: &str = "96d11e90-7403-4654-9727-cb1043f8bd31";
const DEV_SEED_EDITOR_NAME: &str = "Ops Editor";
const DEV_SEED_EDITOR_EMAIL: &str = "editor@catalogue.local";

/// Seeded superuser role from the hierarchy migration.
const SUPERUSER_ROLE_ID: &str = "00000000-0000-0000-0000-000000000101";

const DEV_SEED_CATEGORIES: &[(&str, i32)] = &[("ops", 10), ("translations", 20)];
const DEV_SEED_ROLES: &[(&str, &str, &str, i32)] = &[
    ("ops", "moderator", "Ops moderator", 10),
    ("ops", "editor", "Editor", 20),
    ("translations", "moderator", "Translation moderator", 10),
    ("translations", "translator", "Translator", 20),
];

pub async fn run(pool: PgPool, config: &ApiConfig) -> AppResult<()> {
    let superuser_id = parse_uuid_const(DEV_SEED_SUPERUSER_ID, "DEV_SEED_SUPERUSER_ID")?;
    let editor_id = parse_uuid_const(DEV_SEED_EDITOR_ID, "DEV_SEED_EDITOR_ID")?;
    let superuser_role_id = parse_uuid_const(SUPERUSER_ROLE_ID, "SUPERUSER_ROLE_ID")?;

    ensure_seed_user(
        &pool,
        superuser_id,
        DEV_SEED_SUPERUSER_NAME,
        DEV_SEED_SUPERUSER_EMAIL,
    )
    .await?;
    ensure_seed_user(&pool, editor_id, DEV_SEED_EDITOR_NAME, DEV_SEED_EDITOR_EMAIL).await?;
    ensure_membership(&pool, superuser_id, superuser_role_id).await?;

    let app_state = api_services::build_app_state(pool, config.frontend_url.as_str());
    let actor = UserIdentity::new(
        UserId::from_uuid(superuser_id),
        DEV_SEED_SUPERUSER_NAME,
        Some(DEV_SEED_SUPERUSER_EMAIL.to_owned()),
    );

    for (machine_name, sibling_weight) in DEV_SEED_CATEGORIES {
        let created = app_state
            .role_catalog_service
            .create_role_category(
                &actor,
                CreateRoleCategoryInput {
                    machine_name: (*machine_name).to_owned(),
                    parent_machine_name: "root".to_owned(),
                    sibling_weight: *sibling_weight,
                },
            )
            .await;
        ignore_existing(created, machine_name)?;
    }

    for (category, machine_name, alias, rank_weight) in DEV_SEED_ROLES {
        let created = app_state
            .role_catalog_service
            .create_role(
                &actor,
                CreateRoleInput {
                    category_machine_name: (*category).to_owned(),
                    machine_name: (*machine_name).to_owned(),
                    alias: Some((*alias).to_owned()),
                    rank_weight: *rank_weight,
                },
            )
            .await;
        ignore_existing(created, machine_name)?;
    }

    let outcome = app_state
        .role_assignment_service
        .change_role(&actor, UserId::from_uuid(editor_id), "ops", "editor")
        .await?;
    match outcome {
        RoleChangeOutcome::Committed(record) => {
            info!(new_role = ?record.new_role, "seeded ops editor membership");
        }
        RoleChangeOutcome::Rejected(rejection) => {
            warn!(%rejection, "seed role change was rejected");
        }
    }

    info!(
        superuser_id = %superuser_id,
        editor_id = %editor_id,
        "development seed applied"
    );

    Ok(())
}

fn ignore_existing<T>(result: AppResult<T>, machine_name: &str) -> AppResult<()> {
    match result {
        Ok(_) => Ok(()),
        Err(AppError::Conflict(_)) => {
            info!(machine_name, "seed entry already present");
            Ok(())
        }
        Err(error) => Err(error),
    }
}

async fn ensure_seed_user(
    pool: &PgPool,
    user_id: Uuid,
    display_name: &str,
    email: &str,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, display_name, email)
        VALUES ($1, $2, LOWER($3))
        ON CONFLICT (id) DO UPDATE
        SET display_name = EXCLUDED.display_name,
            email = EXCLUDED.email
        "#,
    )
    .bind(user_id)
    .bind(display_name)
    .bind(email)
    .execute(pool)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to ensure seed user exists for '{email}': {error}"
        ))
    })?;

    Ok(())
}

async fn ensure_membership(pool: &PgPool, user_id: Uuid, role_id: Uuid) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO user_roles (user_id, role_id)
        VALUES ($1, $2)
        ON CONFLICT (user_id, role_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(role_id)
    .execute(pool)
    .await
    .map_err(|error| {
        AppError::Internal(format!(
            "failed to ensure seed membership for user '{user_id}': {error}"
        ))
    })?;

    Ok(())
}

fn parse_uuid_const(value: &str, name: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|error| AppError::Internal(format!("invalid {name} constant: {error}")))
}
