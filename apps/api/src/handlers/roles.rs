use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use catalogue_application::{
    CreateRoleCategoryInput, CreateRoleInput, RoleChangeOutcome, RoleFormSelection,
};
use catalogue_core::{UserId, UserIdentity};
use catalogue_domain::RoleChangeRejection;

use crate::dto::{
    ChangeRoleRequest, CreateRoleCategoryRequest, CreateRoleRequest, RoleCatalogResponse,
    RoleCategoryResponse, RoleChangeRecordResponse, RoleChangeRejectionResponse, RoleFormRequest,
    RoleFormResponse, RoleResponse, RoleTreeNodeResponse,
};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn role_catalog_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<RoleCatalogResponse>> {
    let catalog = state.role_catalog_service.catalog(&user).await?;

    Ok(Json(RoleCatalogResponse::from(catalog.as_ref())))
}

pub async fn create_role_category_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateRoleCategoryRequest>,
) -> ApiResult<(StatusCode, Json<RoleCategoryResponse>)> {
    let category = state
        .role_catalog_service
        .create_role_category(
            &user,
            CreateRoleCategoryInput {
                machine_name: payload.machine_name,
                parent_machine_name: payload.parent_machine_name,
                sibling_weight: payload.sibling_weight,
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(RoleCategoryResponse {
            category_id: category.id().to_string(),
            machine_name: category.machine_name().as_str().to_owned(),
            parent_id: category.parent_id().map(|parent_id| parent_id.to_string()),
            sibling_weight: category.sibling_weight(),
            roles: Vec::new(),
        }),
    ))
}

pub async fn create_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<RoleResponse>)> {
    let role = state
        .role_catalog_service
        .create_role(
            &user,
            CreateRoleInput {
                category_machine_name: payload.category_machine_name,
                machine_name: payload.machine_name,
                alias: payload.alias,
                rank_weight: payload.rank_weight,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RoleResponse::from(&role))))
}

pub async fn change_role_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(subject_id): Path<String>,
    Json(payload): Json<ChangeRoleRequest>,
) -> ApiResult<Response> {
    let subject_id = UserId::parse(subject_id.as_str())?;
    let outcome = state
        .role_assignment_service
        .change_role(
            &user,
            subject_id,
            payload.category_machine_name.as_str(),
            payload.role.as_str(),
        )
        .await?;

    Ok(match outcome {
        RoleChangeOutcome::Committed(record) => {
            Json(RoleChangeRecordResponse::from(record)).into_response()
        }
        RoleChangeOutcome::Rejected(rejection) => rejection_response(rejection),
    })
}

pub async fn apply_role_form_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(subject_id): Path<String>,
    Json(payload): Json<RoleFormRequest>,
) -> ApiResult<Response> {
    let subject_id = UserId::parse(subject_id.as_str())?;
    let selections = payload
        .selections
        .into_iter()
        .map(|selection| RoleFormSelection {
            category_machine_name: selection.category_machine_name,
            role: selection.role,
        })
        .collect();

    let outcome = state
        .role_assignment_service
        .apply_role_form(&user, subject_id, selections)
        .await?;

    let skipped_categories = outcome
        .skipped_categories
        .iter()
        .map(|category| category.as_str().to_owned())
        .collect();
    let applied = match outcome.applied.map(|applied| applied.outcome) {
        None => None,
        Some(RoleChangeOutcome::Committed(record)) => Some(RoleChangeRecordResponse::from(record)),
        Some(RoleChangeOutcome::Rejected(rejection)) => {
            let mut body = RoleChangeRejectionResponse::from(rejection);
            body.skipped_categories = skipped_categories;
            return Ok((StatusCode::FORBIDDEN, Json(body)).into_response());
        }
    };

    Ok(Json(RoleFormResponse {
        applied,
        skipped_categories,
    })
    .into_response())
}

pub async fn role_tree_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(subject_id): Path<String>,
) -> ApiResult<Response> {
    let subject_id = UserId::parse(subject_id.as_str())?;
    let tree = state
        .role_visibility_service
        .visible_role_tree(&user, subject_id)
        .await?;

    Ok(match tree {
        Some(tree) => Json(RoleTreeNodeResponse::from(tree)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

fn rejection_response(rejection: RoleChangeRejection) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(RoleChangeRejectionResponse::from(rejection)),
    )
        .into_response()
}
