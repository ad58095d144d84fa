use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use axum::middleware::{Next, from_fn};
use axum::response::Response;
use serde_json::{Value, json};
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

use catalogue_application::{CatalogueUser, RoleCatalogRepository};
use catalogue_core::{UserId, UserIdentity};
use catalogue_domain::{MachineName, Role, RoleCategory, RoleCategoryId, RoleId, RoleRank};
use catalogue_infrastructure::{InMemoryAuditRepository, InMemoryRoleRepository};

use super::routes;
use crate::api_services::{RepositorySet, assemble_app_state};
use crate::middleware::SESSION_USER_KEY;

const FRONTEND_URL: &str = "http://localhost:3000";
const TEST_USER_HEADER: &str = "x-test-user";

struct TestApp {
    router: Router,
    sysadmin: UserId,
    moderator: UserId,
    editor: UserId,
    newcomer: UserId,
}

fn name(value: &str) -> MachineName {
    MachineName::new(value).unwrap_or_else(|error| panic!("{error}"))
}

fn role(category_id: RoleCategoryId, machine_name: &str, weight: i32) -> Role {
    Role::new(
        RoleId::new(),
        category_id,
        name(machine_name),
        None,
        RoleRank::from_weight(weight),
    )
    .unwrap_or_else(|error| panic!("{error}"))
}

async fn sign_in_from_header(session: Session, request: Request<Body>, next: Next) -> Response {
    let user_id = request
        .headers()
        .get(TEST_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| UserId::parse(value).ok());

    if let Some(user_id) = user_id {
        let identity = UserIdentity::new(user_id, "Test User", None);
        if let Err(error) = session.insert(SESSION_USER_KEY, identity).await {
            panic!("{error}");
        }
    }

    next.run(request).await
}

async fn add_user(repository: &InMemoryRoleRepository, role_ids: &[RoleId]) -> UserId {
    let user_id = UserId::new();
    repository
        .insert_user(CatalogueUser {
            user_id,
            display_name: "Seeded".to_owned(),
        })
        .await;
    for role_id in role_ids {
        repository.seed_membership(user_id, *role_id).await;
    }

    user_id
}

async fn test_app() -> TestApp {
    let repository = Arc::new(InMemoryRoleRepository::new());
    let root = RoleCategory::new(RoleCategoryId::new(), name("root"), None, 0);
    let ops = RoleCategory::new(RoleCategoryId::new(), name("ops"), Some(root.id()), 10);
    let superuser = role(root.id(), "superuser", 0);
    let admin = role(root.id(), "admin", 10);
    let ops_moderator = role(ops.id(), "moderator", 10);
    let ops_editor = role(ops.id(), "editor", 20);
    let (superuser_id, moderator_id, editor_id) =
        (superuser.id(), ops_moderator.id(), ops_editor.id());

    for category in [root, ops] {
        repository
            .create_role_category(category)
            .await
            .unwrap_or_else(|error| panic!("{error}"));
    }
    for role in [superuser, admin, ops_moderator, ops_editor] {
        repository
            .create_role(role)
            .await
            .unwrap_or_else(|error| panic!("{error}"));
    }

    let sysadmin = add_user(&repository, &[superuser_id]).await;
    let moderator = add_user(&repository, &[moderator_id]).await;
    let editor = add_user(&repository, &[editor_id]).await;
    let newcomer = add_user(&repository, &[]).await;

    let app_state = assemble_app_state(
        RepositorySet {
            catalog_repository: repository.clone(),
            membership_repository: repository.clone(),
            user_repository: repository,
            audit_repository: Arc::new(InMemoryAuditRepository::new()),
        },
        FRONTEND_URL,
    );

    let router = routes(app_state.clone(), FRONTEND_URL)
        .unwrap_or_else(|error| panic!("{error}"))
        .layer(from_fn(sign_in_from_header))
        .layer(SessionManagerLayer::new(MemoryStore::default()))
        .with_state(app_state);

    TestApp {
        router,
        sysadmin,
        moderator,
        editor,
        newcomer,
    }
}

async fn send(
    app: &TestApp,
    method: Method,
    uri: &str,
    user: Option<UserId>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ORIGIN, FRONTEND_URL)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(user_id) = user {
        builder = builder.header(TEST_USER_HEADER, user_id.to_string());
    }

    let body = body.map_or_else(Body::empty, |value| Body::from(value.to_string()));
    let request = builder
        .body(body)
        .unwrap_or_else(|error| panic!("{error}"));

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap_or_else(|error| panic!("{error}"));
    let payload = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|error| panic!("{error}"))
    };

    (status, payload)
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;

    let (status, body) = send(&app, Method::GET, "/health", None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "catalogue-api");
}

#[tokio::test]
async fn role_routes_require_a_session() {
    let app = test_app().await;

    let (status, _) = send(&app, Method::GET, "/api/role-catalog", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mutations_from_foreign_origin_are_blocked() {
    let app = test_app().await;
    let request = Request::builder()
        .method(Method::PUT)
        .uri(format!("/api/users/{}/roles", app.newcomer))
        .header(header::ORIGIN, "https://elsewhere.example")
        .header(header::CONTENT_TYPE, "application/json")
        .header(TEST_USER_HEADER, app.moderator.to_string())
        .body(Body::from(
            json!({"category_machine_name": "ops", "role": "editor"}).to_string(),
        ))
        .unwrap_or_else(|error| panic!("{error}"));

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .unwrap_or_else(|error| panic!("{error}"));

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn moderator_grants_editor_and_sees_it_in_the_tree() {
    let app = test_app().await;
    let uri = format!("/api/users/{}/roles", app.newcomer);

    let (status, record) = send(
        &app,
        Method::PUT,
        uri.as_str(),
        Some(app.moderator),
        Some(json!({"category_machine_name": "ops", "role": "editor"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["category"], "ops");
    assert_eq!(record["old_role"], Value::Null);
    assert_eq!(record["new_role"], "editor");

    let tree_uri = format!("/api/users/{}/role-tree", app.newcomer);
    let (status, tree) = send(
        &app,
        Method::GET,
        tree_uri.as_str(),
        Some(app.moderator),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ops = &tree["children"][0];
    assert_eq!(ops["machine_name"], "ops");
    assert_eq!(ops["none_checked"], false);
    assert_eq!(ops["roles"][1]["machine_name"], "editor");
    assert_eq!(ops["roles"][1]["checked"], true);
}

#[tokio::test]
async fn sole_superuser_stepping_down_is_rejected_with_error_tag() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::PUT,
        format!("/api/users/{}/roles", app.sysadmin).as_str(),
        Some(app.sysadmin),
        Some(json!({"category_machine_name": "root", "role": "none"})),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_tag"], "ErrorCancelSysadmin");
}

#[tokio::test]
async fn invisible_subject_yields_no_content() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::GET,
        format!("/api/users/{}/role-tree", app.newcomer).as_str(),
        Some(app.editor),
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn malformed_subject_id_is_a_bad_request() {
    let app = test_app().await;

    let (status, _) = send(
        &app,
        Method::PUT,
        "/api/users/not-a-user/roles",
        Some(app.sysadmin),
        Some(json!({"category_machine_name": "ops", "role": "editor"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn role_form_applies_the_differing_category() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        format!("/api/users/{}/role-form", app.newcomer).as_str(),
        Some(app.moderator),
        Some(json!({
            "selections": [
                {"category_machine_name": "ops", "role": "editor"}
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"]["new_role"], "editor");
    assert_eq!(body["skipped_categories"], json!([]));
}

#[tokio::test]
async fn rejected_role_form_still_reports_skipped_categories() {
    let app = test_app().await;

    let (status, body) = send(
        &app,
        Method::POST,
        format!("/api/users/{}/role-form", app.newcomer).as_str(),
        Some(app.editor),
        Some(json!({
            "selections": [
                {"category_machine_name": "ops", "role": "moderator"},
                {"category_machine_name": "root", "role": "admin"}
            ]
        })),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_tag"], "ErrorUpdateToHigherRankRole");
    assert_eq!(body["skipped_categories"], json!(["root"]));
}

#[tokio::test]
async fn only_superusers_extend_the_catalog() {
    let app = test_app().await;
    let payload = json!({
        "machine_name": "subtitles",
        "parent_machine_name": "root",
        "sibling_weight": 30
    });

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/role-categories",
        Some(app.editor),
        Some(payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, created) = send(
        &app,
        Method::POST,
        "/api/role-categories",
        Some(app.sysadmin),
        Some(payload),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["machine_name"], "subtitles");

    let (status, role) = send(
        &app,
        Method::POST,
        "/api/roles",
        Some(app.sysadmin),
        Some(json!({
            "category_machine_name": "subtitles",
            "machine_name": "captioner",
            "rank_weight": 10
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(role["display_name"], "captioner");

    let (status, catalog) = send(
        &app,
        Method::GET,
        "/api/role-catalog",
        Some(app.sysadmin),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = catalog["categories"]
        .as_array()
        .map(|categories| {
            categories
                .iter()
                .filter_map(|category| category["machine_name"].as_str())
                .collect()
        })
        .unwrap_or_default();
    assert_eq!(names, vec!["root", "ops", "subtitles"]);
}
