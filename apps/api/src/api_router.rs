use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post, put};
use catalogue_core::AppError;
use tower_http::trace::TraceLayer;
use tower_sessions::{SessionManagerLayer, SessionStore};

use crate::state::AppState;
use crate::{handlers, middleware};

mod cors;

use cors::build_cors_layer;

pub fn build_router<Store>(
    app_state: AppState,
    session_layer: SessionManagerLayer<Store>,
) -> Result<Router, AppError>
where
    Store: SessionStore + Clone,
{
    let frontend_url = app_state.frontend_url.clone();

    Ok(routes(app_state.clone(), frontend_url.as_str())?
        .layer(session_layer)
        .with_state(app_state))
}

fn routes(app_state: AppState, frontend_url: &str) -> Result<Router<AppState>, AppError> {
    let protected_routes = Router::new()
        .route(
            "/api/role-catalog",
            get(handlers::roles::role_catalog_handler),
        )
        .route(
            "/api/role-categories",
            post(handlers::roles::create_role_category_handler),
        )
        .route("/api/roles", post(handlers::roles::create_role_handler))
        .route(
            "/api/users/{subject_id}/roles",
            put(handlers::roles::change_role_handler),
        )
        .route(
            "/api/users/{subject_id}/role-form",
            post(handlers::roles::apply_role_form_handler),
        )
        .route(
            "/api/users/{subject_id}/role-tree",
            get(handlers::roles::role_tree_handler),
        )
        .route_layer(from_fn(middleware::require_auth));

    Ok(Router::new()
        .route("/health", get(handlers::health::health_handler))
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            app_state,
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(frontend_url)?))
}

#[cfg(test)]
mod tests;
