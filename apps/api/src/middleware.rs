use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use catalogue_core::{AppError, UserIdentity};
use tower_sessions::Session;

use crate::error::ApiResult;
use crate::state::AppState;

/// Session key under which the identity service stores the signed-in user.
pub const SESSION_USER_KEY: &str = "user_identity";

/// Resolves the acting user from the session and exposes it as an extension.
pub async fn require_auth(
    session: Session,
    mut request: Request,
    next: Next,
) -> ApiResult<Response> {
    let Some(identity) = session
        .get::<UserIdentity>(SESSION_USER_KEY)
        .await
        .map_err(|error| AppError::Internal(format!("failed to read session identity: {error}")))?
    else {
        tracing::debug!(path = %request.uri().path(), "request without session identity");
        return Err(AppError::Unauthorized("authentication required".to_owned()).into());
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Rejects role mutations that do not originate from the catalogue frontend.
pub async fn require_same_origin_for_mutations(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    if mutates(request.method()) {
        check_origin(request.headers(), state.frontend_url.as_str())?;
    }

    Ok(next.run(request).await)
}

fn mutates(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

fn check_origin(headers: &HeaderMap, frontend_url: &str) -> Result<(), AppError> {
    let header_text = move |name: header::HeaderName| {
        headers.get(name).and_then(|value| value.to_str().ok())
    };

    if header_text(header::HeaderName::from_static("sec-fetch-site")) == Some("cross-site") {
        return Err(AppError::Unauthorized(
            "cross-site request blocked".to_owned(),
        ));
    }

    let origin_matches = header_text(header::ORIGIN) == Some(frontend_url);
    let referer_matches =
        header_text(header::REFERER).is_some_and(|referer| referer.starts_with(frontend_url));
    if origin_matches || referer_matches {
        return Ok(());
    }

    Err(AppError::Unauthorized("origin validation failed".to_owned()))
}
