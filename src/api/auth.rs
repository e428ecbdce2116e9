use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::AppError;
use super::state::AppState;

const BEARER_PREFIX: &str = "Bearer ";

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix(BEARER_PREFIX))
}

/// Resolve the bearer token to an [`Actor`](crate::identity::Actor) and
/// make it available to handlers as a request extension.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = bearer_token(&request);

    match state.desk.resolve_actor(token) {
        Ok(actor) => {
            tracing::debug!(
                "{} {} as {} {}",
                request.method(),
                request.uri().path(),
                actor.role,
                actor.id
            );
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Err(e) => {
            tracing::warn!(
                "Rejected {} {}: {}",
                request.method(),
                request.uri().path(),
                e
            );
            AppError::from(e).into_response()
        }
    }
}
