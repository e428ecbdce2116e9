use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use super::auth::auth_middleware;
use super::handlers::*;
use super::state::AppState;

pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health))
        .route("/health/detailed", get(health_detailed));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        // Tickets
        .route("/v1/tickets", post(create_ticket).get(list_tickets))
        .route("/v1/tickets/assign", patch(assign_ticket))
        .route("/v1/tickets/:ticket_id", get(get_ticket))
        .route("/v1/tickets/:ticket_id/status", patch(update_status))

        // Service logs
        .route("/v1/service-logs", post(add_service_log))
        .route("/v1/service-logs/:ticket_id", get(list_service_logs))

        // Users
        .route("/v1/users", post(create_user))
        .route("/v1/users/me", get(me).patch(update_me))
        .route("/v1/users/engineers", get(list_engineers))
        .route("/v1/users/:user_id/status", patch(update_user_status))

        // Notifications
        .route("/v1/notifications", get(list_notifications))
        .route("/v1/notifications/:notification_id/read", patch(mark_notification_read))

        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    app.layer(cors)
}
