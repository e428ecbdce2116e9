use axum::{
    extract::{rejection::{JsonRejection, QueryRejection}, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};

use crate::db::{Notification, ServiceLog, Ticket, TicketFilter, TicketPage, TicketScope, User};
use crate::identity::Actor;
use super::error::{ApiResult, AppError};
use super::state::AppState;
use super::types::*;

// ===== Health =====

pub async fn health() -> &'static str {
    "ok"
}

pub async fn health_detailed(
    State(state): State<AppState>,
) -> ApiResult<Json<serde_json::Value>> {
    let mut filter = TicketFilter::new(TicketScope::All);
    filter.page_size = 1;

    let (database, ticket_count) = match state.desk.db().find_tickets(&filter) {
        Ok(page) => ("connected", Some(page.total)),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            ("unavailable", None)
        }
    };

    Ok(Json(serde_json::json!({
        "status": if ticket_count.is_some() { "ok" } else { "degraded" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": database,
        "ticketCount": ticket_count,
        "uptimeSecs": state.started_at.elapsed().as_secs(),
    })))
}

// ===== Tickets =====

pub async fn create_ticket(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<CreateTicketRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Ticket>)> {
    let Json(req) = payload?;
    let ticket = state.desk.create_ticket(&actor, req.into())?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

pub async fn list_tickets(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    query: Result<Query<ListTicketsQuery>, QueryRejection>,
) -> ApiResult<Json<TicketPage>> {
    let Query(query) = query.map_err(|e| AppError::validation(e.body_text()))?;
    let page = state.desk.list_tickets(&actor, query.into())?;
    Ok(Json(page))
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Json<Ticket>> {
    let ticket = state.desk.get_ticket(&actor, &ticket_id)?;
    Ok(Json(ticket))
}

pub async fn assign_ticket(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<AssignTicketRequest>, JsonRejection>,
) -> ApiResult<Json<Ticket>> {
    let Json(req) = payload?;
    let ticket = state.desk.assign(&actor, &req.ticket_id, &req.engineer_id)?;
    Ok(Json(ticket))
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(ticket_id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> ApiResult<Json<Ticket>> {
    let Json(req) = payload?;
    let ticket = state.desk.transition(&actor, &ticket_id, &req.status)?;
    Ok(Json(ticket))
}

// ===== Service Logs =====

pub async fn add_service_log(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<AddServiceLogRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ServiceLog>)> {
    let Json(req) = payload?;
    let log = state.desk.add_service_log(&actor, &req.ticket_id, &req.work_note)?;
    Ok((StatusCode::CREATED, Json(log)))
}

pub async fn list_service_logs(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(ticket_id): Path<String>,
) -> ApiResult<Json<Vec<ServiceLog>>> {
    Ok(Json(state.desk.service_logs(&actor, &ticket_id)?))
}

// ===== Users =====

pub async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.desk.me(&actor)?))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<UpdateMeRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(req) = payload?;
    Ok(Json(state.desk.update_me(&actor, &req.name)?))
}

pub async fn update_user_status(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(user_id): Path<String>,
    payload: Result<Json<UpdateUserStatusRequest>, JsonRejection>,
) -> ApiResult<Json<User>> {
    let Json(req) = payload?;
    Ok(Json(state.desk.set_user_status(&actor, &user_id, &req.status)?))
}

pub async fn list_engineers(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.desk.list_engineers(&actor)?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CreateUserResponse>)> {
    let Json(req) = payload?;
    let (user, api_token) = state.desk.create_user(&actor, req.into())?;
    Ok((StatusCode::CREATED, Json(CreateUserResponse { user, api_token })))
}

// ===== Notifications =====

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(state.desk.notifications(&actor)?))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(notification_id): Path<String>,
) -> ApiResult<Json<MarkReadResponse>> {
    state.desk.mark_notification_read(&actor, &notification_id)?;
    Ok(Json(MarkReadResponse {
        id: notification_id,
        read: true,
    }))
}
