use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::service::DeskError;

/// API error codes for client handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    NotFound,
    Unauthorized,
    Forbidden,
    InvalidTransition,
    InvalidEngineer,
    ValidationError,
    Conflict,
    Unavailable,
}

/// Standard API error response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub error: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

pub type ApiResult<T> = Result<T, AppError>;

/// Application error that converts to HTTP responses
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub body: ApiError,
}

impl AppError {
    pub fn new(status: StatusCode, body: ApiError) -> Self {
        Self { status, body }
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            ApiError::new(ErrorCode::Unauthorized, "Authentication required"),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ApiError::new(ErrorCode::ValidationError, message),
        )
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<DeskError> for AppError {
    fn from(err: DeskError) -> Self {
        let message = err.to_string();
        match err {
            DeskError::Unauthenticated => Self::unauthorized(),
            DeskError::AccessDenied(_) => Self::new(
                StatusCode::FORBIDDEN,
                ApiError::new(ErrorCode::Forbidden, message),
            ),
            DeskError::NotFound(_) => Self::new(
                StatusCode::NOT_FOUND,
                ApiError::new(ErrorCode::NotFound, message),
            ),
            DeskError::InvalidTransition { from, to } => Self::new(
                StatusCode::BAD_REQUEST,
                ApiError::new(ErrorCode::InvalidTransition, message)
                    .with_details(serde_json::json!({ "from": from, "to": to })),
            ),
            DeskError::InvalidEngineer(_) => Self::new(
                StatusCode::BAD_REQUEST,
                ApiError::new(ErrorCode::InvalidEngineer, message),
            ),
            DeskError::Validation(_) => Self::validation(message),
            DeskError::Conflict(_) => Self::new(
                StatusCode::CONFLICT,
                ApiError::new(ErrorCode::Conflict, message),
            ),
            DeskError::Unavailable(_) => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                ApiError::new(ErrorCode::Unavailable, "Service temporarily unavailable"),
            ),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::validation(rejection.body_text())
    }
}
