use thiserror::Error;

use crate::db::DbError;
use crate::lifecycle::{LifecycleError, TicketStatus};
use crate::policy::AccessDenied;

/// Errors surfaced to callers of [`super::ServiceDesk`].
#[derive(Error, Debug)]
pub enum DeskError {
    #[error("Authentication required")]
    Unauthenticated,

    #[error("{0}")]
    AccessDenied(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },

    #[error("Invalid engineer: {0}")]
    InvalidEngineer(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    /// Storage failed; the request may be retried.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<DbError> for DeskError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(what) => Self::NotFound(what),
            DbError::Validation(msg) => Self::Validation(msg),
            DbError::Conflict(msg) => Self::Conflict(msg),
            other => {
                tracing::error!("Storage failure: {}", other);
                Self::Unavailable(other.to_string())
            }
        }
    }
}

impl From<AccessDenied> for DeskError {
    fn from(err: AccessDenied) -> Self {
        Self::AccessDenied(err.to_string())
    }
}

impl From<LifecycleError> for DeskError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            LifecycleError::InvalidEngineer(id) => Self::InvalidEngineer(id),
            LifecycleError::AccessDenied(denied) => denied.into(),
            LifecycleError::Db(db) => db.into(),
        }
    }
}
