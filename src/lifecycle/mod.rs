pub mod state;
pub mod rules;
pub mod transitions;
pub mod assignment;

pub use state::*;
pub use rules::*;
pub use transitions::*;
pub use assignment::*;

use thiserror::Error;
use crate::db::DbError;
use crate::policy::AccessDenied;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("Cannot change status from {from} to {to}")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },

    #[error("{0} is not an active engineer")]
    InvalidEngineer(String),

    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error(transparent)]
    Db(#[from] DbError),
}
