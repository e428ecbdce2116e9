use super::LifecycleError;
use crate::db::{Database, DbError, NotificationCategory, Ticket};
use crate::identity::Actor;
use crate::notify::{emit, Notifier};
use crate::policy::{authorize, Operation};

/// Answers whether an id names an engineer who can take work.
pub trait EngineerDirectory {
    fn engineer_exists(&self, engineer_id: &str) -> Result<bool, DbError>;
}

impl EngineerDirectory for Database {
    fn engineer_exists(&self, engineer_id: &str) -> Result<bool, DbError> {
        self.is_active_engineer(engineer_id)
    }
}

pub struct AssignmentManager<'a> {
    db: &'a Database,
    directory: &'a dyn EngineerDirectory,
    notifier: &'a dyn Notifier,
}

impl<'a> AssignmentManager<'a> {
    pub fn new(db: &'a Database, directory: &'a dyn EngineerDirectory, notifier: &'a dyn Notifier) -> Self {
        Self { db, directory, notifier }
    }

    /// Bind `engineer_id` to the ticket named by `ticket_ref` (id or code).
    ///
    /// Any previous assignee is overwritten. Status and history are not
    /// touched.
    pub fn assign(&self, ticket_ref: &str, engineer_id: &str, actor: &Actor) -> Result<Ticket, LifecycleError> {
        authorize(actor, Operation::AssignEngineer)?;

        let ticket = self.db.get_ticket_by_ref(ticket_ref)?;

        if !self.directory.engineer_exists(engineer_id)? {
            return Err(LifecycleError::InvalidEngineer(engineer_id.to_string()));
        }

        if let Some(previous) = ticket.assigned_to.as_deref().filter(|p| *p != engineer_id) {
            tracing::info!(
                "Reassigning ticket {} from {} to {}",
                ticket.id,
                previous,
                engineer_id
            );
        }

        let updated = self.db.set_assignee(&ticket.id, engineer_id)?;
        tracing::info!("Ticket {} assigned to {} by {}", updated.id, engineer_id, actor.id);

        emit(
            self.notifier,
            engineer_id,
            "A ticket has been assigned to you",
            NotificationCategory::Ticket,
        );

        Ok(updated)
    }
}
