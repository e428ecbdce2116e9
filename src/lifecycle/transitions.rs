use chrono::Utc;

use super::{can_transition, LifecycleError, TicketStatus, TransitionPermission};
use crate::db::{Database, HistoryEntry, NotificationCategory, StatusChange, Ticket};
use crate::identity::Actor;
use crate::notify::{emit, Notifier};

/// Moves tickets along the status graph.
///
/// Callers are expected to have authorized the actor already; this only
/// checks that the requested edge exists.
pub struct TransitionExecutor<'a> {
    db: &'a Database,
    notifier: &'a dyn Notifier,
}

impl<'a> TransitionExecutor<'a> {
    pub fn new(db: &'a Database, notifier: &'a dyn Notifier) -> Self {
        Self { db, notifier }
    }

    /// Move `ticket` to `target`, recording who did it.
    ///
    /// `ticket` is the snapshot the caller authorized against. If the stored
    /// ticket changed since that snapshot was read, nothing is written and
    /// the result is a conflict.
    pub fn transition(
        &self,
        ticket: &Ticket,
        target: TicketStatus,
        actor: &Actor,
    ) -> Result<Ticket, LifecycleError> {
        let current = ticket.status;

        if let TransitionPermission::Denied(reason) = can_transition(current, target) {
            tracing::debug!("Rejected transition on ticket {}: {}", ticket.id, reason);
            return Err(LifecycleError::InvalidTransition {
                from: current,
                to: target,
            });
        }

        let now = Utc::now();
        let resolved_at = (target == TicketStatus::Resolved && ticket.resolved_at.is_none()).then_some(now);

        let updated = self.db.save_transition(&StatusChange {
            ticket_id: ticket.id.clone(),
            expected_version: ticket.version,
            entry: HistoryEntry {
                from_status: current,
                to_status: target,
                changed_by: actor.id.clone(),
                changed_at: now,
            },
            resolved_at,
        })?;

        tracing::info!(
            "Ticket {} moved from {} to {} by {}",
            updated.id,
            current,
            target,
            actor.id
        );

        emit(
            self.notifier,
            &updated.created_by,
            &format!("Your ticket status changed to {}", target),
            NotificationCategory::Ticket,
        );

        Ok(updated)
    }
}
