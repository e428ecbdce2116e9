//! Role and ownership checks, evaluated per request. Anything not explicitly
//! allowed below is denied.

use thiserror::Error;

use crate::db::{Ticket, TicketScope};
use crate::identity::{Actor, Role};
use crate::lifecycle::TicketStatus;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Access denied: {0}")]
pub struct AccessDenied(pub String);

#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    CreateTicket,
    ReadTicket(&'a Ticket),
    AssignEngineer,
    Transition { ticket: &'a Ticket, to: TicketStatus },
    AddServiceLog(&'a Ticket),
    ListEngineers,
    ManageUsers,
}

impl Operation<'_> {
    fn name(&self) -> String {
        match self {
            Operation::CreateTicket => "create ticket".to_string(),
            Operation::ReadTicket(_) => "read ticket".to_string(),
            Operation::AssignEngineer => "assign engineer".to_string(),
            Operation::Transition { to, .. } => format!("move ticket to {}", to),
            Operation::AddServiceLog(_) => "add service log".to_string(),
            Operation::ListEngineers => "list engineers".to_string(),
            Operation::ManageUsers => "manage users".to_string(),
        }
    }
}

pub fn authorize(actor: &Actor, operation: Operation<'_>) -> Result<(), AccessDenied> {
    use TicketStatus::*;

    let allowed = match (actor.role, operation) {
        (Role::Customer, Operation::CreateTicket) => true,

        (Role::Customer, Operation::ReadTicket(ticket)) => actor.is(&ticket.created_by),
        (Role::Engineer, Operation::ReadTicket(ticket)) => {
            ticket.assigned_to.is_none() || ticket.is_assigned_to(&actor.id)
        }
        (Role::Admin, Operation::ReadTicket(_)) => true,

        (Role::Admin, Operation::AssignEngineer) => true,

        (Role::Engineer, Operation::Transition { ticket, to: InProgress | Resolved }) => {
            ticket.is_assigned_to(&actor.id)
        }
        (Role::Admin, Operation::Transition { to: Closed, .. }) => true,

        // Blocked only when the ticket belongs to another engineer
        (Role::Engineer, Operation::AddServiceLog(ticket)) => {
            ticket.assigned_to.is_none() || ticket.is_assigned_to(&actor.id)
        }

        (Role::Admin, Operation::ListEngineers) => true,
        (Role::Admin, Operation::ManageUsers) => true,

        _ => false,
    };

    if allowed {
        Ok(())
    } else {
        tracing::debug!("Denied {} for {} {}", operation.name(), actor.role, actor.id);
        Err(AccessDenied(format!("{} may not {}", actor.role, operation.name())))
    }
}

/// The slice of tickets a listing by `actor` may return.
pub fn list_scope(actor: &Actor) -> TicketScope {
    match actor.role {
        Role::Customer => TicketScope::CreatedBy(actor.id.clone()),
        Role::Engineer => TicketScope::AssignedTo(actor.id.clone()),
        Role::Admin => TicketScope::All,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Priority;
    use chrono::Utc;

    fn ticket(created_by: &str, assigned_to: Option<&str>, status: TicketStatus) -> Ticket {
        Ticket {
            id: "t1".to_string(),
            code: "TKT-00001".to_string(),
            title: "Printer jam".to_string(),
            description: "Paper jam on tray 2".to_string(),
            priority: Priority::High,
            status,
            created_by: created_by.to_string(),
            assigned_to: assigned_to.map(String::from),
            attachment_url: None,
            resolved_at: None,
            history: vec![],
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn customer() -> Actor {
        Actor::new("c1", Role::Customer)
    }

    fn engineer() -> Actor {
        Actor::new("e1", Role::Engineer)
    }

    fn admin() -> Actor {
        Actor::new("a1", Role::Admin)
    }

    #[test]
    fn only_customers_create() {
        assert!(authorize(&customer(), Operation::CreateTicket).is_ok());
        assert!(authorize(&engineer(), Operation::CreateTicket).is_err());
        assert!(authorize(&admin(), Operation::CreateTicket).is_err());
    }

    #[test]
    fn customer_reads_only_own() {
        let own = ticket("c1", None, TicketStatus::Open);
        let other = ticket("c2", None, TicketStatus::Open);
        assert!(authorize(&customer(), Operation::ReadTicket(&own)).is_ok());
        assert!(authorize(&customer(), Operation::ReadTicket(&other)).is_err());
    }

    #[test]
    fn engineer_reads_unassigned_or_own_assignment() {
        let unassigned = ticket("c1", None, TicketStatus::Open);
        let mine = ticket("c1", Some("e1"), TicketStatus::Open);
        let theirs = ticket("c1", Some("e2"), TicketStatus::Open);
        assert!(authorize(&engineer(), Operation::ReadTicket(&unassigned)).is_ok());
        assert!(authorize(&engineer(), Operation::ReadTicket(&mine)).is_ok());
        assert!(authorize(&engineer(), Operation::ReadTicket(&theirs)).is_err());
    }

    #[test]
    fn admin_reads_anything() {
        let t = ticket("c9", Some("e9"), TicketStatus::Closed);
        assert!(authorize(&admin(), Operation::ReadTicket(&t)).is_ok());
    }

    #[test]
    fn only_admin_assigns() {
        assert!(authorize(&admin(), Operation::AssignEngineer).is_ok());
        assert!(authorize(&engineer(), Operation::AssignEngineer).is_err());
        assert!(authorize(&customer(), Operation::AssignEngineer).is_err());
    }

    #[test]
    fn assigned_engineer_starts_and_resolves() {
        let t = ticket("c1", Some("e1"), TicketStatus::Open);
        for to in [TicketStatus::InProgress, TicketStatus::Resolved] {
            assert!(authorize(&engineer(), Operation::Transition { ticket: &t, to }).is_ok());
            assert!(authorize(&admin(), Operation::Transition { ticket: &t, to }).is_err());
            assert!(authorize(&customer(), Operation::Transition { ticket: &t, to }).is_err());
        }
    }

    #[test]
    fn unassigned_engineer_cannot_transition() {
        let unassigned = ticket("c1", None, TicketStatus::Open);
        let theirs = ticket("c1", Some("e2"), TicketStatus::InProgress);
        let to = TicketStatus::InProgress;
        assert!(authorize(&engineer(), Operation::Transition { ticket: &unassigned, to }).is_err());
        let to = TicketStatus::Resolved;
        assert!(authorize(&engineer(), Operation::Transition { ticket: &theirs, to }).is_err());
    }

    #[test]
    fn only_admin_closes() {
        let t = ticket("c1", Some("e1"), TicketStatus::Resolved);
        let to = TicketStatus::Closed;
        assert!(authorize(&admin(), Operation::Transition { ticket: &t, to }).is_ok());
        assert!(authorize(&engineer(), Operation::Transition { ticket: &t, to }).is_err());
        assert!(authorize(&customer(), Operation::Transition { ticket: &t, to }).is_err());
    }

    #[test]
    fn nobody_reopens() {
        let t = ticket("c1", Some("e1"), TicketStatus::InProgress);
        let to = TicketStatus::Open;
        for actor in [customer(), engineer(), admin()] {
            assert!(authorize(&actor, Operation::Transition { ticket: &t, to }).is_err());
        }
    }

    #[test]
    fn service_logs_by_unblocked_engineer_only() {
        let unassigned = ticket("c1", None, TicketStatus::Open);
        let mine = ticket("c1", Some("e1"), TicketStatus::InProgress);
        let theirs = ticket("c1", Some("e2"), TicketStatus::InProgress);

        assert!(authorize(&engineer(), Operation::AddServiceLog(&unassigned)).is_ok());
        assert!(authorize(&engineer(), Operation::AddServiceLog(&mine)).is_ok());
        assert!(authorize(&engineer(), Operation::AddServiceLog(&theirs)).is_err());
        for actor in [customer(), admin()] {
            assert!(authorize(&actor, Operation::AddServiceLog(&mine)).is_err());
        }
    }

    #[test]
    fn admin_only_directory_operations() {
        assert!(authorize(&admin(), Operation::ListEngineers).is_ok());
        assert!(authorize(&admin(), Operation::ManageUsers).is_ok());
        for actor in [customer(), engineer()] {
            assert!(authorize(&actor, Operation::ListEngineers).is_err());
            assert!(authorize(&actor, Operation::ManageUsers).is_err());
        }
    }

    #[test]
    fn list_scope_by_role() {
        assert_eq!(list_scope(&customer()), TicketScope::CreatedBy("c1".to_string()));
        assert_eq!(list_scope(&engineer()), TicketScope::AssignedTo("e1".to_string()));
        assert_eq!(list_scope(&admin()), TicketScope::All);
    }

    #[test]
    fn denial_message_names_role_and_operation() {
        let err = authorize(&customer(), Operation::AssignEngineer).unwrap_err();
        assert_eq!(err.to_string(), "Access denied: customer may not assign engineer");
    }
}
