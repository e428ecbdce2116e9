//! Request-level entry points. Every call takes the acting identity
//! explicitly, checks it against the policy, then hands off to the store,
//! the transition engine or the assignment manager.

pub mod error;

use std::sync::Arc;

pub use error::DeskError;

use crate::db::{
    CreateServiceLog, CreateTicket, CreateUser, Database, Notification, Priority, ServiceLog, Ticket,
    TicketFilter, TicketPage, User, UserStatus,
};
use crate::identity::{generate_token, Actor, Role};
use crate::lifecycle::{AssignmentManager, TicketStatus, TransitionExecutor};
use crate::notify::Notifier;
use crate::policy::{self, Operation};

pub const MIN_TITLE_CHARS: usize = 3;
pub const MIN_DESCRIPTION_CHARS: usize = 8;
pub const NOTIFICATION_LIMIT: u32 = 20;

#[derive(Debug, Clone, Default)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub priority: Option<String>,
    pub attachment_url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TicketQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Clone)]
pub struct ServiceDesk {
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
}

impl ServiceDesk {
    pub fn new(db: Arc<Database>, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Resolve a bearer credential to the acting identity.
    pub fn resolve_actor(&self, credential: Option<&str>) -> Result<Actor, DeskError> {
        let token = credential
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(DeskError::Unauthenticated)?;

        self.db.find_actor_by_token(token)?.ok_or(DeskError::Unauthenticated)
    }

    pub fn create_ticket(&self, actor: &Actor, input: NewTicket) -> Result<Ticket, DeskError> {
        policy::authorize(actor, Operation::CreateTicket)?;

        let title = input.title.trim();
        let description = input.description.trim();

        if title.chars().count() < MIN_TITLE_CHARS {
            return Err(DeskError::Validation(format!(
                "title must be at least {} characters",
                MIN_TITLE_CHARS
            )));
        }
        if description.chars().count() < MIN_DESCRIPTION_CHARS {
            return Err(DeskError::Validation(format!(
                "description must be at least {} characters",
                MIN_DESCRIPTION_CHARS
            )));
        }

        let priority = match input.priority.as_deref() {
            None => Priority::default(),
            Some(raw) => parse_priority(raw)?,
        };

        let attachment_url = input
            .attachment_url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        let ticket = self.db.create_ticket(&CreateTicket {
            title: title.to_string(),
            description: description.to_string(),
            priority,
            created_by: actor.id.clone(),
            attachment_url,
        })?;

        tracing::info!("Ticket {} ({}) created by {}", ticket.id, ticket.code, actor.id);
        Ok(ticket)
    }

    pub fn list_tickets(&self, actor: &Actor, query: TicketQuery) -> Result<TicketPage, DeskError> {
        let mut filter = TicketFilter::new(policy::list_scope(actor));

        filter.status = query.status.as_deref().map(parse_status).transpose()?;
        filter.priority = query.priority.as_deref().map(parse_priority).transpose()?;
        filter.search = query.search;
        if let Some(page) = query.page {
            filter.page = page.max(1);
        }
        if let Some(limit) = query.limit {
            filter.page_size = limit;
        }

        Ok(self.db.find_tickets(&filter)?)
    }

    /// Tickets the actor may not see are reported as not found.
    pub fn get_ticket(&self, actor: &Actor, ticket_id: &str) -> Result<Ticket, DeskError> {
        let ticket = self.db.get_ticket(ticket_id)?;

        if policy::authorize(actor, Operation::ReadTicket(&ticket)).is_err() {
            tracing::debug!("Masking ticket {} from {}", ticket_id, actor.id);
            return Err(DeskError::NotFound(format!("Ticket {}", ticket_id)));
        }

        Ok(ticket)
    }

    pub fn assign(&self, actor: &Actor, ticket_ref: &str, engineer_id: &str) -> Result<Ticket, DeskError> {
        if ticket_ref.trim().is_empty() {
            return Err(DeskError::Validation("Ticket ID is required".to_string()));
        }
        if engineer_id.trim().is_empty() {
            return Err(DeskError::Validation("Engineer ID is required".to_string()));
        }

        let manager = AssignmentManager::new(&self.db, self.db.as_ref(), self.notifier.as_ref());
        Ok(manager.assign(ticket_ref.trim(), engineer_id.trim(), actor)?)
    }

    pub fn transition(&self, actor: &Actor, ticket_id: &str, desired: &str) -> Result<Ticket, DeskError> {
        let target = parse_status(desired)?;
        let ticket = self.db.get_ticket(ticket_id)?;

        policy::authorize(actor, Operation::Transition { ticket: &ticket, to: target })?;

        let executor = TransitionExecutor::new(&self.db, self.notifier.as_ref());
        Ok(executor.transition(&ticket, target, actor)?)
    }

    /// Record a work note. Engineers may log against a ticket unless it is
    /// assigned to another engineer.
    pub fn add_service_log(&self, actor: &Actor, ticket_id: &str, work_note: &str) -> Result<ServiceLog, DeskError> {
        if ticket_id.trim().is_empty() {
            return Err(DeskError::Validation("Ticket ID is required".to_string()));
        }
        if work_note.trim().is_empty() {
            return Err(DeskError::Validation("workNote is required".to_string()));
        }

        let ticket = self.db.get_ticket(ticket_id.trim())?;
        policy::authorize(actor, Operation::AddServiceLog(&ticket))?;

        let log = self.db.create_service_log(&CreateServiceLog {
            ticket_id: ticket.id.clone(),
            engineer_id: actor.id.clone(),
            work_note: work_note.to_string(),
        })?;

        tracing::info!("Service log {} added to ticket {} by {}", log.id, ticket.id, actor.id);
        Ok(log)
    }

    /// Work notes for a ticket the actor can see, newest first.
    pub fn service_logs(&self, actor: &Actor, ticket_id: &str) -> Result<Vec<ServiceLog>, DeskError> {
        let ticket = self.get_ticket(actor, ticket_id)?;
        Ok(self.db.get_service_logs(&ticket.id)?)
    }

    pub fn me(&self, actor: &Actor) -> Result<User, DeskError> {
        Ok(self.db.get_user(&actor.id)?)
    }

    /// Only the display name is self-editable.
    pub fn update_me(&self, actor: &Actor, name: &str) -> Result<User, DeskError> {
        Ok(self.db.update_user_name(&actor.id, name)?)
    }

    /// Enable or disable an identity. Disabled identities can no longer
    /// authenticate. Admins cannot disable themselves.
    pub fn set_user_status(&self, actor: &Actor, user_id: &str, status: &str) -> Result<User, DeskError> {
        policy::authorize(actor, Operation::ManageUsers)?;

        let status = UserStatus::parse(status.trim())
            .ok_or_else(|| DeskError::Validation(format!("unknown user status: {}", status)))?;

        if status == UserStatus::Disabled && actor.is(user_id) {
            return Err(DeskError::Validation("cannot disable your own account".to_string()));
        }

        let user = self.db.set_user_status(user_id, status)?;
        tracing::info!("User {} set to {} by {}", user.id, status.as_str(), actor.id);
        Ok(user)
    }

    pub fn list_engineers(&self, actor: &Actor) -> Result<Vec<User>, DeskError> {
        policy::authorize(actor, Operation::ListEngineers)?;
        Ok(self.db.get_users_by_role(Role::Engineer)?)
    }

    /// Register an identity. Returns the user and the bearer token issued
    /// for it; the token is not retrievable afterwards.
    pub fn create_user(&self, actor: &Actor, input: NewUser) -> Result<(User, String), DeskError> {
        policy::authorize(actor, Operation::ManageUsers)?;

        let role = Role::parse(input.role.trim())
            .ok_or_else(|| DeskError::Validation(format!("unknown role: {}", input.role)))?;

        let token = generate_token();
        let user = self.db.create_user(&CreateUser {
            name: input.name,
            email: input.email,
            role,
            api_token: token.clone(),
        })?;

        tracing::info!("User {} created with role {} by {}", user.id, role, actor.id);
        Ok((user, token))
    }

    pub fn notifications(&self, actor: &Actor) -> Result<Vec<Notification>, DeskError> {
        Ok(self.db.get_notifications(&actor.id, NOTIFICATION_LIMIT)?)
    }

    pub fn mark_notification_read(&self, actor: &Actor, notification_id: &str) -> Result<(), DeskError> {
        Ok(self.db.mark_notification_read(notification_id, &actor.id)?)
    }
}

fn parse_status(raw: &str) -> Result<TicketStatus, DeskError> {
    TicketStatus::parse(raw.trim())
        .ok_or_else(|| DeskError::Validation(format!("unknown status: {}", raw)))
}

fn parse_priority(raw: &str) -> Result<Priority, DeskError> {
    Priority::parse(raw).ok_or_else(|| DeskError::Validation(format!("unknown priority: {}", raw)))
}
