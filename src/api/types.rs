use serde::{Deserialize, Serialize};
use crate::db::User;
use crate::service::{NewTicket, NewUser, TicketQuery};

// ===== Ticket Types =====

/// Priority stays a string here so unknown values surface as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub title: String,
    pub description: String,
    pub priority: Option<String>,
    pub attachment_url: Option<String>,
}

impl From<CreateTicketRequest> for NewTicket {
    fn from(req: CreateTicketRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            priority: req.priority,
            attachment_url: req.attachment_url,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTicketsQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl From<ListTicketsQuery> for TicketQuery {
    fn from(q: ListTicketsQuery) -> Self {
        Self {
            status: q.status.filter(|s| !s.is_empty()),
            priority: q.priority.filter(|p| !p.is_empty()),
            search: q.search.filter(|s| !s.trim().is_empty()),
            page: q.page,
            limit: q.limit,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignTicketRequest {
    pub ticket_id: String,
    pub engineer_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
}

// ===== Service Log Types =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddServiceLogRequest {
    pub ticket_id: String,
    pub work_note: String,
}

// ===== User Types =====

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub role: String,
}

impl From<CreateUserRequest> for NewUser {
    fn from(req: CreateUserRequest) -> Self {
        Self {
            name: req.name,
            email: req.email,
            role: req.role,
        }
    }
}

/// Returned once, at creation. Only a digest of the token is stored, so it
/// cannot be fetched again.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserResponse {
    #[serde(flatten)]
    pub user: User,
    pub api_token: String,
}

// ===== Notification Types =====

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub id: String,
    pub read: bool,
}
