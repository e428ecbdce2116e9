use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::Role;
use crate::lifecycle::TicketStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Case-insensitive, surrounding whitespace ignored.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub from_status: TicketStatus,
    pub to_status: TicketStatus,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub code: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub created_by: String,
    pub assigned_to: Option<String>,
    pub attachment_url: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub history: Vec<HistoryEntry>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.assigned_to.as_deref() == Some(user_id)
    }
}

/// Input for the store. Fields are expected to be validated already.
#[derive(Debug, Clone)]
pub struct CreateTicket {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub created_by: String,
    pub attachment_url: Option<String>,
}

/// A status change ready to be persisted.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub ticket_id: String,
    pub expected_version: i64,
    pub entry: HistoryEntry,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Which tickets a listing may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketScope {
    All,
    CreatedBy(String),
    AssignedTo(String),
}

#[derive(Debug, Clone)]
pub struct TicketFilter {
    pub scope: TicketScope,
    pub status: Option<TicketStatus>,
    pub priority: Option<Priority>,
    pub search: Option<String>,
    pub page: u32,
    pub page_size: u32,
}

impl TicketFilter {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn new(scope: TicketScope) -> Self {
        Self {
            scope,
            status: None,
            priority: None,
            search: None,
            page: 1,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    /// Rows to skip. Widened so any `page` fits without overflow.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.max(1) - 1) * u64::from(self.limit())
    }

    pub fn limit(&self) -> u32 {
        self.page_size.clamp(1, Self::MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPage {
    pub total: u64,
    pub page: u32,
    pub pages: u64,
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Disabled,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Disabled => "disabled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(UserStatus::Active),
            "disabled" => Some(UserStatus::Disabled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

/// `api_token` is the plaintext bearer token; only its digest is stored.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub api_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceLog {
    pub id: String,
    pub ticket_id: String,
    pub engineer_id: String,
    pub engineer_name: String,
    pub work_note: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateServiceLog {
    pub ticket_id: String,
    pub engineer_id: String,
    pub work_note: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationCategory {
    Ticket,
    Amc,
    System,
}

impl NotificationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationCategory::Ticket => "ticket",
            NotificationCategory::Amc => "amc",
            NotificationCategory::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ticket" => Some(NotificationCategory::Ticket),
            "amc" => Some(NotificationCategory::Amc),
            "system" => Some(NotificationCategory::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub message: String,
    pub category: NotificationCategory,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateNotification {
    pub user_id: String,
    pub message: String,
    pub category: NotificationCategory,
}
