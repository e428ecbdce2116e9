//! Database schema definitions and migrations

pub const SCHEMA_VERSION: i32 = 1;

/// Initial schema creation SQL
pub const CREATE_TABLES: &str = r#"
-- Identities (customers, engineers, admins)
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL CHECK(role IN ('customer', 'engineer', 'admin')),
    status TEXT NOT NULL DEFAULT 'active' CHECK(status IN ('active', 'disabled')),
    -- SHA-256 hex digest of the bearer token
    api_token_hash TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);

-- Tickets table
-- version is bumped on every status change and assignment; writers compare
-- it to detect lost races.
CREATE TABLE IF NOT EXISTS tickets (
    id TEXT PRIMARY KEY NOT NULL,
    code TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    priority TEXT NOT NULL DEFAULT 'medium' CHECK(priority IN ('low', 'medium', 'high')),
    status TEXT NOT NULL DEFAULT 'open' CHECK(status IN ('open', 'in-progress', 'resolved', 'closed')),
    created_by TEXT NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    assigned_to TEXT REFERENCES users(id) ON DELETE SET NULL,
    attachment_url TEXT,
    resolved_at TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_tickets_created_by ON tickets(created_by, created_at);
CREATE INDEX IF NOT EXISTS idx_tickets_assigned_to ON tickets(assigned_to, created_at) WHERE assigned_to IS NOT NULL;
CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
CREATE INDEX IF NOT EXISTS idx_tickets_code ON tickets(code);

-- Status history (append-only)
CREATE TABLE IF NOT EXISTS ticket_history (
    ticket_id TEXT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
    seq INTEGER NOT NULL,
    status_from TEXT NOT NULL CHECK(status_from IN ('open', 'in-progress', 'resolved', 'closed')),
    status_to TEXT NOT NULL CHECK(status_to IN ('open', 'in-progress', 'resolved', 'closed')),
    changed_by TEXT NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    changed_at TEXT NOT NULL,
    PRIMARY KEY (ticket_id, seq),
    CHECK(status_from <> status_to)
);

-- Engineer work notes on a ticket
CREATE TABLE IF NOT EXISTS service_logs (
    id TEXT PRIMARY KEY NOT NULL,
    ticket_id TEXT NOT NULL REFERENCES tickets(id) ON DELETE CASCADE,
    engineer_id TEXT NOT NULL REFERENCES users(id) ON DELETE RESTRICT,
    work_note TEXT NOT NULL CHECK(length(trim(work_note)) > 0),
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_service_logs_ticket ON service_logs(ticket_id);

-- In-app notifications
CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY NOT NULL,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    message TEXT NOT NULL,
    category TEXT NOT NULL DEFAULT 'ticket' CHECK(category IN ('ticket', 'amc', 'system')),
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, created_at);

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY NOT NULL
);
"#;
