use rusqlite::{Connection, OptionalExtension};
use rusqlite::types::Value;
use crate::db::{Database, DbError, parse_datetime};
use crate::db::models::{
    CreateTicket, HistoryEntry, Priority, StatusChange, Ticket, TicketFilter, TicketPage, TicketScope,
};
use crate::lifecycle::TicketStatus;

const TICKET_COLUMNS: &str = r#"id, code, title, description, priority, status, created_by,
    assigned_to, attachment_url, resolved_at, version, created_at, updated_at"#;

impl Database {
    pub fn create_ticket(&self, ticket: &CreateTicket) -> Result<Ticket, DbError> {
        self.with_conn(|conn| {
            let ticket_id = uuid::Uuid::new_v4().to_string();
            let now = chrono::Utc::now();

            let count: i64 = conn.query_row("SELECT COUNT(*) FROM tickets", [], |row| row.get(0))?;
            let code = format!("TKT-{:05}", count + 1);

            conn.execute(
                r#"INSERT INTO tickets
                   (id, code, title, description, priority, status, created_by,
                    attachment_url, version, created_at, updated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)"#,
                rusqlite::params![
                    ticket_id,
                    code,
                    ticket.title,
                    ticket.description,
                    ticket.priority.as_str(),
                    TicketStatus::Open.as_str(),
                    ticket.created_by,
                    ticket.attachment_url,
                    now.to_rfc3339(),
                    now.to_rfc3339(),
                ],
            )?;

            Ok(Ticket {
                id: ticket_id,
                code,
                title: ticket.title.clone(),
                description: ticket.description.clone(),
                priority: ticket.priority,
                status: TicketStatus::Open,
                created_by: ticket.created_by.clone(),
                assigned_to: None,
                attachment_url: ticket.attachment_url.clone(),
                resolved_at: None,
                history: vec![],
                version: 0,
                created_at: now,
                updated_at: now,
            })
        })
    }

    pub fn get_ticket(&self, ticket_id: &str) -> Result<Ticket, DbError> {
        self.with_conn(|conn| Self::load_ticket(conn, ticket_id))
    }

    /// Find a ticket by its id or its human code.
    pub fn get_ticket_by_ref(&self, ticket_ref: &str) -> Result<Ticket, DbError> {
        self.with_conn(|conn| {
            let ticket_id: Option<String> = conn
                .query_row(
                    "SELECT id FROM tickets WHERE id = ?1 OR (code <> '' AND code = ?1) LIMIT 1",
                    [ticket_ref],
                    |row| row.get(0),
                )
                .optional()?;

            match ticket_id {
                Some(id) => Self::load_ticket(conn, &id),
                None => Err(DbError::NotFound(format!("Ticket {}", ticket_ref))),
            }
        })
    }

    pub fn find_tickets(&self, filter: &TicketFilter) -> Result<TicketPage, DbError> {
        self.with_conn(|conn| {
            let mut conditions: Vec<&str> = Vec::new();
            let mut values: Vec<Value> = Vec::new();

            match &filter.scope {
                TicketScope::All => {}
                TicketScope::CreatedBy(user_id) => {
                    conditions.push("created_by = ?");
                    values.push(Value::Text(user_id.clone()));
                }
                TicketScope::AssignedTo(user_id) => {
                    conditions.push("assigned_to = ?");
                    values.push(Value::Text(user_id.clone()));
                }
            }

            if let Some(status) = filter.status {
                conditions.push("status = ?");
                values.push(Value::Text(status.as_str().to_string()));
            }

            if let Some(priority) = filter.priority {
                conditions.push("priority = ?");
                values.push(Value::Text(priority.as_str().to_string()));
            }

            if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                conditions.push(
                    "(instr(fold(title), fold(?)) > 0 OR instr(fold(description), fold(?)) > 0 OR instr(fold(code), fold(?)) > 0)",
                );
                for _ in 0..3 {
                    values.push(Value::Text(search.to_string()));
                }
            }

            let where_clause = if conditions.is_empty() {
                String::new()
            } else {
                format!("WHERE {}", conditions.join(" AND "))
            };

            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM tickets {}", where_clause),
                rusqlite::params_from_iter(values.iter()),
                |row| row.get(0),
            )?;

            let limit = filter.limit();
            let mut page_values = values.clone();
            page_values.push(Value::Integer(i64::from(limit)));
            page_values.push(Value::Integer(i64::try_from(filter.offset()).unwrap_or(i64::MAX)));

            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM tickets {} ORDER BY rowid DESC LIMIT ? OFFSET ?",
                TICKET_COLUMNS, where_clause
            ))?;
            let mut tickets = stmt
                .query_map(rusqlite::params_from_iter(page_values.iter()), Self::map_ticket_row)?
                .collect::<Result<Vec<_>, _>>()?;

            for ticket in &mut tickets {
                ticket.history = Self::load_history(conn, &ticket.id)?;
            }

            let total = total.max(0) as u64;
            Ok(TicketPage {
                total,
                page: filter.page.max(1),
                pages: total.div_ceil(u64::from(limit)),
                tickets,
            })
        })
    }

    /// Apply a status change and its history entry in one transaction.
    ///
    /// The update only matches while the ticket still has `expected_version`
    /// and the entry's source status; otherwise nothing is written and
    /// `DbError::Conflict` is returned.
    pub fn save_transition(&self, change: &StatusChange) -> Result<Ticket, DbError> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let now = change.entry.changed_at.to_rfc3339();

            let affected = tx.execute(
                r#"UPDATE tickets
                   SET status = ?, resolved_at = COALESCE(resolved_at, ?),
                       version = version + 1, updated_at = ?
                   WHERE id = ? AND version = ? AND status = ?"#,
                rusqlite::params![
                    change.entry.to_status.as_str(),
                    change.resolved_at.map(|t| t.to_rfc3339()),
                    now,
                    change.ticket_id,
                    change.expected_version,
                    change.entry.from_status.as_str(),
                ],
            )?;

            if affected == 0 {
                let exists: bool = tx.query_row(
                    "SELECT EXISTS(SELECT 1 FROM tickets WHERE id = ?)",
                    [&change.ticket_id],
                    |row| row.get(0),
                )?;
                if !exists {
                    return Err(DbError::NotFound(format!("Ticket {}", change.ticket_id)));
                }
                return Err(DbError::Conflict(format!(
                    "Ticket {} was modified concurrently",
                    change.ticket_id
                )));
            }

            tx.execute(
                r#"INSERT INTO ticket_history (ticket_id, seq, status_from, status_to, changed_by, changed_at)
                   VALUES (?1, (SELECT COALESCE(MAX(seq), 0) + 1 FROM ticket_history WHERE ticket_id = ?1), ?2, ?3, ?4, ?5)"#,
                rusqlite::params![
                    change.ticket_id,
                    change.entry.from_status.as_str(),
                    change.entry.to_status.as_str(),
                    change.entry.changed_by,
                    now,
                ],
            )?;

            let ticket = Self::load_ticket(&tx, &change.ticket_id)?;
            tx.commit()?;
            Ok(ticket)
        })
    }

    /// Overwrite the assignee. Status and history are left alone.
    pub fn set_assignee(&self, ticket_id: &str, engineer_id: &str) -> Result<Ticket, DbError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                r#"UPDATE tickets
                   SET assigned_to = ?, version = version + 1, updated_at = ?
                   WHERE id = ?"#,
                rusqlite::params![engineer_id, chrono::Utc::now().to_rfc3339(), ticket_id],
            )?;

            if affected == 0 {
                return Err(DbError::NotFound(format!("Ticket {}", ticket_id)));
            }

            Self::load_ticket(conn, ticket_id)
        })
    }

    fn load_ticket(conn: &Connection, ticket_id: &str) -> Result<Ticket, DbError> {
        let mut ticket = conn
            .query_row(
                &format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS),
                [ticket_id],
                Self::map_ticket_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    DbError::NotFound(format!("Ticket {}", ticket_id))
                }
                other => DbError::Sqlite(other),
            })?;
        ticket.history = Self::load_history(conn, ticket_id)?;
        Ok(ticket)
    }

    fn load_history(conn: &Connection, ticket_id: &str) -> Result<Vec<HistoryEntry>, DbError> {
        let mut stmt = conn.prepare(
            r#"SELECT status_from, status_to, changed_by, changed_at
               FROM ticket_history WHERE ticket_id = ? ORDER BY seq"#,
        )?;
        let entries = stmt
            .query_map([ticket_id], |row| {
                Ok(HistoryEntry {
                    from_status: parse_status(row, 0)?,
                    to_status: parse_status(row, 1)?,
                    changed_by: row.get(2)?,
                    changed_at: parse_datetime(row.get(3)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn map_ticket_row(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let priority_str: String = row.get(4)?;
        let resolved_at: Option<String> = row.get(9)?;

        Ok(Ticket {
            id: row.get(0)?,
            code: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            priority: Priority::parse(&priority_str).unwrap_or_default(),
            status: parse_status(row, 5)?,
            created_by: row.get(6)?,
            assigned_to: row.get(7)?,
            attachment_url: row.get(8)?,
            resolved_at: resolved_at.map(parse_datetime),
            history: vec![],
            version: row.get(10)?,
            created_at: parse_datetime(row.get(11)?),
            updated_at: parse_datetime(row.get(12)?),
        })
    }
}

fn parse_status(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<TicketStatus> {
    let value: String = row.get(idx)?;
    TicketStatus::parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unknown ticket status '{}'", value).into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::db::models::CreateUser;
    use crate::identity::Role;

    fn create_test_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn create_user(db: &Database, email: &str, role: Role) -> String {
        db.create_user(&CreateUser {
            name: email.to_string(),
            email: email.to_string(),
            role,
            api_token: format!("token-{}", email),
        }).unwrap().id
    }

    fn create_ticket(db: &Database, owner: &str, title: &str) -> Ticket {
        db.create_ticket(&CreateTicket {
            title: title.to_string(),
            description: "Something is broken".to_string(),
            priority: Priority::Medium,
            created_by: owner.to_string(),
            attachment_url: None,
        }).unwrap()
    }

    fn change(ticket: &Ticket, to: TicketStatus, by: &str) -> StatusChange {
        let now = Utc::now();
        StatusChange {
            ticket_id: ticket.id.clone(),
            expected_version: ticket.version,
            entry: HistoryEntry {
                from_status: ticket.status,
                to_status: to,
                changed_by: by.to_string(),
                changed_at: now,
            },
            resolved_at: (to == TicketStatus::Resolved).then_some(now),
        }
    }

    #[test]
    fn create_ticket_defaults() {
        let db = create_test_db();
        let owner = create_user(&db, "c@example.com", Role::Customer);
        let ticket = create_ticket(&db, &owner, "Printer jam");

        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.created_by, owner);
        assert!(ticket.assigned_to.is_none());
        assert!(ticket.resolved_at.is_none());
        assert!(ticket.history.is_empty());
        assert_eq!(ticket.code, "TKT-00001");

        let second = create_ticket(&db, &owner, "Second");
        assert_eq!(second.code, "TKT-00002");
    }

    #[test]
    fn get_ticket_round_trip() {
        let db = create_test_db();
        let owner = create_user(&db, "c@example.com", Role::Customer);
        let ticket = create_ticket(&db, &owner, "Printer jam");

        let fetched = db.get_ticket(&ticket.id).unwrap();
        assert_eq!(fetched.id, ticket.id);
        assert_eq!(fetched.title, "Printer jam");
        assert_eq!(fetched.priority, Priority::Medium);
    }

    #[test]
    fn get_ticket_not_found() {
        let db = create_test_db();
        assert!(matches!(db.get_ticket("nope"), Err(DbError::NotFound(_))));
    }

    #[test]
    fn get_ticket_by_ref_accepts_id_or_code() {
        let db = create_test_db();
        let owner = create_user(&db, "c@example.com", Role::Customer);
        let ticket = create_ticket(&db, &owner, "Printer jam");

        assert_eq!(db.get_ticket_by_ref(&ticket.id).unwrap().id, ticket.id);
        assert_eq!(db.get_ticket_by_ref(&ticket.code).unwrap().id, ticket.id);
        assert!(matches!(db.get_ticket_by_ref(""), Err(DbError::NotFound(_))));
    }

    #[test]
    fn save_transition_appends_history_and_bumps_version() {
        let db = create_test_db();
        let owner = create_user(&db, "c@example.com", Role::Customer);
        let engineer = create_user(&db, "e@example.com", Role::Engineer);
        let ticket = create_ticket(&db, &owner, "Printer jam");

        let updated = db.save_transition(&change(&ticket, TicketStatus::InProgress, &engineer)).unwrap();
        assert_eq!(updated.status, TicketStatus::InProgress);
        assert_eq!(updated.version, ticket.version + 1);
        assert_eq!(updated.history.len(), 1);
        assert_eq!(updated.history[0].from_status, TicketStatus::Open);
        assert_eq!(updated.history[0].to_status, TicketStatus::InProgress);
        assert_eq!(updated.history[0].changed_by, engineer);
    }

    #[test]
    fn save_transition_stale_version_conflicts() {
        let db = create_test_db();
        let owner = create_user(&db, "c@example.com", Role::Customer);
        let engineer = create_user(&db, "e@example.com", Role::Engineer);
        let ticket = create_ticket(&db, &owner, "Printer jam");

        db.save_transition(&change(&ticket, TicketStatus::InProgress, &engineer)).unwrap();

        // Same stale snapshot again
        let result = db.save_transition(&change(&ticket, TicketStatus::InProgress, &engineer));
        assert!(matches!(result, Err(DbError::Conflict(_))));

        let current = db.get_ticket(&ticket.id).unwrap();
        assert_eq!(current.history.len(), 1);
    }

    #[test]
    fn save_transition_missing_ticket() {
        let db = create_test_db();
        let owner = create_user(&db, "c@example.com", Role::Customer);
        let mut ticket = create_ticket(&db, &owner, "Printer jam");
        ticket.id = "missing".to_string();

        let result = db.save_transition(&change(&ticket, TicketStatus::InProgress, &owner));
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[test]
    fn resolved_at_is_kept_once_set() {
        let db = create_test_db();
        let owner = create_user(&db, "c@example.com", Role::Customer);
        let engineer = create_user(&db, "e@example.com", Role::Engineer);
        let admin = create_user(&db, "a@example.com", Role::Admin);
        let ticket = create_ticket(&db, &owner, "Printer jam");

        let t = db.save_transition(&change(&ticket, TicketStatus::InProgress, &engineer)).unwrap();
        assert!(t.resolved_at.is_none());
        let t = db.save_transition(&change(&t, TicketStatus::Resolved, &engineer)).unwrap();
        let resolved_at = t.resolved_at.expect("resolved_at set");
        let t = db.save_transition(&change(&t, TicketStatus::Closed, &admin)).unwrap();
        assert_eq!(t.resolved_at, Some(resolved_at));
    }

    #[test]
    fn set_assignee_overwrites_without_history() {
        let db = create_test_db();
        let owner = create_user(&db, "c@example.com", Role::Customer);
        let e1 = create_user(&db, "e1@example.com", Role::Engineer);
        let e2 = create_user(&db, "e2@example.com", Role::Engineer);
        let ticket = create_ticket(&db, &owner, "Printer jam");

        let t = db.set_assignee(&ticket.id, &e1).unwrap();
        assert_eq!(t.assigned_to.as_deref(), Some(e1.as_str()));
        assert_eq!(t.version, ticket.version + 1);
        let t = db.set_assignee(&ticket.id, &e2).unwrap();
        assert_eq!(t.assigned_to.as_deref(), Some(e2.as_str()));
        assert_eq!(t.version, ticket.version + 2);
        assert!(t.history.is_empty());
        assert_eq!(t.status, TicketStatus::Open);
    }

    #[test]
    fn set_assignee_not_found() {
        let db = create_test_db();
        let engineer = create_user(&db, "e@example.com", Role::Engineer);
        assert!(matches!(db.set_assignee("nope", &engineer), Err(DbError::NotFound(_))));
    }

    #[test]
    fn find_tickets_scopes_by_owner_and_assignee() {
        let db = create_test_db();
        let c1 = create_user(&db, "c1@example.com", Role::Customer);
        let c2 = create_user(&db, "c2@example.com", Role::Customer);
        let engineer = create_user(&db, "e@example.com", Role::Engineer);

        let t1 = create_ticket(&db, &c1, "Mine one");
        create_ticket(&db, &c1, "Mine two");
        create_ticket(&db, &c2, "Theirs");
        db.set_assignee(&t1.id, &engineer).unwrap();

        let own = db.find_tickets(&TicketFilter::new(TicketScope::CreatedBy(c1.clone()))).unwrap();
        assert_eq!(own.total, 2);
        assert!(own.tickets.iter().all(|t| t.created_by == c1));

        let assigned = db.find_tickets(&TicketFilter::new(TicketScope::AssignedTo(engineer.clone()))).unwrap();
        assert_eq!(assigned.total, 1);
        assert_eq!(assigned.tickets[0].id, t1.id);

        let all = db.find_tickets(&TicketFilter::new(TicketScope::All)).unwrap();
        assert_eq!(all.total, 3);
    }

    #[test]
    fn find_tickets_filters_and_searches() {
        let db = create_test_db();
        let owner = create_user(&db, "c@example.com", Role::Customer);
        let engineer = create_user(&db, "e@example.com", Role::Engineer);

        let jam = create_ticket(&db, &owner, "Printer jam");
        create_ticket(&db, &owner, "Network down");
        db.save_transition(&change(&jam, TicketStatus::InProgress, &engineer)).unwrap();

        let mut filter = TicketFilter::new(TicketScope::All);
        filter.search = Some("PRINTER".to_string());
        let page = db.find_tickets(&filter).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tickets[0].id, jam.id);

        filter.search = Some("tkt-00002".to_string());
        let page = db.find_tickets(&filter).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tickets[0].title, "Network down");

        let mut filter = TicketFilter::new(TicketScope::All);
        filter.status = Some(TicketStatus::InProgress);
        let page = db.find_tickets(&filter).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tickets[0].history.len(), 1);

        filter.status = None;
        filter.priority = Some(Priority::High);
        assert_eq!(db.find_tickets(&filter).unwrap().total, 0);
    }

    #[test]
    fn search_folds_non_ascii_case() {
        let db = create_test_db();
        let owner = create_user(&db, "c@example.com", Role::Customer);
        let screen = create_ticket(&db, &owner, "ÉCRAN noir au démarrage");
        create_ticket(&db, &owner, "Clavier bloqué");

        let mut filter = TicketFilter::new(TicketScope::All);
        filter.search = Some("écran".to_string());
        let page = db.find_tickets(&filter).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.tickets[0].id, screen.id);
    }

    #[test]
    fn far_page_is_empty_and_store_stays_usable() {
        let db = create_test_db();
        let owner = create_user(&db, "c@example.com", Role::Customer);
        create_ticket(&db, &owner, "Printer jam");

        let mut filter = TicketFilter::new(TicketScope::All);
        filter.page = u32::MAX;
        filter.page_size = TicketFilter::MAX_PAGE_SIZE;
        let page = db.find_tickets(&filter).unwrap();
        assert_eq!(page.total, 1);
        assert!(page.tickets.is_empty());

        assert_eq!(db.find_tickets(&TicketFilter::new(TicketScope::All)).unwrap().tickets.len(), 1);
    }

    #[test]
    fn find_tickets_paginates_newest_first() {
        let db = create_test_db();
        let owner = create_user(&db, "c@example.com", Role::Customer);
        for i in 0..5 {
            create_ticket(&db, &owner, &format!("Ticket {}", i));
        }

        let mut filter = TicketFilter::new(TicketScope::All);
        filter.page_size = 2;
        let first = db.find_tickets(&filter).unwrap();
        assert_eq!(first.total, 5);
        assert_eq!(first.pages, 3);
        assert_eq!(first.tickets.len(), 2);
        assert_eq!(first.tickets[0].title, "Ticket 4");

        filter.page = 3;
        let last = db.find_tickets(&filter).unwrap();
        assert_eq!(last.page, 3);
        assert_eq!(last.tickets.len(), 1);
        assert_eq!(last.tickets[0].title, "Ticket 0");
    }
}
