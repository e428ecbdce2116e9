use crate::db::{Database, DbError, parse_datetime};
use crate::db::models::{CreateServiceLog, ServiceLog};

impl Database {
    pub fn create_service_log(&self, log: &CreateServiceLog) -> Result<ServiceLog, DbError> {
        let work_note = log.work_note.trim();
        if work_note.is_empty() {
            return Err(DbError::Validation("workNote is required".to_string()));
        }

        self.with_conn(|conn| {
            let engineer_name: String = conn
                .query_row(
                    "SELECT name FROM users WHERE id = ?",
                    [&log.engineer_id],
                    |row| row.get(0),
                )
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => {
                        DbError::NotFound(format!("User {}", log.engineer_id))
                    }
                    other => DbError::Sqlite(other),
                })?;

            let log_id = uuid::Uuid::new_v4().to_string();
            let now = chrono::Utc::now();

            conn.execute(
                r#"INSERT INTO service_logs (id, ticket_id, engineer_id, work_note, created_at)
                   VALUES (?, ?, ?, ?, ?)"#,
                rusqlite::params![log_id, log.ticket_id, log.engineer_id, work_note, now.to_rfc3339()],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    DbError::NotFound(format!("Ticket {}", log.ticket_id))
                }
                other => DbError::Sqlite(other),
            })?;

            Ok(ServiceLog {
                id: log_id,
                ticket_id: log.ticket_id.clone(),
                engineer_id: log.engineer_id.clone(),
                engineer_name,
                work_note: work_note.to_string(),
                created_at: now,
            })
        })
    }

    /// Work notes on a ticket, newest first.
    pub fn get_service_logs(&self, ticket_id: &str) -> Result<Vec<ServiceLog>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"SELECT l.id, l.ticket_id, l.engineer_id, u.name, l.work_note, l.created_at
                   FROM service_logs l JOIN users u ON u.id = l.engineer_id
                   WHERE l.ticket_id = ?
                   ORDER BY l.rowid DESC"#,
            )?;

            let logs = stmt
                .query_map([ticket_id], |row| {
                    Ok(ServiceLog {
                        id: row.get(0)?,
                        ticket_id: row.get(1)?,
                        engineer_id: row.get(2)?,
                        engineer_name: row.get(3)?,
                        work_note: row.get(4)?,
                        created_at: parse_datetime(row.get(5)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(logs)
        })
    }
}
