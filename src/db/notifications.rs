use crate::db::{Database, DbError, parse_datetime};
use crate::db::models::{CreateNotification, Notification, NotificationCategory};

impl Database {
    pub fn create_notification(&self, notification: &CreateNotification) -> Result<Notification, DbError> {
        self.with_conn(|conn| {
            let notification_id = uuid::Uuid::new_v4().to_string();
            let now = chrono::Utc::now();

            conn.execute(
                r#"INSERT INTO notifications (id, user_id, message, category, is_read, created_at)
                   VALUES (?, ?, ?, ?, 0, ?)"#,
                rusqlite::params![
                    notification_id,
                    notification.user_id,
                    notification.message,
                    notification.category.as_str(),
                    now.to_rfc3339(),
                ],
            )?;

            Ok(Notification {
                id: notification_id,
                user_id: notification.user_id.clone(),
                message: notification.message.clone(),
                category: notification.category,
                read: false,
                created_at: now,
            })
        })
    }

    /// Most recent notifications for a user, newest first.
    pub fn get_notifications(&self, user_id: &str, limit: u32) -> Result<Vec<Notification>, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"SELECT id, user_id, message, category, is_read, created_at
                   FROM notifications WHERE user_id = ?
                   ORDER BY rowid DESC LIMIT ?"#,
            )?;

            let notifications = stmt
                .query_map(rusqlite::params![user_id, limit], |row| {
                    let category: String = row.get(3)?;
                    Ok(Notification {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        message: row.get(2)?,
                        category: NotificationCategory::parse(&category)
                            .unwrap_or(NotificationCategory::System),
                        read: row.get(4)?,
                        created_at: parse_datetime(row.get(5)?),
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(notifications)
        })
    }

    /// Mark one of the user's notifications as read. Other users'
    /// notifications are reported as not found.
    pub fn mark_notification_read(&self, notification_id: &str, user_id: &str) -> Result<(), DbError> {
        self.with_conn(|conn| {
            let affected = conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?",
                rusqlite::params![notification_id, user_id],
            )?;

            if affected == 0 {
                return Err(DbError::NotFound(format!("Notification {}", notification_id)));
            }
            Ok(())
        })
    }
}
