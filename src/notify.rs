//! Fire-and-forget notifications.
//!
//! Callers hand a notification to a [`Notifier`] and move on. The channel
//! backed [`NotificationEmitter`] never blocks; a background task drains the
//! channel into the `notifications` table.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::db::{CreateNotification, Database, NotificationCategory};

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification channel closed")]
    ChannelClosed,

    #[error("Notification delivery failed: {0}")]
    Delivery(String),
}

pub trait Notifier: Send + Sync {
    fn notify(
        &self,
        recipient_id: &str,
        message: &str,
        category: NotificationCategory,
    ) -> Result<(), NotifyError>;
}

/// Send side of the notification queue.
#[derive(Clone)]
pub struct NotificationEmitter {
    tx: mpsc::UnboundedSender<CreateNotification>,
}

impl NotificationEmitter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CreateNotification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for NotificationEmitter {
    fn notify(
        &self,
        recipient_id: &str,
        message: &str,
        category: NotificationCategory,
    ) -> Result<(), NotifyError> {
        self.tx
            .send(CreateNotification {
                user_id: recipient_id.to_string(),
                message: message.to_string(),
                category,
            })
            .map_err(|_| NotifyError::ChannelClosed)
    }
}

/// Spawn the task that persists queued notifications. Must be called from
/// within a tokio runtime.
pub fn start_notification_worker(db: Arc<Database>) -> NotificationEmitter {
    let (emitter, mut rx) = NotificationEmitter::channel();

    tokio::spawn(async move {
        tracing::info!("Notification worker started");

        while let Some(notification) = rx.recv().await {
            match db.create_notification(&notification) {
                Ok(saved) => {
                    tracing::debug!("Stored notification {} for {}", saved.id, saved.user_id);
                }
                Err(e) => {
                    tracing::warn!(
                        "Dropping notification for {}: {}",
                        notification.user_id,
                        e
                    );
                }
            }
        }

        tracing::info!("Notification worker stopped");
    });

    emitter
}

/// Deliver through `notifier`, logging instead of returning failures.
pub fn emit(notifier: &dyn Notifier, recipient_id: &str, message: &str, category: NotificationCategory) {
    if let Err(e) = notifier.notify(recipient_id, message, category) {
        tracing::warn!("Failed to notify {}: {}", recipient_id, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CreateUser;
    use crate::identity::Role;
    use std::time::Duration;

    #[test]
    fn emitter_queues_notifications() {
        let (emitter, mut rx) = NotificationEmitter::channel();
        emitter.notify("u1", "hello", NotificationCategory::Ticket).unwrap();

        let queued = rx.try_recv().unwrap();
        assert_eq!(queued.user_id, "u1");
        assert_eq!(queued.message, "hello");
        assert_eq!(queued.category, NotificationCategory::Ticket);
    }

    #[test]
    fn emitter_reports_closed_channel() {
        let (emitter, rx) = NotificationEmitter::channel();
        drop(rx);
        let result = emitter.notify("u1", "hello", NotificationCategory::Ticket);
        assert!(matches!(result, Err(NotifyError::ChannelClosed)));
    }

    #[test]
    fn emit_swallows_errors() {
        let (emitter, rx) = NotificationEmitter::channel();
        drop(rx);
        emit(&emitter, "u1", "hello", NotificationCategory::System);
    }

    #[tokio::test]
    async fn worker_persists_notifications() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user = db.create_user(&CreateUser {
            name: "C".to_string(),
            email: "c@example.com".to_string(),
            role: Role::Customer,
            api_token: "tc".to_string(),
        }).unwrap();

        let emitter = start_notification_worker(db.clone());
        emitter.notify(&user.id, "Your ticket status changed to resolved", NotificationCategory::Ticket).unwrap();

        let mut stored = Vec::new();
        for _ in 0..50 {
            stored = db.get_notifications(&user.id, 20).unwrap();
            if !stored.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message, "Your ticket status changed to resolved");
    }

    #[tokio::test]
    async fn worker_survives_bad_recipient() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user = db.create_user(&CreateUser {
            name: "C".to_string(),
            email: "c@example.com".to_string(),
            role: Role::Customer,
            api_token: "tc".to_string(),
        }).unwrap();

        let emitter = start_notification_worker(db.clone());
        // Unknown user violates the foreign key; the worker logs and keeps going
        emitter.notify("ghost", "lost", NotificationCategory::Ticket).unwrap();
        emitter.notify(&user.id, "kept", NotificationCategory::Ticket).unwrap();

        let mut stored = Vec::new();
        for _ in 0..50 {
            stored = db.get_notifications(&user.id, 20).unwrap();
            if !stored.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].message, "kept");
    }
}
