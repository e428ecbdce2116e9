use std::sync::Arc;
use std::time::Instant;

use crate::db::Database;
use crate::notify::Notifier;
use crate::service::ServiceDesk;

#[derive(Clone)]
pub struct AppState {
    pub desk: ServiceDesk,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Arc<Database>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            desk: ServiceDesk::new(db, notifier),
            started_at: Instant::now(),
        }
    }
}
