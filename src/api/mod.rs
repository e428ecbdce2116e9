pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod types;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use crate::db::Database;
use crate::notify::Notifier;

pub use error::{ApiError, ApiResult, AppError, ErrorCode};
pub use state::AppState;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub port: u16,
    pub host: [u8; 4],
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: 7433,
            host: [127, 0, 0, 1],
        }
    }
}

/// Server handle for managing the running server
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub shutdown_tx: oneshot::Sender<()>,
}

impl ServerHandle {
    pub fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Start the API server
pub async fn start_server(
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
    config: ApiConfig,
) -> Result<ServerHandle, Box<dyn std::error::Error + Send + Sync>> {
    let state = AppState::new(db, notifier);
    let router = routes::create_router(state);

    let addr = SocketAddr::from((config.host, config.port));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("API server listening on http://{}", actual_addr);

    tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
                tracing::info!("API server shutting down");
            })
            .await;

        if let Err(e) = result {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(ServerHandle {
        addr: actual_addr,
        shutdown_tx,
    })
}
