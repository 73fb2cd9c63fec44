//! HTTP server lifecycle: bind, serve in a background task, stop on signal.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::core_state::CoreState;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
    #[error("Server task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Handle to a running server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<(), std::io::Error>>,
}

impl ApiServer {
    /// Ask the server to stop accepting connections. In-flight requests finish.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait for the serve loop to exit.
    pub async fn stopped(self) -> Result<(), ServerError> {
        self.task.await??;
        Ok(())
    }
}

/// Bind `addr` and serve the API router in a background task.
///
/// Pass port 0 for an ephemeral port; the bound address is on the handle.
pub async fn start_server(core: Arc<CoreState>, addr: SocketAddr) -> Result<ApiServer, ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let addr = listener.local_addr()?;

    let app = api_router(core);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");
        // Connect info feeds the per-client rate limiter.
        let result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await;

        match &result {
            Ok(()) => tracing::info!("API server stopped"),
            Err(e) => tracing::error!("API server error: {e}"),
        }
        result
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}
