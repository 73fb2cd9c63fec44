pub mod api;
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod uploads;

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::ServerConfig;
use crate::core_state::{CoreError, CoreState};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    Server(#[from] api::ServerError),
}

/// Start the server and block until Ctrl-C.
pub fn run() -> Result<(), RunError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let config = ServerConfig::from_env();
    let bind_addr = config.bind_addr;
    let core = Arc::new(CoreState::from_config(config)?);

    match core
        .db()
        .with_conn(|conn| db::purge_expired_sessions(conn, &Utc::now()))
    {
        Ok(0) => {}
        Ok(purged) => tracing::info!(purged, "Expired sessions removed"),
        Err(e) => tracing::warn!("Could not purge expired sessions: {e}"),
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let served = runtime.block_on(async {
        let mut server = api::start_server(core.clone(), bind_addr).await?;
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
        }
        server.shutdown();
        server.stopped().await
    });

    core.shutdown()?;
    served?;
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}
