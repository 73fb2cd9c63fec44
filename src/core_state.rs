//! Application state shared by every request handler.
//!
//! Built once at startup from `ServerConfig`, wrapped in `Arc`, and torn
//! down with `shutdown()`. Handlers never open their own connections or
//! clients.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::config::ServerConfig;
use crate::db::{Database, DatabaseError};
use crate::pipeline::extraction::{default_engine, OcrEngine};
use crate::pipeline::structuring::{OpenRouterClient, StructuringError, VisionClient};
use crate::uploads::UploadStore;

pub type SharedOcr = Arc<dyn OcrEngine + Send + Sync>;
pub type SharedVision = Arc<dyn VisionClient + Send + Sync>;

pub struct CoreState {
    pub config: ServerConfig,
    db: Database,
    uploads: UploadStore,
    ocr: SharedOcr,
    /// `None` when no model API key is configured.
    vision: Option<SharedVision>,
    started_at: Instant,
}

impl CoreState {
    /// Open the database and build the production collaborators.
    pub fn from_config(config: ServerConfig) -> Result<Self, CoreError> {
        let db = Database::open(&config.database_path())?;
        let ocr = default_engine(config.tessdata_dir.as_deref());

        let vision: Option<SharedVision> = match &config.model_api_key {
            Some(key) => Some(Arc::new(OpenRouterClient::new(
                &config.model_base_url,
                key,
                &config.model,
                &config.frontend_url,
                config.model_timeout,
            )?)),
            None => {
                tracing::warn!(
                    "OPENROUTER_API_KEY is not set; analysis requests will fail until it is"
                );
                None
            }
        };

        tracing::info!(
            data_dir = %config.data_dir.display(),
            model = %config.model,
            ocr_available = ocr.is_available(),
            "Core state initialized"
        );
        Ok(Self::new(config, db, ocr, vision))
    }

    /// Assemble from explicit parts. Tests pass mocks here.
    pub fn new(
        config: ServerConfig,
        db: Database,
        ocr: SharedOcr,
        vision: Option<SharedVision>,
    ) -> Self {
        let uploads = UploadStore::new(config.upload_root(), config.max_upload_bytes);
        Self {
            config,
            db,
            uploads,
            ocr,
            vision,
            started_at: Instant::now(),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn uploads(&self) -> &UploadStore {
        &self.uploads
    }

    pub fn ocr(&self) -> &(dyn OcrEngine + Send + Sync) {
        self.ocr.as_ref()
    }

    pub fn vision(&self) -> Option<&(dyn VisionClient + Send + Sync)> {
        self.vision.as_deref()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Release the database. Safe to call more than once.
    pub fn shutdown(&self) -> Result<(), CoreError> {
        self.db.close()?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Model client setup failed: {0}")]
    ModelClient(#[from] StructuringError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::MockOcrEngine;
    use crate::pipeline::structuring::MockVisionClient;

    #[test]
    fn from_config_without_key_has_no_vision_client() {
        let dir = tempfile::tempdir().unwrap();
        let core = CoreState::from_config(ServerConfig::for_data_dir(dir.path().into())).unwrap();
        assert!(core.vision().is_none());
        assert!(core.db().ping());
        assert!(dir.path().join("medscan.db").exists());
    }

    #[test]
    fn from_config_with_key_builds_client() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ServerConfig::for_data_dir(dir.path().into());
        config.model_api_key = Some("sk-test".into());
        let core = CoreState::from_config(config).unwrap();
        assert_eq!(core.vision().unwrap().model_name(), "openai/gpt-4o-mini");
    }

    #[test]
    fn shutdown_closes_database() {
        let dir = tempfile::tempdir().unwrap();
        let core = CoreState::new(
            ServerConfig::for_data_dir(dir.path().into()),
            Database::open_in_memory().unwrap(),
            Arc::new(MockOcrEngine::new("", 0.0)),
            Some(Arc::new(MockVisionClient::new("{}"))),
        );
        core.shutdown().unwrap();
        assert!(!core.db().ping());
        core.shutdown().unwrap();
    }
}
