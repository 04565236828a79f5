//! Shared application state.
//!
//! One [`AppState`] is built at startup and handed (by reference or clone)
//! to every pipeline entry point. It owns the artifact store pool, the
//! discovered tool registry, the OCR model registry and engine, and the
//! process-wide trickplay generation lock.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use fw_core::config::Config;
use fw_core::Result;
use fw_db::DbPool;
use fw_ocr::{ModelRegistry, OcrEngine};

use crate::paths::PathManager;

/// Process-wide shared state for the artifact pipeline.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: DbPool,
    pub tools: Arc<fw_av::ToolRegistry>,
    pub models: Arc<ModelRegistry>,
    pub ocr: Arc<OcrEngine>,
    pub paths: PathManager,
    /// Serializes heavy trickplay generation; at most one extraction runs
    /// at a time regardless of how many refreshes are in flight.
    trickplay_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Build state from configuration: create the data directory, open the
    /// artifact store, and discover external tools.
    pub fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let db_path = config.data_dir.join("framewright.db");
        let db = fw_db::init_pool(&db_path.to_string_lossy())?;

        Ok(Self::assemble(config, db))
    }

    /// Build state around an existing (typically in-memory) pool. Used by
    /// tests; tool discovery still runs against the real environment.
    pub fn with_pool(config: Config, db: DbPool) -> Self {
        Self::assemble(config, db)
    }

    fn assemble(config: Config, db: DbPool) -> Self {
        let tools = Arc::new(fw_av::ToolRegistry::discover(&config.tools));
        let models = Arc::new(ModelRegistry::new(
            &config.data_dir,
            config.models.base_url.clone(),
        ));
        let ocr = Arc::new(OcrEngine::new(models.clone()));
        let paths = PathManager::new(config.data_dir.clone());

        Self {
            config: Arc::new(config),
            db,
            tools,
            models,
            ocr,
            paths,
            trickplay_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Acquire the process-wide trickplay generation lock.
    pub async fn lock_trickplay(&self) -> OwnedMutexGuard<()> {
        self.trickplay_lock.clone().lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn trickplay_lock_is_exclusive() {
        let state = AppState::with_pool(
            Config::default(),
            fw_db::init_memory_pool().unwrap(),
        );

        let guard = state.lock_trickplay().await;
        // A second acquisition must not be immediately available.
        let second = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            state.lock_trickplay(),
        )
        .await;
        assert!(second.is_err());

        drop(guard);
        let third = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            state.lock_trickplay(),
        )
        .await;
        assert!(third.is_ok());
    }

    #[tokio::test]
    async fn clones_share_the_lock() {
        let state = AppState::with_pool(
            Config::default(),
            fw_db::init_memory_pool().unwrap(),
        );
        let clone = state.clone();

        let _guard = state.lock_trickplay().await;
        let second = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            clone.lock_trickplay(),
        )
        .await;
        assert!(second.is_err());
    }
}
