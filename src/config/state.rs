// Application state module
// Shared, read-only state handed to every request handler

use std::sync::Arc;

use super::types::Config;
use crate::storage::{FsStore, ModelStore};

/// Application state
pub struct AppState {
    pub config: Config,
    /// Backing store for uploaded models and the settings document
    pub store: Arc<dyn ModelStore>,
}

impl AppState {
    /// Create state backed by the filesystem store described in `config.storage`
    pub fn new(config: &Config) -> Self {
        let store = FsStore::from_config(&config.storage);
        Self::with_store(config, Arc::new(store))
    }

    /// Create state with an explicit store
    pub fn with_store(config: &Config, store: Arc<dyn ModelStore>) -> Self {
        Self {
            config: config.clone(),
            store,
        }
    }

    pub const fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
