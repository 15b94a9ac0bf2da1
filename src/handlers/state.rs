//! Shared application state handed to every handler.

use std::sync::Arc;

use crate::assignment::InMemoryAssignmentStore;
use crate::config::ServerConfig;
use crate::events::InMemoryEventStore;
use crate::manager::ExperimentManager;

/// Everything the handlers need: the manager (which owns the store
/// handles) plus the loaded configuration.
pub struct AppContext {
    pub manager: ExperimentManager,
    pub config: ServerConfig,
}

impl AppContext {
    /// Wire up the manager with the in-memory reference stores.
    pub fn new(config: ServerConfig) -> Self {
        let manager = ExperimentManager::new(
            Arc::new(InMemoryAssignmentStore::new()),
            Arc::new(InMemoryEventStore::new()),
            config.confidence_level,
        );
        Self { manager, config }
    }
}

/// Application state type alias
pub type AppState = Arc<AppContext>;
