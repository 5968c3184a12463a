//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::PrintHubConfig;
use crate::db::MarketplaceStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the marketplace store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: PrintHubConfig,
    store: Arc<dyn MarketplaceStore>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Server configuration
    /// * `store` - `PgStore` in production, `MemoryStore` in development and tests
    #[must_use]
    pub fn new(config: PrintHubConfig, store: Arc<dyn MarketplaceStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Get a reference to the server configuration.
    #[must_use]
    pub fn config(&self) -> &PrintHubConfig {
        &self.inner.config
    }

    /// Get a reference to the marketplace store.
    #[must_use]
    pub fn store(&self) -> &dyn MarketplaceStore {
        self.inner.store.as_ref()
    }
}
