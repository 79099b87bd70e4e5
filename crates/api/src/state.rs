use std::sync::Arc;

use querybank_db::DatabaseRegistry;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything inside is behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Template-store and tenant connection pools.
    pub registry: Arc<DatabaseRegistry>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// The template-store pool.
    pub fn store(&self) -> &querybank_db::DbPool {
        self.registry.store()
    }
}
