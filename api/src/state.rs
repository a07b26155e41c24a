use std::sync::Arc;

use common::config::Settings;
use common::db::{CacheClient, DbPool};

/// Application state shared across all handlers
///
/// Built once after startup and cloned into each request; the handles inside are
/// never replaced while the server runs. `db_pool` is also the session factory.
#[derive(Clone, Debug)]
pub struct AppState {
    pub db_pool: DbPool,
    pub cache: Option<CacheClient>,
    pub config: Arc<Settings>,
}

impl AppState {
    /// Create a new AppState instance
    pub fn new(db_pool: DbPool, cache: Option<CacheClient>, config: Settings) -> Self {
        Self {
            db_pool,
            cache,
            config: Arc::new(config),
        }
    }
}
