//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::handlers::ErrorRenderer;
use crate::middleware::RateLimit;
use crate::query::QueryOptions;
use crate::repository::MemoryDatabase;
use crate::resources::Collections;

/// Collaborators built once at start-up and shared by every request.
///
/// Cloning is cheap: the config is behind an `Arc` and the database is a
/// shared handle.
#[derive(Debug, Clone)]
pub struct AppState {
    config: Arc<Config>,
    db: MemoryDatabase,
    collections: Collections,
    renderer: ErrorRenderer,
    query_options: QueryOptions,
    rate_limit: Option<RateLimit>,
}

impl AppState {
    /// Create a state with every resource collection registered and empty.
    pub fn new(config: Config) -> Self {
        let db = MemoryDatabase::new();
        let collections = Collections::register(&db);
        let renderer = ErrorRenderer::new(config.service.environment);
        let query_options = QueryOptions::from_config(&config.query);
        let rate_limit = RateLimit::from_config(&config.rate_limit, renderer);

        Self {
            config: Arc::new(config),
            db,
            collections,
            renderer,
            query_options,
            rate_limit,
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn db(&self) -> &MemoryDatabase {
        &self.db
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    pub fn renderer(&self) -> ErrorRenderer {
        self.renderer
    }

    /// List query defaults derived from `config.query`.
    pub fn query_options(&self) -> &QueryOptions {
        &self.query_options
    }

    /// The API rate limiter, shared by every router built from this state.
    pub fn rate_limit(&self) -> Option<&RateLimit> {
        self.rate_limit.as_ref()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
