//! # tourbook-service
//!
//! REST backend for a tour-booking site: tours, users, reviews and bookings
//! served from an in-memory document store, behind one generic list-query
//! builder and one generic CRUD handler factory.
//!
//! ## Features
//!
//! - **Query builder**: bracket-notation filters (`price[gte]=500`),
//!   multi-key sorting, field projection and page windows, with injected
//!   `$` operators stripped
//! - **Handler factory**: list, get, create, update and delete for any
//!   collection, with parent scoping for nested routes
//! - **Document store**: schema validation, unique constraints, defaults,
//!   hidden fields and reference expansion
//! - **Ratings**: review writes keep the tour's average and count current
//! - **Ambient stack**: figment configuration, JSON tracing, request IDs,
//!   security headers, graceful shutdown
//!
//! ## Example
//!
//! ```rust,no_run
//! use tourbook_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let state = AppState::new(config.clone());
//!     let app = router(&state);
//!
//!     Server::new(config).serve(app).await
//! }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod health;
pub mod ids;
pub mod middleware;
pub mod observability;
pub mod query;
pub mod repository;
pub mod resources;
pub mod seed;
pub mod server;
pub mod state;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::app::{router, API_PREFIX};
    pub use crate::config::{Config, MiddlewareConfig, QueryConfig, RateLimitConfig, SeedConfig, ServiceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::handlers::{ApiError, ApiErrorKind, ApiOperation, Environment, ErrorRenderer, ResourceHandlers};
    pub use crate::health::{health, readiness};
    pub use crate::ids::{DocumentId, MakeTypedRequestId, RequestId};
    pub use crate::middleware::{request_id_layer, request_id_propagation_layer, sensitive_headers_layer};
    pub use crate::observability::init_tracing;
    pub use crate::query::{ParameterPolicy, Query, QueryAlias, QueryOptions, QueryPlan, QuerySpec};
    pub use crate::repository::{
        Document, DocumentStore, MemoryCollection, MemoryDatabase, RepositoryError, RepositoryErrorKind,
        RepositoryOperation, RepositoryResult,
    };
    pub use crate::resources::{Collections, ResourceKind};
    pub use crate::seed::SeedReport;
    pub use crate::server::Server;
    pub use crate::state::AppState;

    pub use axum::{
        extract::{Path, State},
        http::StatusCode,
        response::{IntoResponse, Json, Response},
        Router,
    };

    pub use serde::{Deserialize, Serialize};
    pub use tracing::{debug, error, info, warn};
}
