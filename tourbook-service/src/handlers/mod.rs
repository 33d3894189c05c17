//! Resource handlers
//!
//! - [`ResourceHandlers`]: list / get_one / create_one / update_one /
//!   delete_one over any [`DocumentStore`](crate::repository::DocumentStore)
//! - [`ResourceEnvelope`]: the uniform success body
//! - [`ApiError`] and [`ErrorRenderer`]: the uniform failure body
//! - [`collection_routes`], [`nested_collection_routes`], [`alias_route`]:
//!   axum wiring

mod envelope;
mod error;
mod factory;
mod render;
mod routes;
mod sanitize;

pub use envelope::{EnvelopeBody, EnvelopeData, ResourceEnvelope};
pub use error::{ApiError, ApiErrorKind, ApiOperation};
pub use factory::{ParentScope, RequestContext, ResourceHandlers};
pub use render::{Environment, ErrorRenderer};
pub use routes::{alias_route, collection_routes, nested_collection_routes};
pub use sanitize::sanitize_body;
