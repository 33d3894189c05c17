//! Document storage
//!
//! - [`DocumentStore`]: the async storage capability the query builder and
//!   resource handlers are written against
//! - [`Schema`]: strict per-collection validation, casting and defaults
//! - [`MemoryDatabase`]: the in-process engine implementing the capability
//! - [`ScopedStore`]: a decorator that hides documents outside a filter
//! - [`Expansion`]: directives for inlining related documents
//!
//! # Example
//!
//! ```rust
//! use tourbook_service::repository::{DocumentStore, FieldRule, MemoryDatabase, Schema};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//!     let db = MemoryDatabase::new();
//!     let tours = db.register(Schema::new("tours", "tour").field(FieldRule::string("name")));
//!
//!     let created = tours
//!         .create(json!({ "name": "The Forest Hiker" }).as_object().cloned().unwrap())
//!         .await
//!         .unwrap();
//!     let id = created["_id"].as_str().unwrap();
//!     assert!(tours.find_by_id(id, &[]).await.unwrap().is_some());
//! # }
//! ```

pub mod document;
mod error;
mod expansion;
mod memory;
mod schema;
mod scoped;
mod traits;

pub use document::{Document, ID_FIELD};
pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use expansion::Expansion;
pub use memory::{MemoryCollection, MemoryDatabase};
pub use schema::{
    format_date, number, parse_date, DefaultValue, DocumentCheck, FieldRule, FieldType, ImportMode, Schema, Transform,
    UniqueGroup, VirtualCompute, VERSION_FIELD,
};
pub use scoped::ScopedStore;
pub use traits::{DocumentStore, RepositoryResult};
