//! The storage capability
//!
//! [`DocumentStore`] is the only thing the query builder and the resource
//! handlers know about storage. It uses return-position `impl Future` in
//! traits, so implementations write plain `async fn`s without `async_trait`.
//!
//! ```rust,ignore
//! impl DocumentStore for MyStore {
//!     fn collection(&self) -> &str {
//!         "tours"
//!     }
//!
//!     async fn find_many(&self, plan: &QueryPlan) -> RepositoryResult<Vec<Document>> {
//!         // run the plan
//!     }
//!
//!     // ... other required methods
//! }
//! ```

use std::future::Future;

use super::document::Document;
use super::error::RepositoryError;
use super::expansion::Expansion;
use crate::query::{Filter, QueryPlan};

/// Result type for storage operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Async, fallible access to one collection of documents.
///
/// Absent documents are `Ok(None)`; only real failures are errors.
pub trait DocumentStore: Send + Sync {
    /// Name of the underlying collection
    fn collection(&self) -> &str;

    /// Run a list query once
    fn find_many(&self, plan: &QueryPlan)
        -> impl Future<Output = RepositoryResult<Vec<Document>>> + Send;

    /// Count documents matching `filter`
    fn count_matching(&self, filter: &Filter) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Fetch the first document matching `filter`, with related documents inlined
    fn find_one(
        &self,
        filter: &Filter,
        expand: &[Expansion],
    ) -> impl Future<Output = RepositoryResult<Option<Document>>> + Send;

    /// Validate and insert a document, returning it as stored
    fn create(&self, body: Document) -> impl Future<Output = RepositoryResult<Document>> + Send;

    /// Merge `patch` into the first document matching `filter` and return the
    /// updated document
    fn update_one(
        &self,
        filter: &Filter,
        patch: Document,
    ) -> impl Future<Output = RepositoryResult<Option<Document>>> + Send;

    /// Remove the first document matching `filter`, returning it
    fn delete_one(
        &self,
        filter: &Filter,
    ) -> impl Future<Output = RepositoryResult<Option<Document>>> + Send;

    /// Fetch a document by id
    fn find_by_id(
        &self,
        id: &str,
        expand: &[Expansion],
    ) -> impl Future<Output = RepositoryResult<Option<Document>>> + Send {
        let filter = Filter::by_id(id);
        async move { self.find_one(&filter, expand).await }
    }

    /// Update a document by id
    fn update_by_id(
        &self,
        id: &str,
        patch: Document,
    ) -> impl Future<Output = RepositoryResult<Option<Document>>> + Send {
        let filter = Filter::by_id(id);
        async move { self.update_one(&filter, patch).await }
    }

    /// Delete a document by id
    fn delete_by_id(&self, id: &str) -> impl Future<Output = RepositoryResult<Option<Document>>> + Send {
        let filter = Filter::by_id(id);
        async move { self.delete_one(&filter).await }
    }
}
