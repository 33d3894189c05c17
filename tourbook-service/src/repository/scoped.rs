//! Visibility scoping

use super::document::Document;
use super::expansion::Expansion;
use super::traits::{DocumentStore, RepositoryResult};
use crate::query::{Filter, QueryPlan};

/// A store that only sees documents matching a fixed filter.
///
/// Reads, counts, updates and deletes are all narrowed, so a document outside
/// the scope behaves exactly like a missing one. Creates pass through
/// untouched.
///
/// ```rust,ignore
/// let public_tours = ScopedStore::new(tours, Filter::ne("secretTour", true));
/// ```
#[derive(Debug, Clone)]
pub struct ScopedStore<S> {
    inner: S,
    scope: Filter,
}

impl<S: DocumentStore> ScopedStore<S> {
    pub fn new(inner: S, scope: Filter) -> Self {
        Self { inner, scope }
    }

    /// The unscoped store.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn scope(&self) -> &Filter {
        &self.scope
    }

    fn narrow(&self, filter: &Filter) -> Filter {
        filter.clone().and(self.scope.clone())
    }
}

impl<S: DocumentStore> DocumentStore for ScopedStore<S> {
    fn collection(&self) -> &str {
        self.inner.collection()
    }

    async fn find_many(&self, plan: &QueryPlan) -> RepositoryResult<Vec<Document>> {
        let scoped = QueryPlan {
            filter: self.narrow(&plan.filter),
            ..plan.clone()
        };
        self.inner.find_many(&scoped).await
    }

    async fn count_matching(&self, filter: &Filter) -> RepositoryResult<u64> {
        self.inner.count_matching(&self.narrow(filter)).await
    }

    async fn find_one(&self, filter: &Filter, expand: &[Expansion]) -> RepositoryResult<Option<Document>> {
        self.inner.find_one(&self.narrow(filter), expand).await
    }

    async fn create(&self, body: Document) -> RepositoryResult<Document> {
        self.inner.create(body).await
    }

    async fn update_one(&self, filter: &Filter, patch: Document) -> RepositoryResult<Option<Document>> {
        self.inner.update_one(&self.narrow(filter), patch).await
    }

    async fn delete_one(&self, filter: &Filter) -> RepositoryResult<Option<Document>> {
        self.inner.delete_one(&self.narrow(filter)).await
    }
}
