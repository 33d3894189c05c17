//! The resource handler factory
//!
//! [`ResourceHandlers`] produces the five uniform operations of a REST
//! resource over any [`DocumentStore`]. Handlers see only a
//! [`RequestContext`]; they never read headers, cookies or identity.
//!
//! ```rust,ignore
//! let tours = ResourceHandlers::new("tours", store)
//!     .with_policy(ParameterPolicy::new().with_whitelist(["duration", "price"]))
//!     .expand_item(vec![Expansion::virtual_field("reviews", "reviews", "tour")]);
//!
//! let envelope = tours.list(&RequestContext::new().with_query(spec)).await?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::query::{Filter, ParameterPolicy, Query, QueryOptions, QuerySpec};
use crate::repository::{Document, DocumentStore, Expansion};

use super::envelope::ResourceEnvelope;
use super::error::{ApiError, ApiOperation};

/// Everything a handler may read from a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    params: HashMap<String, String>,
    query: QuerySpec,
    body: Document,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_params(mut self, params: HashMap<String, String>) -> Self {
        self.params.extend(params);
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: QuerySpec) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Document) -> Self {
        self.body = body;
        self
    }

    /// A route parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query(&self) -> &QuerySpec {
        &self.query
    }

    pub fn body(&self) -> &Document {
        &self.body
    }
}

/// Ties a nested resource to its parent: route parameter `param` holds the
/// parent id, stored in the child's `field`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentScope {
    pub param: String,
    pub field: String,
}

impl ParentScope {
    pub fn new(param: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            field: field.into(),
        }
    }
}

/// The five handlers of one resource.
#[derive(Debug)]
pub struct ResourceHandlers<S> {
    name: String,
    store: Arc<S>,
    options: QueryOptions,
    policy: ParameterPolicy,
    list_expand: Vec<Expansion>,
    item_expand: Vec<Expansion>,
    parent: Option<ParentScope>,
    protected: Vec<String>,
}

impl<S: DocumentStore> ResourceHandlers<S> {
    pub fn new(name: impl Into<String>, store: S) -> Self {
        Self {
            name: name.into(),
            store: Arc::new(store),
            options: QueryOptions::default(),
            policy: ParameterPolicy::new(),
            list_expand: Vec::new(),
            item_expand: Vec::new(),
            parent: None,
            protected: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Which query parameters may repeat.
    #[must_use]
    pub fn with_policy(mut self, policy: ParameterPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Related documents inlined into list results.
    #[must_use]
    pub fn expand_list(mut self, expansions: Vec<Expansion>) -> Self {
        self.list_expand = expansions;
        self
    }

    /// Related documents inlined into single-document results.
    #[must_use]
    pub fn expand_item(mut self, expansions: Vec<Expansion>) -> Self {
        self.item_expand = expansions;
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ParentScope) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Fields dropped from update bodies, for values owned elsewhere (such
    /// as credentials managed by the identity provider).
    #[must_use]
    pub fn protect_fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.protected.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn policy(&self) -> &ParameterPolicy {
        &self.policy
    }

    pub fn parent(&self) -> Option<&ParentScope> {
        self.parent.as_ref()
    }

    fn parent_filter(&self, ctx: &RequestContext) -> Option<Filter> {
        let scope = self.parent.as_ref()?;
        let id = ctx.param(&scope.param)?;
        Some(Filter::eq(scope.field.clone(), id))
    }

    fn id<'c>(&self, ctx: &'c RequestContext, operation: ApiOperation) -> Result<&'c str, ApiError> {
        ctx.param("id").ok_or_else(|| ApiError::not_found(operation))
    }

    /// All matching documents, filtered, sorted, projected and paginated.
    pub async fn list(&self, ctx: &RequestContext) -> Result<ResourceEnvelope, ApiError> {
        let mut query = Query::new(ctx.query(), &self.options).expand(self.list_expand.clone());
        if let Some(scope) = self.parent_filter(ctx) {
            query = query.scoped(scope);
        }

        let records = query
            .filter()
            .sort()
            .limit_fields()
            .paginate(self.store.as_ref())
            .await?
            .execute(self.store.as_ref())
            .await
            .map_err(|err| ApiError::from(err).with_operation(ApiOperation::List))?;

        tracing::debug!(resource = %self.name, results = records.len(), "listed documents");
        Ok(ResourceEnvelope::list(records))
    }

    /// One document by id.
    pub async fn get_one(&self, ctx: &RequestContext) -> Result<ResourceEnvelope, ApiError> {
        let id = self.id(ctx, ApiOperation::Get)?;
        let record = self
            .store
            .find_by_id(id, &self.item_expand)
            .await
            .map_err(|err| ApiError::from(err).with_operation(ApiOperation::Get))?
            .ok_or_else(|| ApiError::not_found(ApiOperation::Get))?;
        Ok(ResourceEnvelope::item(record))
    }

    /// Store the request body as a new document.
    pub async fn create_one(&self, ctx: &RequestContext) -> Result<ResourceEnvelope, ApiError> {
        let mut body = ctx.body().clone();
        if let Some(scope) = &self.parent {
            if let Some(parent_id) = ctx.param(&scope.param) {
                body.entry(scope.field.clone())
                    .or_insert_with(|| serde_json::Value::String(parent_id.to_string()));
            }
        }

        let record = self
            .store
            .create(body)
            .await
            .map_err(|err| ApiError::from(err).with_operation(ApiOperation::Create))?;
        tracing::info!(resource = %self.name, id = ?record.get("_id"), "created document");
        Ok(ResourceEnvelope::created(record))
    }

    /// Merge the request body into an existing document.
    pub async fn update_one(&self, ctx: &RequestContext) -> Result<ResourceEnvelope, ApiError> {
        let id = self.id(ctx, ApiOperation::Update)?;
        let mut patch = ctx.body().clone();
        for field in &self.protected {
            patch.remove(field);
        }

        let record = self
            .store
            .update_by_id(id, patch)
            .await
            .map_err(|err| ApiError::from(err).with_operation(ApiOperation::Update))?
            .ok_or_else(|| ApiError::not_found(ApiOperation::Update))?;
        Ok(ResourceEnvelope::item(record))
    }

    /// Remove a document.
    pub async fn delete_one(&self, ctx: &RequestContext) -> Result<ResourceEnvelope, ApiError> {
        let id = self.id(ctx, ApiOperation::Delete)?;
        self.store
            .delete_by_id(id)
            .await
            .map_err(|err| ApiError::from(err).with_operation(ApiOperation::Delete))?
            .ok_or_else(|| ApiError::not_found(ApiOperation::Delete))?;
        tracing::info!(resource = %self.name, id, "deleted document");
        Ok(ResourceEnvelope::deleted())
    }
}
