//! The four-stage list query builder
//!
//! A [`Query`] is an owned value moved through `filter`, `sort`,
//! `limit_fields` and `paginate`, each stage consuming the query and
//! returning a refined one. Nothing touches storage until `paginate` (which
//! awaits an accurate count when a page number was requested) and
//! `execute`.
//!
//! ```rust,ignore
//! let records = Query::new(&spec, &options)
//!     .filter()
//!     .sort()
//!     .limit_fields()
//!     .paginate(&store)
//!     .await?
//!     .execute(&store)
//!     .await?;
//! ```

use serde::Serialize;
use thiserror::Error;

use super::filter::Filter;
use super::params::QuerySpec;
use super::projection::Projection;
use super::sort::SortOrder;
use crate::config::QueryConfig;
use crate::repository::{Document, DocumentStore, Expansion, RepositoryError, RepositoryResult};

/// Per-resource defaults for the builder stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOptions {
    /// Ordering used when no `sort` parameter is given
    pub default_sort: String,
    /// Page size used when `limit` is missing or not a positive number
    pub default_limit: u64,
    /// Fields dropped when no `fields` parameter is given
    pub default_exclusions: Vec<String>,
    /// Field-list tokens containing this text are discarded
    pub sensitive_marker: String,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            default_sort: "-createdAt".to_string(),
            default_limit: 100,
            default_exclusions: vec!["__v".to_string()],
            sensitive_marker: "password".to_string(),
        }
    }
}

impl QueryOptions {
    /// Options taken from the service configuration.
    pub fn from_config(config: &QueryConfig) -> Self {
        Self {
            default_sort: config.default_sort.clone(),
            default_limit: config.default_limit,
            default_exclusions: vec![config.version_field.clone()],
            sensitive_marker: config.sensitive_marker.clone(),
        }
    }

    /// Override the default ordering.
    #[must_use]
    pub fn with_default_sort(mut self, sort: impl Into<String>) -> Self {
        self.default_sort = sort.into();
        self
    }

    /// Override the default page size.
    #[must_use]
    pub fn with_default_limit(mut self, limit: u64) -> Self {
        self.default_limit = limit;
        self
    }

    /// Override the fields hidden when no field list is given.
    #[must_use]
    pub fn with_default_exclusions<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_exclusions = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Override the sensitive field marker.
    #[must_use]
    pub fn with_sensitive_marker(mut self, marker: impl Into<String>) -> Self {
        self.sensitive_marker = marker.into();
        self
    }
}

/// Everything a store needs to run a list query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryPlan {
    /// Documents must match this predicate
    pub filter: Filter,
    /// Result ordering
    pub sort: SortOrder,
    /// Returned fields
    pub projection: Projection,
    /// Matching documents to skip
    pub skip: u64,
    /// Maximum documents to return
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Related documents to inline
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub expand: Vec<Expansion>,
}

impl QueryPlan {
    /// A plan returning every document matching `filter`, in insertion order.
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }
}

/// Failures raised while building or running a list query.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    /// The requested page starts past the last matching document
    #[error("This page does not exist")]
    InvalidPage {
        /// Requested page, after clamping
        page: u64,
        /// Documents that would be skipped
        skip: u64,
        /// Documents matching the filter
        total: u64,
    },

    /// The store failed while counting or fetching
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A list query in progress.
#[derive(Debug, Clone)]
pub struct Query<'a> {
    spec: &'a QuerySpec,
    options: &'a QueryOptions,
    plan: QueryPlan,
    page: u64,
}

impl<'a> Query<'a> {
    /// Start a query over `spec`; the plan matches everything until staged.
    pub fn new(spec: &'a QuerySpec, options: &'a QueryOptions) -> Self {
        Self {
            spec,
            options,
            plan: QueryPlan::default(),
            page: 1,
        }
    }

    /// Narrow the query to a base predicate, such as a parent resource scope.
    #[must_use]
    pub fn scoped(mut self, base: Filter) -> Self {
        self.plan.filter = std::mem::take(&mut self.plan.filter).and(base);
        self
    }

    /// Inline related documents in every result.
    #[must_use]
    pub fn expand(mut self, expansions: Vec<Expansion>) -> Self {
        self.plan.expand = expansions;
        self
    }

    /// Stage 1: narrow by the client's filter parameters.
    #[must_use]
    pub fn filter(mut self) -> Self {
        let requested = Filter::from_spec(self.spec);
        self.plan.filter = std::mem::take(&mut self.plan.filter).and(requested);
        self
    }

    /// Stage 2: order by `sort`, or the resource default.
    #[must_use]
    pub fn sort(mut self) -> Self {
        let raw = self
            .spec
            .scalar("sort")
            .unwrap_or_else(|| self.options.default_sort.clone());
        self.plan.sort = SortOrder::parse(&raw);
        self
    }

    /// Stage 3: project to `fields`, or drop the default exclusions.
    #[must_use]
    pub fn limit_fields(mut self) -> Self {
        self.plan.projection = match self.spec.scalar("fields") {
            Some(raw) => Projection::parse(&raw, &self.options.sensitive_marker),
            None => Projection::exclude(self.options.default_exclusions.iter().cloned()),
        };
        self
    }

    /// Apply `page` and `limit` without checking the page against the data.
    #[must_use]
    pub fn window(mut self) -> Self {
        let limit = parse_count(self.spec.scalar("limit"))
            .filter(|limit| *limit > 0)
            .map_or(self.options.default_limit, |limit| limit as u64);
        let page = parse_count(self.spec.scalar("page"))
            .filter(|page| *page > 0)
            .map_or(1, |page| page as u64);

        self.page = page;
        self.plan.skip = (page - 1).saturating_mul(limit);
        self.plan.limit = Some(limit);
        self
    }

    /// Stage 4: apply the window and, when a page was requested, reject
    /// pages starting at or past the number of matching documents.
    ///
    /// The count is awaited before the comparison and uses the filter
    /// narrowed by the earlier stages.
    pub async fn paginate<S>(self, store: &S) -> Result<Self, QueryError>
    where
        S: DocumentStore + ?Sized,
    {
        let query = self.window();
        if query.spec.contains("page") {
            let total = store.count_matching(&query.plan.filter).await?;
            if query.plan.skip >= total {
                return Err(QueryError::InvalidPage {
                    page: query.page,
                    skip: query.plan.skip,
                    total,
                });
            }
        }
        Ok(query)
    }

    /// The plan built so far.
    pub fn plan(&self) -> &QueryPlan {
        &self.plan
    }

    /// Finish building and take the plan.
    pub fn into_plan(self) -> QueryPlan {
        self.plan
    }

    /// Run the plan once against `store`.
    pub async fn execute<S>(self, store: &S) -> RepositoryResult<Vec<Document>>
    where
        S: DocumentStore + ?Sized,
    {
        store.find_many(&self.plan).await
    }
}

/// Numeric parameter parsing: numeric strings and numbers are accepted,
/// fractions truncate, anything else is absent.
fn parse_count(raw: Option<String>) -> Option<i64> {
    let parsed = raw?.trim().parse::<f64>().ok()?;
    parsed.is_finite().then(|| parsed.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::params::ParameterPolicy;
    use crate::repository::{FieldRule, MemoryDatabase, Schema};
    use serde_json::{json, Value};

    fn spec(raw: &str) -> QuerySpec {
        QuerySpec::parse(raw, &ParameterPolicy::new())
    }

    async fn seeded(count: usize) -> crate::repository::MemoryCollection {
        let db = MemoryDatabase::new();
        let items = db.register(
            Schema::new("items", "item")
                .field(FieldRule::number("price"))
                .field(FieldRule::date("createdAt").default_now()),
        );
        for i in 0..count {
            let mut doc = Document::new();
            doc.insert("price".into(), json!(i * 100));
            items.create(doc).await.unwrap();
        }
        items
    }

    #[test]
    fn test_defaults_when_no_parameters() {
        let options = QueryOptions::default();
        let empty = spec("");
        let plan = Query::new(&empty, &options)
            .filter()
            .sort()
            .limit_fields()
            .window()
            .into_plan();

        assert!(plan.filter.is_empty());
        assert_eq!(plan.sort.to_string(), "-createdAt");
        assert_eq!(plan.projection, Projection::Exclude(vec!["__v".into()]));
        assert_eq!(plan.skip, 0);
        assert_eq!(plan.limit, Some(100));
    }

    #[test]
    fn test_page_three_of_ten() {
        let options = QueryOptions::default();
        let params = spec("page=3&limit=10");
        let plan = Query::new(&params, &options).window().into_plan();
        assert_eq!(plan.skip, 20);
        assert_eq!(plan.limit, Some(10));
    }

    #[test]
    fn test_window_is_permissive() {
        let options = QueryOptions::default();
        for (raw, skip, limit) in [
            ("limit=abc", 0, 100),
            ("limit=0", 0, 100),
            ("limit=-5&page=2", 100, 100),
            ("limit=2.9&page=2.5", 2, 2),
            ("page=0&limit=5", 0, 5),
            ("page=abc&limit=5", 0, 5),
        ] {
            let params = spec(raw);
            let plan = Query::new(&params, &options).window().into_plan();
            assert_eq!((plan.skip, plan.limit), (skip, Some(limit)), "{raw}");
        }
    }

    #[test]
    fn test_stages_leave_spec_untouched_and_strip_passwords() {
        let options = QueryOptions::default();
        let params = spec("fields=name,password&sort=-price,name&price[lt]=9");
        let before = params.clone();
        let plan = Query::new(&params, &options)
            .scoped(Filter::eq("tour", "tour_1"))
            .filter()
            .sort()
            .limit_fields()
            .into_plan();

        assert_eq!(params, before);
        assert_eq!(
            plan.filter.to_value(),
            json!({ "tour": "tour_1", "price": { "$lt": "9" } })
        );
        assert_eq!(plan.sort.to_string(), "-price name");
        assert_eq!(plan.projection, Projection::Include(vec!["name".into()]));
    }

    #[test]
    fn test_configured_options() {
        let options = QueryOptions::default()
            .with_default_sort("name")
            .with_default_limit(20)
            .with_default_exclusions(["__v", "internalNotes"])
            .with_sensitive_marker("secret");
        let params = spec("fields=name,secretCode");
        let plan = Query::new(&params, &options).sort().limit_fields().window().into_plan();
        assert_eq!(plan.sort.to_string(), "name");
        assert_eq!(plan.limit, Some(20));
        assert_eq!(plan.projection, Projection::Include(vec!["name".into()]));
    }

    #[tokio::test]
    async fn test_invalid_page_uses_awaited_filtered_count() {
        let store = seeded(12).await;
        let options = QueryOptions::default();

        // 12 documents in total, but only 4 priced at 800 or more.
        let params = spec("price[gte]=800&page=2&limit=4");
        let err = Query::new(&params, &options)
            .filter()
            .paginate(&store)
            .await
            .unwrap_err();
        assert_eq!(err, QueryError::InvalidPage { page: 2, skip: 4, total: 4 });

        let params = spec("price[gte]=800&page=1&limit=4");
        let found = Query::new(&params, &options)
            .filter()
            .paginate(&store)
            .await
            .unwrap()
            .execute(&store)
            .await
            .unwrap();
        assert_eq!(found.len(), 4);
    }

    #[tokio::test]
    async fn test_no_page_parameter_skips_the_bound_check() {
        let store = seeded(0).await;
        let options = QueryOptions::default();
        let params = spec("limit=5");
        let found = Query::new(&params, &options)
            .filter()
            .paginate(&store)
            .await
            .unwrap()
            .execute(&store)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_execute_orders_and_windows() {
        let store = seeded(6).await;
        let options = QueryOptions::default();
        let params = spec("sort=-price&fields=price&page=2&limit=2");
        let found = Query::new(&params, &options)
            .filter()
            .sort()
            .limit_fields()
            .paginate(&store)
            .await
            .unwrap()
            .execute(&store)
            .await
            .unwrap();

        let prices: Vec<Value> = found.iter().map(|d| d["price"].clone()).collect();
        assert_eq!(prices, vec![json!(300), json!(200)]);
        assert!(found.iter().all(|d| d.len() == 2 && d.contains_key("_id")));
    }
}
