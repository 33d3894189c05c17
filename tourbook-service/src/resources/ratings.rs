//! Tour rating aggregates kept in step with reviews

use std::collections::BTreeSet;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::query::{Filter, QueryPlan};
use crate::repository::{Document, DocumentStore, Expansion, RepositoryResult, ID_FIELD};

/// Average written to a tour that has no rated reviews.
pub const NO_RATINGS_AVERAGE: f64 = 4.5;

/// A review store that recomputes `ratingsQuantity` and `ratingsAverage` on
/// the affected tour after every create, update and delete.
///
/// The tours store should be unscoped so that secret tours stay accurate.
/// Clones share one recalculation lock.
#[derive(Debug, Clone)]
pub struct RatingsAggregator<R, T> {
    reviews: R,
    tours: T,
    recalculating: Arc<Mutex<()>>,
}

impl<R: DocumentStore, T: DocumentStore> RatingsAggregator<R, T> {
    pub fn new(reviews: R, tours: T) -> Self {
        Self {
            reviews,
            tours,
            recalculating: Arc::new(Mutex::new(())),
        }
    }

    pub fn reviews(&self) -> &R {
        &self.reviews
    }

    pub fn tours(&self) -> &T {
        &self.tours
    }

    /// Recompute one tour's aggregates from its reviews.
    ///
    /// The read and the write happen under the lock, so the last
    /// recalculation to finish always saw every review written before it.
    pub async fn recalculate(&self, tour_id: &str) -> RepositoryResult<()> {
        let _guard = self.recalculating.lock().await;
        let reviews = self.reviews.find_many(&QueryPlan::new(Filter::eq("tour", tour_id))).await?;
        let ratings: Vec<f64> = reviews
            .iter()
            .filter_map(|review| review.get("rating").and_then(Value::as_f64))
            .collect();

        let quantity = reviews.len() as u64;
        let average = if ratings.is_empty() {
            NO_RATINGS_AVERAGE
        } else {
            ratings.iter().sum::<f64>() / ratings.len() as f64
        };

        let mut patch = Document::new();
        patch.insert("ratingsQuantity".to_string(), Value::from(quantity));
        patch.insert("ratingsAverage".to_string(), json!(average));
        match self.tours.update_by_id(tour_id, patch).await? {
            Some(_) => tracing::debug!(tour = tour_id, quantity, average, "tour ratings recalculated"),
            None => tracing::debug!(tour = tour_id, "reviewed tour not found, ratings not updated"),
        }
        Ok(())
    }

    /// Recompute every reviewed tour. Returns how many tours were touched.
    pub async fn recalculate_all(&self) -> RepositoryResult<usize> {
        let reviews = self.reviews.find_many(&QueryPlan::default()).await?;
        let tour_ids: BTreeSet<String> = reviews.iter().filter_map(tour_of).collect();
        for tour_id in &tour_ids {
            self.recalculate(tour_id).await?;
        }
        Ok(tour_ids.len())
    }
}

/// The tour a review belongs to, whether stored as an id or expanded.
fn tour_of(review: &Document) -> Option<String> {
    match review.get("tour")? {
        Value::String(id) => Some(id.clone()),
        Value::Object(tour) => tour.get(ID_FIELD).and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

impl<R: DocumentStore, T: DocumentStore> DocumentStore for RatingsAggregator<R, T> {
    fn collection(&self) -> &str {
        self.reviews.collection()
    }

    async fn find_many(&self, plan: &QueryPlan) -> RepositoryResult<Vec<Document>> {
        self.reviews.find_many(plan).await
    }

    async fn count_matching(&self, filter: &Filter) -> RepositoryResult<u64> {
        self.reviews.count_matching(filter).await
    }

    async fn find_one(&self, filter: &Filter, expand: &[Expansion]) -> RepositoryResult<Option<Document>> {
        self.reviews.find_one(filter, expand).await
    }

    async fn create(&self, body: Document) -> RepositoryResult<Document> {
        let created = self.reviews.create(body).await?;
        if let Some(tour_id) = tour_of(&created) {
            self.recalculate(&tour_id).await?;
        }
        Ok(created)
    }

    async fn update_one(&self, filter: &Filter, patch: Document) -> RepositoryResult<Option<Document>> {
        let previous = self.reviews.find_one(filter, &[]).await?.as_ref().and_then(tour_of);
        let Some(updated) = self.reviews.update_one(filter, patch).await? else {
            return Ok(None);
        };
        let current = tour_of(&updated);
        let affected: BTreeSet<String> = previous.into_iter().chain(current).collect();
        for tour_id in &affected {
            self.recalculate(tour_id).await?;
        }
        Ok(Some(updated))
    }

    async fn delete_one(&self, filter: &Filter) -> RepositoryResult<Option<Document>> {
        let removed = self.reviews.delete_one(filter).await?;
        if let Some(tour_id) = removed.as_ref().and_then(tour_of) {
            self.recalculate(&tour_id).await?;
        }
        Ok(removed)
    }
}
