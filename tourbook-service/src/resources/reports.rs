//! Tour reports
//!
//! Aggregates over the tours clients can see, so secret tours never count.
//!
//! | Path | Report |
//! |------|--------|
//! | `/tours/tour-stats` | per-difficulty counts, ratings and prices for tours rated 4 or more |
//! | `/tours/monthly-plan/{year}` | tour starts per month of `year`, busiest month first |

use std::cmp::Ordering;
use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Datelike, NaiveDate, NaiveTime};
use serde_json::{json, Map, Value};

use super::{tours, Collections, TourStore};
use crate::handlers::{ApiError, ApiOperation, ErrorRenderer};
use crate::query::{Filter, QueryPlan};
use crate::repository::{number, parse_date, DocumentStore, RepositoryResult, ID_FIELD};

/// Tours rated below this are left out of the statistics.
pub const STATS_MIN_RATING: f64 = 4.0;

/// Most months a plan can list.
pub const PLAN_MONTHS: usize = 12;

#[derive(Debug, Default)]
struct DifficultyStats {
    tours: u64,
    ratings: f64,
    rating_sum: f64,
    rated: u64,
    price_sum: f64,
    priced: u64,
    min_price: Option<f64>,
    max_price: Option<f64>,
}

impl DifficultyStats {
    fn add(&mut self, tour: &Map<String, Value>) {
        self.tours += 1;
        if let Some(quantity) = tour.get("ratingsQuantity").and_then(Value::as_f64) {
            self.ratings += quantity;
        }
        if let Some(average) = tour.get("ratingsAverage").and_then(Value::as_f64) {
            self.rating_sum += average;
            self.rated += 1;
        }
        if let Some(price) = tour.get("price").and_then(Value::as_f64) {
            self.price_sum += price;
            self.priced += 1;
            self.min_price = Some(self.min_price.map_or(price, |min| min.min(price)));
            self.max_price = Some(self.max_price.map_or(price, |max| max.max(price)));
        }
    }

    fn avg_price(&self) -> Option<f64> {
        (self.priced > 0).then(|| self.price_sum / self.priced as f64)
    }

    fn into_row(self, difficulty: Option<String>) -> Value {
        let avg_ratings = (self.rated > 0).then(|| self.rating_sum / self.rated as f64);
        json!({
            ID_FIELD: difficulty,
            "numTours": self.tours,
            "numRatings": to_json(Some(self.ratings)),
            "avgRatings": to_json(avg_ratings),
            "avgPrice": to_json(self.avg_price()),
            "minPrice": to_json(self.min_price),
            "maxPrice": to_json(self.max_price),
        })
    }
}

fn to_json(value: Option<f64>) -> Value {
    value.and_then(number).unwrap_or(Value::Null)
}

/// Per-difficulty statistics of the tours rated [`STATS_MIN_RATING`] or
/// more, cheapest average price first.
pub async fn tour_stats<S: DocumentStore>(store: &S) -> RepositoryResult<Vec<Value>> {
    let filter = Filter::eq("ratingsAverage", json!({ "$gte": STATS_MIN_RATING }));
    let tours = store.find_many(&QueryPlan::new(filter)).await?;

    let mut groups: BTreeMap<Option<String>, DifficultyStats> = BTreeMap::new();
    for tour in &tours {
        let difficulty = tour.get("difficulty").and_then(Value::as_str).map(str::to_string);
        groups.entry(difficulty).or_default().add(tour);
    }

    let mut groups: Vec<_> = groups.into_iter().collect();
    groups.sort_by(|(_, a), (_, b)| {
        a.avg_price()
            .partial_cmp(&b.avg_price())
            .unwrap_or(Ordering::Equal)
    });
    Ok(groups
        .into_iter()
        .map(|(difficulty, stats)| stats.into_row(difficulty))
        .collect())
}

/// Tour starts in each month of `year`, busiest month first.
///
/// A start counts when it falls between midnight UTC on January 1st and
/// midnight UTC on December 31st, both inclusive.
pub async fn monthly_plan<S: DocumentStore>(store: &S, year: i32) -> RepositoryResult<Vec<Value>> {
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return Ok(Vec::new());
    };
    let first = first.and_time(NaiveTime::MIN).and_utc();
    let last = last.and_time(NaiveTime::MIN).and_utc();

    let tours = store.find_many(&QueryPlan::new(Filter::new())).await?;
    let mut months: BTreeMap<u32, (u64, Vec<Value>)> = BTreeMap::new();
    for tour in &tours {
        let Some(Value::Array(starts)) = tour.get("startDates") else {
            continue;
        };
        for start in starts.iter().filter_map(parse_date) {
            if start < first || start > last {
                continue;
            }
            let (count, names) = months.entry(start.month()).or_default();
            *count += 1;
            if let Some(name) = tour.get("name") {
                names.push(name.clone());
            }
        }
    }

    let mut plan: Vec<_> = months.into_iter().collect();
    plan.sort_by(|(_, (a, _)), (_, (b, _))| b.cmp(a));
    plan.truncate(PLAN_MONTHS);
    Ok(plan
        .into_iter()
        .map(|(month, (count, names))| {
            json!({ "numTourStarts": count, "tours": names, "month": month })
        })
        .collect())
}

#[derive(Clone)]
struct ReportState {
    tours: TourStore,
    renderer: ErrorRenderer,
}

impl ReportState {
    fn respond(&self, key: &str, rows: RepositoryResult<Vec<Value>>) -> Response {
        match rows {
            Ok(rows) => {
                let mut data = Map::new();
                data.insert(key.to_string(), Value::Array(rows));
                (StatusCode::OK, Json(json!({ "status": "success", "data": data }))).into_response()
            }
            Err(err) => self
                .renderer
                .render(&ApiError::from(err).with_operation(ApiOperation::Report)),
        }
    }
}

/// Mount both reports, ready to be merged into the tour routes.
pub fn routes(collections: &Collections, renderer: ErrorRenderer) -> Router {
    Router::new()
        .route("/tour-stats", get(get_tour_stats))
        .route("/monthly-plan/{year}", get(get_monthly_plan))
        .with_state(ReportState {
            tours: tours::store(collections),
            renderer,
        })
}

async fn get_tour_stats(State(state): State<ReportState>) -> Response {
    state.respond("stats", tour_stats(&state.tours).await)
}

async fn get_monthly_plan(State(state): State<ReportState>, Path(year): Path<String>) -> Response {
    let Ok(year) = year.trim().parse::<i32>() else {
        let error = ApiError::validation(ApiOperation::Report, format!("Invalid year : {year}"));
        return state.renderer.render(&error);
    };
    state.respond("plan", monthly_plan(&state.tours, year).await)
}
