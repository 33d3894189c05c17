//! The application router
//!
//! | Path | Methods |
//! |------|---------|
//! | `/api/v1/tours` | GET, POST |
//! | `/api/v1/tours/top-5-cheap` | GET |
//! | `/api/v1/tours/tour-stats`, `/api/v1/tours/monthly-plan/{year}` | GET |
//! | `/api/v1/tours/{id}` | GET, PATCH, DELETE |
//! | `/api/v1/tours/{id}/reviews` | GET, POST |
//! | `/api/v1/users` | GET |
//! | `/api/v1/users/{id}` | GET, PATCH, DELETE |
//! | `/api/v1/reviews`, `/api/v1/bookings` | GET, POST |
//! | `/api/v1/reviews/{id}`, `/api/v1/bookings/{id}` | GET, PATCH, DELETE |
//! | `/health`, `/ready` | GET |
//!
//! Anything else is a 404 rendered like every other API error. Every
//! `/api/v1` route shares the per-client rate limit when it is enabled.

use std::sync::Arc;

use axum::{extract::State, http::Uri, response::Response, routing::get, Router};

use crate::handlers::{alias_route, collection_routes, nested_collection_routes, ApiError, ApiOperation};
use crate::health::{health, readiness};
use crate::resources::{bookings, reports, reviews, tours, users};
use crate::state::AppState;

/// Prefix of every resource route
pub const API_PREFIX: &str = "/api/v1";

/// Build the router over `state`. Server-wide layers are added by
/// [`Server`](crate::server::Server).
pub fn router(state: &AppState) -> Router {
    let renderer = state.renderer();
    let options = state.query_options();
    let collections = state.collections();

    let tour_handlers = Arc::new(tours::handlers(collections, options.clone()));
    let user_handlers = Arc::new(users::handlers(collections, options.clone()));
    let review_handlers = Arc::new(reviews::handlers(collections, options.clone()));
    let booking_handlers = Arc::new(bookings::handlers(collections, options.clone()));

    let tour_routes = collection_routes(tour_handlers.clone(), renderer, &ApiOperation::RESOURCE)
        .merge(alias_route(tour_handlers, renderer, tours::top_five_cheap()))
        .merge(reports::routes(collections, renderer))
        .merge(nested_collection_routes(
            review_handlers.clone(),
            renderer,
            reviews::NESTED_SEGMENT,
        ));

    let api = Router::new()
        .nest("/tours", tour_routes)
        .nest("/users", collection_routes(user_handlers, renderer, &users::OPERATIONS))
        .nest(
            "/reviews",
            collection_routes(review_handlers, renderer, &ApiOperation::RESOURCE),
        )
        .nest(
            "/bookings",
            collection_routes(booking_handlers, renderer, &ApiOperation::RESOURCE),
        );
    let api = match state.rate_limit() {
        Some(rate_limit) => rate_limit.clone().apply(api),
        None => api,
    };

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(readiness))
        .fallback(route_not_found)
        .with_state(state.clone())
        .nest(API_PREFIX, api)
}

async fn route_not_found(State(state): State<AppState>, uri: Uri) -> Response {
    let target = uri.path_and_query().map_or_else(|| uri.path().to_string(), |pq| pq.to_string());
    state.renderer().render(&ApiError::route_not_found(target))
}
