//! Reviews

use super::ratings::RatingsAggregator;
use super::{users, Collections, ResourceKind, ReviewStore};
use crate::handlers::{ParentScope, ResourceHandlers};
use crate::query::{Projection, QueryOptions};
use crate::repository::{Expansion, FieldRule, Schema};

pub const COLLECTION: &str = "reviews";

/// Route parameter carrying the parent tour's id on nested routes.
pub const TOUR_PARAM: &str = "tourId";

/// Path segment of the nested review routes under a tour.
pub const NESTED_SEGMENT: &str = "reviews";

pub fn schema() -> Schema {
    Schema::new(COLLECTION, "review")
        .field(FieldRule::string("review").required("Review cannot be empty..."))
        .field(
            FieldRule::number("rating")
                .min(1.0, "Rating must be above 1")
                .max(5.0, "Rating must be below 5"),
        )
        .field(FieldRule::date("createdAt").default_now())
        .field(FieldRule::reference("tour").required("Review must belong to a tour..."))
        .field(FieldRule::reference("user").required("Review must belong to a user..."))
        .unique_together(["tour", "user"], "User has already posted a review on this...")
}

/// Inline the author's public profile.
pub fn author() -> Expansion {
    Expansion::reference("user", users::COLLECTION)
        .select(Projection::include(["name", "photo"]))
        .only(users::visibility())
}

pub fn store(collections: &Collections) -> ReviewStore {
    RatingsAggregator::new(collections.reviews.clone(), collections.tours.clone())
}

pub fn handlers(collections: &Collections, options: QueryOptions) -> ResourceHandlers<ReviewStore> {
    ResourceHandlers::new(ResourceKind::Reviews.to_string(), store(collections))
        .with_options(options)
        .with_parent(ParentScope::new(TOUR_PARAM, "tour"))
        .expand_list(vec![author()])
        .expand_item(vec![author()])
}
