//! Bookings

use super::{tours, users, Collections, ResourceKind};
use crate::handlers::ResourceHandlers;
use crate::query::{Projection, QueryOptions};
use crate::repository::{Expansion, FieldRule, MemoryCollection, Schema};

pub const COLLECTION: &str = "bookings";

pub fn schema() -> Schema {
    Schema::new(COLLECTION, "booking")
        .field(FieldRule::reference("tour").required("Booking must belong to a tour!"))
        .field(FieldRule::reference("user").required("Booking must belong to a user!"))
        .field(FieldRule::number("price").required("Booking must have a price."))
        .field(FieldRule::date("createdAt").default_now())
        .field(FieldRule::boolean("paid").default_value(true))
}

/// Who booked and what, inlined on every read.
pub fn expansions() -> Vec<Expansion> {
    vec![
        Expansion::reference("user", users::COLLECTION).only(users::visibility()),
        Expansion::reference("tour", tours::COLLECTION).select(Projection::include(["name"])),
    ]
}

pub fn handlers(collections: &Collections, options: QueryOptions) -> ResourceHandlers<MemoryCollection> {
    ResourceHandlers::new(ResourceKind::Bookings.to_string(), collections.bookings.clone())
        .with_options(options)
        .expand_list(expansions())
        .expand_item(expansions())
}
