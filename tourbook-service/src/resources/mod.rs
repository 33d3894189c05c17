//! The four resources served by the API
//!
//! Each submodule declares one collection's [`Schema`](crate::repository::Schema),
//! its visibility rules and related-document expansions, and builds its
//! [`ResourceHandlers`](crate::handlers::ResourceHandlers).

pub mod bookings;
pub mod ratings;
pub mod reports;
pub mod reviews;
pub mod tours;
pub mod users;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::query::ParameterPolicy;
use crate::repository::{ImportMode, MemoryCollection, MemoryDatabase, ScopedStore};

pub use ratings::RatingsAggregator;

/// Tours as clients see them: secret tours excluded.
pub type TourStore = ScopedStore<MemoryCollection>;

/// Users as clients see them: deactivated accounts excluded.
pub type UserStore = ScopedStore<MemoryCollection>;

/// Reviews, keeping tour ratings current on every write.
pub type ReviewStore = RatingsAggregator<MemoryCollection, MemoryCollection>;

/// Resource type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Tours,
    Users,
    Reviews,
    Bookings,
}

impl ResourceKind {
    /// Every resource, in seeding order.
    pub const ALL: [ResourceKind; 4] = [Self::Tours, Self::Users, Self::Reviews, Self::Bookings];

    pub fn collection(&self) -> &'static str {
        match self {
            Self::Tours => tours::COLLECTION,
            Self::Users => users::COLLECTION,
            Self::Reviews => reviews::COLLECTION,
            Self::Bookings => bookings::COLLECTION,
        }
    }

    /// Seed file name for this resource.
    pub fn seed_file(&self) -> String {
        format!("{}.json", self.collection())
    }

    /// Seeded users carry already-hashed passwords and no confirmation, so
    /// they skip validation.
    pub fn import_mode(&self) -> ImportMode {
        match self {
            Self::Users => ImportMode::Trusted,
            _ => ImportMode::Validate,
        }
    }

    pub fn parameter_policy(&self) -> ParameterPolicy {
        match self {
            Self::Tours => tours::parameter_policy(),
            _ => ParameterPolicy::new(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.collection())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection() == s.trim().to_ascii_lowercase())
            .ok_or_else(|| format!("unknown resource '{s}' (expected tours, users, reviews or bookings)"))
    }
}

/// Handles to the registered collections, unscoped.
#[derive(Debug, Clone)]
pub struct Collections {
    pub tours: MemoryCollection,
    pub users: MemoryCollection,
    pub reviews: MemoryCollection,
    pub bookings: MemoryCollection,
}

impl Collections {
    /// Register every resource schema with `db`.
    pub fn register(db: &MemoryDatabase) -> Self {
        Self {
            tours: db.register(tours::schema()),
            users: db.register(users::schema()),
            reviews: db.register(reviews::schema()),
            bookings: db.register(bookings::schema()),
        }
    }

    pub fn get(&self, kind: ResourceKind) -> &MemoryCollection {
        match kind {
            ResourceKind::Tours => &self.tours,
            ResourceKind::Users => &self.users,
            ResourceKind::Reviews => &self.reviews,
            ResourceKind::Bookings => &self.bookings,
        }
    }

    /// Aggregator over the stored reviews and unscoped tours.
    pub fn ratings(&self) -> ReviewStore {
        reviews::store(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_kind_parsing() {
        assert_eq!("tours".parse::<ResourceKind>(), Ok(ResourceKind::Tours));
        assert_eq!(" Reviews ".parse::<ResourceKind>(), Ok(ResourceKind::Reviews));
        assert!("guides".parse::<ResourceKind>().is_err());
        assert_eq!(ResourceKind::Bookings.to_string(), "bookings");
        assert_eq!(ResourceKind::Users.seed_file(), "users.json");
    }

    #[test]
    fn test_register_is_idempotent() {
        let db = MemoryDatabase::new();
        Collections::register(&db);
        Collections::register(&db);
        assert_eq!(db.collection_names(), vec!["bookings", "reviews", "tours", "users"]);
    }
}
