//! List-request query building
//!
//! Turns a raw query string into a [`QueryPlan`]: a sanitized filter, a sort
//! order, a projection and a skip/limit window. See [`Query`] for the stages.

mod builder;
mod filter;
mod params;
mod projection;
mod sort;

pub use builder::{Query, QueryError, QueryOptions, QueryPlan};
pub use filter::{Filter, COMPARISON_OPERATORS, CONTROL_KEYS};
pub use params::{ParameterPolicy, QueryAlias, QuerySpec};
pub use projection::Projection;
pub use sort::{SortDirection, SortKey, SortOrder};
