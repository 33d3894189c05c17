//! Multi-field ordering

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::repository::document::{get_path, Document, ID_FIELD};

/// Direction of one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// One field of an ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    /// Dotted field path
    pub field: String,
    /// Direction for this field
    pub direction: SortDirection,
}

/// An ordered list of sort keys.
///
/// Parsed from the client syntax `-price,name`: commas separate fields, a
/// leading `-` sorts that field descending. Unknown fields are kept as-is;
/// documents without the field sort as if the value were null.
///
/// ```rust
/// use tourbook_service::query::SortOrder;
///
/// let order = SortOrder::parse("-price,name");
/// assert_eq!(order.to_string(), "-price name");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SortOrder(Vec<SortKey>);

impl SortOrder {
    /// Parse a comma separated field list.
    pub fn parse(raw: &str) -> Self {
        let keys = raw
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| match token.strip_prefix('-') {
                Some(field) => SortKey {
                    field: field.to_string(),
                    direction: SortDirection::Descending,
                },
                None => SortKey {
                    field: token.to_string(),
                    direction: SortDirection::Ascending,
                },
            })
            .collect();
        Self(keys)
    }

    /// The keys in priority order.
    pub fn keys(&self) -> &[SortKey] {
        &self.0
    }

    /// Whether no ordering was requested.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compare two documents.
    ///
    /// Ties on every requested key fall back to ascending `_id` so that
    /// pagination over equal values is deterministic. An empty ordering
    /// compares everything equal, which keeps insertion order under a stable sort.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        if self.0.is_empty() {
            return Ordering::Equal;
        }
        self.0
            .iter()
            .map(|key| {
                let ordering = compare_values(get_path(a, &key.field), get_path(b, &key.field));
                match key.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            })
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| compare_values(a.get(ID_FIELD), b.get(ID_FIELD)))
    }
}

impl fmt::Display for SortOrder {
    /// The engine's space separated form, e.g. `-price name`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tokens: Vec<String> = self
            .0
            .iter()
            .map(|key| match key.direction {
                SortDirection::Ascending => key.field.clone(),
                SortDirection::Descending => format!("-{}", key.field),
            })
            .collect();
        write!(f, "{}", tokens.join(" "))
    }
}

/// Cross-type rank: missing/null, numbers, strings, objects, arrays, booleans.
fn type_rank(value: Option<&Value>) -> u8 {
    match value {
        None | Some(Value::Null) => 0,
        Some(Value::Number(_)) => 1,
        Some(Value::String(_)) => 2,
        Some(Value::Object(_)) => 3,
        Some(Value::Array(_)) => 4,
        Some(Value::Bool(_)) => 5,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Array(x)), Some(Value::Array(y))) => x
            .iter()
            .zip(y.iter())
            .map(|(l, r)| compare_values(Some(l), Some(r)))
            .find(|o| o.is_ne())
            .unwrap_or_else(|| x.len().cmp(&y.len())),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
