//! Engine-native filter predicates
//!
//! A [`Filter`] is a JSON object in the document engine's query language:
//! plain keys are field paths, `$`-prefixed keys are operators.
//!
//! ```rust
//! use tourbook_service::query::{Filter, ParameterPolicy, QuerySpec};
//! use serde_json::json;
//!
//! let spec = QuerySpec::parse("price[gte]=500&sort=-price&page=2", &ParameterPolicy::new());
//! let filter = Filter::from_spec(&spec);
//!
//! assert_eq!(filter.to_value(), json!({ "price": { "$gte": "500" } }));
//! ```
//!
//! Supported operators: `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`,
//! `$nin`, `$exists` on fields, and `$and` / `$or` at the top level.
//! String query values are compared against numeric and boolean fields by
//! their parsed value, the way query strings reach the engine.

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Value};

use super::params::QuerySpec;
use crate::repository::document::{lookup, Document, ID_FIELD};

/// Parameters that steer the query instead of filtering it.
pub const CONTROL_KEYS: [&str; 4] = ["page", "sort", "limit", "fields"];

/// Comparison words clients may use as bracket keys (`price[gte]=500`).
pub const COMPARISON_OPERATORS: [&str; 4] = ["gte", "gt", "lte", "lt"];

/// A predicate over documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Filter(Map<String, Value>);

impl Filter {
    /// The filter matching every document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a raw filter object.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// `field == value`.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut map = Map::new();
        map.insert(field.into(), value.into());
        Self(map)
    }

    /// `_id == id`.
    pub fn by_id(id: &str) -> Self {
        Self::eq(ID_FIELD, id)
    }

    /// `field != value`.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut op = Map::new();
        op.insert("$ne".to_string(), value.into());
        Self::eq(field, Value::Object(op))
    }

    /// Build the filter a client asked for.
    ///
    /// Control keys are removed and comparison words used as object keys are
    /// rewritten to their `$` form at every depth. Values are never touched,
    /// so `name=lt` still means the literal string `"lt"`.
    pub fn from_spec(spec: &QuerySpec) -> Self {
        let map = spec
            .as_map()
            .iter()
            .filter(|(key, _)| !CONTROL_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), rewrite_operators(value.clone())))
            .collect();
        Self(map)
    }

    /// Combine two filters; a document must satisfy both.
    ///
    /// Disjoint filters are merged into one object. When both constrain the
    /// same key the result is an explicit `$and` so neither side is lost.
    #[must_use]
    pub fn and(self, other: Filter) -> Filter {
        if self.0.is_empty() {
            return other;
        }
        if other.0.is_empty() {
            return self;
        }
        if self.0.keys().any(|key| other.0.contains_key(key)) {
            let mut map = Map::new();
            map.insert(
                "$and".to_string(),
                Value::Array(vec![Value::Object(self.0), Value::Object(other.0)]),
            );
            return Filter(map);
        }
        let mut merged = self.0;
        merged.extend(other.0);
        Filter(merged)
    }

    /// Constraint on a top-level key, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the filter has no constraints.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The filter as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Evaluate the filter against a document.
    pub fn matches(&self, doc: &Document) -> bool {
        matches_map(&self.0, doc)
    }
}

fn rewrite_operators(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| {
                    let key = if COMPARISON_OPERATORS.contains(&key.as_str()) {
                        format!("${key}")
                    } else {
                        key
                    };
                    (key, rewrite_operators(inner))
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(rewrite_operators).collect()),
        other => other,
    }
}

fn matches_map(filter: &Map<String, Value>, doc: &Document) -> bool {
    filter.iter().all(|(key, condition)| match key.as_str() {
        "$and" => sub_filters(condition).all(|f| matches_map(f, doc)),
        "$or" => sub_filters(condition).any(|f| matches_map(f, doc)),
        _ => matches_field(&lookup(doc, key), condition),
    })
}

fn sub_filters(condition: &Value) -> impl Iterator<Item = &Map<String, Value>> {
    condition
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn is_operator_object(condition: &Value) -> Option<&Map<String, Value>> {
    let map = condition.as_object()?;
    (!map.is_empty() && map.keys().all(|k| k.starts_with('$'))).then_some(map)
}

/// Candidate values for a path: each found value, plus the elements of any
/// array found, so array fields match on membership.
fn candidates<'a>(found: &[&'a Value]) -> Vec<&'a Value> {
    let mut out = Vec::new();
    for value in found {
        out.push(*value);
        if let Value::Array(items) = value {
            out.extend(items.iter());
        }
    }
    out
}

fn matches_field(found: &[&Value], condition: &Value) -> bool {
    let values = candidates(found);
    match is_operator_object(condition) {
        Some(operators) => operators
            .iter()
            .all(|(op, operand)| apply_operator(op, &values, found.is_empty(), operand)),
        None => equals_any(&values, condition),
    }
}

fn equals_any(values: &[&Value], condition: &Value) -> bool {
    if values.iter().any(|v| loosely_equal(v, condition)) {
        return true;
    }
    // An array given for a scalar field means "any of these".
    match condition {
        Value::Array(options) => options
            .iter()
            .any(|option| values.iter().any(|v| loosely_equal(v, option))),
        Value::Null => values.is_empty(),
        _ => false,
    }
}

fn apply_operator(op: &str, values: &[&Value], missing: bool, operand: &Value) -> bool {
    match op {
        "$eq" => equals_any(values, operand),
        "$ne" => !equals_any(values, operand),
        "$gt" => values.iter().any(|v| compare(v, operand) == Some(Ordering::Greater)),
        "$gte" => values
            .iter()
            .any(|v| matches!(compare(v, operand), Some(Ordering::Greater | Ordering::Equal))),
        "$lt" => values.iter().any(|v| compare(v, operand) == Some(Ordering::Less)),
        "$lte" => values
            .iter()
            .any(|v| matches!(compare(v, operand), Some(Ordering::Less | Ordering::Equal))),
        "$in" => as_list(operand).iter().any(|o| values.iter().any(|v| loosely_equal(v, o))),
        "$nin" => !as_list(operand).iter().any(|o| values.iter().any(|v| loosely_equal(v, o))),
        "$exists" => truthy(operand) != missing,
        // Unknown operators never match.
        _ => false,
    }
}

fn as_list(operand: &Value) -> Vec<Value> {
    match operand {
        Value::Array(items) => items.clone(),
        Value::String(s) => s.split(',').map(|p| Value::String(p.to_string())).collect(),
        other => vec![other.clone()],
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => !matches!(s.as_str(), "false" | "0" | ""),
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::Null => false,
        _ => true,
    }
}

/// Equality with the query value cast to the stored value's type.
fn loosely_equal(stored: &Value, query: &Value) -> bool {
    match (stored, query) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Value::Number(a), Value::String(b)) => {
            b.trim().parse::<f64>().ok() == a.as_f64()
        }
        (Value::Bool(a), Value::String(b)) => b.parse::<bool>().ok() == Some(*a),
        (Value::String(a), Value::Number(b)) => *a == b.to_string(),
        (Value::String(a), Value::Bool(b)) => *a == b.to_string(),
        _ => stored == query,
    }
}

/// Ordering of a stored value relative to a query value, when comparable.
fn compare(stored: &Value, query: &Value) -> Option<Ordering> {
    match (stored, query) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::Number(a), Value::String(b)) => {
            a.as_f64()?.partial_cmp(&b.trim().parse::<f64>().ok()?)
        }
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::params::ParameterPolicy;
    use proptest::prelude::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn spec(raw: &str) -> QuerySpec {
        QuerySpec::parse(raw, &ParameterPolicy::new())
    }

    #[test]
    fn test_control_keys_are_stripped() {
        let filter = Filter::from_spec(&spec("page=2&sort=price&limit=5&fields=name&difficulty=easy"));
        assert_eq!(filter.to_value(), json!({ "difficulty": "easy" }));
    }

    #[test]
    fn test_operator_rewrite_reaches_nested_keys() {
        let filter = Filter::from_spec(&spec(
            "price[gte]=500&price[lt]=1500&startLocation[coordinates][lte]=10",
        ));
        assert_eq!(
            filter.to_value(),
            json!({
                "price": { "$gte": "500", "$lt": "1500" },
                "startLocation": { "coordinates": { "$lte": "10" } }
            })
        );
    }

    #[test]
    fn test_operator_words_in_values_are_left_alone() {
        let filter = Filter::from_spec(&spec("name=gte&summary=lt"));
        assert_eq!(filter.to_value(), json!({ "name": "gte", "summary": "lt" }));
    }

    #[test]
    fn test_from_spec_does_not_mutate_the_spec() {
        let original = spec("price[gte]=500&page=1");
        let before = original.clone();
        let _ = Filter::from_spec(&original);
        assert_eq!(original, before);
    }

    #[test]
    fn test_comparisons_cast_query_strings_to_numbers() {
        let tour = doc(json!({ "price": 997, "duration": 5 }));

        assert!(Filter::from_spec(&spec("price[gte]=500")).matches(&tour));
        assert!(Filter::from_spec(&spec("price[gt]=996.5")).matches(&tour));
        assert!(!Filter::from_spec(&spec("price[lt]=997")).matches(&tour));
        assert!(Filter::from_spec(&spec("price[lte]=997")).matches(&tour));
        assert!(Filter::from_spec(&spec("duration=5")).matches(&tour));
        assert!(!Filter::from_spec(&spec("duration=7")).matches(&tour));
        assert!(!Filter::from_spec(&spec("price[gte]=abc")).matches(&tour));
    }

    #[test]
    fn test_boolean_fields_match_query_strings() {
        let tour = doc(json!({ "secretTour": true }));
        assert!(Filter::from_spec(&spec("secretTour=true")).matches(&tour));
        assert!(!Filter::from_spec(&spec("secretTour=false")).matches(&tour));
    }

    #[test]
    fn test_array_fields_match_on_membership() {
        let tour = doc(json!({ "guides": ["user_a", "user_b"] }));
        assert!(Filter::eq("guides", "user_b").matches(&tour));
        assert!(!Filter::eq("guides", "user_c").matches(&tour));
    }

    #[test]
    fn test_array_query_on_scalar_field_means_any_of() {
        let policy = ParameterPolicy::new().with_whitelist(["difficulty"]);
        let filter = Filter::from_spec(&QuerySpec::parse(
            "difficulty=easy&difficulty=medium",
            &policy,
        ));
        assert!(filter.matches(&doc(json!({ "difficulty": "medium" }))));
        assert!(!filter.matches(&doc(json!({ "difficulty": "difficult" }))));
    }

    #[test]
    fn test_ne_matches_missing_fields() {
        let hidden = Filter::ne("secretTour", true);
        assert!(hidden.matches(&doc(json!({ "name": "a" }))));
        assert!(hidden.matches(&doc(json!({ "secretTour": false }))));
        assert!(!hidden.matches(&doc(json!({ "secretTour": true }))));
    }

    #[test]
    fn test_in_nin_and_exists() {
        let tour = doc(json!({ "difficulty": "easy", "price": 400 }));
        let filter = |value: Value| Filter::from_map(value.as_object().cloned().unwrap());

        assert!(filter(json!({ "difficulty": { "$in": ["easy", "medium"] } })).matches(&tour));
        assert!(!filter(json!({ "difficulty": { "$nin": ["easy"] } })).matches(&tour));
        assert!(filter(json!({ "price": { "$exists": true } })).matches(&tour));
        assert!(filter(json!({ "priceDiscount": { "$exists": false } })).matches(&tour));
        assert!(!filter(json!({ "price": { "$regex": "4" } })).matches(&tour));
    }

    #[test]
    fn test_and_merges_disjoint_and_nests_conflicts() {
        let merged = Filter::eq("tour", "t1").and(Filter::eq("rating", 5));
        assert_eq!(merged.to_value(), json!({ "tour": "t1", "rating": 5 }));

        let conflicting = Filter::eq("tour", "t1").and(Filter::eq("tour", "t2"));
        assert_eq!(
            conflicting.to_value(),
            json!({ "$and": [{ "tour": "t1" }, { "tour": "t2" }] })
        );
        assert!(!conflicting.matches(&doc(json!({ "tour": "t1" }))));
        assert!(Filter::new().and(Filter::new()).is_empty());
    }

    #[test]
    fn test_or_matches_any_branch() {
        let filter = Filter::from_map(
            json!({ "$or": [{ "price": 1 }, { "price": 2 }] })
                .as_object()
                .cloned()
                .unwrap(),
        );
        assert!(filter.matches(&doc(json!({ "price": 2 }))));
        assert!(!filter.matches(&doc(json!({ "price": 3 }))));
    }

    #[test]
    fn test_dotted_paths() {
        let tour = doc(json!({ "startLocation": { "address": "Miami, USA" } }));
        assert!(Filter::eq("startLocation.address", "Miami, USA").matches(&tour));
    }

    fn key_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("page".to_string()),
            Just("sort".to_string()),
            Just("limit".to_string()),
            Just("fields".to_string()),
            "[a-z]{1,8}",
        ]
    }

    proptest! {
        #[test]
        fn prop_control_keys_never_reach_the_filter(
            pairs in proptest::collection::vec((key_strategy(), "[a-z0-9]{0,6}"), 0..12)
        ) {
            let raw = pairs
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("&");
            let filter = Filter::from_spec(&spec(&raw));
            for key in CONTROL_KEYS {
                prop_assert!(filter.get(key).is_none());
            }
        }

        #[test]
        fn prop_bracket_comparisons_are_rewritten(
            field in "[a-z]{1,8}",
            nested in proptest::option::of("[a-z]{1,8}"),
            op_index in 0usize..4,
            value in 0u32..10_000,
        ) {
            prop_assume!(!CONTROL_KEYS.contains(&field.as_str()));
            prop_assume!(!COMPARISON_OPERATORS.contains(&field.as_str()));
            let op = COMPARISON_OPERATORS[op_index];
            let key = match &nested {
                Some(inner) => {
                    prop_assume!(!COMPARISON_OPERATORS.contains(&inner.as_str()));
                    format!("{field}[{inner}][{op}]")
                }
                None => format!("{field}[{op}]"),
            };
            let filter = Filter::from_spec(&spec(&format!("{key}={value}")));

            let mut expected = json!({ format!("${op}"): value.to_string() });
            if let Some(inner) = &nested {
                expected = json!({ inner.clone(): expected });
            }
            prop_assert_eq!(filter.get(&field), Some(&expected));
        }
    }
}
