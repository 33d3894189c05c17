//! Raw request parameters
//!
//! A [`QuerySpec`] is the untyped parameter map a list request arrives with.
//! Query strings are parsed with bracket notation, so `price[gte]=500`
//! becomes `{"price": {"gte": "500"}}`, nesting to any depth.
//!
//! Two sanitizing policies apply while parsing:
//!
//! - any key or bracket segment starting with `$` is dropped, so clients
//!   cannot smuggle engine operators into a filter;
//! - a top-level key given more than once keeps only its last value, unless
//!   the resource's [`ParameterPolicy`] whitelists it, in which case every
//!   value is kept as an array.
//!
//! ```rust
//! use tourbook_service::query::{ParameterPolicy, QuerySpec};
//! use serde_json::json;
//!
//! let policy = ParameterPolicy::new().with_whitelist(["duration"]);
//! let spec = QuerySpec::parse("duration=5&duration=9&sort=price&sort=-price", &policy);
//!
//! assert_eq!(spec.get("duration"), Some(&json!(["5", "9"])));
//! assert_eq!(spec.get("sort"), Some(&json!("-price")));
//! ```

use std::collections::BTreeSet;

use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde_json::{Map, Value};

/// Which top-level parameters may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterPolicy {
    whitelist: BTreeSet<String>,
}

impl ParameterPolicy {
    /// A policy where every repeated key collapses to its last value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow the given keys to repeat.
    #[must_use]
    pub fn with_whitelist<I, K>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.whitelist.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Whether `key` keeps all of its values when repeated.
    pub fn allows_repeated(&self, key: &str) -> bool {
        self.whitelist.contains(key)
    }
}

/// A named preset of parameters that overrides whatever the client sent.
///
/// Aliases model routes like "top five cheapest tours", which are an
/// ordinary list request with fixed `limit`, `sort` and `fields`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryAlias {
    name: String,
    overrides: Vec<(String, String)>,
}

impl QueryAlias {
    /// Create an alias with no overrides.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overrides: Vec::new(),
        }
    }

    /// Force `key` to `value`.
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.push((key.into(), value.into()));
        self
    }

    /// The alias name, used as its route segment.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The raw, read-only parameter map of one list request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct QuerySpec(Map<String, Value>);

impl QuerySpec {
    /// An empty parameter map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already-structured parameter map.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Parse a raw query string (without the leading `?`).
    pub fn parse(raw: &str, policy: &ParameterPolicy) -> Self {
        let mut map = Map::new();
        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            let (raw_key, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let key = decode(raw_key);
            let value = decode(raw_value);

            let Some(segments) = key_segments(&key) else {
                continue;
            };
            if segments.iter().any(|s| s.starts_with('$')) {
                continue;
            }
            insert(&mut map, &segments, value, policy);
        }
        Self(map)
    }

    /// Apply an alias, overwriting any client-supplied values for its keys.
    #[must_use]
    pub fn with_alias(mut self, alias: &QueryAlias) -> Self {
        for (key, value) in &alias.overrides {
            self.0.insert(key.clone(), Value::String(value.clone()));
        }
        self
    }

    /// Look up a parameter.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether the parameter was supplied at all.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// A parameter rendered as a single string.
    ///
    /// Numbers are formatted and arrays yield their last element.
    pub fn scalar(&self, key: &str) -> Option<String> {
        scalar(self.0.get(key)?)
    }

    /// The underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Whether no parameters were supplied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => items.last().and_then(scalar),
        Value::Null | Value::Object(_) => None,
    }
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// Split `a[b][c]` into `["a", "b", "c"]`. An empty bracket (`a[]`) yields an
/// empty segment meaning "append".
fn key_segments(key: &str) -> Option<Vec<String>> {
    let (base, mut rest) = match key.find('[') {
        Some(idx) if idx > 0 => (&key[..idx], &key[idx..]),
        Some(_) => return None,
        None => (key, ""),
    };
    if base.is_empty() {
        return None;
    }

    let mut segments = vec![base.to_string()];
    while let Some(stripped) = rest.strip_prefix('[') {
        let Some(end) = stripped.find(']') else {
            // Unbalanced brackets: keep the remainder as part of the last segment.
            if let Some(last) = segments.last_mut() {
                last.push_str(rest);
            }
            break;
        };
        segments.push(stripped[..end].to_string());
        rest = &stripped[end + 1..];
    }
    Some(segments)
}

fn insert(map: &mut Map<String, Value>, segments: &[String], value: String, policy: &ParameterPolicy) {
    let Some((head, tail)) = segments.split_first() else {
        return;
    };

    if tail.is_empty() {
        let incoming = Value::String(value);
        if policy.allows_repeated(head) {
            if let Some(existing) = map.get_mut(head) {
                match existing {
                    Value::Array(items) => items.push(incoming),
                    other => {
                        let previous = other.take();
                        *other = Value::Array(vec![previous, incoming]);
                    }
                }
                return;
            }
        }
        map.insert(head.clone(), incoming);
        return;
    }

    if tail.len() == 1 && tail[0].is_empty() {
        let entry = map
            .entry(head.clone())
            .or_insert_with(|| Value::Array(Vec::new()));
        match entry {
            Value::Array(items) => items.push(Value::String(value)),
            other => *other = Value::Array(vec![Value::String(value)]),
        }
        return;
    }

    let entry = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !entry.is_object() {
        *entry = Value::Object(Map::new());
    }
    if let Value::Object(child) = entry {
        // Repetition policy only governs top-level keys; nested leaves keep the last value.
        insert(child, tail, value, &ParameterPolicy::default());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: &str) -> QuerySpec {
        QuerySpec::parse(raw, &ParameterPolicy::new())
    }

    #[test]
    fn test_bracket_keys_nest() {
        let spec = parse("price[gte]=500&price[lt]=1500&startLocation[address][city]=Miami");
        assert_eq!(spec.get("price"), Some(&json!({ "gte": "500", "lt": "1500" })));
        assert_eq!(
            spec.get("startLocation"),
            Some(&json!({ "address": { "city": "Miami" } }))
        );
    }

    #[test]
    fn test_values_are_percent_decoded() {
        let spec = parse("name=The%20Forest+Hiker&fields=name%2Cprice");
        assert_eq!(spec.scalar("name").as_deref(), Some("The Forest Hiker"));
        assert_eq!(spec.scalar("fields").as_deref(), Some("name,price"));
    }

    #[test]
    fn test_dollar_keys_are_dropped_at_any_depth() {
        let spec = parse("$where=1&price[$ne]=0&duration=5");
        assert!(!spec.contains("$where"));
        assert!(!spec.contains("price"));
        assert_eq!(spec.scalar("duration").as_deref(), Some("5"));
    }

    #[test]
    fn test_repeated_keys_collapse_unless_whitelisted() {
        let policy = ParameterPolicy::new().with_whitelist(["difficulty"]);
        let spec = QuerySpec::parse(
            "sort=price&sort=-duration&difficulty=easy&difficulty=medium&difficulty=difficult",
            &policy,
        );
        assert_eq!(spec.get("sort"), Some(&json!("-duration")));
        assert_eq!(spec.get("difficulty"), Some(&json!(["easy", "medium", "difficult"])));
    }

    #[test]
    fn test_empty_brackets_append() {
        let spec = parse("guides[]=a&guides[]=b");
        assert_eq!(spec.get("guides"), Some(&json!(["a", "b"])));
    }

    #[test]
    fn test_key_without_value_is_empty_string() {
        let spec = parse("secretTour&page=");
        assert_eq!(spec.get("secretTour"), Some(&json!("")));
        assert_eq!(spec.get("page"), Some(&json!("")));
    }

    #[test]
    fn test_alias_overrides_client_values() {
        let alias = QueryAlias::new("top-5-cheap")
            .set("limit", "5")
            .set("sort", "-ratingsAverage,price");
        let spec = parse("limit=50&difficulty=easy").with_alias(&alias);

        assert_eq!(spec.scalar("limit").as_deref(), Some("5"));
        assert_eq!(spec.scalar("sort").as_deref(), Some("-ratingsAverage,price"));
        assert_eq!(spec.scalar("difficulty").as_deref(), Some("easy"));
        assert_eq!(alias.name(), "top-5-cheap");
    }

    #[test]
    fn test_scalar_formats_json_values() {
        let spec = QuerySpec::from_map(
            json!({ "page": 2, "limit": ["3", "7"] }).as_object().cloned().unwrap(),
        );
        assert_eq!(spec.scalar("page").as_deref(), Some("2"));
        assert_eq!(spec.scalar("limit").as_deref(), Some("7"));
    }
}
