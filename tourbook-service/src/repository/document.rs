//! Untyped documents and dotted-path access

use serde_json::{Map, Value};

/// A stored record: a JSON object keyed by field name.
pub type Document = Map<String, Value>;

/// Field holding a document's identity.
pub const ID_FIELD: &str = "_id";

/// Returns the document's `_id` when it is a string.
pub fn id_of(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Collect every value reachable at a dotted path.
///
/// Arrays met on the way are traversed element by element, so
/// `locations.day` yields the `day` of every location.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Vec<&'a Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut found = Vec::new();
    if let Some((first, rest)) = segments.split_first() {
        if let Some(value) = doc.get(*first) {
            collect(value, rest, &mut found);
        }
    }
    found
}

fn collect<'a>(value: &'a Value, segments: &[&str], found: &mut Vec<&'a Value>) {
    let Some((first, rest)) = segments.split_first() else {
        found.push(value);
        return;
    };
    match value {
        Value::Object(map) => {
            if let Some(next) = map.get(*first) {
                collect(next, rest, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect(item, segments, found);
            }
        }
        _ => {}
    }
}

/// First value at a dotted path, if any.
pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    lookup(doc, path).into_iter().next()
}

/// Set a value at a dotted path, creating intermediate objects.
pub fn set_path(doc: &mut Document, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, tail)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_path(child, tail, value);
            }
        }
    }
}

/// Remove the value at a dotted path, returning it.
pub fn remove_path(doc: &mut Document, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => doc.remove(path),
        Some((head, tail)) => match doc.get_mut(head) {
            Some(Value::Object(child)) => remove_path(child, tail),
            _ => None,
        },
    }
}
