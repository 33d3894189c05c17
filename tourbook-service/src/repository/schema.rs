//! Collection schemas
//!
//! A [`Schema`] is the only gate between a request body and stored data. It
//! is strict: undeclared fields are dropped, `_id` and `__v` are owned by the
//! engine, and every declared field is cast to its type before validators
//! run. All failures of one write are reported together as a single
//! `ValidationFailed` error whose message reads
//! `Invalid input data : <first>. <second>`.
//!
//! ```rust
//! use tourbook_service::repository::{FieldRule, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::new("tours", "tour")
//!     .field(FieldRule::string("name").required("A tour must have a name").trim())
//!     .field(FieldRule::number("price").required("A tour must have a price"));
//!
//! let body = json!({ "name": "  The Sea Explorer ", "price": "497", "admin": true });
//! let doc = schema.prepare_new(body.as_object().cloned().unwrap()).unwrap();
//!
//! assert_eq!(doc["name"], json!("The Sea Explorer"));
//! assert_eq!(doc["price"], json!(497));
//! assert!(!doc.contains_key("admin"));
//! ```

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::{Number, Value};

use super::document::{Document, ID_FIELD};
use super::error::{RepositoryError, RepositoryOperation};
use super::RepositoryResult;

/// Name of the engine-owned version counter.
pub const VERSION_FIELD: &str = "__v";

/// A cross-field check returning a client-facing message on failure.
pub type DocumentCheck = fn(&Document) -> Option<String>;

/// A document rewrite run once before a new document is stored.
pub type Transform = fn(&mut Document);

/// A computed field added when documents are returned.
pub type VirtualCompute = fn(&Document) -> Option<Value>;

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
    /// Dates are stored as RFC 3339 strings with millisecond precision
    Date,
    /// Id of a document in another collection
    Reference,
    /// Array of values of the inner type; a lone value is wrapped
    Array(Box<FieldType>),
    Object,
    Any,
}

impl FieldType {
    fn label(&self) -> String {
        match self {
            Self::String => "string".to_string(),
            Self::Number => "Number".to_string(),
            Self::Boolean => "Boolean".to_string(),
            Self::Date => "date".to_string(),
            Self::Reference => "ObjectId".to_string(),
            Self::Array(inner) => format!("[{}]", inner.label()),
            Self::Object => "Embedded".to_string(),
            Self::Any => "Mixed".to_string(),
        }
    }

    /// Cast a JSON value to this type, `None` when it cannot be represented.
    pub fn cast(&self, value: &Value) -> Option<Value> {
        if value.is_null() {
            return Some(Value::Null);
        }
        match self {
            Self::Any => Some(value.clone()),
            Self::String => match value {
                Value::String(_) => Some(value.clone()),
                Value::Number(n) => Some(Value::String(n.to_string())),
                Value::Bool(b) => Some(Value::String(b.to_string())),
                _ => None,
            },
            Self::Number => match value {
                Value::Number(_) => Some(value.clone()),
                Value::String(s) if s.trim().is_empty() => Some(Value::Null),
                Value::String(s) => s.trim().parse::<f64>().ok().and_then(number),
                Value::Bool(b) => Some(Value::from(u8::from(*b))),
                _ => None,
            },
            Self::Boolean => match value {
                Value::Bool(_) => Some(value.clone()),
                Value::String(s) => match s.trim() {
                    "true" | "1" | "yes" => Some(Value::Bool(true)),
                    "false" | "0" | "no" => Some(Value::Bool(false)),
                    _ => None,
                },
                Value::Number(n) => match n.as_u64() {
                    Some(1) => Some(Value::Bool(true)),
                    Some(0) => Some(Value::Bool(false)),
                    _ => None,
                },
                _ => None,
            },
            Self::Date => parse_date(value).map(|date| Value::String(format_date(date))),
            Self::Reference => match value {
                Value::String(s) if !s.trim().is_empty() => Some(Value::String(s.trim().to_string())),
                Value::Object(doc) => doc.get(ID_FIELD).filter(|id| id.is_string()).cloned(),
                _ => None,
            },
            Self::Object => value.is_object().then(|| value.clone()),
            Self::Array(inner) => {
                let items = match value {
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                };
                items
                    .iter()
                    .map(|item| inner.cast(item))
                    .collect::<Option<Vec<_>>>()
                    .map(Value::Array)
            }
        }
    }
}

/// A JSON number, integral when the value has no fractional part.
pub fn number(value: f64) -> Option<Value> {
    if !value.is_finite() {
        return None;
    }
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        return Some(Value::from(value as i64));
    }
    Number::from_f64(value).map(Value::Number)
}

/// Parse the date notations found in requests and seed files.
pub fn parse_date(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}

fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Some(date.with_timezone(&Utc));
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d,%H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// The stored form of a date.
pub fn format_date(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

/// Value used when a field is missing from a new document.
#[derive(Debug, Clone, PartialEq)]
pub enum DefaultValue {
    Value(Value),
    /// The current time
    Now,
}

/// Declaration of one top-level field.
#[derive(Debug, Clone)]
pub struct FieldRule {
    name: String,
    field_type: FieldType,
    required: Option<String>,
    min: Option<(f64, String)>,
    max: Option<(f64, String)>,
    min_length: Option<(usize, String)>,
    max_length: Option<(usize, String)>,
    enum_values: Option<(Vec<String>, String)>,
    pattern: Option<(&'static Regex, String)>,
    default: Option<DefaultValue>,
    trim: bool,
    lowercase: bool,
    hidden: bool,
    unique: bool,
    transient: bool,
    round_to: Option<i32>,
}

impl FieldRule {
    /// Declare a field of the given type.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: None,
            min: None,
            max: None,
            min_length: None,
            max_length: None,
            enum_values: None,
            pattern: None,
            default: None,
            trim: false,
            lowercase: false,
            hidden: false,
            unique: false,
            transient: false,
            round_to: None,
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Number)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Boolean)
    }

    pub fn date(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Date)
    }

    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Reference)
    }

    pub fn array(name: impl Into<String>, items: FieldType) -> Self {
        Self::new(name, FieldType::Array(Box::new(items)))
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Object)
    }

    /// The field must be present, non-null and not an empty string.
    #[must_use]
    pub fn required(mut self, message: impl Into<String>) -> Self {
        self.required = Some(message.into());
        self
    }

    /// Numeric lower bound, inclusive.
    #[must_use]
    pub fn min(mut self, bound: f64, message: impl Into<String>) -> Self {
        self.min = Some((bound, message.into()));
        self
    }

    /// Numeric upper bound, inclusive.
    #[must_use]
    pub fn max(mut self, bound: f64, message: impl Into<String>) -> Self {
        self.max = Some((bound, message.into()));
        self
    }

    /// Minimum string length in characters.
    #[must_use]
    pub fn min_length(mut self, length: usize, message: impl Into<String>) -> Self {
        self.min_length = Some((length, message.into()));
        self
    }

    /// Maximum string length in characters.
    #[must_use]
    pub fn max_length(mut self, length: usize, message: impl Into<String>) -> Self {
        self.max_length = Some((length, message.into()));
        self
    }

    /// Restrict a string to a fixed set of values.
    #[must_use]
    pub fn enum_values<I, S>(mut self, values: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some((values.into_iter().map(Into::into).collect(), message.into()));
        self
    }

    /// A string must match `pattern`.
    #[must_use]
    pub fn matches(mut self, pattern: &'static Regex, message: impl Into<String>) -> Self {
        self.pattern = Some((pattern, message.into()));
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Value(value.into()));
        self
    }

    #[must_use]
    pub fn default_now(mut self) -> Self {
        self.default = Some(DefaultValue::Now);
        self
    }

    /// Strip surrounding whitespace from strings.
    #[must_use]
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    #[must_use]
    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    /// Never returned unless a projection names the field.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// No two documents may hold the same value.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Validated on write but never stored.
    #[must_use]
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    /// Round numbers to `decimals` places when set.
    #[must_use]
    pub fn round_to(mut self, decimals: i32) -> Self {
        self.round_to = Some(decimals);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    fn cast(&self, value: &Value) -> Result<Value, String> {
        let cast = self.field_type.cast(value).ok_or_else(|| {
            let shown = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!(
                "Cast to {} failed for value \"{}\" (type {}) at path \"{}\"",
                self.field_type.label(),
                shown,
                json_type(value),
                self.name
            )
        })?;
        Ok(self.normalize(cast))
    }

    fn normalize(&self, value: Value) -> Value {
        match value {
            Value::String(s) => {
                let s = if self.trim { s.trim().to_string() } else { s };
                Value::String(if self.lowercase { s.to_lowercase() } else { s })
            }
            Value::Number(n) => match (self.round_to, n.as_f64()) {
                (Some(decimals), Some(x)) => {
                    let factor = 10f64.powi(decimals);
                    number((x * factor).round() / factor).unwrap_or(Value::Number(n))
                }
                _ => Value::Number(n),
            },
            other => other,
        }
    }

    fn default_for_new(&self) -> Option<Value> {
        match self.default.as_ref()? {
            DefaultValue::Value(value) => Some(value.clone()),
            DefaultValue::Now => Some(Value::String(format_date(Utc::now()))),
        }
    }

    fn check(&self, value: Option<&Value>, errors: &mut Vec<String>) {
        let present = match value {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(value) => Some(value),
        };
        let Some(value) = present else {
            if let Some(message) = &self.required {
                errors.push(message.clone());
            }
            return;
        };

        if let Some(x) = value.as_f64() {
            if let Some((bound, message)) = &self.min {
                if x < *bound {
                    errors.push(message.clone());
                }
            }
            if let Some((bound, message)) = &self.max {
                if x > *bound {
                    errors.push(message.clone());
                }
            }
        }

        if let Some(s) = value.as_str() {
            let length = s.chars().count();
            if let Some((bound, message)) = &self.min_length {
                if length < *bound {
                    errors.push(message.clone());
                }
            }
            if let Some((bound, message)) = &self.max_length {
                if length > *bound {
                    errors.push(message.clone());
                }
            }
            if let Some((values, message)) = &self.enum_values {
                if !values.iter().any(|allowed| allowed == s) {
                    errors.push(message.clone());
                }
            }
            if let Some((pattern, message)) = &self.pattern {
                if !pattern.is_match(s) {
                    errors.push(message.clone());
                }
            }
        }
    }
}

/// Fields whose combined values must be unique across a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueGroup {
    pub fields: Vec<String>,
    pub message: String,
}

/// How seed documents are admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Run every validator, as for client writes
    Validate,
    /// Cast and fill defaults only (records exported from a live system)
    Trusted,
}

/// Declaration of a collection.
#[derive(Debug, Clone)]
pub struct Schema {
    name: String,
    prefix: String,
    fields: Vec<FieldRule>,
    rules: Vec<DocumentCheck>,
    unique_groups: Vec<UniqueGroup>,
    before_create: Vec<Transform>,
    virtuals: Vec<(String, VirtualCompute)>,
}

impl Schema {
    /// A schema for collection `name` whose ids carry `prefix`.
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            fields: Vec::new(),
            rules: Vec::new(),
            unique_groups: Vec::new(),
            before_create: Vec::new(),
            virtuals: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, rule: FieldRule) -> Self {
        self.fields.push(rule);
        self
    }

    /// Add a cross-field check run after every field validator.
    #[must_use]
    pub fn rule(mut self, check: DocumentCheck) -> Self {
        self.rules.push(check);
        self
    }

    /// Require the combination of `fields` to be unique.
    #[must_use]
    pub fn unique_together<I, S>(mut self, fields: I, message: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_groups.push(UniqueGroup {
            fields: fields.into_iter().map(Into::into).collect(),
            message: message.into(),
        });
        self
    }

    /// Rewrite new documents after validation, before they are stored.
    #[must_use]
    pub fn before_create(mut self, transform: Transform) -> Self {
        self.before_create.push(transform);
        self
    }

    /// Add a computed field to returned documents.
    #[must_use]
    pub fn virtual_field(mut self, name: impl Into<String>, compute: VirtualCompute) -> Self {
        self.virtuals.push((name.into(), compute));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn fields(&self) -> &[FieldRule] {
        &self.fields
    }

    pub fn hidden_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.hidden).map(|f| f.name.as_str())
    }

    pub fn unique_fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().filter(|f| f.unique).map(|f| f.name.as_str())
    }

    pub fn unique_groups(&self) -> &[UniqueGroup] {
        &self.unique_groups
    }

    /// Add computed fields to a document on its way out.
    pub fn apply_virtuals(&self, doc: &mut Document) {
        for (name, compute) in &self.virtuals {
            if let Some(value) = compute(doc) {
                doc.insert(name.clone(), value);
            }
        }
    }

    /// Admit a client body as a new document, without its `_id`.
    pub fn prepare_new(&self, body: Document) -> RepositoryResult<Document> {
        let (mut doc, mut errors, failed) = self.admit(body, false);
        self.apply_defaults(&mut doc);
        errors.extend(self.validate(&doc, &failed));
        if !errors.is_empty() {
            return Err(validation_error(&errors));
        }
        for transform in &self.before_create {
            transform(&mut doc);
        }
        self.strip_transient(&mut doc);
        Ok(doc)
    }

    /// Merge a partial client body over `current` and validate the result.
    pub fn prepare_update(&self, current: &Document, patch: Document) -> RepositoryResult<Document> {
        let (patch, mut errors, mut skip) = self.admit(patch, false);
        let mut merged = current.clone();
        merged.extend(patch);
        // Transient fields are never stored, so only check them when sent.
        skip.extend(
            self.fields
                .iter()
                .filter(|rule| rule.transient && !merged.contains_key(&rule.name))
                .map(|rule| rule.name.clone()),
        );
        errors.extend(self.validate(&merged, &skip));
        if !errors.is_empty() {
            return Err(validation_error(&errors).with_operation(RepositoryOperation::Update));
        }
        self.strip_transient(&mut merged);
        Ok(merged)
    }

    /// Admit a seed document, keeping its `_id` and version.
    pub fn prepare_import(&self, doc: Document, mode: ImportMode) -> RepositoryResult<Document> {
        let (mut doc, mut errors, failed) = self.admit(doc, true);
        self.apply_defaults(&mut doc);
        if mode == ImportMode::Validate {
            errors.extend(self.validate(&doc, &failed));
        }
        if !errors.is_empty() {
            return Err(validation_error(&errors).with_operation(RepositoryOperation::Import));
        }
        for transform in &self.before_create {
            transform(&mut doc);
        }
        self.strip_transient(&mut doc);
        Ok(doc)
    }

    /// Drop undeclared fields and cast the rest. Returns the admitted
    /// document, cast failures and the names of fields that failed.
    fn admit(&self, body: Document, keep_identity: bool) -> (Document, Vec<String>, HashSet<String>) {
        let mut doc = Document::new();
        let mut errors = Vec::new();
        let mut failed = HashSet::new();

        for (key, value) in body {
            if key == ID_FIELD || key == VERSION_FIELD {
                let keep = keep_identity
                    && ((key == ID_FIELD && value.is_string()) || (key == VERSION_FIELD && value.is_number()));
                if keep {
                    doc.insert(key, value);
                }
                continue;
            }
            let Some(rule) = self.fields.iter().find(|rule| rule.name == key) else {
                continue;
            };
            match rule.cast(&value) {
                Ok(cast) => {
                    doc.insert(key, cast);
                }
                Err(message) => {
                    errors.push(message);
                    failed.insert(key);
                }
            }
        }
        (doc, errors, failed)
    }

    fn apply_defaults(&self, doc: &mut Document) {
        for rule in &self.fields {
            if !doc.contains_key(&rule.name) {
                if let Some(value) = rule.default_for_new() {
                    doc.insert(rule.name.clone(), value);
                }
            }
        }
    }

    fn validate(&self, doc: &Document, skip: &HashSet<String>) -> Vec<String> {
        let mut errors = Vec::new();
        for rule in self.fields.iter().filter(|rule| !skip.contains(&rule.name)) {
            rule.check(doc.get(&rule.name), &mut errors);
        }
        errors.extend(self.rules.iter().filter_map(|check| check(doc)));
        errors
    }

    fn strip_transient(&self, doc: &mut Document) {
        for rule in self.fields.iter().filter(|rule| rule.transient) {
            doc.remove(&rule.name);
        }
    }
}

fn validation_error(errors: &[String]) -> RepositoryError {
    RepositoryError::validation_failed(format!("Invalid input data : {}", errors.join(". ")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    fn discount_below_price(doc: &Document) -> Option<String> {
        let discount = doc.get("priceDiscount")?.as_f64()?;
        let price = doc.get("price")?.as_f64()?;
        (discount >= price).then(|| format!("Discount price ({discount}) should be below regular price"))
    }

    fn schema() -> Schema {
        Schema::new("tours", "tour")
            .field(
                FieldRule::string("name")
                    .required("A tour must have a name")
                    .trim()
                    .unique()
                    .max_length(40, "A tour name must have less or equal then 40 characters"),
            )
            .field(FieldRule::number("price").required("A tour must have a price"))
            .field(FieldRule::number("priceDiscount"))
            .field(
                FieldRule::number("ratingsAverage")
                    .default_value(4.5)
                    .min(1.0, "Rating must be above 1.0")
                    .max(5.0, "Rating must be below 5.0")
                    .round_to(1),
            )
            .field(
                FieldRule::string("difficulty")
                    .enum_values(["easy", "medium", "difficult"], "Difficulty is either: easy, medium, difficult"),
            )
            .field(FieldRule::array("startDates", FieldType::Date))
            .field(FieldRule::date("createdAt").default_now().hidden())
            .field(FieldRule::string("confirm").transient())
            .rule(discount_below_price)
    }

    fn message(err: RepositoryError) -> String {
        assert_eq!(err.kind, RepositoryErrorKind::ValidationFailed);
        err.message
    }

    #[test]
    fn test_defaults_casts_and_strict_mode() {
        let out = schema()
            .prepare_new(doc(json!({
                "_id": "tour_forged",
                "__v": 7,
                "name": "The Park Camper",
                "price": "1497",
                "startDates": "2021-08-05,10:00",
                "confirm": "x",
                "role": "admin"
            })))
            .unwrap();

        assert!(!out.contains_key("_id"));
        assert!(!out.contains_key("__v"));
        assert!(!out.contains_key("role"));
        assert!(!out.contains_key("confirm"));
        assert_eq!(out["price"], json!(1497));
        assert_eq!(out["ratingsAverage"], json!(4.5));
        assert_eq!(out["startDates"], json!(["2021-08-05T10:00:00.000Z"]));
        assert!(out["createdAt"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_all_errors_reported_together() {
        let err = schema()
            .prepare_new(doc(json!({ "difficulty": "extreme", "ratingsAverage": 7 })))
            .unwrap_err();
        assert_eq!(
            message(err),
            "Invalid input data : A tour must have a name. A tour must have a price. \
             Rating must be below 5.0. Difficulty is either: easy, medium, difficult"
        );
    }

    #[test]
    fn test_cast_failure_message() {
        let err = schema()
            .prepare_new(doc(json!({ "name": "The Snow Adventurer", "price": "abc" })))
            .unwrap_err();
        assert_eq!(
            message(err),
            "Invalid input data : Cast to Number failed for value \"abc\" (type string) at path \"price\""
        );
    }

    #[test]
    fn test_rounding_setter() {
        let out = schema()
            .prepare_new(doc(json!({ "name": "The City Wanderer", "price": 1197, "ratingsAverage": 4.66666 })))
            .unwrap();
        assert_eq!(out["ratingsAverage"], json!(4.7));
    }

    #[test]
    fn test_update_validates_merged_document() {
        let schema = schema();
        let current = schema
            .prepare_new(doc(json!({ "name": "The Sports Lover", "price": 2997 })))
            .unwrap();

        let err = schema
            .prepare_update(&current, doc(json!({ "priceDiscount": 3000 })))
            .unwrap_err();
        assert_eq!(err.operation, RepositoryOperation::Update);
        assert_eq!(
            message(err),
            "Invalid input data : Discount price (3000) should be below regular price"
        );

        let updated = schema
            .prepare_update(&current, doc(json!({ "price": "3500", "priceDiscount": 3000, "__v": 9 })))
            .unwrap();
        assert_eq!(updated["price"], json!(3500));
        assert_eq!(updated["name"], json!("The Sports Lover"));
        assert!(!updated.contains_key("__v"));
    }

    #[test]
    fn test_import_keeps_identity_and_trusted_skips_validators() {
        let schema = schema();
        let imported = schema
            .prepare_import(
                doc(json!({ "_id": "tour_5c88fa8cf4afda39709c2955", "name": "The Sea Explorer", "price": 497 })),
                ImportMode::Validate,
            )
            .unwrap();
        assert_eq!(imported["_id"], json!("tour_5c88fa8cf4afda39709c2955"));

        assert!(schema
            .prepare_import(doc(json!({ "_id": "tour_x" })), ImportMode::Validate)
            .is_err());
        assert!(schema
            .prepare_import(doc(json!({ "_id": "tour_x" })), ImportMode::Trusted)
            .is_ok());
    }

    #[test]
    fn test_date_notations() {
        for raw in [
            json!("2021-03-23T09:00:00.000Z"),
            json!("2021-03-23 09:00:00"),
            json!("2021-03-23,09:00"),
            json!(1_616_490_000_000_i64),
        ] {
            assert_eq!(
                FieldType::Date.cast(&raw),
                Some(json!("2021-03-23T09:00:00.000Z")),
                "{raw}"
            );
        }
        assert_eq!(FieldType::Date.cast(&json!("soon")), None);
    }

    #[test]
    fn test_schema_metadata() {
        let schema = schema().unique_together(["tour", "user"], "one per user");
        assert_eq!(schema.hidden_fields().collect::<Vec<_>>(), vec!["createdAt"]);
        assert_eq!(schema.unique_fields().collect::<Vec<_>>(), vec!["name"]);
        assert_eq!(schema.unique_groups()[0].fields, vec!["tour", "user"]);
    }
}
