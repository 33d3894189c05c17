//! Field selection

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::repository::document::{get_path, remove_path, set_path, Document, ID_FIELD};

/// Which fields of a document are returned.
///
/// Client syntax is a comma separated list. A list made only of `-field`
/// tokens excludes those fields; anything else is an inclusion list, which
/// always keeps `_id` unless `-_id` is given. Tokens containing the
/// sensitive marker are discarded before the projection is built.
///
/// ```rust
/// use tourbook_service::query::Projection;
///
/// let projection = Projection::parse("name,price,password", "password");
/// assert_eq!(projection.to_string(), "name price");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "fields", rename_all = "lowercase")]
pub enum Projection {
    /// Every field
    #[default]
    All,
    /// Only these fields (plus `_id`)
    Include(Vec<String>),
    /// Every field except these
    Exclude(Vec<String>),
}

impl Projection {
    /// Parse a client field list, dropping tokens containing `sensitive_marker`.
    pub fn parse(raw: &str, sensitive_marker: &str) -> Self {
        let tokens: Vec<&str> = raw
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .filter(|token| sensitive_marker.is_empty() || !token.contains(sensitive_marker))
            .collect();

        if tokens.is_empty() {
            return Self::All;
        }
        if tokens.iter().all(|token| token.starts_with('-')) {
            return Self::Exclude(
                tokens
                    .iter()
                    .map(|token| token.trim_start_matches('-').to_string())
                    .collect(),
            );
        }
        // Inclusion lists ignore exclusions other than `-_id`.
        let mut fields: Vec<String> = tokens
            .iter()
            .filter(|token| !token.starts_with('-'))
            .map(|token| token.to_string())
            .collect();
        if tokens.contains(&"-_id") {
            fields.push("-_id".to_string());
        }
        Self::Include(fields)
    }

    /// Exclude the given fields.
    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        if fields.is_empty() {
            Self::All
        } else {
            Self::Exclude(fields)
        }
    }

    /// Include only the given fields.
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Include(fields.into_iter().map(Into::into).collect())
    }

    /// Whether the projection names `field` for inclusion.
    ///
    /// Fields a schema hides by default are only returned when named here.
    pub fn explicitly_includes(&self, field: &str) -> bool {
        matches!(self, Self::Include(fields) if fields.iter().any(|f| f == field))
    }

    /// Apply the projection to a document.
    pub fn apply(&self, doc: Document) -> Document {
        match self {
            Self::All => doc,
            Self::Exclude(fields) => {
                let mut doc = doc;
                for field in fields {
                    remove_path(&mut doc, field);
                }
                doc
            }
            Self::Include(fields) => {
                let mut out = Document::new();
                if !fields.iter().any(|f| f == "-_id") {
                    if let Some(id) = doc.get(ID_FIELD) {
                        out.insert(ID_FIELD.to_string(), id.clone());
                    }
                }
                for field in fields.iter().filter(|f| !f.starts_with('-')) {
                    if let Some(value) = get_path(&doc, field) {
                        set_path(&mut out, field, value.clone());
                    }
                }
                out
            }
        }
    }
}

impl fmt::Display for Projection {
    /// The engine's space separated selection string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => Ok(()),
            Self::Include(fields) => write!(f, "{}", fields.join(" ")),
            Self::Exclude(fields) => {
                let tokens: Vec<String> = fields.iter().map(|field| format!("-{field}")).collect();
                write!(f, "{}", tokens.join(" "))
            }
        }
    }
}

impl From<Projection> for Value {
    fn from(projection: Projection) -> Self {
        Value::String(projection.to_string())
    }
}
