//! Related-document expansion directives

use serde::Serialize;

use crate::query::{Filter, Projection};

/// Inline related documents into a result.
///
/// Resolution happens in the store after projection, so an expansion only
/// applies when its path survived the projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Expansion {
    /// Replace the id (or array of ids) stored at `path` with the referenced
    /// documents of `collection`.
    Reference {
        path: String,
        collection: String,
        projection: Projection,
        #[serde(skip_serializing_if = "Filter::is_empty")]
        filter: Filter,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        nested: Vec<Expansion>,
    },
    /// Add a field `name` holding every document of `collection` whose
    /// `foreign_field` equals this document's `local_field`.
    Virtual {
        name: String,
        collection: String,
        foreign_field: String,
        local_field: String,
        projection: Projection,
        #[serde(skip_serializing_if = "Filter::is_empty")]
        filter: Filter,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        nested: Vec<Expansion>,
    },
}

impl Expansion {
    /// Expand the ids at `path` from `collection`.
    pub fn reference(path: impl Into<String>, collection: impl Into<String>) -> Self {
        Self::Reference {
            path: path.into(),
            collection: collection.into(),
            projection: Projection::All,
            filter: Filter::new(),
            nested: Vec::new(),
        }
    }

    /// Inline `collection` documents whose `foreign_field` points at this
    /// document's `_id`.
    pub fn virtual_field(
        name: impl Into<String>,
        collection: impl Into<String>,
        foreign_field: impl Into<String>,
    ) -> Self {
        Self::Virtual {
            name: name.into(),
            collection: collection.into(),
            foreign_field: foreign_field.into(),
            local_field: crate::repository::document::ID_FIELD.to_string(),
            projection: Projection::All,
            filter: Filter::new(),
            nested: Vec::new(),
        }
    }

    /// Project the related documents.
    #[must_use]
    pub fn select(mut self, selection: Projection) -> Self {
        match &mut self {
            Self::Reference { projection, .. } | Self::Virtual { projection, .. } => {
                *projection = selection;
            }
        }
        self
    }

    /// Only expand related documents matching `visible`.
    #[must_use]
    pub fn only(mut self, visible: Filter) -> Self {
        match &mut self {
            Self::Reference { filter, .. } | Self::Virtual { filter, .. } => {
                *filter = std::mem::take(filter).and(visible);
            }
        }
        self
    }

    /// Expand further inside each related document.
    #[must_use]
    pub fn then(mut self, expansion: Expansion) -> Self {
        match &mut self {
            Self::Reference { nested, .. } | Self::Virtual { nested, .. } => nested.push(expansion),
        }
        self
    }

    /// The collection the related documents come from.
    pub fn collection(&self) -> &str {
        match self {
            Self::Reference { collection, .. } | Self::Virtual { collection, .. } => collection,
        }
    }

    /// The field of the parent document this expansion writes.
    pub fn target(&self) -> &str {
        match self {
            Self::Reference { path, .. } => path,
            Self::Virtual { name, .. } => name,
        }
    }
}
