//! Storage error types
//!
//! Every storage failure carries the operation that was running, a coarse
//! kind and a message. For `ValidationFailed` and `AlreadyExists` the message
//! is written for the client and passed through to the HTTP response.
//!
//! ```rust
//! use tourbook_service::repository::{RepositoryError, RepositoryErrorKind};
//!
//! let error = RepositoryError::duplicate_value("tours", "The Forest Hiker");
//! assert_eq!(error.kind, RepositoryErrorKind::AlreadyExists);
//! assert_eq!(
//!     error.message,
//!     "Duplicate field value : 'The Forest Hiker'. Please use another value."
//! );
//! ```

use std::fmt;

/// Operation being performed when the storage error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryOperation {
    /// Fetching a single document
    FindOne,
    /// Running a list query
    FindMany,
    /// Counting documents matching a filter
    Count,
    /// Inserting a new document
    Create,
    /// Merging a partial update into a document
    Update,
    /// Removing a document
    Delete,
    /// Bulk loading documents from seed files
    Import,
    /// Resolving related documents
    Expand,
}

impl fmt::Display for RepositoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FindOne => write!(f, "find_one"),
            Self::FindMany => write!(f, "find_many"),
            Self::Count => write!(f, "count"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Import => write!(f, "import"),
            Self::Expand => write!(f, "expand"),
        }
    }
}

/// Category of storage error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryErrorKind {
    /// Document or collection was not found
    NotFound,
    /// A unique field or field combination is already taken
    AlreadyExists,
    /// The document failed schema validation or casting
    ValidationFailed,
    /// Engine-level failure
    DatabaseError,
}

impl fmt::Display for RepositoryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::AlreadyExists => write!(f, "already_exists"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::DatabaseError => write!(f, "database_error"),
        }
    }
}

/// Structured storage error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryError {
    /// The operation being performed when the error occurred
    pub operation: RepositoryOperation,
    /// The category of error
    pub kind: RepositoryErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The collection involved (e.g. "tours")
    pub entity_type: Option<String>,
    /// The document id or offending value involved
    pub entity_id: Option<String>,
}

impl RepositoryError {
    /// Create a new storage error
    pub fn new(
        operation: RepositoryOperation,
        kind: RepositoryErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            entity_type: None,
            entity_id: None,
        }
    }

    /// A collection that was never registered
    pub fn unknown_collection(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            RepositoryOperation::FindOne,
            RepositoryErrorKind::NotFound,
            format!("Collection '{name}' is not registered"),
        )
        .with_entity("collection", name)
    }

    /// A unique field already holds `value`
    pub fn duplicate_value(entity_type: impl Into<String>, value: impl Into<String>) -> Self {
        let value = value.into();
        Self::new(
            RepositoryOperation::Create,
            RepositoryErrorKind::AlreadyExists,
            format!("Duplicate field value : '{value}'. Please use another value."),
        )
        .with_entity(entity_type, value)
    }

    /// A unique field combination is already taken; `message` is client facing
    pub fn already_exists(entity_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: RepositoryOperation::Create,
            kind: RepositoryErrorKind::AlreadyExists,
            message: message.into(),
            entity_type: Some(entity_type.into()),
            entity_id: None,
        }
    }

    /// Schema validation failed; `message` is client facing
    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(
            RepositoryOperation::Create,
            RepositoryErrorKind::ValidationFailed,
            message,
        )
    }

    /// Attach collection and id context
    #[must_use]
    pub fn with_entity(
        mut self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        self.entity_type = Some(entity_type.into());
        self.entity_id = Some(entity_id.into());
        self
    }

    /// Override the operation, for errors raised by shared helpers
    #[must_use]
    pub fn with_operation(mut self, operation: RepositoryOperation) -> Self {
        self.operation = operation;
        self
    }
}

impl fmt::Display for RepositoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Repository {} error during {}: {}",
            self.kind, self.operation, self.message
        )?;
        if let (Some(entity_type), Some(entity_id)) = (&self.entity_type, &self.entity_id) {
            write!(f, " [{entity_type}: {entity_id}]")?;
        }
        Ok(())
    }
}

impl std::error::Error for RepositoryError {}
