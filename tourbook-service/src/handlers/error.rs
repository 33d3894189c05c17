//! API error types for handler operations
//!
//! Every failure a resource handler can produce is an [`ApiError`]. The kind
//! decides the HTTP status and whether the error is operational (an expected
//! outcome the client can act on) or unexpected (a bug or infrastructure
//! failure whose details must not leak).
//!
//! ```rust
//! use tourbook_service::handlers::{ApiError, ApiErrorKind, ApiOperation};
//!
//! let error = ApiError::not_found(ApiOperation::Get);
//! assert_eq!(error.kind, ApiErrorKind::NotFound);
//! assert_eq!(error.message, "No document found with that ID");
//! assert!(error.is_operational());
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::render::ErrorRenderer;
use crate::query::QueryError;
use crate::repository::{RepositoryError, RepositoryErrorKind, RepositoryOperation};

/// Handler operation being performed when the error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// Listing a collection
    List,
    /// Fetching one document
    Get,
    /// Creating a document
    Create,
    /// Partially updating a document
    Update,
    /// Deleting a document
    Delete,
    /// Matching the request to a route
    Route,
    /// Computing an aggregate report
    Report,
}

impl ApiOperation {
    /// The five resource operations, in mounting order.
    pub const RESOURCE: [ApiOperation; 5] = [
        ApiOperation::List,
        ApiOperation::Create,
        ApiOperation::Get,
        ApiOperation::Update,
        ApiOperation::Delete,
    ];
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Get => write!(f, "get"),
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Route => write!(f, "route"),
            Self::Report => write!(f, "report"),
        }
    }
}

/// Category of API error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// No document (or route) matches the request
    NotFound,
    /// The requested page starts past the last matching document
    InvalidPage,
    /// The body failed schema validation or was not valid JSON
    ValidationFailure,
    /// A unique value or combination is already taken
    Conflict,
    /// The client sent more requests than its quota allows
    TooManyRequests,
    /// Anything else; never shown to clients in production
    Unexpected,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not_found"),
            Self::InvalidPage => write!(f, "invalid_page"),
            Self::ValidationFailure => write!(f, "validation_failure"),
            Self::Conflict => write!(f, "conflict"),
            Self::TooManyRequests => write!(f, "too_many_requests"),
            Self::Unexpected => write!(f, "unexpected"),
        }
    }
}

impl ApiErrorKind {
    /// HTTP status code for this kind.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::InvalidPage | Self::ValidationFailure => StatusCode::BAD_REQUEST,
            Self::Conflict => StatusCode::CONFLICT,
            Self::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            Self::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether errors of this kind are expected outcomes safe to show clients.
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        !matches!(self, Self::Unexpected)
    }
}

/// Structured API error with operation context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// The operation being performed when the error occurred
    pub operation: ApiOperation,
    /// The category of error
    pub kind: ApiErrorKind,
    /// Client-facing message
    pub message: String,
    /// Internal detail, only rendered in development
    pub detail: Option<String>,
}

impl ApiError {
    pub fn new(operation: ApiOperation, kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            operation,
            kind,
            message: message.into(),
            detail: None,
        }
    }

    /// The requested document does not exist (or is outside the resource's scope).
    pub fn not_found(operation: ApiOperation) -> Self {
        Self::new(operation, ApiErrorKind::NotFound, "No document found with that ID")
    }

    /// No route matches `uri`.
    pub fn route_not_found(uri: impl fmt::Display) -> Self {
        Self::new(
            ApiOperation::Route,
            ApiErrorKind::NotFound,
            format!("Can't find the requested URL {uri} on this server"),
        )
    }

    pub fn invalid_page() -> Self {
        Self::new(ApiOperation::List, ApiErrorKind::InvalidPage, "This page does not exist")
    }

    /// A schema rejection; `message` is already client facing.
    pub fn validation(operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ApiErrorKind::ValidationFailure, message)
    }

    /// The request body could not be read as a JSON object.
    pub fn malformed_body(operation: ApiOperation, reason: impl Into<String>) -> Self {
        Self::validation(operation, format!("Invalid input data : {}", reason.into()))
    }

    pub fn conflict(operation: ApiOperation, message: impl Into<String>) -> Self {
        Self::new(operation, ApiErrorKind::Conflict, message)
    }

    /// The client's request quota is used up.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ApiOperation::Route, ApiErrorKind::TooManyRequests, message)
    }

    /// A non-operational failure; `detail` is logged, never shown in production.
    pub fn unexpected(operation: ApiOperation, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            operation,
            kind: ApiErrorKind::Unexpected,
            message: detail.clone(),
            detail: Some(detail),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    #[must_use]
    pub fn with_operation(mut self, operation: ApiOperation) -> Self {
        self.operation = operation;
        self
    }

    pub fn is_operational(&self) -> bool {
        self.kind.is_operational()
    }

    pub fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// `"fail"` for client errors, `"error"` for server errors.
    pub fn status_label(&self) -> &'static str {
        if self.status_code().is_client_error() {
            "fail"
        } else {
            "error"
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API {} error during {}: {}", self.kind, self.operation, self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, " ({detail})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    /// Renders with the production policy. Routers that know the configured
    /// environment render through their own [`ErrorRenderer`] instead.
    fn into_response(self) -> Response {
        ErrorRenderer::production().render(&self)
    }
}

fn api_operation(op: RepositoryOperation) -> ApiOperation {
    match op {
        RepositoryOperation::FindOne | RepositoryOperation::Expand => ApiOperation::Get,
        RepositoryOperation::FindMany | RepositoryOperation::Count => ApiOperation::List,
        RepositoryOperation::Create | RepositoryOperation::Import => ApiOperation::Create,
        RepositoryOperation::Update => ApiOperation::Update,
        RepositoryOperation::Delete => ApiOperation::Delete,
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        let operation = api_operation(err.operation);
        match err.kind {
            RepositoryErrorKind::NotFound => Self::not_found(operation).with_detail(err.to_string()),
            RepositoryErrorKind::AlreadyExists => Self::conflict(operation, err.message),
            RepositoryErrorKind::ValidationFailed => Self::validation(operation, err.message),
            RepositoryErrorKind::DatabaseError => Self::unexpected(operation, err.to_string()),
        }
    }
}

impl From<QueryError> for ApiError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidPage { page, skip, total } => Self::invalid_page()
                .with_detail(format!("page {page} skips {skip} of {total} matching documents")),
            QueryError::Repository(err) => Self::from(err).with_operation(ApiOperation::List),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_status_codes() {
        assert_eq!(ApiErrorKind::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiErrorKind::InvalidPage.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiErrorKind::ValidationFailure.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiErrorKind::Conflict.status_code(), StatusCode::CONFLICT);
        assert_eq!(ApiErrorKind::TooManyRequests.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(ApiErrorKind::Unexpected.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(ApiError::invalid_page().status_label(), "fail");
        assert_eq!(ApiError::rate_limited("slow down").status_label(), "fail");
        assert_eq!(ApiError::unexpected(ApiOperation::List, "boom").status_label(), "error");
    }

    #[test]
    fn test_route_not_found_message() {
        let error = ApiError::route_not_found("/api/v1/nowhere");
        assert_eq!(error.message, "Can't find the requested URL /api/v1/nowhere on this server");
        assert_eq!(error.operation, ApiOperation::Route);
    }

    #[test]
    fn test_from_repository_error() {
        let duplicate: ApiError = RepositoryError::duplicate_value("tours", "The Forest Hiker").into();
        assert_eq!(duplicate.kind, ApiErrorKind::Conflict);
        assert_eq!(duplicate.operation, ApiOperation::Create);
        assert_eq!(
            duplicate.message,
            "Duplicate field value : 'The Forest Hiker'. Please use another value."
        );

        let invalid: ApiError = RepositoryError::validation_failed("Invalid input data : A tour must have a name")
            .with_operation(RepositoryOperation::Update)
            .into();
        assert_eq!(invalid.kind, ApiErrorKind::ValidationFailure);
        assert_eq!(invalid.operation, ApiOperation::Update);

        let broken: ApiError =
            RepositoryError::new(RepositoryOperation::FindMany, RepositoryErrorKind::DatabaseError, "disk on fire").into();
        assert_eq!(broken.kind, ApiErrorKind::Unexpected);
        assert!(!broken.is_operational());
        assert!(broken.detail.unwrap().contains("disk on fire"));
    }

    #[test]
    fn test_from_query_error() {
        let error: ApiError = QueryError::InvalidPage { page: 4, skip: 30, total: 12 }.into();
        assert_eq!(error.kind, ApiErrorKind::InvalidPage);
        assert_eq!(error.message, "This page does not exist");
        assert_eq!(error.detail.as_deref(), Some("page 4 skips 30 of 12 matching documents"));
    }

    #[test]
    fn test_display() {
        let display = ApiError::not_found(ApiOperation::Delete).to_string();
        assert_eq!(display, "API not_found error during delete: No document found with that ID");
    }
}
