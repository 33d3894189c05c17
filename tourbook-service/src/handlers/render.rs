//! Error rendering

use std::fmt;
use std::str::FromStr;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::error::ApiError;

/// Deployment environment, which decides how much of an error is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

/// Turns [`ApiError`]s into HTTP responses.
///
/// In development every error is rendered with its kind, operation and
/// internal detail. In production operational errors show only their
/// message, and unexpected ones are replaced by a generic message after
/// being logged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorRenderer {
    environment: Environment,
}

impl ErrorRenderer {
    /// Message shown in place of unexpected errors in production.
    pub const GENERIC_MESSAGE: &'static str = "Something went wrong!!!";

    pub fn new(environment: Environment) -> Self {
        Self { environment }
    }

    pub fn development() -> Self {
        Self::new(Environment::Development)
    }

    pub fn production() -> Self {
        Self::new(Environment::Production)
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// The JSON body for `err`.
    pub fn body(&self, err: &ApiError) -> Value {
        match self.environment {
            Environment::Development => json!({
                "status": err.status_label(),
                "message": err.message,
                "error": {
                    "kind": err.kind.to_string(),
                    "operation": err.operation.to_string(),
                    "operational": err.is_operational(),
                    "detail": err.detail,
                },
            }),
            Environment::Production if err.is_operational() => json!({
                "status": err.status_label(),
                "message": err.message,
            }),
            Environment::Production => json!({
                "status": "error",
                "message": Self::GENERIC_MESSAGE,
            }),
        }
    }

    /// Log `err` and build its response.
    pub fn render(&self, err: &ApiError) -> Response {
        if err.is_operational() {
            tracing::debug!(
                operation = %err.operation,
                kind = %err.kind,
                detail = ?err.detail,
                "{}", err.message
            );
        } else {
            tracing::error!(
                operation = %err.operation,
                kind = %err.kind,
                detail = ?err.detail,
                environment = %self.environment,
                "unexpected error: {}", err.message
            );
        }
        (err.status_code(), Json(self.body(err))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::ApiOperation;
    use axum::http::StatusCode;

    #[test]
    fn test_production_hides_unexpected_errors() {
        let renderer = ErrorRenderer::production();
        let body = renderer.body(&ApiError::unexpected(ApiOperation::List, "connection pool exhausted"));
        assert_eq!(body, json!({ "status": "error", "message": "Something went wrong!!!" }));

        let body = renderer.body(&ApiError::not_found(ApiOperation::Get));
        assert_eq!(body, json!({ "status": "fail", "message": "No document found with that ID" }));
    }

    #[test]
    fn test_development_shows_everything() {
        let err = ApiError::unexpected(ApiOperation::Create, "connection pool exhausted");
        let body = ErrorRenderer::development().body(&err);
        assert_eq!(body["status"], json!("error"));
        assert_eq!(body["message"], json!("connection pool exhausted"));
        assert_eq!(body["error"]["kind"], json!("unexpected"));
        assert_eq!(body["error"]["operation"], json!("create"));
        assert_eq!(body["error"]["operational"], json!(false));
    }

    #[test]
    fn test_render_status() {
        let response = ErrorRenderer::production().render(&ApiError::invalid_page());
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("production".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!(" Dev ".parse::<Environment>(), Ok(Environment::Development));
        assert!("staging".parse::<Environment>().is_err());
    }
}
