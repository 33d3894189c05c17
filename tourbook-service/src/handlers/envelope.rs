//! Success envelope

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::repository::Document;

/// Inner `data` object of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeData {
    pub data: Value,
}

/// Serialized body of a successful response.
///
/// `{status, results?, data: {data: <record|records>}}`, or
/// `{status, data: null}` after a deletion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvelopeBody {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    pub data: Option<EnvelopeData>,
}

/// A success response with its status code.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEnvelope {
    status: StatusCode,
    body: EnvelopeBody,
}

impl ResourceEnvelope {
    fn new(status: StatusCode, results: Option<usize>, data: Option<Value>) -> Self {
        Self {
            status,
            body: EnvelopeBody {
                status: "success",
                results,
                data: data.map(|data| EnvelopeData { data }),
            },
        }
    }

    /// 200 with every record and a result count.
    pub fn list(records: Vec<Document>) -> Self {
        let count = records.len();
        let data = Value::Array(records.into_iter().map(Value::Object).collect());
        Self::new(StatusCode::OK, Some(count), Some(data))
    }

    /// 200 with one record.
    pub fn item(record: Document) -> Self {
        Self::new(StatusCode::OK, None, Some(Value::Object(record)))
    }

    /// 201 with the new record.
    pub fn created(record: Document) -> Self {
        Self::new(StatusCode::CREATED, None, Some(Value::Object(record)))
    }

    /// 204 with no data.
    pub fn deleted() -> Self {
        Self::new(StatusCode::NO_CONTENT, None, None)
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &EnvelopeBody {
        &self.body
    }

    /// The records carried by the envelope, if any.
    pub fn data(&self) -> Option<&Value> {
        self.body.data.as_ref().map(|inner| &inner.data)
    }
}

impl IntoResponse for ResourceEnvelope {
    /// A 204 goes out without a body; every other status carries the JSON
    /// envelope.
    fn into_response(self) -> Response {
        if self.status == StatusCode::NO_CONTENT {
            return self.status.into_response();
        }
        (self.status, Json(self.body)).into_response()
    }
}
