//! Uniform response envelope.
//!
//! Every endpoint answers with `{success, message, data}`; logical
//! failures keep HTTP 200 and signal through the `success` flag.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

/// Response wrapper shared by every route.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    pub data: Value,
    #[serde(skip)]
    status: StatusCode,
}

impl Envelope {
    /// Successful response with a payload.
    pub fn ok(data: impl Serialize, message: impl Into<String>) -> Self {
        let data = serde_json::to_value(data).unwrap_or_else(|err| {
            tracing::error!(%err, "response payload serialization failed");
            Value::Object(Map::new())
        });

        Self {
            success: true,
            message: message.into(),
            data,
            status: StatusCode::OK,
        }
    }

    /// Successful response with an empty payload.
    pub fn empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Value::Object(Map::new()),
            status: StatusCode::OK,
        }
    }

    /// Logical failure, signaled in-body with HTTP 200.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: Value::Object(Map::new()),
            status: StatusCode::OK,
        }
    }

    /// Override the HTTP status code.
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        (self.status, Json(&self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_envelope_shape() {
        let envelope = Envelope::ok(json!({ "id": "abc" }), "done");
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({ "success": true, "message": "done", "data": { "id": "abc" } })
        );
    }

    #[test]
    fn test_fail_envelope_keeps_empty_data() {
        let envelope = Envelope::fail("nope");
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({ "success": false, "message": "nope", "data": {} })
        );
    }

    #[tokio::test]
    async fn test_status_override() {
        let response =
            Envelope::fail("Please login first").status(StatusCode::UNAUTHORIZED).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
