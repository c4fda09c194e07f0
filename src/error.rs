//! Error handler for warden.
//!
//! Every handler rejection funnels through [`ServerError`], which is the
//! single place translating failures into the response envelope.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sqlx::Error as SQLxError;
use thiserror::Error;
use validator::ValidationErrors;

use crate::response::Envelope;

pub type Result<T> = std::result::Result<T, ServerError>;

/// Shown on missing, unknown or expired credentials.
pub const UNAUTHORIZED_MESSAGE: &str = "Please login first";
/// Shown whenever an unexpected failure reaches the client.
pub const INTERNAL_MESSAGE: &str = "O Ooo! Something Went Wrong!";

/// Enum representing server-side errors.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("validation error occurred")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Json(#[from] JsonRejection),

    #[error(transparent)]
    Query(#[from] QueryRejection),

    #[error("SQL request failed: {0}")]
    Sql(#[from] SQLxError),

    #[error(transparent)]
    Crypto(#[from] crate::crypto::CryptoError),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("missing or invalid 'Authorization' header")]
    Unauthorized,

    #[error("internal server error, {details}")]
    Internal { details: String },
}

/// First failing field's message, in the order validator reports them.
fn first_validation_message(errors: &ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .find_map(|(field, issues)| {
            issues.first().map(|issue| match &issue.message {
                Some(message) => message.to_string(),
                None => format!("Invalid value for field '{field}'"),
            })
        })
        .unwrap_or_else(|| "Invalid request".to_owned())
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            // Malformed input keeps HTTP 200; failure is in-body.
            ServerError::Validation(errors) => {
                Envelope::fail(first_validation_message(&errors))
            }
            ServerError::Json(rejection) => Envelope::fail(rejection.body_text()),
            ServerError::Query(rejection) => Envelope::fail(rejection.body_text()),

            ServerError::Unauthorized => Envelope::fail(UNAUTHORIZED_MESSAGE)
                .status(StatusCode::UNAUTHORIZED),

            // Anything else is logged server-side and kept generic for
            // the client.
            ServerError::Sql(err) => internal(&err.to_string()),
            ServerError::Crypto(err) => internal(&err.to_string()),
            ServerError::Join(err) => internal(&err.to_string()),
            ServerError::Internal { details } => internal(&details),
        }
        .into_response()
    }
}

fn internal(details: &str) -> Envelope {
    tracing::error!(%details, "server returned 500 status");
    Envelope::fail(INTERNAL_MESSAGE).status(StatusCode::INTERNAL_SERVER_ERROR)
}
