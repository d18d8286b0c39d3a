//! Error taxonomy and HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Insufficient stock for \"{name}\". Available: {available}")]
    InsufficientStock { name: String, available: i32 },

    #[error("Payment verification failed — hash mismatch")]
    HashMismatch,

    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Transaction reference collision: {0}")]
    TxnRefCollision(String),

    #[error("Storage error: {0}")]
    Store(String),
}

impl Error {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::InsufficientStock { .. } | Self::HashMismatch => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::GatewayUnavailable(_) => StatusCode::BAD_GATEWAY,
            Self::Configuration(_) | Self::TxnRefCollision(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Body text returned to clients. Internal details never leak: store and
    /// configuration failures have already been logged with context by the
    /// time they reach the boundary.
    fn public_message(&self) -> String {
        match self {
            Self::Store(_) | Self::TxnRefCollision(_) => "Internal server error".to_string(),
            Self::Configuration(_) => "PayU credentials not configured".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "message": self.public_message() }))).into_response()
    }
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(e.to_string())
    }
}
