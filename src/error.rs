//! Error types shared across the application.
//!
//! Each layer has its own enum: stores report `StoreError`, the client-side chat
//! session reports `ChatError`, and HTTP handlers return `AppError`, which renders
//! the `{"error": "..."}` envelope with an appropriate status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorBody;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Remote store error [{status}]: {message}")]
    Remote { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("User is not authenticated")]
    Unauthenticated,

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    PaymentRequired(String),

    #[error("Backend error [{status}]: {message}")]
    Backend { status: u16, message: String },

    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl ChatError {
    /// Map a failed chat-function response to the matching error.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => ChatError::RateLimited(message),
            402 => ChatError::PaymentRequired(message),
            _ => ChatError::Backend { status, message },
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::RateLimited(_) => Some(429),
            ChatError::PaymentRequired(_) => Some(402),
            ChatError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("AI gateway credential is not configured")]
    MissingCredential,

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Insufficient credits. Add funds to the workspace.")]
    PaymentRequired,

    #[error("Error processing request")]
    Gateway { status: u16 },

    #[error("Error contacting AI gateway: {0}")]
    GatewayTransport(#[from] reqwest::Error),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            other => AppError::Store(other),
        }
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::PaymentRequired => StatusCode::PAYMENT_REQUIRED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MissingCredential
            | AppError::Gateway { .. }
            | AppError::GatewayTransport(_)
            | AppError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
