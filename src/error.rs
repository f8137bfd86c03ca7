/// Unified error types for the Mirador engagement service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the engagement core
#[derive(Error, Debug)]
pub enum EngageError {
    /// Database errors
    #[error("Database error: {0}")]
    Storage(#[from] sqlx::Error),

    /// No actor identity present on the request
    #[error("Authentication required: {0}")]
    Unauthenticated(String),

    /// Actor is authenticated but lacks the moderator scope
    #[error("Not authorized: {0}")]
    Forbidden(String),

    /// Malformed or missing input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Submission cooldown still active
    #[error("Rate limited, retry in {seconds_remaining}s")]
    RateLimited { seconds_remaining: u64 },

    /// Media upload or media metadata persistence failed
    #[error("Media storage error: {0}")]
    MediaStorage(String),

    /// Identity profile lookup failed
    #[error("Identity lookup error: {0}")]
    IdentityLookup(String),

    /// Target row does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert EngageError to an HTTP response
impl IntoResponse for EngageError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            EngageError::Unauthenticated(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            EngageError::Forbidden(_) => (StatusCode::FORBIDDEN, "Forbidden", self.to_string()),
            EngageError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, "InvalidInput", self.to_string())
            }
            EngageError::RateLimited { seconds_remaining } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimited",
                format!(
                    "Please wait {} seconds before submitting again",
                    seconds_remaining
                ),
            ),
            EngageError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            EngageError::MediaStorage(_) => (
                StatusCode::BAD_GATEWAY,
                "MediaStorageFailure",
                "Media upload failed, please try again".to_string(),
            ),
            EngageError::IdentityLookup(_) => (
                StatusCode::BAD_GATEWAY,
                "IdentityLookupFailure",
                "Identity lookup failed".to_string(),
            ),
            EngageError::Storage(_) | EngageError::Internal(_) | EngageError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for engagement operations
pub type EngageResult<T> = Result<T, EngageError>;
