/// Unified error types for the Rollcall attendance service
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
#[derive(Error, Debug)]
pub enum RollcallError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors (missing or unresolvable bearer token)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors (wrong role or not the owner)
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// QR payload failed to decode
    #[error("Invalid QR data: {0}")]
    InvalidQr(String),

    /// QR token issued more than the allowed window ago
    #[error("QR code expired")]
    QrExpired,

    /// Student marked attendance within the cooldown window
    #[error("Attendance can only be marked once every {minutes} minutes")]
    CooldownActive { minutes: i64 },

    /// Course id from the token does not resolve
    #[error("Course not found: {0}")]
    CourseNotFound(String),

    /// No enrollment row for (course, student)
    #[error("Not enrolled in this course")]
    NotEnrolled,

    /// Scanner location outside the proximity threshold
    #[error("Not within the allowed proximity to mark attendance")]
    OutOfRange,

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate email)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Blob storage errors
    #[error("Blob storage error: {0}")]
    BlobStorage(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert RollcallError to HTTP response
impl IntoResponse for RollcallError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            RollcallError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            RollcallError::Authorization(_) => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string())
            }
            RollcallError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string())
            }
            RollcallError::InvalidQr(_) => {
                (StatusCode::BAD_REQUEST, "InvalidQrData", self.to_string())
            }
            RollcallError::QrExpired => (StatusCode::BAD_REQUEST, "QrExpired", self.to_string()),
            RollcallError::CooldownActive { .. } => {
                (StatusCode::BAD_REQUEST, "CooldownActive", self.to_string())
            }
            RollcallError::CourseNotFound(_) => {
                (StatusCode::NOT_FOUND, "CourseNotFound", self.to_string())
            }
            RollcallError::NotEnrolled => (StatusCode::FORBIDDEN, "NotEnrolled", self.to_string()),
            RollcallError::OutOfRange => (StatusCode::BAD_REQUEST, "OutOfRange", self.to_string()),
            RollcallError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            RollcallError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            RollcallError::Database(_)
            | RollcallError::Internal(_)
            | RollcallError::Io(_)
            | RollcallError::BlobStorage(_) => (
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

/// Result type alias for service operations
pub type RollcallResult<T> = Result<T, RollcallError>;
