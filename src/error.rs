//! API error taxonomy and user-facing error-message normalization.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::provider::ProviderError;

/// Failures a route handler can produce.
///
/// Every variant renders as `{"success": false, "message": ...}` with the
/// matching status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    /// Provider transport failure or an unexpected provider response.
    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Provider(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(json!({ "success": false, "message": self.to_string() })),
        )
            .into_response()
    }
}

/// Maps a provider business rejection to a 400 with the provider's message;
/// transport failures pass through as gateway errors.
pub fn provider_reject(e: ProviderError) -> ApiError {
    match e {
        ProviderError::Rejected { message, .. } => ApiError::BadRequest(message),
        other => ApiError::Provider(other),
    }
}

const GENERIC_ERROR: &str = "An unexpected error occurred";

/// Normalizes a raw error message to user-friendly text.
///
/// Known provider messages are substring-matched to fixed phrasings;
/// anything unmatched passes through verbatim. The more specific
/// "Invalid email or password" is checked before the "Invalid email"
/// shape complaint so login failures keep their own wording.
pub fn friendly_message(raw: &str) -> String {
    let message = raw.trim();
    if message.is_empty() {
        return GENERIC_ERROR.to_string();
    }

    if message.contains("Invalid email or password")
        || message.contains("Invalid login credentials")
    {
        return "Invalid email or password".to_string();
    }
    if message.contains("Invalid email") {
        return "Please enter a valid email address".to_string();
    }
    if message.contains("already registered") {
        return "This email is already registered".to_string();
    }
    if message.contains("Invalid or expired OTP") || message.contains("expired or is invalid") {
        return "The OTP you entered is invalid or has expired".to_string();
    }
    if message.contains("weak") {
        return "Password is too weak. Use uppercase, lowercase, numbers, and special characters"
            .to_string();
    }
    let lower = message.to_lowercase();
    if lower.contains("network") || lower.contains("fetch") {
        return "Network error. Please check your connection".to_string();
    }

    message.to_string()
}
