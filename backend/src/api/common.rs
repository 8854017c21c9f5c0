//! Error handling utilities for API responses.
//!
//! Provides the standard response envelope and the conversion between
//! protocol-layer errors and HTTP responses. The conversion enforces the
//! propagation policy: every security-relevant failure maps to the same
//! generic 401 message, while the precise kind stays in the logs.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::errors::AuthError;

/// Standard API response wrapper for all endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Indicates if the request was successful.
    pub success: bool,
    /// Response data (present on success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable message.
    pub message: String,
    /// Error details (present on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetails>,
    /// Request timestamp.
    pub timestamp: String,
}

/// Error details for failed requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Machine-readable error type identifier.
    pub error_type: String,
    /// Field-specific validation errors when applicable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

/// Field-specific validation error details.
#[derive(Debug, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: message.into(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Create an error response.
    pub fn error(
        message: impl Into<String>,
        error_type: impl Into<String>,
        details: Option<Vec<FieldError>>,
    ) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            message: message.into(),
            error: Some(ErrorDetails {
                error_type: error_type.into(),
                details,
            }),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Converts an [`AuthError`] to an HTTP response with the standard format.
///
/// Credential, token, and activation failures all collapse into one
/// generic 401 so the response never reveals which check failed.
pub fn auth_error_to_http(error: AuthError) -> (StatusCode, String) {
    let (status, error_type, message) = match error {
        AuthError::InvalidCredentials
        | AuthError::InvalidRefreshToken
        | AuthError::InvalidResetToken
        | AuthError::InvalidAccessToken
        | AuthError::InactiveUser => {
            tracing::debug!(kind = ?error, "authentication rejected");
            (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Invalid credentials or session".to_string(),
            )
        }
        AuthError::DuplicateUsername => (
            StatusCode::CONFLICT,
            "duplicate_username",
            "Username already taken".to_string(),
        ),
        AuthError::MalformedInput { message } => {
            (StatusCode::BAD_REQUEST, "validation_error", message)
        }
        AuthError::UpstreamUnavailable { source } => {
            tracing::error!("store unavailable: {source}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "upstream_unavailable",
                "Service temporarily unavailable".to_string(),
            )
        }
        AuthError::Hashing | AuthError::Signing => {
            tracing::error!(kind = ?error, "internal auth failure");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "Internal server error".to_string(),
            )
        }
    };

    let error_response = ApiResponse::<()>::error(message, error_type, None);
    (status, serde_json::to_string(&error_response).unwrap())
}

/// Formats validator::ValidationErrors into field-specific error details.
pub fn validation_errors_to_field_errors(errors: validator::ValidationErrors) -> Vec<FieldError> {
    errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| FieldError {
                field: field.to_string(),
                message: error
                    .message
                    .as_ref()
                    .unwrap_or(&"Invalid value".into())
                    .to_string(),
            })
        })
        .collect()
}

/// Helper to create a validation error response.
pub fn validation_error_response(errors: validator::ValidationErrors) -> (StatusCode, String) {
    let field_errors = validation_errors_to_field_errors(errors);
    let error_response =
        ApiResponse::<()>::error("Validation failed", "validation_error", Some(field_errors));
    (
        StatusCode::BAD_REQUEST,
        serde_json::to_string(&error_response).unwrap(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StoreError;

    #[test]
    fn security_errors_share_one_generic_response() {
        let (s1, b1) = auth_error_to_http(AuthError::InvalidCredentials);
        let (s2, b2) = auth_error_to_http(AuthError::InvalidRefreshToken);
        let (s3, b3) = auth_error_to_http(AuthError::InactiveUser);

        assert_eq!(s1, StatusCode::UNAUTHORIZED);
        assert_eq!(s1, s2);
        assert_eq!(s2, s3);

        let msg = |body: &str| {
            serde_json::from_str::<serde_json::Value>(body).unwrap()["message"].to_string()
        };
        assert_eq!(msg(&b1), msg(&b2));
        assert_eq!(msg(&b2), msg(&b3));
    }

    #[test]
    fn non_security_errors_keep_their_status() {
        let (status, _) = auth_error_to_http(AuthError::DuplicateUsername);
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = auth_error_to_http(AuthError::UpstreamUnavailable {
            source: StoreError::Unavailable {
                source: anyhow::anyhow!("down"),
            },
        });
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
