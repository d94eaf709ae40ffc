// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// A field covered by a uniqueness constraint in the user store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniqueField {
    Username,
    FacebookId,
    TwitterId,
    FoursquareId,
}

impl UniqueField {
    /// Field name as stored on the user document.
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::Username => "username",
            UniqueField::FacebookId => "facebook_id",
            UniqueField::TwitterId => "twitter_id",
            UniqueField::FoursquareId => "foursquare_id",
        }
    }
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication failed")]
    Unauthorized,

    #[error("Duplicate key on {0}")]
    DuplicateKey(UniqueField),

    #[error("Invalid user record: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("{provider} API error: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a provider failure.
    pub fn provider(provider: &'static str, message: impl Into<String>) -> Self {
        AppError::Provider {
            provider,
            message: message.into(),
        }
    }

    /// True if this is a uniqueness violation on `field`.
    pub fn is_duplicate(&self, field: UniqueField) -> bool {
        matches!(self, AppError::DuplicateKey(f) if *f == field)
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::DuplicateKey(field) => (
                StatusCode::CONFLICT,
                "duplicate_key",
                Some(field.to_string()),
            ),
            AppError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "invalid_user",
                Some(errors.to_string()),
            ),
            AppError::Provider { provider, message } => {
                tracing::warn!(provider, error = %message, "Provider API error");
                (StatusCode::BAD_GATEWAY, "provider_error", None)
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for backends and stores
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_duplicate_matches_field() {
        let err = AppError::DuplicateKey(UniqueField::Username);
        assert!(err.is_duplicate(UniqueField::Username));
        assert!(!err.is_duplicate(UniqueField::FacebookId));
        assert!(!AppError::Unauthorized.is_duplicate(UniqueField::Username));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::DuplicateKey(UniqueField::TwitterId)
                .into_response()
                .status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::provider("Facebook", "boom").into_response().status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::Database("down".to_string())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
