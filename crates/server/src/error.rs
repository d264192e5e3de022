//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-side errors to
//! Sentry before responding to the client. Route handlers return
//! `Result<T, AppError>`.
//!
//! Nonce rejection is deliberately not JSON: callers treat any non-JSON
//! response as a hard failure and reload to obtain a fresh token.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::cart::CartError;
use crate::services::catalog::CatalogError;
use crate::services::users::UserStoreError;
use crate::store::StoreError;

/// Application-level error type for the wishlist server.
#[derive(Debug, Error)]
pub enum AppError {
    /// Wishlist storage operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Catalog lookup failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Cart collaborator call failed.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// User lookup failed.
    #[error("User store error: {0}")]
    Users(#[from] UserStoreError),

    /// Session read/write failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Template rendering failed.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// Request token did not match the session's nonce. Terminal.
    #[error("nonce verification failed")]
    NonceRejected,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(
            self,
            Self::Store(_)
                | Self::Catalog(_)
                | Self::Users(_)
                | Self::Session(_)
                | Self::Template(_)
                | Self::Internal(_)
        ) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = match &self {
            Self::Store(_)
            | Self::Catalog(_)
            | Self::Users(_)
            | Self::Session(_)
            | Self::Template(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Cart(_) => StatusCode::BAD_GATEWAY,
            Self::NonceRejected => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Store(_)
            | Self::Catalog(_)
            | Self::Users(_)
            | Self::Session(_)
            | Self::Template(_)
            | Self::Internal(_) => "Internal server error".to_owned(),
            Self::Cart(_) => "Cart service error".to_owned(),
            // Plain text body; clients treat non-JSON as terminal.
            Self::NonceRejected => "nonce verification failed".to_owned(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        let err = AppError::NotFound("product 123".to_owned());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::BadRequest("invalid input".to_owned());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(get_status(AppError::NonceRejected), StatusCode::FORBIDDEN);
        assert_eq!(
            get_status(AppError::NotFound("x".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("x".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("x".to_owned())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn nonce_rejection_is_plain_text() {
        let response = AppError::NonceRejected.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let text = String::from_utf8_lossy(&body);
        assert!(!text.starts_with('{'), "must not be a JSON envelope");
        assert!(text.contains("nonce"));
    }
}
