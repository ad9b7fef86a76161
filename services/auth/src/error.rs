//! HTTP error type shared by all handlers

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use thiserror::Error;
use tracing::error;

use crate::{
    credentials::CredentialError, csrf::CsrfError, models::account::InvalidTimestamp,
    session::SessionError, verification::VerificationError,
};

/// Message returned with `email_not_verified`.
pub const NOT_VERIFIED_MESSAGE: &str =
    "Du musst erst deine E-Mail bestätigen. Wir haben dir eine neue E-Mail gesendet.";

/// Errors surfaced to API clients
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadInput(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("{}", NOT_VERIFIED_MESSAGE)]
    NotVerified,

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error(transparent)]
    Csrf(#[from] CsrfError),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Invalid verification token")]
    InvalidToken,

    /// Detail is logged, never returned.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn forbidden() -> Self {
        Self::Forbidden("You do not have permission to access this resource".to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadInput(_) | ApiError::InvalidToken => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotVerified | ApiError::Forbidden(_) | ApiError::Csrf(_) => {
                StatusCode::FORBIDDEN
            }
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadInput(_) => "invalid_request_body",
            ApiError::InvalidCredentials => "invalid_credentials",
            ApiError::NotVerified => "email_not_verified",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Csrf(_) => "invalid_csrf",
            ApiError::Conflict(_) => "email_exists",
            ApiError::NotFound(_) => "not_found",
            ApiError::InvalidToken => "invalid_token",
            ApiError::Internal(_) => "server_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(detail) => {
                error!("Internal error: {}", detail);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(serde_json::json!({
            "error": self.code(),
            "message": message,
        }));

        (self.status(), body).into_response()
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Storage(e) => ApiError::Internal(e.to_string()),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}

impl From<VerificationError> for ApiError {
    fn from(err: VerificationError) -> Self {
        match err {
            VerificationError::InvalidToken => ApiError::InvalidToken,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(err: CredentialError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UniqueViolation(_) => {
                ApiError::Conflict("A user with this email already exists".to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<InvalidTimestamp> for ApiError {
    fn from(err: InvalidTimestamp) -> Self {
        ApiError::Internal(err.to_string())
    }
}
