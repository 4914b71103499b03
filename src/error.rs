use axum::http::StatusCode;
use thiserror::Error;

/// Failures surfaced by the credential and session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("User not found")]
    NotFound,
    #[error("Invalid password")]
    InvalidCredentials,
    #[error("No user is logged in")]
    NoSession,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("store error: {0}")]
    Store(#[source] anyhow::Error),
    #[error("session storage error: {0}")]
    Persistence(#[source] anyhow::Error),
    #[error("internal error: {0}")]
    Internal(#[source] anyhow::Error),
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound | Self::InvalidCredentials | Self::NoSession => {
                StatusCode::UNAUTHORIZED
            }
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Store(_) | Self::Persistence(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<AuthError> for (StatusCode, String) {
    fn from(e: AuthError) -> Self {
        (e.status(), e.to_string())
    }
}
