//! Service-wide error type

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::error::DatabaseError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::{reconciliation::schema::FieldError, token::TokenError};

/// Every distinguishable failure the service reports
#[derive(Error, Debug)]
pub enum AppError {
    /// Username or email already taken
    #[error("{0}")]
    DuplicateIdentity(String),

    #[error("The link has expired. Please start again.")]
    TokenExpired,

    #[error("The link is invalid.")]
    TokenInvalid,

    /// The operation needs a pending registration and there is none
    #[error("No active registration flow. Please register first.")]
    NoActiveSession,

    /// The 15 minute registration window lapsed
    #[error("Registration flow expired. Please register again.")]
    RegistrationExpired,

    /// A verification token was replayed into a session it was not minted for
    #[error("Verification mismatch. Please register again.")]
    Mismatch,

    #[error("{0}")]
    Validation(String),

    #[error("No data received")]
    NoData,

    #[error("{0}")]
    NotFound(String),

    #[error("Authentication required.")]
    Unauthorized,

    #[error("Invalid username or password.")]
    InvalidCredentials,

    #[error("Unauthorized access.")]
    Forbidden,

    #[error("Too many attempts. Please try again later.")]
    RateLimited,

    #[error("Error rendering page: {0}")]
    Render(String),

    #[error("Storage error: {0}")]
    Persistence(#[source] DatabaseError),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(what) => AppError::NotFound(what),
            other => AppError::Persistence(other),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Invalid => AppError::TokenInvalid,
        }
    }
}

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DuplicateIdentity(_) => StatusCode::CONFLICT,
            AppError::TokenExpired
            | AppError::TokenInvalid
            | AppError::NoActiveSession
            | AppError::RegistrationExpired
            | AppError::Mismatch
            | AppError::Validation(_)
            | AppError::NoData
            | AppError::Render(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Persistence(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Persistence(e) => {
                error!("Persistence failure: {}", e);
                "Internal server error".to_string()
            }
            AppError::Internal(e) => {
                error!("Internal failure: {:#}", e);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": message,
        }));

        (status, body).into_response()
    }
}

/// Type alias for service results
pub type AppResult<T> = Result<T, AppError>;
