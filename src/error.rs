use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Domain errors raised where they are detected and converted to a status
/// code plus `{"message": ...}` body only at the response boundary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    /// Unknown user and wrong password share one message so the response
    /// never reveals whether an account exists.
    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("Invalid OTP")]
    InvalidOtp,

    /// Carries the configured OTP window so the message stays honest when
    /// the TTL is tuned away from the default.
    #[error("You can not send two requests in {0} seconds")]
    OtpRateLimited(u64),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    /// The secret store is unreachable; OTP flows fail closed.
    #[error("Authentication service temporarily unavailable")]
    Unavailable(anyhow::Error),

    #[error("Internal Server Error")]
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::OtpRateLimited(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidOtp => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unavailable(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Unavailable(source) => {
                error!(error = %source, "secret store unavailable");
            }
            AppError::Internal(source) => {
                // The detail stays in the logs; the client only sees a
                // generic message.
                error!(error = %source, "internal error");
            }
            _ => {}
        }
        let body = Json(json!({ "message": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if matches!(e, sqlx::Error::RowNotFound) {
            return AppError::NotFound("User not found.".into());
        }
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return AppError::Conflict(
                    "User with this info (email or username or phone number) already exists."
                        .into(),
                );
            }
        }
        AppError::Internal(e.into())
    }
}
