use service_core::error::AppError;
use thiserror::Error;

/// Domain-level errors for identity and team operations.
///
/// Credential failures are deliberately collapsed: an unknown email and a
/// wrong password both surface as `InvalidCredentials`, and every token
/// verification failure surfaces as `InvalidToken`.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is disabled")]
    AccountDisabled,

    #[error("Email is already registered")]
    EmailAlreadyRegistered,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Invitation is invalid or has expired")]
    InvitationInvalidOrExpired,

    #[error("User not found")]
    UserNotFound,

    #[error("Team not found")]
    TeamNotFound,

    #[error("Database error: {0}")]
    Database(anyhow::Error),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(anyhow::anyhow!(err))
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Conflict(_) => ServiceError::EmailAlreadyRegistered,
            other => ServiceError::Internal(anyhow::anyhow!(other.to_string())),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::InvalidCredentials | ServiceError::InvalidToken => {
                AppError::AuthError(anyhow::anyhow!(message))
            }
            ServiceError::AccountDisabled => AppError::Forbidden(anyhow::anyhow!(message)),
            ServiceError::EmailAlreadyRegistered => AppError::Conflict(anyhow::anyhow!(message)),
            ServiceError::InvitationInvalidOrExpired => {
                AppError::BadRequest(anyhow::anyhow!(message))
            }
            ServiceError::UserNotFound | ServiceError::TeamNotFound => {
                AppError::NotFound(anyhow::anyhow!(message))
            }
            ServiceError::Database(e) => AppError::DatabaseError(e),
            ServiceError::Internal(e) => AppError::InternalError(e),
        }
    }
}
