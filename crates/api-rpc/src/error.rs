//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use kissan_core::domain::DomainError;
use kissan_core::error::AppError;
use thiserror::Error;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const THROTTLED: i32 = 4003;
    pub const UNAUTHORIZED: i32 = 4010;
    pub const FORBIDDEN: i32 = 4030;
    pub const PASSWORD_CHANGE_REQUIRED: i32 = 4031;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const NOTIFICATION_ERROR: i32 = 5003;
}

/// Failure to bring the server up
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind JSON-RPC server on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to register method: {0}")]
    Register(String),
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let code = match &err {
        AppError::Domain(DomainError::InvalidStateTransition { .. })
        | AppError::Domain(DomainError::ExceedsBalance { .. }) => code::CONFLICT,
        AppError::Domain(_) | AppError::Validation(_) | AppError::Serialization(_) => {
            code::VALIDATION_ERROR
        }
        AppError::NotFound(_) => code::NOT_FOUND,
        AppError::Conflict(_) | AppError::InvalidState(_) => code::CONFLICT,
        AppError::Unauthorized(_) => code::UNAUTHORIZED,
        AppError::Forbidden(_) => code::FORBIDDEN,
        AppError::PasswordChangeRequired => code::PASSWORD_CHANGE_REQUIRED,
        AppError::Database(_) => code::DB_ERROR,
        AppError::Notification(_) => code::NOTIFICATION_ERROR,
        AppError::Config(_) | AppError::Internal(_) => code::INTERNAL_ERROR,
    };

    let message = match err {
        // Storage details stay in the server log
        AppError::Database(msg) => {
            tracing::error!(error = %msg, "Database error while serving request");
            "Database error".to_string()
        }
        AppError::Validation(msg)
        | AppError::NotFound(msg)
        | AppError::Conflict(msg)
        | AppError::Unauthorized(msg)
        | AppError::Forbidden(msg)
        | AppError::InvalidState(msg) => msg,
        other => other.to_string(),
    };

    ErrorObjectOwned::owned(code, message, None::<()>)
}

pub fn throttled(message: &str) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code::THROTTLED, message, None::<()>)
}
