//! SDK Error Types

use thiserror::Error;

/// SDK Result type
pub type Result<T> = std::result::Result<T, SdkError>;

/// Server error codes, as returned in [`SdkError::Rpc`]
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

/// SDK Error
#[derive(Debug, Error)]
pub enum SdkError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("RPC error ({code}): {message}")]
    Rpc { code: i32, message: String },

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl SdkError {
    /// Server error code, if the server answered
    pub fn code(&self) -> Option<i32> {
        match self {
            SdkError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Session missing, expired or revoked
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, SdkError::NotLoggedIn) || self.code() == Some(code::UNAUTHORIZED)
    }

    pub fn is_password_change_required(&self) -> bool {
        self.code() == Some(code::PASSWORD_CHANGE_REQUIRED)
    }
}

impl From<jsonrpsee::core::ClientError> for SdkError {
    fn from(e: jsonrpsee::core::ClientError) -> Self {
        match e {
            jsonrpsee::core::ClientError::Call(call_err) => SdkError::Rpc {
                code: call_err.code(),
                message: call_err.message().to_string(),
            },
            jsonrpsee::core::ClientError::Transport(e) => SdkError::Transport(e.to_string()),
            jsonrpsee::core::ClientError::RestartNeeded(_) => {
                SdkError::Connection("Connection restart needed".to_string())
            }
            jsonrpsee::core::ClientError::ParseError(e) => SdkError::Serialization(e),
            _ => SdkError::Other(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_helpers() {
        let err = SdkError::Rpc {
            code: code::PASSWORD_CHANGE_REQUIRED,
            message: "Password change required".to_string(),
        };
        assert_eq!(err.code(), Some(4031));
        assert!(err.is_password_change_required());
        assert!(!err.is_unauthorized());

        assert!(SdkError::NotLoggedIn.is_unauthorized());
        assert_eq!(SdkError::NotLoggedIn.code(), None);
    }
}
