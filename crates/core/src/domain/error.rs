// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid application state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Invalid location parent: {child} cannot be placed under {parent}")]
    InvalidParent { child: String, parent: String },

    #[error("Role {role} requires a location at level {expected}")]
    JurisdictionMismatch { role: String, expected: String },

    #[error("Payment exceeds outstanding balance: {amount} > {balance} paise")]
    ExceedsBalance { amount: i64, balance: i64 },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
