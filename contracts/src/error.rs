//! Error taxonomy shared by every contract operation.
//!
//! Each variant maps to one [`ErrorKind`]; callers outside the crate (the
//! node's HTTP and JSON-RPC surfaces) branch on the kind, never on the
//! message text.

use estate_ledger::{ContextError, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors returned by contract operations.
///
/// Every error is detected before the invocation commits, so a returned
/// error always means nothing was written.
#[derive(Debug, Error)]
pub enum ContractError {
    /// Wrong argument count, an empty required argument, a malformed number,
    /// or a self-referential party.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced record does not exist under its expected key.
    #[error("{entity} not found: {key}")]
    NotFound {
        /// What was looked up.
        entity: &'static str,
        /// The key parts that were searched, joined for display.
        key: String,
    },

    /// The record exists but is not in a state that allows the operation.
    #[error("invalid state: {entity} is {current}, expected {expected}")]
    StateConflict {
        entity: &'static str,
        current: String,
        expected: String,
    },

    /// The caller lacks the role, or a party is not allowed in its position.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("insufficient funds: account {account_id} holds {available}, needs {required}")]
    InsufficientFunds {
        account_id: String,
        available: f64,
        required: f64,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ContractError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(entity: &'static str, key: &[&str]) -> Self {
        Self::NotFound {
            entity,
            key: key.join("/"),
        }
    }

    pub fn state_conflict(
        entity: &'static str,
        current: impl fmt::Display,
        expected: impl Into<String>,
    ) -> Self {
        Self::StateConflict {
            entity,
            current: current.to_string(),
            expected: expected.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::StateConflict { .. } => ErrorKind::StateConflict,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}

/// A bad invocation context is the caller's fault, not the store's.
impl From<ContextError> for ContractError {
    fn from(err: ContextError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Stable classification of a [`ContractError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Validation,
    NotFound,
    StateConflict,
    Unauthorized,
    InsufficientFunds,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "notFound",
            Self::StateConflict => "stateConflict",
            Self::Unauthorized => "unauthorized",
            Self::InsufficientFunds => "insufficientFunds",
            Self::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ContractResult<T> = Result<T, ContractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(ContractError::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(
            ContractError::not_found("account", &["a1"]).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ContractError::state_conflict("sale offer", "completed", "offered").kind(),
            ErrorKind::StateConflict
        );
        let storage: ContractError = StoreError::InvalidKey("k".into()).into();
        assert_eq!(storage.kind(), ErrorKind::Storage);
    }

    #[test]
    fn messages_name_the_record() {
        let err = ContractError::not_found("real estate", &["seller", "1700000000"]);
        assert_eq!(err.to_string(), "real estate not found: seller/1700000000");

        let err = ContractError::state_conflict("sale offer", "inDelivery", "offered");
        assert_eq!(
            err.to_string(),
            "invalid state: sale offer is inDelivery, expected offered"
        );
    }

    #[test]
    fn kind_serializes_camel_case() {
        let json = serde_json::to_string(&ErrorKind::InsufficientFunds).unwrap();
        assert_eq!(json, "\"insufficientFunds\"");
        assert_eq!(ErrorKind::NotFound.to_string(), "notFound");
    }
}
