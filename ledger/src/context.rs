//! # Invocation Context
//!
//! Every invocation carries a [`TxContext`] supplied by whoever sequences
//! transactions: the platform on a real ledger, the node's receive loop in a
//! standalone deployment. Asset identifiers, history keys, and `createdAt`
//! fields all derive from it, so replaying the same invocation on another
//! peer yields the same keys. Nothing under this crate reads the clock.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TIMESTAMP_KEY_WIDTH;

/// Errors raised when deriving identifiers from the context timestamp.
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("timestamp {0} cannot be expressed in unix nanoseconds")]
    OutOfRange(String),

    #[error("timestamp {0} precedes the unix epoch")]
    BeforeEpoch(String),
}

/// Transaction identity and time, identical on every replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxContext {
    /// Platform-assigned transaction id. Used for logging only.
    pub tx_id: String,
    /// Platform-assigned transaction timestamp.
    pub timestamp: DateTime<Utc>,
}

impl TxContext {
    pub fn new(tx_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            tx_id: tx_id.into(),
            timestamp,
        }
    }

    /// Build a context from unix seconds plus a sub-second nanosecond part.
    pub fn at_unix(tx_id: impl Into<String>, secs: i64, nanos: u32) -> Result<Self, ContextError> {
        let timestamp = Utc
            .timestamp_opt(secs, nanos)
            .single()
            .ok_or_else(|| ContextError::OutOfRange(format!("{secs}.{nanos:09}")))?;
        Ok(Self::new(tx_id, timestamp))
    }

    /// Unix nanoseconds of the context timestamp.
    pub fn unix_nanos(&self) -> Result<u64, ContextError> {
        unix_nanos(&self.timestamp)
    }

    /// Identifier for a freshly registered asset: unix seconds.
    pub fn second_id(&self) -> String {
        self.timestamp.timestamp().to_string()
    }

    /// Identifier for a re-keyed asset: unix nanoseconds.
    pub fn nano_id(&self) -> Result<String, ContextError> {
        Ok(self.unix_nanos()?.to_string())
    }

    /// History key part: zero-padded nanoseconds, so that decimal keys
    /// sort in time order.
    pub fn history_key_part(&self) -> Result<String, ContextError> {
        history_key_part(&self.timestamp)
    }
}

fn unix_nanos(timestamp: &DateTime<Utc>) -> Result<u64, ContextError> {
    let nanos = timestamp
        .timestamp_nanos_opt()
        .ok_or_else(|| ContextError::OutOfRange(timestamp.to_rfc3339()))?;
    u64::try_from(nanos).map_err(|_| ContextError::BeforeEpoch(timestamp.to_rfc3339()))
}

/// The history key part for a record created at `timestamp`. Used to
/// rewrite a history record in place after it was found by a scan.
pub fn history_key_part(timestamp: &DateTime<Utc>) -> Result<String, ContextError> {
    Ok(format!(
        "{:0width$}",
        unix_nanos(timestamp)?,
        width = TIMESTAMP_KEY_WIDTH
    ))
}
