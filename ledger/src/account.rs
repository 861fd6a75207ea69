//! # Accounts
//!
//! Accounts are provisioned outside the transaction layer and only looked
//! up, debited, and credited by it. Authorization is a property of the
//! account's [`Role`], never of its display name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability attached to an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// May register assets. May not buy or receive donations.
    Administrator,
    /// Ordinary participant: owns, sells, buys, donates, receives.
    Member,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Administrator => write!(f, "administrator"),
            Self::Member => write!(f, "member"),
        }
    }
}

/// A ledger account.
///
/// `balance` is a non-negative real amount. Every debit is checked against
/// it before the account is written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub account_id: String,
    pub display_name: String,
    pub balance: f64,
    pub role: Role,
}

impl Account {
    pub fn administrator(account_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            display_name: display_name.into(),
            balance: 0.0,
            role: Role::Administrator,
        }
    }

    pub fn member(
        account_id: impl Into<String>,
        display_name: impl Into<String>,
        balance: f64,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            display_name: display_name.into(),
            balance,
            role: Role::Member,
        }
    }

    pub fn is_administrator(&self) -> bool {
        matches!(self.role, Role::Administrator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_decides_administrator_status() {
        let admin = Account::administrator("a0", "anything at all");
        let member = Account::member("a1", "administrator", 10.0);
        assert!(admin.is_administrator());
        // A member named like an administrator is still a member.
        assert!(!member.is_administrator());
    }

    #[test]
    fn account_json_round_trip() {
        let account = Account::member("5feceb66ffc8", "Alice", 5_000_000.0);
        let json = serde_json::to_string(&account).unwrap();
        assert!(json.contains("\"accountId\""));
        assert!(json.contains("\"role\":\"member\""));
        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(back, account);
    }
}
