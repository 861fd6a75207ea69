//! Genesis account seeding.
//!
//! Accounts are never created by an invocation. A fresh ledger is seeded
//! once, either from a JSON file:
//!
//! ```json
//! { "accounts": [
//!     { "accountId": "5feceb66ffc8", "displayName": "administrator",
//!       "balance": 0, "role": "administrator" },
//!     { "accountId": "6b86b273ff34", "displayName": "Alice",
//!       "balance": 5000000, "role": "member" }
//! ] }
//! ```
//!
//! or from the built-in set below. A ledger that already holds accounts is
//! left alone.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Deserialize;
use std::path::Path;

use estate_contracts::Handler;
use estate_ledger::config::ADMINISTRATOR_DISPLAY_NAME;
use estate_ledger::{Account, StateStore, TxContext};

#[derive(Debug, Deserialize)]
struct GenesisFile {
    accounts: Vec<Account>,
}

/// One administrator and five funded members.
pub fn default_accounts() -> Vec<Account> {
    vec![
        Account::administrator("5feceb66ffc8", ADMINISTRATOR_DISPLAY_NAME),
        Account::member("6b86b273ff34", "Alice", 5_000_000.0),
        Account::member("d4735e3a265e", "Bob", 5_000_000.0),
        Account::member("4e07408562be", "Carol", 5_000_000.0),
        Account::member("4b227777d4dd", "Dave", 5_000_000.0),
        Account::member("ef2d127de37b", "Erin", 5_000_000.0),
    ]
}

/// Accounts from `path`, or the built-in set.
pub fn load(path: Option<&Path>) -> Result<Vec<Account>> {
    let Some(path) = path else {
        return Ok(default_accounts());
    };
    let raw = std::fs::read(path)
        .with_context(|| format!("failed to read genesis file {}", path.display()))?;
    let file: GenesisFile = serde_json::from_slice(&raw)
        .with_context(|| format!("invalid genesis file {}", path.display()))?;
    if file.accounts.is_empty() {
        anyhow::bail!("genesis file {} lists no accounts", path.display());
    }
    Ok(file.accounts)
}

/// Provision `accounts` unless the ledger already has some. Returns the
/// number of accounts written.
pub fn seed<S: StateStore>(handler: &Handler<S>, accounts: &[Account]) -> Result<usize> {
    let ctx = TxContext::new("genesis", Utc::now());
    if handler.has_accounts(ctx.clone())? {
        tracing::info!("ledger already provisioned, skipping genesis");
        return Ok(0);
    }
    let written = handler
        .provision(ctx, accounts)
        .context("failed to provision genesis accounts")?;
    tracing::info!(accounts = accounts.len(), "genesis accounts provisioned");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use estate_ledger::MemoryStore;

    #[test]
    fn default_set_has_one_administrator() {
        let accounts = default_accounts();
        assert_eq!(accounts.iter().filter(|a| a.is_administrator()).count(), 1);
        assert!(accounts.iter().all(|a| a.balance >= 0.0));
    }

    #[test]
    fn seeding_is_idempotent() {
        let handler = Handler::new(MemoryStore::new());
        assert_eq!(seed(&handler, &default_accounts()).unwrap(), 6);
        assert_eq!(seed(&handler, &default_accounts()).unwrap(), 0);
        assert_eq!(handler.store().len(), 6);
    }

    #[test]
    fn genesis_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genesis.json");
        std::fs::write(
            &path,
            r#"{"accounts":[
                {"accountId":"root","displayName":"Registrar","balance":0,"role":"administrator"},
                {"accountId":"m1","displayName":"Member","balance":12.5,"role":"member"}
            ]}"#,
        )
        .unwrap();

        let accounts = load(Some(&path)).unwrap();
        assert_eq!(accounts.len(), 2);
        assert!(accounts[0].is_administrator());
        assert_eq!(accounts[1].balance, 12.5);
    }

    #[test]
    fn empty_or_missing_genesis_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        std::fs::write(&path, r#"{"accounts":[]}"#).unwrap();
        assert!(load(Some(&path)).is_err());
        assert!(load(Some(&dir.path().join("missing.json"))).is_err());
        assert_eq!(load(None).unwrap().len(), 6);
    }
}
