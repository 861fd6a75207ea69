//! # Account Balance Ledger
//!
//! Balance lookup and update on accounts that already exist in the world
//! state. Accounts are provisioned once at genesis and are never created by
//! an invocation; every operation here resolves an account by id and writes
//! it back in place under `(account-key, accountId)`.
//!
//! Balances never go negative: [`debit`] refuses rather than overdraw.

use estate_ledger::config::ACCOUNT_KEY;
use estate_ledger::{Account, LedgerTx};

use crate::error::{ContractError, ContractResult};

/// Look up an account, failing with `NotFound` if it does not exist.
pub fn resolve(tx: &LedgerTx<'_>, account_id: &str) -> ContractResult<Account> {
    tx.get(ACCOUNT_KEY, &[account_id])?
        .ok_or_else(|| ContractError::not_found("account", &[account_id]))
}

/// Add `amount` to the account's balance and stage the update.
///
/// A credit whose result is not a finite number is refused and the account
/// is left untouched.
pub fn credit(tx: &mut LedgerTx<'_>, account: &mut Account, amount: f64) -> ContractResult<()> {
    check_amount(amount)?;
    let balance = account.balance + amount;
    if !balance.is_finite() {
        return Err(ContractError::validation(format!(
            "crediting {amount} to account {} overflows its balance",
            account.account_id
        )));
    }
    account.balance = balance;
    tx.put(ACCOUNT_KEY, &[account.account_id.as_str()], &*account)?;
    Ok(())
}

/// Subtract `amount` from the account's balance and stage the update.
///
/// # Errors
///
/// Returns [`ContractError::InsufficientFunds`] if the balance is below
/// `amount`; the account is left untouched.
pub fn debit(tx: &mut LedgerTx<'_>, account: &mut Account, amount: f64) -> ContractResult<()> {
    check_amount(amount)?;
    if account.balance < amount {
        return Err(ContractError::InsufficientFunds {
            account_id: account.account_id.clone(),
            available: account.balance,
            required: amount,
        });
    }
    account.balance -= amount;
    tx.put(ACCOUNT_KEY, &[account.account_id.as_str()], &*account)?;
    Ok(())
}

/// Store a new account. Genesis seeding only; not reachable from an
/// invocation.
pub fn provision(tx: &mut LedgerTx<'_>, account: &Account) -> ContractResult<()> {
    if account.account_id.is_empty() {
        return Err(ContractError::validation("accountId must not be empty"));
    }
    check_amount(account.balance)?;
    if tx
        .get::<_, Account>(ACCOUNT_KEY, &[account.account_id.as_str()])?
        .is_some()
    {
        return Err(ContractError::state_conflict(
            "account",
            format!("{} (already provisioned)", account.account_id),
            "absent",
        ));
    }
    tx.put(ACCOUNT_KEY, &[account.account_id.as_str()], &*account)?;
    tracing::info!(
        account_id = %account.account_id,
        role = %account.role,
        "account provisioned"
    );
    Ok(())
}

/// `queryAccountList`: every account when `ids` is empty, otherwise an
/// independent exact lookup per id with misses skipped.
pub fn query_account_list(tx: &LedgerTx<'_>, ids: &[String]) -> ContractResult<Vec<Account>> {
    let accounts = if ids.is_empty() {
        tx.scan_all(ACCOUNT_KEY)?
    } else {
        tx.lookup_exact(ACCOUNT_KEY, ids)?
    };
    Ok(accounts)
}

fn check_amount(amount: f64) -> ContractResult<()> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(ContractError::validation(format!(
            "amount must be a non-negative number, got {amount}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use estate_ledger::{MemoryStore, TxContext};

    fn ctx() -> TxContext {
        TxContext::at_unix("tx-accounts", 1_700_000_000, 0).unwrap()
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let mut tx = LedgerTx::begin(&store, ctx());
        provision(&mut tx, &Account::administrator("admin", "Registrar")).unwrap();
        provision(&mut tx, &Account::member("alice", "Alice", 150.0)).unwrap();
        provision(&mut tx, &Account::member("bob", "Bob", 10.0)).unwrap();
        tx.commit().unwrap();
        store
    }

    #[test]
    fn resolve_missing_account() {
        let store = seeded();
        let tx = LedgerTx::begin(&store, ctx());
        let err = resolve(&tx, "carol").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn debit_then_credit() {
        let store = seeded();
        let mut tx = LedgerTx::begin(&store, ctx());
        let mut alice = resolve(&tx, "alice").unwrap();
        debit(&mut tx, &mut alice, 100.0).unwrap();
        assert_eq!(resolve(&tx, "alice").unwrap().balance, 50.0);

        credit(&mut tx, &mut alice, 25.0).unwrap();
        assert_eq!(resolve(&tx, "alice").unwrap().balance, 75.0);
    }

    #[test]
    fn debit_refuses_overdraft() {
        let store = seeded();
        let mut tx = LedgerTx::begin(&store, ctx());
        let mut bob = resolve(&tx, "bob").unwrap();
        let err = debit(&mut tx, &mut bob, 10.5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(bob.balance, 10.0);
        assert_eq!(tx.staged_len(), 0);
    }

    #[test]
    fn credit_refuses_overflowing_balance() {
        let store = MemoryStore::new();
        let mut tx = LedgerTx::begin(&store, ctx());
        provision(&mut tx, &Account::member("whale", "Whale", f64::MAX)).unwrap();
        tx.commit().unwrap();

        let mut tx = LedgerTx::begin(&store, ctx());
        let mut whale = resolve(&tx, "whale").unwrap();
        let err = credit(&mut tx, &mut whale, f64::MAX).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(whale.balance, f64::MAX);
        assert_eq!(tx.staged_len(), 0);
        assert_eq!(resolve(&tx, "whale").unwrap().balance, f64::MAX);
    }

    #[test]
    fn negative_amounts_rejected() {
        let store = seeded();
        let mut tx = LedgerTx::begin(&store, ctx());
        let mut bob = resolve(&tx, "bob").unwrap();
        assert!(credit(&mut tx, &mut bob, -1.0).is_err());
        assert!(debit(&mut tx, &mut bob, f64::NAN).is_err());
    }

    #[test]
    fn provision_twice_conflicts() {
        let store = seeded();
        let mut tx = LedgerTx::begin(&store, ctx());
        let err = provision(&mut tx, &Account::member("alice", "Alice", 1.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn account_list_scan_or_exact() {
        let store = seeded();
        let tx = LedgerTx::begin(&store, ctx());

        let all = query_account_list(&tx, &[]).unwrap();
        let ids: Vec<&str> = all.iter().map(|a| a.account_id.as_str()).collect();
        assert_eq!(ids, vec!["admin", "alice", "bob"]);

        let some = query_account_list(&tx, &["bob".into(), "nobody".into(), "admin".into()]).unwrap();
        let ids: Vec<&str> = some.iter().map(|a| a.account_id.as_str()).collect();
        assert_eq!(ids, vec!["bob", "admin"]);
    }
}
