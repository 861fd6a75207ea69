//! Shared fixture for the workflow integration tests.

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::BTreeMap;

use estate_contracts::registry::RealEstate;
use estate_contracts::{ContractResult, Handler};
use estate_ledger::{Account, MemoryStore, TxContext};
use serde::de::DeserializeOwned;
use serde_json::Value;

pub const GENESIS_SECS: i64 = 1_700_000_000;

/// A provisioned in-memory ledger with a clock that advances one second per
/// invocation.
pub struct Ledger {
    handler: Handler<MemoryStore>,
    clock: Cell<i64>,
}

impl Ledger {
    /// Accounts: `admin` (administrator), `seller`, `buyer` (150.0),
    /// `poor` (50.0), `donor`, `grantee`.
    pub fn new() -> Self {
        let handler = Handler::new(MemoryStore::new());
        handler
            .provision(
                TxContext::at_unix("genesis", GENESIS_SECS, 0).unwrap(),
                &[
                    Account::administrator("admin", "Registrar"),
                    Account::member("seller", "Seller", 0.0),
                    Account::member("buyer", "Buyer", 150.0),
                    Account::member("poor", "Poor Buyer", 50.0),
                    Account::member("donor", "Donor", 0.0),
                    Account::member("grantee", "Grantee", 0.0),
                ],
            )
            .unwrap();
        Self {
            handler,
            clock: Cell::new(GENESIS_SECS),
        }
    }

    /// The context the next invocation will run under.
    pub fn next_context(&self) -> TxContext {
        let secs = self.clock.get() + 1;
        self.clock.set(secs);
        TxContext::at_unix(format!("tx-{secs}"), secs, 0).unwrap()
    }

    /// Seconds of the most recent invocation.
    pub fn now(&self) -> i64 {
        self.clock.get()
    }

    pub fn call(&self, function: &str, args: &[&str]) -> ContractResult<Value> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.handler
            .invoke(self.next_context(), function, &args)
            .map(|invoked| invoked.result)
    }

    pub fn call_as<T: DeserializeOwned>(&self, function: &str, args: &[&str]) -> T {
        let value = self
            .call(function, args)
            .unwrap_or_else(|e| panic!("{function} {args:?} failed: {e}"));
        serde_json::from_value(value).unwrap()
    }

    pub fn account(&self, id: &str) -> Account {
        let mut found: Vec<Account> = self.call_as("queryAccountList", &[id]);
        assert_eq!(found.len(), 1, "account {id}");
        found.remove(0)
    }

    pub fn balance(&self, id: &str) -> f64 {
        self.account(id).balance
    }

    pub fn assets_of(&self, owner: &str) -> Vec<RealEstate> {
        self.call_as("queryRealEstateList", &[owner])
    }

    /// Registers a 100/80 asset for `owner` and returns its id.
    pub fn register(&self, owner: &str) -> String {
        let asset: RealEstate = self.call_as("createRealEstate", &["admin", owner, "100", "80"]);
        asset.asset_id
    }

    pub fn asset(&self, owner: &str, asset_id: &str) -> RealEstate {
        let mut found: Vec<RealEstate> = self.call_as("queryRealEstateList", &[owner, asset_id]);
        assert_eq!(found.len(), 1, "asset {owner}/{asset_id}");
        found.remove(0)
    }

    pub fn snapshot(&self) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.handler.store().snapshot()
    }
}
