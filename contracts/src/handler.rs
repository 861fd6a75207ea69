//! # Invocation Handler
//!
//! The single entry point the transport calls: a function name, a flat list
//! of string arguments, and the platform-supplied [`TxContext`]. The handler
//! parses the arguments, runs one workflow operation against a fresh
//! [`LedgerTx`], and commits the staged writes only if the operation
//! succeeded. A failed invocation drops its transaction, so nothing it staged
//! is ever visible.

use estate_ledger::{Account, LedgerTx, StateStore, StoreError, TxContext};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::accounts;
use crate::args::{self, expect_count, required};
use crate::donation::{self, DonationOutcome};
use crate::error::{ContractError, ContractResult};
use crate::registry;
use crate::sale::{self, SaleOutcome};

// ---------------------------------------------------------------------------
// Function names
// ---------------------------------------------------------------------------

/// Every function reachable through [`Handler::invoke`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    CreateRealEstate,
    QueryRealEstateList,
    CreateSaleOffer,
    CommitPurchase,
    QuerySaleOffers,
    QueryPurchaseHistoryByBuyer,
    FinalizeSale,
    CreateDonation,
    QueryDonationOffers,
    QueryDonationsByGrantee,
    FinalizeDonation,
    QueryAccountList,
}

impl Function {
    pub const ALL: [Function; 12] = [
        Self::CreateRealEstate,
        Self::QueryRealEstateList,
        Self::CreateSaleOffer,
        Self::CommitPurchase,
        Self::QuerySaleOffers,
        Self::QueryPurchaseHistoryByBuyer,
        Self::FinalizeSale,
        Self::CreateDonation,
        Self::QueryDonationOffers,
        Self::QueryDonationsByGrantee,
        Self::FinalizeDonation,
        Self::QueryAccountList,
    ];

    /// The name callers use on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRealEstate => "createRealEstate",
            Self::QueryRealEstateList => "queryRealEstateList",
            Self::CreateSaleOffer => "createSaleOffer",
            Self::CommitPurchase => "commitPurchase",
            Self::QuerySaleOffers => "querySaleOffers",
            Self::QueryPurchaseHistoryByBuyer => "queryPurchaseHistoryByBuyer",
            Self::FinalizeSale => "finalizeSale",
            Self::CreateDonation => "createDonation",
            Self::QueryDonationOffers => "queryDonationOffers",
            Self::QueryDonationsByGrantee => "queryDonationsByGrantee",
            Self::FinalizeDonation => "finalizeDonation",
            Self::QueryAccountList => "queryAccountList",
        }
    }

    /// Read-only functions never stage a write.
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            Self::QueryRealEstateList
                | Self::QuerySaleOffers
                | Self::QueryPurchaseHistoryByBuyer
                | Self::QueryDonationOffers
                | Self::QueryDonationsByGrantee
                | Self::QueryAccountList
        )
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Function {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| ContractError::validation(format!("unknown function {s:?}")))
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// The result of a successful invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct Invoked {
    pub function: Function,
    /// The serialized entity or list.
    pub result: Value,
    /// Number of keys written or deleted by the commit.
    pub committed: usize,
}

/// Dispatches invocations against one world state.
#[derive(Debug)]
pub struct Handler<S: StateStore> {
    store: S,
}

impl<S: StateStore> Handler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run `function` with `args` as one all-or-nothing unit.
    pub fn invoke(&self, ctx: TxContext, function: &str, args: &[String]) -> ContractResult<Invoked> {
        let tx_id = ctx.tx_id.clone();
        let result = function.parse::<Function>().and_then(|function| {
            let mut tx = LedgerTx::begin(&self.store, ctx);
            let result = dispatch(&mut tx, function, args)?;
            // Queries are read-only; their transaction is dropped unapplied.
            let committed = if function.is_query() { 0 } else { tx.commit()? };
            Ok(Invoked {
                function,
                result,
                committed,
            })
        });

        if let Err(err) = &result {
            tracing::warn!(
                tx_id = %tx_id,
                function,
                kind = %err.kind(),
                error = %err,
                "invocation rejected"
            );
        }
        result
    }

    /// Seed accounts in one transaction. Genesis only.
    pub fn provision(&self, ctx: TxContext, seed: &[Account]) -> ContractResult<usize> {
        let mut tx = LedgerTx::begin(&self.store, ctx);
        for account in seed {
            accounts::provision(&mut tx, account)?;
        }
        Ok(tx.commit()?)
    }

    /// Whether any account exists yet.
    pub fn has_accounts(&self, ctx: TxContext) -> ContractResult<bool> {
        let tx = LedgerTx::begin(&self.store, ctx);
        Ok(!accounts::query_account_list(&tx, &[])?.is_empty())
    }
}

fn dispatch(tx: &mut LedgerTx<'_>, function: Function, args: &[String]) -> ContractResult<Value> {
    let name = function.name();
    match function {
        Function::CreateRealEstate => {
            expect_count(name, args, 4)?;
            let caller = required("callerId", &args[0])?;
            let owner = required("ownerId", &args[1])?;
            let total_area = args::non_negative("totalArea", &args[2])?;
            let living_space = args::non_negative("livingSpace", &args[3])?;
            encode(&registry::create_real_estate(
                tx,
                caller,
                owner,
                total_area,
                living_space,
            )?)
        }
        Function::QueryRealEstateList => encode(&registry::query_real_estate_list(tx, args)?),

        Function::CreateSaleOffer => {
            expect_count(name, args, 4)?;
            let asset = required("assetId", &args[0])?;
            let seller = required("sellerId", &args[1])?;
            let price = args::non_negative("price", &args[2])?;
            let window = args::days("saleWindowDays", &args[3])?;
            encode(&sale::create_sale_offer(tx, asset, seller, price, window)?)
        }
        Function::CommitPurchase => {
            expect_count(name, args, 3)?;
            let asset = required("assetId", &args[0])?;
            let seller = required("sellerId", &args[1])?;
            let buyer = required("buyerId", &args[2])?;
            encode(&sale::commit_purchase(tx, asset, seller, buyer)?)
        }
        Function::QuerySaleOffers => encode(&sale::query_sale_offers(tx, args)?),
        Function::QueryPurchaseHistoryByBuyer => {
            expect_count(name, args, 1)?;
            let buyer = required("buyerId", &args[0])?;
            encode(&sale::query_purchase_history_by_buyer(tx, buyer)?)
        }
        Function::FinalizeSale => {
            expect_count(name, args, 4)?;
            let asset = required("assetId", &args[0])?;
            let seller = required("sellerId", &args[1])?;
            // Empty while no buyer has committed.
            let buyer = args[2].as_str();
            let outcome: SaleOutcome = required("outcome", &args[3])?.parse()?;
            encode(&sale::finalize_sale(tx, asset, seller, buyer, outcome)?)
        }

        Function::CreateDonation => {
            expect_count(name, args, 3)?;
            let asset = required("assetId", &args[0])?;
            let donor = required("donorId", &args[1])?;
            let grantee = required("granteeId", &args[2])?;
            encode(&donation::create_donation(tx, asset, donor, grantee)?)
        }
        Function::QueryDonationOffers => encode(&donation::query_donation_offers(tx, args)?),
        Function::QueryDonationsByGrantee => {
            expect_count(name, args, 1)?;
            let grantee = required("granteeId", &args[0])?;
            encode(&donation::query_donations_by_grantee(tx, grantee)?)
        }
        Function::FinalizeDonation => {
            expect_count(name, args, 4)?;
            let asset = required("assetId", &args[0])?;
            let donor = required("donorId", &args[1])?;
            let grantee = required("granteeId", &args[2])?;
            let outcome: DonationOutcome = required("outcome", &args[3])?.parse()?;
            encode(&donation::finalize_donation(tx, asset, donor, grantee, outcome)?)
        }

        Function::QueryAccountList => {
            for id in args {
                required("accountId", id)?;
            }
            encode(&accounts::query_account_list(tx, args)?)
        }
    }
}

fn encode<T: Serialize>(value: &T) -> ContractResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| ContractError::Storage(StoreError::Serialization(e.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use estate_ledger::MemoryStore;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn ctx(secs: i64) -> TxContext {
        TxContext::at_unix(format!("tx-{secs}"), secs, 0).unwrap()
    }

    fn handler() -> Handler<MemoryStore> {
        let handler = Handler::new(MemoryStore::new());
        handler
            .provision(
                ctx(1),
                &[
                    Account::administrator("admin", "Registrar"),
                    Account::member("owner", "Owner", 0.0),
                ],
            )
            .unwrap();
        handler
    }

    #[test]
    fn function_names_round_trip() {
        for function in Function::ALL {
            assert_eq!(function.name().parse::<Function>().unwrap(), function);
        }
        let err = "transferEverything".parse::<Function>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn queries_commit_nothing() {
        let handler = handler();
        for function in Function::ALL.into_iter().filter(Function::is_query) {
            let args = match function {
                Function::QueryPurchaseHistoryByBuyer | Function::QueryDonationsByGrantee => {
                    strings(&["owner"])
                }
                _ => Vec::new(),
            };
            let invoked = handler.invoke(ctx(2), function.name(), &args).unwrap();
            assert_eq!(invoked.committed, 0, "{function}");
            assert!(invoked.result.is_array(), "{function}");
        }
    }

    #[test]
    fn create_real_estate_via_handler() {
        let handler = handler();
        let invoked = handler
            .invoke(
                ctx(1_700_000_000),
                "createRealEstate",
                &strings(&["admin", "owner", "120", "80.5"]),
            )
            .unwrap();
        assert_eq!(invoked.committed, 1);
        assert_eq!(invoked.result["assetId"], "1700000000");
        assert_eq!(invoked.result["livingSpace"], 80.5);
        assert_eq!(invoked.result["encumbered"], false);
    }

    #[test]
    fn argument_errors_are_validation() {
        let handler = handler();
        let cases: [(&str, Vec<String>); 5] = [
            ("createRealEstate", strings(&["admin", "owner", "120"])),
            ("createRealEstate", strings(&["admin", "owner", "big", "80"])),
            ("createSaleOffer", strings(&["1", "owner", "100", "thirty"])),
            ("finalizeSale", strings(&["1", "owner", "", "sold"])),
            ("queryPurchaseHistoryByBuyer", strings(&[""])),
        ];
        for (function, args) in cases {
            let err = handler.invoke(ctx(5), function, &args).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{function} {args:?}");
        }
    }

    #[test]
    fn has_accounts_after_provisioning() {
        let empty = Handler::new(MemoryStore::new());
        assert!(!empty.has_accounts(ctx(1)).unwrap());
        assert!(handler().has_accounts(ctx(1)).unwrap());
    }
}
