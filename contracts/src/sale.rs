//! # Sale Workflow
//!
//! Sells an asset for payment. The lifecycle is:
//!
//! 1. **Offer**: the owner lists the asset at a price. The asset becomes
//!    encumbered so no second offer can be opened on it.
//! 2. **Commit**: a buyer with enough balance commits. The price is debited
//!    from the buyer immediately and a [`PurchaseRecord`] is appended to the
//!    buyer's history.
//! 3. **Finalize**: the offer ends as `completed`, `cancelled` or `expired`.
//!    Completion pays the seller and re-keys the asset to the buyer;
//!    cancellation or expiry after a commit refunds the buyer.
//!
//! ```text
//! offered ──commit──▶ inDelivery ──▶ completed | cancelled | expired
//!    └───────────────────────────▶ cancelled | expired
//! ```
//!
//! Terminal offers are never deleted. A later offer on the same asset by the
//! same seller replaces the terminal one under the same key.

use chrono::{DateTime, Utc};
use estate_ledger::config::{PURCHASE_RECORD_KEY, SALE_OFFER_KEY};
use estate_ledger::context::history_key_part;
use estate_ledger::LedgerTx;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::accounts;
use crate::args;
use crate::error::{ContractError, ContractResult};
use crate::registry;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Where a sale offer is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaleStatus {
    /// Listed, no buyer yet.
    Offered,
    /// A buyer has committed and paid into the sale.
    InDelivery,
    Completed,
    Cancelled,
    Expired,
}

impl SaleStatus {
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Offered | Self::InDelivery => false,
            Self::Completed | Self::Cancelled | Self::Expired => true,
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offered => write!(f, "offered"),
            Self::InDelivery => write!(f, "inDelivery"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// The terminal status requested by `finalizeSale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaleOutcome {
    Completed,
    Cancelled,
    Expired,
}

impl From<SaleOutcome> for SaleStatus {
    fn from(outcome: SaleOutcome) -> Self {
        match outcome {
            SaleOutcome::Completed => Self::Completed,
            SaleOutcome::Cancelled => Self::Cancelled,
            SaleOutcome::Expired => Self::Expired,
        }
    }
}

impl FromStr for SaleOutcome {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "expired" => Ok(Self::Expired),
            other => Err(ContractError::validation(format!(
                "unknown sale outcome {other:?}, expected completed, cancelled or expired"
            ))),
        }
    }
}

/// A listing of one asset, keyed by `(sellerId, assetId)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleOffer {
    pub asset_id: String,
    pub seller_id: String,
    /// Set when a buyer commits.
    pub buyer_id: Option<String>,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub sale_window_days: u32,
    pub status: SaleStatus,
    /// The asset's id under the buyer once the sale completed.
    #[serde(default)]
    pub transferred_asset_id: Option<String>,
}

/// The terms of a sale as they stood when the buyer committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleSnapshot {
    pub asset_id: String,
    pub seller_id: String,
    pub buyer_id: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub sale_window_days: u32,
}

/// A buyer's history entry, keyed by `(buyerId, createdAt nanos)`.
///
/// `offer` is fixed at creation. Only `status` and `transferred_asset_id`
/// follow the offer as it finalizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRecord {
    pub buyer_id: String,
    pub created_at: DateTime<Utc>,
    pub offer: SaleSnapshot,
    pub status: SaleStatus,
    #[serde(default)]
    pub transferred_asset_id: Option<String>,
}

/// What `finalizeSale` hands back: the offer if no buyer had committed,
/// otherwise the buyer's updated history record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SaleFinalized {
    Offer(SaleOffer),
    Purchase(PurchaseRecord),
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// `createSaleOffer`: list an unencumbered asset for sale.
pub fn create_sale_offer(
    tx: &mut LedgerTx<'_>,
    asset_id: &str,
    seller_id: &str,
    price: f64,
    sale_window_days: u32,
) -> ContractResult<SaleOffer> {
    let mut asset = registry::load_unencumbered(tx, seller_id, asset_id)?;

    let offer = SaleOffer {
        asset_id: asset_id.to_string(),
        seller_id: seller_id.to_string(),
        buyer_id: None,
        price,
        created_at: tx.context().timestamp,
        sale_window_days,
        status: SaleStatus::Offered,
        transferred_asset_id: None,
    };

    registry::set_encumbered(tx, &mut asset, true)?;
    store_offer(tx, &offer)?;

    tracing::info!(asset_id, seller_id, price, "sale offered");
    Ok(offer)
}

/// `commitPurchase`: the buyer pays into an `offered` sale.
///
/// # Errors
///
/// Fails with `Validation` if seller and buyer are the same account,
/// `StateConflict` unless the offer is `offered`, `Unauthorized` for an
/// administrator buyer, and `InsufficientFunds` if the buyer cannot cover
/// the price. Nothing is staged in any of these cases.
pub fn commit_purchase(
    tx: &mut LedgerTx<'_>,
    asset_id: &str,
    seller_id: &str,
    buyer_id: &str,
) -> ContractResult<PurchaseRecord> {
    args::distinct_parties(("seller", seller_id), ("buyer", buyer_id))?;

    registry::load(tx, seller_id, asset_id)?;
    let mut offer = load_offer(tx, seller_id, asset_id)?;
    if offer.status != SaleStatus::Offered {
        return Err(ContractError::state_conflict(
            "sale offer",
            offer.status,
            SaleStatus::Offered.to_string(),
        ));
    }

    let mut buyer = accounts::resolve(tx, buyer_id)?;
    if buyer.is_administrator() {
        return Err(ContractError::Unauthorized(format!(
            "administrator {buyer_id} cannot buy real estate"
        )));
    }

    let history_key = tx.context().history_key_part()?;
    if tx
        .get::<_, PurchaseRecord>(PURCHASE_RECORD_KEY, &[buyer_id, history_key.as_str()])?
        .is_some()
    {
        return Err(ContractError::state_conflict(
            "purchase record",
            format!("already recorded at {buyer_id}/{history_key}"),
            "a free history slot",
        ));
    }

    accounts::debit(tx, &mut buyer, offer.price)?;

    offer.buyer_id = Some(buyer_id.to_string());
    offer.status = SaleStatus::InDelivery;
    store_offer(tx, &offer)?;

    let record = PurchaseRecord {
        buyer_id: buyer_id.to_string(),
        created_at: tx.context().timestamp,
        offer: SaleSnapshot {
            asset_id: offer.asset_id.clone(),
            seller_id: offer.seller_id.clone(),
            buyer_id: buyer_id.to_string(),
            price: offer.price,
            created_at: offer.created_at,
            sale_window_days: offer.sale_window_days,
        },
        status: offer.status,
        transferred_asset_id: None,
    };
    tx.put(PURCHASE_RECORD_KEY, &[buyer_id, history_key.as_str()], &record)?;

    tracing::info!(asset_id, seller_id, buyer_id, price = offer.price, "purchase committed");
    Ok(record)
}

/// `finalizeSale`: move the offer to a terminal status.
///
/// From `offered` only `cancelled` and `expired` are allowed, `buyer_id`
/// may be empty, and no money moves. From `inDelivery`, `buyer_id` must be
/// the committed buyer: `completed` pays the seller and re-keys the asset to
/// the buyer, the other outcomes refund the buyer.
pub fn finalize_sale(
    tx: &mut LedgerTx<'_>,
    asset_id: &str,
    seller_id: &str,
    buyer_id: &str,
    outcome: SaleOutcome,
) -> ContractResult<SaleFinalized> {
    args::distinct_parties(("seller", seller_id), ("buyer", buyer_id))?;

    let mut offer = load_offer(tx, seller_id, asset_id)?;

    match (offer.status, outcome) {
        (SaleStatus::Offered, SaleOutcome::Completed) => Err(ContractError::state_conflict(
            "sale offer",
            offer.status,
            SaleStatus::InDelivery.to_string(),
        )),

        (SaleStatus::Offered, SaleOutcome::Cancelled | SaleOutcome::Expired) => {
            let mut asset = registry::load(tx, seller_id, asset_id)?;
            registry::set_encumbered(tx, &mut asset, false)?;
            offer.status = outcome.into();
            store_offer(tx, &offer)?;

            tracing::info!(asset_id, seller_id, status = %offer.status, "sale withdrawn");
            Ok(SaleFinalized::Offer(offer))
        }

        (SaleStatus::InDelivery, _) => {
            let committed = offer.buyer_id.clone().unwrap_or_default();
            if committed != buyer_id {
                return Err(ContractError::validation(format!(
                    "buyer {buyer_id:?} is not the committed buyer of this sale"
                )));
            }
            let mut asset = registry::load(tx, seller_id, asset_id)?;
            let mut record = find_open_record(tx, asset_id, seller_id, buyer_id)?;

            match outcome {
                SaleOutcome::Completed => {
                    let mut seller = accounts::resolve(tx, seller_id)?;
                    accounts::credit(tx, &mut seller, offer.price)?;
                    let moved = registry::transfer(tx, asset, buyer_id)?;
                    offer.transferred_asset_id = Some(moved.asset_id.clone());
                    record.transferred_asset_id = Some(moved.asset_id);
                }
                SaleOutcome::Cancelled | SaleOutcome::Expired => {
                    let mut buyer = accounts::resolve(tx, buyer_id)?;
                    accounts::credit(tx, &mut buyer, offer.price)?;
                    registry::set_encumbered(tx, &mut asset, false)?;
                }
            }

            offer.status = outcome.into();
            record.status = offer.status;
            store_offer(tx, &offer)?;
            store_record(tx, &record)?;

            tracing::info!(
                asset_id,
                seller_id,
                buyer_id,
                status = %offer.status,
                "sale finalized"
            );
            Ok(SaleFinalized::Purchase(record))
        }

        (SaleStatus::Completed | SaleStatus::Cancelled | SaleStatus::Expired, _) => {
            Err(ContractError::state_conflict(
                "sale offer",
                offer.status,
                "offered or inDelivery",
            ))
        }
    }
}

/// `querySaleOffers`: every offer whose key starts with `filter`.
pub fn query_sale_offers(tx: &LedgerTx<'_>, filter: &[String]) -> ContractResult<Vec<SaleOffer>> {
    Ok(tx.scan_by_prefix(SALE_OFFER_KEY, filter)?)
}

/// `queryPurchaseHistoryByBuyer`: the buyer's history, oldest first.
pub fn query_purchase_history_by_buyer(
    tx: &LedgerTx<'_>,
    buyer_id: &str,
) -> ContractResult<Vec<PurchaseRecord>> {
    Ok(tx.scan_by_prefix(PURCHASE_RECORD_KEY, &[buyer_id])?)
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn load_offer(tx: &LedgerTx<'_>, seller_id: &str, asset_id: &str) -> ContractResult<SaleOffer> {
    tx.get(SALE_OFFER_KEY, &[seller_id, asset_id])?
        .ok_or_else(|| ContractError::not_found("sale offer", &[seller_id, asset_id]))
}

fn store_offer(tx: &mut LedgerTx<'_>, offer: &SaleOffer) -> ContractResult<()> {
    tx.put(
        SALE_OFFER_KEY,
        &[offer.seller_id.as_str(), offer.asset_id.as_str()],
        offer,
    )?;
    Ok(())
}

fn store_record(tx: &mut LedgerTx<'_>, record: &PurchaseRecord) -> ContractResult<()> {
    let slot = history_key_part(&record.created_at)?;
    tx.put(
        PURCHASE_RECORD_KEY,
        &[record.buyer_id.as_str(), slot.as_str()],
        record,
    )?;
    Ok(())
}

/// The buyer's still-open record for this asset and seller.
fn find_open_record(
    tx: &LedgerTx<'_>,
    asset_id: &str,
    seller_id: &str,
    buyer_id: &str,
) -> ContractResult<PurchaseRecord> {
    query_purchase_history_by_buyer(tx, buyer_id)?
        .into_iter()
        .find(|r| {
            r.offer.asset_id == asset_id && r.offer.seller_id == seller_id && !r.status.is_terminal()
        })
        .ok_or_else(|| ContractError::not_found("purchase record", &[buyer_id, asset_id]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn outcomes_parse() {
        assert_eq!("completed".parse::<SaleOutcome>().unwrap(), SaleOutcome::Completed);
        assert_eq!("expired".parse::<SaleOutcome>().unwrap(), SaleOutcome::Expired);
        let err = "inDelivery".parse::<SaleOutcome>().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!("Completed".parse::<SaleOutcome>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!SaleStatus::Offered.is_terminal());
        assert!(!SaleStatus::InDelivery.is_terminal());
        for outcome in [SaleOutcome::Completed, SaleOutcome::Cancelled, SaleOutcome::Expired] {
            assert!(SaleStatus::from(outcome).is_terminal());
        }
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_string(&SaleStatus::InDelivery).unwrap(), "\"inDelivery\"");
        assert_eq!(SaleStatus::InDelivery.to_string(), "inDelivery");
    }

    #[test]
    fn offer_without_transfer_field_still_parses() {
        let json = r#"{
            "assetId": "1700000000",
            "sellerId": "s",
            "buyerId": null,
            "price": 100.0,
            "createdAt": "2023-11-14T22:13:20Z",
            "saleWindowDays": 30,
            "status": "offered"
        }"#;
        let offer: SaleOffer = serde_json::from_str(json).unwrap();
        assert_eq!(offer.status, SaleStatus::Offered);
        assert!(offer.transferred_asset_id.is_none());
    }
}
