//! # Donation Workflow
//!
//! Gives an asset away. Structurally the sale workflow without the payment
//! leg: the grantee is named when the offer is created, so the history
//! record is written immediately and there is no delivery stage.
//!
//! ```text
//! offered ──▶ completed | cancelled
//! ```
//!
//! Offers are keyed by `(donorId, assetId, granteeId)`; grantee history by
//! `(granteeId, createdAt nanos)`.

use chrono::{DateTime, Utc};
use estate_ledger::config::{DONATION_OFFER_KEY, DONATION_RECORD_KEY};
use estate_ledger::context::history_key_part;
use estate_ledger::LedgerTx;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::accounts;
use crate::args;
use crate::error::{ContractError, ContractResult};
use crate::registry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DonationStatus {
    Offered,
    Completed,
    Cancelled,
}

impl DonationStatus {
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Offered => false,
            Self::Completed | Self::Cancelled => true,
        }
    }
}

impl fmt::Display for DonationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offered => write!(f, "offered"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// The terminal status requested by `finalizeDonation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonationOutcome {
    Completed,
    Cancelled,
}

impl From<DonationOutcome> for DonationStatus {
    fn from(outcome: DonationOutcome) -> Self {
        match outcome {
            DonationOutcome::Completed => Self::Completed,
            DonationOutcome::Cancelled => Self::Cancelled,
        }
    }
}

impl FromStr for DonationOutcome {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(ContractError::validation(format!(
                "unknown donation outcome {other:?}, expected completed or cancelled"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationOffer {
    pub asset_id: String,
    pub donor_id: String,
    pub grantee_id: String,
    pub created_at: DateTime<Utc>,
    pub status: DonationStatus,
    #[serde(default)]
    pub transferred_asset_id: Option<String>,
}

/// The donation as it stood when it was offered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationSnapshot {
    pub asset_id: String,
    pub donor_id: String,
    pub grantee_id: String,
    pub created_at: DateTime<Utc>,
}

/// A grantee's history entry. `offer` never changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRecord {
    pub grantee_id: String,
    pub created_at: DateTime<Utc>,
    pub offer: DonationSnapshot,
    pub status: DonationStatus,
    #[serde(default)]
    pub transferred_asset_id: Option<String>,
}

/// `createDonation`: offer an unencumbered asset to a grantee.
pub fn create_donation(
    tx: &mut LedgerTx<'_>,
    asset_id: &str,
    donor_id: &str,
    grantee_id: &str,
) -> ContractResult<DonationRecord> {
    args::distinct_parties(("donor", donor_id), ("grantee", grantee_id))?;

    let mut asset = registry::load_unencumbered(tx, donor_id, asset_id)?;
    let grantee = accounts::resolve(tx, grantee_id)?;
    if grantee.is_administrator() {
        return Err(ContractError::Unauthorized(format!(
            "administrator {grantee_id} cannot receive a donation"
        )));
    }

    let history_key = tx.context().history_key_part()?;
    if tx
        .get::<_, DonationRecord>(DONATION_RECORD_KEY, &[grantee_id, history_key.as_str()])?
        .is_some()
    {
        return Err(ContractError::state_conflict(
            "donation record",
            format!("already recorded at {grantee_id}/{history_key}"),
            "a free history slot",
        ));
    }

    let created_at = tx.context().timestamp;
    let offer = DonationOffer {
        asset_id: asset_id.to_string(),
        donor_id: donor_id.to_string(),
        grantee_id: grantee_id.to_string(),
        created_at,
        status: DonationStatus::Offered,
        transferred_asset_id: None,
    };
    let record = DonationRecord {
        grantee_id: grantee_id.to_string(),
        created_at,
        offer: DonationSnapshot {
            asset_id: offer.asset_id.clone(),
            donor_id: offer.donor_id.clone(),
            grantee_id: offer.grantee_id.clone(),
            created_at,
        },
        status: DonationStatus::Offered,
        transferred_asset_id: None,
    };

    registry::set_encumbered(tx, &mut asset, true)?;
    store_offer(tx, &offer)?;
    tx.put(DONATION_RECORD_KEY, &[grantee_id, history_key.as_str()], &record)?;

    tracing::info!(asset_id, donor_id, grantee_id, "donation offered");
    Ok(record)
}

/// `finalizeDonation`: complete or cancel an `offered` donation.
///
/// Completion re-keys the asset to the grantee under a fresh id; cancellation
/// only lifts the encumbrance.
pub fn finalize_donation(
    tx: &mut LedgerTx<'_>,
    asset_id: &str,
    donor_id: &str,
    grantee_id: &str,
    outcome: DonationOutcome,
) -> ContractResult<DonationRecord> {
    args::distinct_parties(("donor", donor_id), ("grantee", grantee_id))?;

    let mut offer = load_offer(tx, donor_id, asset_id, grantee_id)?;
    if offer.status != DonationStatus::Offered {
        return Err(ContractError::state_conflict(
            "donation offer",
            offer.status,
            DonationStatus::Offered.to_string(),
        ));
    }

    let mut asset = registry::load(tx, donor_id, asset_id)?;
    let mut record = find_open_record(tx, asset_id, donor_id, grantee_id)?;

    match outcome {
        DonationOutcome::Completed => {
            let moved = registry::transfer(tx, asset, grantee_id)?;
            offer.transferred_asset_id = Some(moved.asset_id.clone());
            record.transferred_asset_id = Some(moved.asset_id);
        }
        DonationOutcome::Cancelled => {
            registry::set_encumbered(tx, &mut asset, false)?;
        }
    }

    offer.status = outcome.into();
    record.status = offer.status;
    store_offer(tx, &offer)?;
    store_record(tx, &record)?;

    tracing::info!(
        asset_id,
        donor_id,
        grantee_id,
        status = %offer.status,
        "donation finalized"
    );
    Ok(record)
}

/// `queryDonationOffers`: every offer whose key starts with `filter`.
pub fn query_donation_offers(
    tx: &LedgerTx<'_>,
    filter: &[String],
) -> ContractResult<Vec<DonationOffer>> {
    Ok(tx.scan_by_prefix(DONATION_OFFER_KEY, filter)?)
}

/// `queryDonationsByGrantee`: the grantee's history, oldest first.
pub fn query_donations_by_grantee(
    tx: &LedgerTx<'_>,
    grantee_id: &str,
) -> ContractResult<Vec<DonationRecord>> {
    Ok(tx.scan_by_prefix(DONATION_RECORD_KEY, &[grantee_id])?)
}

fn load_offer(
    tx: &LedgerTx<'_>,
    donor_id: &str,
    asset_id: &str,
    grantee_id: &str,
) -> ContractResult<DonationOffer> {
    tx.get(DONATION_OFFER_KEY, &[donor_id, asset_id, grantee_id])?
        .ok_or_else(|| {
            ContractError::not_found("donation offer", &[donor_id, asset_id, grantee_id])
        })
}

fn store_offer(tx: &mut LedgerTx<'_>, offer: &DonationOffer) -> ContractResult<()> {
    tx.put(
        DONATION_OFFER_KEY,
        &[
            offer.donor_id.as_str(),
            offer.asset_id.as_str(),
            offer.grantee_id.as_str(),
        ],
        offer,
    )?;
    Ok(())
}

fn store_record(tx: &mut LedgerTx<'_>, record: &DonationRecord) -> ContractResult<()> {
    let slot = history_key_part(&record.created_at)?;
    tx.put(
        DONATION_RECORD_KEY,
        &[record.grantee_id.as_str(), slot.as_str()],
        record,
    )?;
    Ok(())
}

fn find_open_record(
    tx: &LedgerTx<'_>,
    asset_id: &str,
    donor_id: &str,
    grantee_id: &str,
) -> ContractResult<DonationRecord> {
    query_donations_by_grantee(tx, grantee_id)?
        .into_iter()
        .find(|r| {
            r.offer.asset_id == asset_id && r.offer.donor_id == donor_id && !r.status.is_terminal()
        })
        .ok_or_else(|| ContractError::not_found("donation record", &[grantee_id, asset_id]))
}
