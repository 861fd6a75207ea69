//! # Asset Registry
//!
//! Real-estate records keyed by `(ownerId, assetId)`. Because the owner is
//! part of the key, a change of ownership is a re-key: the record is written
//! under the new owner and a fresh asset id, and the old key is deleted in
//! the same transaction (see [`transfer`]).

use estate_ledger::config::REAL_ESTATE_KEY;
use estate_ledger::LedgerTx;
use serde::{Deserialize, Serialize};

use crate::accounts;
use crate::error::{ContractError, ContractResult};

/// A registered real-estate asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealEstate {
    pub asset_id: String,
    pub owner_id: String,
    /// Set while a sale or donation offer on this asset is unfinished.
    pub encumbered: bool,
    pub total_area: f64,
    pub living_space: f64,
}

/// Register a new asset for `owner_id`. Only an administrator may call this,
/// and never on their own behalf.
///
/// The asset id is the invocation timestamp in whole seconds.
pub fn create_real_estate(
    tx: &mut LedgerTx<'_>,
    caller_id: &str,
    owner_id: &str,
    total_area: f64,
    living_space: f64,
) -> ContractResult<RealEstate> {
    if caller_id == owner_id {
        return Err(ContractError::validation(
            "the registering administrator cannot be the owner",
        ));
    }

    let caller = accounts::resolve(tx, caller_id)?;
    if !caller.is_administrator() {
        return Err(ContractError::Unauthorized(format!(
            "account {caller_id} has role {}, only an administrator may register assets",
            caller.role
        )));
    }
    accounts::resolve(tx, owner_id)?;

    let asset_id = tx.context().second_id();
    if find(tx, owner_id, &asset_id)?.is_some() {
        return Err(ContractError::state_conflict(
            "real estate",
            format!("already registered as {owner_id}/{asset_id}"),
            "a free asset id",
        ));
    }

    let asset = RealEstate {
        asset_id,
        owner_id: owner_id.to_string(),
        encumbered: false,
        total_area,
        living_space,
    };
    store(tx, &asset)?;

    tracing::info!(
        asset_id = %asset.asset_id,
        owner_id = %asset.owner_id,
        "real estate registered"
    );
    Ok(asset)
}

/// `queryRealEstateList`: every asset whose key starts with `filter`.
pub fn query_real_estate_list(
    tx: &LedgerTx<'_>,
    filter: &[String],
) -> ContractResult<Vec<RealEstate>> {
    Ok(tx.scan_by_prefix(REAL_ESTATE_KEY, filter)?)
}

pub(crate) fn find(
    tx: &LedgerTx<'_>,
    owner_id: &str,
    asset_id: &str,
) -> ContractResult<Option<RealEstate>> {
    Ok(tx.get(REAL_ESTATE_KEY, &[owner_id, asset_id])?)
}

/// The asset `(owner_id, asset_id)`, or `NotFound`.
pub(crate) fn load(tx: &LedgerTx<'_>, owner_id: &str, asset_id: &str) -> ContractResult<RealEstate> {
    find(tx, owner_id, asset_id)?
        .ok_or_else(|| ContractError::not_found("real estate", &[owner_id, asset_id]))
}

/// The asset, provided no transfer is already in progress on it.
pub(crate) fn load_unencumbered(
    tx: &LedgerTx<'_>,
    owner_id: &str,
    asset_id: &str,
) -> ContractResult<RealEstate> {
    let asset = load(tx, owner_id, asset_id)?;
    if asset.encumbered {
        return Err(ContractError::state_conflict(
            "real estate",
            "encumbered",
            "unencumbered",
        ));
    }
    Ok(asset)
}

pub(crate) fn store(tx: &mut LedgerTx<'_>, asset: &RealEstate) -> ContractResult<()> {
    tx.put(
        REAL_ESTATE_KEY,
        &[asset.owner_id.as_str(), asset.asset_id.as_str()],
        asset,
    )?;
    Ok(())
}

pub(crate) fn set_encumbered(
    tx: &mut LedgerTx<'_>,
    asset: &mut RealEstate,
    encumbered: bool,
) -> ContractResult<()> {
    asset.encumbered = encumbered;
    store(tx, asset)
}

/// Re-key `asset` to `new_owner` under a fresh id taken from the invocation
/// timestamp, clearing the encumbrance and deleting the old key.
pub(crate) fn transfer(
    tx: &mut LedgerTx<'_>,
    asset: RealEstate,
    new_owner: &str,
) -> ContractResult<RealEstate> {
    let new_id = tx.context().nano_id()?;
    let moved = RealEstate {
        asset_id: new_id,
        owner_id: new_owner.to_string(),
        encumbered: false,
        ..asset.clone()
    };
    if find(tx, &moved.owner_id, &moved.asset_id)?.is_some() {
        return Err(ContractError::state_conflict(
            "real estate",
            format!("already registered as {}/{}", moved.owner_id, moved.asset_id),
            "a free asset id",
        ));
    }

    store(tx, &moved)?;
    tx.delete(REAL_ESTATE_KEY, &[asset.owner_id.as_str(), asset.asset_id.as_str()])?;

    tracing::info!(
        from = %format!("{}/{}", asset.owner_id, asset.asset_id),
        to = %format!("{}/{}", moved.owner_id, moved.asset_id),
        "real estate re-keyed"
    );
    Ok(moved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use estate_ledger::{Account, MemoryStore, TxContext};

    fn ctx(secs: i64) -> TxContext {
        TxContext::at_unix(format!("tx-{secs}"), secs, 500).unwrap()
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let mut tx = LedgerTx::begin(&store, ctx(1));
        accounts::provision(&mut tx, &Account::administrator("admin", "Registrar")).unwrap();
        accounts::provision(&mut tx, &Account::member("owner", "Owner", 0.0)).unwrap();
        accounts::provision(&mut tx, &Account::member("other", "Other", 0.0)).unwrap();
        tx.commit().unwrap();
        store
    }

    #[test]
    fn administrator_registers_asset() {
        let store = seeded();
        let mut tx = LedgerTx::begin(&store, ctx(1_700_000_000));
        let asset = create_real_estate(&mut tx, "admin", "owner", 120.0, 80.0).unwrap();
        assert_eq!(asset.asset_id, "1700000000");
        assert!(!asset.encumbered);
        tx.commit().unwrap();

        let tx = LedgerTx::begin(&store, ctx(1_700_000_001));
        let listed = query_real_estate_list(&tx, &["owner".into()]).unwrap();
        assert_eq!(listed, vec![asset]);
    }

    #[test]
    fn member_cannot_register() {
        let store = seeded();
        let mut tx = LedgerTx::begin(&store, ctx(1_700_000_000));
        let err = create_real_estate(&mut tx, "other", "owner", 1.0, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn self_registration_rejected() {
        let store = seeded();
        let mut tx = LedgerTx::begin(&store, ctx(1_700_000_000));
        let err = create_real_estate(&mut tx, "admin", "admin", 1.0, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn unknown_owner_not_found() {
        let store = seeded();
        let mut tx = LedgerTx::begin(&store, ctx(1_700_000_000));
        let err = create_real_estate(&mut tx, "admin", "ghost", 1.0, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn same_second_collision_rejected() {
        let store = seeded();
        let mut tx = LedgerTx::begin(&store, ctx(1_700_000_000));
        create_real_estate(&mut tx, "admin", "owner", 1.0, 1.0).unwrap();
        let err = create_real_estate(&mut tx, "admin", "owner", 2.0, 2.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[test]
    fn transfer_rekeys_and_deletes_old_key() {
        let store = seeded();
        let mut tx = LedgerTx::begin(&store, ctx(1_700_000_000));
        let mut asset = create_real_estate(&mut tx, "admin", "owner", 90.0, 60.0).unwrap();
        set_encumbered(&mut tx, &mut asset, true).unwrap();
        tx.commit().unwrap();

        let mut tx = LedgerTx::begin(&store, ctx(1_700_000_100));
        let asset = load(&tx, "owner", "1700000000").unwrap();
        let moved = transfer(&mut tx, asset, "other").unwrap();
        assert_eq!(moved.asset_id, "1700000100000000500");
        assert_eq!(moved.owner_id, "other");
        assert!(!moved.encumbered);
        assert_eq!(moved.total_area, 90.0);
        tx.commit().unwrap();

        let tx = LedgerTx::begin(&store, ctx(1_700_000_200));
        assert!(find(&tx, "owner", "1700000000").unwrap().is_none());
        assert_eq!(query_real_estate_list(&tx, &[]).unwrap(), vec![moved]);
    }

    #[test]
    fn encumbered_asset_refused() {
        let store = seeded();
        let mut tx = LedgerTx::begin(&store, ctx(1_700_000_000));
        let mut asset = create_real_estate(&mut tx, "admin", "owner", 1.0, 1.0).unwrap();
        set_encumbered(&mut tx, &mut asset, true).unwrap();
        let err = load_unencumbered(&tx, "owner", &asset.asset_id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }
}
