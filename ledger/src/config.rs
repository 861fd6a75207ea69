//! # Ledger Configuration & Constants
//!
//! Object type tags, storage names, and node defaults. The type tags are
//! part of every persisted key, so changing one after deployment orphans
//! every record written under the old tag.

// ---------------------------------------------------------------------------
// Object Type Tags
// ---------------------------------------------------------------------------

/// Accounts, keyed by `(account_id)`.
pub const ACCOUNT_KEY: &str = "account-key";

/// Real-estate assets, keyed by `(owner_id, asset_id)`.
pub const REAL_ESTATE_KEY: &str = "real-estate-key";

/// Sale offers, keyed by `(seller_id, asset_id)`.
pub const SALE_OFFER_KEY: &str = "sale-offer-key";

/// Purchase history, keyed by `(buyer_id, created_at_nanos)`.
pub const PURCHASE_RECORD_KEY: &str = "purchase-record-key";

/// Donation offers, keyed by `(donor_id, asset_id, grantee_id)`.
pub const DONATION_OFFER_KEY: &str = "donation-offer-key";

/// Donation history, keyed by `(grantee_id, created_at_nanos)`.
pub const DONATION_RECORD_KEY: &str = "donation-record-key";

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Name of the sled tree that holds the world state.
pub const WORLD_STATE_TREE: &str = "world_state";

/// Width of zero-padded nanosecond timestamps used as key parts.
/// `u64::MAX` has 20 decimal digits.
pub const TIMESTAMP_KEY_WIDTH: usize = 20;

// ---------------------------------------------------------------------------
// Genesis
// ---------------------------------------------------------------------------

/// Display name given to the administrator account in the built-in genesis
/// set. Informational only; authorization is decided by [`crate::Role`].
pub const ADMINISTRATOR_DISPLAY_NAME: &str = "administrator";

// ---------------------------------------------------------------------------
// Node Defaults
// ---------------------------------------------------------------------------

/// Default HTTP port for the invocation API.
pub const DEFAULT_RPC_PORT: u16 = 9841;

/// Default Prometheus metrics port.
pub const DEFAULT_METRICS_PORT: u16 = 9842;

/// Ledger version string reported by the node.
pub const LEDGER_VERSION: &str = "0.1.0";

/// All object type tags, in the order they are documented above.
pub const OBJECT_TYPES: [&str; 6] = [
    ACCOUNT_KEY,
    REAL_ESTATE_KEY,
    SALE_OFFER_KEY,
    PURCHASE_RECORD_KEY,
    DONATION_OFFER_KEY,
    DONATION_RECORD_KEY,
];
