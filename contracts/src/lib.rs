//! # Estate Contracts
//!
//! The transaction logic of the estate ledger. Every operation runs inside a
//! staged [`estate_ledger::LedgerTx`] and either commits as a whole or leaves
//! the world state untouched:
//!
//! - **Accounts**: balance lookup, credit and debit on provisioned accounts.
//! - **Registry**: administrator-only registration and listing of real
//!   estate, and the re-key that moves an asset to a new owner.
//! - **Sale**: offer, buyer commitment with payment, and finalization with
//!   settlement or refund.
//! - **Donation**: offer to a named grantee and finalization, no payment.
//!
//! ## Design Principles
//!
//! 1. State transitions are explicit: status enums matched exhaustively, not
//!    strings.
//! 2. Roles are typed. Authorization matches on [`estate_ledger::Role`],
//!    never on a display name.
//! 3. Identifiers and timestamps come from the invocation context, so every
//!    replica derives the same keys.
//! 4. An error anywhere in an operation discards everything it staged.

pub mod accounts;
pub mod args;
pub mod donation;
pub mod error;
pub mod handler;
pub mod registry;
pub mod sale;

pub use error::{ContractError, ContractResult, ErrorKind};
pub use handler::{Function, Handler, Invoked};
