//! Shared protocol core for the Bastion contract suite.
//!
//! This crate provides:
//! - [`OperationError`] — standardised error codes for all contracts.
//! - [`registry`] — the per-instance operation catalog and phase→role table.
//! - [`roles`] — owner/broadcaster/recovery resolution and signing keys.
//! - [`record`] — the durable transaction record store.
//! - [`engine`] — the multi-phase request/approve/cancel state machine.
//! - [`meta_tx`] — off-chain-signed meta-transaction construction and
//!   verification.
//! - [`nonce`] — per-signer replay-prevention counters.
//!
//! Contract-specific errors can extend the range starting at code **100** and
//! above, ensuring no collisions with the common set.

#![no_std]
#![allow(clippy::arithmetic_side_effects)]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

use soroban_sdk::contracterror;

// ── Modules ──────────────────────────────────────────────────────────────────

pub mod engine;
pub mod meta_tx;
pub mod nonce;
pub mod record;
pub mod registry;
pub mod roles;

pub use meta_tx::{MetaTransaction, MetaTxAction, MetaTxPayload, NewOperation, UnsignedMetaTx};
pub use record::{TxRecord, TxStatus};
pub use registry::{OperationPhase, OperationType, PhaseRoles};
pub use roles::{Role, RoleChangeOptions, TimeLockChangeOptions};

// ── Shared error enum ────────────────────────────────────────────────────────

/// Standardised error codes shared by every Bastion contract.
///
/// # Code ranges
/// | Range   | Purpose                        |
/// |---------|--------------------------------|
/// | 1 – 9   | Lifecycle / initialisation     |
/// | 10 – 19 | Authentication & authorisation |
/// | 20 – 29 | Resource not found             |
/// | 30 – 39 | Validation / input             |
/// | 40 – 49 | Record state & timing          |
/// | 50 – 59 | Meta-transaction               |
/// | 100+    | Reserved for contract-specific |
#[contracterror]
#[derive(Clone, Debug, Eq, PartialEq, Copy)]
#[repr(u32)]
pub enum OperationError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    /// Caller does not hold the role the registry requires for this phase.
    UnauthorizedCaller = 10,
    /// Operation type is not in this instance's registry.
    UnknownOperationType = 11,
    TxNotFound = 20,
    InvalidInput = 30,
    /// Nonce does not match the signer's current value (replay or out-of-order).
    InvalidNonce = 31,
    /// Nonce counter would exceed u64::MAX.
    NonceOverflow = 32,
    /// Record is not in the status the requested transition needs.
    InvalidState = 40,
    /// Approval attempted before the record's release time.
    TimeLockNotElapsed = 41,
    /// Cancellation attempted inside the operation type's guard window.
    CancelWindowActive = 42,
    /// Delegate-call execution requested while the toggle is off.
    DelegateCallDisabled = 43,
    /// Meta-transaction deadline has passed.
    ExpiredDeadline = 50,
    /// Effective gas price exceeds the signed ceiling.
    GasPriceTooHigh = 51,
    /// Recovered signer does not match the required signing key.
    InvalidSignature = 52,
    /// Meta-transaction action tag does not match the entry point invoked.
    HandlerMismatch = 53,
    /// The approved operation's own effect failed to apply.
    UnderlyingActionFailed = 54,
}
