//! The Multi-Phase Operation Engine.
//!
//! Enforces the request → time-delay → approve/cancel state machine over
//! [`TxRecord`]s:
//!
//! ```text
//!           request()                 approve()  [approve role, now >= release_time]
//! (none) ──────────────▶ Pending ───────────────────────────────────────▶ Completed
//!                           │
//!                           │ cancel() [cancel role, past the operation
//!                           │           type's guard window]
//!                           ▼
//!                        Cancelled
//! ```
//!
//! The engine validates and transitions records; the owning contract
//! dispatches each completed record's underlying action in the same call,
//! so an action failure reverts the transition and the record stays
//! `Pending` on-chain.

use soroban_sdk::{symbol_short, Address, Bytes, Env, Symbol};

use crate::record::{self, TxRecord, TxStatus};
use crate::registry;
use crate::roles;
use crate::OperationError;

// ── Time-lock configuration ──────────────────────────────────────────────────

const TIMELOCK: Symbol = symbol_short!("TIMELOCK");

/// Shortest accepted time-lock period: 1 hour.
pub const MIN_TIME_LOCK_SECS: u64 = 3_600;
/// Longest accepted time-lock period: 90 days.
pub const MAX_TIME_LOCK_SECS: u64 = 7_776_000;

pub fn validate_time_lock(period_secs: u64) -> Result<(), OperationError> {
    if !(MIN_TIME_LOCK_SECS..=MAX_TIME_LOCK_SECS).contains(&period_secs) {
        return Err(OperationError::InvalidInput);
    }
    Ok(())
}

pub fn set_time_lock(env: &Env, period_secs: u64) -> Result<(), OperationError> {
    validate_time_lock(period_secs)?;
    env.storage().instance().set(&TIMELOCK, &period_secs);
    Ok(())
}

pub fn time_lock(env: &Env) -> Result<u64, OperationError> {
    env.storage()
        .instance()
        .get(&TIMELOCK)
        .ok_or(OperationError::NotInitialized)
}

// ── Two-phase path ───────────────────────────────────────────────────────────

/// Create a pending record for a registered operation type.
///
/// The caller must hold the request-phase role; the release time is
/// `now + time_lock`.
pub fn request(
    env: &Env,
    caller: &Address,
    operation: &Symbol,
    target: &Address,
    value: i128,
    execution_options: Bytes,
) -> Result<TxRecord, OperationError> {
    let entry =
        registry::lookup(env, operation).ok_or(OperationError::UnknownOperationType)?;
    roles::require_role(env, caller, &entry.roles.request)?;

    let now = env.ledger().timestamp();
    let record = TxRecord {
        tx_id: record::next_id(env),
        requester: caller.clone(),
        target: target.clone(),
        value,
        operation_type: operation.clone(),
        execution_options,
        requested_at: now,
        release_time: now.saturating_add(time_lock(env)?),
        status: TxStatus::Pending,
    };
    record::store(env, &record);
    Ok(record)
}

/// Approve a pending record once its time-lock has elapsed.
///
/// Approval exactly at `release_time` is permitted. The returned record is
/// already `Completed`; the caller must dispatch its underlying action
/// before the call returns.
pub fn approve(env: &Env, caller: &Address, tx_id: u64) -> Result<TxRecord, OperationError> {
    let mut record = record::load(env, tx_id).ok_or(OperationError::TxNotFound)?;
    if record.status != TxStatus::Pending {
        return Err(OperationError::InvalidState);
    }
    if env.ledger().timestamp() < record.release_time {
        return Err(OperationError::TimeLockNotElapsed);
    }
    let entry = registry::lookup(env, &record.operation_type)
        .ok_or(OperationError::UnknownOperationType)?;
    roles::require_role(env, caller, &entry.roles.approve)?;

    record.status = TxStatus::Completed;
    record::store(env, &record);
    Ok(record)
}

/// Cancel a pending record. No underlying action executes.
///
/// Operation types may carry a guard window during which cancellation is
/// refused, so the time-lock keeps its meaning.
pub fn cancel(env: &Env, caller: &Address, tx_id: u64) -> Result<TxRecord, OperationError> {
    let (mut record, entry) = load_pending_entry(env, tx_id)?;
    roles::require_role(env, caller, &entry.roles.cancel)?;
    check_cancel_guard(env, &record, entry.cancel_guard_secs)?;

    record.status = TxStatus::Cancelled;
    record::store(env, &record);
    Ok(record)
}

// ── Meta-transaction path ────────────────────────────────────────────────────

/// Single-phase request-and-approve, used only by the meta-transaction
/// subsystem. The time-lock wait is bypassed; the security guarantee comes
/// from the fresh, deadline-bounded signature the subsystem has already
/// verified against `signer`.
pub fn request_and_approve(
    env: &Env,
    signer: &Address,
    operation: &Symbol,
    target: &Address,
    value: i128,
    execution_options: Bytes,
) -> Result<TxRecord, OperationError> {
    let mut record = request(env, signer, operation, target, value, execution_options)?;
    record.status = TxStatus::Completed;
    record::store(env, &record);
    Ok(record)
}

/// Approve a pending record on the strength of a verified owner signature.
/// The signature substitutes for the time-lock, so `release_time` is not
/// re-checked here.
pub fn approve_via_meta(
    env: &Env,
    signer: &Address,
    tx_id: u64,
) -> Result<TxRecord, OperationError> {
    let (mut record, entry) = load_pending_entry(env, tx_id)?;
    roles::require_role(env, signer, &entry.roles.meta_approve)?;

    record.status = TxStatus::Completed;
    record::store(env, &record);
    Ok(record)
}

/// Cancel a pending record on the strength of a verified owner signature.
/// The guard window still applies.
pub fn cancel_via_meta(
    env: &Env,
    signer: &Address,
    tx_id: u64,
) -> Result<TxRecord, OperationError> {
    let (mut record, entry) = load_pending_entry(env, tx_id)?;
    roles::require_role(env, signer, &entry.roles.meta_cancel)?;
    check_cancel_guard(env, &record, entry.cancel_guard_secs)?;

    record.status = TxStatus::Cancelled;
    record::store(env, &record);
    Ok(record)
}

// ── Internal helpers ─────────────────────────────────────────────────────────

fn load_pending_entry(
    env: &Env,
    tx_id: u64,
) -> Result<(TxRecord, registry::OperationType), OperationError> {
    let record = record::load(env, tx_id).ok_or(OperationError::TxNotFound)?;
    if record.status != TxStatus::Pending {
        return Err(OperationError::InvalidState);
    }
    let entry = registry::lookup(env, &record.operation_type)
        .ok_or(OperationError::UnknownOperationType)?;
    Ok((record, entry))
}

fn check_cancel_guard(
    env: &Env,
    record: &TxRecord,
    guard_secs: u64,
) -> Result<(), OperationError> {
    if env.ledger().timestamp() < record.requested_at.saturating_add(guard_secs) {
        return Err(OperationError::CancelWindowActive);
    }
    Ok(())
}

// ── Tests ────────────────────────────────────────────────────────────────────
