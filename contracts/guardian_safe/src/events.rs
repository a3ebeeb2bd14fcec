//! Structured event publishing for the GuardianSafe contract.

use common::TxRecord;
use soroban_sdk::{symbol_short, Address, BytesN, Env};

use crate::SafeCallOptions;

pub fn publish_initialized(env: &Env, owner: &Address, safe: &Address, time_lock_secs: u64) {
    env.events().publish(
        (symbol_short!("GS_INIT"),),
        (owner.clone(), safe.clone(), time_lock_secs),
    );
}

pub fn publish_operation_requested(env: &Env, record: &TxRecord) {
    env.events().publish(
        (symbol_short!("OP_REQ"), record.tx_id),
        (
            record.operation_type.clone(),
            record.requester.clone(),
            record.release_time,
        ),
    );
}

pub fn publish_operation_approved(env: &Env, record: &TxRecord) {
    env.events().publish(
        (symbol_short!("OP_APPR"), record.tx_id),
        record.operation_type.clone(),
    );
}

pub fn publish_operation_cancelled(env: &Env, record: &TxRecord) {
    env.events().publish(
        (symbol_short!("OP_CANC"), record.tx_id),
        record.operation_type.clone(),
    );
}

pub fn publish_meta_tx_submitted(env: &Env, broadcaster: &Address, record: &TxRecord) {
    env.events().publish(
        (symbol_short!("OP_META"), record.tx_id),
        (broadcaster.clone(), record.status.clone()),
    );
}

/// Pre-execution guard notification, published before a safe call is
/// dispatched when a guard is designated.
pub fn publish_guard_check(env: &Env, tx_id: u64, guard: &Address, safe: &Address) {
    env.events().publish(
        (symbol_short!("GUARD_CHK"), tx_id),
        (guard.clone(), safe.clone()),
    );
}

/// The exact call an approved safe transaction makes, for indexers and the
/// broadcaster's execution tooling.
pub fn publish_safe_call_dispatched(
    env: &Env,
    tx_id: u64,
    safe: &Address,
    options: &SafeCallOptions,
    data_hash: &BytesN<32>,
) {
    env.events().publish(
        (symbol_short!("DISPATCH"), tx_id),
        (
            safe.clone(),
            options.to.clone(),
            options.value,
            options.kind.clone(),
            data_hash.clone(),
        ),
    );
}
