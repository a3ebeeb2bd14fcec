//! Structured event publishing for the SimpleVault contract.

use common::TxRecord;
use soroban_sdk::{symbol_short, Address, Env};

use crate::WithdrawalOptions;

pub fn publish_initialized(
    env: &Env,
    owner: &Address,
    broadcaster: &Address,
    recovery: &Address,
    time_lock_secs: u64,
) {
    env.events().publish(
        (symbol_short!("VLT_INIT"),),
        (
            owner.clone(),
            broadcaster.clone(),
            recovery.clone(),
            time_lock_secs,
        ),
    );
}

pub fn publish_deposit(env: &Env, from: &Address, token: &Address, amount: i128) {
    env.events().publish(
        (symbol_short!("VLT_DEP"),),
        (from.clone(), token.clone(), amount),
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

pub fn publish_withdrawal_executed(env: &Env, record: &TxRecord, options: &WithdrawalOptions) {
    env.events().publish(
        (symbol_short!("VLT_WDRW"), record.tx_id),
        (
            options.token.clone(),
            options.recipient.clone(),
            options.amount,
        ),
    );
}
