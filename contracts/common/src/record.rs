//! The Transaction Record Store: every operation attempt, kept forever.
//!
//! Records are keyed by a monotonically increasing `tx_id` allocated at
//! request time. Status only ever moves `Pending → Completed` or
//! `Pending → Cancelled`; completed and cancelled records are retained as
//! the audit trail and never deleted.

use soroban_sdk::{contracttype, symbol_short, Address, Bytes, Env, Symbol, Vec};

// ── Storage keys ─────────────────────────────────────────────────────────────

const TX_CTR: Symbol = symbol_short!("TX_CTR");
const TX: Symbol = symbol_short!("TX");

// TTL: ~60 days at 5s/ledger
const TTL_THRESHOLD: u32 = 1_036_800;
const TTL_EXTEND_TO: u32 = 2_073_600;

// ── Record types ─────────────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TxStatus {
    Pending,
    Completed,
    Cancelled,
}

/// The durable record of one operation attempt.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxRecord {
    pub tx_id: u64,
    pub requester: Address,
    /// Contract the underlying action is invoked against.
    pub target: Address,
    /// Value moved by the underlying action, where one applies.
    pub value: i128,
    pub operation_type: Symbol,
    /// Encoded call data specific to the operation type; opaque to the engine.
    pub execution_options: Bytes,
    pub requested_at: u64,
    /// Timestamp from which approval is permitted.
    pub release_time: u64,
    pub status: TxStatus,
}

// ── Storage helpers ──────────────────────────────────────────────────────────

/// Allocate the next record id. Ids start at 1.
pub(crate) fn next_id(env: &Env) -> u64 {
    let id: u64 = env
        .storage()
        .instance()
        .get(&TX_CTR)
        .unwrap_or(0u64)
        .saturating_add(1);
    env.storage().instance().set(&TX_CTR, &id);
    id
}

/// Number of records ever created.
pub fn tx_count(env: &Env) -> u64 {
    env.storage().instance().get(&TX_CTR).unwrap_or(0u64)
}

fn tx_key(tx_id: u64) -> (Symbol, u64) {
    (TX, tx_id)
}

/// Write a record. Crate-internal: every mutation goes through the engine.
pub(crate) fn store(env: &Env, record: &TxRecord) {
    let key = tx_key(record.tx_id);
    env.storage().persistent().set(&key, record);
    env.storage()
        .persistent()
        .extend_ttl(&key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

pub fn load(env: &Env, tx_id: u64) -> Option<TxRecord> {
    env.storage().persistent().get(&tx_key(tx_id))
}

/// Page through the operation history in id order.
///
/// `offset` skips that many records from the start of history; at most
/// `count` records are returned. Ids past the counter simply end the page.
pub fn history(env: &Env, offset: u64, count: u32) -> Vec<TxRecord> {
    let total = tx_count(env);
    let mut out = Vec::new(env);
    let mut id = offset.saturating_add(1);
    while id <= total && (out.len() as u32) < count {
        if let Some(record) = load(env, id) {
            out.push_back(record);
        }
        id = id.saturating_add(1);
    }
    out
}
