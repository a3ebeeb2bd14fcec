//! Per-signer nonce counters for meta-transaction replay prevention.
//!
//! A payload captures the signer's current nonce at generation time; the
//! nonce is consumed when the meta-transaction is accepted, so an identical
//! second submission no longer matches.

use soroban_sdk::{symbol_short, Address, Env, Symbol};

use crate::OperationError;

const NONCE: Symbol = symbol_short!("NONCE");

/// The signer's current (next-expected) nonce. Fresh signers start at 0.
pub fn current(env: &Env, signer: &Address) -> u64 {
    env.storage()
        .persistent()
        .get(&(NONCE, signer.clone()))
        .unwrap_or(0u64)
}

/// Consume the signer's current nonce, advancing it by one. Crate-internal:
/// only accepted meta-transactions advance nonces.
pub(crate) fn consume(env: &Env, signer: &Address) -> Result<u64, OperationError> {
    let next = current(env, signer)
        .checked_add(1)
        .ok_or(OperationError::NonceOverflow)?;
    env.storage()
        .persistent()
        .set(&(NONCE, signer.clone()), &next);
    Ok(next)
}
