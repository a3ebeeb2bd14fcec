//! The Meta-Transaction Subsystem.
//!
//! Lets an owner pre-authorize an action off-chain by signing a canonical
//! payload hash, and lets the registered broadcaster submit it on-chain
//! without the owner holding gas funds or being online at submission time.
//!
//! Construction and verification are two explicit steps:
//! - [`unsigned_for_new`] / [`unsigned_for_existing`] are pure reads that
//!   build the payload and its canonical [`message`] hash — the exact bytes
//!   the signer must sign (prehash signing, no re-derivation).
//! - [`verify_and_consume`] recomputes the hash from the submitted payload,
//!   recovers the signer's public key through the host's secp256k1 recovery
//!   primitive, and compares it against the signing key of the role the
//!   registry requires — then consumes the signer's nonce.

use soroban_sdk::{contracttype, symbol_short, Address, Bytes, BytesN, Env, Symbol};
use soroban_sdk::crypto::Hash;
use soroban_sdk::xdr::ToXdr;

use crate::nonce;
use crate::record;
use crate::registry;
use crate::roles::{self, Role};
use crate::OperationError;

// ── Storage keys ─────────────────────────────────────────────────────────────

const GAS_PX: Symbol = symbol_short!("GAS_PX");

// ── Payload types ────────────────────────────────────────────────────────────

/// Which engine entry a meta-transaction authorizes. An explicit tag, bound
/// into the signed payload and checked against the entry point invoked.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MetaTxAction {
    /// Create and immediately complete a new operation.
    RequestAndApprove,
    /// Approve an existing pending record.
    ApproveExisting,
    /// Cancel an existing pending record.
    CancelExisting,
}

/// The full description of a new operation, for single-phase payloads.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewOperation {
    pub operation_type: Symbol,
    pub target: Address,
    pub value: i128,
    pub execution_options: Bytes,
}

/// Everything a signer commits to. The canonical message is the keccak-256
/// of this struct's XDR encoding.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MetaTxPayload {
    pub action: MetaTxAction,
    /// Contract instance the authorization is bound to.
    pub host: Address,
    pub signer: Address,
    pub nonce: u64,
    /// Absolute timestamp after which the authorization is dead.
    pub deadline: u64,
    /// Ceiling on the gas price the broadcaster may pay to relay this.
    pub max_gas_price: u128,
    /// Set for actions on an existing record.
    pub tx_id: Option<u64>,
    /// Set for single-phase new-operation payloads.
    pub new_operation: Option<NewOperation>,
}

/// A payload together with the message the signer must sign.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UnsignedMetaTx {
    pub payload: MetaTxPayload,
    pub message: BytesN<32>,
}

/// A signed, submittable meta-transaction.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MetaTransaction {
    pub payload: MetaTxPayload,
    pub signature: BytesN<64>,
    pub recovery_id: u32,
}

// ── Message construction ─────────────────────────────────────────────────────

fn digest(env: &Env, payload: &MetaTxPayload) -> Hash<32> {
    env.crypto().keccak256(&payload.clone().to_xdr(env))
}

/// The canonical 32-byte message for a payload. Signers must sign exactly
/// these bytes; any re-hash on the signing side changes the recovered key.
pub fn message(env: &Env, payload: &MetaTxPayload) -> BytesN<32> {
    digest(env, payload).into()
}

/// Build the unsigned wrapper for a brand-new operation. Pure read: captures
/// the signer's current nonce, mutates nothing, needs no authorization.
#[allow(clippy::too_many_arguments)]
pub fn unsigned_for_new(
    env: &Env,
    signer: &Address,
    operation: &Symbol,
    target: &Address,
    value: i128,
    execution_options: Bytes,
    deadline: u64,
    max_gas_price: u128,
) -> UnsignedMetaTx {
    let payload = MetaTxPayload {
        action: MetaTxAction::RequestAndApprove,
        host: env.current_contract_address(),
        signer: signer.clone(),
        nonce: nonce::current(env, signer),
        deadline,
        max_gas_price,
        tx_id: None,
        new_operation: Some(NewOperation {
            operation_type: operation.clone(),
            target: target.clone(),
            value,
            execution_options,
        }),
    };
    UnsignedMetaTx {
        message: message(env, &payload),
        payload,
    }
}

/// Build the unsigned wrapper for an action on an existing record. Pure read.
pub fn unsigned_for_existing(
    env: &Env,
    signer: &Address,
    tx_id: u64,
    is_approval: bool,
    deadline: u64,
    max_gas_price: u128,
) -> UnsignedMetaTx {
    let payload = MetaTxPayload {
        action: if is_approval {
            MetaTxAction::ApproveExisting
        } else {
            MetaTxAction::CancelExisting
        },
        host: env.current_contract_address(),
        signer: signer.clone(),
        nonce: nonce::current(env, signer),
        deadline,
        max_gas_price,
        tx_id: Some(tx_id),
        new_operation: None,
    };
    UnsignedMetaTx {
        message: message(env, &payload),
        payload,
    }
}

// ── Verification ─────────────────────────────────────────────────────────────

/// Recover the public key that produced `signature` over the payload's
/// canonical message.
pub fn recover_signer(env: &Env, meta: &MetaTransaction) -> BytesN<65> {
    env.crypto()
        .secp256k1_recover(&digest(env, &meta.payload), &meta.signature, meta.recovery_id)
}

/// Effective gas price of the submission being processed.
///
/// Soroban does not expose the transaction's fee bid to contracts; in a
/// deployed environment this slot is maintained by the broadcaster's fee
/// infrastructure alongside each submission. Tests inject a value under the
/// same key.
fn effective_gas_price(env: &Env) -> u128 {
    env.storage().instance().get(&GAS_PX).unwrap_or(0u128)
}

/// Validate a submitted meta-transaction and consume its nonce.
///
/// Check order: instance binding, action tag against the invoked entry
/// point, deadline, gas-price ceiling, nonce, then signature — so an expired
/// or mis-routed meta-transaction fails before any signature work, and a
/// perfectly signed one still dies on a stale nonce.
pub fn verify_and_consume(
    env: &Env,
    meta: &MetaTransaction,
    expected_action: MetaTxAction,
) -> Result<(), OperationError> {
    let payload = &meta.payload;

    if payload.host != env.current_contract_address() {
        return Err(OperationError::InvalidInput);
    }
    if payload.action != expected_action {
        return Err(OperationError::HandlerMismatch);
    }

    let now = env.ledger().timestamp();
    if now > payload.deadline {
        return Err(OperationError::ExpiredDeadline);
    }
    if effective_gas_price(env) > payload.max_gas_price {
        return Err(OperationError::GasPriceTooHigh);
    }
    if payload.nonce != nonce::current(env, &payload.signer) {
        return Err(OperationError::InvalidNonce);
    }

    let required = required_role(env, payload)?;
    roles::require_role(env, &payload.signer, &required)?;
    let expected_key =
        roles::signing_key(env, &required).ok_or(OperationError::InvalidSignature)?;
    if recover_signer(env, meta) != expected_key {
        return Err(OperationError::InvalidSignature);
    }

    nonce::consume(env, &payload.signer)?;
    Ok(())
}

/// Resolve which role must have signed, from the registry entry of the
/// operation the payload touches.
fn required_role(env: &Env, payload: &MetaTxPayload) -> Result<Role, OperationError> {
    let operation = match payload.action {
        MetaTxAction::RequestAndApprove => payload
            .new_operation
            .as_ref()
            .ok_or(OperationError::InvalidInput)?
            .operation_type
            .clone(),
        MetaTxAction::ApproveExisting | MetaTxAction::CancelExisting => {
            let tx_id = payload.tx_id.ok_or(OperationError::InvalidInput)?;
            record::load(env, tx_id)
                .ok_or(OperationError::TxNotFound)?
                .operation_type
        }
    };
    let entry =
        registry::lookup(env, &operation).ok_or(OperationError::UnknownOperationType)?;
    Ok(match payload.action {
        MetaTxAction::RequestAndApprove => entry.roles.request,
        MetaTxAction::ApproveExisting => entry.roles.meta_approve,
        MetaTxAction::CancelExisting => entry.roles.meta_cancel,
    })
}

// ── Tests ────────────────────────────────────────────────────────────────────
