//! Operation Registry: the per-instance catalog of operation types.
//!
//! Each registered [`OperationType`] carries a stable identifier (the SHA-256
//! of its name), the role required at every protocol phase, the entry-point
//! selectors it is reachable through, and its cancellation guard window.
//! The catalog is built inside a contract's `initialize` and never mutated
//! afterwards — it is configuration data, not runtime state.

use soroban_sdk::{contracttype, symbol_short, BytesN, Env, Symbol, Vec};
use soroban_sdk::xdr::ToXdr;

use crate::roles::Role;
use crate::OperationError;

// ── Storage keys ─────────────────────────────────────────────────────────────

const OPS: Symbol = symbol_short!("OPS");
const SEL: Symbol = symbol_short!("SEL");

// ── Phase and catalog types ──────────────────────────────────────────────────

/// A phase of the secure-operation protocol a caller can act in.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OperationPhase {
    Request,
    Approve,
    Cancel,
    MetaApprove,
    MetaCancel,
}

/// The role required at each phase of one operation type.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PhaseRoles {
    pub request: Role,
    pub approve: Role,
    pub cancel: Role,
    pub meta_approve: Role,
    pub meta_cancel: Role,
}

impl PhaseRoles {
    /// Every phase gated on the owner — the default for value-moving
    /// operations, where the broadcaster only relays owner signatures.
    pub fn owner_all() -> Self {
        Self {
            request: Role::Owner,
            approve: Role::Owner,
            cancel: Role::Owner,
            meta_approve: Role::Owner,
            meta_cancel: Role::Owner,
        }
    }

    pub fn role_for(&self, phase: &OperationPhase) -> Role {
        match phase {
            OperationPhase::Request => self.request.clone(),
            OperationPhase::Approve => self.approve.clone(),
            OperationPhase::Cancel => self.cancel.clone(),
            OperationPhase::MetaApprove => self.meta_approve.clone(),
            OperationPhase::MetaCancel => self.meta_cancel.clone(),
        }
    }
}

/// One entry in the operation catalog.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OperationType {
    /// Stable identifier: SHA-256 over the canonical encoding of `name`.
    pub id: BytesN<32>,
    pub name: Symbol,
    /// Entry-point selectors this operation is reachable through.
    pub selectors: Vec<Symbol>,
    pub roles: PhaseRoles,
    /// Seconds after request during which cancellation is refused.
    /// Zero disables the guard for this operation type.
    pub cancel_guard_secs: u64,
}

// ── Standard operation names ─────────────────────────────────────────────────

pub fn op_ownership_transfer(env: &Env) -> Symbol {
    Symbol::new(env, "OWNERSHIP_TRANSFER")
}

pub fn op_broadcaster_update(env: &Env) -> Symbol {
    Symbol::new(env, "BROADCASTER_UPDATE")
}

pub fn op_recovery_update(env: &Env) -> Symbol {
    Symbol::new(env, "RECOVERY_UPDATE")
}

pub fn op_timelock_update(env: &Env) -> Symbol {
    Symbol::new(env, "TIMELOCK_UPDATE")
}

// ── Registration ─────────────────────────────────────────────────────────────

/// Derive the stable operation-type id from its name.
pub fn operation_id(env: &Env, name: &Symbol) -> BytesN<32> {
    env.crypto().sha256(&name.clone().to_xdr(env)).into()
}

/// Add an operation type to the catalog. Constructor-time only; a duplicate
/// name is rejected so a registry can never be silently redefined.
pub fn register(
    env: &Env,
    name: Symbol,
    roles: PhaseRoles,
    cancel_guard_secs: u64,
    selectors: Vec<Symbol>,
) -> Result<(), OperationError> {
    if lookup(env, &name).is_some() {
        return Err(OperationError::InvalidInput);
    }
    let entry = OperationType {
        id: operation_id(env, &name),
        name,
        selectors: selectors.clone(),
        roles: roles.clone(),
        cancel_guard_secs,
    };
    let mut ops: Vec<OperationType> =
        env.storage().instance().get(&OPS).unwrap_or(Vec::new(env));
    ops.push_back(entry);
    env.storage().instance().set(&OPS, &ops);

    // Each selector is bound to the request-phase role as its minimum.
    for selector in selectors.iter() {
        bind_selector(env, &selector, &roles.request);
    }
    Ok(())
}

/// Install the ownership operations every protected contract carries.
///
/// Ownership transfer is the recovery role's path back in after key loss,
/// so recovery requests and cancels it while the owner must approve.
/// Broadcaster, recovery, and time-lock updates are owner-driven.
/// None of these carry a cancellation guard window.
pub fn install_standard_operations(env: &Env) -> Result<(), OperationError> {
    register(
        env,
        op_ownership_transfer(env),
        PhaseRoles {
            request: Role::Recovery,
            approve: Role::Owner,
            cancel: Role::Recovery,
            meta_approve: Role::Owner,
            meta_cancel: Role::Owner,
        },
        0,
        Vec::from_array(env, [Symbol::new(env, "request_ownership_transfer")]),
    )?;
    register(
        env,
        op_broadcaster_update(env),
        PhaseRoles::owner_all(),
        0,
        Vec::from_array(env, [Symbol::new(env, "request_broadcaster_update")]),
    )?;
    register(
        env,
        op_recovery_update(env),
        PhaseRoles::owner_all(),
        0,
        Vec::from_array(env, [Symbol::new(env, "request_recovery_update")]),
    )?;
    register(
        env,
        op_timelock_update(env),
        PhaseRoles::owner_all(),
        0,
        Vec::from_array(env, [Symbol::new(env, "request_timelock_update")]),
    )
}

// ── Lookup ───────────────────────────────────────────────────────────────────

pub fn lookup(env: &Env, name: &Symbol) -> Option<OperationType> {
    let ops: Vec<OperationType> =
        env.storage().instance().get(&OPS).unwrap_or(Vec::new(env));
    ops.iter().find(|op| op.name == *name)
}

pub fn lookup_by_id(env: &Env, id: &BytesN<32>) -> Option<OperationType> {
    let ops: Vec<OperationType> =
        env.storage().instance().get(&OPS).unwrap_or(Vec::new(env));
    ops.iter().find(|op| op.id == *id)
}

/// The full enumerable catalog, for discovery by external tooling.
pub fn supported_operation_types(env: &Env) -> Vec<OperationType> {
    env.storage().instance().get(&OPS).unwrap_or(Vec::new(env))
}

/// The role required for `(operation type, phase)`, if the type is known.
pub fn role_for_phase(env: &Env, name: &Symbol, phase: &OperationPhase) -> Option<Role> {
    lookup(env, name).map(|op| op.roles.role_for(phase))
}

// ── Selector bindings ────────────────────────────────────────────────────────

/// Bind an entry-point selector to a minimum required role.
pub fn bind_selector(env: &Env, selector: &Symbol, role: &Role) {
    env.storage()
        .instance()
        .set(&(SEL, selector.clone()), role);
}

pub fn role_for_selector(env: &Env, selector: &Symbol) -> Option<Role> {
    env.storage().instance().get(&(SEL, selector.clone()))
}
