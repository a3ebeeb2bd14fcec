//! Permission / role validation for protected contracts.
//!
//! Every instance has exactly one owner, one broadcaster, and one recovery
//! address, plus an optional secp256k1 signing key per role used as that
//! role's meta-transaction identity. Role checks always re-read instance
//! storage so a pending role-change operation has no effect until its own
//! approval applies it.

use soroban_sdk::{contracttype, symbol_short, Address, BytesN, Env, Symbol};
use soroban_sdk::xdr::FromXdr;

use crate::engine;
use crate::record::TxRecord;
use crate::registry::{self, OperationPhase};
use crate::OperationError;

// ── Storage keys ─────────────────────────────────────────────────────────────

const OWNER: Symbol = symbol_short!("OWNER");
const BROADCAST: Symbol = symbol_short!("BROADCAST");
const RECOVERY: Symbol = symbol_short!("RECOVERY");
const SIGNKEY: Symbol = symbol_short!("SIGNKEY");

// ── Role model ───────────────────────────────────────────────────────────────

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Owner,
    Broadcaster,
    Recovery,
}

fn role_key(role: &Role) -> Symbol {
    match role {
        Role::Owner => OWNER,
        Role::Broadcaster => BROADCAST,
        Role::Recovery => RECOVERY,
    }
}

pub fn set_role_address(env: &Env, role: &Role, addr: &Address) {
    env.storage().instance().set(&role_key(role), addr);
}

pub fn role_address(env: &Env, role: &Role) -> Option<Address> {
    env.storage().instance().get(&role_key(role))
}

/// Exact-match check against the role's current address. Unset roles and
/// unknown callers yield `false`, never an error.
pub fn has_role(env: &Env, caller: &Address, role: &Role) -> bool {
    match role_address(env, role) {
        Some(addr) => addr == *caller,
        None => false,
    }
}

pub fn require_role(env: &Env, caller: &Address, role: &Role) -> Result<(), OperationError> {
    if !has_role(env, caller, role) {
        return Err(OperationError::UnauthorizedCaller);
    }
    Ok(())
}

/// Whether `caller` may act in `phase` of the named operation type.
///
/// Resolves the registry's required role and delegates to [`has_role`];
/// returns `false` for unregistered operation types so callers can use this
/// for enabling/disabling affordances rather than catching errors.
pub fn can_execute_phase(
    env: &Env,
    operation: &Symbol,
    phase: &OperationPhase,
    caller: &Address,
) -> bool {
    match registry::role_for_phase(env, operation, phase) {
        Some(role) => has_role(env, caller, &role),
        None => false,
    }
}

/// Whether `caller` meets the minimum role bound to an entry-point selector.
pub fn can_call_selector(env: &Env, selector: &Symbol, caller: &Address) -> bool {
    match registry::role_for_selector(env, selector) {
        Some(role) => has_role(env, caller, &role),
        None => false,
    }
}

// ── Signing keys ─────────────────────────────────────────────────────────────

/// Store a role's meta-transaction signing key (65-byte uncompressed
/// secp256k1 public key, as returned by the host's recovery primitive).
pub fn set_signing_key(env: &Env, role: &Role, key: &BytesN<65>) {
    env.storage().instance().set(&(SIGNKEY, role.clone()), key);
}

pub fn signing_key(env: &Env, role: &Role) -> Option<BytesN<65>> {
    env.storage().instance().get(&(SIGNKEY, role.clone()))
}

// ── Role-change operations ───────────────────────────────────────────────────

/// Execution options for the ownership, broadcaster, and recovery updates.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RoleChangeOptions {
    pub new_address: Address,
    /// New meta-transaction signing key for the role, where one applies.
    pub new_signing_key: Option<BytesN<65>>,
}

/// Execution options for the time-lock period update.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TimeLockChangeOptions {
    pub new_period_secs: u64,
}

/// Apply a standard (ownership/configuration) operation at approval time.
///
/// Returns `Ok(true)` when the record's type was one of the standard
/// operations and its effect has been applied, `Ok(false)` when the type is
/// contract-specific and the caller must dispatch it itself.
pub fn dispatch_standard_operation(
    env: &Env,
    record: &TxRecord,
) -> Result<bool, OperationError> {
    let name = &record.operation_type;

    let changed_role = if *name == registry::op_ownership_transfer(env) {
        Some(Role::Owner)
    } else if *name == registry::op_broadcaster_update(env) {
        Some(Role::Broadcaster)
    } else if *name == registry::op_recovery_update(env) {
        Some(Role::Recovery)
    } else {
        None
    };

    if let Some(role) = changed_role {
        let opts = RoleChangeOptions::from_xdr(env, &record.execution_options)
            .map_err(|_| OperationError::UnderlyingActionFailed)?;
        set_role_address(env, &role, &opts.new_address);
        if let Some(key) = opts.new_signing_key {
            set_signing_key(env, &role, &key);
        }
        return Ok(true);
    }

    if *name == registry::op_timelock_update(env) {
        let opts = TimeLockChangeOptions::from_xdr(env, &record.execution_options)
            .map_err(|_| OperationError::UnderlyingActionFailed)?;
        engine::set_time_lock(env, opts.new_period_secs)?;
        return Ok(true);
    }

    Ok(false)
}
