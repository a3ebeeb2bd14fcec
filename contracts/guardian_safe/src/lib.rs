#![no_std]

//! # GuardianSafe
//!
//! Routes an external safe's transactions through the secure multi-phase
//! operation protocol. Every safe call is requested, time-locked, and
//! approved (or relayed as an owner-signed meta-transaction); delegate
//! calls are additionally gated behind an on-chain toggle that is itself a
//! protocol operation, as are guard designation and every role change.
//!
//! The safe itself stays untouched: this contract holds only the protocol
//! state and a back-reference to the safe, and emits the exact call to make
//! at the production cross-contract invocation point.

mod events;


use common::{engine, meta_tx, nonce, record, registry, roles, OperationError};
use common::{
    MetaTransaction, MetaTxAction, OperationPhase, OperationType, PhaseRoles, Role,
    RoleChangeOptions, TimeLockChangeOptions, TxRecord, UnsignedMetaTx,
};
use soroban_sdk::xdr::{FromXdr, ToXdr};
use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, Address, Bytes, BytesN, Env, Symbol, Vec,
};

// ── Storage keys ─────────────────────────────────────────────────────────────

const INIT: Symbol = symbol_short!("INIT");
const SAFE: Symbol = symbol_short!("SAFE");
const GUARD: Symbol = symbol_short!("GUARD");
const DELEGATE: Symbol = symbol_short!("DELEGATE");

// ── Operation catalog ────────────────────────────────────────────────────────

/// Cancellation guard for safe executions: 1 hour.
const EXEC_CANCEL_GUARD_SECS: u64 = 3_600;

pub fn exec_safe_tx_op(env: &Env) -> Symbol {
    Symbol::new(env, "EXEC_SAFE_TX")
}

pub fn guard_update_op(env: &Env) -> Symbol {
    Symbol::new(env, "GUARD_UPDATE")
}

pub fn delegatecall_toggle_op(env: &Env) -> Symbol {
    Symbol::new(env, "DELEGATECALL_TOGGLE")
}

/// How a safe transaction invokes its target.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CallKind {
    Call,
    DelegateCall,
}

/// Execution options for one safe transaction, XDR-encoded into the record.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SafeCallOptions {
    pub to: Address,
    pub value: i128,
    pub kind: CallKind,
    pub call_data: Bytes,
}

/// Execution options for designating (or clearing) the transaction guard.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GuardUpdateOptions {
    pub new_guard: Option<Address>,
}

/// Execution options for the delegated-call toggle.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DelegateToggleOptions {
    pub enabled: bool,
}

// ── Contract ─────────────────────────────────────────────────────────────────

#[contract]
pub struct GuardianSafeContract;

#[contractimpl]
impl GuardianSafeContract {
    // ── Initialisation ────────────────────────────────────────────────────────

    /// Bootstrap the wrapper around an existing safe. Delegate calls start
    /// disabled and no guard is designated.
    pub fn initialize(
        env: Env,
        owner: Address,
        broadcaster: Address,
        recovery: Address,
        owner_signing_key: BytesN<65>,
        time_lock_secs: u64,
        safe: Address,
    ) -> Result<(), OperationError> {
        if env.storage().instance().has(&INIT) {
            return Err(OperationError::AlreadyInitialized);
        }
        owner.require_auth();
        if owner == broadcaster || owner == recovery || broadcaster == recovery {
            return Err(OperationError::InvalidInput);
        }

        engine::set_time_lock(&env, time_lock_secs)?;
        roles::set_role_address(&env, &Role::Owner, &owner);
        roles::set_role_address(&env, &Role::Broadcaster, &broadcaster);
        roles::set_role_address(&env, &Role::Recovery, &recovery);
        roles::set_signing_key(&env, &Role::Owner, &owner_signing_key);
        env.storage().instance().set(&SAFE, &safe);
        env.storage().instance().set(&DELEGATE, &false);

        registry::install_standard_operations(&env)?;
        registry::register(
            &env,
            exec_safe_tx_op(&env),
            PhaseRoles::owner_all(),
            EXEC_CANCEL_GUARD_SECS,
            Vec::from_array(&env, [Symbol::new(&env, "request_safe_tx")]),
        )?;
        registry::register(
            &env,
            guard_update_op(&env),
            PhaseRoles::owner_all(),
            0,
            Vec::from_array(&env, [Symbol::new(&env, "request_guard_update")]),
        )?;
        registry::register(
            &env,
            delegatecall_toggle_op(&env),
            PhaseRoles::owner_all(),
            0,
            Vec::from_array(&env, [Symbol::new(&env, "request_delegatecall_toggle")]),
        )?;

        env.storage().instance().set(&INIT, &true);
        events::publish_initialized(&env, &owner, &safe, time_lock_secs);
        Ok(())
    }

    // ── Two-phase operations ──────────────────────────────────────────────────

    /// Queue a safe transaction. Delegate-call requests are refused outright
    /// while the toggle is off.
    pub fn request_safe_tx(
        env: Env,
        caller: Address,
        to: Address,
        value: i128,
        kind: CallKind,
        call_data: Bytes,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();
        if kind == CallKind::DelegateCall && !Self::delegate_enabled(&env) {
            return Err(OperationError::DelegateCallDisabled);
        }

        let options = SafeCallOptions {
            to: to.clone(),
            value,
            kind,
            call_data,
        };
        let record = engine::request(
            &env,
            &caller,
            &exec_safe_tx_op(&env),
            &to,
            value,
            options.to_xdr(&env),
        )?;
        events::publish_operation_requested(&env, &record);
        Ok(record)
    }

    /// Queue a guard change. `None` clears the guard; the guard may be any
    /// contract, including this one.
    pub fn request_guard_update(
        env: Env,
        caller: Address,
        new_guard: Option<Address>,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();

        let options = GuardUpdateOptions { new_guard };
        let record = engine::request(
            &env,
            &caller,
            &guard_update_op(&env),
            &env.current_contract_address(),
            0,
            options.to_xdr(&env),
        )?;
        events::publish_operation_requested(&env, &record);
        Ok(record)
    }

    /// Queue a flip of the delegated-call toggle.
    pub fn request_delegatecall_toggle(
        env: Env,
        caller: Address,
        enabled: bool,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();

        let options = DelegateToggleOptions { enabled };
        let record = engine::request(
            &env,
            &caller,
            &delegatecall_toggle_op(&env),
            &env.current_contract_address(),
            0,
            options.to_xdr(&env),
        )?;
        events::publish_operation_requested(&env, &record);
        Ok(record)
    }

    pub fn request_ownership_transfer(
        env: Env,
        caller: Address,
        new_owner: Address,
        new_signing_key: Option<BytesN<65>>,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();
        Self::request_role_change(
            &env,
            &caller,
            registry::op_ownership_transfer(&env),
            new_owner,
            new_signing_key,
        )
    }

    pub fn request_broadcaster_update(
        env: Env,
        caller: Address,
        new_broadcaster: Address,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();
        Self::request_role_change(
            &env,
            &caller,
            registry::op_broadcaster_update(&env),
            new_broadcaster,
            None,
        )
    }

    pub fn request_recovery_update(
        env: Env,
        caller: Address,
        new_recovery: Address,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();
        Self::request_role_change(
            &env,
            &caller,
            registry::op_recovery_update(&env),
            new_recovery,
            None,
        )
    }

    pub fn request_timelock_update(
        env: Env,
        caller: Address,
        new_period_secs: u64,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();
        engine::validate_time_lock(new_period_secs)?;

        let options = TimeLockChangeOptions { new_period_secs };
        let record = engine::request(
            &env,
            &caller,
            &registry::op_timelock_update(&env),
            &env.current_contract_address(),
            0,
            options.to_xdr(&env),
        )?;
        events::publish_operation_requested(&env, &record);
        Ok(record)
    }

    pub fn approve_operation(
        env: Env,
        caller: Address,
        tx_id: u64,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();

        let record = engine::approve(&env, &caller, tx_id)?;
        Self::dispatch(&env, &record)?;
        events::publish_operation_approved(&env, &record);
        Ok(record)
    }

    pub fn cancel_operation(
        env: Env,
        caller: Address,
        tx_id: u64,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();

        let record = engine::cancel(&env, &caller, tx_id)?;
        events::publish_operation_cancelled(&env, &record);
        Ok(record)
    }

    // ── Meta-transaction path ─────────────────────────────────────────────────

    /// Build the unsigned meta-transaction for a brand-new safe call.
    /// Pure read; the returned `message` is exactly what the owner signs.
    pub fn unsigned_safe_tx_meta_tx(
        env: Env,
        to: Address,
        value: i128,
        kind: CallKind,
        call_data: Bytes,
        deadline: u64,
        max_gas_price: u128,
    ) -> Result<UnsignedMetaTx, OperationError> {
        Self::require_init(&env)?;
        if kind == CallKind::DelegateCall && !Self::delegate_enabled(&env) {
            return Err(OperationError::DelegateCallDisabled);
        }
        let owner =
            roles::role_address(&env, &Role::Owner).ok_or(OperationError::NotInitialized)?;
        let options = SafeCallOptions {
            to: to.clone(),
            value,
            kind,
            call_data,
        };
        Ok(meta_tx::unsigned_for_new(
            &env,
            &owner,
            &exec_safe_tx_op(&env),
            &to,
            value,
            options.to_xdr(&env),
            deadline,
            max_gas_price,
        ))
    }

    /// Build the unsigned meta-transaction for approving or cancelling an
    /// existing pending record. Pure read.
    pub fn unsigned_meta_tx_for_existing(
        env: Env,
        tx_id: u64,
        is_approval: bool,
        deadline: u64,
        max_gas_price: u128,
    ) -> Result<UnsignedMetaTx, OperationError> {
        Self::require_init(&env)?;
        if record::load(&env, tx_id).is_none() {
            return Err(OperationError::TxNotFound);
        }
        let owner =
            roles::role_address(&env, &Role::Owner).ok_or(OperationError::NotInitialized)?;
        Ok(meta_tx::unsigned_for_existing(
            &env,
            &owner,
            tx_id,
            is_approval,
            deadline,
            max_gas_price,
        ))
    }

    pub fn approve_with_meta_tx(
        env: Env,
        caller: Address,
        meta: MetaTransaction,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();
        roles::require_role(&env, &caller, &Role::Broadcaster)?;

        meta_tx::verify_and_consume(&env, &meta, MetaTxAction::ApproveExisting)?;
        let tx_id = meta.payload.tx_id.ok_or(OperationError::InvalidInput)?;
        let record = engine::approve_via_meta(&env, &meta.payload.signer, tx_id)?;
        Self::dispatch(&env, &record)?;
        events::publish_meta_tx_submitted(&env, &caller, &record);
        Ok(record)
    }

    pub fn cancel_with_meta_tx(
        env: Env,
        caller: Address,
        meta: MetaTransaction,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();
        roles::require_role(&env, &caller, &Role::Broadcaster)?;

        meta_tx::verify_and_consume(&env, &meta, MetaTxAction::CancelExisting)?;
        let tx_id = meta.payload.tx_id.ok_or(OperationError::InvalidInput)?;
        let record = engine::cancel_via_meta(&env, &meta.payload.signer, tx_id)?;
        events::publish_meta_tx_submitted(&env, &caller, &record);
        Ok(record)
    }

    pub fn request_and_approve_with_meta_tx(
        env: Env,
        caller: Address,
        meta: MetaTransaction,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();
        roles::require_role(&env, &caller, &Role::Broadcaster)?;

        meta_tx::verify_and_consume(&env, &meta, MetaTxAction::RequestAndApprove)?;
        let operation = meta
            .payload
            .new_operation
            .clone()
            .ok_or(OperationError::InvalidInput)?;
        let record = engine::request_and_approve(
            &env,
            &meta.payload.signer,
            &operation.operation_type,
            &operation.target,
            operation.value,
            operation.execution_options,
        )?;
        Self::dispatch(&env, &record)?;
        events::publish_meta_tx_submitted(&env, &caller, &record);
        Ok(record)
    }

    // ── View functions ────────────────────────────────────────────────────────

    pub fn get_transaction(env: Env, tx_id: u64) -> Result<TxRecord, OperationError> {
        record::load(&env, tx_id).ok_or(OperationError::TxNotFound)
    }

    pub fn get_operation_history(env: Env, offset: u64, count: u32) -> Vec<TxRecord> {
        record::history(&env, offset, count)
    }

    pub fn get_supported_operation_types(env: Env) -> Vec<OperationType> {
        registry::supported_operation_types(&env)
    }

    pub fn has_role(env: Env, caller: Address, role: Role) -> bool {
        roles::has_role(&env, &caller, &role)
    }

    pub fn can_execute_phase(
        env: Env,
        operation: Symbol,
        phase: OperationPhase,
        caller: Address,
    ) -> bool {
        roles::can_execute_phase(&env, &operation, &phase, &caller)
    }

    pub fn can_call_selector(env: Env, selector: Symbol, caller: Address) -> bool {
        roles::can_call_selector(&env, &selector, &caller)
    }

    pub fn get_owner(env: Env) -> Result<Address, OperationError> {
        roles::role_address(&env, &Role::Owner).ok_or(OperationError::NotInitialized)
    }

    pub fn get_broadcaster(env: Env) -> Result<Address, OperationError> {
        roles::role_address(&env, &Role::Broadcaster).ok_or(OperationError::NotInitialized)
    }

    pub fn get_recovery(env: Env) -> Result<Address, OperationError> {
        roles::role_address(&env, &Role::Recovery).ok_or(OperationError::NotInitialized)
    }

    pub fn get_time_lock(env: Env) -> Result<u64, OperationError> {
        engine::time_lock(&env)
    }

    pub fn get_safe(env: Env) -> Result<Address, OperationError> {
        env.storage()
            .instance()
            .get(&SAFE)
            .ok_or(OperationError::NotInitialized)
    }

    pub fn get_guard(env: Env) -> Option<Address> {
        Self::guard(&env)
    }

    pub fn is_delegated_call_enabled(env: Env) -> bool {
        Self::delegate_enabled(&env)
    }

    pub fn get_meta_nonce(env: Env, signer: Address) -> u64 {
        nonce::current(&env, &signer)
    }

    pub fn is_initialized(env: Env) -> bool {
        env.storage().instance().has(&INIT)
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn require_init(env: &Env) -> Result<(), OperationError> {
        if !env.storage().instance().has(&INIT) {
            return Err(OperationError::NotInitialized);
        }
        Ok(())
    }

    fn delegate_enabled(env: &Env) -> bool {
        env.storage().instance().get(&DELEGATE).unwrap_or(false)
    }

    fn guard(env: &Env) -> Option<Address> {
        env.storage().instance().get(&GUARD)
    }

    fn request_role_change(
        env: &Env,
        caller: &Address,
        operation: Symbol,
        new_address: Address,
        new_signing_key: Option<BytesN<65>>,
    ) -> Result<TxRecord, OperationError> {
        let options = RoleChangeOptions {
            new_address,
            new_signing_key,
        };
        let record = engine::request(
            env,
            caller,
            &operation,
            &env.current_contract_address(),
            0,
            options.to_xdr(env),
        )?;
        events::publish_operation_requested(env, &record);
        Ok(record)
    }

    /// Execute a completed record's underlying action.
    fn dispatch(env: &Env, record: &TxRecord) -> Result<(), OperationError> {
        if roles::dispatch_standard_operation(env, record)? {
            return Ok(());
        }

        let name = &record.operation_type;

        if *name == guard_update_op(env) {
            let options = GuardUpdateOptions::from_xdr(env, &record.execution_options)
                .map_err(|_| OperationError::UnderlyingActionFailed)?;
            match options.new_guard {
                Some(guard) => env.storage().instance().set(&GUARD, &guard),
                None => env.storage().instance().remove(&GUARD),
            }
            return Ok(());
        }

        if *name == delegatecall_toggle_op(env) {
            let options = DelegateToggleOptions::from_xdr(env, &record.execution_options)
                .map_err(|_| OperationError::UnderlyingActionFailed)?;
            env.storage().instance().set(&DELEGATE, &options.enabled);
            return Ok(());
        }

        if *name == exec_safe_tx_op(env) {
            return Self::dispatch_safe_call(env, record);
        }

        Err(OperationError::UnknownOperationType)
    }

    /// Emit the exact safe call to make.
    ///
    /// Soroban's cross-contract call API needs the argument types at compile
    /// time, so the approved call is published as a structured event and the
    /// broadcaster tooling performs the actual invocation against the safe.
    /// A production deployment with a fixed safe ABI replaces this with
    /// `env.invoke_contract(&safe, ...)`.
    fn dispatch_safe_call(env: &Env, record: &TxRecord) -> Result<(), OperationError> {
        let options = SafeCallOptions::from_xdr(env, &record.execution_options)
            .map_err(|_| OperationError::UnderlyingActionFailed)?;

        // The toggle may have been flipped while the record sat pending.
        if options.kind == CallKind::DelegateCall && !Self::delegate_enabled(env) {
            return Err(OperationError::DelegateCallDisabled);
        }

        let safe: Address = env
            .storage()
            .instance()
            .get(&SAFE)
            .ok_or(OperationError::NotInitialized)?;

        if let Some(guard) = Self::guard(env) {
            events::publish_guard_check(env, record.tx_id, &guard, &safe);
        }

        let data_hash: BytesN<32> = env.crypto().sha256(&options.call_data).into();
        events::publish_safe_call_dispatched(env, record.tx_id, &safe, &options, &data_hash);
        Ok(())
    }
}
