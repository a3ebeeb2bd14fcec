#![no_std]

//! # SimpleVault
//!
//! A token vault whose privileged actions all flow through the secure
//! multi-phase operation protocol:
//!
//! - **Two-phase path**: the owner requests a withdrawal, waits out the
//!   time-lock, then approves it; the approval executes the transfer.
//! - **Meta-transaction path**: the owner signs a payload off-chain and the
//!   registered broadcaster relays it, either completing a brand-new
//!   withdrawal in one step or acting on an existing pending record.
//! - **Ownership operations**: owner, broadcaster, recovery, and the
//!   time-lock period are themselves changed only through the same protocol.
//!
//! Deposits are unprivileged; everything that moves value out or changes
//! configuration is a [`TxRecord`] with a full audit trail.

mod events;


use common::{engine, meta_tx, nonce, record, registry, roles, OperationError};
use common::{
    MetaTransaction, MetaTxAction, OperationPhase, OperationType, PhaseRoles, Role,
    RoleChangeOptions, TimeLockChangeOptions, TxRecord, UnsignedMetaTx,
};
use soroban_sdk::xdr::{FromXdr, ToXdr};
use soroban_sdk::{
    contract, contractimpl, contracttype, symbol_short, token, Address, BytesN, Env, Symbol, Vec,
};

// ── Storage keys ─────────────────────────────────────────────────────────────

const INIT: Symbol = symbol_short!("INIT");

// ── Operation catalog ────────────────────────────────────────────────────────

/// Cancellation guard for withdrawals: 1 hour. Cancelling earlier would let
/// a requester erase the record before watchers can react to it.
const WITHDRAWAL_CANCEL_GUARD_SECS: u64 = 3_600;

pub fn withdraw_token_op(env: &Env) -> Symbol {
    Symbol::new(env, "WITHDRAW_TOKEN")
}

/// Execution options for a token withdrawal, XDR-encoded into the record.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WithdrawalOptions {
    pub token: Address,
    pub recipient: Address,
    pub amount: i128,
}

// ── Contract ─────────────────────────────────────────────────────────────────

#[contract]
pub struct SimpleVaultContract;

#[contractimpl]
impl SimpleVaultContract {
    // ── Initialisation ────────────────────────────────────────────────────────

    /// Bootstrap the vault.
    ///
    /// * `owner_signing_key` — the owner's secp256k1 public key (65-byte
    ///   uncompressed), the meta-transaction signing identity.
    /// * `time_lock_secs`   — delay between request and approval
    ///   eligibility, bounded to [1 hour, 90 days].
    ///
    /// The three role addresses must be distinct. The operation catalog is
    /// fixed here and never mutated afterwards.
    pub fn initialize(
        env: Env,
        owner: Address,
        broadcaster: Address,
        recovery: Address,
        owner_signing_key: BytesN<65>,
        time_lock_secs: u64,
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

        registry::install_standard_operations(&env)?;
        registry::register(
            &env,
            withdraw_token_op(&env),
            PhaseRoles::owner_all(),
            WITHDRAWAL_CANCEL_GUARD_SECS,
            Vec::from_array(&env, [Symbol::new(&env, "request_withdrawal")]),
        )?;

        env.storage().instance().set(&INIT, &true);
        events::publish_initialized(&env, &owner, &broadcaster, &recovery, time_lock_secs);
        Ok(())
    }

    // ── Funding ───────────────────────────────────────────────────────────────

    /// Move tokens into the vault. Anyone may fund it.
    pub fn deposit(
        env: Env,
        from: Address,
        token: Address,
        amount: i128,
    ) -> Result<(), OperationError> {
        Self::require_init(&env)?;
        from.require_auth();
        if amount <= 0 {
            return Err(OperationError::InvalidInput);
        }
        token::Client::new(&env, &token).transfer(
            &from,
            &env.current_contract_address(),
            &amount,
        );
        events::publish_deposit(&env, &from, &token, amount);
        Ok(())
    }

    // ── Two-phase operations ──────────────────────────────────────────────────

    /// Request a token withdrawal. Owner only; approval becomes possible
    /// once the time-lock elapses.
    pub fn request_withdrawal(
        env: Env,
        caller: Address,
        token: Address,
        recipient: Address,
        amount: i128,
    ) -> Result<TxRecord, OperationError> {
        Self::require_init(&env)?;
        caller.require_auth();
        if amount <= 0 {
            return Err(OperationError::InvalidInput);
        }

        let options = WithdrawalOptions {
            token: token.clone(),
            recipient,
            amount,
        };
        let record = engine::request(
            &env,
            &caller,
            &withdraw_token_op(&env),
            &token,
            amount,
            options.to_xdr(&env),
        )?;
        events::publish_operation_requested(&env, &record);
        Ok(record)
    }

    /// Hand ownership to a new address. Requested by the recovery role —
    /// this is its path back in after owner key loss — and approved by the
    /// current owner.
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

    /// Queue a change of the time-lock period itself. Bounds are checked at
    /// request time so a doomed change is refused before it sits pending.
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

    /// Approve any pending operation after its time-lock, executing its
    /// underlying action. A failed action aborts the whole call and leaves
    /// the record pending.
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

    /// Cancel any pending operation, subject to its type's guard window.
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

    /// Build the unsigned meta-transaction for a brand-new withdrawal.
    /// Pure read; the returned `message` is exactly what the owner signs.
    pub fn unsigned_withdrawal_meta_tx(
        env: Env,
        token: Address,
        recipient: Address,
        amount: i128,
        deadline: u64,
        max_gas_price: u128,
    ) -> Result<UnsignedMetaTx, OperationError> {
        Self::require_init(&env)?;
        if amount <= 0 {
            return Err(OperationError::InvalidInput);
        }
        let owner =
            roles::role_address(&env, &Role::Owner).ok_or(OperationError::NotInitialized)?;
        let options = WithdrawalOptions {
            token: token.clone(),
            recipient,
            amount,
        };
        Ok(meta_tx::unsigned_for_new(
            &env,
            &owner,
            &withdraw_token_op(&env),
            &token,
            amount,
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

    /// Relay an owner-signed approval of an existing pending record.
    /// Broadcaster only; the signature substitutes for the time-lock wait.
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

    /// Relay an owner-signed cancellation of an existing pending record.
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

    /// Relay an owner-signed brand-new operation, completing it in one
    /// atomic step with no time-lock wait.
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

    pub fn get_meta_nonce(env: Env, signer: Address) -> u64 {
        nonce::current(&env, &signer)
    }

    pub fn get_balance(env: Env, token: Address) -> i128 {
        token::Client::new(&env, &token).balance(&env.current_contract_address())
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

        if record.operation_type == withdraw_token_op(env) {
            let options = WithdrawalOptions::from_xdr(env, &record.execution_options)
                .map_err(|_| OperationError::UnderlyingActionFailed)?;
            let client = token::Client::new(env, &options.token);
            match client.try_transfer(
                &env.current_contract_address(),
                &options.recipient,
                &options.amount,
            ) {
                Ok(Ok(())) => {}
                _ => return Err(OperationError::UnderlyingActionFailed),
            }
            events::publish_withdrawal_executed(env, record, &options);
            return Ok(());
        }

        Err(OperationError::UnknownOperationType)
    }
}
