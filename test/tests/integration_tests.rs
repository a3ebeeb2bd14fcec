//! Cross-contract integration and property tests for the secure-operation
//! protocol.
//!
//! Tests cover:
//! - Independence of protocol state across contract instances
//! - Instance binding of meta-transactions (no cross-vault replay)
//! - Equivalence of direct and meta-relayed approval
//! - End-to-end role rotation including signing-key turnover
//! - Randomized action sequences against the protocol invariants

use proptest::prelude::*;
use soroban_sdk::testutils::Address as _;
use soroban_sdk::Address;

use common::{OperationError, TxStatus};
use test_framework::generators::{vault_action_sequence, VaultAction};
use test_framework::invariants::InvariantSet;
use test_framework::{MetaSigner, SafeHarness, TestEnv, VaultHarness};

const LOCK: u64 = 86_400;

// ── Instance independence ────────────────────────────────────────────────────

#[test]
fn vault_and_safe_keep_independent_protocol_state() {
    let env = TestEnv::new();
    let vault = VaultHarness::new(&env, LOCK);
    let safe = SafeHarness::new(&env, LOCK);

    // Each instance runs its own id sequence.
    let vault_tx = vault.request_withdrawal(100);
    let safe_tx = safe.request_call(1);
    assert_eq!(vault_tx, 1);
    assert_eq!(safe_tx, 1);

    env.advance_time(LOCK);
    vault.client.approve_operation(&vault.owner, &vault_tx);
    safe.client.approve_operation(&safe.owner, &safe_tx);

    assert_eq!(
        vault.client.get_transaction(&vault_tx).status,
        TxStatus::Completed
    );
    assert_eq!(
        safe.client.get_transaction(&safe_tx).status,
        TxStatus::Completed
    );
    assert_eq!(vault.client.get_operation_history(&0u64, &10u32).len(), 1);
    assert_eq!(safe.client.get_operation_history(&0u64, &10u32).len(), 1);
}

#[test]
fn meta_tx_is_bound_to_its_instance() {
    let env = TestEnv::new();
    let vault_a = VaultHarness::new(&env, LOCK);
    let vault_b = VaultHarness::new(&env, LOCK);

    let tx_id = vault_a.request_withdrawal(100);
    let unsigned = vault_a
        .client
        .unsigned_meta_tx_for_existing(&tx_id, &true, &1_000u64, &100u128);
    let meta = vault_a.owner_signer.sign(&env.env, &unsigned);

    // Relaying an instance-A payload through instance B is refused outright.
    let result = vault_b
        .client
        .try_approve_with_meta_tx(&vault_b.broadcaster, &meta);
    assert_eq!(result, Err(Ok(OperationError::InvalidInput)));

    // The intended instance still accepts it.
    let record = vault_a
        .client
        .approve_with_meta_tx(&vault_a.broadcaster, &meta);
    assert_eq!(record.status, TxStatus::Completed);
}

// ── Path equivalence ─────────────────────────────────────────────────────────

#[test]
fn direct_and_meta_approval_converge_on_the_same_state() {
    let env = TestEnv::new();
    let vault = VaultHarness::new(&env, LOCK);

    let direct_tx = vault.request_withdrawal(500);
    let meta_tx_id = vault.request_withdrawal(500);

    // Direct path: wait out the time-lock.
    env.advance_time(LOCK);
    vault.client.approve_operation(&vault.owner, &direct_tx);

    // Meta path: owner-signed approval relayed by the broadcaster.
    let unsigned = vault
        .client
        .unsigned_meta_tx_for_existing(&meta_tx_id, &true, &u64::MAX, &100u128);
    let meta = vault.owner_signer.sign(&env.env, &unsigned);
    vault.client.approve_with_meta_tx(&vault.broadcaster, &meta);

    // Same terminal status either way, and both transfers executed.
    assert_eq!(
        vault.client.get_transaction(&direct_tx).status,
        TxStatus::Completed
    );
    assert_eq!(
        vault.client.get_transaction(&meta_tx_id).status,
        TxStatus::Completed
    );
    assert_eq!(vault.balance(), 1_000_000 - 1_000);
}

// ── Role rotation ────────────────────────────────────────────────────────────

#[test]
fn ownership_rotation_turns_over_the_signing_key() {
    let env = TestEnv::new();
    let vault = VaultHarness::new(&env, LOCK);

    let new_owner = Address::generate(&env.env);
    let new_signer = MetaSigner::from_seed(21);

    // Recovery requests the transfer; the sitting owner approves it.
    let record = vault.client.request_ownership_transfer(
        &vault.recovery,
        &new_owner,
        &Some(new_signer.public_key(&env.env)),
    );
    env.advance_time(LOCK);
    vault.client.approve_operation(&vault.owner, &record.tx_id);
    assert_eq!(vault.client.get_owner(), new_owner);

    // The new owner's key now authorizes meta-transactions...
    let tx_id = vault.request_withdrawal_as(&new_owner, 100);
    let unsigned = vault
        .client
        .unsigned_meta_tx_for_existing(&tx_id, &true, &u64::MAX, &100u128);
    let meta = new_signer.sign(&env.env, &unsigned);
    let approved = vault.client.approve_with_meta_tx(&vault.broadcaster, &meta);
    assert_eq!(approved.status, TxStatus::Completed);

    // ...and the old key no longer does.
    let stale_tx = vault.request_withdrawal_as(&new_owner, 100);
    let unsigned = vault
        .client
        .unsigned_meta_tx_for_existing(&stale_tx, &true, &u64::MAX, &100u128);
    let stale = vault.owner_signer.sign(&env.env, &unsigned);
    let result = vault
        .client
        .try_approve_with_meta_tx(&vault.broadcaster, &stale);
    assert_eq!(result, Err(Ok(OperationError::InvalidSignature)));
}

// ── Property tests ───────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Random interleavings of request/approve/cancel/time-advance never
    /// violate the protocol's core invariants, whatever order they land in
    /// and whether or not the individual actions succeed.
    #[test]
    fn random_action_sequences_preserve_protocol_invariants(
        actions in vault_action_sequence(24)
    ) {
        let env = TestEnv::new();
        let vault = VaultHarness::new(&env, LOCK);
        let invariants = InvariantSet::protocol_core();

        let mut created: Vec<u64> = Vec::new();
        let mut before = vault.snapshot();

        for action in actions {
            match action {
                VaultAction::RequestWithdrawal { amount } => {
                    created.push(vault.request_withdrawal(amount));
                }
                VaultAction::Approve { record_index } => {
                    if !created.is_empty() {
                        let tx_id = created[record_index % created.len()];
                        // May fail (time-lock, already settled); only the
                        // invariants matter here.
                        let _ = vault.client.try_approve_operation(&vault.owner, &tx_id);
                    }
                }
                VaultAction::Cancel { record_index } => {
                    if !created.is_empty() {
                        let tx_id = created[record_index % created.len()];
                        let _ = vault.client.try_cancel_operation(&vault.owner, &tx_id);
                    }
                }
                VaultAction::AdvanceTime { delta } => {
                    env.advance_time(delta);
                }
            }

            let after = vault.snapshot();
            let violations = invariants.check_transition(&before, &after);
            prop_assert!(violations.is_empty(), "violations: {:?}", violations);
            before = after;
        }
    }

    /// A record approved at or past its release time completes; one approved
    /// even a second early is always refused with `TimeLockNotElapsed`.
    #[test]
    fn approval_boundary_is_exact(early_by in 1u64..LOCK) {
        let env = TestEnv::new();
        let vault = VaultHarness::new(&env, LOCK);

        let tx_id = vault.request_withdrawal(10);
        env.advance_time(LOCK - early_by);

        let result = vault.client.try_approve_operation(&vault.owner, &tx_id);
        prop_assert_eq!(result, Err(Ok(OperationError::TimeLockNotElapsed)));

        env.advance_time(early_by);
        let record = vault.client.approve_operation(&vault.owner, &tx_id);
        prop_assert_eq!(record.status, TxStatus::Completed);
    }
}
