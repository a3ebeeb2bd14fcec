#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use soroban_sdk::testutils::{Address as _, Ledger};
use soroban_sdk::{Address, BytesN, Env};

use common::TxStatus;
use simple_vault::{SimpleVaultContract, SimpleVaultContractClient};

/// Actions modelling the vault's protocol entry points.
///
/// Values are bounded to realistic ranges to avoid wasting fuzz cycles on
/// trivially rejected inputs; record indices resolve modulo the ids created
/// so far.
#[derive(Arbitrary, Debug)]
pub enum FuzzAction {
    RequestWithdrawal { amount: u32 },
    Approve { index: u8 },
    Cancel { index: u8 },
    AdvanceTime { delta: u32 },
}

fuzz_target!(|actions: Vec<FuzzAction>| {
    let env = Env::default();
    env.mock_all_auths();

    let contract_id = env.register(SimpleVaultContract, ());
    let client = SimpleVaultContractClient::new(&env, &contract_id);

    let owner = Address::generate(&env);
    let broadcaster = Address::generate(&env);
    let recovery = Address::generate(&env);

    if client
        .try_initialize(
            &owner,
            &broadcaster,
            &recovery,
            &BytesN::from_array(&env, &[4u8; 65]),
            &86_400u64,
        )
        .is_err()
    {
        return;
    }

    let sac = env.register_stellar_asset_contract_v2(Address::generate(&env));
    let token = sac.address();
    soroban_sdk::token::StellarAssetClient::new(&env, &token)
        .mint(&contract_id, &1_000_000_000i128);

    let recipient = Address::generate(&env);
    let mut created: Vec<u64> = Vec::new();

    // ── Invariant: settled records never change status again ──
    // We track every terminal status and re-check it after each action.
    let mut terminal: Vec<(u64, TxStatus)> = Vec::new();

    for action in actions {
        match action {
            FuzzAction::RequestWithdrawal { amount } => {
                let amount = i128::from(amount % 10_000) + 1;
                if let Ok(Ok(record)) =
                    client.try_request_withdrawal(&owner, &token, &recipient, &amount)
                {
                    created.push(record.tx_id);
                }
            }
            FuzzAction::Approve { index } => {
                if !created.is_empty() {
                    let tx_id = created[index as usize % created.len()];
                    let _ = client.try_approve_operation(&owner, &tx_id);
                }
            }
            FuzzAction::Cancel { index } => {
                if !created.is_empty() {
                    let tx_id = created[index as usize % created.len()];
                    let _ = client.try_cancel_operation(&owner, &tx_id);
                }
            }
            FuzzAction::AdvanceTime { delta } => {
                env.ledger().with_mut(|l| {
                    l.timestamp = l.timestamp.saturating_add(u64::from(delta));
                });
            }
        }

        for (tx_id, status) in &terminal {
            let now = client.get_transaction(tx_id);
            assert_eq!(
                now.status, *status,
                "terminal record {tx_id} changed status"
            );
        }
        for tx_id in &created {
            let record = client.get_transaction(tx_id);
            if record.status != TxStatus::Pending
                && !terminal.iter().any(|(id, _)| id == tx_id)
            {
                terminal.push((*tx_id, record.status));
            }
        }
    }
});
