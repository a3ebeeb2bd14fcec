//! # Bastion Contract Testing Framework
//!
//! A reusable testing harness for the secure-operation contract suite,
//! supporting property-based testing, protocol invariant checking, and
//! off-chain meta-transaction signing.
//!
//! ## Architecture
//!
//! ```text
//! test/framework/
//! ├── mod.rs             — Core TestEnv, harnesses, signing helpers
//! ├── generators.rs      — Property-based test value generators
//! └── invariants.rs      — Protocol invariant definitions & verification
//! ```

extern crate std;


use k256::ecdsa::SigningKey;
use soroban_sdk::{
    testutils::{Address as _, Ledger as _},
    token::StellarAssetClient,
    Address, Bytes, BytesN, Env,
};

use common::{MetaTransaction, TxRecord, UnsignedMetaTx};
use guardian_safe::{CallKind, GuardianSafeContract, GuardianSafeContractClient};
use simple_vault::{SimpleVaultContract, SimpleVaultContractClient};

// ── Core Test Environment ────────────────────────────────────────────────────

/// A high-level test environment that wraps the Soroban `Env` and provides
/// contract deployment, time control, and address management.
pub struct TestEnv {
    pub env: Env,
    generated_addresses: std::vec::Vec<Address>,
}

impl TestEnv {
    /// Create a new test environment with all auth mocked.
    pub fn new() -> Self {
        let env = Env::default();
        env.mock_all_auths();
        Self {
            env,
            generated_addresses: std::vec::Vec::new(),
        }
    }

    /// Generate a fresh Soroban address (cached for re-use).
    pub fn generate_address(&mut self) -> Address {
        let addr = Address::generate(&self.env);
        self.generated_addresses.push(addr.clone());
        addr
    }

    /// Set the ledger timestamp.
    pub fn set_timestamp(&self, ts: u64) {
        self.env.ledger().set_timestamp(ts);
    }

    /// Advance the ledger timestamp by `delta` seconds.
    pub fn advance_time(&self, delta: u64) {
        let current = self.env.ledger().timestamp();
        self.env.ledger().set_timestamp(current.saturating_add(delta));
    }

    /// Current ledger timestamp.
    pub fn timestamp(&self) -> u64 {
        self.env.ledger().timestamp()
    }

    /// Deploy a SAC token contract and return its address.
    pub fn deploy_token(&self) -> Address {
        self.env
            .register_stellar_asset_contract_v2(Address::generate(&self.env))
            .address()
    }

    /// Mint tokens from a SAC token to a recipient.
    pub fn mint_tokens(&self, token: &Address, recipient: &Address, amount: i128) {
        StellarAssetClient::new(&self.env, token).mint(recipient, &amount);
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

// ── Meta-Transaction Signer ──────────────────────────────────────────────────

/// An off-chain signing identity: a secp256k1 key pair whose public key is
/// registered on-chain as a role's meta-transaction identity.
pub struct MetaSigner {
    key: SigningKey,
}

impl MetaSigner {
    /// Deterministic signer from a non-zero seed byte.
    pub fn from_seed(seed: u8) -> Self {
        let key = SigningKey::from_bytes(&[seed; 32].into())
            .expect("seed is a valid scalar");
        Self { key }
    }

    /// The 65-byte uncompressed public key, as stored on-chain.
    pub fn public_key(&self, env: &Env) -> BytesN<65> {
        let point = self.key.verifying_key().to_encoded_point(false);
        let mut pk = [0u8; 65];
        pk.copy_from_slice(point.as_bytes());
        BytesN::from_array(env, &pk)
    }

    /// Sign an unsigned meta-transaction's message, exactly as returned.
    pub fn sign(&self, env: &Env, unsigned: &UnsignedMetaTx) -> MetaTransaction {
        let (sig, rid) = self
            .key
            .sign_prehash_recoverable(&unsigned.message.to_array())
            .expect("prehash signing cannot fail for a valid key");
        let mut raw = [0u8; 64];
        raw.copy_from_slice(&sig.to_bytes());
        MetaTransaction {
            payload: unsigned.payload.clone(),
            signature: BytesN::from_array(env, &raw),
            recovery_id: rid.to_byte() as u32,
        }
    }
}

// ── Vault Harness ────────────────────────────────────────────────────────────

/// Pre-wired SimpleVault fixture: deployed, initialized, and funded.
///
/// Takes the environment by shared reference so several harnesses (a vault
/// and a safe, or two vaults) can coexist in one ledger.
pub struct VaultHarness<'a> {
    pub env: &'a TestEnv,
    pub client: SimpleVaultContractClient<'static>,
    pub contract_id: Address,
    pub owner: Address,
    pub broadcaster: Address,
    pub recovery: Address,
    pub owner_signer: MetaSigner,
    pub token: Address,
}

impl<'a> VaultHarness<'a> {
    /// Deploy and initialize a vault with the given time-lock, funding it
    /// with 1 million tokens.
    pub fn new(env: &'a TestEnv, time_lock_secs: u64) -> Self {
        let contract_id = env.env.register(SimpleVaultContract, ());
        let client = SimpleVaultContractClient::new(&env.env, &contract_id);

        let owner = Address::generate(&env.env);
        let broadcaster = Address::generate(&env.env);
        let recovery = Address::generate(&env.env);
        let owner_signer = MetaSigner::from_seed(7);

        client.initialize(
            &owner,
            &broadcaster,
            &recovery,
            &owner_signer.public_key(&env.env),
            &time_lock_secs,
        );

        let token = env.deploy_token();
        env.mint_tokens(&token, &contract_id, &1_000_000i128);

        Self {
            env,
            client,
            contract_id,
            owner,
            broadcaster,
            recovery,
            owner_signer,
            token,
        }
    }

    /// Request a withdrawal to a fresh recipient, returning the record id.
    pub fn request_withdrawal(&self, amount: i128) -> u64 {
        self.request_withdrawal_as(&self.owner, amount)
    }

    /// Request a withdrawal as an explicit caller, for tests that rotate the
    /// owner role mid-scenario.
    pub fn request_withdrawal_as(&self, caller: &Address, amount: i128) -> u64 {
        let recipient = Address::generate(&self.env.env);
        self.client
            .request_withdrawal(caller, &self.token, &recipient, &amount)
            .tx_id
    }

    /// Vault's current token balance.
    pub fn balance(&self) -> i128 {
        self.client.get_balance(&self.token)
    }

    /// Snapshot of all observable protocol state for invariant checking.
    pub fn snapshot(&self) -> ProtocolSnapshot {
        let records: std::vec::Vec<TxRecord> = self
            .client
            .get_operation_history(&0u64, &u32::MAX)
            .iter()
            .collect();
        ProtocolSnapshot {
            timestamp: self.env.timestamp(),
            records,
            balance: self.balance(),
        }
    }
}

// ── Safe Harness ─────────────────────────────────────────────────────────────

/// Pre-wired GuardianSafe fixture wrapping a fresh safe address.
pub struct SafeHarness<'a> {
    pub env: &'a TestEnv,
    pub client: GuardianSafeContractClient<'static>,
    pub contract_id: Address,
    pub owner: Address,
    pub broadcaster: Address,
    pub recovery: Address,
    pub owner_signer: MetaSigner,
    pub safe: Address,
}

impl<'a> SafeHarness<'a> {
    pub fn new(env: &'a TestEnv, time_lock_secs: u64) -> Self {
        let contract_id = env.env.register(GuardianSafeContract, ());
        let client = GuardianSafeContractClient::new(&env.env, &contract_id);

        let owner = Address::generate(&env.env);
        let broadcaster = Address::generate(&env.env);
        let recovery = Address::generate(&env.env);
        let safe = Address::generate(&env.env);
        let owner_signer = MetaSigner::from_seed(9);

        client.initialize(
            &owner,
            &broadcaster,
            &recovery,
            &owner_signer.public_key(&env.env),
            &time_lock_secs,
            &safe,
        );

        Self {
            env,
            client,
            contract_id,
            owner,
            broadcaster,
            recovery,
            owner_signer,
            safe,
        }
    }

    /// Queue a plain (non-delegate) safe call, returning the record id.
    pub fn request_call(&self, value: i128) -> u64 {
        let to = Address::generate(&self.env.env);
        self.client
            .request_safe_tx(
                &self.owner,
                &to,
                &value,
                &CallKind::Call,
                &Bytes::from_array(&self.env.env, &[0xFE, 0xED]),
            )
            .tx_id
    }

    pub fn snapshot(&self) -> ProtocolSnapshot {
        let records: std::vec::Vec<TxRecord> = self
            .client
            .get_operation_history(&0u64, &u32::MAX)
            .iter()
            .collect();
        ProtocolSnapshot {
            timestamp: self.env.timestamp(),
            records,
            balance: 0,
        }
    }
}

// ── Protocol Snapshot ────────────────────────────────────────────────────────

/// Immutable snapshot of a protected contract's protocol state at a point in
/// time, used by invariant checkers for O(1) before/after comparisons.
#[derive(Debug, Clone)]
pub struct ProtocolSnapshot {
    pub timestamp: u64,
    pub records: std::vec::Vec<TxRecord>,
    pub balance: i128,
}

impl ProtocolSnapshot {
    pub fn record(&self, tx_id: u64) -> Option<&TxRecord> {
        self.records.iter().find(|r| r.tx_id == tx_id)
    }
}
