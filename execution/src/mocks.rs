//! Deterministic collaborators for tests and the simulator.

use std::collections::{BTreeMap, BTreeSet};

use commonware_cryptography::{ed25519::PrivateKey, sha256::Sha256, Hasher, Signer};
use crashpool_types::{Account, EngineError, Hash};

use crate::{randomness::RandomnessSource, vault::Wallets};

/// Creates an account identity from a seed
pub fn create_account(seed: u64) -> Account {
    PrivateKey::from_seed(seed).public_key()
}

/// Block hash oracle with hashes `sha256(domain || height)`.
#[derive(Clone, Debug)]
pub struct MockChain {
    domain: u64,
    height: u64,
    retention: u64,
}

impl MockChain {
    pub fn new(domain: u64, retention: u64) -> Self {
        Self {
            domain,
            height: 1,
            retention,
        }
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn set_height(&mut self, height: u64) {
        self.height = height;
    }

    pub fn advance(&mut self, blocks: u64) {
        self.height = self.height.saturating_add(blocks);
    }

    /// Hash of `height`, regardless of retention.
    pub fn hash_of(&self, height: u64) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(&self.domain.to_be_bytes());
        hasher.update(&height.to_be_bytes());
        hasher.finalize().0
    }
}

impl RandomnessSource for MockChain {
    fn current_block(&self) -> u64 {
        self.height
    }

    fn retention(&self) -> u64 {
        self.retention
    }

    fn sample_at(&self, anchor: u64, offset: u64) -> Option<Hash> {
        let block = anchor.checked_add(offset)?;
        if block >= self.height || self.height - block > self.retention {
            return None;
        }
        Some(self.hash_of(block))
    }
}

/// In-memory balances with a set of accounts that refuse incoming transfers.
#[derive(Clone, Debug, Default)]
pub struct MockWallets {
    balances: BTreeMap<Account, u64>,
    refusing: BTreeSet<Account>,
}

impl MockWallets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fund(&mut self, account: &Account, amount: u64) {
        let balance = self.balances.entry(account.clone()).or_default();
        *balance = balance.saturating_add(amount);
    }

    pub fn refuse(&mut self, account: &Account) {
        self.refusing.insert(account.clone());
    }

    pub fn accept(&mut self, account: &Account) {
        self.refusing.remove(account);
    }

    /// Sum of every wallet balance.
    pub fn total(&self) -> u128 {
        self.balances.values().map(|balance| *balance as u128).sum()
    }
}

impl Wallets for MockWallets {
    fn balance(&self, account: &Account) -> u64 {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn collect(&mut self, from: &Account, amount: u64) -> Result<(), EngineError> {
        let balance = self.balance(from);
        if balance < amount {
            return Err(EngineError::InsufficientFunds {
                requested: amount,
                balance,
            });
        }
        self.balances.insert(from.clone(), balance - amount);
        Ok(())
    }

    fn transfer(&mut self, to: &Account, amount: u64) -> Result<(), EngineError> {
        if self.refusing.contains(to) {
            return Err(EngineError::TransferRefused { amount });
        }
        self.fund(to, amount);
        Ok(())
    }
}
