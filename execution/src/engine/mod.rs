//! Round engine.
//!
//! The engine owns the current round, the liquidity pool and the vault, and exposes every
//! operation as a method that takes the calling account, runs to completion and returns the
//! events it produced. A failed operation returns an error and leaves state untouched: each
//! handler validates fully before its first mutation.
//!
//! ## Round Lifecycle
//!
//! ```text
//! Idle --first bet--> Betting --start block--> InProgress --reveal--> Idle (next commit)
//!                                                  |
//!                                                  +--source stops serving start--> Expired --refund--> Idle
//! ```

use std::sync::Arc;

use crashpool_types::{
    Account, Bet, EngineError, Hash, LiquidityChange, RoundPhase, RoundSnapshot, ZERO_HASH,
};
use tracing::info;

use crate::{
    loot_table::{validate_loot_table, LootTable},
    pool::LiquidityPool,
    randomness::RandomnessSource,
    vault::{Vault, Wallets},
    EngineConfig,
};

mod handlers;
mod state;

pub use state::{phase_at, RoundState};


pub struct Engine<R, W> {
    owner: Account,
    hash_producer: Account,
    max_bets_per_round: usize,
    round: RoundState,
    pool: LiquidityPool,
    vault: Vault<W>,
    source: R,
}

impl<R: RandomnessSource, W: Wallets> Engine<R, W> {
    /// Create an engine armed with `committed_hash` for its first round.
    pub fn new(
        config: EngineConfig,
        owner: Account,
        hash_producer: Account,
        committed_hash: Hash,
        loot_table: Arc<dyn LootTable>,
        source: R,
        wallets: W,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        check_loot_table(loot_table.as_ref(), &source)?;
        info!(
            loot_table = loot_table.name(),
            length = loot_table.length(),
            max_bets = config.max_bets_per_round,
            "engine initialized"
        );

        Ok(Self {
            owner,
            hash_producer,
            max_bets_per_round: config.max_bets_per_round,
            round: RoundState::new(&config, committed_hash, loot_table),
            pool: LiquidityPool::new(&config),
            vault: Vault::new(wallets),
            source,
        })
    }

    // === Accessors ===

    pub fn owner(&self) -> &Account {
        &self.owner
    }

    pub fn hash_producer(&self) -> &Account {
        &self.hash_producer
    }

    pub fn round(&self) -> &RoundState {
        &self.round
    }

    pub fn pool(&self) -> &LiquidityPool {
        &self.pool
    }

    pub fn vault(&self) -> &Vault<W> {
        &self.vault
    }

    pub fn source(&self) -> &R {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }

    pub fn wallets_mut(&mut self) -> &mut W {
        self.vault.wallets_mut()
    }

    // === Reads ===

    pub fn phase(&self) -> RoundPhase {
        let start_block = self.round.start_block;
        phase_at(
            start_block,
            self.source.current_block(),
            self.source.is_available(start_block),
        )
    }

    pub fn snapshot(&self) -> RoundSnapshot {
        let round = &self.round;
        let table = round.effective_loot_table();
        let current = self.source.current_block();
        let phase = self.phase();

        let observed = if round.is_idle() {
            0
        } else {
            current.saturating_sub(round.start_block).min(table.length())
        };
        let block_hashes = if phase == RoundPhase::Expired {
            vec![ZERO_HASH; observed as usize]
        } else {
            (0..observed)
                .map(|offset| {
                    self.source
                        .sample_at(round.start_block, offset)
                        .unwrap_or(ZERO_HASH)
                })
                .collect()
        };

        RoundSnapshot {
            active: round.active,
            hash_index: round.hash_index,
            phase,
            start_block: round.start_block,
            current_block: current,
            loot_table: table.name().to_string(),
            loot_table_length: table.length(),
            minimum: round.minimum,
            available_liquidity: self.pool.available(),
            committed_hash: round.committed_hash,
            bets: round.bets.clone(),
            block_hashes,
        }
    }

    /// Bets of `account` in the current round, with their indices.
    pub fn bets_of(&self, account: &Account) -> Vec<(usize, &Bet)> {
        self.round
            .bets
            .iter()
            .enumerate()
            .filter(|(_, bet)| &bet.owner == account)
            .collect()
    }

    pub fn shares_of(&self, account: &Account) -> u64 {
        self.pool.shares_of(account)
    }

    pub fn liquidity_queue(&self) -> &[LiquidityChange] {
        self.pool.queue()
    }

    pub fn claimable(&self, account: &Account) -> u64 {
        self.vault.claimable(account)
    }

    /// Whether the vault holds exactly what the engine owes.
    ///
    /// `vault == pool value + round stakes + queued deposits + staged credit`, and the round's
    /// reservations fit within its cap.
    pub fn is_solvent(&self) -> bool {
        let owed = self.pool.value() as u128
            + self.round.escrowed as u128
            + self.pool.pending_deposits() as u128
            + self.vault.total_claimable() as u128;
        owed == self.vault.balance() as u128 && self.pool.reserved() <= self.pool.round_cap()
    }

    // === Internals ===

    fn check_owner(&self, caller: &Account) -> Result<(), EngineError> {
        if caller != &self.owner {
            return Err(EngineError::NotOwner);
        }
        Ok(())
    }
}

/// A table is usable only if its whole track fits in the randomness retention window.
fn check_loot_table(table: &dyn LootTable, source: &impl RandomnessSource) -> Result<(), EngineError> {
    validate_loot_table(table)?;
    if table.length() > source.retention() {
        return Err(EngineError::InvalidLootTable("track longer than retention window"));
    }
    Ok(())
}
