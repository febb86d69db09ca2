//! Round state and phase derivation.
//!
//! ## Phases
//!
//! A round progresses through four phases, all derived from `start_block` and the current
//! block height (no stored phase to drift out of sync):
//! 1. **Idle** - No round scheduled (`start_block == 0`); the next bet schedules one
//! 2. **Betting** - Bets may be placed, updated and cancelled until the track starts
//! 3. **InProgress** - The track is running; bets may only cash out downward
//! 4. **Expired** - The randomness source no longer serves the start block; only a refund can
//!    settle

use std::sync::Arc;

use crashpool_types::{Account, Bet, EngineError, Hash, RoundPhase};

use crate::{loot_table::LootTable, EngineConfig};

/// Phase of a round scheduled at `start_block` when the chain is at `current`.
///
/// `available` is the randomness source's verdict on `start_block`; reveal and refund gate on
/// the same predicate, so exactly one of them is open once the track has started.
pub fn phase_at(start_block: u64, current: u64, available: bool) -> RoundPhase {
    if start_block == 0 {
        RoundPhase::Idle
    } else if current < start_block {
        RoundPhase::Betting
    } else if !available {
        RoundPhase::Expired
    } else {
        RoundPhase::InProgress
    }
}

/// Everything about the current round. `start_block == 0` iff `bets` is empty.
#[derive(Clone, Debug)]
pub struct RoundState {
    pub committed_hash: Hash,
    /// Advances only on a successful reveal.
    pub hash_index: u64,
    pub start_block: u64,
    pub intro_blocks: u64,
    pub reduced_intro_blocks: u64,
    pub active: bool,
    pub loot_table: Arc<dyn LootTable>,
    /// Promoted when the next round is scheduled.
    pub staged_loot_table: Option<Arc<dyn LootTable>>,
    pub cancel_return_bps: u16,
    pub minimum: u64,
    pub bets: Vec<Bet>,
    /// Stakes held for the round, net of cancellation refunds.
    pub escrowed: u64,
}

impl RoundState {
    pub fn new(config: &EngineConfig, committed_hash: Hash, loot_table: Arc<dyn LootTable>) -> Self {
        Self {
            committed_hash,
            hash_index: 0,
            start_block: 0,
            intro_blocks: config.intro_blocks,
            reduced_intro_blocks: config.reduced_intro_blocks,
            active: true,
            loot_table,
            staged_loot_table: None,
            cancel_return_bps: config.cancel_return_bps,
            minimum: config.minimum,
            bets: Vec::new(),
            escrowed: 0,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.start_block == 0
    }

    /// The table the next bet will be priced with.
    pub fn effective_loot_table(&self) -> &Arc<dyn LootTable> {
        match &self.staged_loot_table {
            Some(staged) if self.is_idle() => staged,
            _ => &self.loot_table,
        }
    }

    /// Look up a live bet owned by `caller`.
    pub fn owned_bet(&self, caller: &Account, index: usize) -> Result<&Bet, EngineError> {
        let bet = self
            .bets
            .get(index)
            .ok_or(EngineError::UnknownBet { index })?;
        if &bet.owner != caller {
            return Err(EngineError::NotBetOwner { index });
        }
        if bet.cancelled {
            return Err(EngineError::BetCancelled { index });
        }
        Ok(bet)
    }

    /// Drop every bet and return to idle.
    pub fn reset(&mut self) {
        self.bets.clear();
        self.escrowed = 0;
        self.start_block = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loot_table::FixedLootTable;
    use crate::mocks::create_account;
    use crashpool_types::UNIT;

    fn test_state() -> RoundState {
        let table = FixedLootTable::with_death_at(10, 2 * UNIT, 5).unwrap();
        RoundState::new(&EngineConfig::default(), [1u8; 32], Arc::new(table))
    }

    #[test]
    fn test_phase_idle_without_start() {
        assert_eq!(phase_at(0, 0, true), RoundPhase::Idle);
        assert_eq!(phase_at(0, 1_000_000, false), RoundPhase::Idle);
    }

    #[test]
    fn test_phase_boundaries() {
        assert_eq!(phase_at(100, 99, true), RoundPhase::Betting);
        assert_eq!(phase_at(100, 99, false), RoundPhase::Betting);
        assert_eq!(phase_at(100, 100, true), RoundPhase::InProgress);
        assert_eq!(phase_at(100, 356, true), RoundPhase::InProgress);
        assert_eq!(phase_at(100, 357, false), RoundPhase::Expired);
    }

    #[test]
    fn test_effective_table_prefers_staged_only_when_idle() {
        let mut state = test_state();
        let staged: Arc<dyn LootTable> =
            Arc::new(FixedLootTable::with_death_at(20, 3 * UNIT, 5).unwrap());
        state.staged_loot_table = Some(staged);

        assert_eq!(state.effective_loot_table().length(), 20);
        state.start_block = 50;
        assert_eq!(state.effective_loot_table().length(), 10);
    }

    #[test]
    fn test_owned_bet_checks() {
        let alice = create_account(1);
        let bob = create_account(2);
        let mut state = test_state();
        state.start_block = 10;
        state.bets.push(Bet::new(alice.clone(), 5, 2));
        state.bets.push(Bet {
            cancelled: true,
            ..Bet::new(alice.clone(), 5, 2)
        });

        assert!(state.owned_bet(&alice, 0).is_ok());
        assert_eq!(
            state.owned_bet(&bob, 0),
            Err(EngineError::NotBetOwner { index: 0 })
        );
        assert_eq!(
            state.owned_bet(&alice, 1),
            Err(EngineError::BetCancelled { index: 1 })
        );
        assert_eq!(
            state.owned_bet(&alice, 2),
            Err(EngineError::UnknownBet { index: 2 })
        );

        state.reset();
        assert!(state.is_idle());
        assert!(state.bets.is_empty());
    }
}
