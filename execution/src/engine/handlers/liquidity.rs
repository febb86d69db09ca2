use crashpool_types::{Account, EngineError, Event};
use tracing::debug;

use crate::{engine::Engine, randomness::RandomnessSource, vault::Wallets};

impl<R: RandomnessSource, W: Wallets> Engine<R, W> {
    // === Liquidity Handlers ===

    /// Add `amount` to the pool; queued until settlement while a round is scheduled.
    pub fn deposit(&mut self, caller: &Account, amount: u64) -> Result<Vec<Event>, EngineError> {
        self.pool.deposit(&mut self.vault, caller, amount)
    }

    /// Redeem `shares`; queued until settlement while a round is scheduled.
    pub fn withdraw(&mut self, caller: &Account, shares: u64) -> Result<Vec<Event>, EngineError> {
        self.pool.withdraw(&mut self.vault, caller, shares)
    }

    /// Pull a payment that was staged because the caller refused it.
    pub fn claim(&mut self, caller: &Account) -> Result<Vec<Event>, EngineError> {
        let amount = self.vault.claim(caller)?;
        debug!(amount, "staged payment claimed");
        Ok(vec![Event::Claimed {
            account: caller.clone(),
            amount,
        }])
    }
}
