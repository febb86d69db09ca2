use crashpool_types::{Account, Bet, EngineError, Event, RoundPhase, BASIS_POINTS_SCALE};
use tracing::{debug, info};

use crate::{engine::Engine, randomness::RandomnessSource, vault::Wallets};

/// First block of a track scheduled `delay` blocks after `current`.
///
/// Never 0, which marks an idle round.
fn schedule_start(current: u64, delay: u64) -> Option<u64> {
    current.checked_add(delay).map(|start| start.max(1))
}

impl<R: RandomnessSource, W: Wallets> Engine<R, W> {
    // === Betting Handlers ===

    /// Stake `amount` on the track surviving past `cashout_index`.
    ///
    /// The first bet of a round schedules it `intro_blocks` ahead.
    pub fn place_bet(
        &mut self,
        caller: &Account,
        amount: u64,
        cashout_index: u64,
    ) -> Result<Vec<Event>, EngineError> {
        if !self.round.active {
            return Err(EngineError::Inactive);
        }
        if amount < self.round.minimum {
            return Err(EngineError::BelowMinimum {
                got: amount,
                min: self.round.minimum,
            });
        }
        match self.phase() {
            RoundPhase::Idle | RoundPhase::Betting => {}
            RoundPhase::InProgress | RoundPhase::Expired => {
                return Err(EngineError::RoundInProgress)
            }
        }
        if self.round.bets.len() >= self.max_bets_per_round {
            return Err(EngineError::RoundFull {
                max: self.max_bets_per_round,
            });
        }
        let table = self.round.effective_loot_table().clone();
        let payout = table.multiply(amount, cashout_index)?;
        self.pool.ensure_available(payout)?;
        let escrowed = self
            .round
            .escrowed
            .checked_add(amount)
            .ok_or(EngineError::Overflow("escrowed stakes"))?;
        let current = self.source.current_block();
        let scheduled_start = schedule_start(current, self.round.intro_blocks)
            .ok_or(EngineError::Overflow("start block"))?;

        // Validated; stake collection is the only remaining failure and happens first.
        self.vault.receive(caller, amount)?;

        let mut events = Vec::new();
        if self.round.is_idle() {
            if let Some(staged) = self.round.staged_loot_table.take() {
                info!(loot_table = staged.name(), "staged loot table promoted");
                events.push(Event::LootTableUpdated {
                    name: staged.name().to_string(),
                    length: staged.length(),
                });
                self.round.loot_table = staged;
            }
            self.round.start_block = scheduled_start;
            self.pool.lock();
            info!(
                hash_index = self.round.hash_index,
                start_block = scheduled_start,
                "round started"
            );
            events.push(Event::RoundStarted {
                hash_index: self.round.hash_index,
                start_block: scheduled_start,
            });
        }

        let crossed = self.pool.use_round_liquidity(payout)?;
        self.round.escrowed = escrowed;
        let index = self.round.bets.len();
        self.round
            .bets
            .push(Bet::new(caller.clone(), amount, cashout_index));
        debug!(index, amount, cashout_index, payout, "bet placed");
        events.push(Event::BetPlaced {
            index: index as u32,
            owner: caller.clone(),
            amount,
            cashout_index,
        });

        if crossed {
            self.on_low_liquidity(current, &mut events);
        }
        Ok(events)
    }

    /// Move a bet to a different cashout index before the track starts.
    pub fn update_bet(
        &mut self,
        caller: &Account,
        index: usize,
        cashout_index: u64,
    ) -> Result<Vec<Event>, EngineError> {
        let bet = self.round.owned_bet(caller, index)?;
        self.ensure_not_started()?;

        let table = &self.round.loot_table;
        let old_payout = table.multiply(bet.amount, bet.cashout_index)?;
        let new_payout = table.multiply(bet.amount, cashout_index)?;
        let available = self.pool.available().saturating_add(old_payout);
        if new_payout > available {
            return Err(EngineError::InsufficientLiquidity {
                requested: new_payout,
                available,
            });
        }

        self.pool.release_round_liquidity(old_payout);
        let crossed = self.pool.use_round_liquidity(new_payout)?;
        self.round.bets[index].cashout_index = cashout_index;
        debug!(index, cashout_index, new_payout, "bet updated");

        let mut events = vec![Event::BetUpdated {
            index: index as u32,
            cashout_index,
        }];
        if crossed {
            let current = self.source.current_block();
            self.on_low_liquidity(current, &mut events);
        }
        Ok(events)
    }

    /// Withdraw a bet before the track starts, refunding the stake minus the cancellation fee.
    pub fn cancel_bet(&mut self, caller: &Account, index: usize) -> Result<Vec<Event>, EngineError> {
        let bet = self.round.owned_bet(caller, index)?;
        self.ensure_not_started()?;

        let payout = self.round.loot_table.multiply(bet.amount, bet.cashout_index)?;
        let refund = ((bet.amount as u128) * (self.round.cancel_return_bps as u128)
            / BASIS_POINTS_SCALE as u128) as u64;
        let owner = bet.owner.clone();

        self.round.bets[index].cancelled = true;
        self.pool.release_round_liquidity(payout);
        self.round.escrowed -= refund;
        debug!(index, refund, "bet cancelled");

        let mut events = vec![Event::BetCancelled {
            index: index as u32,
            refund,
        }];
        self.vault.pay(&owner, refund, &mut events);
        Ok(events)
    }

    /// Lock in the current track position while the round is running.
    pub fn cashout(&mut self, caller: &Account, index: usize) -> Result<Vec<Event>, EngineError> {
        let bet = self.round.owned_bet(caller, index)?;
        match self.phase() {
            RoundPhase::InProgress => {}
            RoundPhase::Idle | RoundPhase::Betting => return Err(EngineError::RoundNotStarted),
            RoundPhase::Expired => {
                return Err(EngineError::RandomnessExpired {
                    start_block: self.round.start_block,
                })
            }
        }
        let elapsed = self.source.current_block() - self.round.start_block;
        if elapsed >= bet.cashout_index {
            return Err(EngineError::InvalidCashoutIndex {
                elapsed,
                cashout_index: bet.cashout_index,
            });
        }

        self.round.bets[index].cashout_index = elapsed;
        debug!(index, cashout_index = elapsed, "bet cashed out");
        Ok(vec![Event::BetCashout {
            index: index as u32,
            cashout_index: elapsed,
        }])
    }

    fn ensure_not_started(&self) -> Result<(), EngineError> {
        match self.phase() {
            RoundPhase::Idle | RoundPhase::Betting => Ok(()),
            RoundPhase::InProgress | RoundPhase::Expired => Err(EngineError::RoundInProgress),
        }
    }

    /// Pull the track start closer once the round's liquidity runs low.
    fn on_low_liquidity(&mut self, current: u64, events: &mut Vec<Event>) {
        events.push(Event::LowLiquidity {
            available: self.pool.available(),
        });
        let Some(accelerated) = schedule_start(current, self.round.reduced_intro_blocks) else {
            return;
        };
        if accelerated < self.round.start_block {
            self.round.start_block = accelerated;
            info!(
                hash_index = self.round.hash_index,
                start_block = self.round.start_block,
                "round accelerated"
            );
            events.push(Event::RoundAccelerated {
                hash_index: self.round.hash_index,
                start_block: self.round.start_block,
            });
        }
    }
}
