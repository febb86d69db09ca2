use crashpool_types::{Account, EngineError, Event, Hash, RoundPhase};
use tracing::{info, warn};

use crate::{
    engine::Engine,
    randomness::{verify_commit, RandomnessSource},
    vault::Wallets,
};

impl<R: RandomnessSource, W: Wallets> Engine<R, W> {
    // === Settlement Handlers ===

    /// Disclose the salt behind the committed hash, settle the round and commit the next one.
    pub fn reveal(
        &mut self,
        caller: &Account,
        salt: Hash,
        next_committed_hash: Hash,
    ) -> Result<Vec<Event>, EngineError> {
        if caller != &self.hash_producer {
            return Err(EngineError::NotRevealer);
        }
        if !verify_commit(&self.round.committed_hash, &salt) {
            return Err(EngineError::InvalidHash);
        }
        let start_block = self.round.start_block;
        if start_block == 0 {
            return Err(EngineError::RoundNotStarted);
        }
        if !self.source.is_available(start_block) {
            return Err(EngineError::RandomnessExpired { start_block });
        }
        let table = self.round.loot_table.clone();
        let proof = table.death_proof(&self.source, &salt, start_block)?;

        let mut winners = Vec::new();
        let mut paid: u64 = 0;
        let mut forfeited: u64 = 0;
        for (index, bet) in self.round.bets.iter().enumerate() {
            if bet.cancelled {
                continue;
            }
            if bet.cashout_index < proof.dead_index {
                let payout = table.multiply(bet.amount, bet.cashout_index)?;
                paid = paid
                    .checked_add(payout)
                    .ok_or(EngineError::Overflow("round payouts"))?;
                winners.push((index, bet.owner.clone(), payout));
            } else {
                forfeited += bet.amount;
            }
        }
        self.pool.settle_round(self.round.escrowed, paid)?;

        let mut events = Vec::with_capacity(winners.len() + 1);
        for (index, owner, payout) in winners {
            events.push(Event::BetPaid {
                index: index as u32,
                owner: owner.clone(),
                payout,
            });
            self.vault.pay(&owner, payout, &mut events);
        }

        let hash_index = self.round.hash_index;
        self.round.reset();
        events.extend(self.pool.clear_queue(&mut self.vault));
        self.round.committed_hash = next_committed_hash;
        self.round.hash_index += 1;
        info!(
            hash_index,
            dead_index = proof.dead_index,
            paid,
            forfeited,
            "round ended"
        );
        events.push(Event::RoundEnded {
            hash_index,
            dead_index: proof.dead_index,
            salt,
            next_committed_hash,
            paid,
            forfeited,
        });
        Ok(events)
    }

    /// Refund every live stake of a round whose randomness can no longer be revealed.
    ///
    /// Anyone may call this. The engine is deactivated and keeps its commitment.
    pub fn emergency_refund(&mut self, caller: &Account) -> Result<Vec<Event>, EngineError> {
        if self.phase() != RoundPhase::Expired {
            return Err(EngineError::RoundNotRefundable);
        }

        let refunds: Vec<_> = self
            .round
            .bets
            .iter()
            .filter(|bet| !bet.cancelled)
            .map(|bet| (bet.owner.clone(), bet.amount))
            .collect();
        let refunded: u64 = refunds.iter().map(|(_, amount)| amount).sum();
        // Cancellation fees stay with the pool.
        let retained = self.round.escrowed - refunded;
        self.pool.settle_round(retained, 0)?;

        let mut events = Vec::new();
        for (owner, amount) in refunds {
            self.vault.pay(&owner, amount, &mut events);
        }

        let hash_index = self.round.hash_index;
        self.round.reset();
        events.extend(self.pool.clear_queue(&mut self.vault));
        self.round.active = false;
        warn!(hash_index, refunded, ?caller, "round refunded, randomness expired");
        events.push(Event::RoundRefunded {
            hash_index,
            refunded,
        });
        events.push(Event::ActiveChanged { active: false });
        Ok(events)
    }
}
