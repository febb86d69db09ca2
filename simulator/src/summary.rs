use std::collections::BTreeMap;

use crashpool_types::{EngineError, Event};
use serde::Serialize;

/// Totals gathered over a simulation run, printed as JSON when it finishes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub seed: u64,
    pub loot_table: String,
    pub rounds: u64,
    pub settled: u64,
    pub refunded: u64,
    pub empty: u64,
    pub accelerated: u64,
    pub low_liquidity: u64,
    pub bets_placed: u64,
    pub bets_updated: u64,
    pub bets_cancelled: u64,
    pub cashouts: u64,
    pub bets_paid: u64,
    pub staked: u64,
    pub paid_out: u64,
    pub forfeited: u64,
    pub stakes_refunded: u64,
    pub payments_staged: u64,
    pub claimed: u64,
    pub liquidity_added: u64,
    pub liquidity_removed: u64,
    pub liquidity_queued: u64,
    pub max_dead_index: u64,
    /// Rejected operations keyed by error class.
    pub rejected: BTreeMap<String, u64>,
    pub final_pool_value: u64,
    pub final_total_shares: u64,
    pub final_vault_balance: u64,
    pub final_claimable: u64,
}

impl Summary {
    pub fn new(seed: u64, loot_table: &str) -> Self {
        Self {
            seed,
            loot_table: loot_table.to_string(),
            ..Default::default()
        }
    }

    pub fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::RoundEnded {
                    dead_index,
                    paid,
                    forfeited,
                    ..
                } => {
                    self.settled += 1;
                    self.paid_out += paid;
                    self.forfeited += forfeited;
                    self.max_dead_index = self.max_dead_index.max(*dead_index);
                }
                Event::RoundRefunded { refunded, .. } => {
                    self.refunded += 1;
                    self.stakes_refunded += refunded;
                }
                Event::RoundAccelerated { .. } => self.accelerated += 1,
                Event::LowLiquidity { .. } => self.low_liquidity += 1,
                Event::BetPlaced { amount, .. } => {
                    self.bets_placed += 1;
                    self.staked += amount;
                }
                Event::BetUpdated { .. } => self.bets_updated += 1,
                Event::BetCancelled { .. } => self.bets_cancelled += 1,
                Event::BetCashout { .. } => self.cashouts += 1,
                Event::BetPaid { .. } => self.bets_paid += 1,
                Event::PaymentStaged { .. } => self.payments_staged += 1,
                Event::Claimed { amount, .. } => self.claimed += amount,
                Event::LiquidityAdded { amount, .. } => self.liquidity_added += amount,
                Event::LiquidityRemoved { amount, .. } => self.liquidity_removed += amount,
                Event::LiquidityQueued { .. } => self.liquidity_queued += 1,
                _ => {}
            }
        }
    }

    pub fn reject(&mut self, err: &EngineError) {
        let kind = format!("{:?}", err.kind()).to_lowercase();
        *self.rejected.entry(kind).or_default() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crashpool_execution::mocks::create_account;

    #[test]
    fn test_record_counts_events() {
        let owner = create_account(1);
        let mut summary = Summary::new(3, "linear");
        summary.record(&[
            Event::BetPlaced {
                index: 0,
                owner: owner.clone(),
                amount: 40,
                cashout_index: 2,
            },
            Event::BetPaid {
                index: 0,
                owner: owner.clone(),
                payout: 60,
            },
            Event::PaymentStaged {
                recipient: owner,
                amount: 60,
            },
            Event::RoundEnded {
                hash_index: 0,
                dead_index: 5,
                salt: [0; 32],
                next_committed_hash: [1; 32],
                paid: 60,
                forfeited: 0,
            },
        ]);
        assert_eq!(summary.bets_placed, 1);
        assert_eq!(summary.staked, 40);
        assert_eq!(summary.bets_paid, 1);
        assert_eq!(summary.payments_staged, 1);
        assert_eq!(summary.settled, 1);
        assert_eq!(summary.paid_out, 60);
        assert_eq!(summary.max_dead_index, 5);
    }

    #[test]
    fn test_reject_groups_by_kind() {
        let mut summary = Summary::new(0, "fixed");
        summary.reject(&EngineError::NotOwner);
        summary.reject(&EngineError::RoundFull { max: 4 });
        summary.reject(&EngineError::LiquidityQueueFull { max: 4 });
        assert_eq!(summary.rejected.get("authorization"), Some(&1));
        assert_eq!(summary.rejected.get("capacity"), Some(&2));
    }
}
