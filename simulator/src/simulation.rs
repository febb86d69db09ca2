use anyhow::{bail, ensure, Context, Result};
use crashpool_execution::{
    mocks::{create_account, MockChain, MockWallets},
    Engine, SaltChain,
};
use crashpool_types::{
    Account, EngineError, Event, RoundPhase, BASIS_POINTS_SCALE, BLOCK_HASH_RETENTION,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info, warn};

use crate::{Summary, ValidatedConfig};

const OWNER_SEED: u64 = 0;
const PRODUCER_SEED: u64 = 1;
const BETTOR_SEED_OFFSET: u64 = 1_000;
const DEPOSITOR_SEED_OFFSET: u64 = 1_000_000;

const PLACE_BET_PROBABILITY: f64 = 0.6;
const UPDATE_BET_PROBABILITY: f64 = 0.1;
const CANCEL_BET_PROBABILITY: f64 = 0.05;
const CASHOUT_PROBABILITY: f64 = 0.05;
const DEPOSIT_PROBABILITY: f64 = 0.3;
const WITHDRAW_PROBABILITY: f64 = 0.15;
const CLAIM_PROBABILITY: f64 = 0.5;

type SimEngine = Engine<MockChain, MockWallets>;

/// Deterministic multi-round run of the engine against seeded bettors and depositors.
///
/// Every operation is followed by an invariant check; the first violation aborts the run.
pub struct Simulation {
    config: ValidatedConfig,
    engine: SimEngine,
    rng: ChaCha20Rng,
    owner: Account,
    producer: Account,
    bettors: Vec<Account>,
    depositors: Vec<Account>,
    salts: SaltChain,
    supply: u128,
    summary: Summary,
}

impl Simulation {
    pub fn new(config: ValidatedConfig) -> Result<Self> {
        let owner = create_account(OWNER_SEED);
        let producer = create_account(PRODUCER_SEED);
        let bettors: Vec<_> = (0..config.bettors as u64)
            .map(|i| create_account(BETTOR_SEED_OFFSET + i))
            .collect();
        let depositors: Vec<_> = (0..config.depositors as u64)
            .map(|i| create_account(DEPOSITOR_SEED_OFFSET + i))
            .collect();

        let mut wallets = MockWallets::new();
        for account in bettors.iter().chain(depositors.iter()) {
            wallets.fund(account, config.funds_per_account);
        }
        for bettor in bettors.iter().take(config.refusing_accounts) {
            wallets.refuse(bettor);
        }
        let supply = wallets.total();

        let salts = SaltChain::from_seed(config.seed);
        let engine = Engine::new(
            config.engine.clone(),
            owner.clone(),
            producer.clone(),
            salts.commit(0),
            config.loot_table.clone(),
            MockChain::new(config.seed, BLOCK_HASH_RETENTION),
            wallets,
        )
        .context("failed to create engine")?;

        let mut simulation = Self {
            rng: ChaCha20Rng::seed_from_u64(config.seed),
            summary: Summary::new(config.seed, config.loot_table.name()),
            config,
            engine,
            owner,
            producer,
            bettors,
            depositors,
            salts,
            supply,
        };
        for depositor in simulation.depositors.clone() {
            let amount = simulation.config.initial_liquidity;
            let events = simulation
                .engine
                .deposit(&depositor, amount)
                .context("failed to seed liquidity")?;
            simulation.summary.record(&events);
        }
        simulation.check()?;
        Ok(simulation)
    }

    pub fn engine(&self) -> &SimEngine {
        &self.engine
    }

    pub fn run(mut self) -> Result<Summary> {
        for round in 0..self.config.rounds {
            self.play_round(round)
                .with_context(|| format!("round {round} failed"))?;
        }
        Ok(self.finish())
    }

    fn play_round(&mut self, round: u64) -> Result<()> {
        self.summary.rounds += 1;
        self.move_liquidity()?;
        self.take_bets()?;
        if self.engine.round().start_block == 0 {
            debug!(round, "no bets placed");
            self.summary.empty += 1;
            self.engine.source_mut().advance(1);
            return Ok(());
        }

        // Changes made now wait in the queue until settlement.
        self.move_liquidity()?;
        let start = self.engine.round().start_block;
        self.advance_to(start);
        ensure!(
            self.engine.phase() == RoundPhase::InProgress,
            "round did not start at block {start}"
        );
        self.ride_track()?;

        let stall = self.config.stall_probability_bps as u32;
        if self.rng.gen_ratio(stall, BASIS_POINTS_SCALE as u32) {
            self.stall()?;
        } else {
            self.reveal()?;
        }
        self.claim_staged()
    }

    /// Apply an operation, record its outcome and check every invariant.
    fn apply(
        &mut self,
        op: impl FnOnce(&mut SimEngine) -> Result<Vec<Event>, EngineError>,
    ) -> Result<bool> {
        let accepted = match op(&mut self.engine) {
            Ok(events) => {
                self.summary.record(&events);
                true
            }
            Err(err) => {
                debug!(?err, "operation rejected");
                self.summary.reject(&err);
                false
            }
        };
        self.check()?;
        Ok(accepted)
    }

    fn check(&self) -> Result<()> {
        ensure!(self.engine.is_solvent(), "vault does not cover obligations");
        let pool = self.engine.pool();
        ensure!(
            pool.reserved() <= pool.round_cap(),
            "reserved liquidity {} exceeds round cap {}",
            pool.reserved(),
            pool.round_cap()
        );
        let vault = self.engine.vault();
        let held = vault.wallets().total() + vault.balance() as u128;
        ensure!(
            held == self.supply,
            "value not conserved (held={held}, supply={})",
            self.supply
        );
        let round = self.engine.round();
        ensure!(
            (round.start_block == 0) == round.bets.is_empty(),
            "round schedule disagrees with its bets"
        );
        Ok(())
    }

    fn advance_to(&mut self, height: u64) {
        let current = self.engine.source().height();
        self.engine
            .source_mut()
            .advance(height.saturating_sub(current));
    }

    fn own_bets(&self, bettor: &Account) -> Vec<usize> {
        self.engine
            .bets_of(bettor)
            .into_iter()
            .filter(|(_, bet)| !bet.cancelled)
            .map(|(index, _)| index)
            .collect()
    }

    fn pick_own_bet(&mut self, bettor: &Account) -> Option<usize> {
        let bets = self.own_bets(bettor);
        if bets.is_empty() {
            return None;
        }
        Some(bets[self.rng.gen_range(0..bets.len())])
    }

    fn move_liquidity(&mut self) -> Result<()> {
        let minimum = self.config.engine.minimum;
        for depositor in self.depositors.clone() {
            if self.rng.gen_bool(DEPOSIT_PROBABILITY) {
                let amount = self.rng.gen_range(minimum..=self.config.initial_liquidity);
                self.apply(|engine| engine.deposit(&depositor, amount))?;
            } else if self.rng.gen_bool(WITHDRAW_PROBABILITY) {
                let held = self.engine.shares_of(&depositor);
                if held == 0 {
                    continue;
                }
                let shares = self.rng.gen_range(1..=held);
                self.apply(|engine| engine.withdraw(&depositor, shares))?;
            }
        }
        Ok(())
    }

    fn take_bets(&mut self) -> Result<()> {
        let minimum = self.config.engine.minimum;
        let length = self.engine.round().effective_loot_table().length();
        for bettor in self.bettors.clone() {
            if !self.rng.gen_bool(PLACE_BET_PROBABILITY) {
                continue;
            }
            let amount = self.rng.gen_range(minimum..=self.config.max_stake);
            let cashout_index = self.rng.gen_range(0..length);
            self.apply(|engine| engine.place_bet(&bettor, amount, cashout_index))?;
        }

        for bettor in self.bettors.clone() {
            if self.rng.gen_bool(UPDATE_BET_PROBABILITY) {
                if let Some(index) = self.pick_own_bet(&bettor) {
                    let cashout_index = self.rng.gen_range(0..length);
                    self.apply(|engine| engine.update_bet(&bettor, index, cashout_index))?;
                }
            } else if self.rng.gen_bool(CANCEL_BET_PROBABILITY) {
                if let Some(index) = self.pick_own_bet(&bettor) {
                    self.apply(|engine| engine.cancel_bet(&bettor, index))?;
                }
            }
        }
        Ok(())
    }

    /// Walk the track block by block, letting bettors cash out along the way.
    fn ride_track(&mut self) -> Result<()> {
        let end = self.engine.round().start_block + self.engine.round().loot_table.length();
        while self.engine.source().height() < end {
            self.engine.source_mut().advance(1);
            for bettor in self.bettors.clone() {
                if !self.rng.gen_bool(CASHOUT_PROBABILITY) {
                    continue;
                }
                if let Some(index) = self.pick_own_bet(&bettor) {
                    self.apply(|engine| engine.cashout(&bettor, index))?;
                }
            }
        }
        Ok(())
    }

    fn reveal(&mut self) -> Result<()> {
        let index = self.engine.round().hash_index;
        let salt = self.salts.salt(index);
        let next = self.salts.commit(index + 1);
        let producer = self.producer.clone();
        let events = self
            .engine
            .reveal(&producer, salt, next)
            .with_context(|| format!("reveal of hash {index} failed"))?;
        self.summary.record(&events);
        self.check()
    }

    /// The hash producer misses the retention window; anyone refunds the round.
    fn stall(&mut self) -> Result<()> {
        let index = self.engine.round().hash_index;
        let start = self.engine.round().start_block;
        self.advance_to(start + BLOCK_HASH_RETENTION + 1);
        warn!(hash_index = index, start, "hash producer stalled");

        let producer = self.producer.clone();
        match self
            .engine
            .reveal(&producer, self.salts.salt(index), self.salts.commit(index + 1))
        {
            Err(EngineError::RandomnessExpired { .. }) => {}
            Err(err) => bail!("unexpected reveal error after stall: {err}"),
            Ok(_) => bail!("reveal succeeded after the retention window"),
        }

        let caller = self.bettors[self.rng.gen_range(0..self.bettors.len())].clone();
        ensure!(
            self.apply(|engine| engine.emergency_refund(&caller))?,
            "emergency refund rejected"
        );
        ensure!(
            self.engine.round().hash_index == index,
            "refund advanced the hash index"
        );
        let owner = self.owner.clone();
        ensure!(
            self.apply(|engine| engine.set_active(&owner, true))?,
            "failed to reactivate engine"
        );
        Ok(())
    }

    /// Refusing bettors occasionally open up long enough to pull their credit.
    fn claim_staged(&mut self) -> Result<()> {
        let refusing: Vec<_> = self
            .bettors
            .iter()
            .take(self.config.refusing_accounts)
            .cloned()
            .collect();
        for bettor in refusing {
            if self.engine.claimable(&bettor) == 0 || !self.rng.gen_bool(CLAIM_PROBABILITY) {
                continue;
            }
            self.engine.wallets_mut().accept(&bettor);
            self.apply(|engine| engine.claim(&bettor))?;
            self.engine.wallets_mut().refuse(&bettor);
        }
        Ok(())
    }

    fn finish(mut self) -> Summary {
        let pool = self.engine.pool();
        self.summary.final_pool_value = pool.value();
        self.summary.final_total_shares = pool.total_shares();
        self.summary.final_vault_balance = self.engine.vault().balance();
        self.summary.final_claimable = self.engine.vault().total_claimable();
        info!(
            rounds = self.summary.rounds,
            settled = self.summary.settled,
            refunded = self.summary.refunded,
            pool_value = self.summary.final_pool_value,
            "simulation finished"
        );
        self.summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, LootTableConfig};
    use crashpool_execution::EngineConfig;

    fn config(seed: u64, stall_probability_bps: u16) -> ValidatedConfig {
        Config {
            engine: EngineConfig::default(),
            loot_table: LootTableConfig::Linear {
                length: 16,
                base_bps: 10_000,
                step_bps: 2_500,
                death_bps: 800,
            },
            rounds: 25,
            bettors: 6,
            depositors: 2,
            seed,
            log_level: "info".to_string(),
            json_logs: false,
            refusing_accounts: 2,
            stall_probability_bps,
            funds_per_account: 100_000,
            max_stake: 200,
            initial_liquidity: 50_000,
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_run_accounts_for_every_round() {
        let summary = Simulation::new(config(1, 1_000)).unwrap().run().unwrap();
        assert_eq!(summary.rounds, 25);
        assert_eq!(summary.settled + summary.refunded + summary.empty, 25);
        assert!(summary.bets_placed > 0);
        assert!(summary.settled > 0);
        assert_eq!(
            summary.final_vault_balance,
            summary.final_pool_value + summary.final_claimable
        );
    }

    #[test]
    fn test_same_seed_same_summary() {
        let first = Simulation::new(config(9, 2_000)).unwrap().run().unwrap();
        let second = Simulation::new(config(9, 2_000)).unwrap().run().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_stalled_producer_refunds_every_round() {
        let summary = Simulation::new(config(4, 10_000)).unwrap().run().unwrap();
        assert_eq!(summary.settled, 0);
        assert_eq!(summary.refunded + summary.empty, 25);
        assert_eq!(summary.paid_out, 0);
    }

    #[test]
    fn test_seeded_liquidity() {
        let simulation = Simulation::new(config(2, 0)).unwrap();
        let pool = simulation.engine().pool();
        assert_eq!(pool.value(), 100_000);
        assert_eq!(pool.total_shares(), 100_000);
        assert!(simulation.engine().is_solvent());
    }
}
