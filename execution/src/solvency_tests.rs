//! Randomized solvency tests.
//!
//! These tests drive the engine with long random sequences of bets, liquidity changes, reveals,
//! refunds and refusing payees, and check after every step that:
//!
//! 1. **Solvency**: the vault holds exactly pool value + round stakes + queued deposits +
//!    staged credit, and reservations never exceed the round cap.
//! 2. **Conservation**: value is only ever moved between wallets and the vault.
//! 3. **Atomicity**: a failed operation leaves every observable piece of state unchanged.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crashpool_types::{
        Account, EngineError, RoundPhase, RoundSnapshot, BLOCK_HASH_RETENTION, UNIT,
    };
    use proptest::prelude::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use crate::{
        engine::Engine,
        loot_table::LinearLootTable,
        mocks::{create_account, MockChain, MockWallets},
        randomness::SaltChain,
        EngineConfig,
    };

    const PLAYERS: u64 = 6;
    const FUNDS: u64 = 100_000;

    #[derive(Debug, PartialEq)]
    struct Observed {
        snapshot: RoundSnapshot,
        value: u64,
        total_shares: u64,
        pending: u64,
        queue: usize,
        vault: u64,
        claimable: u64,
        wallets: u128,
    }

    struct Sim {
        engine: Engine<MockChain, MockWallets>,
        owner: Account,
        producer: Account,
        players: Vec<Account>,
        salts: SaltChain,
        total: u128,
        settled_rounds: u64,
    }

    impl Sim {
        fn new(config: EngineConfig) -> Self {
            let owner = create_account(0);
            let producer = create_account(1_000);
            let players: Vec<_> = (1..=PLAYERS).map(create_account).collect();
            let salts = SaltChain::from_seed(77);

            let mut chain = MockChain::new(3, BLOCK_HASH_RETENTION);
            chain.set_height(10);
            let mut wallets = MockWallets::new();
            for player in &players {
                wallets.fund(player, FUNDS);
            }
            let total = wallets.total();

            // 1.0x + 0.25x per block, 8% death chance per block.
            let table = LinearLootTable::new(24, UNIT, UNIT / 4, UNIT * 8 / 100).unwrap();
            let engine = Engine::new(
                config,
                owner.clone(),
                producer.clone(),
                salts.commit(0),
                Arc::new(table),
                chain,
                wallets,
            )
            .unwrap();
            Self {
                engine,
                owner,
                producer,
                players,
                salts,
                total,
                settled_rounds: 0,
            }
        }

        fn observe(&self) -> Observed {
            let pool = self.engine.pool();
            Observed {
                snapshot: self.engine.snapshot(),
                value: pool.value(),
                total_shares: pool.total_shares(),
                pending: pool.pending_deposits(),
                queue: pool.queue().len(),
                vault: self.engine.vault().balance(),
                claimable: self.engine.vault().total_claimable(),
                wallets: self.engine.vault().wallets().total(),
            }
        }

        fn check_invariants(&self) {
            assert!(self.engine.is_solvent(), "vault does not cover obligations");
            let pool = self.engine.pool();
            assert!(pool.reserved() <= pool.round_cap());
            assert_eq!(
                self.engine.vault().wallets().total() + self.engine.vault().balance() as u128,
                self.total,
                "value created or destroyed"
            );
            let round = self.engine.round();
            assert_eq!(round.start_block == 0, round.bets.is_empty());
            assert_eq!(round.hash_index, self.settled_rounds);
        }

        fn step(&mut self, rng: &mut StdRng) {
            let player = self.players[rng.gen_range(0..self.players.len())].clone();
            let before = self.observe();
            let bets = self.engine.round().bets.len().max(1);

            let result: Result<_, EngineError> = match rng.gen_range(0..100) {
                0..=29 => {
                    let amount = rng.gen_range(0..60);
                    let index = rng.gen_range(0..26);
                    self.engine.place_bet(&player, amount, index)
                }
                30..=34 => {
                    let index = rng.gen_range(0..bets);
                    let cashout_index = rng.gen_range(0..24);
                    self.engine.update_bet(&player, index, cashout_index)
                }
                35..=39 => {
                    let index = rng.gen_range(0..bets);
                    self.engine.cancel_bet(&player, index)
                }
                40..=44 => {
                    let index = rng.gen_range(0..bets);
                    self.engine.cashout(&player, index)
                }
                45..=54 => {
                    let amount = rng.gen_range(0..2_000);
                    self.engine.deposit(&player, amount)
                }
                55..=59 => {
                    let shares = rng.gen_range(0..=self.engine.shares_of(&player) + 10);
                    self.engine.withdraw(&player, shares)
                }
                60..=61 => {
                    if rng.gen_bool(0.5) {
                        self.engine.wallets_mut().refuse(&player);
                    } else {
                        self.engine.wallets_mut().accept(&player);
                    }
                    Ok(Vec::new())
                }
                62..=64 => self.engine.claim(&player),
                65..=84 => {
                    let blocks = rng.gen_range(0..12);
                    self.engine.source_mut().advance(blocks);
                    Ok(Vec::new())
                }
                85..=86 => {
                    // Stall past the retention window.
                    self.engine.source_mut().advance(BLOCK_HASH_RETENTION + 1);
                    Ok(Vec::new())
                }
                87..=94 => {
                    let index = self.engine.round().hash_index;
                    let salt = if rng.gen_bool(0.9) {
                        self.salts.salt(index)
                    } else {
                        [0xaa; 32]
                    };
                    let next = self.salts.commit(index + 1);
                    let producer = self.producer.clone();
                    let result = self.engine.reveal(&producer, salt, next);
                    if result.is_ok() {
                        self.settled_rounds += 1;
                    }
                    result
                }
                _ => {
                    let result = self.engine.emergency_refund(&player);
                    if result.is_ok() {
                        assert_eq!(self.engine.phase(), RoundPhase::Idle);
                        let owner = self.owner.clone();
                        self.engine.set_active(&owner, true).unwrap();
                    }
                    result
                }
            };

            if result.is_err() {
                assert_eq!(self.observe(), before, "failed operation mutated state");
            }
            self.check_invariants();
        }
    }

    fn run(seed: u64, steps: usize, config: EngineConfig) -> Sim {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sim = Sim::new(config);
        for player in sim.players.clone().iter().take(2) {
            sim.engine.deposit(player, 20_000).unwrap();
        }
        for _ in 0..steps {
            sim.step(&mut rng);
        }
        sim
    }

    #[test]
    fn test_random_sequences_stay_solvent() {
        for seed in 0..8 {
            let sim = run(seed, 2_000, EngineConfig::default());
            assert!(sim.settled_rounds > 0, "seed {seed} never settled a round");
        }
    }

    #[test]
    fn test_tight_bounds_stay_solvent() {
        let config = EngineConfig {
            max_bets_per_round: 4,
            max_liquidity_queue: 2,
            max_exposure_bps: 5_000,
            low_liquidity_threshold_bps: 9_000,
            ..EngineConfig::compact()
        };
        for seed in 100..104 {
            run(seed, 2_000, config.clone());
        }
    }

    #[test]
    fn test_draining_pool_returns_all_value() {
        let mut sim = run(42, 1_000, EngineConfig::default());

        // Settle whatever is in flight, then redeem every share.
        if sim.engine.round().start_block != 0 {
            sim.engine.source_mut().advance(BLOCK_HASH_RETENTION + 24);
            let player = sim.players[0].clone();
            sim.engine.emergency_refund(&player).unwrap();
        }
        for player in sim.players.clone() {
            sim.engine.wallets_mut().accept(&player);
            let _ = sim.engine.claim(&player);
            let shares = sim.engine.shares_of(&player);
            if shares > 0 {
                sim.engine.withdraw(&player, shares).unwrap();
            }
        }
        sim.check_invariants();
        assert_eq!(sim.engine.pool().total_shares(), 0);
        assert_eq!(sim.engine.vault().total_claimable(), 0);
        // Rounding dust is all that may remain.
        assert_eq!(sim.engine.vault().balance(), sim.engine.pool().value());
        assert!(sim.engine.pool().value() < PLAYERS);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        /// Property: any seed keeps the engine solvent and atomic.
        #[test]
        fn prop_engine_stays_solvent(seed in any::<u64>(), steps in 50usize..400) {
            let sim = run(seed, steps, EngineConfig::default());
            prop_assert!(sim.engine.is_solvent());
        }

        /// Property: failed bets never move value.
        #[test]
        fn prop_rejected_bets_are_free(amount in 0u64..10_000, index in 0u64..64) {
            let mut sim = Sim::new(EngineConfig::default());
            let player = sim.players[0].clone();
            sim.engine.deposit(&player, 1_000).unwrap();
            let before = sim.observe();
            if sim.engine.place_bet(&player, amount, index).is_err() {
                prop_assert_eq!(sim.observe(), before);
            }
            sim.check_invariants();
        }
    }
}
