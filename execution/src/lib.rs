//! Crashpool execution layer.
//!
//! This crate contains the deterministic round engine ([`Engine`]) together with the pieces it is
//! built from: pluggable loot tables, the commit/reveal randomness helpers, the value-holding
//! [`Vault`] and the share-based [`LiquidityPool`] that backs every payout.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time inside execution; the only clock is the block height reported
//!   by the [`RandomnessSource`].
//! - Do not use non-deterministic randomness; round outcomes derive only from the revealed salt
//!   and retained block hashes.
//! - Avoid iteration order of hash-based collections influencing outputs.
//!
//! ## Minimal round (example)
//! ```rust,ignore
//! # #[cfg(feature = "mocks")]
//! # {
//! use std::sync::Arc;
//! use crashpool_execution::{
//!     mocks::{create_account, MockChain, MockWallets},
//!     Engine, EngineConfig, FixedLootTable, SaltChain,
//! };
//! use crashpool_types::{BLOCK_HASH_RETENTION, UNIT};
//!
//! let salts = SaltChain::from_seed(1);
//! let (owner, producer, player) = (create_account(0), create_account(1), create_account(2));
//! let mut wallets = MockWallets::new();
//! wallets.fund(&player, 1_000);
//! let table = FixedLootTable::with_death_at(10, 2 * UNIT, 5)?;
//! let mut engine = Engine::new(
//!     EngineConfig::default(),
//!     owner,
//!     producer.clone(),
//!     salts.commit(0),
//!     Arc::new(table),
//!     MockChain::new(0, BLOCK_HASH_RETENTION),
//!     wallets,
//! )?;
//! engine.deposit(&player, 500)?;
//! engine.place_bet(&player, 10, 3)?;
//! // ... advance the chain past the track, then:
//! engine.reveal(&producer, salts.salt(0), salts.commit(1))?;
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod loot_table;
pub mod pool;
pub mod randomness;
pub mod vault;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

mod solvency_tests;

pub use config::EngineConfig;
pub use engine::{phase_at, Engine, RoundState};
pub use loot_table::{
    derive_sample, validate_loot_table, DeathProof, DynamicLootTable, FixedLootTable,
    LinearLootTable, LootTable, SampleMode,
};
pub use pool::LiquidityPool;
pub use randomness::{compute_commit, verify_commit, CommitRevealPair, RandomnessSource, SaltChain};
pub use vault::{SendOutcome, Vault, Wallets};
