//! Crashpool simulator.
//!
//! Drives the round engine through many seeded rounds against in-memory wallets and a mock
//! chain, checking solvency and value conservation after every operation. Runs are
//! deterministic for a given configuration and produce a JSON [Summary].

mod config;
mod simulation;
mod summary;

pub use config::{Config, ConfigError, LootTableConfig, ValidatedConfig};
pub use simulation::Simulation;
pub use summary::Summary;
