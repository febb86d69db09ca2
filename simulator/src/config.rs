use std::{str::FromStr, sync::Arc};

use crashpool_execution::{
    DynamicLootTable, EngineConfig, FixedLootTable, LinearLootTable, LootTable,
};
use crashpool_types::{EngineError, BASIS_POINTS_SCALE, UNIT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_FUNDS_PER_ACCOUNT: u64 = 1_000_000;
const DEFAULT_MAX_STAKE: u64 = 1_000;
const DEFAULT_INITIAL_LIQUIDITY: u64 = 100_000;

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_funds_per_account() -> u64 {
    DEFAULT_FUNDS_PER_ACCOUNT
}

fn default_max_stake() -> u64 {
    DEFAULT_MAX_STAKE
}

fn default_initial_liquidity() -> u64 {
    DEFAULT_INITIAL_LIQUIDITY
}

fn bps_to_unit(bps: u64) -> u128 {
    bps as u128 * UNIT / BASIS_POINTS_SCALE as u128
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid engine config: {0}")]
    Engine(#[from] EngineError),
    #[error("invalid loot table: {0}")]
    LootTable(EngineError),
    #[error("invalid log level: {0}")]
    LogLevel(String),
    #[error("{field} must be at least {min} (got={got})")]
    TooSmall {
        field: &'static str,
        min: u64,
        got: u64,
    },
    #[error("refusing_accounts ({refusing}) exceeds bettors ({bettors})")]
    TooManyRefusing { refusing: usize, bettors: usize },
    #[error("stall_probability_bps must be at most 10000 (got={0})")]
    StallProbability(u16),
    #[error("initial_liquidity ({liquidity}) exceeds funds_per_account ({funds})")]
    LiquidityExceedsFunds { liquidity: u64, funds: u64 },
}

/// Loot table selection. Multipliers and probabilities are given in basis points.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LootTableConfig {
    /// One multiplier everywhere, constant death probability.
    Fixed {
        length: u64,
        multiplier_bps: u64,
        death_bps: u64,
    },
    Linear {
        length: u64,
        base_bps: u64,
        step_bps: u64,
        death_bps: u64,
    },
    /// Fair curve for `hazard_bps` minus `house_edge_bps`.
    Dynamic {
        length: u64,
        hazard_bps: u64,
        house_edge_bps: u16,
    },
}

impl LootTableConfig {
    pub fn build(&self) -> Result<Arc<dyn LootTable>, EngineError> {
        let table: Arc<dyn LootTable> = match *self {
            Self::Fixed {
                length,
                multiplier_bps,
                death_bps,
            } => {
                let probabilities = vec![bps_to_unit(death_bps); length as usize];
                Arc::new(FixedLootTable::new(
                    "fixed",
                    bps_to_unit(multiplier_bps),
                    probabilities,
                )?)
            }
            Self::Linear {
                length,
                base_bps,
                step_bps,
                death_bps,
            } => Arc::new(LinearLootTable::new(
                length,
                bps_to_unit(base_bps),
                bps_to_unit(step_bps),
                bps_to_unit(death_bps),
            )?),
            Self::Dynamic {
                length,
                hazard_bps,
                house_edge_bps,
            } => Arc::new(DynamicLootTable::new(
                length,
                bps_to_unit(hazard_bps),
                house_edge_bps,
            )?),
        };
        Ok(table)
    }
}

/// Simulation configuration (from config file).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    pub loot_table: LootTableConfig,
    pub rounds: u64,
    pub bettors: usize,
    pub depositors: usize,
    pub seed: u64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub json_logs: bool,
    /// The first `refusing_accounts` bettors refuse incoming transfers.
    #[serde(default)]
    pub refusing_accounts: usize,
    /// Chance per round that the hash producer stalls past the retention window.
    #[serde(default)]
    pub stall_probability_bps: u16,
    #[serde(default = "default_funds_per_account")]
    pub funds_per_account: u64,
    #[serde(default = "default_max_stake")]
    pub max_stake: u64,
    /// Seeded by each depositor before the first round.
    #[serde(default = "default_initial_liquidity")]
    pub initial_liquidity: u64,
}

impl Config {
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        self.engine.validate()?;
        let loot_table = self.loot_table.build().map_err(ConfigError::LootTable)?;
        let log_level = Level::from_str(&self.log_level)
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))?;

        for (field, min, got) in [
            ("rounds", 1, self.rounds),
            ("bettors", 1, self.bettors as u64),
            ("depositors", 1, self.depositors as u64),
            ("max_stake", self.engine.minimum, self.max_stake),
            ("initial_liquidity", self.engine.minimum, self.initial_liquidity),
        ] {
            if got < min {
                return Err(ConfigError::TooSmall { field, min, got });
            }
        }
        if self.refusing_accounts > self.bettors {
            return Err(ConfigError::TooManyRefusing {
                refusing: self.refusing_accounts,
                bettors: self.bettors,
            });
        }
        if self.stall_probability_bps as u64 > BASIS_POINTS_SCALE {
            return Err(ConfigError::StallProbability(self.stall_probability_bps));
        }
        if self.initial_liquidity > self.funds_per_account {
            return Err(ConfigError::LiquidityExceedsFunds {
                liquidity: self.initial_liquidity,
                funds: self.funds_per_account,
            });
        }

        Ok(ValidatedConfig {
            engine: self.engine,
            loot_table,
            rounds: self.rounds,
            bettors: self.bettors,
            depositors: self.depositors,
            seed: self.seed,
            log_level,
            json_logs: self.json_logs,
            refusing_accounts: self.refusing_accounts,
            stall_probability_bps: self.stall_probability_bps,
            funds_per_account: self.funds_per_account,
            max_stake: self.max_stake,
            initial_liquidity: self.initial_liquidity,
        })
    }
}

/// A [Config] whose values have all been checked.
#[derive(Clone, Debug)]
pub struct ValidatedConfig {
    pub engine: EngineConfig,
    pub loot_table: Arc<dyn LootTable>,
    pub rounds: u64,
    pub bettors: usize,
    pub depositors: usize,
    pub seed: u64,
    pub log_level: Level,
    pub json_logs: bool,
    pub refusing_accounts: usize,
    pub stall_probability_bps: u16,
    pub funds_per_account: u64,
    pub max_stake: u64,
    pub initial_liquidity: u64,
}
