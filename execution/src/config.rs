//! Engine configuration.

use crashpool_types::{
    EngineError, BASIS_POINTS_SCALE, COMPACT_MAX_BETS_PER_ROUND, DEFAULT_CANCEL_RETURN_BPS,
    DEFAULT_INTRO_BLOCKS, DEFAULT_LOW_LIQUIDITY_THRESHOLD_BPS, DEFAULT_MAX_BETS_PER_ROUND,
    DEFAULT_MAX_EXPOSURE_BPS, DEFAULT_MAX_LIQUIDITY_QUEUE, DEFAULT_MINIMUM,
    DEFAULT_REDUCED_INTRO_BLOCKS, MAX_MAX_EXPOSURE_BPS, MIN_MAX_EXPOSURE_BPS,
};
use serde::{Deserialize, Serialize};

fn default_minimum() -> u64 {
    DEFAULT_MINIMUM
}

fn default_intro_blocks() -> u64 {
    DEFAULT_INTRO_BLOCKS
}

fn default_reduced_intro_blocks() -> u64 {
    DEFAULT_REDUCED_INTRO_BLOCKS
}

fn default_cancel_return_bps() -> u16 {
    DEFAULT_CANCEL_RETURN_BPS
}

fn default_max_exposure_bps() -> u16 {
    DEFAULT_MAX_EXPOSURE_BPS
}

fn default_low_liquidity_threshold_bps() -> u16 {
    DEFAULT_LOW_LIQUIDITY_THRESHOLD_BPS
}

fn default_max_bets_per_round() -> usize {
    DEFAULT_MAX_BETS_PER_ROUND
}

fn default_max_liquidity_queue() -> usize {
    DEFAULT_MAX_LIQUIDITY_QUEUE
}

/// Initial engine parameters. Everything except the two bounds can later be changed by the owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Minimum stake and minimum liquidity change.
    #[serde(default = "default_minimum")]
    pub minimum: u64,
    /// Blocks between the first bet and the start of the track.
    #[serde(default = "default_intro_blocks")]
    pub intro_blocks: u64,
    /// Intro delay once reservations cross the low-liquidity threshold.
    #[serde(default = "default_reduced_intro_blocks")]
    pub reduced_intro_blocks: u64,
    #[serde(default = "default_cancel_return_bps")]
    pub cancel_return_bps: u16,
    /// Share of pool value that one round may reserve.
    #[serde(default = "default_max_exposure_bps")]
    pub max_exposure_bps: u16,
    /// Unreserved share of the round cap below which the round is accelerated.
    #[serde(default = "default_low_liquidity_threshold_bps")]
    pub low_liquidity_threshold_bps: u16,
    #[serde(default = "default_max_bets_per_round")]
    pub max_bets_per_round: usize,
    #[serde(default = "default_max_liquidity_queue")]
    pub max_liquidity_queue: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            minimum: DEFAULT_MINIMUM,
            intro_blocks: DEFAULT_INTRO_BLOCKS,
            reduced_intro_blocks: DEFAULT_REDUCED_INTRO_BLOCKS,
            cancel_return_bps: DEFAULT_CANCEL_RETURN_BPS,
            max_exposure_bps: DEFAULT_MAX_EXPOSURE_BPS,
            low_liquidity_threshold_bps: DEFAULT_LOW_LIQUIDITY_THRESHOLD_BPS,
            max_bets_per_round: DEFAULT_MAX_BETS_PER_ROUND,
            max_liquidity_queue: DEFAULT_MAX_LIQUIDITY_QUEUE,
        }
    }
}

impl EngineConfig {
    /// Profile with the smaller per-round bet bound.
    pub fn compact() -> Self {
        Self {
            max_bets_per_round: COMPACT_MAX_BETS_PER_ROUND,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        validate_minimum(self.minimum)?;
        validate_intro_blocks(self.intro_blocks, self.reduced_intro_blocks)?;
        validate_cancel_return(self.cancel_return_bps)?;
        validate_max_exposure(self.max_exposure_bps)?;
        validate_low_liquidity_threshold(self.low_liquidity_threshold_bps)?;
        if self.max_bets_per_round == 0 {
            return Err(EngineError::RoundFull { max: 0 });
        }
        if self.max_liquidity_queue == 0 {
            return Err(EngineError::LiquidityQueueFull { max: 0 });
        }
        Ok(())
    }
}

pub(crate) fn validate_minimum(minimum: u64) -> Result<(), EngineError> {
    if minimum == 0 {
        return Err(EngineError::BelowMinimum { got: 0, min: 1 });
    }
    Ok(())
}

pub(crate) fn validate_intro_blocks(intro: u64, reduced: u64) -> Result<(), EngineError> {
    if reduced > intro {
        return Err(EngineError::InvalidConfig {
            field: "reduced_intro_blocks",
            got: reduced,
            max: intro,
        });
    }
    Ok(())
}

fn check_bps(field: &'static str, got: u16, min: u16, max: u16) -> Result<(), EngineError> {
    if got < min || got > max {
        return Err(EngineError::InvalidBasisPoints {
            field,
            got: got as u64,
            min: min as u64,
            max: max as u64,
        });
    }
    Ok(())
}

pub(crate) fn validate_cancel_return(bps: u16) -> Result<(), EngineError> {
    check_bps("cancel_return_bps", bps, 0, BASIS_POINTS_SCALE as u16)
}

pub(crate) fn validate_max_exposure(bps: u16) -> Result<(), EngineError> {
    check_bps(
        "max_exposure_bps",
        bps,
        MIN_MAX_EXPOSURE_BPS,
        MAX_MAX_EXPOSURE_BPS,
    )
}

pub(crate) fn validate_low_liquidity_threshold(bps: u16) -> Result<(), EngineError> {
    check_bps(
        "low_liquidity_threshold_bps",
        bps,
        0,
        BASIS_POINTS_SCALE as u16,
    )
}
