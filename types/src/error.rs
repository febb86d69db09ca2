use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

use super::constants::*;

/// Broad class of an [EngineError], used by callers to decide whether waiting
/// for another round phase (or a smaller request) can succeed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    Validation,
    Authorization,
    Capacity,
    State,
    Transfer,
}

/// Every failure the engine can report. A returned error never leaves state
/// partially applied.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum EngineError {
    #[error("amount below minimum (got={got}, min={min})")]
    BelowMinimum { got: u64, min: u64 },
    #[error("index out of range (index={index}, length={length})")]
    InvalidIndex { index: u64, length: u64 },
    #[error("{field} out of range (got={got}, min={min}, max={max})")]
    InvalidBasisPoints {
        field: &'static str,
        got: u64,
        min: u64,
        max: u64,
    },
    #[error("{field} out of range (got={got}, max={max})")]
    InvalidConfig {
        field: &'static str,
        got: u64,
        max: u64,
    },
    #[error("invalid loot table: {0}")]
    InvalidLootTable(&'static str),
    #[error("arithmetic overflow in {0}")]
    Overflow(&'static str),
    #[error("insufficient shares (requested={requested}, held={held})")]
    InsufficientShares { requested: u64, held: u64 },
    #[error("insufficient funds (requested={requested}, balance={balance})")]
    InsufficientFunds { requested: u64, balance: u64 },

    #[error("caller is not the owner")]
    NotOwner,
    #[error("caller is not the hash producer")]
    NotRevealer,
    #[error("caller does not own bet {index}")]
    NotBetOwner { index: usize },

    #[error("round is full (max={max})")]
    RoundFull { max: usize },
    #[error("liquidity queue is full (max={max})")]
    LiquidityQueueFull { max: usize },
    #[error("insufficient round liquidity (requested={requested}, available={available})")]
    InsufficientLiquidity { requested: u64, available: u64 },

    #[error("engine is not active")]
    Inactive,
    #[error("round is in progress")]
    RoundInProgress,
    #[error("round has not started")]
    RoundNotStarted,
    #[error("bet {index} is cancelled")]
    BetCancelled { index: usize },
    #[error("cashout index already passed (elapsed={elapsed}, cashout_index={cashout_index})")]
    InvalidCashoutIndex { elapsed: u64, cashout_index: u64 },
    #[error("salt does not match committed hash")]
    InvalidHash,
    #[error("block hashes not yet available (current={current}, required={required})")]
    CalledTooEarly { current: u64, required: u64 },
    #[error("randomness for round starting at block {start_block} has expired")]
    RandomnessExpired { start_block: u64 },
    #[error("round is not refundable")]
    RoundNotRefundable,
    #[error("depositor already queued a liquidity change this round")]
    OneChangePerRound,
    #[error("unknown bet {index}")]
    UnknownBet { index: usize },
    #[error("nothing to claim")]
    NothingToClaim,

    #[error("recipient refused transfer of {amount}")]
    TransferRefused { amount: u64 },
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BelowMinimum { .. }
            | Self::InvalidIndex { .. }
            | Self::InvalidBasisPoints { .. }
            | Self::InvalidConfig { .. }
            | Self::InvalidLootTable(_)
            | Self::Overflow(_)
            | Self::InsufficientShares { .. }
            | Self::InsufficientFunds { .. } => ErrorKind::Validation,
            Self::NotOwner | Self::NotRevealer | Self::NotBetOwner { .. } => {
                ErrorKind::Authorization
            }
            Self::RoundFull { .. }
            | Self::LiquidityQueueFull { .. }
            | Self::InsufficientLiquidity { .. } => ErrorKind::Capacity,
            Self::Inactive
            | Self::RoundInProgress
            | Self::RoundNotStarted
            | Self::BetCancelled { .. }
            | Self::InvalidCashoutIndex { .. }
            | Self::InvalidHash
            | Self::CalledTooEarly { .. }
            | Self::RandomnessExpired { .. }
            | Self::RoundNotRefundable
            | Self::OneChangePerRound
            | Self::UnknownBet { .. }
            | Self::NothingToClaim => ErrorKind::State,
            Self::TransferRefused { .. } => ErrorKind::Transfer,
        }
    }

    /// Stable numeric code for wire reporting.
    pub fn code(&self) -> u8 {
        match self {
            Self::BelowMinimum { .. } => ERROR_BELOW_MINIMUM,
            Self::InvalidIndex { .. } => ERROR_INVALID_INDEX,
            Self::InvalidBasisPoints { .. } => ERROR_INVALID_BASIS_POINTS,
            Self::InvalidConfig { .. } => ERROR_INVALID_CONFIG,
            Self::InvalidLootTable(_) => ERROR_INVALID_LOOT_TABLE,
            Self::Overflow(_) => ERROR_OVERFLOW,
            Self::InsufficientShares { .. } => ERROR_INSUFFICIENT_SHARES,
            Self::InsufficientFunds { .. } => ERROR_INSUFFICIENT_FUNDS,
            Self::NotOwner => ERROR_NOT_OWNER,
            Self::NotRevealer => ERROR_NOT_REVEALER,
            Self::NotBetOwner { .. } => ERROR_NOT_BET_OWNER,
            Self::RoundFull { .. } => ERROR_ROUND_FULL,
            Self::LiquidityQueueFull { .. } => ERROR_LIQUIDITY_QUEUE_FULL,
            Self::InsufficientLiquidity { .. } => ERROR_INSUFFICIENT_LIQUIDITY,
            Self::Inactive => ERROR_INACTIVE,
            Self::RoundInProgress => ERROR_ROUND_IN_PROGRESS,
            Self::RoundNotStarted => ERROR_ROUND_NOT_STARTED,
            Self::BetCancelled { .. } => ERROR_BET_CANCELLED,
            Self::InvalidCashoutIndex { .. } => ERROR_INVALID_CASHOUT_INDEX,
            Self::InvalidHash => ERROR_INVALID_HASH,
            Self::CalledTooEarly { .. } => ERROR_CALLED_TOO_EARLY,
            Self::RandomnessExpired { .. } => ERROR_RANDOMNESS_EXPIRED,
            Self::RoundNotRefundable => ERROR_ROUND_NOT_REFUNDABLE,
            Self::OneChangePerRound => ERROR_ONE_CHANGE_PER_ROUND,
            Self::UnknownBet { .. } => ERROR_UNKNOWN_BET,
            Self::NothingToClaim => ERROR_NOTHING_TO_CLAIM,
            Self::TransferRefused { .. } => ERROR_TRANSFER_REFUSED,
        }
    }

    /// Whether waiting for settlement (or shrinking the request) may let a retry succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Capacity | ErrorKind::State)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(
            EngineError::BelowMinimum { got: 0, min: 1 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(EngineError::NotRevealer.kind(), ErrorKind::Authorization);
        assert_eq!(
            EngineError::LiquidityQueueFull { max: 64 }.kind(),
            ErrorKind::Capacity
        );
        assert_eq!(EngineError::InvalidHash.kind(), ErrorKind::State);
        assert_eq!(
            EngineError::TransferRefused { amount: 1 }.kind(),
            ErrorKind::Transfer
        );
    }

    #[test]
    fn codes_are_unique() {
        let errors = [
            EngineError::BelowMinimum { got: 0, min: 1 },
            EngineError::InvalidIndex { index: 0, length: 0 },
            EngineError::InvalidBasisPoints {
                field: "x",
                got: 0,
                min: 0,
                max: 0,
            },
            EngineError::InvalidConfig {
                field: "x",
                got: 0,
                max: 0,
            },
            EngineError::InvalidLootTable("x"),
            EngineError::Overflow("x"),
            EngineError::InsufficientShares { requested: 0, held: 0 },
            EngineError::InsufficientFunds { requested: 0, balance: 0 },
            EngineError::NotOwner,
            EngineError::NotRevealer,
            EngineError::NotBetOwner { index: 0 },
            EngineError::RoundFull { max: 0 },
            EngineError::LiquidityQueueFull { max: 0 },
            EngineError::InsufficientLiquidity {
                requested: 0,
                available: 0,
            },
            EngineError::Inactive,
            EngineError::RoundInProgress,
            EngineError::RoundNotStarted,
            EngineError::BetCancelled { index: 0 },
            EngineError::InvalidCashoutIndex {
                elapsed: 0,
                cashout_index: 0,
            },
            EngineError::InvalidHash,
            EngineError::CalledTooEarly {
                current: 0,
                required: 0,
            },
            EngineError::RandomnessExpired { start_block: 0 },
            EngineError::RoundNotRefundable,
            EngineError::OneChangePerRound,
            EngineError::UnknownBet { index: 0 },
            EngineError::NothingToClaim,
            EngineError::TransferRefused { amount: 0 },
        ];
        let mut codes: Vec<u8> = errors.iter().map(EngineError::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn display_includes_context() {
        let err = EngineError::InsufficientLiquidity {
            requested: 50,
            available: 10,
        };
        assert_eq!(
            err.to_string(),
            "insufficient round liquidity (requested=50, available=10)"
        );
        assert!(err.is_retryable());
        assert!(!EngineError::NotOwner.is_retryable());

        let err = EngineError::InvalidConfig {
            field: "reduced_intro_blocks",
            got: 30,
            max: 20,
        };
        assert_eq!(
            err.to_string(),
            "reduced_intro_blocks out of range (got=30, max=20)"
        );
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.code(), ERROR_INVALID_CONFIG);
    }
}
