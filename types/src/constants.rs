/// Denominator for every basis-point configuration value.
pub const BASIS_POINTS_SCALE: u64 = 10_000;

/// Fixed-point scale for loot table multipliers and death probabilities (1e18).
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Number of recent blocks whose hashes the randomness source retains.
pub const BLOCK_HASH_RETENTION: u64 = 256;

/// Upper bound on loot table length. Every block of the track must still be
/// retained when the round is revealed.
pub const MAX_LOOT_TABLE_LENGTH: u64 = BLOCK_HASH_RETENTION;

/// Default bound on bets per round.
pub const DEFAULT_MAX_BETS_PER_ROUND: usize = 256;

/// Bound used by the smaller deployment profile.
pub const COMPACT_MAX_BETS_PER_ROUND: usize = 128;

/// Default bound on queued liquidity changes per round.
pub const DEFAULT_MAX_LIQUIDITY_QUEUE: usize = 64;

/// Default minimum stake / liquidity change.
pub const DEFAULT_MINIMUM: u64 = 1;

/// Default blocks between the first bet and the start of the track.
pub const DEFAULT_INTRO_BLOCKS: u64 = 20;

/// Default intro delay once the round is undercapitalized.
pub const DEFAULT_REDUCED_INTRO_BLOCKS: u64 = 5;

/// Default refund fraction on cancellation (97%).
pub const DEFAULT_CANCEL_RETURN_BPS: u16 = 9_700;

/// Max exposure bounds (1%..=50% of pool value per round).
pub const MIN_MAX_EXPOSURE_BPS: u16 = 100;
pub const MAX_MAX_EXPOSURE_BPS: u16 = 5_000;

/// Default max exposure (10% of pool value per round).
pub const DEFAULT_MAX_EXPOSURE_BPS: u16 = 1_000;

/// Default low-liquidity threshold: 20% of the round cap still unreserved.
pub const DEFAULT_LOW_LIQUIDITY_THRESHOLD_BPS: u16 = 2_000;

/// Maximum bets returned in a round snapshot.
pub const MAX_SNAPSHOT_BETS: usize = 1_024;

/// Maximum queued liquidity changes carried in a snapshot or event stream.
pub const MAX_SNAPSHOT_QUEUE: usize = 1_024;

/// Maximum length of a loot table name.
pub const MAX_LOOT_TABLE_NAME_LENGTH: usize = 64;

/// Error codes reported alongside `EngineError`.
pub const ERROR_BELOW_MINIMUM: u8 = 1;
pub const ERROR_INVALID_INDEX: u8 = 2;
pub const ERROR_INVALID_BASIS_POINTS: u8 = 3;
pub const ERROR_INVALID_LOOT_TABLE: u8 = 4;
pub const ERROR_OVERFLOW: u8 = 5;
pub const ERROR_INSUFFICIENT_SHARES: u8 = 6;
pub const ERROR_INSUFFICIENT_FUNDS: u8 = 7;
pub const ERROR_INVALID_CONFIG: u8 = 8;
pub const ERROR_NOT_OWNER: u8 = 10;
pub const ERROR_NOT_REVEALER: u8 = 11;
pub const ERROR_NOT_BET_OWNER: u8 = 12;
pub const ERROR_ROUND_FULL: u8 = 20;
pub const ERROR_LIQUIDITY_QUEUE_FULL: u8 = 21;
pub const ERROR_INSUFFICIENT_LIQUIDITY: u8 = 22;
pub const ERROR_INACTIVE: u8 = 30;
pub const ERROR_ROUND_IN_PROGRESS: u8 = 31;
pub const ERROR_ROUND_NOT_STARTED: u8 = 32;
pub const ERROR_BET_CANCELLED: u8 = 33;
pub const ERROR_INVALID_CASHOUT_INDEX: u8 = 34;
pub const ERROR_INVALID_HASH: u8 = 35;
pub const ERROR_CALLED_TOO_EARLY: u8 = 36;
pub const ERROR_RANDOMNESS_EXPIRED: u8 = 37;
pub const ERROR_ROUND_NOT_REFUNDABLE: u8 = 38;
pub const ERROR_ONE_CHANGE_PER_ROUND: u8 = 39;
pub const ERROR_UNKNOWN_BET: u8 = 40;
pub const ERROR_NOTHING_TO_CLAIM: u8 = 41;
pub const ERROR_TRANSFER_REFUSED: u8 = 50;
