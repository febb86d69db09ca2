//! Crashpool domain types.
//!
//! Defines the round, bet, liquidity and event types shared by the execution engine and its
//! clients, together with their canonical binary encodings, the error taxonomy and the
//! protocol constants.

mod codec;
mod constants;
mod error;
mod event;
mod liquidity;
mod round;

use commonware_cryptography::ed25519::PublicKey;

pub use codec::{
    hashes_encode_size, read_hash, read_hashes, read_string, string_encode_size, write_hash,
    write_hashes, write_string, HASH_SIZE,
};
pub use constants::*;
pub use error::{EngineError, ErrorKind};
pub use event::{ConfigField, Event};
pub use liquidity::{LiquidityAction, LiquidityChange, LiquidityPosition};
pub use round::{Bet, RoundPhase, RoundSnapshot};

/// Identity of a bettor, depositor, owner or revealer.
pub type Account = PublicKey;

/// A SHA-256 digest (commitments, block hashes, salts).
pub type Hash = [u8; 32];

/// The all-zero hash reported for blocks the randomness source no longer retains.
pub const ZERO_HASH: Hash = [0u8; 32];
