//! Commit-reveal randomness for provably fair rounds.
//!
//! ## Commit-Reveal Flow
//!
//! 1. **Commit** - The hash producer publishes `commit = hash(salt)` before any bet is placed
//! 2. **Track** - Blocks are produced; each block hash is fixed before the salt is known
//! 3. **Reveal** - The producer discloses `salt`; anyone can check `hash(salt) == commit`
//! 4. **Derive** - Each track position samples `hash(salt || block_hash)`
//!
//! Neither party controls the outcome alone: the producer committed before the block hashes
//! existed, and block producers cannot see the salt.
//!
//! ## Retention
//!
//! Block hashes are only retrievable for a fixed window. Once the first block of a round falls
//! out of the window the round can never be revealed and must be refunded instead.

use commonware_cryptography::sha256::Sha256;
use commonware_cryptography::Hasher;
use crashpool_types::Hash;

/// Delayed-reveal block hash oracle.
pub trait RandomnessSource {
    /// Height of the block currently being produced.
    fn current_block(&self) -> u64;

    /// Number of most recent blocks whose hashes remain retrievable.
    fn retention(&self) -> u64;

    /// Hash of block `anchor + offset`.
    ///
    /// Returns `None` if the block has not been produced yet or has fallen out of the
    /// retention window (fails closed).
    fn sample_at(&self, anchor: u64, offset: u64) -> Option<Hash>;

    /// Whether the hash of block `anchor` is, or will become, retrievable.
    fn is_available(&self, anchor: u64) -> bool {
        self.current_block().saturating_sub(anchor) <= self.retention()
    }
}

/// Compute a commitment from a salt.
///
/// Uses SHA256: `commit = hash(salt)`
pub fn compute_commit(salt: &Hash) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.finalize().0
}

/// Verify that a commitment matches a salt.
pub fn verify_commit(commit: &Hash, salt: &Hash) -> bool {
    &compute_commit(salt) == commit
}

/// A commitment and the salt it hides.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitRevealPair {
    /// Published before the round's first bet.
    pub commit: Hash,
    /// Disclosed once the round's track has been produced.
    pub salt: Hash,
}

impl CommitRevealPair {
    pub fn verify(&self) -> bool {
        verify_commit(&self.commit, &self.salt)
    }
}

/// Deterministic salt schedule for the hash producer.
///
/// `salt[n] = hash(secret || n || "salt")`, so the producer only has to keep one secret to
/// reveal round `n` and commit round `n + 1`.
#[derive(Clone)]
pub struct SaltChain {
    secret: Hash,
}

impl SaltChain {
    pub fn from_secret(secret: Hash) -> Self {
        Self { secret }
    }

    /// Derive the secret from a human-chosen seed.
    pub fn from_seed(seed: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(&seed.to_be_bytes());
        hasher.update(b"salt_chain_secret");
        Self {
            secret: hasher.finalize().0,
        }
    }

    pub fn salt(&self, hash_index: u64) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update(&hash_index.to_be_bytes());
        hasher.update(b"salt");
        hasher.finalize().0
    }

    pub fn commit(&self, hash_index: u64) -> Hash {
        compute_commit(&self.salt(hash_index))
    }

    pub fn pair(&self, hash_index: u64) -> CommitRevealPair {
        let salt = self.salt(hash_index);
        CommitRevealPair {
            commit: compute_commit(&salt),
            salt,
        }
    }
}

impl std::fmt::Debug for SaltChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaltChain")
            .field("secret", &"<redacted>")
            .finish()
    }
}
