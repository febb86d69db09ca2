//! Loot tables: the multiplier track a round advances along.
//!
//! A loot table maps each track position (offset from the round's start block) to a payout
//! multiplier and a probability that the track dies at that position. Both are fixed-point
//! values scaled by [UNIT].
//!
//! ## Death Index
//!
//! Once every block of the track has been produced, the death index is found by scanning
//! positions in order. Position `i` samples 16 bytes from `hash(salt || block_hash[start + i])`
//! (or from the raw block hash, see [SampleMode]) and dies if `sample mod UNIT` falls below its
//! death probability. A bet wins iff its cashout index is strictly below the death index.

use std::fmt::Debug;

use commonware_cryptography::sha256::Sha256;
use commonware_cryptography::Hasher;
use crashpool_types::{
    EngineError, Hash, BASIS_POINTS_SCALE, MAX_LOOT_TABLE_LENGTH, MAX_LOOT_TABLE_NAME_LENGTH,
    UNIT, ZERO_HASH,
};
use serde::{Deserialize, Serialize};

use crate::randomness::RandomnessSource;

/// How a track position turns a block hash into a sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleMode {
    /// `hash(salt || block_hash)`.
    Salted,
    /// The block hash alone. The outcome is public as soon as the block is produced.
    RawBlockHash,
}

/// Result of scanning a track for its death index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeathProof {
    /// First dead position, or the table length if the track survived.
    pub dead_index: u64,
    /// Block hashes consumed by the scan (zeroed where the source no longer retains them).
    pub block_hashes: Vec<Hash>,
}

/// Derive the sample for one track position.
pub fn derive_sample(mode: SampleMode, salt: &Hash, block_hash: &Hash) -> u128 {
    let digest = match mode {
        SampleMode::Salted => {
            let mut hasher = Sha256::new();
            hasher.update(salt);
            hasher.update(block_hash);
            hasher.finalize().0
        }
        SampleMode::RawBlockHash => *block_hash,
    };
    let mut head = [0u8; 16];
    head.copy_from_slice(&digest[..16]);
    u128::from_be_bytes(head)
}

pub trait LootTable: Debug + Send + Sync {
    fn name(&self) -> &str;

    fn length(&self) -> u64;

    /// Multiplier at `index`; callers guarantee `index < length()`.
    fn multiplier_at(&self, index: u64) -> u128;

    /// Death probability at `index`; callers guarantee `index < length()`.
    fn death_probability_at(&self, index: u64) -> u128;

    fn sample_mode(&self) -> SampleMode {
        SampleMode::Salted
    }

    fn check_index(&self, index: u64) -> Result<(), EngineError> {
        let length = self.length();
        if index >= length {
            return Err(EngineError::InvalidIndex { index, length });
        }
        Ok(())
    }

    fn multiplier(&self, index: u64) -> Result<u128, EngineError> {
        self.check_index(index)?;
        Ok(self.multiplier_at(index))
    }

    fn death_probability(&self, index: u64) -> Result<u128, EngineError> {
        self.check_index(index)?;
        Ok(self.death_probability_at(index))
    }

    /// Payout of `amount` cashed out at `index`: `amount * multiplier / UNIT`.
    fn multiply(&self, amount: u64, index: u64) -> Result<u64, EngineError> {
        let multiplier = self.multiplier(index)?;
        let scaled = (amount as u128)
            .checked_mul(multiplier)
            .ok_or(EngineError::Overflow("multiply"))?
            / UNIT;
        u64::try_from(scaled).map_err(|_| EngineError::Overflow("multiply"))
    }

    fn is_dead(&self, sample: u128, index: u64) -> Result<bool, EngineError> {
        let probability = self.death_probability(index)?;
        Ok(sample % UNIT < probability)
    }

    /// Scan the track starting at `start_block` for its death index.
    fn death_proof(
        &self,
        source: &dyn RandomnessSource,
        salt: &Hash,
        start_block: u64,
    ) -> Result<DeathProof, EngineError> {
        let length = self.length();
        let required = start_block
            .checked_add(length)
            .ok_or(EngineError::Overflow("death_proof"))?;
        let current = source.current_block();
        if current < required {
            return Err(EngineError::CalledTooEarly { current, required });
        }

        let mode = self.sample_mode();
        let mut block_hashes = Vec::with_capacity(length as usize);
        for offset in 0..length {
            let block_hash = source.sample_at(start_block, offset).unwrap_or(ZERO_HASH);
            block_hashes.push(block_hash);
            let sample = derive_sample(mode, salt, &block_hash);
            if self.is_dead(sample, offset)? {
                return Ok(DeathProof {
                    dead_index: offset,
                    block_hashes,
                });
            }
        }
        Ok(DeathProof {
            dead_index: length,
            block_hashes,
        })
    }
}

/// Check a table before the engine accepts it.
///
/// Multipliers must be at least 1x and non-decreasing, so lowering a cashout index never raises
/// a payout above what was reserved.
pub fn validate_loot_table(table: &dyn LootTable) -> Result<(), EngineError> {
    let length = table.length();
    if length == 0 || length > MAX_LOOT_TABLE_LENGTH {
        return Err(EngineError::InvalidLootTable("length out of range"));
    }
    if table.name().is_empty() || table.name().len() > MAX_LOOT_TABLE_NAME_LENGTH {
        return Err(EngineError::InvalidLootTable("invalid name"));
    }
    let mut previous = UNIT;
    for index in 0..length {
        let multiplier = table.multiplier_at(index);
        if multiplier < previous {
            return Err(EngineError::InvalidLootTable("multipliers must be non-decreasing"));
        }
        previous = multiplier;
        if table.death_probability_at(index) > UNIT {
            return Err(EngineError::InvalidLootTable("death probability above one"));
        }
    }
    Ok(())
}

fn check_length(length: u64) -> Result<(), EngineError> {
    if length == 0 || length > MAX_LOOT_TABLE_LENGTH {
        return Err(EngineError::InvalidLootTable("length out of range"));
    }
    Ok(())
}

/// Single multiplier for every position with explicit per-position death probabilities.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FixedLootTable {
    name: String,
    multiplier: u128,
    death_probabilities: Vec<u128>,
    mode: SampleMode,
}

impl FixedLootTable {
    pub fn new(
        name: impl Into<String>,
        multiplier: u128,
        death_probabilities: Vec<u128>,
    ) -> Result<Self, EngineError> {
        check_length(death_probabilities.len() as u64)?;
        if multiplier < UNIT {
            return Err(EngineError::InvalidLootTable("multiplier below one"));
        }
        if death_probabilities.iter().any(|p| *p > UNIT) {
            return Err(EngineError::InvalidLootTable("death probability above one"));
        }
        Ok(Self {
            name: name.into(),
            multiplier,
            death_probabilities,
            mode: SampleMode::Salted,
        })
    }

    /// A track that survives every position before `dead_index` and dies there.
    ///
    /// `dead_index >= length` yields a track that never dies.
    pub fn with_death_at(
        length: u64,
        multiplier: u128,
        dead_index: u64,
    ) -> Result<Self, EngineError> {
        check_length(length)?;
        let death_probabilities = (0..length)
            .map(|index| if index == dead_index { UNIT } else { 0 })
            .collect();
        Self::new("fixed", multiplier, death_probabilities)
    }

    pub fn with_sample_mode(mut self, mode: SampleMode) -> Self {
        self.mode = mode;
        self
    }
}

impl LootTable for FixedLootTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn length(&self) -> u64 {
        self.death_probabilities.len() as u64
    }

    fn multiplier_at(&self, _index: u64) -> u128 {
        self.multiplier
    }

    fn death_probability_at(&self, index: u64) -> u128 {
        self.death_probabilities[index as usize]
    }

    fn sample_mode(&self) -> SampleMode {
        self.mode
    }
}

/// `multiplier[i] = base + step * i` with a constant death probability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearLootTable {
    length: u64,
    base: u128,
    step: u128,
    death_probability: u128,
    mode: SampleMode,
}

impl LinearLootTable {
    pub fn new(
        length: u64,
        base: u128,
        step: u128,
        death_probability: u128,
    ) -> Result<Self, EngineError> {
        check_length(length)?;
        if base < UNIT {
            return Err(EngineError::InvalidLootTable("multiplier below one"));
        }
        if death_probability > UNIT {
            return Err(EngineError::InvalidLootTable("death probability above one"));
        }
        step.checked_mul(length as u128)
            .and_then(|span| span.checked_add(base))
            .ok_or(EngineError::InvalidLootTable("multiplier overflows"))?;
        Ok(Self {
            length,
            base,
            step,
            death_probability,
            mode: SampleMode::Salted,
        })
    }

    pub fn with_sample_mode(mut self, mode: SampleMode) -> Self {
        self.mode = mode;
        self
    }
}

impl LootTable for LinearLootTable {
    fn name(&self) -> &str {
        "linear"
    }

    fn length(&self) -> u64 {
        self.length
    }

    fn multiplier_at(&self, index: u64) -> u128 {
        self.base + self.step * index as u128
    }

    fn death_probability_at(&self, _index: u64) -> u128 {
        self.death_probability
    }

    fn sample_mode(&self) -> SampleMode {
        self.mode
    }
}

/// Multiplier curve derived from a constant per-position hazard and a house edge.
///
/// `multiplier[i] * P(survive 0..=i) = 1 - edge`, floored at 1x.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DynamicLootTable {
    hazard: u128,
    house_edge_bps: u16,
    multipliers: Vec<u128>,
}

impl DynamicLootTable {
    pub fn new(length: u64, hazard: u128, house_edge_bps: u16) -> Result<Self, EngineError> {
        check_length(length)?;
        if hazard == 0 || hazard >= UNIT {
            return Err(EngineError::InvalidLootTable("hazard out of range"));
        }
        let mut table = Self {
            hazard,
            house_edge_bps: 0,
            multipliers: vec![UNIT; length as usize],
        };
        table.recompute(house_edge_bps)?;
        Ok(table)
    }

    pub fn house_edge_bps(&self) -> u16 {
        self.house_edge_bps
    }

    /// Rebuild the multiplier curve for a new house edge.
    pub fn recompute(&mut self, house_edge_bps: u16) -> Result<(), EngineError> {
        if house_edge_bps as u64 >= BASIS_POINTS_SCALE {
            return Err(EngineError::InvalidBasisPoints {
                field: "house_edge_bps",
                got: house_edge_bps as u64,
                min: 0,
                max: BASIS_POINTS_SCALE - 1,
            });
        }
        let target = UNIT * (BASIS_POINTS_SCALE - house_edge_bps as u64) as u128
            / BASIS_POINTS_SCALE as u128;

        let mut multipliers = Vec::with_capacity(self.multipliers.len());
        let mut survival = UNIT;
        for _ in 0..self.multipliers.len() {
            survival = survival * (UNIT - self.hazard) / UNIT;
            if survival == 0 {
                return Err(EngineError::InvalidLootTable("survival underflows"));
            }
            let multiplier = target
                .checked_mul(UNIT)
                .ok_or(EngineError::Overflow("recompute"))?
                / survival;
            multipliers.push(multiplier.max(UNIT));
        }
        self.multipliers = multipliers;
        self.house_edge_bps = house_edge_bps;
        Ok(())
    }
}

impl LootTable for DynamicLootTable {
    fn name(&self) -> &str {
        "dynamic"
    }

    fn length(&self) -> u64 {
        self.multipliers.len() as u64
    }

    fn multiplier_at(&self, index: u64) -> u128 {
        self.multipliers[index as usize]
    }

    fn death_probability_at(&self, _index: u64) -> u128 {
        self.hazard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockChain;

    const TWO_X: u128 = 2 * UNIT;

    #[test]
    fn test_multiply_scales_by_unit() {
        let table = LinearLootTable::new(10, UNIT, UNIT / 2, 0).unwrap();
        assert_eq!(table.multiply(100, 0).unwrap(), 100);
        assert_eq!(table.multiply(100, 1).unwrap(), 150);
        assert_eq!(table.multiply(3, 1).unwrap(), 4); // 4.5 floors
        assert_eq!(table.multiply(0, 9).unwrap(), 0);
    }

    #[test]
    fn test_index_out_of_range() {
        let table = FixedLootTable::with_death_at(5, TWO_X, 3).unwrap();
        assert_eq!(
            table.multiply(1, 5),
            Err(EngineError::InvalidIndex {
                index: 5,
                length: 5
            })
        );
        assert!(matches!(
            table.is_dead(0, 7),
            Err(EngineError::InvalidIndex { index: 7, .. })
        ));
    }

    #[test]
    fn test_multiply_overflow_is_reported() {
        let table = FixedLootTable::with_death_at(1, 4 * UNIT, 1).unwrap();
        assert_eq!(
            table.multiply(u64::MAX, 0),
            Err(EngineError::Overflow("multiply"))
        );
    }

    #[test]
    fn test_is_dead_uses_sample_mod_unit() {
        let table = FixedLootTable::new("half", TWO_X, vec![UNIT / 2]).unwrap();
        assert!(table.is_dead(0, 0).unwrap());
        assert!(table.is_dead(UNIT / 2 - 1, 0).unwrap());
        assert!(!table.is_dead(UNIT / 2, 0).unwrap());
        // Wraps modulo UNIT.
        assert!(table.is_dead(3 * UNIT + 1, 0).unwrap());
    }

    #[test]
    fn test_death_proof_requires_full_track() {
        let table = FixedLootTable::with_death_at(5, TWO_X, 3).unwrap();
        let mut chain = MockChain::new(1, 256);
        chain.set_height(104);
        assert_eq!(
            table.death_proof(&chain, &[1u8; 32], 100),
            Err(EngineError::CalledTooEarly {
                current: 104,
                required: 105
            })
        );

        chain.set_height(105);
        let proof = table.death_proof(&chain, &[1u8; 32], 100).unwrap();
        assert_eq!(proof.dead_index, 3);
        assert_eq!(proof.block_hashes.len(), 4);
        assert_eq!(proof.block_hashes[0], chain.hash_of(100));
    }

    #[test]
    fn test_death_proof_survives_whole_track() {
        let table = FixedLootTable::with_death_at(8, TWO_X, 8).unwrap();
        let mut chain = MockChain::new(2, 256);
        chain.set_height(50);
        let proof = table.death_proof(&chain, &[9u8; 32], 20).unwrap();
        assert_eq!(proof.dead_index, 8);
        assert_eq!(proof.block_hashes.len(), 8);
    }

    #[test]
    fn test_death_proof_zeroes_pruned_hashes() {
        let table = FixedLootTable::with_death_at(4, TWO_X, 4).unwrap();
        let mut chain = MockChain::new(3, 256);
        chain.set_height(400);
        let proof = table.death_proof(&chain, &[0u8; 32], 10).unwrap();
        assert!(proof.block_hashes.iter().all(|hash| *hash == ZERO_HASH));
    }

    #[test]
    fn test_sample_modes_differ() {
        let salt = [4u8; 32];
        let block_hash = [0xffu8; 32];
        assert_eq!(
            derive_sample(SampleMode::RawBlockHash, &salt, &block_hash),
            u128::MAX
        );
        assert_ne!(
            derive_sample(SampleMode::Salted, &salt, &block_hash),
            u128::MAX
        );
        // Salt changes the outcome.
        assert_ne!(
            derive_sample(SampleMode::Salted, &salt, &block_hash),
            derive_sample(SampleMode::Salted, &[5u8; 32], &block_hash)
        );
    }

    #[test]
    fn test_raw_mode_matches_block_hash_prefix() {
        let table = FixedLootTable::new("raw", TWO_X, vec![UNIT / 3; 16])
            .unwrap()
            .with_sample_mode(SampleMode::RawBlockHash);
        let mut chain = MockChain::new(11, 256);
        chain.set_height(100);

        let proof = table.death_proof(&chain, &[0u8; 32], 40).unwrap();
        let expected = (0..16)
            .find(|offset| {
                let block_hash = chain.hash_of(40 + offset);
                let sample = derive_sample(SampleMode::RawBlockHash, &[0u8; 32], &block_hash);
                sample % UNIT < UNIT / 3
            })
            .unwrap_or(16);
        assert_eq!(proof.dead_index, expected);
    }

    #[test]
    fn test_construction_validates_bounds() {
        assert_eq!(
            FixedLootTable::new("empty", TWO_X, vec![]),
            Err(EngineError::InvalidLootTable("length out of range"))
        );
        assert_eq!(
            FixedLootTable::with_death_at(MAX_LOOT_TABLE_LENGTH + 1, TWO_X, 0),
            Err(EngineError::InvalidLootTable("length out of range"))
        );
        assert_eq!(
            FixedLootTable::new("low", UNIT - 1, vec![0]),
            Err(EngineError::InvalidLootTable("multiplier below one"))
        );
        assert_eq!(
            LinearLootTable::new(4, UNIT, 0, UNIT + 1),
            Err(EngineError::InvalidLootTable("death probability above one"))
        );
        assert!(DynamicLootTable::new(4, 0, 100).is_err());
        assert!(DynamicLootTable::new(4, UNIT, 100).is_err());
    }

    #[test]
    fn test_validate_rejects_decreasing_multipliers() {
        #[derive(Debug)]
        struct Shrinking;

        impl LootTable for Shrinking {
            fn name(&self) -> &str {
                "shrinking"
            }
            fn length(&self) -> u64 {
                2
            }
            fn multiplier_at(&self, index: u64) -> u128 {
                if index == 0 {
                    TWO_X
                } else {
                    UNIT
                }
            }
            fn death_probability_at(&self, _index: u64) -> u128 {
                0
            }
        }

        assert_eq!(
            validate_loot_table(&Shrinking),
            Err(EngineError::InvalidLootTable(
                "multipliers must be non-decreasing"
            ))
        );
        let linear = LinearLootTable::new(256, UNIT, UNIT / 10, 0).unwrap();
        assert!(validate_loot_table(&linear).is_ok());
    }

    #[test]
    fn test_dynamic_curve_prices_survival() {
        // 1% hazard, 1% edge: the first position pays exactly 1x.
        let table = DynamicLootTable::new(100, UNIT / 100, 100).unwrap();
        assert_eq!(table.multiplier(0).unwrap(), UNIT);
        assert!(validate_loot_table(&table).is_ok());

        // multiplier[i] * survival(i) stays at 1 - edge within rounding.
        let mut survival = UNIT;
        for index in 0..100 {
            survival = survival * (UNIT - UNIT / 100) / UNIT;
            let expected_value = table.multiplier(index).unwrap() * survival / UNIT;
            let target = UNIT * 99 / 100;
            assert!(expected_value <= target);
            assert!(target - expected_value < 1_000);
        }
    }

    #[test]
    fn test_dynamic_recompute_raises_edge() {
        let mut table = DynamicLootTable::new(50, UNIT / 20, 100).unwrap();
        let before = table.multiplier(49).unwrap();
        table.recompute(500).unwrap();
        assert_eq!(table.house_edge_bps(), 500);
        assert!(table.multiplier(49).unwrap() < before);
        assert!(table.recompute(10_000).is_err());
        assert_eq!(table.house_edge_bps(), 500);
    }
}
