use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, ReadRangeExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use serde::{Deserialize, Serialize};

use super::{
    hashes_encode_size, read_hash, read_hashes, read_string, string_encode_size, write_hash,
    write_hashes, write_string, Hash, HASH_SIZE, MAX_LOOT_TABLE_LENGTH,
    MAX_LOOT_TABLE_NAME_LENGTH, MAX_SNAPSHOT_BETS,
};

/// Phase of the current round, derived from `start_block` and the current block.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// No round scheduled (`start_block == 0`).
    Idle = 0,
    /// Round scheduled, track not started; bets may be placed, updated and cancelled.
    Betting = 1,
    /// Track running; bets may only be cashed out downward.
    InProgress = 2,
    /// Randomness is no longer retrievable; only an emergency refund can settle.
    Expired = 3,
}

impl TryFrom<u8> for RoundPhase {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RoundPhase::Idle),
            1 => Ok(RoundPhase::Betting),
            2 => Ok(RoundPhase::InProgress),
            3 => Ok(RoundPhase::Expired),
            _ => Err(()),
        }
    }
}

impl Write for RoundPhase {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for RoundPhase {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        RoundPhase::try_from(value).map_err(|_| Error::InvalidEnum(value))
    }
}

impl EncodeSize for RoundPhase {
    fn encode_size(&self) -> usize {
        u8::SIZE
    }
}

/// A wager in the current round, identified by its position in the round's bet list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Bet {
    pub owner: PublicKey,
    pub amount: u64,
    /// Track position the bet cashes out at; lowered by an in-progress cashout.
    pub cashout_index: u64,
    pub cancelled: bool,
}

impl Bet {
    pub fn new(owner: PublicKey, amount: u64, cashout_index: u64) -> Self {
        Self {
            owner,
            amount,
            cashout_index,
            cancelled: false,
        }
    }
}

impl Write for Bet {
    fn write(&self, writer: &mut impl BufMut) {
        self.owner.write(writer);
        self.amount.write(writer);
        self.cashout_index.write(writer);
        self.cancelled.write(writer);
    }
}

impl Read for Bet {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let owner = PublicKey::read(reader)?;
        let amount = u64::read(reader)?;
        let cashout_index = u64::read(reader)?;
        if cashout_index >= MAX_LOOT_TABLE_LENGTH {
            return Err(Error::Invalid("Bet", "cashout index out of range"));
        }
        let cancelled = bool::read(reader)?;
        Ok(Self {
            owner,
            amount,
            cashout_index,
            cancelled,
        })
    }
}

impl EncodeSize for Bet {
    fn encode_size(&self) -> usize {
        PublicKey::SIZE + u64::SIZE + u64::SIZE + bool::SIZE
    }
}

/// Read-only view of the round, as served to clients.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundSnapshot {
    pub active: bool,
    pub hash_index: u64,
    pub phase: RoundPhase,
    pub start_block: u64,
    pub current_block: u64,
    pub loot_table: String,
    pub loot_table_length: u64,
    pub minimum: u64,
    pub available_liquidity: u64,
    pub committed_hash: Hash,
    pub bets: Vec<Bet>,
    /// Block hashes of the track observed so far; zeroed once the round has expired.
    pub block_hashes: Vec<Hash>,
}

impl Write for RoundSnapshot {
    fn write(&self, writer: &mut impl BufMut) {
        self.active.write(writer);
        self.hash_index.write(writer);
        self.phase.write(writer);
        self.start_block.write(writer);
        self.current_block.write(writer);
        write_string(&self.loot_table, writer);
        self.loot_table_length.write(writer);
        self.minimum.write(writer);
        self.available_liquidity.write(writer);
        write_hash(&self.committed_hash, writer);
        self.bets.write(writer);
        write_hashes(&self.block_hashes, writer);
    }
}

impl Read for RoundSnapshot {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let active = bool::read(reader)?;
        let hash_index = u64::read(reader)?;
        let phase = RoundPhase::read(reader)?;
        let start_block = u64::read(reader)?;
        let current_block = u64::read(reader)?;
        let loot_table = read_string(reader, MAX_LOOT_TABLE_NAME_LENGTH)?;
        let loot_table_length = u64::read(reader)?;
        if loot_table_length > MAX_LOOT_TABLE_LENGTH {
            return Err(Error::Invalid("RoundSnapshot", "loot table too long"));
        }
        let minimum = u64::read(reader)?;
        let available_liquidity = u64::read(reader)?;
        let committed_hash = read_hash(reader)?;
        let bets = Vec::<Bet>::read_range(reader, 0..=MAX_SNAPSHOT_BETS)?;
        let block_hashes = read_hashes(reader, MAX_LOOT_TABLE_LENGTH as usize)?;
        if (start_block == 0) != bets.is_empty() {
            return Err(Error::Invalid("RoundSnapshot", "bets without scheduled round"));
        }

        Ok(Self {
            active,
            hash_index,
            phase,
            start_block,
            current_block,
            loot_table,
            loot_table_length,
            minimum,
            available_liquidity,
            committed_hash,
            bets,
            block_hashes,
        })
    }
}

impl EncodeSize for RoundSnapshot {
    fn encode_size(&self) -> usize {
        self.active.encode_size()
            + self.hash_index.encode_size()
            + self.phase.encode_size()
            + self.start_block.encode_size()
            + self.current_block.encode_size()
            + string_encode_size(&self.loot_table)
            + self.loot_table_length.encode_size()
            + self.minimum.encode_size()
            + self.available_liquidity.encode_size()
            + HASH_SIZE
            + self.bets.encode_size()
            + hashes_encode_size(&self.block_hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BytesMut;
    use commonware_codec::DecodeExt as _;
    use commonware_cryptography::{ed25519::PrivateKey, Signer};

    fn sample_snapshot() -> RoundSnapshot {
        let alice = PrivateKey::from_seed(1).public_key();
        let bob = PrivateKey::from_seed(2).public_key();
        RoundSnapshot {
            active: true,
            hash_index: 7,
            phase: RoundPhase::InProgress,
            start_block: 120,
            current_block: 123,
            loot_table: "linear".to_string(),
            loot_table_length: 50,
            minimum: 10,
            available_liquidity: 4_200,
            committed_hash: [0xab; 32],
            bets: vec![
                Bet::new(alice, 100, 4),
                Bet {
                    cancelled: true,
                    ..Bet::new(bob, 25, 12)
                },
            ],
            block_hashes: vec![[1u8; 32], [2u8; 32], [3u8; 32]],
        }
    }

    #[test]
    fn phase_rejects_unknown_tag() {
        let buf = [9u8];
        let mut reader = &buf[..];
        let err = RoundPhase::read(&mut reader).expect_err("tag 9 is not a phase");
        assert!(matches!(err, Error::InvalidEnum(9)));
    }

    #[test]
    fn snapshot_encode_size_matches_bytes() {
        let snapshot = sample_snapshot();
        let mut buf = BytesMut::new();
        snapshot.write(&mut buf);
        assert_eq!(buf.len(), snapshot.encode_size());

        let decoded = RoundSnapshot::decode(buf.as_ref()).expect("decode snapshot");
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn snapshot_rejects_bets_on_idle_round() {
        let mut snapshot = sample_snapshot();
        snapshot.start_block = 0;
        snapshot.phase = RoundPhase::Idle;
        let mut buf = BytesMut::new();
        snapshot.write(&mut buf);

        let err = RoundSnapshot::decode(buf.as_ref()).expect_err("idle round cannot hold bets");
        assert!(matches!(
            err,
            Error::Invalid("RoundSnapshot", "bets without scheduled round")
        ));
    }

    #[test]
    fn bet_rejects_out_of_range_cashout_index() {
        let mut bet = Bet::new(PrivateKey::from_seed(3).public_key(), 1, 0);
        bet.cashout_index = MAX_LOOT_TABLE_LENGTH;
        let mut buf = BytesMut::new();
        bet.write(&mut buf);

        let err = Bet::decode(buf.as_ref()).expect_err("index beyond any loot table");
        assert!(matches!(err, Error::Invalid("Bet", "cashout index out of range")));
    }
}
