use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;
use serde::{Deserialize, Serialize};

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityAction {
    /// `amount` is value to add to the pool.
    Deposit = 0,
    /// `amount` is shares to redeem.
    Withdraw = 1,
}

impl TryFrom<u8> for LiquidityAction {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(LiquidityAction::Deposit),
            1 => Ok(LiquidityAction::Withdraw),
            _ => Err(()),
        }
    }
}

impl Write for LiquidityAction {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for LiquidityAction {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        LiquidityAction::try_from(value).map_err(|_| Error::InvalidEnum(value))
    }
}

impl EncodeSize for LiquidityAction {
    fn encode_size(&self) -> usize {
        u8::SIZE
    }
}

/// A liquidity change queued while a round is scheduled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LiquidityChange {
    pub depositor: PublicKey,
    pub amount: u64,
    pub action: LiquidityAction,
}

impl Write for LiquidityChange {
    fn write(&self, writer: &mut impl BufMut) {
        self.depositor.write(writer);
        self.amount.write(writer);
        self.action.write(writer);
    }
}

impl Read for LiquidityChange {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            depositor: PublicKey::read(reader)?,
            amount: u64::read(reader)?,
            action: LiquidityAction::read(reader)?,
        })
    }
}

impl EncodeSize for LiquidityChange {
    fn encode_size(&self) -> usize {
        PublicKey::SIZE + u64::SIZE + u8::SIZE
    }
}

/// A depositor's claim on the pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LiquidityPosition {
    pub shares: u64,
    /// Round nonce of the last queued change (0 = never queued).
    pub last_queue_nonce: u64,
}

impl Write for LiquidityPosition {
    fn write(&self, writer: &mut impl BufMut) {
        self.shares.write(writer);
        self.last_queue_nonce.write(writer);
    }
}

impl Read for LiquidityPosition {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        Ok(Self {
            shares: u64::read(reader)?,
            last_queue_nonce: u64::read(reader)?,
        })
    }
}

impl EncodeSize for LiquidityPosition {
    fn encode_size(&self) -> usize {
        u64::SIZE + u64::SIZE
    }
}
