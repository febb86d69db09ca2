use bytes::{Buf, BufMut};
use commonware_codec::{EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use commonware_cryptography::ed25519::PublicKey;

use super::{
    read_hash, read_string, string_encode_size, write_hash, write_string, Hash, LiquidityAction,
    HASH_SIZE, MAX_LOOT_TABLE_NAME_LENGTH,
};

/// Owner-tunable parameters reported by [Event::ConfigUpdated].
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigField {
    Minimum = 0,
    IntroBlocks = 1,
    ReducedIntroBlocks = 2,
    CancelReturn = 3,
    MaxExposure = 4,
    LowLiquidityThreshold = 5,
}

impl TryFrom<u8> for ConfigField {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ConfigField::Minimum),
            1 => Ok(ConfigField::IntroBlocks),
            2 => Ok(ConfigField::ReducedIntroBlocks),
            3 => Ok(ConfigField::CancelReturn),
            4 => Ok(ConfigField::MaxExposure),
            5 => Ok(ConfigField::LowLiquidityThreshold),
            _ => Err(()),
        }
    }
}

impl Write for ConfigField {
    fn write(&self, writer: &mut impl BufMut) {
        (*self as u8).write(writer);
    }
}

impl Read for ConfigField {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let value = u8::read(reader)?;
        ConfigField::try_from(value).map_err(|_| Error::InvalidEnum(value))
    }
}

impl EncodeSize for ConfigField {
    fn encode_size(&self) -> usize {
        u8::SIZE
    }
}

/// Observable state transitions, returned by every engine operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    // Round events (tags 1-4)
    RoundStarted {
        hash_index: u64,
        start_block: u64,
    },
    RoundAccelerated {
        hash_index: u64,
        start_block: u64,
    },
    RoundEnded {
        hash_index: u64,
        dead_index: u64,
        salt: Hash,
        next_committed_hash: Hash,
        paid: u64,
        forfeited: u64,
    },
    RoundRefunded {
        hash_index: u64,
        refunded: u64,
    },

    // Bet events (tags 10-14)
    BetPlaced {
        index: u32,
        owner: PublicKey,
        amount: u64,
        cashout_index: u64,
    },
    BetUpdated {
        index: u32,
        cashout_index: u64,
    },
    BetCashout {
        index: u32,
        cashout_index: u64,
    },
    BetCancelled {
        index: u32,
        refund: u64,
    },
    BetPaid {
        index: u32,
        owner: PublicKey,
        payout: u64,
    },

    // Loot table events (tags 20-21)
    LootTableUpdated {
        name: String,
        length: u64,
    },
    LootTableStaged {
        name: String,
        length: u64,
    },

    // Liquidity events (tags 30-33)
    LiquidityAdded {
        depositor: PublicKey,
        amount: u64,
        shares: u64,
    },
    LiquidityRemoved {
        depositor: PublicKey,
        shares: u64,
        amount: u64,
    },
    LiquidityQueued {
        depositor: PublicKey,
        action: LiquidityAction,
        amount: u64,
    },
    LowLiquidity {
        available: u64,
    },

    // Transfer events (tags 40-41)
    PaymentStaged {
        recipient: PublicKey,
        amount: u64,
    },
    Claimed {
        account: PublicKey,
        amount: u64,
    },

    // Admin events (tags 50-52)
    ActiveChanged {
        active: bool,
    },
    ConfigUpdated {
        field: ConfigField,
        value: u64,
    },
    HashProducerChanged {
        producer: PublicKey,
    },
}

impl Write for Event {
    fn write(&self, writer: &mut impl BufMut) {
        match self {
            Self::RoundStarted {
                hash_index,
                start_block,
            } => {
                1u8.write(writer);
                hash_index.write(writer);
                start_block.write(writer);
            }
            Self::RoundAccelerated {
                hash_index,
                start_block,
            } => {
                2u8.write(writer);
                hash_index.write(writer);
                start_block.write(writer);
            }
            Self::RoundEnded {
                hash_index,
                dead_index,
                salt,
                next_committed_hash,
                paid,
                forfeited,
            } => {
                3u8.write(writer);
                hash_index.write(writer);
                dead_index.write(writer);
                write_hash(salt, writer);
                write_hash(next_committed_hash, writer);
                paid.write(writer);
                forfeited.write(writer);
            }
            Self::RoundRefunded {
                hash_index,
                refunded,
            } => {
                4u8.write(writer);
                hash_index.write(writer);
                refunded.write(writer);
            }
            Self::BetPlaced {
                index,
                owner,
                amount,
                cashout_index,
            } => {
                10u8.write(writer);
                index.write(writer);
                owner.write(writer);
                amount.write(writer);
                cashout_index.write(writer);
            }
            Self::BetUpdated {
                index,
                cashout_index,
            } => {
                11u8.write(writer);
                index.write(writer);
                cashout_index.write(writer);
            }
            Self::BetCashout {
                index,
                cashout_index,
            } => {
                12u8.write(writer);
                index.write(writer);
                cashout_index.write(writer);
            }
            Self::BetCancelled { index, refund } => {
                13u8.write(writer);
                index.write(writer);
                refund.write(writer);
            }
            Self::BetPaid {
                index,
                owner,
                payout,
            } => {
                14u8.write(writer);
                index.write(writer);
                owner.write(writer);
                payout.write(writer);
            }
            Self::LootTableUpdated { name, length } => {
                20u8.write(writer);
                write_string(name, writer);
                length.write(writer);
            }
            Self::LootTableStaged { name, length } => {
                21u8.write(writer);
                write_string(name, writer);
                length.write(writer);
            }
            Self::LiquidityAdded {
                depositor,
                amount,
                shares,
            } => {
                30u8.write(writer);
                depositor.write(writer);
                amount.write(writer);
                shares.write(writer);
            }
            Self::LiquidityRemoved {
                depositor,
                shares,
                amount,
            } => {
                31u8.write(writer);
                depositor.write(writer);
                shares.write(writer);
                amount.write(writer);
            }
            Self::LiquidityQueued {
                depositor,
                action,
                amount,
            } => {
                32u8.write(writer);
                depositor.write(writer);
                action.write(writer);
                amount.write(writer);
            }
            Self::LowLiquidity { available } => {
                33u8.write(writer);
                available.write(writer);
            }
            Self::PaymentStaged { recipient, amount } => {
                40u8.write(writer);
                recipient.write(writer);
                amount.write(writer);
            }
            Self::Claimed { account, amount } => {
                41u8.write(writer);
                account.write(writer);
                amount.write(writer);
            }
            Self::ActiveChanged { active } => {
                50u8.write(writer);
                active.write(writer);
            }
            Self::ConfigUpdated { field, value } => {
                51u8.write(writer);
                field.write(writer);
                value.write(writer);
            }
            Self::HashProducerChanged { producer } => {
                52u8.write(writer);
                producer.write(writer);
            }
        }
    }
}

impl Read for Event {
    type Cfg = ();

    fn read_cfg(reader: &mut impl Buf, _: &Self::Cfg) -> Result<Self, Error> {
        let kind = u8::read(reader)?;
        let event = match kind {
            1 => Self::RoundStarted {
                hash_index: u64::read(reader)?,
                start_block: u64::read(reader)?,
            },
            2 => Self::RoundAccelerated {
                hash_index: u64::read(reader)?,
                start_block: u64::read(reader)?,
            },
            3 => Self::RoundEnded {
                hash_index: u64::read(reader)?,
                dead_index: u64::read(reader)?,
                salt: read_hash(reader)?,
                next_committed_hash: read_hash(reader)?,
                paid: u64::read(reader)?,
                forfeited: u64::read(reader)?,
            },
            4 => Self::RoundRefunded {
                hash_index: u64::read(reader)?,
                refunded: u64::read(reader)?,
            },
            10 => Self::BetPlaced {
                index: u32::read(reader)?,
                owner: PublicKey::read(reader)?,
                amount: u64::read(reader)?,
                cashout_index: u64::read(reader)?,
            },
            11 => Self::BetUpdated {
                index: u32::read(reader)?,
                cashout_index: u64::read(reader)?,
            },
            12 => Self::BetCashout {
                index: u32::read(reader)?,
                cashout_index: u64::read(reader)?,
            },
            13 => Self::BetCancelled {
                index: u32::read(reader)?,
                refund: u64::read(reader)?,
            },
            14 => Self::BetPaid {
                index: u32::read(reader)?,
                owner: PublicKey::read(reader)?,
                payout: u64::read(reader)?,
            },
            20 => Self::LootTableUpdated {
                name: read_string(reader, MAX_LOOT_TABLE_NAME_LENGTH)?,
                length: u64::read(reader)?,
            },
            21 => Self::LootTableStaged {
                name: read_string(reader, MAX_LOOT_TABLE_NAME_LENGTH)?,
                length: u64::read(reader)?,
            },
            30 => Self::LiquidityAdded {
                depositor: PublicKey::read(reader)?,
                amount: u64::read(reader)?,
                shares: u64::read(reader)?,
            },
            31 => Self::LiquidityRemoved {
                depositor: PublicKey::read(reader)?,
                shares: u64::read(reader)?,
                amount: u64::read(reader)?,
            },
            32 => Self::LiquidityQueued {
                depositor: PublicKey::read(reader)?,
                action: LiquidityAction::read(reader)?,
                amount: u64::read(reader)?,
            },
            33 => Self::LowLiquidity {
                available: u64::read(reader)?,
            },
            40 => Self::PaymentStaged {
                recipient: PublicKey::read(reader)?,
                amount: u64::read(reader)?,
            },
            41 => Self::Claimed {
                account: PublicKey::read(reader)?,
                amount: u64::read(reader)?,
            },
            50 => Self::ActiveChanged {
                active: bool::read(reader)?,
            },
            51 => Self::ConfigUpdated {
                field: ConfigField::read(reader)?,
                value: u64::read(reader)?,
            },
            52 => Self::HashProducerChanged {
                producer: PublicKey::read(reader)?,
            },
            i => return Err(Error::InvalidEnum(i)),
        };
        Ok(event)
    }
}

impl EncodeSize for Event {
    fn encode_size(&self) -> usize {
        u8::SIZE
            + match self {
                Self::RoundStarted { .. } | Self::RoundAccelerated { .. } => {
                    u64::SIZE + u64::SIZE
                }
                Self::RoundEnded { .. } => {
                    u64::SIZE + u64::SIZE + HASH_SIZE + HASH_SIZE + u64::SIZE + u64::SIZE
                }
                Self::RoundRefunded { .. } => u64::SIZE + u64::SIZE,
                Self::BetPlaced { .. } => u32::SIZE + PublicKey::SIZE + u64::SIZE + u64::SIZE,
                Self::BetUpdated { .. } | Self::BetCashout { .. } | Self::BetCancelled { .. } => {
                    u32::SIZE + u64::SIZE
                }
                Self::BetPaid { .. } => u32::SIZE + PublicKey::SIZE + u64::SIZE,
                Self::LootTableUpdated { name, .. } | Self::LootTableStaged { name, .. } => {
                    string_encode_size(name) + u64::SIZE
                }
                Self::LiquidityAdded { .. } | Self::LiquidityRemoved { .. } => {
                    PublicKey::SIZE + u64::SIZE + u64::SIZE
                }
                Self::LiquidityQueued { .. } => PublicKey::SIZE + u8::SIZE + u64::SIZE,
                Self::LowLiquidity { .. } => u64::SIZE,
                Self::PaymentStaged { .. } | Self::Claimed { .. } => PublicKey::SIZE + u64::SIZE,
                Self::ActiveChanged { .. } => bool::SIZE,
                Self::ConfigUpdated { .. } => u8::SIZE + u64::SIZE,
                Self::HashProducerChanged { .. } => PublicKey::SIZE,
            }
    }
}
