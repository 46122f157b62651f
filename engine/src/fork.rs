//! The fork schedule: mapping block height and timestamp to a rule set.

use hearth_engine_evm::Config;
use hearth_engine_precompiles::Precompiles;
use hearth_engine_types::types::{Address, Wei};
use hearth_engine_types::U256;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Every scheduled mainnet fork, oldest first. The discriminant order gives
/// the `>=` comparisons used for feature gating.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(Display, EnumString, Serialize, Deserialize)]
pub enum Fork {
    Frontier,
    Homestead,
    DaoFork,
    TangerineWhistle,
    SpuriousDragon,
    Byzantium,
    Constantinople,
    Petersburg,
    Istanbul,
    MuirGlacier,
    Berlin,
    London,
    ArrowGlacier,
    GrayGlacier,
    Paris,
    Shanghai,
    Cancun,
    Prague,
    Osaka,
}

impl Fork {
    /// The interpreter rule table of this fork. Glacier forks and the DAO
    /// fork only change block-level rules and share their predecessor's
    /// table.
    #[must_use]
    pub fn evm_config(self) -> Config {
        match self {
            Self::Frontier => Config::frontier(),
            Self::Homestead | Self::DaoFork => Config::homestead(),
            Self::TangerineWhistle => Config::tangerine_whistle(),
            Self::SpuriousDragon => Config::spurious_dragon(),
            Self::Byzantium => Config::byzantium(),
            Self::Constantinople | Self::Petersburg => Config::constantinople(),
            Self::Istanbul | Self::MuirGlacier => Config::istanbul(),
            Self::Berlin => Config::berlin(),
            Self::London | Self::ArrowGlacier | Self::GrayGlacier => Config::london(),
            Self::Paris => Config::paris(),
            Self::Shanghai => Config::shanghai(),
            Self::Cancun => Config::cancun(),
            Self::Prague => Config::prague(),
            Self::Osaka => Config::osaka(),
        }
    }

    /// The precompile roster of this fork.
    #[must_use]
    pub fn precompiles(self) -> Precompiles {
        match self {
            Self::Frontier => Precompiles::new_frontier(),
            Self::Homestead | Self::DaoFork | Self::TangerineWhistle | Self::SpuriousDragon => {
                Precompiles::new_homestead()
            }
            Self::Byzantium | Self::Constantinople | Self::Petersburg => {
                Precompiles::new_byzantium()
            }
            Self::Istanbul | Self::MuirGlacier => Precompiles::new_istanbul(),
            Self::Berlin => Precompiles::new_berlin(),
            Self::London | Self::ArrowGlacier | Self::GrayGlacier => Precompiles::new_london(),
            Self::Paris => Precompiles::new_paris(),
            Self::Shanghai => Precompiles::new_shanghai(),
            Self::Cancun => Precompiles::new_cancun(),
            Self::Prague => Precompiles::new_prague(),
            Self::Osaka => Precompiles::new_osaka(),
        }
    }

    /// Whether a transaction envelope type byte is accepted under this fork.
    #[must_use]
    pub fn accepts_transaction_type(self, type_byte: Option<u8>) -> bool {
        match type_byte {
            None => true,
            Some(0x01) => self >= Self::Berlin,
            Some(0x02) => self >= Self::London,
            Some(0x03) => self >= Self::Cancun,
            Some(0x04) => self >= Self::Prague,
            Some(_) => false,
        }
    }

    /// The static block reward, `None` once proof of stake removes it.
    #[must_use]
    pub fn block_reward(self) -> Option<Wei> {
        if self >= Self::Paris {
            None
        } else if self >= Self::Constantinople {
            Wei::from_eth(U256::from(2))
        } else if self >= Self::Byzantium {
            Wei::from_eth(U256::from(3))
        } else {
            Wei::from_eth(U256::from(5))
        }
    }

    /// The blob gas market parameters, where blob transactions exist.
    #[must_use]
    pub fn blob_schedule(self) -> Option<BlobSchedule> {
        if self >= Self::Prague {
            Some(BlobSchedule {
                target_blob_count: 6,
                max_blob_count: 9,
                base_fee_update_fraction: 5_007_716,
            })
        } else if self >= Self::Cancun {
            Some(BlobSchedule {
                target_blob_count: 3,
                max_blob_count: 6,
                base_fee_update_fraction: 3_338_477,
            })
        } else {
            None
        }
    }
}

/// Per-fork blob gas market parameters (EIP-4844, re-targeted by EIP-7691,
/// parameterized per EIP-7840).
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct BlobSchedule {
    pub target_blob_count: u64,
    pub max_blob_count: u64,
    pub base_fee_update_fraction: u64,
}

impl BlobSchedule {
    pub const GAS_PER_BLOB: u64 = 0x20000;

    #[must_use]
    pub fn target_blob_gas_per_block(&self) -> u64 {
        self.target_blob_count * Self::GAS_PER_BLOB
    }

    #[must_use]
    pub fn max_blob_gas_per_block(&self) -> u64 {
        self.max_blob_count * Self::GAS_PER_BLOB
    }
}

/// When a fork turns on.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
pub enum Activation {
    Block(u64),
    Timestamp(u64),
}

impl Activation {
    #[must_use]
    pub fn is_active(self, number: u64, timestamp: u64) -> bool {
        match self {
            Self::Block(block) => number >= block,
            Self::Timestamp(time) => timestamp >= time,
        }
    }
}

/// The chain configuration: a base fork plus scheduled upgrades, and the
/// irregular-state data that some forks carry.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    /// Rules before any scheduled transition hits.
    pub base_fork: Fork,
    /// Later forks with their activation points, in ascending fork order.
    pub transitions: Vec<(Activation, Fork)>,
    /// Block at which the DAO irregular state change applies.
    pub dao_fork_block: Option<u64>,
    /// Accounts drained by the DAO irregular state change.
    pub dao_drain_list: Vec<Address>,
}

impl ChainConfig {
    /// A chain that runs one fork from genesis on.
    #[must_use]
    pub fn new(fork: Fork) -> Self {
        Self {
            chain_id: 1,
            base_fork: fork,
            transitions: Vec::new(),
            dao_fork_block: None,
            dao_drain_list: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// A two-fork chain, e.g. "ShanghaiToCancunAtTime15k".
    #[must_use]
    pub fn transition(from: Fork, to: Fork, at: Activation) -> Self {
        Self {
            chain_id: 1,
            base_fork: from,
            transitions: vec![(at, to)],
            dao_fork_block: None,
            dao_drain_list: Vec::new(),
        }
    }

    /// The total rule-selection function: which fork applies to a block.
    #[must_use]
    pub fn fork_at(&self, number: u64, timestamp: u64) -> Fork {
        let mut active = self.base_fork;
        for (activation, fork) in &self.transitions {
            if activation.is_active(number, timestamp) {
                active = *fork;
            }
        }
        active
    }

    #[must_use]
    pub fn is_dao_block(&self, number: u64) -> bool {
        self.dao_fork_block == Some(number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_fork_names_round_trip() {
        assert_eq!(Fork::from_str("Cancun").unwrap(), Fork::Cancun);
        assert_eq!(Fork::from_str("TangerineWhistle").unwrap(), Fork::TangerineWhistle);
        assert_eq!(Fork::Prague.to_string(), "Prague");
        assert!(Fork::from_str("NotAFork").is_err());
    }

    #[test]
    fn test_fork_ordering() {
        assert!(Fork::Frontier < Fork::Homestead);
        assert!(Fork::Berlin < Fork::London);
        assert!(Fork::Prague < Fork::Osaka);
    }

    #[test]
    fn test_transition_schedule() {
        let chain = ChainConfig::transition(
            Fork::Shanghai,
            Fork::Cancun,
            Activation::Timestamp(15_000),
        );
        assert_eq!(chain.fork_at(1, 14_999), Fork::Shanghai);
        assert_eq!(chain.fork_at(1, 15_000), Fork::Cancun);
    }

    #[test]
    fn test_transaction_acceptance() {
        assert!(Fork::Homestead.accepts_transaction_type(None));
        assert!(!Fork::Istanbul.accepts_transaction_type(Some(0x01)));
        assert!(Fork::Berlin.accepts_transaction_type(Some(0x01)));
        assert!(!Fork::Berlin.accepts_transaction_type(Some(0x02)));
        assert!(Fork::Cancun.accepts_transaction_type(Some(0x03)));
        assert!(!Fork::Cancun.accepts_transaction_type(Some(0x04)));
        assert!(Fork::Prague.accepts_transaction_type(Some(0x04)));
    }

    #[test]
    fn test_block_rewards() {
        assert_eq!(Fork::Frontier.block_reward(), Wei::from_eth(U256::from(5)));
        assert_eq!(Fork::Byzantium.block_reward(), Wei::from_eth(U256::from(3)));
        assert_eq!(Fork::Istanbul.block_reward(), Wei::from_eth(U256::from(2)));
        assert_eq!(Fork::Paris.block_reward(), None);
    }

    #[test]
    fn test_blob_schedules() {
        assert_eq!(Fork::Shanghai.blob_schedule(), None);
        let cancun = Fork::Cancun.blob_schedule().unwrap();
        assert_eq!(cancun.max_blob_gas_per_block(), 6 * 131_072);
        let prague = Fork::Prague.blob_schedule().unwrap();
        assert_eq!(prague.target_blob_count, 6);
    }
}
