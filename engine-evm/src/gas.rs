//! Gas cost constants and the dynamic-cost formulas.

use crate::config::Config;
use crate::error::ExitError;
use hearth_engine_types::{H256, U256};

pub const G_ZERO: u64 = 0;
pub const G_BASE: u64 = 2;
pub const G_VERY_LOW: u64 = 3;
pub const G_LOW: u64 = 5;
pub const G_MID: u64 = 8;
pub const G_HIGH: u64 = 10;
pub const G_JUMPDEST: u64 = 1;
pub const G_EXP: u64 = 10;
pub const G_KECCAK256: u64 = 30;
pub const G_KECCAK256_WORD: u64 = 6;
pub const G_COPY: u64 = 3;
pub const G_MEMORY: u64 = 3;
pub const G_BLOCKHASH: u64 = 20;
pub const G_LOG: u64 = 375;
pub const G_LOG_DATA: u64 = 8;
pub const G_LOG_TOPIC: u64 = 375;
pub const G_CREATE: u64 = 32_000;
pub const G_SELF_BALANCE: u64 = 5;
pub const G_BLOBHASH: u64 = 3;

/// Converts a stack word to `usize`, treating anything unaddressable as out of
/// gas (the expansion cost of such an offset always exceeds any budget).
pub fn as_usize_or_oog(value: U256) -> Result<usize, ExitError> {
    if value > U256::from(u32::MAX) {
        return Err(ExitError::OutOfGas);
    }
    Ok(value.as_usize())
}

#[must_use]
pub fn ceil32(len: u64) -> u64 {
    len.div_ceil(32)
}

/// Total cost of a memory of `len` bytes: `3w + w^2/512` for `w` words.
fn memory_cost(len: u64) -> u64 {
    let words = ceil32(len);
    let linear = u128::from(words) * u128::from(G_MEMORY);
    let quadratic = u128::from(words) * u128::from(words) / 512;
    u64::try_from(linear + quadratic).unwrap_or(u64::MAX)
}

/// Cost of growing memory from `current_len` bytes to cover
/// `offset + len`. Zero-length accesses never expand.
pub fn memory_expansion_cost(
    current_len: usize,
    offset: U256,
    len: U256,
) -> Result<u64, ExitError> {
    if len.is_zero() {
        return Ok(0);
    }
    let offset = as_usize_or_oog(offset)? as u64;
    let len = as_usize_or_oog(len)? as u64;
    let end = offset.checked_add(len).ok_or(ExitError::OutOfGas)?;
    let current = memory_cost(current_len as u64);
    let target = memory_cost(end);
    Ok(target.saturating_sub(current))
}

/// Per-word surcharge of the COPY family.
pub fn copy_cost(len: U256) -> Result<u64, ExitError> {
    let len = as_usize_or_oog(len)? as u64;
    Ok(G_COPY * ceil32(len))
}

pub fn keccak256_cost(len: U256) -> Result<u64, ExitError> {
    let len = as_usize_or_oog(len)? as u64;
    Ok(G_KECCAK256 + G_KECCAK256_WORD * ceil32(len))
}

#[must_use]
pub fn exp_cost(config: &Config, power: U256) -> u64 {
    if power.is_zero() {
        G_EXP
    } else {
        let bytes = (u64::from(power.bits() as u32) + 7) / 8;
        G_EXP + config.gas_expbyte * bytes
    }
}

pub fn log_cost(topics: usize, len: U256) -> Result<u64, ExitError> {
    let len = as_usize_or_oog(len)? as u64;
    Ok(G_LOG + G_LOG_DATA * len + G_LOG_TOPIC * topics as u64)
}

/// Per-word charge of hashing init code for `CREATE2`.
pub fn create2_hash_cost(len: usize) -> u64 {
    G_KECCAK256_WORD * ceil32(len as u64)
}

/// EIP-3860 init-code word cost, for `CREATE`, `CREATE2`, and creation
/// transactions.
#[must_use]
pub fn init_code_cost(config: &Config, len: usize) -> u64 {
    config.gas_initcode_word * ceil32(len as u64)
}

/// Account-touching opcodes (`BALANCE`, `EXTCODESIZE`, `EXTCODECOPY`,
/// `EXTCODEHASH`): flat pre-Berlin, warm/cold afterwards.
#[must_use]
pub fn address_access_cost(config: &Config, pre_berlin_cost: u64, cold: bool) -> u64 {
    if config.increase_state_access_gas {
        if cold {
            config.gas_account_access_cold
        } else {
            config.gas_storage_read_warm
        }
    } else {
        pre_berlin_cost
    }
}

#[must_use]
pub fn sload_cost(config: &Config, cold: bool) -> u64 {
    if config.increase_state_access_gas {
        if cold {
            config.gas_sload_cold
        } else {
            config.gas_storage_read_warm
        }
    } else {
        config.gas_sload
    }
}

/// The `SSTORE` clear refund: 15000 until EIP-3529 re-derives it from the
/// net reset cost plus the access-list key cost (2900 + 1900 = 4800).
#[must_use]
pub fn sstore_clears_refund(config: &Config) -> i64 {
    if config.decrease_clears_refund {
        (sstore_reset_net(config) + config.gas_access_list_storage_key) as i64
    } else {
        15_000
    }
}

/// The `SELFDESTRUCT` refund, removed entirely by EIP-3529.
#[must_use]
pub fn selfdestruct_refund(config: &Config) -> i64 {
    if config.decrease_clears_refund {
        0
    } else {
        24_000
    }
}

/// The divisor of the refund cap: `gas_used / 2` until EIP-3529 tightens it
/// to `gas_used / 5`.
#[must_use]
pub fn max_refund_quotient(config: &Config) -> u64 {
    if config.decrease_clears_refund {
        5
    } else {
        2
    }
}

/// The warm-read charge net gas metering compares against.
fn sstore_warm_read(config: &Config) -> u64 {
    if config.increase_state_access_gas {
        config.gas_storage_read_warm
    } else {
        config.gas_sload
    }
}

/// The reset charge under net metering, with the cold component split out
/// post-Berlin.
fn sstore_reset_net(config: &Config) -> u64 {
    if config.increase_state_access_gas {
        config.gas_sstore_reset - config.gas_sload_cold
    } else {
        config.gas_sstore_reset
    }
}

/// `SSTORE` gas. `original` is the slot value at transaction start, `current`
/// the live value, `new` the value being written.
pub fn sstore_cost(
    config: &Config,
    original: H256,
    current: H256,
    new: H256,
    cold: bool,
    gas_left: u64,
) -> Result<u64, ExitError> {
    if config.sstore_gas_metering {
        // EIP-2200: the opcode faults outright at or below the stipend so a
        // value-bearing call cannot flip storage with its free gas.
        if config.sstore_revert_under_stipend && gas_left <= config.call_stipend {
            return Err(ExitError::OutOfGas);
        }

        let base = if new == current {
            sstore_warm_read(config)
        } else if current == original {
            if original.is_zero() {
                config.gas_sstore_set
            } else {
                sstore_reset_net(config)
            }
        } else {
            sstore_warm_read(config)
        };
        let cold_charge = if config.increase_state_access_gas && cold {
            config.gas_sload_cold
        } else {
            0
        };
        Ok(base + cold_charge)
    } else if current.is_zero() && !new.is_zero() {
        Ok(config.gas_sstore_set)
    } else {
        Ok(config.gas_sstore_reset)
    }
}

/// The refund delta of an `SSTORE`, per the net-metering matrix of
/// EIP-2200/EIP-3529 (or the simple clear refund before Istanbul).
#[must_use]
pub fn sstore_refund(config: &Config, original: H256, current: H256, new: H256) -> i64 {
    let clears = sstore_clears_refund(config);

    if config.sstore_gas_metering {
        let mut refund = 0i64;
        if new != current {
            if current == original {
                if !original.is_zero() && new.is_zero() {
                    refund += clears;
                }
            } else {
                if !original.is_zero() {
                    if current.is_zero() {
                        refund -= clears;
                    } else if new.is_zero() {
                        refund += clears;
                    }
                }
                if new == original {
                    if original.is_zero() {
                        refund += (config.gas_sstore_set - sstore_warm_read(config)) as i64;
                    } else {
                        refund += (sstore_reset_net(config) - sstore_warm_read(config)) as i64;
                    }
                }
            }
        }
        refund
    } else if !current.is_zero() && new.is_zero() {
        clears
    } else {
        0
    }
}

/// Charge of a `CALL`-family opcode before any gas is forwarded.
#[must_use]
pub fn call_cost(config: &Config, transfers_value: bool, new_account: bool, cold: bool) -> u64 {
    let base = if config.increase_state_access_gas {
        if cold {
            config.gas_account_access_cold
        } else {
            config.gas_storage_read_warm
        }
    } else {
        config.gas_call
    };
    let value_cost = if transfers_value {
        config.gas_call_value
    } else {
        0
    };
    let new_account_cost = if new_account { config.gas_new_account } else { 0 };
    base + value_cost + new_account_cost
}

#[must_use]
pub fn selfdestruct_cost(config: &Config, new_account: bool, cold: bool) -> u64 {
    let base = config.gas_selfdestruct
        + if new_account {
            config.gas_selfdestruct_new_account
        } else {
            0
        };
    if config.increase_state_access_gas && cold {
        base + config.gas_account_access_cold
    } else {
        base
    }
}

/// How much gas a call may forward. EIP-150 caps the available amount at
/// 63/64 of the remainder; before it, asking for more than is available is an
/// error instead of being clamped.
pub fn forwarded_gas(config: &Config, requested: U256, gas_left: u64) -> Result<u64, ExitError> {
    let available = if config.call_l64_after_gas {
        gas_left - gas_left / 64
    } else {
        gas_left
    };
    if requested > U256::from(available) {
        if config.err_on_call_with_more_gas {
            Err(ExitError::OutOfGas)
        } else {
            Ok(available)
        }
    } else {
        Ok(requested.as_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_expansion_quadratic() {
        // 32 bytes: 1 word -> 3 gas; 64 bytes: 2 words -> 6 gas.
        assert_eq!(
            memory_expansion_cost(0, U256::zero(), U256::from(32)).unwrap(),
            3
        );
        assert_eq!(
            memory_expansion_cost(32, U256::from(32), U256::from(32)).unwrap(),
            3
        );
        // 1024 words: 3*1024 + 1024^2/512 = 5120.
        assert_eq!(
            memory_expansion_cost(0, U256::zero(), U256::from(32 * 1024)).unwrap(),
            5120
        );
        // No expansion when already covered.
        assert_eq!(
            memory_expansion_cost(64, U256::zero(), U256::from(32)).unwrap(),
            0
        );
        // Zero-length access at a huge offset is free.
        assert_eq!(
            memory_expansion_cost(0, U256::MAX, U256::zero()).unwrap(),
            0
        );
    }

    #[test]
    fn test_unaddressable_offset_is_oog() {
        assert!(matches!(
            memory_expansion_cost(0, U256::MAX, U256::one()),
            Err(ExitError::OutOfGas)
        ));
    }

    #[test]
    fn test_exp_cost_per_byte() {
        let config = Config::spurious_dragon();
        assert_eq!(exp_cost(&config, U256::zero()), 10);
        assert_eq!(exp_cost(&config, U256::from(0xff)), 10 + 50);
        assert_eq!(exp_cost(&config, U256::from(0x100)), 10 + 100);
        let frontier = Config::frontier();
        assert_eq!(exp_cost(&frontier, U256::from(0x100)), 10 + 20);
    }

    #[test]
    fn test_sstore_london_matrix() {
        let config = Config::london();
        let zero = H256::zero();
        let one = H256::repeat_byte(1);
        let two = H256::repeat_byte(2);
        let gas_left = 100_000;

        // Fresh write to a clean zero slot, warm.
        assert_eq!(
            sstore_cost(&config, zero, zero, one, false, gas_left).unwrap(),
            20_000
        );
        // Update of a clean non-zero slot, warm: 5000 - 2100.
        assert_eq!(
            sstore_cost(&config, one, one, two, false, gas_left).unwrap(),
            2_900
        );
        // Dirty slot: warm read price.
        assert_eq!(
            sstore_cost(&config, one, two, one, false, gas_left).unwrap(),
            100
        );
        // Cold surcharge.
        assert_eq!(
            sstore_cost(&config, zero, zero, one, true, gas_left).unwrap(),
            22_100
        );
        // Stipend guard.
        assert!(matches!(
            sstore_cost(&config, zero, zero, one, false, 2_300),
            Err(ExitError::OutOfGas)
        ));
    }

    #[test]
    fn test_sstore_refund_clear_london() {
        let config = Config::london();
        let zero = H256::zero();
        let one = H256::repeat_byte(1);
        // Clearing a clean slot refunds 4800 post-London.
        assert_eq!(sstore_refund(&config, one, one, zero), 4_800);
        // Restoring a dirty cleared slot gives back the difference.
        assert_eq!(sstore_refund(&config, zero, one, zero), 19_900);
        // Un-clearing takes the refund away again.
        assert_eq!(sstore_refund(&config, one, zero, one), -4_800 + 2_800);
    }

    #[test]
    fn test_refund_schedule_follows_clears_flag() {
        let berlin = Config::berlin();
        assert_eq!(sstore_clears_refund(&berlin), 15_000);
        assert_eq!(selfdestruct_refund(&berlin), 24_000);
        assert_eq!(max_refund_quotient(&berlin), 2);

        let london = Config::london();
        assert_eq!(sstore_clears_refund(&london), 4_800);
        assert_eq!(selfdestruct_refund(&london), 0);
        assert_eq!(max_refund_quotient(&london), 5);
    }

    #[test]
    fn test_sstore_refund_legacy() {
        let config = Config::homestead();
        let zero = H256::zero();
        let one = H256::repeat_byte(1);
        assert_eq!(sstore_refund(&config, zero, one, zero), 15_000);
        assert_eq!(sstore_refund(&config, zero, zero, one), 0);
    }

    #[test]
    fn test_forwarded_gas_rule() {
        let tangerine = Config::tangerine_whistle();
        // 63/64 cap.
        assert_eq!(
            forwarded_gas(&tangerine, U256::MAX, 6_400).unwrap(),
            6_400 - 100
        );
        assert_eq!(forwarded_gas(&tangerine, U256::from(100), 6_400).unwrap(), 100);

        let homestead = Config::homestead();
        assert_eq!(
            forwarded_gas(&homestead, U256::from(100), 6_400).unwrap(),
            100
        );
        assert!(matches!(
            forwarded_gas(&homestead, U256::from(10_000), 6_400),
            Err(ExitError::OutOfGas)
        ));
    }
}
