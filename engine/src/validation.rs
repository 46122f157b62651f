//! Header-derivation rules: base fee, blob gas, and proof-of-work difficulty.

use crate::fork::{BlobSchedule, Fork};
use hearth_engine_types::U256;

pub const ELASTICITY_MULTIPLIER: u64 = 2;
pub const BASE_FEE_MAX_CHANGE_DENOMINATOR: u64 = 8;
pub const MIN_BLOB_GASPRICE: u64 = 1;

/// The EIP-1559 base fee of a block given its parent.
#[must_use]
pub fn calc_base_fee(
    parent_gas_limit: u64,
    parent_gas_used: u64,
    parent_base_fee: U256,
    parent_had_base_fee: bool,
) -> U256 {
    // The London activation block starts at the initial base fee.
    if !parent_had_base_fee {
        return U256::from(1_000_000_000u64);
    }

    let parent_gas_target = parent_gas_limit / ELASTICITY_MULTIPLIER;
    if parent_gas_used == parent_gas_target {
        return parent_base_fee;
    }

    if parent_gas_used > parent_gas_target {
        let gas_used_delta = parent_gas_used - parent_gas_target;
        let base_fee_delta = core::cmp::max(
            parent_base_fee * U256::from(gas_used_delta)
                / U256::from(parent_gas_target)
                / U256::from(BASE_FEE_MAX_CHANGE_DENOMINATOR),
            U256::one(),
        );
        parent_base_fee + base_fee_delta
    } else {
        let gas_used_delta = parent_gas_target - parent_gas_used;
        let base_fee_delta = parent_base_fee * U256::from(gas_used_delta)
            / U256::from(parent_gas_target)
            / U256::from(BASE_FEE_MAX_CHANGE_DENOMINATOR);
        parent_base_fee.saturating_sub(base_fee_delta)
    }
}

/// The excess blob gas carried into a block (EIP-4844).
#[must_use]
pub fn calc_excess_blob_gas(
    parent_excess_blob_gas: u64,
    parent_blob_gas_used: u64,
    schedule: &BlobSchedule,
) -> u64 {
    let target = schedule.target_blob_gas_per_block();
    let consumed = parent_excess_blob_gas + parent_blob_gas_used;
    consumed.saturating_sub(target)
}

/// `fake_exponential` of EIP-4844: approximates
/// `factor * e^(numerator / denominator)` with a Taylor expansion in integer
/// arithmetic.
#[must_use]
pub fn fake_exponential(factor: u64, numerator: u64, denominator: u64) -> U256 {
    let factor = U256::from(factor);
    let numerator = U256::from(numerator);
    let denominator = U256::from(denominator);

    let mut i = U256::one();
    let mut output = U256::zero();
    let mut accum = factor * denominator;
    while !accum.is_zero() {
        output += accum;
        accum = accum * numerator / (denominator * i);
        i += U256::one();
    }
    output / denominator
}

/// The blob gas price for a block with the given excess blob gas.
#[must_use]
pub fn blob_gasprice(excess_blob_gas: u64, schedule: &BlobSchedule) -> U256 {
    fake_exponential(
        MIN_BLOB_GASPRICE,
        excess_blob_gas,
        schedule.base_fee_update_fraction,
    )
}

/// Proof-of-work difficulty. Valid up to the merge; the bomb delays of the
/// glacier forks are folded in via `bomb_delay`.
#[must_use]
pub fn calc_difficulty(
    fork: Fork,
    number: u64,
    timestamp: u64,
    parent_timestamp: u64,
    parent_difficulty: U256,
    parent_has_ommers: bool,
) -> U256 {
    let minimum = U256::from(131_072u64);
    if fork >= Fork::Paris {
        return U256::zero();
    }

    let adjustment = parent_difficulty / U256::from(2048u64);
    let time_delta = timestamp.saturating_sub(parent_timestamp);

    let base = if fork >= Fork::Byzantium {
        // EIP-100: uncle-aware adjustment.
        let y: i64 = if parent_has_ommers { 2 } else { 1 };
        let factor = core::cmp::max(y - (time_delta / 9) as i64, -99);
        apply_signed_adjustment(parent_difficulty, adjustment, factor)
    } else if fork >= Fork::Homestead {
        let factor = core::cmp::max(1 - (time_delta / 10) as i64, -99);
        apply_signed_adjustment(parent_difficulty, adjustment, factor)
    } else if time_delta < 13 {
        parent_difficulty + adjustment
    } else {
        parent_difficulty.saturating_sub(adjustment)
    };

    let mut difficulty = core::cmp::max(base, minimum);

    // The difficulty bomb, delayed by successive forks.
    if fork >= Fork::Homestead {
        let fake_number = number.saturating_sub(bomb_delay(fork));
        let period = fake_number / 100_000;
        if period >= 2 {
            difficulty += U256::one() << (period - 2);
        }
    }

    difficulty
}

fn apply_signed_adjustment(parent: U256, adjustment: U256, factor: i64) -> U256 {
    if factor >= 0 {
        parent + adjustment * U256::from(factor as u64)
    } else {
        parent.saturating_sub(adjustment * U256::from((-factor) as u64))
    }
}

const fn bomb_delay(fork: Fork) -> u64 {
    match fork {
        Fork::GrayGlacier => 11_400_000,
        Fork::ArrowGlacier => 10_700_000,
        Fork::London => 9_700_000,
        Fork::MuirGlacier => 9_000_000,
        Fork::Constantinople | Fork::Petersburg | Fork::Istanbul => 5_000_000,
        Fork::Byzantium => 3_000_000,
        _ => 0,
    }
}
