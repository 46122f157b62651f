use crate::{u256_to_arr, U256};
use core::fmt::{self, Display, Formatter};
use core::ops::{Add, Sub};
use serde::{Deserialize, Serialize};

pub const ZERO_WEI: Wei = Wei::zero();

/// Newtype to distinguish balances (denominated in Wei) from other U256 values.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wei(U256);

impl Wei {
    const ETH_TO_WEI: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);
    const GWEI_TO_WEI: U256 = U256([1_000_000_000, 0, 0, 0]);

    #[must_use]
    pub const fn zero() -> Self {
        Self(U256([0, 0, 0, 0]))
    }

    #[must_use]
    pub const fn new(amount: U256) -> Self {
        Self(amount)
    }

    // Purposely not implementing `From<u64>` so the call site always says
    // `Wei::<something>` and the units stay visible.
    #[must_use]
    pub const fn new_u64(amount: u64) -> Self {
        Self(U256([amount, 0, 0, 0]))
    }

    #[must_use]
    pub fn from_eth(amount: U256) -> Option<Self> {
        amount.checked_mul(Self::ETH_TO_WEI).map(Self)
    }

    /// Withdrawal amounts are carried in Gwei on the consensus side.
    #[must_use]
    pub fn from_gwei(amount: u64) -> Self {
        Self(U256::from(amount) * Self::GWEI_TO_WEI)
    }

    #[must_use]
    pub fn to_bytes(self) -> [u8; 32] {
        u256_to_arr(&self.0)
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[must_use]
    pub const fn raw(self) -> U256 {
        self.0
    }

    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    #[must_use]
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    #[must_use]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl Display for Wei {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Add<Self> for Wei {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub<Self> for Wei {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}
