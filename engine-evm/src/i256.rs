//! Two's-complement signed interpretation of stack words.

use hearth_engine_types::U256;

pub const SIGN_BIT: usize = 255;

/// `-2^255`, the most negative representable value.
#[must_use]
pub fn min_value() -> U256 {
    U256::one() << SIGN_BIT
}

#[must_use]
pub fn is_negative(value: U256) -> bool {
    value.bit(SIGN_BIT)
}

/// Two's-complement negation, wrapping.
#[must_use]
pub fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

#[must_use]
pub fn abs(value: U256) -> U256 {
    if is_negative(value) {
        negate(value)
    } else {
        value
    }
}

/// Signed division truncating toward zero. `-2^255 / -1` wraps to `-2^255`.
#[must_use]
pub fn div(lhs: U256, rhs: U256) -> U256 {
    if rhs.is_zero() {
        return U256::zero();
    }
    if lhs == min_value() && rhs == negate(U256::one()) {
        return min_value();
    }

    let quotient = abs(lhs) / abs(rhs);
    if is_negative(lhs) == is_negative(rhs) {
        quotient
    } else {
        negate(quotient)
    }
}

/// Signed remainder; the result takes the sign of the dividend.
#[must_use]
pub fn rem(lhs: U256, rhs: U256) -> U256 {
    if rhs.is_zero() {
        return U256::zero();
    }

    let remainder = abs(lhs) % abs(rhs);
    if is_negative(lhs) {
        negate(remainder)
    } else {
        remainder
    }
}

#[must_use]
pub fn lt(lhs: U256, rhs: U256) -> bool {
    match (is_negative(lhs), is_negative(rhs)) {
        (true, false) => true,
        (false, true) => false,
        _ => lhs < rhs,
    }
}

/// Arithmetic right shift of `value` by `shift` bits.
#[must_use]
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    if shift >= U256::from(256) {
        return if negative { U256::MAX } else { U256::zero() };
    }
    let shift = shift.as_usize();
    let shifted = value >> shift;
    if negative && shift > 0 {
        // Backfill the vacated high bits with ones.
        shifted | (U256::MAX << (256 - shift))
    } else {
        shifted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neg(x: u64) -> U256 {
        negate(U256::from(x))
    }

    #[test]
    fn test_sdiv_truncates_toward_zero() {
        assert_eq!(div(neg(7), U256::from(2)), neg(3));
        assert_eq!(div(U256::from(7), neg(2)), neg(3));
        assert_eq!(div(neg(7), neg(2)), U256::from(3));
    }

    #[test]
    fn test_sdiv_overflow_wraps() {
        assert_eq!(div(min_value(), negate(U256::one())), min_value());
    }

    #[test]
    fn test_sdiv_by_zero_is_zero() {
        assert_eq!(div(neg(5), U256::zero()), U256::zero());
    }

    #[test]
    fn test_smod_takes_dividend_sign() {
        assert_eq!(rem(neg(7), U256::from(3)), neg(1));
        assert_eq!(rem(U256::from(7), neg(3)), U256::from(1));
        assert_eq!(rem(neg(5), U256::zero()), U256::zero());
    }

    #[test]
    fn test_slt_mixed_signs() {
        assert!(lt(neg(1), U256::zero()));
        assert!(!lt(U256::zero(), neg(1)));
        assert!(lt(U256::from(1), U256::from(2)));
        assert!(lt(neg(2), neg(1)));
    }

    #[test]
    fn test_sar() {
        assert_eq!(sar(U256::from(1), neg(4)), neg(2));
        assert_eq!(sar(U256::from(300), neg(4)), U256::MAX);
        assert_eq!(sar(U256::from(300), U256::from(4)), U256::zero());
        assert_eq!(sar(U256::from(2), U256::from(8)), U256::from(2));
        assert_eq!(sar(U256::zero(), neg(1)), neg(1));
    }
}
