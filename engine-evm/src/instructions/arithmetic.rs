use super::Control;
use crate::error::ExitError;
use crate::frame::Frame;
use crate::gas::{self, G_LOW, G_MID, G_VERY_LOW};
use crate::i256;
use crate::runtime::Runtime;
use primitive_types::{U256, U512};

pub fn add(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(a.overflowing_add(b).0)?;
    Ok(Control::Continue(1))
}

pub fn mul(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(a.overflowing_mul(b).0)?;
    Ok(Control::Continue(1))
}

pub fn sub(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(a.overflowing_sub(b).0)?;
    Ok(Control::Continue(1))
}

pub fn div(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    let quotient = if b.is_zero() { U256::zero() } else { a / b };
    frame.stack.push(quotient)?;
    Ok(Control::Continue(1))
}

pub fn sdiv(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(i256::div(a, b))?;
    Ok(Control::Continue(1))
}

pub fn rem(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    let remainder = if b.is_zero() { U256::zero() } else { a % b };
    frame.stack.push(remainder)?;
    Ok(Control::Continue(1))
}

pub fn srem(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(i256::rem(a, b))?;
    Ok(Control::Continue(1))
}

pub fn addmod(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_MID)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    let modulus = frame.stack.pop()?;
    let result = if modulus.is_zero() {
        U256::zero()
    } else {
        // Full-width intermediate so the addition cannot wrap.
        let sum = U512::from(a) + U512::from(b);
        u512_rem_to_u256(sum, modulus)
    };
    frame.stack.push(result)?;
    Ok(Control::Continue(1))
}

pub fn mulmod(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_MID)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    let modulus = frame.stack.pop()?;
    let result = if modulus.is_zero() {
        U256::zero()
    } else {
        let product = U512::from(a) * U512::from(b);
        u512_rem_to_u256(product, modulus)
    };
    frame.stack.push(result)?;
    Ok(Control::Continue(1))
}

pub fn exp(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    let base = frame.stack.pop()?;
    let power = frame.stack.pop()?;
    frame.gas.record_cost(gas::exp_cost(rt.config, power))?;

    // Square-and-multiply, wrapping modulo 2^256.
    let mut result = U256::one();
    let mut base = base;
    let mut power = power;
    while !power.is_zero() {
        if power.bit(0) {
            result = result.overflowing_mul(base).0;
        }
        base = base.overflowing_mul(base).0;
        power >>= 1;
    }

    frame.stack.push(result)?;
    Ok(Control::Continue(1))
}

pub fn signextend(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_LOW)?;
    let byte_index = frame.stack.pop()?;
    let value = frame.stack.pop()?;

    // From byte 31 up the extension is the identity.
    let extended = if byte_index >= U256::from(31) {
        value
    } else {
        let bit = byte_index.as_usize() * 8 + 7;
        if value.bit(bit) {
            value | (U256::MAX << (bit + 1))
        } else {
            value & ((U256::one() << (bit + 1)) - U256::one())
        }
    };

    frame.stack.push(extended)?;
    Ok(Control::Continue(1))
}

fn u512_rem_to_u256(value: U512, modulus: U256) -> U256 {
    let remainder = value % U512::from(modulus);
    let mut bytes = [0u8; 64];
    remainder.to_big_endian(&mut bytes);
    U256::from_big_endian(&bytes[32..])
}
