use super::Control;
use crate::error::ExitError;
use crate::frame::Frame;
use crate::gas::G_VERY_LOW;
use crate::i256;
use hearth_engine_types::U256;

fn bool_to_word(value: bool) -> U256 {
    if value {
        U256::one()
    } else {
        U256::zero()
    }
}

pub fn lt(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(bool_to_word(a < b))?;
    Ok(Control::Continue(1))
}

pub fn gt(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(bool_to_word(a > b))?;
    Ok(Control::Continue(1))
}

pub fn slt(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(bool_to_word(i256::lt(a, b)))?;
    Ok(Control::Continue(1))
}

pub fn sgt(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(bool_to_word(i256::lt(b, a)))?;
    Ok(Control::Continue(1))
}

pub fn eq(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(bool_to_word(a == b))?;
    Ok(Control::Continue(1))
}

pub fn iszero(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let a = frame.stack.pop()?;
    frame.stack.push(bool_to_word(a.is_zero()))?;
    Ok(Control::Continue(1))
}

pub fn and(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(a & b)?;
    Ok(Control::Continue(1))
}

pub fn or(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(a | b)?;
    Ok(Control::Continue(1))
}

pub fn xor(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let a = frame.stack.pop()?;
    let b = frame.stack.pop()?;
    frame.stack.push(a ^ b)?;
    Ok(Control::Continue(1))
}

pub fn not(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let a = frame.stack.pop()?;
    frame.stack.push(!a)?;
    Ok(Control::Continue(1))
}

/// `BYTE`: the `i`-th byte of the word, counted from the big end.
pub fn byte(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let index = frame.stack.pop()?;
    let value = frame.stack.pop()?;
    let result = if index >= U256::from(32) {
        U256::zero()
    } else {
        let shift = 8 * (31 - index.as_usize());
        (value >> shift) & U256::from(0xff)
    };
    frame.stack.push(result)?;
    Ok(Control::Continue(1))
}

pub fn shl(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let shift = frame.stack.pop()?;
    let value = frame.stack.pop()?;
    let result = if shift >= U256::from(256) {
        U256::zero()
    } else {
        value << shift.as_usize()
    };
    frame.stack.push(result)?;
    Ok(Control::Continue(1))
}

pub fn shr(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let shift = frame.stack.pop()?;
    let value = frame.stack.pop()?;
    let result = if shift >= U256::from(256) {
        U256::zero()
    } else {
        value >> shift.as_usize()
    };
    frame.stack.push(result)?;
    Ok(Control::Continue(1))
}

pub fn sar(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let shift = frame.stack.pop()?;
    let value = frame.stack.pop()?;
    frame.stack.push(i256::sar(shift, value))?;
    Ok(Control::Continue(1))
}
