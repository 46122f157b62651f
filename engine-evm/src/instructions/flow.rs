use super::Control;
use crate::error::{ExitError, ExitReason, ExitSucceed};
use crate::frame::Frame;
use crate::gas::{as_usize_or_oog, G_BASE, G_HIGH, G_JUMPDEST, G_MID};
use hearth_engine_types::U256;

pub fn stop() -> Result<Control, ExitError> {
    Ok(Control::Exit(ExitReason::Succeed(ExitSucceed::Stopped)))
}

pub fn jump(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_MID)?;
    let destination = frame.stack.pop()?;
    jump_to(frame, destination)
}

pub fn jumpi(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_HIGH)?;
    let destination = frame.stack.pop()?;
    let condition = frame.stack.pop()?;
    if condition.is_zero() {
        Ok(Control::Continue(1))
    } else {
        jump_to(frame, destination)
    }
}

fn jump_to(frame: &Frame, destination: U256) -> Result<Control, ExitError> {
    let destination = as_usize_or_oog(destination).map_err(|_e| ExitError::InvalidJump)?;
    if frame.valids.is_valid(destination) {
        Ok(Control::Jump(destination))
    } else {
        Err(ExitError::InvalidJump)
    }
}

pub fn pc(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(U256::from(frame.pc))?;
    Ok(Control::Continue(1))
}

pub fn msize(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(U256::from(frame.memory.len()))?;
    Ok(Control::Continue(1))
}

/// `GAS` pushes the gas left *after* paying for this instruction.
pub fn gas(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(U256::from(frame.gas.gas_left()))?;
    Ok(Control::Continue(1))
}

pub fn jumpdest(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_JUMPDEST)?;
    Ok(Control::Continue(1))
}
