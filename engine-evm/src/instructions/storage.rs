use super::{h256_to_u256, u256_to_h256, Control};
use crate::error::ExitError;
use crate::frame::Frame;
use crate::gas;
use crate::runtime::Runtime;

pub fn sload(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    let key = u256_to_h256(frame.stack.pop()?);
    let cold = rt.state.access_slot(frame.context.address, key);
    frame.gas.record_cost(gas::sload_cost(rt.config, cold))?;
    let value = rt.state.storage(&frame.context.address, &key);
    frame.stack.push(h256_to_u256(value))?;
    Ok(Control::Continue(1))
}

pub fn sstore(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    if frame.is_static {
        return Err(ExitError::WriteProtection);
    }
    let key = u256_to_h256(frame.stack.pop()?);
    let new = u256_to_h256(frame.stack.pop()?);

    let address = frame.context.address;
    let original = rt.state.original_storage(&address, &key);
    let current = rt.state.storage(&address, &key);
    let cold = rt.state.access_slot(address, key);

    let cost = gas::sstore_cost(
        rt.config,
        original,
        current,
        new,
        cold,
        frame.gas.gas_left(),
    )?;
    frame.gas.record_cost(cost)?;

    let refund = gas::sstore_refund(rt.config, original, current, new);
    if refund != 0 {
        rt.state.add_refund(refund);
    }

    rt.state.set_storage(address, key, new);
    Ok(Control::Continue(1))
}

/// EIP-1153 transient load.
pub fn tload(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(rt.config.gas_storage_read_warm)?;
    let key = u256_to_h256(frame.stack.pop()?);
    let value = rt.state.transient_storage(&frame.context.address, &key);
    frame.stack.push(h256_to_u256(value))?;
    Ok(Control::Continue(1))
}

/// EIP-1153 transient store. Unlike `SSTORE` there is no stipend guard, no
/// refund, and no cold surcharge.
pub fn tstore(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    if frame.is_static {
        return Err(ExitError::WriteProtection);
    }
    frame.gas.record_cost(rt.config.gas_storage_read_warm)?;
    let key = u256_to_h256(frame.stack.pop()?);
    let value = u256_to_h256(frame.stack.pop()?);
    rt.state
        .set_transient_storage(frame.context.address, key, value);
    Ok(Control::Continue(1))
}
