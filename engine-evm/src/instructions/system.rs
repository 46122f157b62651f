use super::{u256_to_address, u256_to_h256, Control};
use crate::error::{ExitError, ExitReason, ExitSucceed};
use crate::frame::Frame;
use crate::gas::{self, G_CREATE};
use crate::runtime::{CallParams, CreateParams, Runtime};
use hearth_engine_types::types::Wei;
use hearth_engine_types::U256;

pub fn ret(frame: &mut Frame) -> Result<Control, ExitError> {
    let offset = frame.stack.pop()?;
    let len = frame.stack.pop()?;
    let (offset, len) = frame.resize_memory(offset, len)?;
    frame.output = frame.memory.get(offset, len);
    Ok(Control::Exit(ExitReason::Succeed(ExitSucceed::Returned)))
}

pub fn revert(frame: &mut Frame) -> Result<Control, ExitError> {
    let offset = frame.stack.pop()?;
    let len = frame.stack.pop()?;
    let (offset, len) = frame.resize_memory(offset, len)?;
    frame.output = frame.memory.get(offset, len);
    Ok(Control::Exit(ExitReason::Revert))
}

pub fn call(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    let gas_requested = frame.stack.pop()?;
    let target = u256_to_address(frame.stack.pop()?);
    let value = frame.stack.pop()?;

    if frame.is_static && !value.is_zero() {
        return Err(ExitError::WriteProtection);
    }

    let transfers_value = !value.is_zero();
    let new_account = if rt.config.empty_considered_exists {
        !rt.state.exists(&target)
    } else {
        transfers_value && rt.state.is_dead(&target)
    };

    message_call(
        rt,
        frame,
        gas_requested,
        MessageCallKind::Call,
        target,
        value,
        new_account,
        frame.is_static,
    )
}

pub fn callcode(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    let gas_requested = frame.stack.pop()?;
    let target = u256_to_address(frame.stack.pop()?);
    let value = frame.stack.pop()?;

    // The storage target is the caller itself, so no account can be created.
    message_call(
        rt,
        frame,
        gas_requested,
        MessageCallKind::CallCode,
        target,
        value,
        false,
        frame.is_static,
    )
}

pub fn delegatecall(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    let gas_requested = frame.stack.pop()?;
    let target = u256_to_address(frame.stack.pop()?);

    message_call(
        rt,
        frame,
        gas_requested,
        MessageCallKind::DelegateCall,
        target,
        U256::zero(),
        false,
        frame.is_static,
    )
}

pub fn staticcall(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    let gas_requested = frame.stack.pop()?;
    let target = u256_to_address(frame.stack.pop()?);

    message_call(
        rt,
        frame,
        gas_requested,
        MessageCallKind::StaticCall,
        target,
        U256::zero(),
        false,
        true,
    )
}

enum MessageCallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
}

#[allow(clippy::too_many_arguments)]
fn message_call(
    rt: &mut Runtime,
    frame: &mut Frame,
    gas_requested: U256,
    kind: MessageCallKind,
    target: hearth_engine_types::types::Address,
    value: U256,
    new_account: bool,
    is_static: bool,
) -> Result<Control, ExitError> {
    let in_offset = frame.stack.pop()?;
    let in_len = frame.stack.pop()?;
    let out_offset = frame.stack.pop()?;
    let out_len = frame.stack.pop()?;

    // Expansion is charged for both regions before the call itself.
    let (in_offset, in_len) = frame.resize_memory(in_offset, in_len)?;
    let (out_offset, out_len) = frame.resize_memory(out_offset, out_len)?;

    let transfers_value = !value.is_zero();
    let cold = rt.state.access_address(target);
    frame.gas.record_cost(gas::call_cost(
        rt.config,
        transfers_value,
        new_account,
        cold,
    ))?;

    let forwarded = gas::forwarded_gas(rt.config, gas_requested, frame.gas.gas_left())?;
    frame.gas.record_cost(forwarded)?;
    let child_gas = if transfers_value {
        forwarded + rt.config.call_stipend
    } else {
        forwarded
    };

    let input = frame.memory.get(in_offset, in_len);
    let value_wei = Wei::new(value);
    let params = match kind {
        MessageCallKind::Call => CallParams {
            code_address: target,
            target,
            caller: frame.context.address,
            transfer_value: Some(value_wei),
            apparent_value: value,
            input,
            gas_limit: child_gas,
            is_static,
            depth: frame.depth + 1,
        },
        MessageCallKind::CallCode => CallParams {
            code_address: target,
            target: frame.context.address,
            caller: frame.context.address,
            transfer_value: Some(value_wei),
            apparent_value: value,
            input,
            gas_limit: child_gas,
            is_static,
            depth: frame.depth + 1,
        },
        MessageCallKind::DelegateCall => CallParams {
            code_address: target,
            target: frame.context.address,
            caller: frame.context.caller,
            transfer_value: None,
            apparent_value: frame.context.apparent_value,
            input,
            gas_limit: child_gas,
            is_static,
            depth: frame.depth + 1,
        },
        MessageCallKind::StaticCall => CallParams {
            code_address: target,
            target,
            caller: frame.context.address,
            transfer_value: Some(Wei::zero()),
            apparent_value: U256::zero(),
            input,
            gas_limit: child_gas,
            is_static,
            depth: frame.depth + 1,
        },
    };

    let result = rt.call_inner(params);
    frame.gas.return_gas(result.gas_left);

    let copy_len = core::cmp::min(out_len, result.output.len());
    frame
        .memory
        .copy_from_slice(out_offset, &result.output, 0, copy_len);
    frame.return_data = result.output;

    frame.stack.push(if result.reason.is_succeed() {
        U256::one()
    } else {
        U256::zero()
    })?;
    Ok(Control::Continue(1))
}

pub fn create(rt: &mut Runtime, frame: &mut Frame, is_create2: bool) -> Result<Control, ExitError> {
    if frame.is_static {
        return Err(ExitError::WriteProtection);
    }

    let value = frame.stack.pop()?;
    let offset = frame.stack.pop()?;
    let len = frame.stack.pop()?;
    let salt = if is_create2 {
        Some(u256_to_h256(frame.stack.pop()?))
    } else {
        None
    };

    frame.gas.record_cost(G_CREATE)?;
    let (offset, len) = frame.resize_memory(offset, len)?;

    if let Some(limit) = rt.config.max_initcode_size {
        if len > limit {
            return Err(ExitError::CreateInitCodeSizeLimit);
        }
    }
    if is_create2 {
        frame.gas.record_cost(gas::create2_hash_cost(len))?;
    }
    frame.gas.record_cost(gas::init_code_cost(rt.config, len))?;

    // CREATE forwards all remaining gas before EIP-150, all but 1/64 after.
    let gas_left = frame.gas.gas_left();
    let forwarded = if rt.config.call_l64_after_gas {
        gas_left - gas_left / 64
    } else {
        gas_left
    };
    frame.gas.record_cost(forwarded)?;

    let init_code = frame.memory.get(offset, len);
    let result = rt.create_inner(CreateParams {
        caller: frame.context.address,
        value: Wei::new(value),
        init_code,
        gas_limit: forwarded,
        salt,
        depth: frame.depth + 1,
    });
    frame.gas.return_gas(result.gas_left);

    // The return buffer only carries revert payloads for creation frames.
    frame.return_data = if result.reason.is_revert() {
        result.output
    } else {
        Vec::new()
    };

    match result.address {
        Some(address) if result.reason.is_succeed() => {
            frame.stack.push(super::address_to_u256(address))?;
        }
        _ => frame.stack.push(U256::zero())?,
    }
    Ok(Control::Continue(1))
}

pub fn selfdestruct(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    if frame.is_static {
        return Err(ExitError::WriteProtection);
    }

    let beneficiary = u256_to_address(frame.stack.pop()?);
    let address = frame.context.address;
    let balance = rt.state.balance(&address);

    let cold = rt.state.access_address(beneficiary);
    let new_account = if rt.config.empty_considered_exists {
        !rt.state.exists(&beneficiary)
    } else {
        !balance.is_zero() && rt.state.is_dead(&beneficiary)
    };
    frame
        .gas
        .record_cost(gas::selfdestruct_cost(rt.config, new_account, cold))?;

    let refund = gas::selfdestruct_refund(rt.config);
    if refund != 0 && !rt.state.is_marked_selfdestruct(&address) {
        rt.state.add_refund(refund);
    }

    // The whole balance moves to the beneficiary; a self-beneficiary keeps it
    // unless the account is deleted below.
    rt.state.set_balance(address, Wei::zero());
    rt.state.touch(beneficiary);
    if rt.config.empty_considered_exists {
        // Pre-EIP-161 the beneficiary comes into existence even without funds.
        let credited = rt.state.balance(&beneficiary).saturating_add(balance);
        rt.state.set_balance(beneficiary, credited);
    } else {
        rt.state.add_balance(beneficiary, balance);
    }

    let delete = if rt.config.selfdestruct_only_in_same_tx {
        rt.state.was_created_in_tx(&address)
    } else {
        true
    };
    if delete {
        rt.state.record_selfdestruct(address);
    }

    Ok(Control::Exit(ExitReason::Succeed(ExitSucceed::SelfDestructed)))
}
