use super::{address_to_u256, u256_to_address, Control};
use crate::error::ExitError;
use crate::frame::Frame;
use crate::gas::{self, G_BASE, G_BLOBHASH, G_BLOCKHASH, G_SELF_BALANCE};
use crate::runtime::Runtime;
use hearth_engine_types::U256;

pub fn address(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(address_to_u256(frame.context.address))?;
    Ok(Control::Continue(1))
}

pub fn balance(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    let target = u256_to_address(frame.stack.pop()?);
    let cold = rt.state.access_address(target);
    frame
        .gas
        .record_cost(gas::address_access_cost(rt.config, rt.config.gas_balance, cold))?;
    frame.stack.push(rt.state.balance(&target).raw())?;
    Ok(Control::Continue(1))
}

pub fn selfbalance(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_SELF_BALANCE)?;
    frame
        .stack
        .push(rt.state.balance(&frame.context.address).raw())?;
    Ok(Control::Continue(1))
}

pub fn origin(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(address_to_u256(rt.tx.origin))?;
    Ok(Control::Continue(1))
}

pub fn caller(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(address_to_u256(frame.context.caller))?;
    Ok(Control::Continue(1))
}

pub fn callvalue(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(frame.context.apparent_value)?;
    Ok(Control::Continue(1))
}

pub fn gasprice(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(rt.tx.gas_price)?;
    Ok(Control::Continue(1))
}

pub fn extcodesize(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    let target = u256_to_address(frame.stack.pop()?);
    let cold = rt.state.access_address(target);
    frame
        .gas
        .record_cost(gas::address_access_cost(rt.config, rt.config.gas_ext_code, cold))?;
    frame.stack.push(U256::from(rt.state.code(&target).len()))?;
    Ok(Control::Continue(1))
}

pub fn extcodecopy(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    let target = u256_to_address(frame.stack.pop()?);
    let mem_offset = frame.stack.pop()?;
    let code_offset = frame.stack.pop()?;
    let len = frame.stack.pop()?;

    let cold = rt.state.access_address(target);
    frame
        .gas
        .record_cost(gas::address_access_cost(rt.config, rt.config.gas_ext_code, cold))?;
    frame.gas.record_cost(gas::copy_cost(len)?)?;

    let (mem_offset, len) = frame.resize_memory(mem_offset, len)?;
    if len == 0 {
        return Ok(Control::Continue(1));
    }
    let code_offset = if code_offset > U256::from(usize::MAX) {
        usize::MAX
    } else {
        code_offset.as_usize()
    };
    let code = rt.state.code(&target).to_vec();
    frame.memory.copy_from_slice(mem_offset, &code, code_offset, len);
    Ok(Control::Continue(1))
}

pub fn extcodehash(rt: &mut Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    let target = u256_to_address(frame.stack.pop()?);
    let cold = rt.state.access_address(target);
    frame.gas.record_cost(gas::address_access_cost(
        rt.config,
        rt.config.gas_ext_code_hash,
        cold,
    ))?;
    let hash = rt.state.code_hash(&target);
    frame.stack.push(U256::from_big_endian(hash.as_bytes()))?;
    Ok(Control::Continue(1))
}

pub fn blockhash(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BLOCKHASH)?;
    let number = frame.stack.pop()?;
    let hash = rt.block.block_hash(number);
    frame.stack.push(U256::from_big_endian(hash.as_bytes()))?;
    Ok(Control::Continue(1))
}

pub fn coinbase(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(address_to_u256(rt.block.coinbase))?;
    Ok(Control::Continue(1))
}

pub fn timestamp(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(rt.block.timestamp)?;
    Ok(Control::Continue(1))
}

pub fn number(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(rt.block.number)?;
    Ok(Control::Continue(1))
}

/// `DIFFICULTY` pre-merge, `PREVRANDAO` after (EIP-4399); one opcode byte.
pub fn difficulty(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    if rt.config.has_prev_randao {
        frame
            .stack
            .push(U256::from_big_endian(rt.block.prev_randao.as_bytes()))?;
    } else {
        frame.stack.push(rt.block.difficulty)?;
    }
    Ok(Control::Continue(1))
}

pub fn gaslimit(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(rt.block.gas_limit)?;
    Ok(Control::Continue(1))
}

pub fn chainid(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(rt.block.chain_id)?;
    Ok(Control::Continue(1))
}

pub fn basefee(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(rt.block.base_fee)?;
    Ok(Control::Continue(1))
}

/// `BLOBHASH`: versioned hash `i` of the current transaction, zero past the
/// end (EIP-4844).
pub fn blobhash(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BLOBHASH)?;
    let index = frame.stack.pop()?;
    let hash = if index < U256::from(rt.tx.blob_hashes.len()) {
        rt.tx.blob_hashes[index.as_usize()]
    } else {
        hearth_engine_types::H256::zero()
    };
    frame.stack.push(U256::from_big_endian(hash.as_bytes()))?;
    Ok(Control::Continue(1))
}

pub fn blobbasefee(rt: &Runtime, frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(rt.block.blob_base_fee)?;
    Ok(Control::Continue(1))
}
