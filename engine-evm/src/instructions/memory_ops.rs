use super::Control;
use crate::error::ExitError;
use crate::frame::Frame;
use crate::gas::{self, as_usize_or_oog, G_BASE, G_VERY_LOW};
use hearth_engine_types::U256;

pub fn mload(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let offset = frame.stack.pop()?;
    let (offset, _) = frame.resize_memory(offset, U256::from(32))?;
    let value = frame.memory.get_word(offset);
    frame.stack.push(value)?;
    Ok(Control::Continue(1))
}

pub fn mstore(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let offset = frame.stack.pop()?;
    let value = frame.stack.pop()?;
    let (offset, _) = frame.resize_memory(offset, U256::from(32))?;
    frame.memory.set_word(offset, value);
    Ok(Control::Continue(1))
}

pub fn mstore8(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let offset = frame.stack.pop()?;
    let value = frame.stack.pop()?;
    let (offset, _) = frame.resize_memory(offset, U256::one())?;
    frame.memory.set_byte(offset, value.byte(0));
    Ok(Control::Continue(1))
}

/// EIP-5656 memory copy.
pub fn mcopy(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let dst = frame.stack.pop()?;
    let src = frame.stack.pop()?;
    let len = frame.stack.pop()?;
    frame.gas.record_cost(gas::copy_cost(len)?)?;

    if len.is_zero() {
        return Ok(Control::Continue(1));
    }
    // Expansion covers the larger end of the two ranges.
    let upper = core::cmp::max(dst, src);
    frame.resize_memory(upper, len)?;
    let (dst, len) = frame.resize_memory(dst, len)?;
    let (src, _) = frame.resize_memory(src, len.into())?;
    frame.memory.copy_within(dst, src, len);
    Ok(Control::Continue(1))
}

pub fn calldataload(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let offset = frame.stack.pop()?;
    let mut word = [0u8; 32];
    if offset <= U256::from(usize::MAX) {
        let offset = offset.as_usize();
        for (i, byte) in word.iter_mut().enumerate() {
            *byte = frame.input.get(offset.wrapping_add(i)).copied().unwrap_or(0);
        }
    }
    frame.stack.push(U256::from_big_endian(&word))?;
    Ok(Control::Continue(1))
}

pub fn calldatasize(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(U256::from(frame.input.len()))?;
    Ok(Control::Continue(1))
}

pub fn calldatacopy(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let mem_offset = frame.stack.pop()?;
    let data_offset = frame.stack.pop()?;
    let len = frame.stack.pop()?;
    frame.gas.record_cost(gas::copy_cost(len)?)?;
    let (mem_offset, len) = frame.resize_memory(mem_offset, len)?;
    if len == 0 {
        return Ok(Control::Continue(1));
    }
    let data_offset = saturating_offset(data_offset);
    let input = core::mem::take(&mut frame.input);
    frame.memory.copy_from_slice(mem_offset, &input, data_offset, len);
    frame.input = input;
    Ok(Control::Continue(1))
}

pub fn codesize(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(U256::from(frame.code.len()))?;
    Ok(Control::Continue(1))
}

pub fn codecopy(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let mem_offset = frame.stack.pop()?;
    let code_offset = frame.stack.pop()?;
    let len = frame.stack.pop()?;
    frame.gas.record_cost(gas::copy_cost(len)?)?;
    let (mem_offset, len) = frame.resize_memory(mem_offset, len)?;
    if len == 0 {
        return Ok(Control::Continue(1));
    }
    let code_offset = saturating_offset(code_offset);
    let code = core::mem::take(&mut frame.code);
    frame.memory.copy_from_slice(mem_offset, &code, code_offset, len);
    frame.code = code;
    Ok(Control::Continue(1))
}

pub fn returndatasize(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(U256::from(frame.return_data.len()))?;
    Ok(Control::Continue(1))
}

/// Unlike the other copies, reading past the end of the return buffer is an
/// exception rather than zero-fill (EIP-211).
pub fn returndatacopy(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let mem_offset = frame.stack.pop()?;
    let data_offset = frame.stack.pop()?;
    let len = frame.stack.pop()?;
    frame.gas.record_cost(gas::copy_cost(len)?)?;

    let end = data_offset
        .checked_add(len)
        .ok_or(ExitError::ReturnDataOutOfBounds)?;
    if end > U256::from(frame.return_data.len()) {
        return Err(ExitError::ReturnDataOutOfBounds);
    }

    let (mem_offset, len) = frame.resize_memory(mem_offset, len)?;
    if len == 0 {
        return Ok(Control::Continue(1));
    }
    let data_offset = as_usize_or_oog(data_offset)?;
    let data = core::mem::take(&mut frame.return_data);
    frame.memory.copy_from_slice(mem_offset, &data, data_offset, len);
    frame.return_data = data;
    Ok(Control::Continue(1))
}

pub fn keccak256(frame: &mut Frame) -> Result<Control, ExitError> {
    let offset = frame.stack.pop()?;
    let len = frame.stack.pop()?;
    frame.gas.record_cost(gas::keccak256_cost(len)?)?;
    let (offset, len) = frame.resize_memory(offset, len)?;
    let data = frame.memory.get(offset, len);
    let hash = hearth_engine_types::keccak256(&data);
    frame.stack.push(U256::from_big_endian(hash.as_bytes()))?;
    Ok(Control::Continue(1))
}

/// Out-of-range source offsets saturate; the copy zero-fills from there.
fn saturating_offset(offset: U256) -> usize {
    if offset > U256::from(usize::MAX) {
        usize::MAX
    } else {
        offset.as_usize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Context;
    use hearth_engine_types::types::Address;

    fn new_frame(code: Vec<u8>, input: Vec<u8>) -> Frame {
        Frame::new(
            code,
            input,
            Context {
                address: Address::zero(),
                caller: Address::zero(),
                apparent_value: U256::zero(),
            },
            1_000_000,
            false,
            0,
            1024,
        )
    }

    #[test]
    fn test_mstore_mload_round_trip() {
        let mut frame = new_frame(Vec::new(), Vec::new());
        frame.stack.push(U256::from(0x42)).unwrap();
        frame.stack.push(U256::from(64)).unwrap();
        mstore(&mut frame).map(|_| ()).unwrap();

        frame.stack.push(U256::from(64)).unwrap();
        mload(&mut frame).map(|_| ()).unwrap();
        assert_eq!(frame.stack.pop().unwrap(), U256::from(0x42));
        assert_eq!(frame.memory.len(), 96);
    }

    #[test]
    fn test_calldataload_past_end_zero_fills() {
        let mut frame = new_frame(Vec::new(), vec![0xaa, 0xbb]);
        frame.stack.push(U256::from(1)).unwrap();
        calldataload(&mut frame).map(|_| ()).unwrap();
        let mut expected = [0u8; 32];
        expected[0] = 0xbb;
        assert_eq!(frame.stack.pop().unwrap(), U256::from_big_endian(&expected));
    }

    #[test]
    fn test_returndatacopy_bounds_checked() {
        let mut frame = new_frame(Vec::new(), Vec::new());
        frame.return_data = vec![1, 2, 3];
        frame.stack.push(U256::from(2)).unwrap(); // len
        frame.stack.push(U256::from(2)).unwrap(); // data offset
        frame.stack.push(U256::zero()).unwrap(); // mem offset
        let res = returndatacopy(&mut frame);
        assert!(matches!(res, Err(ExitError::ReturnDataOutOfBounds)));
    }

    #[test]
    fn test_keccak256_of_memory() {
        let mut frame = new_frame(Vec::new(), Vec::new());
        frame.stack.push(U256::zero()).unwrap(); // len
        frame.stack.push(U256::zero()).unwrap(); // offset
        keccak256(&mut frame).map(|_| ()).unwrap();
        assert_eq!(
            frame.stack.pop().unwrap(),
            U256::from_big_endian(
                hearth_engine_types::keccak256(&[]).as_bytes()
            )
        );
    }
}
