use super::Control;
use crate::error::ExitError;
use crate::frame::Frame;
use crate::gas::{G_BASE, G_VERY_LOW};
use hearth_engine_types::U256;

pub fn pop(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.pop()?;
    Ok(Control::Continue(1))
}

pub fn push0(frame: &mut Frame) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_BASE)?;
    frame.stack.push(U256::zero())?;
    Ok(Control::Continue(1))
}

/// `PUSH1..PUSH32`: immediates past the end of the code read as zeros.
pub fn push(frame: &mut Frame, len: usize) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let start = frame.pc + 1;
    let mut bytes = [0u8; 32];
    for i in 0..len {
        bytes[32 - len + i] = frame.code.get(start + i).copied().unwrap_or(0);
    }
    frame.stack.push(U256::from_big_endian(&bytes))?;
    Ok(Control::Continue(1 + len))
}

pub fn dup(frame: &mut Frame, position: usize) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    let value = frame.stack.peek(position - 1)?;
    frame.stack.push(value)?;
    Ok(Control::Continue(1))
}

pub fn swap(frame: &mut Frame, position: usize) -> Result<Control, ExitError> {
    frame.gas.record_cost(G_VERY_LOW)?;
    frame.stack.swap(position)?;
    Ok(Control::Continue(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Context;
    use hearth_engine_types::types::Address;

    fn frame_with_code(code: Vec<u8>) -> Frame {
        Frame::new(
            code,
            Vec::new(),
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
    fn test_push_reads_immediates() {
        let mut frame = frame_with_code(vec![0x61, 0x12, 0x34]);
        let control = push(&mut frame, 2).unwrap();
        assert!(matches!(control, Control::Continue(3)));
        assert_eq!(frame.stack.pop().unwrap(), U256::from(0x1234));
    }

    #[test]
    fn test_push_truncated_is_zero_padded() {
        // PUSH2 with a single trailing byte.
        let mut frame = frame_with_code(vec![0x61, 0x12]);
        push(&mut frame, 2).map(|_| ()).unwrap();
        assert_eq!(frame.stack.pop().unwrap(), U256::from(0x1200));
    }

    #[test]
    fn test_dup_and_swap() {
        let mut frame = frame_with_code(Vec::new());
        for i in 1..=3u64 {
            frame.stack.push(U256::from(i)).unwrap();
        }
        dup(&mut frame, 3).map(|_| ()).unwrap();
        assert_eq!(frame.stack.peek(0).unwrap(), U256::from(1));
        frame.stack.pop().unwrap();

        swap(&mut frame, 2).map(|_| ()).unwrap();
        assert_eq!(frame.stack.peek(0).unwrap(), U256::from(1));
        assert_eq!(frame.stack.peek(2).unwrap(), U256::from(3));
    }
}
