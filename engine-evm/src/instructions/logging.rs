use super::{u256_to_h256, Control};
use crate::error::ExitError;
use crate::frame::Frame;
use crate::gas;
use crate::runtime::Runtime;
use hearth_engine_types::log::Log;

pub fn log(rt: &mut Runtime, frame: &mut Frame, topic_count: usize) -> Result<Control, ExitError> {
    if frame.is_static {
        return Err(ExitError::WriteProtection);
    }

    let offset = frame.stack.pop()?;
    let len = frame.stack.pop()?;
    frame.gas.record_cost(gas::log_cost(topic_count, len)?)?;

    let mut topics = Vec::with_capacity(topic_count);
    for _ in 0..topic_count {
        topics.push(u256_to_h256(frame.stack.pop()?));
    }

    let (offset, len) = frame.resize_memory(offset, len)?;
    let data = frame.memory.get(offset, len);

    rt.state.log(Log {
        address: frame.context.address,
        topics,
        data,
    });
    Ok(Control::Continue(1))
}
