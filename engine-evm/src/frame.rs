use crate::gas::{self, as_usize_or_oog};
use crate::gasometer::Gasometer;
use crate::memory::Memory;
use crate::stack::Stack;
use crate::valids::Valids;
use crate::error::ExitError;
use hearth_engine_types::types::Address;
use hearth_engine_types::U256;

/// Who is executing, on whose storage, with what apparent value.
#[derive(Debug, Clone)]
pub struct Context {
    /// The account whose storage the frame reads and writes.
    pub address: Address,
    pub caller: Address,
    /// The value `CALLVALUE` reports; a delegatecall inherits it without any
    /// transfer happening.
    pub apparent_value: U256,
}

/// One execution context: one code, one stack, one memory, one gas budget.
pub struct Frame {
    pub code: Vec<u8>,
    pub valids: Valids,
    pub pc: usize,
    pub stack: Stack,
    pub memory: Memory,
    pub input: Vec<u8>,
    pub context: Context,
    pub is_static: bool,
    pub depth: usize,
    pub gas: Gasometer,
    /// Output of the most recent completed sub-call.
    pub return_data: Vec<u8>,
    /// Bytes this frame itself returns or reverts with.
    pub output: Vec<u8>,
}

impl Frame {
    #[must_use]
    pub fn new(
        code: Vec<u8>,
        input: Vec<u8>,
        context: Context,
        gas_limit: u64,
        is_static: bool,
        depth: usize,
        stack_limit: usize,
    ) -> Self {
        let valids = Valids::new(&code);
        Self {
            code,
            valids,
            pc: 0,
            stack: Stack::new(stack_limit),
            memory: Memory::new(),
            input,
            context,
            is_static,
            depth,
            gas: Gasometer::new(gas_limit),
            return_data: Vec::new(),
            output: Vec::new(),
        }
    }

    /// Charges memory expansion for `[offset, offset + len)` and grows memory,
    /// returning the resolved native offsets.
    pub fn resize_memory(&mut self, offset: U256, len: U256) -> Result<(usize, usize), ExitError> {
        let cost = gas::memory_expansion_cost(self.memory.len(), offset, len)?;
        self.gas.record_cost(cost)?;
        if len.is_zero() {
            return Ok((0, 0));
        }
        let offset = as_usize_or_oog(offset)?;
        let len = as_usize_or_oog(len)?;
        self.memory.resize(offset, len)?;
        Ok((offset, len))
    }
}
