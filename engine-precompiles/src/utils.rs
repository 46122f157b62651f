use crate::PrecompileError;
use std::borrow::Cow::Borrowed;

pub fn err_usize_conv(_e: core::num::TryFromIntError) -> PrecompileError {
    PrecompileError::Other(Borrowed("ERR_USIZE_CONVERSION"))
}

/// Reads `len` bytes starting at `offset`, zero-extending past the end of
/// `input`. Precompile inputs are implicitly right-padded with zeros.
#[must_use]
pub fn padded_slice(input: &[u8], offset: usize, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if offset < input.len() {
        let available = core::cmp::min(len, input.len() - offset);
        out[..available].copy_from_slice(&input[offset..offset + available]);
    }
    out
}

#[cfg(test)]
pub fn new_context() -> crate::Context {
    use hearth_engine_types::{H160, U256};

    crate::Context {
        address: H160::zero(),
        caller: H160::zero(),
        apparent_value: U256::zero(),
    }
}
