use super::g1;
use crate::{make_address, Context, EvmPrecompileResult, Precompile, PrecompileError, PrecompileOutput};
use blst::{
    blst_p1, blst_p1_add_or_double_affine, blst_p1_affine, blst_p1_from_affine, blst_p1_to_affine,
};
use hearth_engine_types::types::{Address, EthGas};
use std::borrow::Cow::Borrowed;

/// Base gas fee for the BLS12-381 `g1_add` operation.
const BASE_GAS_FEE: u64 = 375;

/// Input length of the `g1_add` operation.
const INPUT_LENGTH: usize = 256;

/// BLS12-381 G1 add.
pub struct BlsG1Add;

impl BlsG1Add {
    pub const ADDRESS: Address = make_address(0, 0xB);
}

impl Precompile for BlsG1Add {
    fn required_gas(_input: &[u8]) -> Result<EthGas, PrecompileError>
    where
        Self: Sized,
    {
        Ok(EthGas::new(BASE_GAS_FEE))
    }

    /// G1 addition call expects `256` bytes as an input that is interpreted as
    /// byte concatenation of two G1 points (`128` bytes each). Output is an
    /// encoding of the sum, a single G1 point (`128` bytes).
    /// See also: <https://eips.ethereum.org/EIPS/eip-2537#abi-for-g1-addition>
    fn run(
        &self,
        input: &[u8],
        target_gas: Option<EthGas>,
        _context: &Context,
        _is_static: bool,
    ) -> EvmPrecompileResult {
        let cost = Self::required_gas(input)?;
        if let Some(target_gas) = target_gas {
            if cost > target_gas {
                return Err(PrecompileError::OutOfGas);
            }
        }

        if input.len() != INPUT_LENGTH {
            return Err(PrecompileError::Other(Borrowed("ERR_BLS_G1ADD_INPUT_LEN")));
        }

        // NB: There is no subgroup check for the G1 addition precompile.
        let a_aff = &g1::extract_g1_input(&input[..g1::G1_INPUT_ITEM_LENGTH], false)?;
        let b_aff = &g1::extract_g1_input(&input[g1::G1_INPUT_ITEM_LENGTH..], false)?;

        let mut b = blst_p1::default();
        // SAFETY: b and b_aff are blst values.
        unsafe { blst_p1_from_affine(&mut b, b_aff) };

        let mut p = blst_p1::default();
        // SAFETY: p, b and a_aff are blst values.
        unsafe { blst_p1_add_or_double_affine(&mut p, &b, a_aff) };

        let mut p_aff = blst_p1_affine::default();
        // SAFETY: p_aff and p are blst values.
        unsafe { blst_p1_to_affine(&mut p_aff, &p) };

        let output = g1::encode_g1_point(&p_aff);
        Ok(PrecompileOutput::new(cost, output))
    }
}
