use super::g2;
use crate::{make_address, Context, EvmPrecompileResult, Precompile, PrecompileError, PrecompileOutput};
use blst::{
    blst_p2, blst_p2_add_or_double_affine, blst_p2_affine, blst_p2_from_affine, blst_p2_to_affine,
};
use hearth_engine_types::types::{Address, EthGas};
use std::borrow::Cow::Borrowed;

/// Base gas fee for the BLS12-381 `g2_add` operation.
const BASE_GAS_FEE: u64 = 600;

/// Input length of the `g2_add` operation.
const INPUT_LENGTH: usize = 512;

/// BLS12-381 G2 add.
pub struct BlsG2Add;

impl BlsG2Add {
    pub const ADDRESS: Address = make_address(0, 0xD);
}

impl Precompile for BlsG2Add {
    fn required_gas(_input: &[u8]) -> Result<EthGas, PrecompileError>
    where
        Self: Sized,
    {
        Ok(EthGas::new(BASE_GAS_FEE))
    }

    /// G2 addition call expects `512` bytes as an input that is interpreted as
    /// byte concatenation of two G2 points (`256` bytes each). Output is an
    /// encoding of the sum, a single G2 point (`256` bytes).
    /// See also: <https://eips.ethereum.org/EIPS/eip-2537#abi-for-g2-addition>
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
            return Err(PrecompileError::Other(Borrowed("ERR_BLS_G2ADD_INPUT_LEN")));
        }

        // NB: There is no subgroup check for the G2 addition precompile.
        let a_aff = &g2::extract_g2_input(&input[..g2::G2_INPUT_ITEM_LENGTH], false)?;
        let b_aff = &g2::extract_g2_input(&input[g2::G2_INPUT_ITEM_LENGTH..], false)?;

        let mut b = blst_p2::default();
        // SAFETY: b and b_aff are blst values.
        unsafe { blst_p2_from_affine(&mut b, b_aff) };

        let mut p = blst_p2::default();
        // SAFETY: p, b and a_aff are blst values.
        unsafe { blst_p2_add_or_double_affine(&mut p, &b, a_aff) };

        let mut p_aff = blst_p2_affine::default();
        // SAFETY: p_aff and p are blst values.
        unsafe { blst_p2_to_affine(&mut p_aff, &p) };

        let output = g2::encode_g2_point(&p_aff);
        Ok(PrecompileOutput::new(cost, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::new_context;

    #[test]
    fn test_g2_add_infinity_identity() {
        // O + O = O
        let input = vec![0u8; INPUT_LENGTH];
        let res = BlsG2Add.run(&input, None, &new_context(), false).unwrap();
        assert_eq!(res.output, vec![0u8; 256]);
    }

    #[test]
    fn test_g2_add_bad_length() {
        let res = BlsG2Add.run(&[0u8; 511], None, &new_context(), false);
        assert!(matches!(res, Err(PrecompileError::Other(_))));
    }
}
