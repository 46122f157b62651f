use super::{fp_from_bendian, g2, remove_padding, PADDED_FP_LENGTH};
use crate::{make_address, Context, EvmPrecompileResult, Precompile, PrecompileError, PrecompileOutput};
use blst::{blst_fp2, blst_map_to_g2, blst_p2, blst_p2_affine, blst_p2_to_affine};
use hearth_engine_types::types::{Address, EthGas};
use std::borrow::Cow::Borrowed;

/// Base gas fee for the BLS12-381 `map_fp2_to_g2` operation.
const BASE_GAS_FEE: u64 = 23800;

/// Input length: two padded field elements.
const INPUT_LENGTH: usize = 128;

/// BLS12-381 map field element to G2.
pub struct BlsMapFp2ToG2;

impl BlsMapFp2ToG2 {
    pub const ADDRESS: Address = make_address(0, 0x11);
}

impl Precompile for BlsMapFp2ToG2 {
    fn required_gas(_input: &[u8]) -> Result<EthGas, PrecompileError>
    where
        Self: Sized,
    {
        Ok(EthGas::new(BASE_GAS_FEE))
    }

    /// Field-to-curve call expects an Fp2 element (`128` bytes) and maps it to
    /// a G2 point (`256` bytes output).
    /// See also: <https://eips.ethereum.org/EIPS/eip-2537#abi-for-mapping-fp2-element-to-g2-point>
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
            return Err(PrecompileError::Other(Borrowed(
                "ERR_BLS_MAP_FP2_INPUT_LEN",
            )));
        }

        let input_c0 = remove_padding(&input[..PADDED_FP_LENGTH])?;
        let input_c1 = remove_padding(&input[PADDED_FP_LENGTH..])?;
        let fp2 = blst_fp2 {
            fp: [fp_from_bendian(input_c0)?, fp_from_bendian(input_c1)?],
        };

        let mut p = blst_p2::default();
        // SAFETY: p and fp2 are blst values; the null second argument selects
        // the one-argument SWU map.
        unsafe { blst_map_to_g2(&mut p, &fp2, core::ptr::null()) };

        let mut p_aff = blst_p2_affine::default();
        // SAFETY: p_aff and p are blst values.
        unsafe { blst_p2_to_affine(&mut p_aff, &p) };

        let output = g2::encode_g2_point(&p_aff);
        Ok(PrecompileOutput::new(cost, output))
    }
}
