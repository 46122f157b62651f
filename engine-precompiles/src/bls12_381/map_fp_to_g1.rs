use super::{fp_from_bendian, g1, remove_padding, PADDED_FP_LENGTH};
use crate::{make_address, Context, EvmPrecompileResult, Precompile, PrecompileError, PrecompileOutput};
use blst::{blst_map_to_g1, blst_p1, blst_p1_affine, blst_p1_to_affine};
use hearth_engine_types::types::{Address, EthGas};
use std::borrow::Cow::Borrowed;

/// Base gas fee for the BLS12-381 `map_fp_to_g1` operation.
const BASE_GAS_FEE: u64 = 5500;

/// BLS12-381 map field element to G1.
pub struct BlsMapFpToG1;

impl BlsMapFpToG1 {
    pub const ADDRESS: Address = make_address(0, 0x10);
}

impl Precompile for BlsMapFpToG1 {
    fn required_gas(_input: &[u8]) -> Result<EthGas, PrecompileError>
    where
        Self: Sized,
    {
        Ok(EthGas::new(BASE_GAS_FEE))
    }

    /// Field-to-curve call expects a single padded field element (`64` bytes)
    /// and maps it to a G1 point (`128` bytes output).
    /// See also: <https://eips.ethereum.org/EIPS/eip-2537#abi-for-mapping-fp-element-to-g1-point>
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

        if input.len() != PADDED_FP_LENGTH {
            return Err(PrecompileError::Other(Borrowed("ERR_BLS_MAP_FP_INPUT_LEN")));
        }

        let input_fp = remove_padding(input)?;
        let fp = fp_from_bendian(input_fp)?;

        let mut p = blst_p1::default();
        // SAFETY: p and fp are blst values; the null second argument selects
        // the one-argument SWU map.
        unsafe { blst_map_to_g1(&mut p, &fp, core::ptr::null()) };

        let mut p_aff = blst_p1_affine::default();
        // SAFETY: p_aff and p are blst values.
        unsafe { blst_p1_to_affine(&mut p_aff, &p) };

        let output = g1::encode_g1_point(&p_aff);
        Ok(PrecompileOutput::new(cost, output))
    }
}
