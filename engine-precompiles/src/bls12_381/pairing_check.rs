use super::{g1, g2, PAIRING_INPUT_LENGTH};
use crate::{make_address, Context, EvmPrecompileResult, Precompile, PrecompileError, PrecompileOutput};
use blst::{
    blst_final_exp, blst_fp12, blst_fp12_is_one, blst_fp12_mul, blst_miller_loop,
    blst_p1_affine_is_inf, blst_p2_affine_is_inf,
};
use hearth_engine_types::types::{Address, EthGas};
use std::borrow::Cow::Borrowed;

/// Multiplier gas fee for the BLS12-381 pairing operation.
const PAIRING_MULTIPLIER_BASE: u64 = 32600;
/// Offset gas fee for the BLS12-381 pairing operation.
const PAIRING_OFFSET_BASE: u64 = 37700;

/// BLS12-381 pairing check.
pub struct BlsPairingCheck;

impl BlsPairingCheck {
    pub const ADDRESS: Address = make_address(0, 0xF);
}

impl Precompile for BlsPairingCheck {
    fn required_gas(input: &[u8]) -> Result<EthGas, PrecompileError>
    where
        Self: Sized,
    {
        let k = u64::try_from(input.len() / PAIRING_INPUT_LENGTH)
            .map_err(crate::utils::err_usize_conv)?;
        Ok(EthGas::new(PAIRING_MULTIPLIER_BASE * k + PAIRING_OFFSET_BASE))
    }

    /// Pairing call expects `384*k` bytes as input, interpreted as `k` slices
    /// of a G1 point (`128` bytes) followed by a G2 point (`256` bytes). Each
    /// point must be in its subgroup. Output is a 32-byte word whose last byte
    /// is `0x01` when the pairing product equals the multiplicative identity
    /// and `0x00` otherwise.
    ///
    /// See also: <https://eips.ethereum.org/EIPS/eip-2537#abi-for-pairing>
    fn run(
        &self,
        input: &[u8],
        target_gas: Option<EthGas>,
        _context: &Context,
        _is_static: bool,
    ) -> EvmPrecompileResult {
        let input_len = input.len();
        if input_len == 0 || input_len % PAIRING_INPUT_LENGTH != 0 {
            return Err(PrecompileError::Other(Borrowed(
                "ERR_BLS_PAIRING_INVALID_LENGTH",
            )));
        }

        let cost = Self::required_gas(input)?;
        if let Some(target_gas) = target_gas {
            if cost > target_gas {
                return Err(PrecompileError::OutOfGas);
            }
        }

        let k = input_len / PAIRING_INPUT_LENGTH;
        let mut accumulator = blst_fp12::default();
        let mut found_nontrivial = false;

        for i in 0..k {
            let element = &input[i * PAIRING_INPUT_LENGTH..(i + 1) * PAIRING_INPUT_LENGTH];
            // Both subgroup checks are mandatory for the pairing.
            let p1_aff = g1::extract_g1_input(&element[..g1::G1_INPUT_ITEM_LENGTH], true)?;
            let p2_aff = g2::extract_g2_input(&element[g1::G1_INPUT_ITEM_LENGTH..], true)?;

            // A pair with an infinity member contributes the identity and can
            // be skipped; the miller loop does not accept infinity inputs.
            // SAFETY: p1_aff and p2_aff are blst values.
            if unsafe { blst_p1_affine_is_inf(&p1_aff) || blst_p2_affine_is_inf(&p2_aff) } {
                continue;
            }

            let mut loop_result = blst_fp12::default();
            // SAFETY: loop_result, p2_aff and p1_aff are blst values.
            unsafe { blst_miller_loop(&mut loop_result, &p2_aff, &p1_aff) };
            if found_nontrivial {
                let partial = accumulator;
                // SAFETY: accumulator, partial and loop_result are blst values.
                unsafe { blst_fp12_mul(&mut accumulator, &partial, &loop_result) };
            } else {
                accumulator = loop_result;
                found_nontrivial = true;
            }
        }

        let success = if found_nontrivial {
            let mut exp = blst_fp12::default();
            // SAFETY: exp and accumulator are blst values.
            unsafe {
                blst_final_exp(&mut exp, &accumulator);
                blst_fp12_is_one(&exp)
            }
        } else {
            // Every pair contained an infinity point: the product is one.
            true
        };

        let mut output = vec![0u8; 32];
        if success {
            output[31] = 1;
        }
        Ok(PrecompileOutput::new(cost, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::new_context;

    #[test]
    fn test_pairing_all_infinity_is_one() {
        let input = vec![0u8; PAIRING_INPUT_LENGTH];
        let res = BlsPairingCheck
            .run(&input, None, &new_context(), false)
            .unwrap();
        let mut expected = vec![0u8; 32];
        expected[31] = 1;
        assert_eq!(res.output, expected);
    }

    #[test]
    fn test_pairing_gas() {
        assert_eq!(
            BlsPairingCheck::required_gas(&[0u8; 2 * PAIRING_INPUT_LENGTH]).unwrap(),
            EthGas::new(2 * 32_600 + 37_700)
        );
    }

    #[test]
    fn test_pairing_bad_length() {
        let res = BlsPairingCheck.run(&[0u8; 383], None, &new_context(), false);
        assert!(matches!(res, Err(PrecompileError::Other(_))));
    }
}
