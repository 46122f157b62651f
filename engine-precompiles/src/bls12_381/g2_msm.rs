use super::{extract_scalar_input, g2, msm_required_gas, NBITS, SCALAR_LENGTH};
use crate::{make_address, Context, EvmPrecompileResult, Precompile, PrecompileError, PrecompileOutput};
use blst::{blst_p2, blst_p2_affine, blst_p2_from_affine, blst_p2_to_affine, p2_affines};
use hearth_engine_types::types::{Address, EthGas};
use std::borrow::Cow::Borrowed;

/// Base gas fee for the BLS12-381 `g2_mul` operation.
const BASE_GAS_FEE: u64 = 22500;

/// Input length of the `g2_msm` operation: one G2 point and one scalar.
const INPUT_LENGTH: usize = 288;

/// Discount table for G2 MSM, indexed by the number of pairs minus one.
const DISCOUNT_TABLE: [u16; 128] = [
    1000, 1000, 923, 884, 855, 832, 812, 796, 782, 770, 759, 749, 740, 732, 724, 717, 711, 704,
    699, 693, 688, 683, 679, 674, 670, 666, 663, 659, 655, 652, 649, 646, 643, 640, 637, 634, 632,
    629, 627, 624, 622, 620, 618, 615, 613, 611, 609, 607, 606, 604, 602, 600, 598, 597, 595, 593,
    592, 590, 589, 587, 586, 584, 583, 582, 580, 579, 578, 576, 575, 574, 573, 571, 570, 569, 568,
    567, 566, 565, 563, 562, 561, 560, 559, 558, 557, 556, 555, 554, 553, 552, 552, 551, 550, 549,
    548, 547, 546, 545, 545, 544, 543, 542, 541, 541, 540, 539, 538, 537, 537, 536, 535, 535, 534,
    533, 532, 532, 531, 530, 530, 529, 528, 528, 527, 526, 526, 525, 524, 524,
];

/// BLS12-381 G2 MSM.
pub struct BlsG2Msm;

impl BlsG2Msm {
    pub const ADDRESS: Address = make_address(0, 0xE);
}

impl Precompile for BlsG2Msm {
    fn required_gas(input: &[u8]) -> Result<EthGas, PrecompileError>
    where
        Self: Sized,
    {
        let k = input.len() / INPUT_LENGTH;
        Ok(EthGas::new(msm_required_gas(
            k,
            &DISCOUNT_TABLE,
            BASE_GAS_FEE,
        )?))
    }

    /// Implements the EIP-2537 G2MSM precompile: `288*k` input bytes holding
    /// `k` (point, scalar) pairs, output a single G2 point (`256` bytes).
    /// See also: <https://eips.ethereum.org/EIPS/eip-2537#abi-for-g2-multiexponentiation>
    fn run(
        &self,
        input: &[u8],
        target_gas: Option<EthGas>,
        _context: &Context,
        _is_static: bool,
    ) -> EvmPrecompileResult {
        let input_len = input.len();
        if input_len == 0 || input_len % INPUT_LENGTH != 0 {
            return Err(PrecompileError::Other(Borrowed("ERR_BLS_G2MSM_INPUT_LEN")));
        }

        let cost = Self::required_gas(input)?;
        if let Some(target_gas) = target_gas {
            if cost > target_gas {
                return Err(PrecompileError::OutOfGas);
            }
        }

        let k = input_len / INPUT_LENGTH;
        let mut g2_points: Vec<blst_p2> = Vec::with_capacity(k);
        let mut scalars: Vec<u8> = Vec::with_capacity(k * SCALAR_LENGTH);
        for i in 0..k {
            let slice = &input[i * INPUT_LENGTH..i * INPUT_LENGTH + g2::G2_INPUT_ITEM_LENGTH];
            // The BLST batch API for p2_affines blows up when handed a point
            // at infinity, so infinity points (and their scalars) are skipped.
            if slice.iter().all(|byte| *byte == 0) {
                continue;
            }

            // NB: scalar multiplications, MSMs and pairings must perform a
            // subgroup check.
            let p0_aff = &g2::extract_g2_input(slice, true)?;

            let mut p0 = blst_p2::default();
            // SAFETY: p0 and p0_aff are blst values.
            unsafe { blst_p2_from_affine(&mut p0, p0_aff) };

            g2_points.push(p0);

            scalars.extend_from_slice(
                &extract_scalar_input(
                    &input[i * INPUT_LENGTH + g2::G2_INPUT_ITEM_LENGTH
                        ..i * INPUT_LENGTH + g2::G2_INPUT_ITEM_LENGTH + SCALAR_LENGTH],
                )?
                .b,
            );
        }

        // return the infinity point if all points were infinity
        if g2_points.is_empty() {
            return Ok(PrecompileOutput::new(cost, vec![0u8; 256]));
        }

        let points = p2_affines::from(&g2_points);
        let multiexp = points.mult(&scalars, NBITS);

        let mut multiexp_aff = blst_p2_affine::default();
        // SAFETY: multiexp_aff and multiexp are blst values.
        unsafe { blst_p2_to_affine(&mut multiexp_aff, &multiexp) };

        let output = g2::encode_g2_point(&multiexp_aff);
        Ok(PrecompileOutput::new(cost, output))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::new_context;

    #[test]
    fn test_g2_msm_infinity_input() {
        let input = vec![0u8; INPUT_LENGTH];
        let res = BlsG2Msm.run(&input, None, &new_context(), false).unwrap();
        assert_eq!(res.output, vec![0u8; 256]);
    }

    #[test]
    fn test_g2_msm_gas() {
        assert_eq!(
            BlsG2Msm::required_gas(&[0u8; INPUT_LENGTH]).unwrap(),
            EthGas::new(22_500)
        );
        // Two pairs pick up the k = 2 discount of 1000 (no discount).
        assert_eq!(
            BlsG2Msm::required_gas(&[0u8; 2 * INPUT_LENGTH]).unwrap(),
            EthGas::new(2 * 22_500)
        );
    }

    #[test]
    fn test_g2_msm_bad_length() {
        let res = BlsG2Msm.run(&[0u8; 287], None, &new_context(), false);
        assert!(matches!(res, Err(PrecompileError::Other(_))));
    }
}
