use super::{extract_scalar_input, g1, msm_required_gas, NBITS, SCALAR_LENGTH};
use crate::{make_address, Context, EvmPrecompileResult, Precompile, PrecompileError, PrecompileOutput};
use blst::{blst_p1, blst_p1_affine, blst_p1_from_affine, blst_p1_to_affine, p1_affines};
use hearth_engine_types::types::{Address, EthGas};
use std::borrow::Cow::Borrowed;

/// Input length of the `g1_msm` operation: one G1 point and one scalar.
const INPUT_LENGTH: usize = 160;

/// Base gas fee for the BLS12-381 `g1_mul` operation.
const BASE_GAS_FEE: u64 = 12000;

/// Discount table for G1 MSM, indexed by the number of pairs minus one.
const DISCOUNT_TABLE: [u16; 128] = [
    1000, 949, 848, 797, 764, 750, 738, 728, 719, 712, 705, 698, 692, 687, 682, 677, 673, 669, 665,
    661, 658, 654, 651, 648, 645, 642, 640, 637, 635, 632, 630, 627, 625, 623, 621, 619, 617, 615,
    613, 611, 609, 608, 606, 604, 603, 601, 599, 598, 596, 595, 593, 592, 591, 589, 588, 586, 585,
    584, 582, 581, 580, 579, 577, 576, 575, 574, 573, 572, 570, 569, 568, 567, 566, 565, 564, 563,
    562, 561, 560, 559, 558, 557, 556, 555, 554, 553, 552, 551, 550, 549, 548, 547, 547, 546, 545,
    544, 543, 542, 541, 540, 540, 539, 538, 537, 536, 536, 535, 534, 533, 532, 532, 531, 530, 529,
    528, 528, 527, 526, 525, 525, 524, 523, 522, 522, 521, 520, 520, 519,
];

/// BLS12-381 G1 MSM.
pub struct BlsG1Msm;

impl BlsG1Msm {
    pub const ADDRESS: Address = make_address(0, 0xC);
}

impl Precompile for BlsG1Msm {
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

    /// Implements the EIP-2537 G1MSM precompile: `160*k` input bytes holding
    /// `k` (point, scalar) pairs, output a single G1 point (`128` bytes).
    /// See also: <https://eips.ethereum.org/EIPS/eip-2537#abi-for-g1-multiexponentiation>
    fn run(
        &self,
        input: &[u8],
        target_gas: Option<EthGas>,
        _context: &Context,
        _is_static: bool,
    ) -> EvmPrecompileResult {
        let input_len = input.len();
        if input_len == 0 || input_len % INPUT_LENGTH != 0 {
            return Err(PrecompileError::Other(Borrowed("ERR_BLS_G1MSM_INPUT_LEN")));
        }

        let k = input_len / INPUT_LENGTH;
        let cost = Self::required_gas(input)?;
        if let Some(target_gas) = target_gas {
            if cost > target_gas {
                return Err(PrecompileError::OutOfGas);
            }
        }
        let mut g1_points: Vec<blst_p1> = Vec::with_capacity(k);
        let mut scalars: Vec<u8> = Vec::with_capacity(k * SCALAR_LENGTH);
        for i in 0..k {
            let slice = &input[i * INPUT_LENGTH..i * INPUT_LENGTH + g1::G1_INPUT_ITEM_LENGTH];

            // The BLST batch API for p1_affines blows up when handed a point
            // at infinity, so infinity points (and their scalars) are skipped.
            if slice.iter().all(|byte| *byte == 0) {
                continue;
            }

            // NB: scalar multiplications, MSMs and pairings must perform a
            // subgroup check.
            let p0_aff = &g1::extract_g1_input(slice, true)?;

            let mut p0 = blst_p1::default();
            // SAFETY: p0 and p0_aff are blst values.
            unsafe { blst_p1_from_affine(&mut p0, p0_aff) };
            g1_points.push(p0);

            scalars.extend_from_slice(
                &extract_scalar_input(
                    &input[i * INPUT_LENGTH + g1::G1_INPUT_ITEM_LENGTH
                        ..i * INPUT_LENGTH + g1::G1_INPUT_ITEM_LENGTH + SCALAR_LENGTH],
                )?
                .b,
            );
        }

        // return the infinity point if all points were infinity
        if g1_points.is_empty() {
            return Ok(PrecompileOutput::new(cost, vec![0u8; 128]));
        }

        let points = p1_affines::from(&g1_points);
        let multiexp = points.mult(&scalars, NBITS);

        let mut multiexp_aff = blst_p1_affine::default();
        // SAFETY: multiexp_aff and multiexp are blst values.
        unsafe { blst_p1_to_affine(&mut multiexp_aff, &multiexp) };

        let output = g1::encode_g1_point(&multiexp_aff);
        Ok(PrecompileOutput::new(cost, output))
    }
}
