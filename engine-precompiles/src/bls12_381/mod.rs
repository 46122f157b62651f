//! # BLS12-381
//!
//! Represents [EIP-2537](https://eips.ethereum.org/EIPS/eip-2537)

pub use g1_add::BlsG1Add;
pub use g1_msm::BlsG1Msm;
pub use g2_add::BlsG2Add;
pub use g2_msm::BlsG2Msm;
pub use map_fp2_to_g2::BlsMapFp2ToG2;
pub use map_fp_to_g1::BlsMapFpToG1;
pub use pairing_check::BlsPairingCheck;

mod g1;
mod g1_add;
mod g1_msm;
mod g2;
mod g2_add;
mod g2_msm;
mod map_fp2_to_g2;
mod map_fp_to_g1;
mod pairing_check;

use crate::PrecompileError;
use blst::{blst_fp, blst_fp_from_bendian, blst_scalar, blst_scalar_from_bendian};
use std::borrow::Cow::Borrowed;

/// Length of a serialized field element without padding.
pub(crate) const FP_LENGTH: usize = 48;
/// Serialized field element length with the 16 zero bytes of padding.
pub(crate) const PADDED_FP_LENGTH: usize = 64;
/// Number of padding bytes in front of each field element.
pub(crate) const PADDING_LENGTH: usize = 16;
/// Length of an encoded scalar.
pub(crate) const SCALAR_LENGTH: usize = 32;
/// Bit width the MSM routines consume scalars at.
pub(crate) const NBITS: usize = 255;
/// One G1 point (128) plus one G2 point (256).
pub(crate) const PAIRING_INPUT_LENGTH: usize = 384;

/// Amount used to calculate the multi-scalar-multiplication discount.
const MSM_MULTIPLIER: u64 = 1000;

/// Big-endian non-Montgomery form of the BLS12-381 base field modulus.
const MODULUS_REPR: [u8; 48] = [
    0x1a, 0x01, 0x11, 0xea, 0x39, 0x7f, 0xe6, 0x9a, 0x4b, 0x1b, 0xa7, 0xb6, 0x43, 0x4b, 0xac, 0xd7,
    0x64, 0x77, 0x4b, 0x84, 0xf3, 0x85, 0x12, 0xbf, 0x67, 0x30, 0xd2, 0xa0, 0xf6, 0xb0, 0xf6, 0x24,
    0x1e, 0xab, 0xff, 0xfe, 0xb1, 0x53, 0xff, 0xff, 0xb9, 0xfe, 0xff, 0xff, 0xff, 0xff, 0xaa, 0xab,
];

/// Implements the gas schedule for G1/G2 multi-scalar-multiplication assuming
/// 30 MGas/second, see also:
/// <https://eips.ethereum.org/EIPS/eip-2537#g1g2-multiexponentiation>
fn msm_required_gas(
    k: usize,
    discount_table: &[u16],
    multiplication_cost: u64,
) -> Result<u64, PrecompileError> {
    if k == 0 {
        return Ok(0);
    }

    let index = core::cmp::min(k - 1, discount_table.len() - 1);
    let discount = u64::from(discount_table[index]);

    let k = u64::try_from(k).map_err(crate::utils::err_usize_conv)?;
    Ok((k * discount * multiplication_cost) / MSM_MULTIPLIER)
}

/// Checks if the input is a valid big-endian representation of a field element.
fn is_valid_be(input: &[u8; 48]) -> bool {
    for (byte, modul) in input.iter().zip(MODULUS_REPR.iter()) {
        match byte.cmp(modul) {
            core::cmp::Ordering::Greater => return false,
            core::cmp::Ordering::Less => return true,
            core::cmp::Ordering::Equal => {}
        }
    }
    // false if matching the modulus
    false
}

/// Checks whether or not the input represents a canonical field element,
/// returning the field element if successful.
pub(crate) fn fp_from_bendian(input: &[u8; 48]) -> Result<blst_fp, PrecompileError> {
    if !is_valid_be(input) {
        return Err(PrecompileError::Other(Borrowed("ERR_BLS_INVALID_FP")));
    }
    let mut fp = blst_fp::default();
    // SAFETY: input has fixed length, and fp is a blst value.
    unsafe {
        blst_fp_from_bendian(&mut fp, input.as_ptr());
    }
    Ok(fp)
}

/// BLS encodes a single finite field element into a byte slice with padding.
pub(crate) fn fp_to_bytes(out: &mut [u8], input: *const blst_fp) {
    use blst::blst_bendian_from_fp;

    if out.len() != PADDED_FP_LENGTH {
        return;
    }
    let (padding, rest) = out.split_at_mut(PADDING_LENGTH);
    padding.fill(0);
    // SAFETY: rest has exactly 48 bytes, input is a blst value.
    unsafe { blst_bendian_from_fp(rest.as_mut_ptr(), input) };
}

/// Removes the zeros with which the precompile inputs are left padded to
/// 64 bytes.
pub(crate) fn remove_padding(input: &[u8]) -> Result<&[u8; FP_LENGTH], PrecompileError> {
    if input.len() != PADDED_FP_LENGTH {
        return Err(PrecompileError::Other(Borrowed("ERR_BLS_PADDING")));
    }
    if input[..PADDING_LENGTH] != [0u8; PADDING_LENGTH] {
        return Err(PrecompileError::Other(Borrowed("ERR_BLS_PADDING")));
    }
    input[PADDING_LENGTH..]
        .try_into()
        .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BLS_PADDING")))
}

/// Extracts a scalar from a 32-byte slice, decoded as a big-endian unsigned
/// integer.
///
/// From [EIP-2537](https://eips.ethereum.org/EIPS/eip-2537):
/// * The corresponding integer is not required to be less than or equal to the
///   main subgroup order `q`, so no canonicality check is performed.
pub(crate) fn extract_scalar_input(input: &[u8]) -> Result<blst_scalar, PrecompileError> {
    if input.len() != SCALAR_LENGTH {
        return Err(PrecompileError::Other(Borrowed("ERR_BLS_SCALAR_LEN")));
    }

    let mut out = blst_scalar::default();
    // SAFETY: input length is checked previously, out is a blst value.
    unsafe {
        blst_scalar_from_bendian(&mut out, input.as_ptr());
    }

    Ok(out)
}
