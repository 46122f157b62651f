use super::{fp_from_bendian, fp_to_bytes, remove_padding, PADDED_FP_LENGTH};
use crate::PrecompileError;
use blst::{blst_p1_affine, blst_p1_affine_in_g1, blst_p1_affine_on_curve};
use std::borrow::Cow::Borrowed;

/// Length of an encoded G1 point: two padded field elements.
pub(crate) const G1_INPUT_ITEM_LENGTH: usize = 128;

/// Encodes a G1 point in affine format into a byte slice with padded elements.
pub(crate) fn encode_g1_point(input: &blst_p1_affine) -> Vec<u8> {
    let mut out = vec![0u8; G1_INPUT_ITEM_LENGTH];
    fp_to_bytes(&mut out[..PADDED_FP_LENGTH], &input.x);
    fp_to_bytes(&mut out[PADDED_FP_LENGTH..], &input.y);
    out
}

/// Extracts a G1 point in affine format from a 128-byte slice representation.
///
/// NOTE: This function will perform a G1 subgroup check if `subgroup_check` is
/// set to `true` (scalar multiplications, MSMs and pairings must; plain
/// addition must not, it only requires the point to be on the curve).
pub(crate) fn extract_g1_input(
    input: &[u8],
    subgroup_check: bool,
) -> Result<blst_p1_affine, PrecompileError> {
    if input.len() != G1_INPUT_ITEM_LENGTH {
        return Err(PrecompileError::Other(Borrowed("ERR_BLS_G1_INPUT_LEN")));
    }

    let input_x = remove_padding(&input[..PADDED_FP_LENGTH])?;
    let input_y = remove_padding(&input[PADDED_FP_LENGTH..G1_INPUT_ITEM_LENGTH])?;

    // The point at infinity is encoded as all zeros.
    if input_x == &[0u8; 48] && input_y == &[0u8; 48] {
        return Ok(blst_p1_affine::default());
    }

    let out = blst_p1_affine {
        x: fp_from_bendian(input_x)?,
        y: fp_from_bendian(input_y)?,
    };

    if subgroup_check {
        // SAFETY: out is a blst value.
        if unsafe { !blst_p1_affine_in_g1(&out) } {
            return Err(PrecompileError::Other(Borrowed("ERR_BLS_G1_NOT_IN_GROUP")));
        }
    } else {
        // SAFETY: out is a blst value.
        if unsafe { !blst_p1_affine_on_curve(&out) } {
            return Err(PrecompileError::Other(Borrowed("ERR_BLS_G1_NOT_ON_CURVE")));
        }
    }

    Ok(out)
}
