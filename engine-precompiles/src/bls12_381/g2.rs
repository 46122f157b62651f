use super::{fp_from_bendian, fp_to_bytes, remove_padding, PADDED_FP_LENGTH};
use crate::PrecompileError;
use blst::{blst_fp2, blst_p2_affine, blst_p2_affine_in_g2, blst_p2_affine_on_curve};
use std::borrow::Cow::Borrowed;

/// Length of an encoded G2 point: four padded field elements.
pub(crate) const G2_INPUT_ITEM_LENGTH: usize = 256;

/// Encodes a G2 point in affine format into a byte slice with padded elements.
pub(crate) fn encode_g2_point(input: &blst_p2_affine) -> Vec<u8> {
    let mut out = vec![0u8; G2_INPUT_ITEM_LENGTH];
    fp_to_bytes(&mut out[..PADDED_FP_LENGTH], &input.x.fp[0]);
    fp_to_bytes(&mut out[PADDED_FP_LENGTH..2 * PADDED_FP_LENGTH], &input.x.fp[1]);
    fp_to_bytes(
        &mut out[2 * PADDED_FP_LENGTH..3 * PADDED_FP_LENGTH],
        &input.y.fp[0],
    );
    fp_to_bytes(
        &mut out[3 * PADDED_FP_LENGTH..4 * PADDED_FP_LENGTH],
        &input.y.fp[1],
    );
    out
}

/// Extracts a G2 point in affine format from a 256-byte slice representation.
pub(crate) fn extract_g2_input(
    input: &[u8],
    subgroup_check: bool,
) -> Result<blst_p2_affine, PrecompileError> {
    if input.len() != G2_INPUT_ITEM_LENGTH {
        return Err(PrecompileError::Other(Borrowed("ERR_BLS_G2_INPUT_LEN")));
    }

    let mut components = [&[0u8; 48]; 4];
    for (i, component) in components.iter_mut().enumerate() {
        *component = remove_padding(&input[i * PADDED_FP_LENGTH..(i + 1) * PADDED_FP_LENGTH])?;
    }

    if components.iter().all(|c| **c == [0u8; 48]) {
        return Ok(blst_p2_affine::default());
    }

    let out = blst_p2_affine {
        x: blst_fp2 {
            fp: [fp_from_bendian(components[0])?, fp_from_bendian(components[1])?],
        },
        y: blst_fp2 {
            fp: [fp_from_bendian(components[2])?, fp_from_bendian(components[3])?],
        },
    };

    if subgroup_check {
        // SAFETY: out is a blst value.
        if unsafe { !blst_p2_affine_in_g2(&out) } {
            return Err(PrecompileError::Other(Borrowed("ERR_BLS_G2_NOT_IN_GROUP")));
        }
    } else {
        // SAFETY: out is a blst value.
        if unsafe { !blst_p2_affine_on_curve(&out) } {
            return Err(PrecompileError::Other(Borrowed("ERR_BLS_G2_NOT_ON_CURVE")));
        }
    }

    Ok(out)
}
