use crate::{Context, EvmPrecompileResult, Precompile, PrecompileError, PrecompileOutput};
use hearth_engine_types::types::{Address, EthGas};
use sha2::Digest;
use std::borrow::Cow::Borrowed;

mod costs {
    use hearth_engine_types::types::EthGas;

    pub(super) const POINT_EVALUATION: EthGas = EthGas::new(50_000);
}

mod consts {
    /// versioned hash (32) + z (32) + y (32) + commitment (48) + proof (48).
    pub(super) const INPUT_LENGTH: usize = 192;

    pub(super) const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

    /// Fixed return payload: `FIELD_ELEMENTS_PER_BLOB ++ BLS_MODULUS`, both as
    /// 32-byte big-endian integers.
    pub(super) const RETURN_VALUE: [u8; 64] = [
        0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        0x10, 0x00, 0x73, 0xed, 0xa7, 0x53, 0x29, 0x9d, 0x7d, 0x48, 0x33, 0x39, 0xd8, 0x08, 0x09,
        0xa1, 0xd8, 0x05, 0x53, 0xbd, 0xa4, 0x02, 0xff, 0xfe, 0x5b, 0xfe, 0xff, 0xff, 0xff, 0xff,
        0x00, 0x00, 0x00, 0x01,
    ];
}

/// The KZG point-evaluation precompile of EIP-4844: verifies the claim
/// `p(z) == y` for the polynomial committed to by `commitment`.
///
/// See: `https://eips.ethereum.org/EIPS/eip-4844#point-evaluation-precompile`
pub struct KzgPointEvaluation;

impl KzgPointEvaluation {
    pub const ADDRESS: Address = super::make_address(0, 0x0a);

    /// `sha256(commitment)` with the first byte replaced by the KZG version
    /// tag.
    #[must_use]
    pub fn kzg_to_versioned_hash(commitment: &[u8]) -> [u8; 32] {
        let mut hash: [u8; 32] = sha2::Sha256::digest(commitment).into();
        hash[0] = consts::VERSIONED_HASH_VERSION_KZG;
        hash
    }
}

impl Precompile for KzgPointEvaluation {
    fn required_gas(_input: &[u8]) -> Result<EthGas, PrecompileError> {
        Ok(costs::POINT_EVALUATION)
    }

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

        if input.len() != consts::INPUT_LENGTH {
            return Err(PrecompileError::Other(Borrowed("ERR_KZG_INPUT_LEN")));
        }

        let versioned_hash = &input[..32];
        let commitment = &input[96..144];
        if Self::kzg_to_versioned_hash(commitment)[..] != versioned_hash[..] {
            return Err(PrecompileError::Other(Borrowed("ERR_KZG_VERSIONED_HASH")));
        }

        let commitment = c_kzg::Bytes48::from_bytes(commitment)
            .map_err(|_e| PrecompileError::Other(Borrowed("ERR_KZG_COMMITMENT")))?;
        let z = c_kzg::Bytes32::from_bytes(&input[32..64])
            .map_err(|_e| PrecompileError::Other(Borrowed("ERR_KZG_Z")))?;
        let y = c_kzg::Bytes32::from_bytes(&input[64..96])
            .map_err(|_e| PrecompileError::Other(Borrowed("ERR_KZG_Y")))?;
        let proof = c_kzg::Bytes48::from_bytes(&input[144..192])
            .map_err(|_e| PrecompileError::Other(Borrowed("ERR_KZG_PROOF")))?;

        let verified = c_kzg::KzgProof::verify_kzg_proof(
            &commitment,
            &z,
            &y,
            &proof,
            c_kzg::ethereum_kzg_settings(),
        )
        .map_err(|_e| PrecompileError::Other(Borrowed("ERR_KZG_VERIFY")))?;

        if !verified {
            return Err(PrecompileError::Other(Borrowed("ERR_KZG_PROOF_INVALID")));
        }

        Ok(PrecompileOutput::new(cost, consts::RETURN_VALUE.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::new_context;

    #[test]
    fn test_versioned_hash_tagging() {
        let commitment = [0u8; 48];
        let hash = KzgPointEvaluation::kzg_to_versioned_hash(&commitment);
        assert_eq!(hash[0], 0x01);
    }

    #[test]
    fn test_wrong_versioned_hash_rejected() {
        // Zero commitment with a zero versioned hash cannot match the sha256 tag.
        let input = [0u8; 192];
        let res = KzgPointEvaluation.run(
            &input,
            Some(EthGas::new(50_000)),
            &new_context(),
            false,
        );
        assert!(matches!(res, Err(PrecompileError::Other(_))));
    }

    #[test]
    fn test_zero_proof_for_zero_polynomial() {
        // The zero commitment commits to the zero polynomial, so p(z) = 0 is
        // provable with the identity proof.
        let mut input = [0u8; 192];
        let commitment = {
            let mut c = [0u8; 48];
            c[0] = 0xc0; // compressed point at infinity
            c
        };
        input[96..144].copy_from_slice(&commitment);
        input[144] = 0xc0; // proof: point at infinity
        let versioned = KzgPointEvaluation::kzg_to_versioned_hash(&commitment);
        input[..32].copy_from_slice(&versioned);

        let output = KzgPointEvaluation
            .run(&input, Some(EthGas::new(50_000)), &new_context(), false)
            .unwrap()
            .output;
        assert_eq!(output, consts::RETURN_VALUE.to_vec());
    }

    #[test]
    fn test_short_input_rejected() {
        let res = KzgPointEvaluation.run(
            &[0u8; 191],
            Some(EthGas::new(50_000)),
            &new_context(),
            false,
        );
        assert!(matches!(res, Err(PrecompileError::Other(_))));
    }
}
