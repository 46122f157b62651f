use crate::{Context, EvmPrecompileResult, Precompile, PrecompileError, PrecompileOutput};
use hearth_engine_types::types::{Address, EthGas};
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::elliptic_curve::sec1::FromEncodedPoint;
use p256::{EncodedPoint, FieldBytes, PublicKey};

mod costs {
    use hearth_engine_types::types::EthGas;

    pub(super) const P256_VERIFY_BASE: EthGas = EthGas::new(6_900);
}

mod consts {
    /// message hash (32) + r (32) + s (32) + qx (32) + qy (32).
    pub(super) const INPUT_LENGTH: usize = 160;
}

/// secp256r1 (P-256) signature verification.
///
/// On a valid signature the output is a single 32-byte word ending in `0x01`;
/// on any invalid input the output is empty, with the gas still consumed.
///
/// See: `https://eips.ethereum.org/EIPS/eip-7951`
pub struct P256Verify;

impl P256Verify {
    pub const ADDRESS: Address = super::make_address(0, 0x100);

    fn verify(input: &[u8]) -> bool {
        let mut message_hash = [0u8; 32];
        message_hash.copy_from_slice(&input[0..32]);

        let signature = {
            let r = FieldBytes::clone_from_slice(&input[32..64]);
            let s = FieldBytes::clone_from_slice(&input[64..96]);
            match Signature::from_scalars(r, s) {
                Ok(signature) => signature,
                Err(_) => return false,
            }
        };

        let mut point_bytes = [0u8; 65];
        point_bytes[0] = 0x04; // uncompressed tag
        point_bytes[1..].copy_from_slice(&input[96..160]);
        let Ok(point) = EncodedPoint::from_bytes(point_bytes) else {
            return false;
        };
        // Rejects coordinates outside the field, off-curve points, and the
        // point at infinity.
        let Some(public_key) = Option::<PublicKey>::from(PublicKey::from_encoded_point(&point))
        else {
            return false;
        };

        VerifyingKey::from(&public_key)
            .verify_prehash(&message_hash, &signature)
            .is_ok()
    }
}

impl Precompile for P256Verify {
    fn required_gas(_input: &[u8]) -> Result<EthGas, PrecompileError> {
        Ok(costs::P256_VERIFY_BASE)
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
            return Ok(PrecompileOutput::new(cost, Vec::new()));
        }

        let output = if Self::verify(input) {
            let mut word = vec![0u8; 32];
            word[31] = 1;
            word
        } else {
            Vec::new()
        };

        Ok(PrecompileOutput::new(cost, output))
    }
}
