use crate::{make_address, Context, EvmPrecompileResult, Precompile, PrecompileError, PrecompileOutput};
use hearth_engine_types::types::{Address, EthGas};
use hearth_engine_types::{keccak256, H256};
use std::borrow::Cow::Borrowed;

mod costs {
    use hearth_engine_types::types::EthGas;

    pub(super) const ECRECOVER_BASE: EthGas = EthGas::new(3_000);
}

mod consts {
    pub(super) const INPUT_LEN: usize = 128;
    pub(super) const SIGNATURE_LENGTH: usize = 65;
}

/// Recovers the signer address from a 32-byte message hash and a 65-byte
/// `(r, s, recovery_id)` signature.
pub fn ecrecover(
    hash: H256,
    signature: &[u8; consts::SIGNATURE_LENGTH],
) -> Result<Address, PrecompileError> {
    let recovery_id = libsecp256k1::RecoveryId::parse(signature[64])
        .map_err(|_e| PrecompileError::Other(Borrowed("ERR_ECRECOVER_REC_ID")))?;
    let sig = libsecp256k1::Signature::parse_standard_slice(&signature[..64])
        .map_err(|_e| PrecompileError::Other(Borrowed("ERR_ECRECOVER_SIG")))?;
    let message = libsecp256k1::Message::parse(hash.as_fixed_bytes());
    let public_key = libsecp256k1::recover(&message, &sig, &recovery_id)
        .map_err(|_e| PrecompileError::Other(Borrowed("ERR_ECRECOVER")))?;

    // The address is the rightmost 20 bytes of the keccak of the uncompressed
    // public key without its 0x04 tag byte.
    let digest = keccak256(&public_key.serialize()[1..]);
    Address::try_from_slice(&digest[12..])
        .map_err(|_e| PrecompileError::Other(Borrowed("ERR_ECRECOVER_ADDR")))
}

/// See: `https://ethereum.github.io/yellowpaper/paper.pdf`
/// See: `https://etherscan.io/address/0000000000000000000000000000000000000001`
pub struct ECRecover;

impl ECRecover {
    pub const ADDRESS: Address = make_address(0, 1);
}

impl Precompile for ECRecover {
    fn required_gas(_input: &[u8]) -> Result<EthGas, PrecompileError> {
        Ok(costs::ECRECOVER_BASE)
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

        let mut input = input.to_vec();
        input.resize(consts::INPUT_LEN, 0);

        let mut hash = [0; 32];
        hash.copy_from_slice(&input[0..32]);

        let mut v = [0; 32];
        v.copy_from_slice(&input[32..64]);

        let mut signature = [0; consts::SIGNATURE_LENGTH]; // signature is (r, s, v), typed (uint256, uint256, uint8)
        signature[0..32].copy_from_slice(&input[64..96]); // r
        signature[32..64].copy_from_slice(&input[96..128]); // s

        let v_bit = match v[31] {
            27 | 28 if v[..31] == [0; 31] => v[31] - 27,
            _ => {
                return Ok(PrecompileOutput::new(cost, Vec::new()));
            }
        };
        signature[64] = v_bit; // v

        // Any recovery failure yields empty output, never a precompile error.
        let output = ecrecover(H256::from_slice(&hash), &signature)
            .map(|a| {
                let mut output = [0u8; 32];
                output[12..32].copy_from_slice(a.as_bytes());
                output.to_vec()
            })
            .unwrap_or_default();

        Ok(PrecompileOutput::new(cost, output))
    }
}
