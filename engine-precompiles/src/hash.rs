use crate::{utils, Context, EvmPrecompileResult, Precompile, PrecompileError, PrecompileOutput};
use hearth_engine_types::types::{Address, EthGas};

mod costs {
    use hearth_engine_types::types::EthGas;

    pub(super) const SHA256_BASE: EthGas = EthGas::new(60);

    pub(super) const SHA256_PER_WORD: EthGas = EthGas::new(12);

    pub(super) const RIPEMD160_BASE: EthGas = EthGas::new(600);

    pub(super) const RIPEMD160_PER_WORD: EthGas = EthGas::new(120);
}

mod consts {
    pub(super) const SHA256_WORD_LEN: u64 = 32;

    pub(super) const RIPEMD_WORD_LEN: u64 = 32;
}

/// SHA256 precompile.
///
/// See: `https://ethereum.github.io/yellowpaper/paper.pdf`
/// See: `https://etherscan.io/address/0000000000000000000000000000000000000002`
pub struct SHA256;

impl SHA256 {
    pub const ADDRESS: Address = super::make_address(0, 2);
}

impl Precompile for SHA256 {
    fn required_gas(input: &[u8]) -> Result<EthGas, PrecompileError> {
        let input_len = u64::try_from(input.len()).map_err(utils::err_usize_conv)?;
        Ok(
            (input_len + consts::SHA256_WORD_LEN - 1) / consts::SHA256_WORD_LEN
                * costs::SHA256_PER_WORD
                + costs::SHA256_BASE,
        )
    }

    fn run(
        &self,
        input: &[u8],
        target_gas: Option<EthGas>,
        _context: &Context,
        _is_static: bool,
    ) -> EvmPrecompileResult {
        use sha2::Digest;

        let cost = Self::required_gas(input)?;
        if let Some(target_gas) = target_gas {
            if cost > target_gas {
                return Err(PrecompileError::OutOfGas);
            }
        }

        let output = sha2::Sha256::digest(input).to_vec();
        Ok(PrecompileOutput::new(cost, output))
    }
}

/// RIPEMD160 precompile.
///
/// See: `https://ethereum.github.io/yellowpaper/paper.pdf`
/// See: `https://etherscan.io/address/0000000000000000000000000000000000000003`
pub struct RIPEMD160;

impl RIPEMD160 {
    pub const ADDRESS: Address = super::make_address(0, 3);

    fn internal_impl(input: &[u8]) -> [u8; 20] {
        use ripemd::{Digest, Ripemd160};

        let hash = Ripemd160::digest(input);
        let mut output = [0u8; 20];
        output.copy_from_slice(&hash);
        output
    }
}

impl Precompile for RIPEMD160 {
    fn required_gas(input: &[u8]) -> Result<EthGas, PrecompileError> {
        let input_len = u64::try_from(input.len()).map_err(utils::err_usize_conv)?;
        Ok(
            (input_len + consts::RIPEMD_WORD_LEN - 1) / consts::RIPEMD_WORD_LEN
                * costs::RIPEMD160_PER_WORD
                + costs::RIPEMD160_BASE,
        )
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

        let hash = Self::internal_impl(input);
        // The result needs to be padded with leading zeros because it is only 20 bytes, but
        // the evm works with 32-byte words.
        let mut output = vec![0u8; 32];
        output[12..].copy_from_slice(&hash);
        Ok(PrecompileOutput::new(cost, output))
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::new_context;

    use super::*;

    #[test]
    fn test_sha256() {
        let input = b"";
        let expected =
            hex::decode("e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855")
                .unwrap();

        let res = SHA256
            .run(input, Some(EthGas::new(60)), &new_context(), false)
            .unwrap()
            .output;
        assert_eq!(res, expected);
    }

    #[test]
    fn test_ripemd160() {
        let input = b"";
        let expected =
            hex::decode("0000000000000000000000009c1185a5c5e9fc54612808977ee8f548b2258d31")
                .unwrap();

        let res = RIPEMD160
            .run(input, Some(EthGas::new(600)), &new_context(), false)
            .unwrap()
            .output;
        assert_eq!(res, expected);
    }

    #[test]
    fn test_word_rounding_in_gas() {
        assert_eq!(SHA256::required_gas(&[0u8; 33]).unwrap(), EthGas::new(84));
        assert_eq!(
            RIPEMD160::required_gas(&[0u8; 33]).unwrap(),
            EthGas::new(840)
        );
    }
}
