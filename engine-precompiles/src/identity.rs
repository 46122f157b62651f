use crate::{utils, Context, EvmPrecompileResult, Precompile, PrecompileError, PrecompileOutput};
use hearth_engine_types::types::{Address, EthGas};

mod costs {
    use hearth_engine_types::types::EthGas;

    pub(super) const IDENTITY_BASE: EthGas = EthGas::new(15);

    pub(super) const IDENTITY_PER_WORD: EthGas = EthGas::new(3);
}

mod consts {
    pub(super) const IDENTITY_WORD_LEN: u64 = 32;
}

/// Identity precompile: returns its input unchanged.
///
/// See: `https://etherscan.io/address/0000000000000000000000000000000000000004`
pub struct Identity;

impl Identity {
    pub const ADDRESS: Address = super::make_address(0, 4);
}

impl Precompile for Identity {
    fn required_gas(input: &[u8]) -> Result<EthGas, PrecompileError> {
        let input_len = u64::try_from(input.len()).map_err(utils::err_usize_conv)?;
        Ok(
            (input_len + consts::IDENTITY_WORD_LEN - 1) / consts::IDENTITY_WORD_LEN
                * costs::IDENTITY_PER_WORD
                + costs::IDENTITY_BASE,
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

        Ok(PrecompileOutput::new(cost, input.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::new_context;

    #[test]
    fn test_identity_round_trip() {
        let data = [1u8, 2, 3, 4, 5];
        let res = Identity
            .run(&data, Some(EthGas::new(18)), &new_context(), false)
            .unwrap()
            .output;
        assert_eq!(res, data);
    }

    #[test]
    fn test_identity_out_of_gas() {
        let data = [0u8; 33];
        let res = Identity.run(&data, Some(EthGas::new(20)), &new_context(), false);
        assert!(matches!(res, Err(PrecompileError::OutOfGas)));
    }
}
