use crate::{
    utils, Berlin, Byzantium, Context, EvmPrecompileResult, HardFork, Osaka, Precompile,
    PrecompileError, PrecompileOutput,
};
use core::marker::PhantomData;
use hearth_engine_types::types::{Address, EthGas};
use hearth_engine_types::U256;
use num::BigUint;

/// Big-integer modular exponentiation, `base^exp % modulus`.
///
/// See: `https://eips.ethereum.org/EIPS/eip-198`
/// See: `https://etherscan.io/address/0000000000000000000000000000000000000005`
pub struct ModExp<HF: HardFork>(PhantomData<HF>);

impl<HF: HardFork> ModExp<HF> {
    pub const ADDRESS: Address = super::make_address(0, 5);

    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }

    fn parse_lengths(input: &[u8]) -> (U256, U256, U256) {
        let base_len = U256::from_big_endian(&utils::padded_slice(input, 0, 32));
        let exp_len = U256::from_big_endian(&utils::padded_slice(input, 32, 32));
        let mod_len = U256::from_big_endian(&utils::padded_slice(input, 64, 32));
        (base_len, exp_len, mod_len)
    }

    /// The first 32 bytes of the exponent (zero-extended), used by every gas
    /// formula to estimate the iteration count.
    fn exp_head(input: &[u8], base_len: U256) -> U256 {
        // A base that cannot start within the calldata leaves the whole
        // exponent implicitly zero.
        if base_len > U256::from(input.len()) {
            return U256::zero();
        }
        let head = utils::padded_slice(input, 96 + base_len.as_usize(), 32);
        U256::from_big_endian(&head)
    }

    fn iteration_count(exp_len: U256, exp_head: U256, length_multiplier: u64) -> U256 {
        let iterations = if exp_len <= U256::from(32) {
            if exp_head.is_zero() {
                U256::zero()
            } else {
                U256::from(exp_head.bits() - 1)
            }
        } else {
            let head_bits = if exp_head.is_zero() {
                U256::zero()
            } else {
                U256::from(exp_head.bits() - 1)
            };
            U256::from(length_multiplier) * (exp_len - U256::from(32)) + head_bits
        };
        core::cmp::max(iterations, U256::one())
    }

    fn run_inner(input: &[u8]) -> Vec<u8> {
        let (base_len, exp_len, mod_len) = Self::parse_lengths(input);
        if mod_len.is_zero() {
            return Vec::new();
        }
        // Gas has been charged already; at that point absurd lengths priced
        // themselves out, so the conversions below cannot truncate.
        let base_len = base_len.as_usize();
        let exp_len = exp_len.as_usize();
        let mod_len = mod_len.as_usize();

        let base = BigUint::from_bytes_be(&utils::padded_slice(input, 96, base_len));
        let exponent = BigUint::from_bytes_be(&utils::padded_slice(input, 96 + base_len, exp_len));
        let modulus =
            BigUint::from_bytes_be(&utils::padded_slice(input, 96 + base_len + exp_len, mod_len));

        let computed = if modulus == BigUint::from(0u8) {
            Vec::new()
        } else {
            base.modpow(&exponent, &modulus).to_bytes_be()
        };

        // The result must be the same length as the input modulus; pad on the
        // left with zeros.
        let mut output = vec![0u8; mod_len];
        let start = mod_len - computed.len();
        output[start..].copy_from_slice(&computed);
        output
    }
}

impl<HF: HardFork> Default for ModExp<HF> {
    fn default() -> Self {
        Self::new()
    }
}

impl ModExp<Byzantium> {
    fn mult_complexity(x: U256) -> Result<U256, PrecompileError> {
        if x <= U256::from(64) {
            Ok(x * x)
        } else if x <= U256::from(1_024) {
            Ok(x * x / U256::from(4) + U256::from(96) * x - U256::from(3_072))
        } else {
            let (square, overflow) = x.overflowing_mul(x);
            if overflow {
                Err(PrecompileError::OutOfGas)
            } else {
                Ok(square / U256::from(16) + U256::from(480) * x - U256::from(199_680))
            }
        }
    }
}

impl Precompile for ModExp<Byzantium> {
    fn required_gas(input: &[u8]) -> Result<EthGas, PrecompileError> {
        let (base_len, exp_len, mod_len) = Self::parse_lengths(input);

        let mul = Self::mult_complexity(core::cmp::max(mod_len, base_len))?;
        let adjusted_exp_len = Self::iteration_count(exp_len, Self::exp_head(input, base_len), 8);
        let (gas, overflow) = mul.overflowing_mul(adjusted_exp_len);
        let gas = gas / U256::from(20);
        if overflow || gas > U256::from(u64::MAX) {
            Err(PrecompileError::OutOfGas)
        } else {
            Ok(EthGas::new(gas.as_u64()))
        }
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

        Ok(PrecompileOutput::new(cost, Self::run_inner(input)))
    }
}

impl ModExp<Berlin> {
    /// EIP-2565 multiplication complexity: `ceil(max_len / 8)^2`.
    fn mult_complexity(max_len: U256) -> U256 {
        let words = (max_len + U256::from(7)) / U256::from(8);
        words * words
    }
}

impl Precompile for ModExp<Berlin> {
    /// See: `https://eips.ethereum.org/EIPS/eip-2565`
    fn required_gas(input: &[u8]) -> Result<EthGas, PrecompileError> {
        let (base_len, exp_len, mod_len) = Self::parse_lengths(input);

        let mul = Self::mult_complexity(core::cmp::max(mod_len, base_len));
        let iterations = Self::iteration_count(exp_len, Self::exp_head(input, base_len), 8);
        let (gas, overflow) = mul.overflowing_mul(iterations);
        if overflow {
            return Err(PrecompileError::OutOfGas);
        }
        let gas = gas / U256::from(3);
        if gas > U256::from(u64::MAX) {
            return Err(PrecompileError::OutOfGas);
        }
        Ok(EthGas::new(core::cmp::max(200, gas.as_u64())))
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

        Ok(PrecompileOutput::new(cost, Self::run_inner(input)))
    }
}

impl ModExp<Osaka> {
    /// EIP-7883 multiplication complexity: 16 for small operands, otherwise
    /// `2 * ceil(max_len / 8)^2`.
    fn mult_complexity(max_len: U256) -> U256 {
        if max_len <= U256::from(32) {
            U256::from(16)
        } else {
            let words = (max_len + U256::from(7)) / U256::from(8);
            U256::from(2) * words * words
        }
    }
}

impl Precompile for ModExp<Osaka> {
    /// See: `https://eips.ethereum.org/EIPS/eip-7883`
    fn required_gas(input: &[u8]) -> Result<EthGas, PrecompileError> {
        let (base_len, exp_len, mod_len) = Self::parse_lengths(input);

        let mul = Self::mult_complexity(core::cmp::max(mod_len, base_len));
        let iterations = Self::iteration_count(exp_len, Self::exp_head(input, base_len), 16);
        let (gas, overflow) = mul.overflowing_mul(iterations);
        if overflow || gas > U256::from(u64::MAX) {
            return Err(PrecompileError::OutOfGas);
        }
        Ok(EthGas::new(core::cmp::max(500, gas.as_u64())))
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

        Ok(PrecompileOutput::new(cost, Self::run_inner(input)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::new_context;

    #[test]
    fn test_modexp_byzantium() {
        // 3^(secp256k1 n - 1) mod secp256k1 p == 1 by Fermat
        let input = hex::decode(
            "\
            0000000000000000000000000000000000000000000000000000000000000001\
            0000000000000000000000000000000000000000000000000000000000000020\
            0000000000000000000000000000000000000000000000000000000000000020\
            03\
            fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2e\
            fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f",
        )
        .unwrap();
        let output = ModExp::<Byzantium>::new()
            .run(&input, Some(EthGas::new(12_288)), &new_context(), false)
            .unwrap()
            .output;
        assert_eq!(U256::from_big_endian(&output), U256::one());
    }

    #[test]
    fn test_modexp_zero_base() {
        let input = hex::decode(
            "0000000000000000000000000000000000000000000000000000000000000000\
            0000000000000000000000000000000000000000000000000000000000000020\
            0000000000000000000000000000000000000000000000000000000000000020\
            fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2e\
            fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f",
        )
        .unwrap();
        let output = ModExp::<Byzantium>::new()
            .run(&input, Some(EthGas::new(12_288)), &new_context(), false)
            .unwrap()
            .output;
        assert_eq!(U256::from_big_endian(&output), U256::zero());
    }

    #[test]
    fn test_modexp_truncated_input_is_padded() {
        // The exponent and modulus run past the end of the calldata and are
        // implicitly zero-extended.
        let input = hex::decode(
            "0000000000000000000000000000000000000000000000000000000000000001\
            0000000000000000000000000000000000000000000000000000000000000002\
            0000000000000000000000000000000000000000000000000000000000000020\
            03\
            ffff\
            80",
        )
        .unwrap();
        let expected = hex::decode("3b01b01ac41f2d6e917c6d6a221ce793802469026d9ab7578fa2e79e4da6aaab")
            .unwrap();
        let output = ModExp::<Byzantium>::new()
            .run(&input, Some(EthGas::new(12_288)), &new_context(), false)
            .unwrap()
            .output;
        assert_eq!(output, expected);
    }

    #[test]
    fn test_berlin_gas_floor() {
        // The EIP-2565 test vector: 3^0xffff mod 2^256 - ... costs 1360 before
        // the floor; a trivial input costs the floor of 200.
        let trivial = [0u8; 96];
        assert_eq!(
            ModExp::<Berlin>::required_gas(&trivial).unwrap(),
            EthGas::new(200)
        );
    }

    #[test]
    fn test_berlin_vector_gas() {
        // First test vector of EIP-2565 (modexp_nagydani_1_square): 200 gas.
        let input = hex::decode(
            "0000000000000000000000000000000000000000000000000000000000000040\
            0000000000000000000000000000000000000000000000000000000000000001\
            0000000000000000000000000000000000000000000000000000000000000040\
            e09ad9675465c53a109fac66a445c91b292d2bb2c5268addb30cd82f80fcb0033ff97c80a5fc6f39193ae969c6ede6710a6b7ac27078a06d90ef1c72e5c85fb5\
            02\
            fcb51a0695d8f838b1ee009b3fbf66bda078cd64590202a864a8f3e8c4315c47",
        )
        .unwrap();
        assert_eq!(
            ModExp::<Berlin>::required_gas(&input).unwrap(),
            EthGas::new(200)
        );
    }

    #[test]
    fn test_osaka_gas_floor() {
        let trivial = [0u8; 96];
        assert_eq!(
            ModExp::<Osaka>::required_gas(&trivial).unwrap(),
            EthGas::new(500)
        );
    }

    #[test]
    fn test_zero_modulus_returns_empty() {
        let input = hex::decode(
            "0000000000000000000000000000000000000000000000000000000000000001\
            0000000000000000000000000000000000000000000000000000000000000001\
            0000000000000000000000000000000000000000000000000000000000000000\
            0302",
        )
        .unwrap();
        let output = ModExp::<Berlin>::new()
            .run(&input, Some(EthGas::new(200)), &new_context(), false)
            .unwrap()
            .output;
        assert!(output.is_empty());
    }
}
