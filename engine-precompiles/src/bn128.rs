use crate::{
    Byzantium, Context, EvmPrecompileResult, HardFork, Istanbul, Precompile, PrecompileError,
    PrecompileOutput,
};
use core::marker::PhantomData;
use hearth_engine_types::types::{Address, EthGas};
use std::borrow::Cow::Borrowed;

/// bn128 costs.
mod costs {
    use hearth_engine_types::types::EthGas;

    /// Cost of the Byzantium alt_bn128_add operation.
    pub(super) const BYZANTIUM_ADD: EthGas = EthGas::new(500);

    /// Cost of the Byzantium alt_bn128_mul operation.
    pub(super) const BYZANTIUM_MUL: EthGas = EthGas::new(40_000);

    /// Cost of the alt_bn128_pair per point.
    pub(super) const BYZANTIUM_PAIR_PER_POINT: EthGas = EthGas::new(80_000);

    /// Cost of the alt_bn128_pair operation.
    pub(super) const BYZANTIUM_PAIR_BASE: EthGas = EthGas::new(100_000);

    /// Cost of the Istanbul alt_bn128_add operation.
    pub(super) const ISTANBUL_ADD: EthGas = EthGas::new(150);

    /// Cost of the Istanbul alt_bn128_mul operation.
    pub(super) const ISTANBUL_MUL: EthGas = EthGas::new(6_000);

    /// Cost of the Istanbul alt_bn128_pair per point.
    pub(super) const ISTANBUL_PAIR_PER_POINT: EthGas = EthGas::new(34_000);

    /// Cost of the Istanbul alt_bn128_pair operation.
    pub(super) const ISTANBUL_PAIR_BASE: EthGas = EthGas::new(45_000);
}

/// bn128 constants.
mod consts {
    /// Input length for the add operation.
    pub(super) const ADD_INPUT_LEN: usize = 128;

    /// Input length for the multiplication operation.
    pub(super) const MUL_INPUT_LEN: usize = 128;

    /// Pair element length.
    pub(super) const PAIR_ELEMENT_LEN: usize = 192;
}

/// Reads the `x` and `y` coordinates of a G1 point from `input` at `pos`.
fn read_point(input: &[u8], pos: usize) -> Result<bn::G1, PrecompileError> {
    use bn::{AffineG1, Fq, Group, G1};

    let px = Fq::from_slice(&input[pos..(pos + 32)])
        .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_INVALID_X")))?;
    let py = Fq::from_slice(&input[(pos + 32)..(pos + 64)])
        .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_INVALID_Y")))?;

    Ok(if px == Fq::zero() && py == Fq::zero() {
        G1::zero()
    } else {
        AffineG1::new(px, py)
            .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_INVALID_POINT")))?
            .into()
    })
}

fn encode_point(point: bn::G1) -> Result<Vec<u8>, PrecompileError> {
    use bn::AffineG1;

    let mut output = [0u8; 64];
    if let Some(affine) = AffineG1::from_jacobian(point) {
        affine
            .x()
            .to_big_endian(&mut output[0..32])
            .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_SERIALIZE")))?;
        affine
            .y()
            .to_big_endian(&mut output[32..64])
            .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_SERIALIZE")))?;
    }
    Ok(output.to_vec())
}

/// Takes in two points on the elliptic curve alt_bn128 and calculates the sum
/// of them.
///
/// See: `https://eips.ethereum.org/EIPS/eip-196`
/// See: `https://etherscan.io/address/0000000000000000000000000000000000000006`
pub struct Bn128Add<HF: HardFork>(PhantomData<HF>);

impl<HF: HardFork> Bn128Add<HF> {
    pub const ADDRESS: Address = super::make_address(0, 6);

    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }

    fn run_inner(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
        let mut input = input.to_vec();
        input.resize(consts::ADD_INPUT_LEN, 0);

        let p1 = read_point(&input, 0)?;
        let p2 = read_point(&input, 64)?;

        encode_point(p1 + p2)
    }
}

impl<HF: HardFork> Default for Bn128Add<HF> {
    fn default() -> Self {
        Self::new()
    }
}

impl Precompile for Bn128Add<Byzantium> {
    fn required_gas(_input: &[u8]) -> Result<EthGas, PrecompileError> {
        Ok(costs::BYZANTIUM_ADD)
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

        let output = Self::run_inner(input)?;
        Ok(PrecompileOutput::new(cost, output))
    }
}

impl Precompile for Bn128Add<Istanbul> {
    fn required_gas(_input: &[u8]) -> Result<EthGas, PrecompileError> {
        Ok(costs::ISTANBUL_ADD)
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

        let output = Self::run_inner(input)?;
        Ok(PrecompileOutput::new(cost, output))
    }
}

/// Multiplies a point on the elliptic curve alt_bn128 by a scalar.
///
/// See: `https://eips.ethereum.org/EIPS/eip-196`
/// See: `https://etherscan.io/address/0000000000000000000000000000000000000007`
pub struct Bn128Mul<HF: HardFork>(PhantomData<HF>);

impl<HF: HardFork> Bn128Mul<HF> {
    pub const ADDRESS: Address = super::make_address(0, 7);

    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }

    fn run_inner(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
        let mut input = input.to_vec();
        input.resize(consts::MUL_INPUT_LEN, 0);

        let p = read_point(&input, 0)?;
        let fr = bn::Fr::from_slice(&input[64..96])
            .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_INVALID_FE")))?;

        encode_point(p * fr)
    }
}

impl<HF: HardFork> Default for Bn128Mul<HF> {
    fn default() -> Self {
        Self::new()
    }
}

impl Precompile for Bn128Mul<Byzantium> {
    fn required_gas(_input: &[u8]) -> Result<EthGas, PrecompileError> {
        Ok(costs::BYZANTIUM_MUL)
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

        let output = Self::run_inner(input)?;
        Ok(PrecompileOutput::new(cost, output))
    }
}

impl Precompile for Bn128Mul<Istanbul> {
    fn required_gas(_input: &[u8]) -> Result<EthGas, PrecompileError> {
        Ok(costs::ISTANBUL_MUL)
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

        let output = Self::run_inner(input)?;
        Ok(PrecompileOutput::new(cost, output))
    }
}

/// Computes an elliptic curve pairing over alt_bn128 points.
///
/// See: `https://eips.ethereum.org/EIPS/eip-197`
/// See: `https://etherscan.io/address/0000000000000000000000000000000000000008`
pub struct Bn128Pair<HF: HardFork>(PhantomData<HF>);

impl<HF: HardFork> Bn128Pair<HF> {
    pub const ADDRESS: Address = super::make_address(0, 8);

    #[must_use]
    pub fn new() -> Self {
        Self(PhantomData)
    }

    fn run_inner(input: &[u8]) -> Result<Vec<u8>, PrecompileError> {
        use bn::{AffineG1, AffineG2, Fq, Fq2, Group, Gt, G1, G2};

        if input.len() % consts::PAIR_ELEMENT_LEN != 0 {
            return Err(PrecompileError::Other(Borrowed("ERR_BN128_INVALID_LEN")));
        }

        let success = if input.is_empty() {
            true
        } else {
            let elements = input.len() / consts::PAIR_ELEMENT_LEN;
            let mut vals = Vec::with_capacity(elements);

            for idx in 0..elements {
                let element = &input[idx * consts::PAIR_ELEMENT_LEN..];
                let ax = Fq::from_slice(&element[0..32])
                    .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_INVALID_AX")))?;
                let ay = Fq::from_slice(&element[32..64])
                    .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_INVALID_AY")))?;
                // The G2 coordinates arrive imaginary-part first.
                let bay = Fq::from_slice(&element[64..96])
                    .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_INVALID_B_AY")))?;
                let bax = Fq::from_slice(&element[96..128])
                    .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_INVALID_B_AX")))?;
                let bby = Fq::from_slice(&element[128..160])
                    .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_INVALID_B_BY")))?;
                let bbx = Fq::from_slice(&element[160..192])
                    .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_INVALID_B_BX")))?;

                let a = if ax == Fq::zero() && ay == Fq::zero() {
                    G1::zero()
                } else {
                    G1::from(
                        AffineG1::new(ax, ay)
                            .map_err(|_e| PrecompileError::Other(Borrowed("ERR_BN128_INVALID_A")))?,
                    )
                };
                let b = {
                    let ba = Fq2::new(bax, bay);
                    let bb = Fq2::new(bbx, bby);

                    if ba.is_zero() && bb.is_zero() {
                        G2::zero()
                    } else {
                        G2::from(
                            AffineG2::new(ba, bb).map_err(|_e| {
                                PrecompileError::Other(Borrowed("ERR_BN128_INVALID_B"))
                            })?,
                        )
                    }
                };
                vals.push((a, b));
            }

            bn::pairing_batch(&vals) == Gt::one()
        };

        let mut output = [0u8; 32];
        if success {
            output[31] = 1;
        }
        Ok(output.to_vec())
    }
}

impl<HF: HardFork> Default for Bn128Pair<HF> {
    fn default() -> Self {
        Self::new()
    }
}

impl Precompile for Bn128Pair<Byzantium> {
    fn required_gas(input: &[u8]) -> Result<EthGas, PrecompileError> {
        let pairs = u64::try_from(input.len() / consts::PAIR_ELEMENT_LEN)
            .map_err(crate::utils::err_usize_conv)?;
        Ok(costs::BYZANTIUM_PAIR_PER_POINT * pairs + costs::BYZANTIUM_PAIR_BASE)
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

        let output = Self::run_inner(input)?;
        Ok(PrecompileOutput::new(cost, output))
    }
}

impl Precompile for Bn128Pair<Istanbul> {
    fn required_gas(input: &[u8]) -> Result<EthGas, PrecompileError> {
        let pairs = u64::try_from(input.len() / consts::PAIR_ELEMENT_LEN)
            .map_err(crate::utils::err_usize_conv)?;
        Ok(costs::ISTANBUL_PAIR_PER_POINT * pairs + costs::ISTANBUL_PAIR_BASE)
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

        let output = Self::run_inner(input)?;
        Ok(PrecompileOutput::new(cost, output))
    }
}
