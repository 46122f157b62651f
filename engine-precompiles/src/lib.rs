pub mod blake2;
pub mod bls12_381;
pub mod bn128;
pub mod hash;
pub mod identity;
pub mod kzg;
pub mod modexp;
pub mod secp256k1;
pub mod secp256r1;
mod utils;

use crate::blake2::Blake2F;
use crate::bls12_381::{
    BlsG1Add, BlsG1Msm, BlsG2Add, BlsG2Msm, BlsMapFp2ToG2, BlsMapFpToG1, BlsPairingCheck,
};
use crate::bn128::{Bn128Add, Bn128Mul, Bn128Pair};
use crate::hash::{RIPEMD160, SHA256};
use crate::identity::Identity;
use crate::kzg::KzgPointEvaluation;
use crate::modexp::ModExp;
use crate::secp256k1::ECRecover;
use crate::secp256r1::P256Verify;
use hearth_engine_types::types::{Address, EthGas};
use hearth_engine_types::{H160, U256};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Successful output of a precompile: the gas it charged and the bytes it
/// returned.
#[derive(Debug, Default)]
pub struct PrecompileOutput {
    pub cost: EthGas,
    pub output: Vec<u8>,
}

impl PrecompileOutput {
    #[must_use]
    pub fn new(cost: EthGas, output: Vec<u8>) -> Self {
        Self { cost, output }
    }
}

/// Failure of a precompile. Either way the caller loses the gas it supplied.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PrecompileError {
    OutOfGas,
    Other(Cow<'static, str>),
}

impl PrecompileError {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::OutOfGas => "ERR_OUT_OF_GAS",
            Self::Other(msg) => msg,
        }
    }
}

pub type EvmPrecompileResult = Result<PrecompileOutput, PrecompileError>;

/// The call context a precompile observes. Mirrors the context of an ordinary
/// message call frame.
#[derive(Debug, Clone)]
pub struct Context {
    pub address: H160,
    pub caller: H160,
    pub apparent_value: U256,
}

/// A precompiled function for use in the EVM.
pub trait Precompile {
    /// The required gas in order to run the precompile function.
    fn required_gas(input: &[u8]) -> Result<EthGas, PrecompileError>
    where
        Self: Sized;

    /// Runs the precompile function.
    fn run(
        &self,
        input: &[u8],
        target_gas: Option<EthGas>,
        context: &Context,
        is_static: bool,
    ) -> EvmPrecompileResult;
}

/// Hard fork marker.
pub trait HardFork {}

/// Homestead hard fork marker.
pub struct Homestead;

/// Byzantium hard fork marker.
pub struct Byzantium;

/// Istanbul hard fork marker.
pub struct Istanbul;

/// Berlin hard fork marker.
pub struct Berlin;

/// Osaka hard fork marker.
pub struct Osaka;

impl HardFork for Homestead {}

impl HardFork for Byzantium {}

impl HardFork for Istanbul {}

impl HardFork for Berlin {}

impl HardFork for Osaka {}

/// The set of precompiles active for one rule set.
pub struct Precompiles {
    generic_precompiles: BTreeMap<Address, Box<dyn Precompile>>,
}

impl Precompiles {
    pub fn new_frontier() -> Self {
        let addresses = vec![
            ECRecover::ADDRESS,
            SHA256::ADDRESS,
            RIPEMD160::ADDRESS,
            Identity::ADDRESS,
        ];
        let fun: Vec<Box<dyn Precompile>> = vec![
            Box::new(ECRecover),
            Box::new(SHA256),
            Box::new(RIPEMD160),
            Box::new(Identity),
        ];
        Self {
            generic_precompiles: addresses.into_iter().zip(fun).collect(),
        }
    }

    pub fn new_homestead() -> Self {
        // no precompile changes in Homestead
        Self::new_frontier()
    }

    pub fn new_byzantium() -> Self {
        let mut precompiles = Self::new_homestead();
        precompiles.insert(ModExp::<Byzantium>::ADDRESS, Box::new(ModExp::<Byzantium>::new()));
        precompiles.insert(Bn128Add::<Byzantium>::ADDRESS, Box::new(Bn128Add::<Byzantium>::new()));
        precompiles.insert(Bn128Mul::<Byzantium>::ADDRESS, Box::new(Bn128Mul::<Byzantium>::new()));
        precompiles.insert(Bn128Pair::<Byzantium>::ADDRESS, Box::new(Bn128Pair::<Byzantium>::new()));
        precompiles
    }

    pub fn new_istanbul() -> Self {
        let mut precompiles = Self::new_byzantium();
        precompiles.insert(Bn128Add::<Istanbul>::ADDRESS, Box::new(Bn128Add::<Istanbul>::new()));
        precompiles.insert(Bn128Mul::<Istanbul>::ADDRESS, Box::new(Bn128Mul::<Istanbul>::new()));
        precompiles.insert(Bn128Pair::<Istanbul>::ADDRESS, Box::new(Bn128Pair::<Istanbul>::new()));
        precompiles.insert(Blake2F::ADDRESS, Box::new(Blake2F));
        precompiles
    }

    pub fn new_berlin() -> Self {
        let mut precompiles = Self::new_istanbul();
        precompiles.insert(ModExp::<Berlin>::ADDRESS, Box::new(ModExp::<Berlin>::new()));
        precompiles
    }

    pub fn new_london() -> Self {
        // no precompile changes in London
        Self::new_berlin()
    }

    pub fn new_paris() -> Self {
        Self::new_london()
    }

    pub fn new_shanghai() -> Self {
        Self::new_paris()
    }

    pub fn new_cancun() -> Self {
        let mut precompiles = Self::new_shanghai();
        precompiles.insert(
            KzgPointEvaluation::ADDRESS,
            Box::new(KzgPointEvaluation),
        );
        precompiles
    }

    pub fn new_prague() -> Self {
        let mut precompiles = Self::new_cancun();
        precompiles.insert(BlsG1Add::ADDRESS, Box::new(BlsG1Add));
        precompiles.insert(BlsG1Msm::ADDRESS, Box::new(BlsG1Msm));
        precompiles.insert(BlsG2Add::ADDRESS, Box::new(BlsG2Add));
        precompiles.insert(BlsG2Msm::ADDRESS, Box::new(BlsG2Msm));
        precompiles.insert(BlsPairingCheck::ADDRESS, Box::new(BlsPairingCheck));
        precompiles.insert(BlsMapFpToG1::ADDRESS, Box::new(BlsMapFpToG1));
        precompiles.insert(BlsMapFp2ToG2::ADDRESS, Box::new(BlsMapFp2ToG2));
        precompiles
    }

    pub fn new_osaka() -> Self {
        let mut precompiles = Self::new_prague();
        precompiles.insert(ModExp::<Osaka>::ADDRESS, Box::new(ModExp::<Osaka>::new()));
        precompiles.insert(P256Verify::ADDRESS, Box::new(P256Verify));
        precompiles
    }

    #[must_use]
    pub fn get(&self, address: &Address) -> Option<&dyn Precompile> {
        self.generic_precompiles.get(address).map(Box::as_ref)
    }

    #[must_use]
    pub fn contains(&self, address: &Address) -> bool {
        self.generic_precompiles.contains_key(address)
    }

    /// Addresses of every active precompile, low to high.
    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.generic_precompiles.keys()
    }

    fn insert(&mut self, address: Address, precompile: Box<dyn Precompile>) {
        self.generic_precompiles.insert(address, precompile);
    }
}

/// fn for making an address by concatenating the bytes from two given numbers.
/// Note that 32 + 128 = 160 = 20 bytes (the length of an address). This function
/// is used as a convenience for specifying the addresses of the various
/// precompiles.
#[must_use]
pub const fn make_address(x: u32, y: u128) -> Address {
    let x_bytes = x.to_be_bytes();
    let y_bytes = y.to_be_bytes();
    let mut bytes = [0u8; 20];
    let mut i = 0;
    while i < 4 {
        bytes[i] = x_bytes[i];
        i += 1;
    }
    while i < 20 {
        bytes[i] = y_bytes[i - 4];
        i += 1;
    }
    Address::from_array(bytes)
}
