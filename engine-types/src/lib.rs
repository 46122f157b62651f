pub mod account;
pub mod bloom;
pub mod log;
pub mod types;

pub use primitive_types::{H160, H256, U256};

use sha3::{Digest, Keccak256};

/// Keccak-256 digest of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> H256 {
    H256::from_slice(Keccak256::digest(data).as_slice())
}

/// Builds an `H256` out of two big-endian `u128` halves. Usable in `const`
/// positions, which `H256::from_slice` is not.
#[must_use]
pub const fn make_h256(x: u128, y: u128) -> H256 {
    let x_bytes = x.to_be_bytes();
    let y_bytes = y.to_be_bytes();
    let mut out = [0u8; 32];
    let mut i = 0;
    while i < 16 {
        out[i] = x_bytes[i];
        out[16 + i] = y_bytes[i];
        i += 1;
    }
    H256(out)
}

/// Big-endian bytes of a `U256`.
#[must_use]
pub fn u256_to_arr(value: &U256) -> [u8; 32] {
    let mut result = [0u8; 32];
    value.to_big_endian(&mut result);
    result
}
