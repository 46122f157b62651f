use crate::{keccak256, H160, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{Deserialize, Serialize};

/// Base Eth address type.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(H160);

impl Address {
    /// Construct an `Address` from an `H160`.
    #[must_use]
    pub const fn new(val: H160) -> Self {
        Self(val)
    }

    /// Get the raw `H160` data.
    #[must_use]
    pub const fn raw(self) -> H160 {
        self.0
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(H160::zero())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    #[must_use]
    pub const fn from_array(array: [u8; 20]) -> Self {
        Self(H160(array))
    }

    pub fn try_from_slice(raw_addr: &[u8]) -> Result<Self, AddressError> {
        if raw_addr.len() != 20 {
            return Err(AddressError::IncorrectLength);
        }
        Ok(Self(H160::from_slice(raw_addr)))
    }

    /// Hex encoding of the address, without the `0x` prefix.
    #[must_use]
    pub fn encode(&self) -> String {
        hex::encode(self.0.as_bytes())
    }

    pub fn decode(address: &str) -> Result<Self, AddressError> {
        let bytes = hex::decode(address).map_err(|_| AddressError::FailedDecodeHex)?;
        Self::try_from_slice(&bytes)
    }

    /// The address a `CREATE` at `sender` with `nonce` deploys to:
    /// rightmost 20 bytes of `keccak(rlp([sender, nonce]))`.
    #[must_use]
    pub fn from_create(sender: &Self, nonce: U256) -> Self {
        let mut stream = RlpStream::new_list(2);
        stream.append(&sender.0);
        stream.append(&nonce);
        let hash = keccak256(stream.as_raw());
        Self(H160::from_slice(&hash[12..]))
    }

    /// The address a `CREATE2` deploys to:
    /// rightmost 20 bytes of `keccak(0xff ++ sender ++ salt ++ keccak(init_code))`.
    #[must_use]
    pub fn from_create2(sender: &Self, salt: &crate::H256, init_code_hash: &crate::H256) -> Self {
        let mut buffer = [0u8; 1 + 20 + 32 + 32];
        buffer[0] = 0xff;
        buffer[1..21].copy_from_slice(sender.as_bytes());
        buffer[21..53].copy_from_slice(salt.as_bytes());
        buffer[53..85].copy_from_slice(init_code_hash.as_bytes());
        Self(H160::from_slice(&keccak256(&buffer)[12..]))
    }
}

impl From<Address> for H160 {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl From<H160> for Address {
    fn from(raw: H160) -> Self {
        Self(raw)
    }
}

impl Encodable for Address {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append(&self.0);
    }
}

impl Decodable for Address {
    fn decode(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        let raw: H160 = rlp.as_val()?;
        Ok(Self(raw))
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum AddressError {
    FailedDecodeHex,
    IncorrectLength,
}

impl AddressError {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FailedDecodeHex => "ERR_FAILED_DECODE_HEX",
            Self::IncorrectLength => "ERR_INCORRECT_ADDRESS_LENGTH",
        }
    }
}

impl AsRef<[u8]> for AddressError {
    fn as_ref(&self) -> &[u8] {
        self.as_str().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::H256;

    #[test]
    fn test_address_hex_round_trip() {
        let addr = Address::decode("096de9c2b8a5b8c22cee3289b101f6960d68e51e").unwrap();
        assert_eq!(addr.encode(), "096de9c2b8a5b8c22cee3289b101f6960d68e51e");
    }

    #[test]
    fn test_wrong_address_length() {
        assert_eq!(
            Address::try_from_slice(&[0u8; 19]),
            Err(AddressError::IncorrectLength)
        );
        assert_eq!(
            Address::try_from_slice(&[0u8; 21]),
            Err(AddressError::IncorrectLength)
        );
    }

    #[test]
    fn test_create_address() {
        // First contract deployed by 0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0 (nonce 0)
        // is the canonical CryptoKitties-era example pair.
        let sender = Address::decode("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        let derived = Address::from_create(&sender, U256::zero());
        assert_eq!(
            derived,
            Address::decode("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d").unwrap()
        );
    }

    #[test]
    fn test_create2_address() {
        // Example 0 from EIP-1014.
        let sender = Address::zero();
        let salt = H256::zero();
        let init_code_hash = keccak256(&hex::decode("00").unwrap());
        let derived = Address::from_create2(&sender, &salt, &init_code_hash);
        assert_eq!(
            derived,
            Address::decode("4d1a2e2bb4f88f0250f26ffff098b0b30b26bf38").unwrap()
        );
    }
}
