use eip_2930::AccessTuple;
use eip_7702::Authorization;
use hearth_engine_evm::Config;
use hearth_engine_types::types::{Address, Wei};
use hearth_engine_types::{H160, H256, U256};
use rlp::{Decodable, DecoderError, Rlp};

pub mod eip_1559;
pub mod eip_2930;
pub mod eip_4844;
pub mod eip_7702;
pub mod legacy;

/// Typed Transaction Envelope (see <https://eips.ethereum.org/EIPS/eip-2718>)
#[derive(Debug, Eq, PartialEq, Clone)]
pub enum EthTransactionKind {
    Legacy(legacy::LegacyEthSignedTransaction),
    Eip2930(eip_2930::SignedTransaction2930),
    Eip1559(eip_1559::SignedTransaction1559),
    Eip4844(eip_4844::SignedTransaction4844),
    Eip7702(eip_7702::SignedTransaction7702),
}

impl EthTransactionKind {
    /// The EIP-2718 type byte; `None` for legacy RLP transactions.
    #[must_use]
    pub fn type_byte(&self) -> Option<u8> {
        match self {
            Self::Legacy(_) => None,
            Self::Eip2930(_) => Some(eip_2930::TYPE_BYTE),
            Self::Eip1559(_) => Some(eip_1559::TYPE_BYTE),
            Self::Eip4844(_) => Some(eip_4844::TYPE_BYTE),
            Self::Eip7702(_) => Some(eip_7702::TYPE_BYTE),
        }
    }
}

impl TryFrom<&[u8]> for EthTransactionKind {
    type Error = ParseTransactionError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let first = *bytes.first().ok_or(ParseTransactionError::EmptyInput)?;
        if first == eip_2930::TYPE_BYTE {
            Ok(Self::Eip2930(eip_2930::SignedTransaction2930::decode(
                &Rlp::new(&bytes[1..]),
            )?))
        } else if first == eip_1559::TYPE_BYTE {
            Ok(Self::Eip1559(eip_1559::SignedTransaction1559::decode(
                &Rlp::new(&bytes[1..]),
            )?))
        } else if first == eip_4844::TYPE_BYTE {
            Ok(Self::Eip4844(eip_4844::SignedTransaction4844::decode(
                &Rlp::new(&bytes[1..]),
            )?))
        } else if first == eip_7702::TYPE_BYTE {
            Ok(Self::Eip7702(eip_7702::SignedTransaction7702::decode(
                &Rlp::new(&bytes[1..]),
            )?))
        } else if first <= 0x7f {
            Err(ParseTransactionError::UnknownTransactionType)
        } else if first == 0xff {
            Err(ParseTransactionError::ReservedSentinel)
        } else {
            let legacy = legacy::LegacyEthSignedTransaction::decode(&Rlp::new(bytes))?;
            Ok(Self::Legacy(legacy))
        }
    }
}

impl<'a> From<&'a EthTransactionKind> for Vec<u8> {
    fn from(tx: &'a EthTransactionKind) -> Self {
        let mut stream = rlp::RlpStream::new();
        match &tx {
            EthTransactionKind::Legacy(tx) => {
                stream.append(tx);
            }
            EthTransactionKind::Eip2930(tx) => {
                stream.append(&eip_2930::TYPE_BYTE);
                stream.append(tx);
            }
            EthTransactionKind::Eip1559(tx) => {
                stream.append(&eip_1559::TYPE_BYTE);
                stream.append(tx);
            }
            EthTransactionKind::Eip4844(tx) => {
                stream.append(&eip_4844::TYPE_BYTE);
                stream.append(tx);
            }
            EthTransactionKind::Eip7702(tx) => {
                stream.append(&eip_7702::TYPE_BYTE);
                stream.append(tx);
            }
        }
        stream.out().to_vec()
    }
}

/// A normalized Ethereum transaction which can be created from any envelope
/// variant.
#[derive(Debug, Clone)]
pub struct NormalizedEthTransaction {
    pub address: Address,
    pub chain_id: Option<u64>,
    pub nonce: U256,
    pub gas_limit: U256,
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
    pub to: Option<Address>,
    pub value: Wei,
    pub data: Vec<u8>,
    pub access_list: Vec<AccessTuple>,
    pub max_fee_per_blob_gas: Option<U256>,
    pub blob_versioned_hashes: Vec<H256>,
    pub authorization_list: Vec<Authorization>,
}

impl TryFrom<EthTransactionKind> for NormalizedEthTransaction {
    type Error = Error;

    fn try_from(kind: EthTransactionKind) -> Result<Self, Self::Error> {
        use EthTransactionKind::{Eip1559, Eip2930, Eip4844, Eip7702, Legacy};
        Ok(match kind {
            Legacy(tx) => Self {
                address: tx.sender()?,
                chain_id: tx.chain_id(),
                nonce: tx.transaction.nonce,
                gas_limit: tx.transaction.gas_limit,
                max_priority_fee_per_gas: tx.transaction.gas_price,
                max_fee_per_gas: tx.transaction.gas_price,
                to: tx.transaction.to,
                value: tx.transaction.value,
                data: tx.transaction.data,
                access_list: vec![],
                max_fee_per_blob_gas: None,
                blob_versioned_hashes: vec![],
                authorization_list: vec![],
            },
            Eip2930(tx) => Self {
                address: tx.sender()?,
                chain_id: Some(tx.transaction.chain_id),
                nonce: tx.transaction.nonce,
                gas_limit: tx.transaction.gas_limit,
                max_priority_fee_per_gas: tx.transaction.gas_price,
                max_fee_per_gas: tx.transaction.gas_price,
                to: tx.transaction.to,
                value: tx.transaction.value,
                data: tx.transaction.data,
                access_list: tx.transaction.access_list,
                max_fee_per_blob_gas: None,
                blob_versioned_hashes: vec![],
                authorization_list: vec![],
            },
            Eip1559(tx) => Self {
                address: tx.sender()?,
                chain_id: Some(tx.transaction.chain_id),
                nonce: tx.transaction.nonce,
                gas_limit: tx.transaction.gas_limit,
                max_priority_fee_per_gas: tx.transaction.max_priority_fee_per_gas,
                max_fee_per_gas: tx.transaction.max_fee_per_gas,
                to: tx.transaction.to,
                value: tx.transaction.value,
                data: tx.transaction.data,
                access_list: tx.transaction.access_list,
                max_fee_per_blob_gas: None,
                blob_versioned_hashes: vec![],
                authorization_list: vec![],
            },
            Eip4844(tx) => Self {
                address: tx.sender()?,
                chain_id: Some(tx.transaction.chain_id),
                nonce: tx.transaction.nonce,
                gas_limit: tx.transaction.gas_limit,
                max_priority_fee_per_gas: tx.transaction.max_priority_fee_per_gas,
                max_fee_per_gas: tx.transaction.max_fee_per_gas,
                to: Some(tx.transaction.to),
                value: tx.transaction.value,
                data: tx.transaction.data,
                access_list: tx.transaction.access_list,
                max_fee_per_blob_gas: Some(tx.transaction.max_fee_per_blob_gas),
                blob_versioned_hashes: tx.transaction.blob_versioned_hashes,
                authorization_list: vec![],
            },
            Eip7702(tx) => Self {
                address: tx.sender()?,
                chain_id: Some(tx.transaction.chain_id),
                nonce: tx.transaction.nonce,
                gas_limit: tx.transaction.gas_limit,
                max_priority_fee_per_gas: tx.transaction.max_priority_fee_per_gas,
                max_fee_per_gas: tx.transaction.max_fee_per_gas,
                to: Some(tx.transaction.to),
                value: tx.transaction.value,
                data: tx.transaction.data,
                access_list: tx.transaction.access_list,
                max_fee_per_blob_gas: None,
                blob_versioned_hashes: vec![],
                authorization_list: tx.transaction.authorization_list,
            },
        })
    }
}

impl NormalizedEthTransaction {
    /// The minimum gas a transaction pays before any execution.
    #[must_use]
    pub fn intrinsic_gas(&self, config: &Config) -> Option<u64> {
        let is_contract_creation = self.to.is_none();

        let base_gas = if is_contract_creation {
            config.gas_transaction_create
        } else {
            config.gas_transaction_call
        };

        let num_zero_bytes = self.data.iter().filter(|b| **b == 0).count();
        let num_non_zero_bytes = self.data.len() - num_zero_bytes;

        let gas_zero_bytes = config
            .gas_transaction_zero_data
            .checked_mul(num_zero_bytes as u64)?;
        let gas_non_zero_bytes = config
            .gas_transaction_non_zero_data
            .checked_mul(num_non_zero_bytes as u64)?;

        let gas_access_list_address = config
            .gas_access_list_address
            .checked_mul(self.access_list.len() as u64)?;
        let gas_access_list_storage = config.gas_access_list_storage_key.checked_mul(
            self.access_list
                .iter()
                .map(|a| a.storage_keys.len() as u64)
                .sum(),
        )?;

        let gas_init_code = if is_contract_creation {
            config.gas_initcode_word * (self.data.len() as u64).div_ceil(32)
        } else {
            0
        };

        let gas_authorizations = config
            .gas_per_empty_account_authorization
            .checked_mul(self.authorization_list.len() as u64)?;

        base_gas
            .checked_add(gas_zero_bytes)
            .and_then(|gas| gas.checked_add(gas_non_zero_bytes))
            .and_then(|gas| gas.checked_add(gas_access_list_address))
            .and_then(|gas| gas.checked_add(gas_access_list_storage))
            .and_then(|gas| gas.checked_add(gas_init_code))
            .and_then(|gas| gas.checked_add(gas_authorizations))
    }

    /// The EIP-7623 floor: gas_used may never fall below
    /// `21000 + tokens * cost`, where a non-zero calldata byte counts four
    /// tokens.
    #[must_use]
    pub fn floor_data_gas(&self, config: &Config) -> Option<u64> {
        if !config.has_floor_data_gas {
            return Some(0);
        }
        let num_zero_bytes = self.data.iter().filter(|b| **b == 0).count() as u64;
        let num_non_zero_bytes = self.data.len() as u64 - num_zero_bytes;
        let tokens = num_zero_bytes.checked_add(num_non_zero_bytes.checked_mul(4)?)?;
        config
            .gas_transaction_call
            .checked_add(tokens.checked_mul(config.gas_floor_token_cost)?)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Error {
    InvalidV,
    EcRecover,
}

impl Error {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidV => "ERR_INVALID_V",
            Self::EcRecover => "ERR_ECRECOVER",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ParseTransactionError {
    UnknownTransactionType,
    // Per the EIP-2718 spec 0xff is a reserved value
    ReservedSentinel,
    EmptyInput,
    RlpDecodeError(DecoderError),
}

impl ParseTransactionError {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownTransactionType => "ERR_UNKNOWN_TX_TYPE",
            Self::ReservedSentinel => "ERR_RESERVED_LEADING_TX_BYTE",
            Self::EmptyInput => "ERR_EMPTY_TX_INPUT",
            Self::RlpDecodeError(_) => "ERR_TX_RLP_DECODE",
        }
    }
}

impl From<DecoderError> for ParseTransactionError {
    fn from(e: DecoderError) -> Self {
        Self::RlpDecodeError(e)
    }
}

impl AsRef<[u8]> for ParseTransactionError {
    fn as_ref(&self) -> &[u8] {
        self.as_str().as_bytes()
    }
}

fn rlp_extract_to(rlp: &Rlp<'_>, index: usize) -> Result<Option<Address>, DecoderError> {
    let value = rlp.at(index)?;
    if value.is_empty() {
        if value.is_data() {
            Ok(None)
        } else {
            Err(DecoderError::RlpExpectedToBeData)
        }
    } else {
        let v: H160 = value.as_val()?;
        Ok(Some(Address::new(v)))
    }
}

fn vrs_to_arr(v: u8, r: U256, s: U256) -> [u8; 65] {
    let mut result = [0u8; 65]; // (r, s, v), typed (uint256, uint256, uint8)
    r.to_big_endian(&mut result[0..32]);
    s.to_big_endian(&mut result[32..64]);
    result[64] = v;
    result
}

/// Half the secp256k1 group order; signatures with `s` above it are rejected
/// from Homestead on (EIP-2).
#[must_use]
pub fn secp256k1_half_n() -> U256 {
    U256::from_big_endian(
        &hex_const::<32>("7fffffffffffffffffffffffffffffff5d576e7357a4501ddfe92f46681b20a0"),
    )
}

fn hex_const<const N: usize>(s: &str) -> [u8; N] {
    let mut out = [0u8; N];
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < N {
        let hi = hex_digit(bytes[2 * i]);
        let lo = hex_digit(bytes[2 * i + 1]);
        out[i] = hi * 16 + lo;
        i += 1;
    }
    out
}

const fn hex_digit(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => c - b'0',
        b'a'..=b'f' => c - b'a' + 10,
        b'A'..=b'F' => c - b'A' + 10,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_byte_rejected() {
        assert_eq!(
            EthTransactionKind::try_from([0x05u8, 0x00].as_slice()),
            Err(ParseTransactionError::UnknownTransactionType)
        );
        assert_eq!(
            EthTransactionKind::try_from([0xffu8].as_slice()),
            Err(ParseTransactionError::ReservedSentinel)
        );
        assert_eq!(
            EthTransactionKind::try_from(&[] as &[u8]),
            Err(ParseTransactionError::EmptyInput)
        );
    }

    #[test]
    fn test_intrinsic_gas_call_with_data() {
        let tx = NormalizedEthTransaction {
            address: Address::zero(),
            chain_id: Some(1),
            nonce: U256::zero(),
            gas_limit: U256::from(100_000),
            max_priority_fee_per_gas: U256::zero(),
            max_fee_per_gas: U256::zero(),
            to: Some(Address::zero()),
            value: Wei::zero(),
            data: vec![0, 0, 1, 2],
            access_list: vec![],
            max_fee_per_blob_gas: None,
            blob_versioned_hashes: vec![],
            authorization_list: vec![],
        };
        // Istanbul: 21000 + 2*4 + 2*16.
        assert_eq!(
            tx.intrinsic_gas(&Config::istanbul()),
            Some(21_000 + 8 + 32)
        );
        // Homestead prices non-zero bytes at 68.
        assert_eq!(
            tx.intrinsic_gas(&Config::homestead()),
            Some(21_000 + 8 + 136)
        );
    }

    #[test]
    fn test_intrinsic_gas_create_shanghai() {
        let tx = NormalizedEthTransaction {
            address: Address::zero(),
            chain_id: Some(1),
            nonce: U256::zero(),
            gas_limit: U256::from(100_000),
            max_priority_fee_per_gas: U256::zero(),
            max_fee_per_gas: U256::zero(),
            to: None,
            value: Wei::zero(),
            data: vec![1u8; 33],
            access_list: vec![],
            max_fee_per_blob_gas: None,
            blob_versioned_hashes: vec![],
            authorization_list: vec![],
        };
        // 53000 + 33*16 + 2 words of init code.
        assert_eq!(
            tx.intrinsic_gas(&Config::shanghai()),
            Some(53_000 + 33 * 16 + 2 * 2)
        );
    }

    #[test]
    fn test_floor_data_gas() {
        let tx = NormalizedEthTransaction {
            address: Address::zero(),
            chain_id: Some(1),
            nonce: U256::zero(),
            gas_limit: U256::from(100_000),
            max_priority_fee_per_gas: U256::zero(),
            max_fee_per_gas: U256::zero(),
            to: Some(Address::zero()),
            value: Wei::zero(),
            data: vec![0, 1],
            access_list: vec![],
            max_fee_per_blob_gas: None,
            blob_versioned_hashes: vec![],
            authorization_list: vec![],
        };
        assert_eq!(tx.floor_data_gas(&Config::cancun()), Some(0));
        // Prague: 21000 + (1 + 4) * 10.
        assert_eq!(tx.floor_data_gas(&Config::prague()), Some(21_050));
    }

    #[test]
    fn test_half_n_constant() {
        // 2 * half_n + 1 == n
        let n = U256::from_big_endian(
            &hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141")
                .unwrap(),
        );
        assert_eq!(secp256k1_half_n() * U256::from(2) + U256::one(), n);
    }
}
