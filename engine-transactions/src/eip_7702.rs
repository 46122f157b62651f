use crate::eip_2930::AccessTuple;
use crate::Error;
use hearth_engine_precompiles::secp256k1::ecrecover;
use hearth_engine_types::types::{Address, Wei};
use hearth_engine_types::{keccak256, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// Type indicator (per EIP-7702) for set-code transactions
pub const TYPE_BYTE: u8 = 0x04;

/// Domain separator prepended to the signed authorization payload.
pub const MAGIC: u8 = 0x05;

pub use hearth_engine_evm::runtime::{delegation_target, DELEGATION_PREFIX};

/// One signed authorization: "set my code to a delegation to `address`".
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Authorization {
    pub chain_id: U256,
    pub address: Address,
    pub nonce: u64,
    pub parity: u8,
    pub r: U256,
    pub s: U256,
}

impl Authorization {
    /// Recovers the authority that signed this tuple:
    /// `keccak(MAGIC ++ rlp([chain_id, address, nonce]))`.
    pub fn authority(&self) -> Result<Address, Error> {
        let mut payload = vec![MAGIC];
        let mut stream = RlpStream::new_list(3);
        stream.append(&self.chain_id);
        stream.append(&self.address);
        stream.append(&self.nonce);
        payload.extend_from_slice(stream.as_raw());
        let message_hash = keccak256(&payload);
        ecrecover(
            message_hash,
            &super::vrs_to_arr(self.parity, self.r, self.s),
        )
        .map_err(|_e| Error::EcRecover)
    }

    /// The code a successful authorization installs on the authority.
    #[must_use]
    pub fn delegation_designator(&self) -> Vec<u8> {
        let mut code = DELEGATION_PREFIX.to_vec();
        code.extend_from_slice(self.address.as_bytes());
        code
    }
}

impl Encodable for Authorization {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(6);
        s.append(&self.chain_id);
        s.append(&self.address);
        s.append(&self.nonce);
        s.append(&self.parity);
        s.append(&self.r);
        s.append(&self.s);
    }
}

impl Decodable for Authorization {
    fn decode(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        if rlp.item_count() != Ok(6) {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            chain_id: rlp.val_at(0)?,
            address: rlp.val_at(1)?,
            nonce: rlp.val_at(2)?,
            parity: rlp.val_at(3)?,
            r: rlp.val_at(4)?,
            s: rlp.val_at(5)?,
        })
    }
}

/// See <https://eips.ethereum.org/EIPS/eip-7702>. Like blob transactions,
/// `to` is mandatory.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Transaction7702 {
    pub chain_id: u64,
    pub nonce: U256,
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
    pub gas_limit: U256,
    pub to: Address,
    pub value: Wei,
    pub data: Vec<u8>,
    pub access_list: Vec<AccessTuple>,
    pub authorization_list: Vec<Authorization>,
}

impl Transaction7702 {
    pub fn rlp_append_unsigned(&self, s: &mut RlpStream) {
        self.rlp_append(s, 10);
    }

    pub fn rlp_append_signed(&self, s: &mut RlpStream) {
        self.rlp_append(s, 13);
    }

    fn rlp_append(&self, s: &mut RlpStream, list_len: usize) {
        s.begin_list(list_len);
        s.append(&self.chain_id);
        s.append(&self.nonce);
        s.append(&self.max_priority_fee_per_gas);
        s.append(&self.max_fee_per_gas);
        s.append(&self.gas_limit);
        s.append(&self.to);
        s.append(&self.value.raw());
        s.append(&self.data);
        s.append_list(&self.access_list);
        s.append_list(&self.authorization_list);
    }
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct SignedTransaction7702 {
    pub transaction: Transaction7702,
    pub parity: u8,
    pub r: U256,
    pub s: U256,
}

impl SignedTransaction7702 {
    pub fn sender(&self) -> Result<Address, Error> {
        let mut rlp_stream = RlpStream::new();
        rlp_stream.append(&TYPE_BYTE);
        self.transaction.rlp_append_unsigned(&mut rlp_stream);
        let message_hash = keccak256(rlp_stream.as_raw());
        ecrecover(
            message_hash,
            &super::vrs_to_arr(self.parity, self.r, self.s),
        )
        .map_err(|_e| Error::EcRecover)
    }
}

impl Encodable for SignedTransaction7702 {
    fn rlp_append(&self, s: &mut RlpStream) {
        self.transaction.rlp_append_signed(s);
        s.append(&self.parity);
        s.append(&self.r);
        s.append(&self.s);
    }
}

impl Decodable for SignedTransaction7702 {
    fn decode(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        if rlp.item_count() != Ok(13) {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            transaction: Transaction7702 {
                chain_id: rlp.val_at(0)?,
                nonce: rlp.val_at(1)?,
                max_priority_fee_per_gas: rlp.val_at(2)?,
                max_fee_per_gas: rlp.val_at(3)?,
                gas_limit: rlp.val_at(4)?,
                to: rlp.val_at(5)?,
                value: Wei::new(rlp.val_at(6)?),
                data: rlp.val_at(7)?,
                access_list: rlp.list_at(8)?,
                authorization_list: rlp.list_at(9)?,
            },
            parity: rlp.val_at(10)?,
            r: rlp.val_at(11)?,
            s: rlp.val_at(12)?,
        })
    }
}
