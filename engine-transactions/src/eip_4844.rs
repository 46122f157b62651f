use crate::eip_2930::AccessTuple;
use crate::Error;
use hearth_engine_precompiles::secp256k1::ecrecover;
use hearth_engine_types::types::{Address, Wei};
use hearth_engine_types::{keccak256, H256, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// Type indicator (per EIP-4844) for shard blob transactions
pub const TYPE_BYTE: u8 = 0x03;

/// The single byte all blob versioned hashes must start with.
pub const VERSIONED_HASH_VERSION_KZG: u8 = 0x01;

/// See <https://eips.ethereum.org/EIPS/eip-4844>. Unlike every other variant,
/// `to` is mandatory: a blob transaction cannot create a contract.
#[derive(Debug, Eq, PartialEq, Clone)]
pub struct Transaction4844 {
    pub chain_id: u64,
    pub nonce: U256,
    pub max_priority_fee_per_gas: U256,
    pub max_fee_per_gas: U256,
    pub gas_limit: U256,
    pub to: Address,
    pub value: Wei,
    pub data: Vec<u8>,
    pub access_list: Vec<AccessTuple>,
    pub max_fee_per_blob_gas: U256,
    pub blob_versioned_hashes: Vec<H256>,
}

impl Transaction4844 {
    pub fn rlp_append_unsigned(&self, s: &mut RlpStream) {
        self.rlp_append(s, 11);
    }

    pub fn rlp_append_signed(&self, s: &mut RlpStream) {
        self.rlp_append(s, 14);
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
        s.append(&self.max_fee_per_blob_gas);
        s.begin_list(self.blob_versioned_hashes.len());
        for hash in &self.blob_versioned_hashes {
            s.append(hash);
        }
    }
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct SignedTransaction4844 {
    pub transaction: Transaction4844,
    pub parity: u8,
    pub r: U256,
    pub s: U256,
}

impl SignedTransaction4844 {
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

impl Encodable for SignedTransaction4844 {
    fn rlp_append(&self, s: &mut RlpStream) {
        self.transaction.rlp_append_signed(s);
        s.append(&self.parity);
        s.append(&self.r);
        s.append(&self.s);
    }
}

impl Decodable for SignedTransaction4844 {
    fn decode(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        if rlp.item_count() != Ok(14) {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let chain_id = rlp.val_at(0)?;
        let nonce = rlp.val_at(1)?;
        let max_priority_fee_per_gas = rlp.val_at(2)?;
        let max_fee_per_gas = rlp.val_at(3)?;
        let gas_limit = rlp.val_at(4)?;
        let to = rlp.val_at(5)?;
        let value = Wei::new(rlp.val_at(6)?);
        let data = rlp.val_at(7)?;
        let access_list = rlp.list_at(8)?;
        let max_fee_per_blob_gas = rlp.val_at(9)?;
        let blob_versioned_hashes = rlp.list_at(10)?;
        let parity = rlp.val_at(11)?;
        let r = rlp.val_at(12)?;
        let s = rlp.val_at(13)?;
        Ok(Self {
            transaction: Transaction4844 {
                chain_id,
                nonce,
                max_priority_fee_per_gas,
                max_fee_per_gas,
                gas_limit,
                to,
                value,
                data,
                access_list,
                max_fee_per_blob_gas,
                blob_versioned_hashes,
            },
            parity,
            r,
            s,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EthTransactionKind;

    #[test]
    fn test_eip4844_round_trip_through_envelope() {
        let mut versioned = H256::repeat_byte(0x22);
        versioned.0[0] = VERSIONED_HASH_VERSION_KZG;
        let tx = SignedTransaction4844 {
            transaction: Transaction4844 {
                chain_id: 1,
                nonce: U256::from(5),
                max_priority_fee_per_gas: U256::one(),
                max_fee_per_gas: U256::from(20),
                gas_limit: U256::from(21_000),
                to: Address::from_array([0x44; 20]),
                value: Wei::zero(),
                data: vec![],
                access_list: vec![],
                max_fee_per_blob_gas: U256::from(10),
                blob_versioned_hashes: vec![versioned, versioned],
            },
            parity: 1,
            r: U256::from(3),
            s: U256::from(4),
        };
        let kind = EthTransactionKind::Eip4844(tx.clone());
        let bytes: Vec<u8> = (&kind).into();
        assert_eq!(bytes[0], TYPE_BYTE);
        let decoded = EthTransactionKind::try_from(bytes.as_slice()).unwrap();
        assert_eq!(decoded, kind);
    }
}
