//! Transaction receipts and their typed envelope encoding.

use hearth_engine_types::bloom::{get_logs_bloom, Bloom};
use hearth_engine_types::log::Log;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// A post-Byzantium receipt. The `status` field replaces the intermediate
/// state root that receipts carried before Byzantium.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Receipt {
    /// The EIP-2718 envelope type of the transaction, `None` for legacy.
    pub transaction_type: Option<u8>,
    pub status: bool,
    pub cumulative_gas_used: u64,
    pub logs_bloom: Bloom,
    pub logs: Vec<Log>,
}

impl Receipt {
    #[must_use]
    pub fn new(
        transaction_type: Option<u8>,
        status: bool,
        cumulative_gas_used: u64,
        logs: Vec<Log>,
    ) -> Self {
        Self {
            transaction_type,
            status,
            cumulative_gas_used,
            logs_bloom: get_logs_bloom(&logs),
            logs,
        }
    }

    /// The bytes committed to the receipts trie: plain RLP for legacy
    /// transactions, `type ++ rlp(receipt)` for typed ones.
    #[must_use]
    pub fn encode_for_trie(&self) -> Vec<u8> {
        match self.transaction_type {
            None => rlp::encode(self).to_vec(),
            Some(type_byte) => {
                let mut out = vec![type_byte];
                out.extend_from_slice(&rlp::encode(self));
                out
            }
        }
    }
}

impl Encodable for Receipt {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&u8::from(self.status));
        s.append(&self.cumulative_gas_used);
        s.append(&self.logs_bloom.as_bytes().to_vec());
        s.append_list(&self.logs);
    }
}

impl Decodable for Receipt {
    fn decode(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        if rlp.item_count() != Ok(4) {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let status: u8 = rlp.val_at(0)?;
        let cumulative_gas_used = rlp.val_at(1)?;
        let bloom_bytes: Vec<u8> = rlp.val_at(2)?;
        if bloom_bytes.len() != 256 {
            return Err(DecoderError::RlpInvalidLength);
        }
        let logs = rlp.list_at(3)?;
        Ok(Self {
            transaction_type: None,
            status: status == 1,
            cumulative_gas_used,
            logs_bloom: Bloom::from_slice(&bloom_bytes),
            logs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_engine_types::types::Address;
    use hearth_engine_types::H256;

    fn sample_log() -> Log {
        Log {
            address: Address::from_array([1; 20]),
            topics: vec![H256::repeat_byte(2)],
            data: vec![3, 4],
        }
    }

    #[test]
    fn test_receipt_rlp_round_trip() {
        let receipt = Receipt::new(None, true, 21_000, vec![sample_log()]);
        let decoded: Receipt = rlp::decode(&rlp::encode(&receipt)).unwrap();
        assert_eq!(decoded.status, receipt.status);
        assert_eq!(decoded.cumulative_gas_used, receipt.cumulative_gas_used);
        assert_eq!(decoded.logs, receipt.logs);
        assert_eq!(decoded.logs_bloom, receipt.logs_bloom);
    }

    #[test]
    fn test_typed_receipt_prefix() {
        let receipt = Receipt::new(Some(0x02), false, 42_000, vec![]);
        let bytes = receipt.encode_for_trie();
        assert_eq!(bytes[0], 0x02);
        let inner: Receipt = rlp::decode(&bytes[1..]).unwrap();
        assert!(!inner.status);
    }

    #[test]
    fn test_receipt_bloom_covers_log_address() {
        let receipt = Receipt::new(None, true, 1, vec![sample_log()]);
        let mut probe = Bloom::default();
        probe.accrue(sample_log().address.as_bytes());
        assert!(receipt.logs_bloom.contains_bloom(&probe));
    }
}
