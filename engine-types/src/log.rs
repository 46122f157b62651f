use crate::types::Address;
use crate::H256;
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// A log emitted by a `LOG0..LOG4` opcode, as committed to a receipt:
/// `rlp([address, topics, data])`.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Vec<u8>,
}

impl Encodable for Log {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3);
        s.append(&self.address);
        s.append_list(&self.topics);
        s.append(&self.data);
    }
}

impl Decodable for Log {
    fn decode(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        if rlp.item_count() != Ok(3) {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        Ok(Self {
            address: rlp.val_at(0)?,
            topics: rlp.list_at(1)?,
            data: rlp.val_at(2)?,
        })
    }
}
