use crate::types::Wei;
use crate::{make_h256, H256, U256};
use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};

/// `keccak256` of the empty byte string, the code hash of accounts without code.
pub const EMPTY_CODE_HASH: H256 = make_h256(
    0xc5d2460186f7233c927e7db2dcc703c0,
    0xe500b653ca82273b7bfad8045d85a470,
);

/// `keccak256(rlp(""))`, the root of an empty trie.
pub const EMPTY_ROOT: H256 = make_h256(
    0x56e81f171bcc55a6ff8345e692c0f86e,
    0x5b48e01b996cadc001622fb5e363b421,
);

/// An account as committed to the state trie:
/// `rlp([nonce, balance, storage_root, code_hash])`.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct Account {
    pub nonce: u64,
    pub balance: Wei,
    pub storage_root: H256,
    pub code_hash: H256,
}

impl Default for Account {
    fn default() -> Self {
        Self {
            nonce: 0,
            balance: Wei::zero(),
            storage_root: EMPTY_ROOT,
            code_hash: EMPTY_CODE_HASH,
        }
    }
}

impl Account {
    /// The EIP-161 emptiness predicate: no code, zero nonce, zero balance.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == EMPTY_CODE_HASH
    }
}

impl Encodable for Account {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(4);
        s.append(&self.nonce);
        s.append(&self.balance.raw());
        s.append(&self.storage_root);
        s.append(&self.code_hash);
    }
}

impl Decodable for Account {
    fn decode(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        if rlp.item_count() != Ok(4) {
            return Err(DecoderError::RlpIncorrectListLen);
        }
        let nonce = rlp.val_at(0)?;
        let balance: U256 = rlp.val_at(1)?;
        let storage_root = rlp.val_at(2)?;
        let code_hash = rlp.val_at(3)?;
        Ok(Self {
            nonce,
            balance: Wei::new(balance),
            storage_root,
            code_hash,
        })
    }
}
