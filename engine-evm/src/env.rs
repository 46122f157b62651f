use hearth_engine_types::types::Address;
use hearth_engine_types::{H256, U256};

/// The block-level environment an execution observes.
#[derive(Debug, Clone, Default)]
pub struct BlockEnv {
    pub number: U256,
    pub coinbase: Address,
    pub timestamp: U256,
    pub gas_limit: U256,
    /// Pre-merge difficulty; unread once `prev_randao` takes over.
    pub difficulty: U256,
    /// Post-merge randomness beacon (EIP-4399).
    pub prev_randao: H256,
    pub base_fee: U256,
    /// Blob base fee derived from the header's excess blob gas (EIP-7516).
    pub blob_base_fee: U256,
    pub chain_id: U256,
    /// Hashes of the most recent 256 ancestor blocks, most recent last.
    pub block_hashes: Vec<H256>,
}

impl BlockEnv {
    /// `BLOCKHASH` lookup: only the 256 most recent ancestors resolve.
    #[must_use]
    pub fn block_hash(&self, number: U256) -> H256 {
        if number >= self.number {
            return H256::zero();
        }
        let age = self.number - number;
        if age > U256::from(256) {
            return H256::zero();
        }
        let age = age.as_usize();
        if age > self.block_hashes.len() {
            return H256::zero();
        }
        self.block_hashes[self.block_hashes.len() - age]
    }
}

/// The transaction-level environment.
#[derive(Debug, Clone, Default)]
pub struct TxEnv {
    pub origin: Address,
    /// The effective gas price the sender is paying.
    pub gas_price: U256,
    /// Versioned hashes carried by a blob transaction (EIP-4844).
    pub blob_hashes: Vec<H256>,
}
