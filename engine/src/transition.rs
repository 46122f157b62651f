//! Harness-facing entry points: the `t8n`-shaped `transition`, the
//! `b11r`-shaped `build_block`, and the single-case `statetest` runner.

use crate::block::{empty_ommers_hash, Block, Header, Withdrawal};
use crate::engine::{
    apply_post_hooks, apply_transaction, system_call, BlockContext, EngineConfig,
    TransactionError,
};
use crate::engine::{beacon_roots_address, history_storage_address};
use crate::fork::{ChainConfig, Fork};
use crate::receipt::Receipt;
use crate::validation::blob_gasprice;
use hearth_engine_evm::{AccountState, BlockEnv, JournaledState};
use hearth_engine_transactions::EthTransactionKind;
use hearth_engine_trie::ordered_trie_root;
use hearth_engine_types::bloom::Bloom;
use hearth_engine_types::log::Log;
use hearth_engine_types::types::Address;
use hearth_engine_types::{keccak256, H256, U256};
use std::collections::BTreeMap;

/// The environment a transaction batch runs in: the fields of the enclosing
/// block that execution can observe.
#[derive(Debug, Clone, Default)]
pub struct TransitionEnv {
    pub coinbase: Address,
    pub difficulty: U256,
    pub prev_randao: H256,
    pub gas_limit: u64,
    pub number: u64,
    pub timestamp: u64,
    pub base_fee: Option<U256>,
    pub excess_blob_gas: Option<u64>,
    pub parent_beacon_block_root: Option<H256>,
    pub parent_hash: H256,
    /// Hashes of recent ancestors, most recent last.
    pub block_hashes: Vec<H256>,
    pub withdrawals: Vec<Withdrawal>,
}

impl TransitionEnv {
    fn block_context(&self, chain: &ChainConfig) -> BlockContext {
        let fork = chain.fork_at(self.number, self.timestamp);
        let excess_blob_gas = self.excess_blob_gas.unwrap_or(0);
        let blob_base_fee = fork
            .blob_schedule()
            .map_or_else(U256::zero, |schedule| {
                blob_gasprice(excess_blob_gas, &schedule)
            });
        BlockContext {
            fork,
            env: BlockEnv {
                number: U256::from(self.number),
                coinbase: self.coinbase,
                timestamp: U256::from(self.timestamp),
                gas_limit: U256::from(self.gas_limit),
                difficulty: self.difficulty,
                prev_randao: self.prev_randao,
                base_fee: self.base_fee.unwrap_or_default(),
                blob_base_fee,
                chain_id: U256::from(chain.chain_id),
                block_hashes: self.block_hashes.clone(),
            },
            excess_blob_gas,
            parent_beacon_block_root: self.parent_beacon_block_root,
            parent_hash: self.parent_hash,
        }
    }
}

/// The derived artifacts of a transaction batch.
#[derive(Debug)]
pub struct TransitionOutput {
    pub alloc: BTreeMap<Address, AccountState>,
    pub receipts: Vec<Receipt>,
    /// Index and reason of every transaction dropped from the batch.
    pub rejected: Vec<(usize, TransactionError)>,
    pub state_root: H256,
    pub transactions_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bloom,
    pub logs: Vec<Log>,
    pub gas_used: u64,
    pub blob_gas_used: u64,
    pub requests_hash: Option<H256>,
}

/// The `t8n` shape: runs a transaction list over a flat pre-allocation and
/// returns the post-allocation with every derived root. Invalid transactions
/// are dropped and reported, not fatal.
pub fn transition(
    chain: &ChainConfig,
    engine_config: &EngineConfig,
    pre_alloc: BTreeMap<Address, AccountState>,
    env: &TransitionEnv,
    transactions: &[EthTransactionKind],
) -> TransitionOutput {
    let context = env.block_context(chain);
    let mut state = JournaledState::from_accounts(pre_alloc);

    if context.fork >= Fork::Cancun {
        if let Some(root) = context.parent_beacon_block_root {
            system_call(
                &mut state,
                &context,
                beacon_roots_address(),
                root.as_bytes().to_vec(),
            );
        }
    }
    if context.fork >= Fork::Prague {
        system_call(
            &mut state,
            &context,
            history_storage_address(),
            context.parent_hash.as_bytes().to_vec(),
        );
    }

    let mut receipts = Vec::new();
    let mut included = Vec::new();
    let mut rejected = Vec::new();
    let mut logs = Vec::new();
    let mut cumulative_gas = 0u64;
    let mut blob_gas_used = 0u64;

    for (index, tx) in transactions.iter().enumerate() {
        match apply_transaction(
            &mut state,
            &context,
            chain,
            engine_config,
            tx,
            env.gas_limit - cumulative_gas,
        ) {
            Ok(outcome) => {
                cumulative_gas += outcome.gas_used;
                blob_gas_used += outcome.blob_gas_used;
                logs.extend(outcome.logs.iter().cloned());
                receipts.push(Receipt::new(
                    tx.type_byte(),
                    outcome.success,
                    cumulative_gas,
                    outcome.logs,
                ));
                included.push(tx.clone());
            }
            Err(e) => rejected.push((index, e)),
        }
    }

    for withdrawal in &env.withdrawals {
        if withdrawal.amount == 0 {
            continue;
        }
        let credited = state
            .balance(&withdrawal.address)
            .saturating_add(withdrawal.amount_in_wei());
        state.set_balance(withdrawal.address, credited);
    }

    let requests_hash = apply_post_hooks(&mut state, &context, &receipts);

    let transactions_root = ordered_trie_root(included.iter().map(|tx| {
        let bytes: Vec<u8> = tx.into();
        bytes
    }));
    let receipts_root = ordered_trie_root(receipts.iter().map(Receipt::encode_for_trie));
    let mut logs_bloom = Bloom::default();
    for receipt in &receipts {
        logs_bloom.accrue_bloom(&receipt.logs_bloom);
    }
    let state_root = state.state_root();

    TransitionOutput {
        alloc: state.accounts().clone(),
        receipts,
        rejected,
        state_root,
        transactions_root,
        receipts_root,
        logs_bloom,
        logs,
        gas_used: cumulative_gas,
        blob_gas_used,
        requests_hash,
    }
}

/// The `b11r` shape: assembles a sealed block from a header template and the
/// body pieces, filling in the body commitments the template leaves open.
#[must_use]
pub fn build_block(
    mut header: Header,
    transactions: Vec<EthTransactionKind>,
    ommers: Vec<Header>,
    withdrawals: Option<Vec<Withdrawal>>,
) -> (Vec<u8>, H256) {
    header.transactions_root = ordered_trie_root(transactions.iter().map(|tx| {
        let bytes: Vec<u8> = tx.into();
        bytes
    }));
    header.ommers_hash = if ommers.is_empty() {
        empty_ommers_hash()
    } else {
        keccak256(&rlp::encode_list(&ommers))
    };
    if let Some(withdrawals) = &withdrawals {
        header.withdrawals_root = Some(ordered_trie_root(
            withdrawals.iter().map(|w| rlp::encode(w).to_vec()),
        ));
    }

    let block = Block {
        header,
        transactions,
        ommers,
        withdrawals,
    };
    let hash = block.hash();
    (rlp::encode(&block).to_vec(), hash)
}

/// What a state test commits to.
#[derive(Debug, Clone)]
pub struct StatetestExpectation {
    pub state_root: H256,
    /// `keccak(rlp(logs))` over the concatenated logs of the transaction.
    pub logs_hash: H256,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum StatetestFailure {
    StateRootMismatch { expected: H256, computed: H256 },
    LogsHashMismatch { expected: H256, computed: H256 },
}

/// Runs one state-test case: a single transaction under a named fork,
/// compared against the committed post-state root and logs hash.
pub fn statetest(
    fork: Fork,
    engine_config: &EngineConfig,
    pre_alloc: BTreeMap<Address, AccountState>,
    env: &TransitionEnv,
    tx: &EthTransactionKind,
) -> Result<(H256, H256), TransactionError> {
    let chain = ChainConfig::new(fork).with_chain_id(engine_config.chain_id);
    let output = transition(
        &chain,
        engine_config,
        pre_alloc,
        env,
        core::slice::from_ref(tx),
    );
    if let Some((_index, error)) = output.rejected.into_iter().next() {
        return Err(error);
    }
    let logs_hash = keccak256(&rlp::encode_list(&output.logs));
    Ok((output.state_root, logs_hash))
}

/// Convenience wrapper producing a pass/fail verdict against an expectation.
/// A rejected transaction leaves the pre-state untouched, so the committed
/// root is simply the pre-state root in that case.
pub fn statetest_check(
    fork: Fork,
    engine_config: &EngineConfig,
    pre_alloc: BTreeMap<Address, AccountState>,
    env: &TransitionEnv,
    tx: &EthTransactionKind,
    expected: &StatetestExpectation,
) -> Result<(), StatetestFailure> {
    let chain = ChainConfig::new(fork).with_chain_id(engine_config.chain_id);
    let output = transition(
        &chain,
        engine_config,
        pre_alloc,
        env,
        core::slice::from_ref(tx),
    );
    let logs_hash = keccak256(&rlp::encode_list(&output.logs));
    if output.state_root != expected.state_root {
        return Err(StatetestFailure::StateRootMismatch {
            expected: expected.state_root,
            computed: output.state_root,
        });
    }
    if logs_hash != expected.logs_hash {
        return Err(StatetestFailure::LogsHashMismatch {
            expected: expected.logs_hash,
            computed: logs_hash,
        });
    }
    Ok(())
}
