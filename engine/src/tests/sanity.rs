//! Block-level round trips: transition -> build_block -> apply_block.

use super::{sign_eip1559, test_address};
use crate::engine::{apply_block, BlockError, EngineConfig};
use crate::fork::{ChainConfig, Fork};
use crate::transition::{build_block, transition, TransitionEnv};
use crate::{Block, Header};
use hearth_engine_evm::AccountState;
use hearth_engine_transactions::eip_1559::Transaction1559;
use hearth_engine_transactions::EthTransactionKind;
use hearth_engine_types::types::{Address, Wei};
use hearth_engine_types::U256;
use std::collections::BTreeMap;

fn coinbase() -> Address {
    Address::from_array([0xc0; 20])
}

fn pre_alloc() -> BTreeMap<Address, AccountState> {
    let mut alloc = BTreeMap::new();
    alloc.insert(
        test_address(),
        AccountState {
            balance: Wei::new(U256::exp10(18)),
            ..Default::default()
        },
    );
    alloc
}

fn transfer_tx(nonce: u64) -> EthTransactionKind {
    EthTransactionKind::Eip1559(sign_eip1559(Transaction1559 {
        chain_id: 1,
        nonce: U256::from(nonce),
        max_priority_fee_per_gas: U256::one(),
        max_fee_per_gas: U256::from(10),
        gas_limit: U256::from(21_000),
        to: Some(Address::from_array([0xbe; 20])),
        value: Wei::new_u64(1_000),
        data: vec![],
        access_list: vec![],
    }))
}

/// Assemble a valid Shanghai block out of a transition run, then verify it
/// applies cleanly from the same pre-state.
#[test]
fn test_block_round_trip() {
    let chain = ChainConfig::new(Fork::Shanghai);
    let engine_config = EngineConfig::default();
    let env = TransitionEnv {
        coinbase: coinbase(),
        gas_limit: 30_000_000,
        number: 1,
        timestamp: 1_000,
        base_fee: Some(U256::from(5)),
        withdrawals: vec![],
        ..Default::default()
    };
    let txs = vec![transfer_tx(0), transfer_tx(1)];
    let output = transition(&chain, &engine_config, pre_alloc(), &env, &txs);
    assert!(output.rejected.is_empty());

    let header = Header {
        beneficiary: coinbase(),
        state_root: output.state_root,
        receipts_root: output.receipts_root,
        logs_bloom: output.logs_bloom,
        number: 1,
        gas_limit: 30_000_000,
        gas_used: output.gas_used,
        timestamp: 1_000,
        base_fee_per_gas: Some(U256::from(5)),
        ..Default::default()
    };
    let (block_rlp, block_hash) = build_block(header, txs, vec![], Some(vec![]));

    let block: Block = rlp::decode(&block_rlp).unwrap();
    assert_eq!(block.hash(), block_hash);

    let outcome = apply_block(pre_alloc(), &block, None, &chain, &engine_config).unwrap();
    assert_eq!(outcome.gas_used, 42_000);
    assert_eq!(outcome.receipts.len(), 2);
    assert_eq!(outcome.state_root, output.state_root);
}

#[test]
fn test_block_rejects_wrong_state_root() {
    let chain = ChainConfig::new(Fork::Shanghai);
    let engine_config = EngineConfig::default();
    let env = TransitionEnv {
        coinbase: coinbase(),
        gas_limit: 30_000_000,
        number: 1,
        timestamp: 1_000,
        base_fee: Some(U256::from(5)),
        ..Default::default()
    };
    let txs = vec![transfer_tx(0)];
    let output = transition(&chain, &engine_config, pre_alloc(), &env, &txs);

    let header = Header {
        beneficiary: coinbase(),
        state_root: hearth_engine_types::H256::repeat_byte(0xde),
        receipts_root: output.receipts_root,
        logs_bloom: output.logs_bloom,
        number: 1,
        gas_limit: 30_000_000,
        gas_used: output.gas_used,
        timestamp: 1_000,
        base_fee_per_gas: Some(U256::from(5)),
        ..Default::default()
    };
    let (block_rlp, _hash) = build_block(header, txs, vec![], Some(vec![]));
    let block: Block = rlp::decode(&block_rlp).unwrap();

    let result = apply_block(pre_alloc(), &block, None, &chain, &engine_config);
    assert!(matches!(
        result,
        Err(BlockError::StateRootMismatch { .. })
    ));
}

#[test]
fn test_block_rejects_gas_used_mismatch() {
    let chain = ChainConfig::new(Fork::Shanghai);
    let engine_config = EngineConfig::default();
    let env = TransitionEnv {
        coinbase: coinbase(),
        gas_limit: 30_000_000,
        number: 1,
        timestamp: 1_000,
        base_fee: Some(U256::from(5)),
        ..Default::default()
    };
    let txs = vec![transfer_tx(0)];
    let output = transition(&chain, &engine_config, pre_alloc(), &env, &txs);

    let header = Header {
        beneficiary: coinbase(),
        state_root: output.state_root,
        receipts_root: output.receipts_root,
        logs_bloom: output.logs_bloom,
        number: 1,
        gas_limit: 30_000_000,
        gas_used: output.gas_used + 1,
        timestamp: 1_000,
        base_fee_per_gas: Some(U256::from(5)),
        ..Default::default()
    };
    let (block_rlp, _hash) = build_block(header, txs, vec![], Some(vec![]));
    let block: Block = rlp::decode(&block_rlp).unwrap();

    let result = apply_block(pre_alloc(), &block, None, &chain, &engine_config);
    assert_eq!(result.unwrap_err(), BlockError::GasUsedMismatch);
}

#[test]
fn test_header_shape_base_fee_gating() {
    let chain = ChainConfig::new(Fork::Berlin);
    // A Berlin block must not carry a base fee.
    let header = Header {
        number: 1,
        gas_limit: 30_000_000,
        base_fee_per_gas: Some(U256::from(5)),
        ..Default::default()
    };
    let block = Block {
        header,
        ..Default::default()
    };
    let result = apply_block(pre_alloc(), &block, None, &chain, &EngineConfig::default());
    assert!(matches!(result, Err(BlockError::MalformedHeader(_))));
}

#[test]
fn test_parent_derived_base_fee_verified() {
    let chain = ChainConfig::new(Fork::Shanghai);
    let engine_config = EngineConfig::default();

    // Parent ran exactly at target, so the child's base fee stays at 5.
    let parent = Header {
        number: 0,
        gas_limit: 30_000_000,
        gas_used: 15_000_000,
        timestamp: 999,
        base_fee_per_gas: Some(U256::from(5)),
        ..Default::default()
    };

    let env = TransitionEnv {
        coinbase: coinbase(),
        gas_limit: 30_000_000,
        number: 1,
        timestamp: 1_000,
        base_fee: Some(U256::from(5)),
        ..Default::default()
    };
    let txs = vec![transfer_tx(0)];
    let output = transition(&chain, &engine_config, pre_alloc(), &env, &txs);
    assert!(output.rejected.is_empty());

    let header = Header {
        parent_hash: parent.hash(),
        beneficiary: coinbase(),
        state_root: output.state_root,
        receipts_root: output.receipts_root,
        logs_bloom: output.logs_bloom,
        number: 1,
        gas_limit: 30_000_000,
        gas_used: output.gas_used,
        timestamp: 1_000,
        base_fee_per_gas: Some(U256::from(5)),
        ..Default::default()
    };
    let (block_rlp, _hash) = build_block(header, txs, vec![], Some(vec![]));
    let block: Block = rlp::decode(&block_rlp).unwrap();

    apply_block(pre_alloc(), &block, Some(&parent), &chain, &engine_config).unwrap();

    // A committed base fee the parent does not derive is rejected before any
    // transaction runs.
    let mut tampered = block.clone();
    tampered.header.base_fee_per_gas = Some(U256::from(6));
    let result = apply_block(pre_alloc(), &tampered, Some(&parent), &chain, &engine_config);
    assert_eq!(
        result.unwrap_err(),
        BlockError::BaseFeeMismatch {
            expected: U256::from(5),
            committed: U256::from(6),
        }
    );

    // So is a dangling parent hash.
    let mut detached = block;
    detached.header.parent_hash = hearth_engine_types::H256::repeat_byte(0x77);
    let result = apply_block(pre_alloc(), &detached, Some(&parent), &chain, &engine_config);
    assert!(matches!(result, Err(BlockError::MalformedHeader(_))));
}

#[test]
fn test_parent_derived_excess_blob_gas_verified() {
    let chain = ChainConfig::new(Fork::Cancun);
    let engine_config = EngineConfig {
        verify_state_root: false,
        ..EngineConfig::default()
    };
    let parent = Header {
        number: 0,
        gas_limit: 30_000_000,
        gas_used: 15_000_000,
        timestamp: 999,
        base_fee_per_gas: Some(U256::from(5)),
        blob_gas_used: Some(0),
        excess_blob_gas: Some(0),
        ..Default::default()
    };

    // An idle parent drains the excess to zero; committing 131072 is wrong.
    let header = Header {
        parent_hash: parent.hash(),
        beneficiary: coinbase(),
        receipts_root: hearth_engine_types::account::EMPTY_ROOT,
        number: 1,
        gas_limit: 30_000_000,
        gas_used: 0,
        timestamp: 1_000,
        base_fee_per_gas: Some(U256::from(5)),
        blob_gas_used: Some(0),
        excess_blob_gas: Some(131_072),
        parent_beacon_block_root: Some(hearth_engine_types::H256::zero()),
        ..Default::default()
    };
    let (block_rlp, _hash) = build_block(header, vec![], vec![], Some(vec![]));
    let block: Block = rlp::decode(&block_rlp).unwrap();

    let result = apply_block(pre_alloc(), &block, Some(&parent), &chain, &engine_config);
    assert_eq!(
        result.unwrap_err(),
        BlockError::ExcessBlobGasMismatch {
            expected: 0,
            committed: 131_072,
        }
    );
}

#[test]
fn test_pre_merge_difficulty_verified() {
    use crate::block::empty_ommers_hash;
    use crate::validation::calc_difficulty;

    let chain = ChainConfig::new(Fork::Byzantium);
    let engine_config = EngineConfig {
        verify_state_root: false,
        ..EngineConfig::default()
    };
    let parent = Header {
        number: 0,
        ommers_hash: empty_ommers_hash(),
        gas_limit: 30_000_000,
        timestamp: 991,
        difficulty: U256::from(10_000_000u64),
        ..Default::default()
    };
    let expected_difficulty =
        calc_difficulty(Fork::Byzantium, 1, 1_000, 991, parent.difficulty, false);

    let header = Header {
        parent_hash: parent.hash(),
        beneficiary: coinbase(),
        receipts_root: hearth_engine_types::account::EMPTY_ROOT,
        number: 1,
        gas_limit: 30_000_000,
        gas_used: 0,
        timestamp: 1_000,
        difficulty: expected_difficulty,
        ..Default::default()
    };
    let (block_rlp, _hash) = build_block(header, vec![], vec![], None);
    let block: Block = rlp::decode(&block_rlp).unwrap();
    apply_block(pre_alloc(), &block, Some(&parent), &chain, &engine_config).unwrap();

    let mut tampered = block;
    tampered.header.difficulty = expected_difficulty + U256::one();
    let result = apply_block(pre_alloc(), &tampered, Some(&parent), &chain, &engine_config);
    assert!(matches!(result, Err(BlockError::DifficultyMismatch { .. })));
}

#[test]
fn test_pre_merge_block_reward_paid() {
    let chain = ChainConfig::new(Fork::Byzantium);
    let engine_config = EngineConfig {
        verify_state_root: false,
        ..EngineConfig::default()
    };
    let header = Header {
        beneficiary: coinbase(),
        receipts_root: hearth_engine_types::account::EMPTY_ROOT,
        number: 1,
        gas_limit: 30_000_000,
        gas_used: 0,
        timestamp: 1_000,
        difficulty: U256::from(131_072),
        ..Default::default()
    };
    let (block_rlp, _hash) = build_block(header, vec![], vec![], None);
    let block: Block = rlp::decode(&block_rlp).unwrap();
    let outcome = apply_block(pre_alloc(), &block, None, &chain, &engine_config).unwrap();
    assert_eq!(
        outcome.state.balance(&coinbase()),
        Wei::from_eth(U256::from(3)).unwrap()
    );
}
