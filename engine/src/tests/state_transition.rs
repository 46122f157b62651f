//! End-to-end state transition scenarios.

use super::{sign_eip1559, sign_eip4844, sign_legacy, test_address};
use crate::engine::{apply_transaction, BlockContext, EngineConfig, TransactionError};
use crate::fork::{ChainConfig, Fork};
use crate::transition::{transition, TransitionEnv};
use crate::Withdrawal;
use hearth_engine_evm::{AccountState, JournaledState};
use hearth_engine_transactions::eip_1559::Transaction1559;
use hearth_engine_transactions::eip_4844::{Transaction4844, VERSIONED_HASH_VERSION_KZG};
use hearth_engine_transactions::legacy::TransactionLegacy;
use hearth_engine_transactions::EthTransactionKind;
use hearth_engine_types::account::EMPTY_ROOT;
use hearth_engine_types::types::{Address, Wei};
use hearth_engine_types::{H256, U256};
use std::collections::BTreeMap;

fn coinbase() -> Address {
    Address::from_array([0xc0; 20])
}

fn london_env() -> TransitionEnv {
    TransitionEnv {
        coinbase: coinbase(),
        gas_limit: 30_000_000,
        number: 1,
        timestamp: 1_000,
        base_fee: Some(U256::from(5)),
        ..Default::default()
    }
}

fn funded_alloc(extra: &[(Address, AccountState)]) -> BTreeMap<Address, AccountState> {
    let mut alloc = BTreeMap::new();
    alloc.insert(
        test_address(),
        AccountState {
            balance: Wei::new(U256::exp10(18)),
            ..Default::default()
        },
    );
    for (address, account) in extra {
        alloc.insert(*address, account.clone());
    }
    alloc
}

fn total_wei(alloc: &BTreeMap<Address, AccountState>) -> U256 {
    alloc
        .values()
        .fold(U256::zero(), |sum, account| sum + account.balance.raw())
}

#[test]
fn test_simple_transfer_post_london() {
    let recipient = Address::from_array([0xbe; 20]);
    let tx = sign_eip1559(Transaction1559 {
        chain_id: 1,
        nonce: U256::zero(),
        max_priority_fee_per_gas: U256::one(),
        max_fee_per_gas: U256::from(10),
        gas_limit: U256::from(21_000),
        to: Some(recipient),
        value: Wei::new_u64(1_000),
        data: vec![],
        access_list: vec![],
    });

    let chain = ChainConfig::new(Fork::London);
    let pre = funded_alloc(&[]);
    let pre_total = total_wei(&pre);
    let output = transition(
        &chain,
        &EngineConfig::default(),
        pre,
        &london_env(),
        &[EthTransactionKind::Eip1559(tx)],
    );

    assert!(output.rejected.is_empty());
    assert_eq!(output.gas_used, 21_000);
    let receipt = &output.receipts[0];
    assert!(receipt.status);
    assert_eq!(receipt.cumulative_gas_used, 21_000);
    assert!(receipt.logs.is_empty());

    // Sender pays value + 21000 * effective price (base 5 + tip 1).
    let sender = &output.alloc[&test_address()];
    assert_eq!(sender.nonce, 1);
    assert_eq!(
        sender.balance.raw(),
        U256::exp10(18) - U256::from(1_000) - U256::from(21_000u64 * 6)
    );
    assert_eq!(output.alloc[&recipient].balance, Wei::new_u64(1_000));
    // Coinbase collects only the priority fee.
    assert_eq!(
        output.alloc[&coinbase()].balance,
        Wei::new_u64(21_000)
    );

    // Conservation of ether: the base-fee portion is burned.
    let burned = U256::from(21_000u64 * 5);
    assert_eq!(total_wei(&output.alloc), pre_total - burned);
}

#[test]
fn test_sstore_clear_refund_post_london() {
    let contract = Address::from_array([0xcc; 20]);
    // SSTORE(0, 0); STOP
    let code = vec![0x60, 0x00, 0x60, 0x00, 0x55, 0x00];
    let mut storage = BTreeMap::new();
    storage.insert(H256::zero(), H256::repeat_byte(0x01));

    let tx = sign_eip1559(Transaction1559 {
        chain_id: 1,
        nonce: U256::zero(),
        max_priority_fee_per_gas: U256::zero(),
        max_fee_per_gas: U256::from(10),
        gas_limit: U256::from(100_000),
        to: Some(contract),
        value: Wei::zero(),
        data: vec![],
        access_list: vec![],
    });

    let chain = ChainConfig::new(Fork::London);
    let output = transition(
        &chain,
        &EngineConfig::default(),
        funded_alloc(&[(
            contract,
            AccountState {
                code,
                storage,
                ..Default::default()
            },
        )]),
        &london_env(),
        &[EthTransactionKind::Eip1559(tx)],
    );

    assert!(output.rejected.is_empty());
    // Execution: 21000 intrinsic + 2 pushes + SSTORE (2900 reset + 2100
    // cold) + STOP, minus the 4800 clear refund (well under the
    // gas_used / 5 cap).
    assert_eq!(output.gas_used, 21_000 + 6 + 5_000 - 4_800);

    // The slot is gone and the storage trie is empty again.
    let account = &output.alloc[&contract];
    assert!(account.storage.is_empty());
    let state = JournaledState::from_accounts(output.alloc.clone());
    assert_eq!(state.storage_root(&contract), EMPTY_ROOT);
}

#[test]
fn test_refund_cap_at_one_fifth() {
    // Clearing many slots accrues more refund than gas_used / 5; the cap
    // binds (P7).
    let contract = Address::from_array([0xcd; 20]);
    let mut code = Vec::new();
    let mut storage = BTreeMap::new();
    for slot in 0u8..10 {
        // PUSH1 0; PUSH1 slot; SSTORE
        code.extend_from_slice(&[0x60, 0x00, 0x60, slot, 0x55]);
        let mut key = [0u8; 32];
        key[31] = slot;
        storage.insert(H256(key), H256::repeat_byte(1));
    }
    code.push(0x00);

    let tx = sign_eip1559(Transaction1559 {
        chain_id: 1,
        nonce: U256::zero(),
        max_priority_fee_per_gas: U256::zero(),
        max_fee_per_gas: U256::from(10),
        gas_limit: U256::from(200_000),
        to: Some(contract),
        value: Wei::zero(),
        data: vec![],
        access_list: vec![],
    });

    let chain = ChainConfig::new(Fork::London);
    let output = transition(
        &chain,
        &EngineConfig::default(),
        funded_alloc(&[(
            contract,
            AccountState {
                code,
                storage,
                ..Default::default()
            },
        )]),
        &london_env(),
        &[EthTransactionKind::Eip1559(tx)],
    );

    assert!(output.rejected.is_empty());
    // Unrefunded execution: 21000 + 10 * (6 + 5000) = 71060. Accrued refund
    // is 48000, but the cap is 71060 / 5 = 14212.
    let unrefunded = 21_000 + 10 * (6 + 5_000);
    assert_eq!(output.gas_used, unrefunded - unrefunded / 5);
}

#[test]
fn test_nonce_mismatch_rejected() {
    let tx = sign_eip1559(Transaction1559 {
        chain_id: 1,
        nonce: U256::from(5),
        max_priority_fee_per_gas: U256::one(),
        max_fee_per_gas: U256::from(10),
        gas_limit: U256::from(21_000),
        to: Some(Address::from_array([0xbe; 20])),
        value: Wei::zero(),
        data: vec![],
        access_list: vec![],
    });
    let chain = ChainConfig::new(Fork::London);
    let pre = funded_alloc(&[]);
    let pre_root = JournaledState::from_accounts(pre.clone()).state_root();
    let output = transition(
        &chain,
        &EngineConfig::default(),
        pre,
        &london_env(),
        &[EthTransactionKind::Eip1559(tx)],
    );
    assert_eq!(
        output.rejected,
        vec![(0, TransactionError::NonceMismatch)]
    );
    // A dropped transaction leaves no trace in the state.
    assert_eq!(output.state_root, pre_root);
}

#[test]
fn test_max_fee_below_base_fee_rejected() {
    let tx = sign_eip1559(Transaction1559 {
        chain_id: 1,
        nonce: U256::zero(),
        max_priority_fee_per_gas: U256::zero(),
        max_fee_per_gas: U256::from(4),
        gas_limit: U256::from(21_000),
        to: Some(Address::from_array([0xbe; 20])),
        value: Wei::zero(),
        data: vec![],
        access_list: vec![],
    });
    let chain = ChainConfig::new(Fork::London);
    let output = transition(
        &chain,
        &EngineConfig::default(),
        funded_alloc(&[]),
        &london_env(),
        &[EthTransactionKind::Eip1559(tx)],
    );
    assert_eq!(
        output.rejected,
        vec![(0, TransactionError::MaxFeeLessThanBaseFee)]
    );
}

#[test]
fn test_legacy_transfer_frontier_era_fees() {
    // Pre-London the whole gas price goes to the coinbase.
    let recipient = Address::from_array([0xbe; 20]);
    let tx = sign_legacy(
        TransactionLegacy {
            nonce: U256::zero(),
            gas_price: U256::from(7),
            gas_limit: U256::from(21_000),
            to: Some(recipient),
            value: Wei::new_u64(500),
            data: vec![],
        },
        None,
    );

    let chain = ChainConfig::new(Fork::Homestead);
    let env = TransitionEnv {
        base_fee: None,
        ..london_env()
    };
    let pre = funded_alloc(&[]);
    let pre_total = total_wei(&pre);
    let output = transition(
        &chain,
        &EngineConfig::default(),
        pre,
        &env,
        &[EthTransactionKind::Legacy(tx)],
    );

    assert!(output.rejected.is_empty());
    assert_eq!(
        output.alloc[&coinbase()].balance,
        Wei::new_u64(21_000 * 7)
    );
    // Nothing is burned pre-London.
    assert_eq!(total_wei(&output.alloc), pre_total);
}

#[test]
fn test_blob_transaction_cancun() {
    let contract = Address::from_array([0xcc; 20]);
    // SSTORE(0, BLOBHASH(0)); SSTORE(1, BLOBHASH(2)); STOP
    let code = vec![
        0x60, 0x00, 0x49, 0x60, 0x00, 0x55, // slot 0 <- blobhash(0)
        0x60, 0x02, 0x49, 0x60, 0x01, 0x55, // slot 1 <- blobhash(2)
        0x00,
    ];

    let mut hash_one = H256::repeat_byte(0xaa);
    hash_one.0[0] = VERSIONED_HASH_VERSION_KZG;
    let mut hash_two = H256::repeat_byte(0xbb);
    hash_two.0[0] = VERSIONED_HASH_VERSION_KZG;

    let tx = sign_eip4844(Transaction4844 {
        chain_id: 1,
        nonce: U256::zero(),
        max_priority_fee_per_gas: U256::one(),
        max_fee_per_gas: U256::from(10),
        gas_limit: U256::from(100_000),
        to: contract,
        value: Wei::zero(),
        data: vec![],
        access_list: vec![],
        max_fee_per_blob_gas: U256::from(10),
        blob_versioned_hashes: vec![hash_one, hash_two],
    });

    let chain = ChainConfig::new(Fork::Cancun);
    let env = TransitionEnv {
        // Zero excess blob gas gives the floor price of 1.
        excess_blob_gas: Some(0),
        ..london_env()
    };
    let pre = funded_alloc(&[(
        contract,
        AccountState {
            code,
            ..Default::default()
        },
    )]);
    let sender_before = pre[&test_address()].balance.raw();
    let output = transition(
        &chain,
        &EngineConfig::default(),
        pre,
        &env,
        &[EthTransactionKind::Eip4844(tx)],
    );

    assert!(output.rejected.is_empty());
    assert_eq!(output.blob_gas_used, 2 * 131_072);

    // BLOBHASH(0) saw the first hash, BLOBHASH(2) fell off the end.
    let account = &output.alloc[&contract];
    assert_eq!(account.storage.get(&H256::zero()), Some(&hash_one));
    let mut slot_one = [0u8; 32];
    slot_one[31] = 1;
    assert_eq!(account.storage.get(&H256(slot_one)), None);

    // The upfront debit includes 2 * GAS_PER_BLOB * blob_gasprice(=1).
    let blob_fee = U256::from(2u64 * 131_072);
    let exec_fee = U256::from(output.gas_used) * U256::from(6);
    assert_eq!(
        output.alloc[&test_address()].balance.raw(),
        sender_before - exec_fee - blob_fee
    );
}

#[test]
fn test_blob_transaction_needs_blob_hashes() {
    let tx = sign_eip4844(Transaction4844 {
        chain_id: 1,
        nonce: U256::zero(),
        max_priority_fee_per_gas: U256::one(),
        max_fee_per_gas: U256::from(10),
        gas_limit: U256::from(21_000),
        to: Address::from_array([0xbe; 20]),
        value: Wei::zero(),
        data: vec![],
        access_list: vec![],
        max_fee_per_blob_gas: U256::from(10),
        blob_versioned_hashes: vec![],
    });
    let chain = ChainConfig::new(Fork::Cancun);
    let env = TransitionEnv {
        excess_blob_gas: Some(0),
        ..london_env()
    };
    let output = transition(
        &chain,
        &EngineConfig::default(),
        funded_alloc(&[]),
        &env,
        &[EthTransactionKind::Eip4844(tx)],
    );
    assert_eq!(
        output.rejected,
        vec![(0, TransactionError::BlobTransactionWithoutBlobs)]
    );
}

#[test]
fn test_blob_transaction_rejected_pre_cancun() {
    let mut hash = H256::repeat_byte(0xaa);
    hash.0[0] = VERSIONED_HASH_VERSION_KZG;
    let tx = sign_eip4844(Transaction4844 {
        chain_id: 1,
        nonce: U256::zero(),
        max_priority_fee_per_gas: U256::one(),
        max_fee_per_gas: U256::from(10),
        gas_limit: U256::from(21_000),
        to: Address::from_array([0xbe; 20]),
        value: Wei::zero(),
        data: vec![],
        access_list: vec![],
        max_fee_per_blob_gas: U256::from(10),
        blob_versioned_hashes: vec![hash],
    });
    let chain = ChainConfig::new(Fork::Shanghai);
    let env = TransitionEnv {
        base_fee: Some(U256::from(5)),
        ..london_env()
    };
    let output = transition(
        &chain,
        &EngineConfig::default(),
        funded_alloc(&[]),
        &env,
        &[EthTransactionKind::Eip4844(tx)],
    );
    assert_eq!(
        output.rejected,
        vec![(0, TransactionError::TypeNotSupported)]
    );
}

#[test]
fn test_contract_creation_end_to_end() {
    // Init code returning a one-byte runtime: PUSH1 1; PUSH1 0; MSTORE8? use
    // codecopy-free variant: MSTORE8(0, 0xfe); RETURN(0, 1).
    let init_code = vec![0x60, 0xfe, 0x60, 0x00, 0x53, 0x60, 0x01, 0x60, 0x00, 0xf3];
    let tx = sign_eip1559(Transaction1559 {
        chain_id: 1,
        nonce: U256::zero(),
        max_priority_fee_per_gas: U256::one(),
        max_fee_per_gas: U256::from(10),
        gas_limit: U256::from(100_000),
        to: None,
        value: Wei::zero(),
        data: init_code,
        access_list: vec![],
    });

    let chain = ChainConfig::new(Fork::London);
    let output = transition(
        &chain,
        &EngineConfig::default(),
        funded_alloc(&[]),
        &london_env(),
        &[EthTransactionKind::Eip1559(tx)],
    );

    assert!(output.rejected.is_empty());
    assert!(output.receipts[0].status);
    let deployed = Address::from_create(&test_address(), U256::zero());
    let account = &output.alloc[&deployed];
    assert_eq!(account.code, vec![0xfe]);
    // EIP-161: deployed contracts start at nonce 1.
    assert_eq!(account.nonce, 1);
}

#[test]
fn test_withdrawals_credit_without_gas() {
    let recipient = Address::from_array([0xdd; 20]);
    let chain = ChainConfig::new(Fork::Shanghai);
    let env = TransitionEnv {
        withdrawals: vec![
            Withdrawal {
                index: 0,
                validator_index: 7,
                address: recipient,
                amount: 2_000_000_000, // 2 ETH in Gwei
            },
            Withdrawal {
                index: 1,
                validator_index: 8,
                address: Address::from_array([0xde; 20]),
                amount: 0,
            },
        ],
        ..london_env()
    };
    let output = transition(
        &chain,
        &EngineConfig::default(),
        funded_alloc(&[]),
        &env,
        &[],
    );
    assert_eq!(
        output.alloc[&recipient].balance,
        Wei::from_gwei(2_000_000_000)
    );
    // The zero-amount withdrawal created nothing.
    assert!(!output.alloc.contains_key(&Address::from_array([0xde; 20])));
    assert_eq!(output.gas_used, 0);
}

#[test]
fn test_eip7623_calldata_floor() {
    // A transaction whose execution is trivial but whose calldata floor
    // exceeds the legacy intrinsic cost.
    let recipient = Address::from_array([0xbe; 20]);
    let data = vec![0xffu8; 100];
    let tx = sign_eip1559(Transaction1559 {
        chain_id: 1,
        nonce: U256::zero(),
        max_priority_fee_per_gas: U256::one(),
        max_fee_per_gas: U256::from(10),
        gas_limit: U256::from(100_000),
        to: Some(recipient),
        value: Wei::zero(),
        data: data.clone(),
        access_list: vec![],
    });

    let chain = ChainConfig::new(Fork::Prague);
    let mut env = london_env();
    env.excess_blob_gas = Some(0);
    let output = transition(
        &chain,
        &EngineConfig::default(),
        funded_alloc(&[]),
        &env,
        &[EthTransactionKind::Eip1559(tx)],
    );

    assert!(output.rejected.is_empty());
    // Floor: 21000 + 100 * 4 tokens * 10 > 21000 + 100 * 16.
    assert_eq!(output.gas_used, 21_000 + 100 * 4 * 10);
}

#[test]
fn test_transaction_against_fresh_state() {
    // Crossing a fork boundary in a transition chain flips the rules.
    let chain = crate::ChainConfig::transition(
        Fork::Shanghai,
        Fork::Cancun,
        crate::Activation::Timestamp(2_000),
    );
    let pre_fork = BlockContext::new(
        &chain,
        &crate::Header {
            number: 1,
            timestamp: 1_999,
            gas_limit: 30_000_000,
            base_fee_per_gas: Some(U256::from(5)),
            ..Default::default()
        },
    );
    assert_eq!(pre_fork.fork, Fork::Shanghai);
    let post_fork = BlockContext::new(
        &chain,
        &crate::Header {
            number: 2,
            timestamp: 2_000,
            gas_limit: 30_000_000,
            base_fee_per_gas: Some(U256::from(5)),
            excess_blob_gas: Some(0),
            ..Default::default()
        },
    );
    assert_eq!(post_fork.fork, Fork::Cancun);
}

#[test]
fn test_apply_transaction_requires_eoa_sender() {
    let chain = ChainConfig::new(Fork::London);
    let env = london_env();
    let context = BlockContext::new(
        &chain,
        &crate::Header {
            number: env.number,
            timestamp: env.timestamp,
            gas_limit: env.gas_limit,
            base_fee_per_gas: env.base_fee,
            ..Default::default()
        },
    );
    let tx = sign_eip1559(Transaction1559 {
        chain_id: 1,
        nonce: U256::zero(),
        max_priority_fee_per_gas: U256::one(),
        max_fee_per_gas: U256::from(10),
        gas_limit: U256::from(21_000),
        to: Some(Address::from_array([0xbe; 20])),
        value: Wei::zero(),
        data: vec![],
        access_list: vec![],
    });

    let mut alloc = funded_alloc(&[]);
    alloc.get_mut(&test_address()).unwrap().code = vec![0x00];
    let mut state = JournaledState::from_accounts(alloc);
    let result = apply_transaction(
        &mut state,
        &context,
        &chain,
        &EngineConfig::default(),
        &EthTransactionKind::Eip1559(tx),
        30_000_000,
    );
    assert_eq!(result.unwrap_err(), TransactionError::SenderNotEoa);
}
