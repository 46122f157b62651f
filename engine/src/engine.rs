//! The state transition function: transaction application and block
//! finalization.

use crate::block::{empty_ommers_hash, Block, Header, Withdrawal};
use crate::dao;
use crate::fork::{BlobSchedule, ChainConfig, Fork};
use crate::receipt::Receipt;
use crate::validation::{blob_gasprice, calc_base_fee, calc_difficulty, calc_excess_blob_gas};
use hearth_engine_evm::runtime::delegation_target;
use hearth_engine_evm::{gas, BlockEnv, Config, JournaledState, Runtime, TxEnv};
use hearth_engine_transactions::eip_4844::VERSIONED_HASH_VERSION_KZG;
use hearth_engine_transactions::{
    secp256k1_half_n, EthTransactionKind, NormalizedEthTransaction,
};
use hearth_engine_trie::ordered_trie_root;
use hearth_engine_types::bloom::Bloom;
use hearth_engine_types::log::Log;
use hearth_engine_types::types::{Address, Wei};
use hearth_engine_types::{keccak256, H256, U256};
use log::debug;
use std::collections::BTreeMap;

/// Caller of the block-level system contracts (EIP-4788 and friends).
#[must_use]
pub fn system_address() -> Address {
    Address::decode("fffffffffffffffffffffffffffffffffffffffe").unwrap_or_else(|_e| Address::zero())
}

/// EIP-4788 beacon roots contract.
#[must_use]
pub fn beacon_roots_address() -> Address {
    Address::decode("000f3df6d732807ef1319fb7b8bb8522d0beac02").unwrap_or_else(|_e| Address::zero())
}

/// EIP-2935 block-hash history contract.
#[must_use]
pub fn history_storage_address() -> Address {
    Address::decode("0000f90827f1c53a10cb7a02335b175320002935").unwrap_or_else(|_e| Address::zero())
}

/// EIP-7002 withdrawal-requests contract.
#[must_use]
pub fn withdrawal_requests_address() -> Address {
    Address::decode("00000961ef480eb55e80d19ad83579a64c007002").unwrap_or_else(|_e| Address::zero())
}

/// EIP-7251 consolidation-requests contract.
#[must_use]
pub fn consolidation_requests_address() -> Address {
    Address::decode("0000bbddc7ce488642fb579f8b00f3a590007251").unwrap_or_else(|_e| Address::zero())
}

/// EIP-6110 deposit contract.
#[must_use]
pub fn deposit_contract_address() -> Address {
    Address::decode("00000000219ab540356cbb839cbe05303d7705fa").unwrap_or_else(|_e| Address::zero())
}

const SYSTEM_CALL_GAS: u64 = 30_000_000;

/// Recognized engine options.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub chain_id: u64,
    /// Assert the computed post-root against the committed one.
    pub verify_state_root: bool,
    /// Emit per-step EIP-3155 trace lines.
    pub trace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chain_id: 1,
            verify_state_root: true,
            trace: false,
        }
    }
}

/// Why a transaction was rejected before execution. No gas is charged and the
/// sender's nonce does not advance.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum TransactionError {
    TypeNotSupported,
    InvalidSignature,
    InvalidChainId,
    NonceMismatch,
    NonceOverflow,
    SenderNotEoa,
    InsufficientBalance,
    IntrinsicGasExceedsLimit,
    GasLimitOverflow,
    GasAllowanceExceeded,
    MaxFeeLessThanBaseFee,
    PriorityFeeExceedsMaxFee,
    BlobTransactionWithoutBlobs,
    TooManyBlobs,
    InvalidBlobVersionedHash,
    BlobGasPriceTooLow,
    EmptyAuthorizationList,
    InitCodeTooLarge,
}

impl TransactionError {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TypeNotSupported => "ERR_TX_TYPE_NOT_SUPPORTED",
            Self::InvalidSignature => "ERR_INVALID_SIGNATURE",
            Self::InvalidChainId => "ERR_INVALID_CHAIN_ID",
            Self::NonceMismatch => "ERR_NONCE_MISMATCH",
            Self::NonceOverflow => "ERR_NONCE_OVERFLOW",
            Self::SenderNotEoa => "ERR_SENDER_NOT_EOA",
            Self::InsufficientBalance => "ERR_INSUFFICIENT_BALANCE",
            Self::IntrinsicGasExceedsLimit => "ERR_INTRINSIC_GAS",
            Self::GasLimitOverflow => "ERR_GAS_LIMIT_OVERFLOW",
            Self::GasAllowanceExceeded => "ERR_BLOCK_GAS_EXCEEDED",
            Self::MaxFeeLessThanBaseFee => "ERR_MAX_FEE_LT_BASE_FEE",
            Self::PriorityFeeExceedsMaxFee => "ERR_PRIORITY_FEE_GT_MAX_FEE",
            Self::BlobTransactionWithoutBlobs => "ERR_BLOB_TX_WITHOUT_BLOBS",
            Self::TooManyBlobs => "ERR_TOO_MANY_BLOBS",
            Self::InvalidBlobVersionedHash => "ERR_INVALID_BLOB_HASH",
            Self::BlobGasPriceTooLow => "ERR_BLOB_GAS_PRICE_TOO_LOW",
            Self::EmptyAuthorizationList => "ERR_EMPTY_AUTHORIZATION_LIST",
            Self::InitCodeTooLarge => "ERR_INIT_CODE_TOO_LARGE",
        }
    }
}

/// The observable result of one applied transaction.
#[derive(Debug)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub gas_used: u64,
    pub blob_gas_used: u64,
    pub logs: Vec<Log>,
    pub output: Vec<u8>,
    pub contract_address: Option<Address>,
}

/// The per-block execution context shared by all its transactions.
#[derive(Debug, Clone)]
pub struct BlockContext {
    pub fork: Fork,
    pub env: BlockEnv,
    pub excess_blob_gas: u64,
    pub parent_beacon_block_root: Option<H256>,
    pub parent_hash: H256,
}

impl BlockContext {
    /// Builds the context for one block under a chain configuration.
    #[must_use]
    pub fn new(chain: &ChainConfig, header: &Header) -> Self {
        let fork = chain.fork_at(header.number, header.timestamp);
        let excess_blob_gas = header.excess_blob_gas.unwrap_or(0);
        let blob_base_fee = fork
            .blob_schedule()
            .map_or_else(U256::zero, |schedule| {
                blob_gasprice(excess_blob_gas, &schedule)
            });
        Self {
            fork,
            env: BlockEnv {
                number: U256::from(header.number),
                coinbase: header.beneficiary,
                timestamp: U256::from(header.timestamp),
                gas_limit: U256::from(header.gas_limit),
                difficulty: header.difficulty,
                prev_randao: header.mix_hash,
                base_fee: header.base_fee_per_gas.unwrap_or_default(),
                blob_base_fee,
                chain_id: U256::from(chain.chain_id),
                block_hashes: Vec::new(),
            },
            excess_blob_gas,
            parent_beacon_block_root: header.parent_beacon_block_root,
            parent_hash: header.parent_hash,
        }
    }
}

/// Applies one transaction against `state`, consuming at most
/// `gas_available` of the block's gas.
///
/// On `Err` the state is untouched. On `Ok` the state holds the post-
/// transaction world and the outcome carries everything a receipt needs.
#[allow(clippy::too_many_lines)]
pub fn apply_transaction(
    state: &mut JournaledState,
    context: &BlockContext,
    chain: &ChainConfig,
    engine_config: &EngineConfig,
    tx: &EthTransactionKind,
    gas_available: u64,
) -> Result<ExecutionOutcome, TransactionError> {
    let fork = context.fork;
    let config = fork.evm_config();
    let precompiles = fork.precompiles();

    if !fork.accepts_transaction_type(tx.type_byte()) {
        return Err(TransactionError::TypeNotSupported);
    }
    validate_signature_bounds(tx, fork)?;

    let normalized = NormalizedEthTransaction::try_from(tx.clone())
        .map_err(|_e| TransactionError::InvalidSignature)?;
    let sender = normalized.address;

    validate_chain_id(&normalized, tx, fork, chain.chain_id)?;

    let gas_limit: u64 = normalized
        .gas_limit
        .try_into()
        .map_err(|_e| TransactionError::GasLimitOverflow)?;
    if gas_limit > gas_available {
        return Err(TransactionError::GasAllowanceExceeded);
    }

    if normalized.to.is_none() {
        if let Some(limit) = config.max_initcode_size {
            if normalized.data.len() > limit {
                return Err(TransactionError::InitCodeTooLarge);
            }
        }
    }

    let intrinsic_gas = normalized
        .intrinsic_gas(&config)
        .ok_or(TransactionError::IntrinsicGasExceedsLimit)?;
    if intrinsic_gas > gas_limit {
        return Err(TransactionError::IntrinsicGasExceedsLimit);
    }
    let floor_gas = normalized
        .floor_data_gas(&config)
        .ok_or(TransactionError::IntrinsicGasExceedsLimit)?;
    if config.has_floor_data_gas && floor_gas > gas_limit {
        return Err(TransactionError::IntrinsicGasExceedsLimit);
    }

    // Fee market checks and the effective gas price.
    let base_fee = context.env.base_fee;
    let effective_gas_price = if config.has_base_fee {
        if normalized.max_fee_per_gas < base_fee {
            return Err(TransactionError::MaxFeeLessThanBaseFee);
        }
        if normalized.max_priority_fee_per_gas > normalized.max_fee_per_gas {
            return Err(TransactionError::PriorityFeeExceedsMaxFee);
        }
        core::cmp::min(
            normalized.max_fee_per_gas,
            base_fee + normalized.max_priority_fee_per_gas,
        )
    } else {
        normalized.max_fee_per_gas
    };

    // Blob checks and fees (EIP-4844).
    let blob_gas_used = validate_blobs(&normalized, tx, fork, context)?;
    let blob_fee = context.env.blob_base_fee * U256::from(blob_gas_used);
    let max_blob_fee = normalized.max_fee_per_blob_gas.unwrap_or_default()
        * U256::from(blob_gas_used);

    if matches!(tx, EthTransactionKind::Eip7702(_)) && normalized.authorization_list.is_empty() {
        return Err(TransactionError::EmptyAuthorizationList);
    }

    // Sender checks (I1).
    let sender_code = state.code(&sender).to_vec();
    if !sender_code.is_empty() && delegation_target(&sender_code).is_none() {
        return Err(TransactionError::SenderNotEoa);
    }
    let sender_nonce = state.nonce(&sender);
    if U256::from(sender_nonce) != normalized.nonce {
        return Err(TransactionError::NonceMismatch);
    }
    if sender_nonce == u64::MAX {
        return Err(TransactionError::NonceOverflow);
    }
    let max_cost = U256::from(gas_limit) * normalized.max_fee_per_gas
        + normalized.value.raw()
        + max_blob_fee;
    if state.balance(&sender).raw() < max_cost {
        return Err(TransactionError::InsufficientBalance);
    }

    // Everything checked; from here on the transaction is part of the block.
    debug!(
        target: "engine",
        "applying tx from {} nonce {} gas {}",
        sender.encode(),
        sender_nonce,
        gas_limit
    );

    let upfront = U256::from(gas_limit) * effective_gas_price + blob_fee;
    state.set_balance(
        sender,
        Wei::new(state.balance(&sender).raw() - upfront),
    );
    state.inc_nonce(sender);

    // Pre-warm the access list, the actors, and (post-Berlin) the precompile
    // roster. Pre-warming never creates accounts (I6).
    if config.increase_state_access_gas {
        state.warm_unconditionally(sender, &[]);
        if let Some(to) = normalized.to {
            state.warm_unconditionally(to, &[]);
        }
        for address in precompiles.addresses() {
            state.warm_unconditionally(*address, &[]);
        }
        for entry in &normalized.access_list {
            state.warm_unconditionally(entry.address, &entry.storage_keys);
        }
        if config.warm_coinbase_address {
            state.warm_unconditionally(context.env.coinbase, &[]);
        }
    }

    apply_authorizations(state, &normalized, &config, chain.chain_id);

    let tx_env = TxEnv {
        origin: sender,
        gas_price: effective_gas_price,
        blob_hashes: normalized.blob_versioned_hashes.clone(),
    };
    let mut runtime = Runtime::new(
        core::mem::take(state),
        context.env.clone(),
        tx_env,
        &config,
        &precompiles,
    );
    runtime.trace_enabled = engine_config.trace;

    let execution_gas = gas_limit - intrinsic_gas;
    let (success, output, contract_address, gas_left) = match normalized.to {
        Some(to) => {
            let result = runtime.transact_call(
                sender,
                to,
                normalized.value,
                normalized.data.clone(),
                execution_gas,
            );
            (
                result.reason.is_succeed(),
                result.output,
                None,
                result.gas_left,
            )
        }
        None => {
            let result = runtime.transact_create(
                sender,
                normalized.value,
                normalized.data.clone(),
                execution_gas,
            );
            (
                result.reason.is_succeed(),
                Vec::new(),
                result.address.filter(|_a| result.reason.is_succeed()),
                result.gas_left,
            )
        }
    };

    *state = runtime.state;

    // Gas accounting: refund cap (I4), then the EIP-7623 floor.
    let mut gas_used = gas_limit - gas_left;
    let refund = u64::try_from(state.refund().max(0)).unwrap_or(0);
    let capped_refund = core::cmp::min(refund, gas_used / gas::max_refund_quotient(&config));
    gas_used -= capped_refund;
    if config.has_floor_data_gas {
        gas_used = core::cmp::max(gas_used, floor_gas);
    }

    // Return the unused portion to the sender, pay the coinbase its tip.
    let gas_refund = U256::from(gas_limit - gas_used) * effective_gas_price;
    state.add_balance(sender, Wei::new(gas_refund));

    let priority_fee = if config.has_base_fee {
        effective_gas_price - base_fee
    } else {
        effective_gas_price
    };
    if !config.empty_considered_exists {
        state.touch(context.env.coinbase);
    }
    state.add_balance(
        context.env.coinbase,
        Wei::new(U256::from(gas_used) * priority_fee),
    );

    // Deletions: self-destructs first, then the EIP-161 sweep (I3).
    state.finalize_selfdestructs();
    if !config.empty_considered_exists {
        state.remove_touched_empty_accounts();
    }

    let logs = state.take_logs();
    state.clear_transaction_substate();

    Ok(ExecutionOutcome {
        success,
        gas_used,
        blob_gas_used,
        logs,
        output,
        contract_address,
    })
}

/// EIP-2 signature malleability bound and parity sanity per envelope.
fn validate_signature_bounds(tx: &EthTransactionKind, fork: Fork) -> Result<(), TransactionError> {
    let (parity_ok, s) = match tx {
        EthTransactionKind::Legacy(tx) => (true, tx.s),
        EthTransactionKind::Eip2930(tx) => (tx.parity <= 1, tx.s),
        EthTransactionKind::Eip1559(tx) => (tx.parity <= 1, tx.s),
        EthTransactionKind::Eip4844(tx) => (tx.parity <= 1, tx.s),
        EthTransactionKind::Eip7702(tx) => (tx.parity <= 1, tx.s),
    };
    if !parity_ok {
        return Err(TransactionError::InvalidSignature);
    }
    if fork >= Fork::Homestead && s > secp256k1_half_n() {
        return Err(TransactionError::InvalidSignature);
    }
    Ok(())
}

fn validate_chain_id(
    normalized: &NormalizedEthTransaction,
    tx: &EthTransactionKind,
    fork: Fork,
    chain_id: u64,
) -> Result<(), TransactionError> {
    match normalized.chain_id {
        None => Ok(()),
        Some(id) => {
            // Legacy replay protection only exists from Spurious Dragon on.
            if matches!(tx, EthTransactionKind::Legacy(_)) && fork < Fork::SpuriousDragon {
                return Err(TransactionError::InvalidChainId);
            }
            if id == chain_id {
                Ok(())
            } else {
                Err(TransactionError::InvalidChainId)
            }
        }
    }
}

/// Validates blob fields and returns the blob gas this transaction uses.
fn validate_blobs(
    normalized: &NormalizedEthTransaction,
    tx: &EthTransactionKind,
    fork: Fork,
    context: &BlockContext,
) -> Result<u64, TransactionError> {
    if !matches!(tx, EthTransactionKind::Eip4844(_)) {
        return Ok(0);
    }
    let Some(schedule) = fork.blob_schedule() else {
        return Err(TransactionError::TypeNotSupported);
    };
    if normalized.blob_versioned_hashes.is_empty() {
        return Err(TransactionError::BlobTransactionWithoutBlobs);
    }
    let count = normalized.blob_versioned_hashes.len() as u64;
    if count > schedule.max_blob_count {
        return Err(TransactionError::TooManyBlobs);
    }
    for hash in &normalized.blob_versioned_hashes {
        if hash.as_bytes()[0] != VERSIONED_HASH_VERSION_KZG {
            return Err(TransactionError::InvalidBlobVersionedHash);
        }
    }
    if normalized.max_fee_per_blob_gas.unwrap_or_default() < context.env.blob_base_fee {
        return Err(TransactionError::BlobGasPriceTooLow);
    }
    Ok(count * BlobSchedule::GAS_PER_BLOB)
}

/// EIP-7702: installs delegation designators for valid authorizations.
/// Invalid tuples are skipped, never fatal.
fn apply_authorizations(
    state: &mut JournaledState,
    normalized: &NormalizedEthTransaction,
    config: &Config,
    chain_id: u64,
) {
    for auth in &normalized.authorization_list {
        if !auth.chain_id.is_zero() && auth.chain_id != U256::from(chain_id) {
            continue;
        }
        if auth.nonce == u64::MAX {
            continue;
        }
        if auth.parity > 1 || auth.s > secp256k1_half_n() {
            continue;
        }
        let Ok(authority) = auth.authority() else {
            continue;
        };

        state.warm_unconditionally(authority, &[]);

        let code = state.code(&authority).to_vec();
        if !code.is_empty() && delegation_target(&code).is_none() {
            continue;
        }
        if state.nonce(&authority) != auth.nonce {
            continue;
        }
        if state.exists(&authority) {
            state.add_refund(
                config.gas_per_empty_account_authorization as i64
                    - config.refund_authorization_existing as i64,
            );
        }

        if auth.address == Address::zero() {
            state.set_code(authority, Vec::new());
        } else {
            state.set_code(authority, auth.delegation_designator());
        }
        state.inc_nonce(authority);
    }
}

/// Runs a block-level system contract. Returns the call output, or `None`
/// when the contract does not exist (the call is skipped entirely).
pub fn system_call(
    state: &mut JournaledState,
    context: &BlockContext,
    target: Address,
    input: Vec<u8>,
) -> Option<Vec<u8>> {
    if state.code(&target).is_empty() {
        return None;
    }
    let fork = context.fork;
    let config = fork.evm_config();
    let precompiles = fork.precompiles();
    let mut runtime = Runtime::new(
        core::mem::take(state),
        context.env.clone(),
        TxEnv {
            origin: system_address(),
            gas_price: U256::zero(),
            blob_hashes: Vec::new(),
        },
        &config,
        &precompiles,
    );
    let result = runtime.transact_call(system_address(), target, Wei::zero(), input, SYSTEM_CALL_GAS);
    *state = runtime.state;
    // System calls do not take part in the transaction substate rules.
    state.clear_transaction_substate();
    result.reason.is_succeed().then_some(result.output)
}

/// Everything `apply_block` produces.
#[derive(Debug)]
pub struct BlockOutcome {
    pub state: JournaledState,
    pub receipts: Vec<Receipt>,
    pub gas_used: u64,
    pub logs_bloom: Bloom,
    pub requests_hash: Option<H256>,
    pub state_root: H256,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum BlockError {
    InvalidTransaction(TransactionError),
    GasUsedMismatch,
    BlobGasUsedMismatch,
    BlobGasExceeded,
    StateRootMismatch { expected: H256, computed: H256 },
    TransactionsRootMismatch,
    ReceiptsRootMismatch,
    LogsBloomMismatch,
    WithdrawalsRootMismatch,
    RequestsHashMismatch,
    OmmersNotAllowed,
    BaseFeeMismatch { expected: U256, committed: U256 },
    ExcessBlobGasMismatch { expected: u64, committed: u64 },
    DifficultyMismatch { expected: U256, committed: U256 },
    MalformedHeader(&'static str),
}

impl From<TransactionError> for BlockError {
    fn from(e: TransactionError) -> Self {
        Self::InvalidTransaction(e)
    }
}

/// Applies a whole block: header checks, system pre-hooks, every transaction
/// in order, withdrawals, rewards, post-hooks, and the final root
/// comparisons.
///
/// When the parent header is supplied, the derived header fields (base fee,
/// excess blob gas, pre-merge difficulty) are verified against it; a genesis
/// block or a detached `t8n`-style run passes `None` and skips those checks.
pub fn apply_block(
    pre_state: BTreeMap<Address, hearth_engine_evm::AccountState>,
    block: &Block,
    parent: Option<&Header>,
    chain: &ChainConfig,
    engine_config: &EngineConfig,
) -> Result<BlockOutcome, BlockError> {
    let header = &block.header;
    let context = BlockContext::new(chain, header);
    let fork = context.fork;

    validate_header_shape(block, fork)?;
    if let Some(parent) = parent {
        validate_against_parent(header, parent, fork)?;
    }

    let mut state = JournaledState::from_accounts(pre_state);

    if chain.is_dao_block(header.number) {
        dao::apply_dao_fork(
            &mut state,
            &chain.dao_drain_list,
            dao::dao_hardfork_beneficiary(),
        );
    }

    apply_pre_hooks(&mut state, &context);

    let mut receipts: Vec<Receipt> = Vec::with_capacity(block.transactions.len());
    let mut cumulative_gas = 0u64;
    let mut total_blob_gas = 0u64;
    for tx in &block.transactions {
        let outcome = apply_transaction(
            &mut state,
            &context,
            chain,
            engine_config,
            tx,
            header.gas_limit - cumulative_gas,
        )?;
        cumulative_gas += outcome.gas_used;
        total_blob_gas += outcome.blob_gas_used;
        receipts.push(Receipt::new(
            tx.type_byte(),
            outcome.success,
            cumulative_gas,
            outcome.logs,
        ));
    }

    if cumulative_gas != header.gas_used {
        return Err(BlockError::GasUsedMismatch);
    }
    if let Some(schedule) = fork.blob_schedule() {
        if total_blob_gas > schedule.max_blob_gas_per_block() {
            return Err(BlockError::BlobGasExceeded);
        }
        if header.blob_gas_used != Some(total_blob_gas) {
            return Err(BlockError::BlobGasUsedMismatch);
        }
    }

    if let Some(withdrawals) = &block.withdrawals {
        apply_withdrawals(&mut state, withdrawals);
    }

    if let Some(reward) = fork.block_reward() {
        apply_block_rewards(&mut state, block, reward);
    }

    let requests_hash = apply_post_hooks(&mut state, &context, &receipts);
    if fork >= Fork::Prague && header.requests_hash != requests_hash {
        return Err(BlockError::RequestsHashMismatch);
    }

    // Commitments.
    let transactions_root = ordered_trie_root(block.transactions.iter().map(|tx| {
        let bytes: Vec<u8> = tx.into();
        bytes
    }));
    if transactions_root != header.transactions_root {
        return Err(BlockError::TransactionsRootMismatch);
    }
    let receipts_root = ordered_trie_root(receipts.iter().map(Receipt::encode_for_trie));
    if receipts_root != header.receipts_root {
        return Err(BlockError::ReceiptsRootMismatch);
    }
    let mut logs_bloom = Bloom::default();
    for receipt in &receipts {
        logs_bloom.accrue_bloom(&receipt.logs_bloom);
    }
    if logs_bloom != header.logs_bloom {
        return Err(BlockError::LogsBloomMismatch);
    }
    if let Some(withdrawals) = &block.withdrawals {
        let withdrawals_root = ordered_trie_root(
            withdrawals.iter().map(|w| rlp::encode(w).to_vec()),
        );
        if Some(withdrawals_root) != header.withdrawals_root {
            return Err(BlockError::WithdrawalsRootMismatch);
        }
    }

    let state_root = state.state_root();
    if engine_config.verify_state_root && state_root != header.state_root {
        return Err(BlockError::StateRootMismatch {
            expected: header.state_root,
            computed: state_root,
        });
    }

    Ok(BlockOutcome {
        state,
        receipts,
        gas_used: cumulative_gas,
        logs_bloom,
        requests_hash,
        state_root,
    })
}

fn validate_header_shape(block: &Block, fork: Fork) -> Result<(), BlockError> {
    let header = &block.header;
    if header.gas_used > header.gas_limit {
        return Err(BlockError::MalformedHeader("gas_used above gas_limit"));
    }
    if (fork >= Fork::London) != header.base_fee_per_gas.is_some() {
        return Err(BlockError::MalformedHeader("base fee presence"));
    }
    if (fork >= Fork::Shanghai) != header.withdrawals_root.is_some() {
        return Err(BlockError::MalformedHeader("withdrawals root presence"));
    }
    if (fork >= Fork::Shanghai) != block.withdrawals.is_some() {
        return Err(BlockError::MalformedHeader("withdrawals presence"));
    }
    if (fork >= Fork::Cancun) != header.excess_blob_gas.is_some() {
        return Err(BlockError::MalformedHeader("excess blob gas presence"));
    }
    if fork >= Fork::Paris {
        if !block.ommers.is_empty() || header.ommers_hash != empty_ommers_hash() {
            return Err(BlockError::OmmersNotAllowed);
        }
        if !header.difficulty.is_zero() {
            return Err(BlockError::MalformedHeader("nonzero post-merge difficulty"));
        }
    }
    Ok(())
}

/// Verifies the header fields that are functions of the parent header: chain
/// continuity, the EIP-1559 base fee, the EIP-4844 excess blob gas, and the
/// proof-of-work difficulty.
fn validate_against_parent(header: &Header, parent: &Header, fork: Fork) -> Result<(), BlockError> {
    if header.parent_hash != parent.hash() {
        return Err(BlockError::MalformedHeader("parent hash mismatch"));
    }
    if header.number != parent.number + 1 {
        return Err(BlockError::MalformedHeader("non-consecutive block number"));
    }
    if header.timestamp <= parent.timestamp {
        return Err(BlockError::MalformedHeader("timestamp not increasing"));
    }

    if fork >= Fork::London {
        let expected = calc_base_fee(
            parent.gas_limit,
            parent.gas_used,
            parent.base_fee_per_gas.unwrap_or_default(),
            parent.base_fee_per_gas.is_some(),
        );
        if header.base_fee_per_gas != Some(expected) {
            return Err(BlockError::BaseFeeMismatch {
                expected,
                committed: header.base_fee_per_gas.unwrap_or_default(),
            });
        }
    }

    if let Some(schedule) = fork.blob_schedule() {
        let expected = calc_excess_blob_gas(
            parent.excess_blob_gas.unwrap_or(0),
            parent.blob_gas_used.unwrap_or(0),
            &schedule,
        );
        if header.excess_blob_gas != Some(expected) {
            return Err(BlockError::ExcessBlobGasMismatch {
                expected,
                committed: header.excess_blob_gas.unwrap_or(0),
            });
        }
    }

    if fork < Fork::Paris {
        let expected = calc_difficulty(
            fork,
            header.number,
            header.timestamp,
            parent.timestamp,
            parent.difficulty,
            parent.ommers_hash != empty_ommers_hash(),
        );
        if header.difficulty != expected {
            return Err(BlockError::DifficultyMismatch {
                expected,
                committed: header.difficulty,
            });
        }
    }

    Ok(())
}

fn apply_pre_hooks(state: &mut JournaledState, context: &BlockContext) {
    if context.fork >= Fork::Cancun {
        if let Some(root) = context.parent_beacon_block_root {
            system_call(
                state,
                context,
                beacon_roots_address(),
                root.as_bytes().to_vec(),
            );
        }
    }
    if context.fork >= Fork::Prague {
        system_call(
            state,
            context,
            history_storage_address(),
            context.parent_hash.as_bytes().to_vec(),
        );
    }
}

fn apply_withdrawals(state: &mut JournaledState, withdrawals: &[Withdrawal]) {
    for withdrawal in withdrawals {
        // Zero-amount withdrawals neither credit nor create anything.
        if withdrawal.amount == 0 {
            continue;
        }
        let credited = state
            .balance(&withdrawal.address)
            .saturating_add(withdrawal.amount_in_wei());
        state.set_balance(withdrawal.address, credited);
    }
}

fn apply_block_rewards(state: &mut JournaledState, block: &Block, reward: Wei) {
    let miner_reward = reward.saturating_add(Wei::new(
        reward.raw() * U256::from(block.ommers.len()) / U256::from(32),
    ));
    let credited = state
        .balance(&block.header.beneficiary)
        .saturating_add(miner_reward);
    state.set_balance(block.header.beneficiary, credited);

    for ommer in &block.ommers {
        // (8 + ommer.number - block.number) * reward / 8
        let depth = block.header.number.saturating_sub(ommer.number);
        let ommer_reward = Wei::new(
            reward.raw() * U256::from(8u64.saturating_sub(depth)) / U256::from(8),
        );
        let credited = state
            .balance(&ommer.beneficiary)
            .saturating_add(ommer_reward);
        state.set_balance(ommer.beneficiary, credited);
    }
}

/// Post-block system calls and the EIP-7685 requests commitment.
pub fn apply_post_hooks(
    state: &mut JournaledState,
    context: &BlockContext,
    receipts: &[Receipt],
) -> Option<H256> {
    if context.fork < Fork::Prague {
        return None;
    }

    let deposits = extract_deposit_requests(receipts);
    let withdrawals =
        system_call(state, context, withdrawal_requests_address(), Vec::new()).unwrap_or_default();
    let consolidations =
        system_call(state, context, consolidation_requests_address(), Vec::new())
            .unwrap_or_default();

    Some(compute_requests_hash(&[
        (0x00, deposits),
        (0x01, withdrawals),
        (0x02, consolidations),
    ]))
}

/// `sha256(sha256(type0 ++ data0) ++ sha256(type1 ++ data1) ++ ...)`,
/// skipping empty request payloads (EIP-7685).
#[must_use]
pub fn compute_requests_hash(requests: &[(u8, Vec<u8>)]) -> H256 {
    use sha2::Digest;

    let mut outer = sha2::Sha256::new();
    for (request_type, data) in requests {
        if data.is_empty() {
            continue;
        }
        let mut inner = sha2::Sha256::new();
        inner.update([*request_type]);
        inner.update(data);
        outer.update(inner.finalize());
    }
    H256::from_slice(&outer.finalize())
}

/// The event signature of the deposit contract's `DepositEvent`.
#[must_use]
pub fn deposit_event_topic() -> H256 {
    keccak256(b"DepositEvent(bytes,bytes,bytes,bytes,bytes)")
}

/// Pulls EIP-6110 deposit requests out of the block's logs. The ABI layout of
/// `DepositEvent` is fixed, so the field positions are constants.
fn extract_deposit_requests(receipts: &[Receipt]) -> Vec<u8> {
    let topic = deposit_event_topic();
    let contract = deposit_contract_address();
    let mut out = Vec::new();
    for receipt in receipts {
        for log in &receipt.logs {
            if log.address != contract || log.topics.first() != Some(&topic) {
                continue;
            }
            if log.data.len() != 576 {
                continue;
            }
            // pubkey(48) ++ withdrawal_credentials(32) ++ amount(8) ++
            // signature(96) ++ index(8)
            out.extend_from_slice(&log.data[192..240]);
            out.extend_from_slice(&log.data[288..320]);
            out.extend_from_slice(&log.data[352..360]);
            out.extend_from_slice(&log.data[416..512]);
            out.extend_from_slice(&log.data[544..552]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_hash_of_no_requests() {
        // sha256 of the empty string.
        assert_eq!(
            hex::encode(compute_requests_hash(&[
                (0x00, Vec::new()),
                (0x01, Vec::new()),
                (0x02, Vec::new()),
            ])),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_requests_hash_skips_empty_payloads() {
        let only_deposits = compute_requests_hash(&[(0x00, vec![1, 2, 3])]);
        let with_empty_rest = compute_requests_hash(&[
            (0x00, vec![1, 2, 3]),
            (0x01, Vec::new()),
            (0x02, Vec::new()),
        ]);
        assert_eq!(only_deposits, with_empty_rest);
    }

    #[test]
    fn test_system_addresses_decode() {
        assert_ne!(system_address(), Address::zero());
        assert_ne!(beacon_roots_address(), Address::zero());
        assert_ne!(history_storage_address(), Address::zero());
        assert_ne!(withdrawal_requests_address(), Address::zero());
        assert_ne!(consolidation_requests_address(), Address::zero());
        assert_ne!(deposit_contract_address(), Address::zero());
    }

    #[test]
    fn test_deposit_event_topic_constant() {
        assert_eq!(
            hex::encode(deposit_event_topic()),
            "649bbc62d0e31342afea4e5cd82d4049e7e1ee912fc0889aa790803be39038c5"
        );
    }
}
