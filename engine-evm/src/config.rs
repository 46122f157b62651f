//! Per-fork rule tables.
//!
//! The interpreter is a single machine parameterized by this struct: gas
//! constants, refund rules, and opcode availability are data, and each fork's
//! table is derived by patching its predecessor's.

/// The rule table for one fork.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gas for `EXTCODESIZE`/`EXTCODECOPY` base (pre-Berlin accounting).
    pub gas_ext_code: u64,
    /// Gas for `EXTCODEHASH` (pre-Berlin accounting).
    pub gas_ext_code_hash: u64,
    /// Gas for `BALANCE` (pre-Berlin accounting).
    pub gas_balance: u64,
    /// Gas for `SLOAD` (pre-Berlin accounting; the warm-read cost afterwards
    /// comes from `gas_storage_read_warm`).
    pub gas_sload: u64,
    /// Gas for an `SSTORE` that creates a slot.
    pub gas_sstore_set: u64,
    /// Gas for an `SSTORE` that updates a live slot.
    pub gas_sstore_reset: u64,
    /// Gas for `SELFDESTRUCT`.
    pub gas_selfdestruct: u64,
    /// Surcharge when `SELFDESTRUCT` sends funds to a dead account.
    pub gas_selfdestruct_new_account: u64,
    /// Base gas for the `CALL` family (pre-Berlin accounting).
    pub gas_call: u64,
    /// Surcharge for a value-bearing call.
    pub gas_call_value: u64,
    /// Surcharge when a value-bearing call creates its target.
    pub gas_new_account: u64,
    /// Gas per byte of exponent for `EXP`.
    pub gas_expbyte: u64,
    /// Intrinsic gas of a contract-creating transaction.
    pub gas_transaction_create: u64,
    /// Intrinsic gas of a message-call transaction.
    pub gas_transaction_call: u64,
    /// Intrinsic gas per zero byte of calldata.
    pub gas_transaction_zero_data: u64,
    /// Intrinsic gas per non-zero byte of calldata.
    pub gas_transaction_non_zero_data: u64,
    /// Intrinsic gas per access-list address.
    pub gas_access_list_address: u64,
    /// Intrinsic gas per access-list storage key.
    pub gas_access_list_storage_key: u64,
    /// Cold account access cost (EIP-2929).
    pub gas_account_access_cold: u64,
    /// Cold storage-slot access cost (EIP-2929).
    pub gas_sload_cold: u64,
    /// Warm read cost for accounts and slots (EIP-2929).
    pub gas_storage_read_warm: u64,
    /// Gas per 32-byte word of init code (EIP-3860).
    pub gas_initcode_word: u64,
    /// Gas per byte of deployed contract code.
    pub gas_code_deposit: u64,
    /// Intrinsic gas per `EIP-7702` authorization tuple.
    pub gas_per_empty_account_authorization: u64,
    /// Refund per authorization whose authority already exists (EIP-7702).
    pub refund_authorization_existing: i64,
    /// `SSTORE` net gas metering (EIP-2200).
    pub sstore_gas_metering: bool,
    /// `SSTORE` faults when gas left is at or below the call stipend
    /// (EIP-2200).
    pub sstore_revert_under_stipend: bool,
    /// Warm/cold account and storage accounting (EIP-2929).
    pub increase_state_access_gas: bool,
    /// EIP-3529: the clear refund drops to the net reset cost plus the
    /// access-list key cost, the selfdestruct refund disappears, and the
    /// refund cap divisor moves from 2 to 5. The refund formulas in
    /// `crate::gas` derive all three from this flag.
    pub decrease_clears_refund: bool,
    /// Reject new code starting with `0xef` (EIP-3541).
    pub disallow_executable_format: bool,
    /// Coinbase starts warm (EIP-3651).
    pub warm_coinbase_address: bool,
    /// Whether empty accounts survive a touch (false from EIP-161 on).
    pub empty_considered_exists: bool,
    /// Deployed contracts start with nonce 1 (EIP-161).
    pub create_increase_nonce: bool,
    /// Frontier only: an unaffordable code deposit leaves the new account
    /// codeless instead of failing the creation.
    pub allow_skipping_code_deposit: bool,
    /// `SELFDESTRUCT` only deletes the account when it was created in the
    /// same transaction (EIP-6780).
    pub selfdestruct_only_in_same_tx: bool,
    /// Operand stack depth limit.
    pub stack_limit: usize,
    /// Frame depth limit.
    pub call_stack_limit: usize,
    /// Deployed code size limit (EIP-170).
    pub create_contract_limit: Option<usize>,
    /// Init code size limit (EIP-3860).
    pub max_initcode_size: Option<usize>,
    /// Gas handed to the callee of a value-bearing call on top of the
    /// forwarded amount.
    pub call_stipend: u64,
    /// Pre-EIP-150: asking to forward more gas than available is an error
    /// instead of being capped.
    pub err_on_call_with_more_gas: bool,
    /// EIP-150: forwarded gas is capped at 63/64 of the remainder.
    pub call_l64_after_gas: bool,
    /// Transaction gas floor from calldata tokens (EIP-7623).
    pub has_floor_data_gas: bool,
    /// Gas per calldata token for the EIP-7623 floor.
    pub gas_floor_token_cost: u64,
    pub has_delegate_call: bool,
    pub has_create2: bool,
    pub has_revert: bool,
    pub has_return_data: bool,
    pub has_static_call: bool,
    pub has_bitwise_shifting: bool,
    pub has_ext_code_hash: bool,
    pub has_chain_id: bool,
    pub has_self_balance: bool,
    pub has_base_fee: bool,
    pub has_prev_randao: bool,
    pub has_push0: bool,
    pub has_blob_hash: bool,
    pub has_blob_base_fee: bool,
    pub has_mcopy: bool,
    pub has_transient_storage: bool,
}

impl Config {
    /// The genesis rules.
    #[must_use]
    pub const fn frontier() -> Self {
        Self {
            gas_ext_code: 20,
            gas_ext_code_hash: 0,
            gas_balance: 20,
            gas_sload: 50,
            gas_sstore_set: 20_000,
            gas_sstore_reset: 5_000,
            gas_selfdestruct: 0,
            gas_selfdestruct_new_account: 0,
            gas_call: 40,
            gas_call_value: 9_000,
            gas_new_account: 25_000,
            gas_expbyte: 10,
            gas_transaction_create: 21_000,
            gas_transaction_call: 21_000,
            gas_transaction_zero_data: 4,
            gas_transaction_non_zero_data: 68,
            gas_access_list_address: 0,
            gas_access_list_storage_key: 0,
            gas_account_access_cold: 0,
            gas_sload_cold: 0,
            gas_storage_read_warm: 0,
            gas_initcode_word: 0,
            gas_code_deposit: 200,
            gas_per_empty_account_authorization: 0,
            refund_authorization_existing: 0,
            sstore_gas_metering: false,
            sstore_revert_under_stipend: false,
            increase_state_access_gas: false,
            decrease_clears_refund: false,
            disallow_executable_format: false,
            warm_coinbase_address: false,
            empty_considered_exists: true,
            create_increase_nonce: false,
            allow_skipping_code_deposit: true,
            selfdestruct_only_in_same_tx: false,
            stack_limit: 1024,
            call_stack_limit: 1024,
            create_contract_limit: None,
            max_initcode_size: None,
            call_stipend: 2_300,
            err_on_call_with_more_gas: true,
            call_l64_after_gas: false,
            has_floor_data_gas: false,
            gas_floor_token_cost: 0,
            has_delegate_call: false,
            has_create2: false,
            has_revert: false,
            has_return_data: false,
            has_static_call: false,
            has_bitwise_shifting: false,
            has_ext_code_hash: false,
            has_chain_id: false,
            has_self_balance: false,
            has_base_fee: false,
            has_prev_randao: false,
            has_push0: false,
            has_blob_hash: false,
            has_blob_base_fee: false,
            has_mcopy: false,
            has_transient_storage: false,
        }
    }

    #[must_use]
    pub const fn homestead() -> Self {
        let mut config = Self::frontier();
        config.gas_transaction_create = 53_000;
        config.has_delegate_call = true;
        config.allow_skipping_code_deposit = false;
        config
    }

    /// EIP-150 gas repricings.
    #[must_use]
    pub const fn tangerine_whistle() -> Self {
        let mut config = Self::homestead();
        config.gas_ext_code = 700;
        config.gas_balance = 400;
        config.gas_sload = 200;
        config.gas_selfdestruct = 5_000;
        config.gas_selfdestruct_new_account = 25_000;
        config.gas_call = 700;
        config.err_on_call_with_more_gas = false;
        config.call_l64_after_gas = true;
        config
    }

    /// EIP-155/160/161/170.
    #[must_use]
    pub const fn spurious_dragon() -> Self {
        let mut config = Self::tangerine_whistle();
        config.gas_expbyte = 50;
        config.empty_considered_exists = false;
        config.create_increase_nonce = true;
        config.create_contract_limit = Some(0x6000);
        config
    }

    #[must_use]
    pub const fn byzantium() -> Self {
        let mut config = Self::spurious_dragon();
        config.has_revert = true;
        config.has_return_data = true;
        config.has_static_call = true;
        config
    }

    /// Constantinople with the Petersburg correction: EIP-1283 net metering
    /// never activated on mainnet, so it is not part of this table.
    #[must_use]
    pub const fn constantinople() -> Self {
        let mut config = Self::byzantium();
        config.has_create2 = true;
        config.has_bitwise_shifting = true;
        config.has_ext_code_hash = true;
        config.gas_ext_code_hash = 400;
        config
    }

    /// EIP-1884 repricings and EIP-2200 net metering.
    #[must_use]
    pub const fn istanbul() -> Self {
        let mut config = Self::constantinople();
        config.gas_balance = 700;
        config.gas_sload = 800;
        config.gas_ext_code_hash = 700;
        config.gas_transaction_non_zero_data = 16;
        config.sstore_gas_metering = true;
        config.sstore_revert_under_stipend = true;
        config.has_chain_id = true;
        config.has_self_balance = true;
        config
    }

    /// EIP-2929/2930 access lists and warm/cold accounting.
    #[must_use]
    pub const fn berlin() -> Self {
        let mut config = Self::istanbul();
        config.gas_access_list_address = 2_400;
        config.gas_access_list_storage_key = 1_900;
        config.gas_account_access_cold = 2_600;
        config.gas_sload_cold = 2_100;
        config.gas_storage_read_warm = 100;
        config.increase_state_access_gas = true;
        config
    }

    /// EIP-1559/3529/3541.
    #[must_use]
    pub const fn london() -> Self {
        let mut config = Self::berlin();
        config.decrease_clears_refund = true;
        config.disallow_executable_format = true;
        config.has_base_fee = true;
        config
    }

    /// The merge: PREVRANDAO replaces DIFFICULTY.
    #[must_use]
    pub const fn paris() -> Self {
        let mut config = Self::london();
        config.has_prev_randao = true;
        config
    }

    /// EIP-3651/3855/3860.
    #[must_use]
    pub const fn shanghai() -> Self {
        let mut config = Self::paris();
        config.warm_coinbase_address = true;
        config.has_push0 = true;
        config.gas_initcode_word = 2;
        config.max_initcode_size = Some(0xc000);
        config
    }

    /// EIP-1153/4844/5656/6780/7516.
    #[must_use]
    pub const fn cancun() -> Self {
        let mut config = Self::shanghai();
        config.selfdestruct_only_in_same_tx = true;
        config.has_blob_hash = true;
        config.has_blob_base_fee = true;
        config.has_mcopy = true;
        config.has_transient_storage = true;
        config
    }

    /// EIP-7702 set-code transactions and EIP-7623 calldata floor.
    #[must_use]
    pub const fn prague() -> Self {
        let mut config = Self::cancun();
        config.gas_per_empty_account_authorization = 25_000;
        config.refund_authorization_existing = 12_500;
        config.has_floor_data_gas = true;
        config.gas_floor_token_cost = 10;
        config
    }

    #[must_use]
    pub const fn osaka() -> Self {
        // Interpreter rules are unchanged; Osaka touches the precompile
        // roster and modexp pricing only.
        Self::prague()
    }
}
