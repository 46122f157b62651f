//! The frame executor.
//!
//! Spawns, runs, and reconciles call and creation frames against the
//! journaled state. Frames recurse synchronously; the depth limit bounds the
//! recursion at 1024.

use crate::config::Config;
use crate::env::{BlockEnv, TxEnv};
use crate::error::{ExitError, ExitReason, ExitSucceed};
use crate::frame::{Context, Frame};
use crate::instructions::{self, Control};
use crate::opcode::Opcode;
use crate::state::JournaledState;
use hearth_engine_precompiles::{self as precompiles, Precompiles};
use hearth_engine_types::types::{Address, EthGas, Wei};
use hearth_engine_types::{keccak256, H256, U256};
use log::trace;

/// The three-byte prefix of an EIP-7702 delegation designator.
pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

/// Extracts the delegation target from account code, if the code is an
/// EIP-7702 delegation designator.
#[must_use]
pub fn delegation_target(code: &[u8]) -> Option<Address> {
    if code.len() == 23 && code[..3] == DELEGATION_PREFIX {
        Address::try_from_slice(&code[3..]).ok()
    } else {
        None
    }
}

pub struct CallParams {
    /// Account whose code runs.
    pub code_address: Address,
    /// Account whose storage and balance the frame acts on.
    pub target: Address,
    pub caller: Address,
    /// `Some` transfers the amount from caller to target; `None` (delegate
    /// call) moves nothing.
    pub transfer_value: Option<Wei>,
    /// What `CALLVALUE` reports inside the frame.
    pub apparent_value: U256,
    pub input: Vec<u8>,
    pub gas_limit: u64,
    pub is_static: bool,
    pub depth: usize,
}

pub struct CallResult {
    pub reason: ExitReason,
    pub output: Vec<u8>,
    pub gas_left: u64,
}

pub struct CreateParams {
    pub caller: Address,
    pub value: Wei,
    pub init_code: Vec<u8>,
    pub gas_limit: u64,
    /// `Some` selects CREATE2 addressing.
    pub salt: Option<H256>,
    pub depth: usize,
}

pub struct CreateResult {
    pub reason: ExitReason,
    pub address: Option<Address>,
    pub output: Vec<u8>,
    pub gas_left: u64,
}

/// Execution engine for one transaction: owns the journaled state and the
/// environment, and runs frames against them.
pub struct Runtime<'a> {
    pub state: JournaledState,
    pub block: BlockEnv,
    pub tx: TxEnv,
    pub config: &'a Config,
    pub precompiles: &'a Precompiles,
    /// Emit an EIP-3155-shaped line per step through the `log` facade.
    pub trace_enabled: bool,
}

impl<'a> Runtime<'a> {
    #[must_use]
    pub fn new(
        state: JournaledState,
        block: BlockEnv,
        tx: TxEnv,
        config: &'a Config,
        precompiles: &'a Precompiles,
    ) -> Self {
        Self {
            state,
            block,
            tx,
            config,
            precompiles,
            trace_enabled: false,
        }
    }

    /// Runs the root frame of a message-call transaction.
    pub fn transact_call(
        &mut self,
        caller: Address,
        target: Address,
        value: Wei,
        input: Vec<u8>,
        gas_limit: u64,
    ) -> CallResult {
        self.call_inner(CallParams {
            code_address: target,
            target,
            caller,
            transfer_value: Some(value),
            apparent_value: value.raw(),
            input,
            gas_limit,
            is_static: false,
            depth: 0,
        })
    }

    /// Runs the root frame of a creation transaction. The sender's nonce has
    /// already been consumed by the transaction itself, so the deployment
    /// address derives from `nonce - 1`.
    pub fn transact_create(
        &mut self,
        caller: Address,
        value: Wei,
        init_code: Vec<u8>,
        gas_limit: u64,
    ) -> CreateResult {
        let nonce = U256::from(self.state.nonce(&caller)) - U256::one();
        let address = Address::from_create(&caller, nonce);
        self.create_at(
            CreateParams {
                caller,
                value,
                init_code,
                gas_limit,
                salt: None,
                depth: 0,
            },
            address,
            false,
        )
    }

    pub(crate) fn call_inner(&mut self, params: CallParams) -> CallResult {
        if params.depth > self.config.call_stack_limit {
            return CallResult {
                reason: ExitReason::Error(ExitError::CallDepthExceeded),
                output: Vec::new(),
                gas_left: params.gas_limit,
            };
        }

        let checkpoint = self.state.checkpoint();
        self.state.touch(params.target);

        // Before EIP-161 a call target springs into existence even without
        // receiving value.
        if self.config.empty_considered_exists
            && !self.state.exists(&params.target)
            && !self.precompiles.contains(&params.code_address)
        {
            self.state.set_balance(params.target, Wei::zero());
        }

        if let Some(value) = params.transfer_value {
            if let Err(e) = self.state.transfer(params.caller, params.target, value) {
                self.state.revert_to(checkpoint);
                return CallResult {
                    reason: ExitReason::Error(e),
                    output: Vec::new(),
                    gas_left: params.gas_limit,
                };
            }
        }

        if self.precompiles.contains(&params.code_address) {
            return self.run_precompile(&params, checkpoint);
        }

        let mut code = self.state.code(&params.code_address).to_vec();
        let mut gas_limit = params.gas_limit;
        // An EIP-7702 delegation designator executes the delegate's code and
        // charges the extra account access before the frame starts.
        if let Some(delegate) = delegation_target(&code) {
            let cold = self.state.access_address(delegate);
            let access_cost = if cold {
                self.config.gas_account_access_cold
            } else {
                self.config.gas_storage_read_warm
            };
            if gas_limit < access_cost {
                self.state.revert_to(checkpoint);
                return CallResult {
                    reason: ExitReason::Error(ExitError::OutOfGas),
                    output: Vec::new(),
                    gas_left: 0,
                };
            }
            gas_limit -= access_cost;
            code = self.state.code(&delegate).to_vec();
        }
        let mut frame = Frame::new(
            code,
            params.input,
            Context {
                address: params.target,
                caller: params.caller,
                apparent_value: params.apparent_value,
            },
            gas_limit,
            params.is_static,
            params.depth,
            self.config.stack_limit,
        );

        let reason = self.execute(&mut frame);
        match reason {
            ExitReason::Succeed(_) => {
                self.state.commit(checkpoint);
                CallResult {
                    reason,
                    output: frame.output,
                    gas_left: frame.gas.gas_left(),
                }
            }
            ExitReason::Revert => {
                self.state.revert_to(checkpoint);
                CallResult {
                    reason,
                    output: frame.output,
                    gas_left: frame.gas.gas_left(),
                }
            }
            ExitReason::Error(_) => {
                self.state.revert_to(checkpoint);
                CallResult {
                    reason,
                    output: Vec::new(),
                    gas_left: 0,
                }
            }
        }
    }

    fn run_precompile(
        &mut self,
        params: &CallParams,
        checkpoint: crate::state::Checkpoint,
    ) -> CallResult {
        let context = precompiles::Context {
            address: params.target.raw(),
            caller: params.caller.raw(),
            apparent_value: params.apparent_value,
        };
        let precompile = self
            .precompiles
            .get(&params.code_address)
            .expect("checked by caller");
        match precompile.run(
            &params.input,
            Some(EthGas::new(params.gas_limit)),
            &context,
            params.is_static,
        ) {
            Ok(output) => {
                self.state.commit(checkpoint);
                CallResult {
                    reason: ExitReason::Succeed(ExitSucceed::Returned),
                    output: output.output,
                    gas_left: params.gas_limit - output.cost.as_u64(),
                }
            }
            Err(e) => {
                self.state.revert_to(checkpoint);
                CallResult {
                    reason: ExitReason::Error(e.into()),
                    output: Vec::new(),
                    gas_left: 0,
                }
            }
        }
    }

    pub(crate) fn create_inner(&mut self, params: CreateParams) -> CreateResult {
        let address = match params.salt {
            Some(salt) => {
                Address::from_create2(&params.caller, &salt, &keccak256(&params.init_code))
            }
            None => {
                let nonce = U256::from(self.state.nonce(&params.caller));
                Address::from_create(&params.caller, nonce)
            }
        };
        self.create_at(params, address, true)
    }

    fn create_at(
        &mut self,
        params: CreateParams,
        address: Address,
        bump_caller_nonce: bool,
    ) -> CreateResult {
        let fail = |reason: ExitError, gas_left: u64| CreateResult {
            reason: ExitReason::Error(reason),
            address: None,
            output: Vec::new(),
            gas_left,
        };

        if params.depth > self.config.call_stack_limit {
            return fail(ExitError::CallDepthExceeded, params.gas_limit);
        }
        if self.state.balance(&params.caller) < params.value {
            return fail(ExitError::InsufficientBalance, params.gas_limit);
        }

        // The new address is warm from here on, collision or not.
        self.state.access_address(address);

        // One nonce bump per creation attempt, even a failing one.
        if bump_caller_nonce {
            self.state.inc_nonce(params.caller);
        }

        if self.state.nonce(&address) != 0 || !self.state.code(&address).is_empty() {
            return fail(ExitError::AddressCollision, 0);
        }

        let checkpoint = self.state.checkpoint();
        self.state.touch(address);
        self.state.mark_created(address);

        // Existing balance (from a pre-funded address) survives creation;
        // storage of such an account is necessarily empty here.
        if self.config.create_increase_nonce {
            self.state.set_nonce(address, 1);
        } else {
            self.state.set_nonce(address, 0);
        }

        if let Err(e) = self.state.transfer(params.caller, address, params.value) {
            self.state.revert_to(checkpoint);
            return fail(e, params.gas_limit);
        }

        let mut frame = Frame::new(
            params.init_code,
            Vec::new(),
            Context {
                address,
                caller: params.caller,
                apparent_value: params.value.raw(),
            },
            params.gas_limit,
            false,
            params.depth,
            self.config.stack_limit,
        );

        let reason = self.execute(&mut frame);
        match reason {
            ExitReason::Succeed(_) => {
                let code = frame.output;
                match self.charge_deposit(&mut frame.gas, &code) {
                    Ok(true) => self.state.set_code(address, code),
                    // Frontier only: an unaffordable deposit leaves the
                    // account codeless but the creation succeeds.
                    Ok(false) => {}
                    Err(e) => {
                        self.state.revert_to(checkpoint);
                        return fail(e, 0);
                    }
                }
                self.state.commit(checkpoint);
                CreateResult {
                    reason: ExitReason::Succeed(ExitSucceed::Returned),
                    address: Some(address),
                    output: Vec::new(),
                    gas_left: frame.gas.gas_left(),
                }
            }
            ExitReason::Revert => {
                self.state.revert_to(checkpoint);
                CreateResult {
                    reason,
                    address: None,
                    output: frame.output,
                    gas_left: frame.gas.gas_left(),
                }
            }
            ExitReason::Error(_) => {
                self.state.revert_to(checkpoint);
                CreateResult {
                    reason,
                    address: None,
                    output: Vec::new(),
                    gas_left: 0,
                }
            }
        }
    }

    /// Validates and pays for the returned deployment code. `Ok(false)` means
    /// the deposit was unaffordable but tolerated (Frontier rules) and no code
    /// is stored.
    fn charge_deposit(
        &self,
        gas: &mut crate::gasometer::Gasometer,
        code: &[u8],
    ) -> Result<bool, ExitError> {
        if self.config.disallow_executable_format && code.first() == Some(&0xef) {
            return Err(ExitError::InvalidCodeEntry);
        }
        if let Some(limit) = self.config.create_contract_limit {
            if code.len() > limit {
                return Err(ExitError::MaxCodeSizeExceeded);
            }
        }
        match gas.record_cost(self.config.gas_code_deposit * code.len() as u64) {
            Ok(()) => Ok(true),
            Err(_e) if self.config.allow_skipping_code_deposit => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// The dispatch loop of one frame.
    fn execute(&mut self, frame: &mut Frame) -> ExitReason {
        loop {
            if frame.pc >= frame.code.len() {
                return ExitReason::Succeed(ExitSucceed::Stopped);
            }
            let opcode = Opcode(frame.code[frame.pc]);

            if self.trace_enabled {
                self.trace_step(frame, opcode);
            }

            match instructions::eval(self, frame, opcode) {
                Ok(Control::Continue(n)) => frame.pc += n,
                Ok(Control::Jump(target)) => frame.pc = target,
                Ok(Control::Exit(reason)) => return reason,
                Err(e) => {
                    // Exceptions consume everything the frame holds.
                    frame.gas.consume_all();
                    return ExitReason::Error(e);
                }
            }
        }
    }

    /// One EIP-3155 trace line per step.
    fn trace_step(&self, frame: &Frame, opcode: Opcode) {
        let line = serde_json::json!({
            "pc": frame.pc,
            "op": opcode.as_u8(),
            "gas": format!("{:#x}", frame.gas.gas_left()),
            "memSize": frame.memory.len(),
            "stack": (0..frame.stack.len())
                .rev()
                .filter_map(|i| frame.stack.peek(i).ok())
                .map(|v| format!("{v:#x}"))
                .collect::<Vec<_>>(),
            "depth": frame.depth + 1,
        });
        trace!(target: "evm", "{line}");
    }
}
