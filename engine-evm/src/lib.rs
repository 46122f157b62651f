//! The EVM: a single interpreter parameterized by per-fork rule tables.

pub mod config;
pub mod env;
pub mod error;
pub mod frame;
pub mod gas;
pub mod gasometer;
pub mod i256;
pub mod instructions;
pub mod memory;
pub mod opcode;
pub mod runtime;
pub mod stack;
pub mod state;
pub mod valids;

pub use config::Config;
pub use env::{BlockEnv, TxEnv};
pub use error::{ExitError, ExitReason, ExitSucceed};
pub use opcode::Opcode;
pub use runtime::{CallParams, CallResult, CreateParams, CreateResult, Runtime};
pub use state::{AccountState, JournaledState};
