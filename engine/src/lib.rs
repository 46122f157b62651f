//! The hearth execution engine: block model, fork schedule, and the state
//! transition function over the `hearth-engine-evm` interpreter.

pub mod block;
pub mod dao;
pub mod engine;
pub mod fork;
pub mod receipt;
pub mod transition;
pub mod validation;

#[cfg(test)]
mod tests;

pub use block::{Block, Header, Withdrawal};
pub use engine::{
    apply_block, apply_transaction, BlockContext, BlockError, BlockOutcome, EngineConfig,
    ExecutionOutcome, TransactionError,
};
pub use fork::{Activation, BlobSchedule, ChainConfig, Fork};
pub use receipt::Receipt;
pub use transition::{
    build_block, statetest, statetest_check, transition, StatetestExpectation, StatetestFailure,
    TransitionEnv, TransitionOutput,
};
