//! Opcode handlers.
//!
//! Each handler charges its own gas (static plus dynamic, memory expansion
//! before any access) and returns how the program counter moves next.

mod arithmetic;
mod bitwise;
mod environment;
mod flow;
mod logging;
mod memory_ops;
mod stack_ops;
mod storage;
pub(crate) mod system;

use crate::error::{ExitError, ExitReason};
use crate::frame::Frame;
use crate::opcode::Opcode;
use crate::runtime::Runtime;
use hearth_engine_types::types::Address;
use hearth_engine_types::{H160, H256, U256};

/// Where execution goes after one instruction.
pub enum Control {
    /// Advance the program counter by `n` bytes.
    Continue(usize),
    /// Set the program counter.
    Jump(usize),
    /// Halt the frame.
    Exit(ExitReason),
}

pub fn eval(rt: &mut Runtime, frame: &mut Frame, opcode: Opcode) -> Result<Control, ExitError> {
    if let Some(push_len) = opcode.is_push() {
        return stack_ops::push(frame, push_len as usize);
    }
    if let Some(position) = opcode.dup_position() {
        return stack_ops::dup(frame, position);
    }
    if let Some(position) = opcode.swap_position() {
        return stack_ops::swap(frame, position);
    }
    if let Some(topics) = opcode.log_topics() {
        return logging::log(rt, frame, topics);
    }

    let config = rt.config;
    match opcode {
        Opcode::STOP => flow::stop(),
        Opcode::ADD => arithmetic::add(frame),
        Opcode::MUL => arithmetic::mul(frame),
        Opcode::SUB => arithmetic::sub(frame),
        Opcode::DIV => arithmetic::div(frame),
        Opcode::SDIV => arithmetic::sdiv(frame),
        Opcode::MOD => arithmetic::rem(frame),
        Opcode::SMOD => arithmetic::srem(frame),
        Opcode::ADDMOD => arithmetic::addmod(frame),
        Opcode::MULMOD => arithmetic::mulmod(frame),
        Opcode::EXP => arithmetic::exp(rt, frame),
        Opcode::SIGNEXTEND => arithmetic::signextend(frame),

        Opcode::LT => bitwise::lt(frame),
        Opcode::GT => bitwise::gt(frame),
        Opcode::SLT => bitwise::slt(frame),
        Opcode::SGT => bitwise::sgt(frame),
        Opcode::EQ => bitwise::eq(frame),
        Opcode::ISZERO => bitwise::iszero(frame),
        Opcode::AND => bitwise::and(frame),
        Opcode::OR => bitwise::or(frame),
        Opcode::XOR => bitwise::xor(frame),
        Opcode::NOT => bitwise::not(frame),
        Opcode::BYTE => bitwise::byte(frame),
        Opcode::SHL if config.has_bitwise_shifting => bitwise::shl(frame),
        Opcode::SHR if config.has_bitwise_shifting => bitwise::shr(frame),
        Opcode::SAR if config.has_bitwise_shifting => bitwise::sar(frame),

        Opcode::KECCAK256 => memory_ops::keccak256(frame),

        Opcode::ADDRESS => environment::address(frame),
        Opcode::BALANCE => environment::balance(rt, frame),
        Opcode::ORIGIN => environment::origin(rt, frame),
        Opcode::CALLER => environment::caller(frame),
        Opcode::CALLVALUE => environment::callvalue(frame),
        Opcode::CALLDATALOAD => memory_ops::calldataload(frame),
        Opcode::CALLDATASIZE => memory_ops::calldatasize(frame),
        Opcode::CALLDATACOPY => memory_ops::calldatacopy(frame),
        Opcode::CODESIZE => memory_ops::codesize(frame),
        Opcode::CODECOPY => memory_ops::codecopy(frame),
        Opcode::GASPRICE => environment::gasprice(rt, frame),
        Opcode::EXTCODESIZE => environment::extcodesize(rt, frame),
        Opcode::EXTCODECOPY => environment::extcodecopy(rt, frame),
        Opcode::RETURNDATASIZE if config.has_return_data => memory_ops::returndatasize(frame),
        Opcode::RETURNDATACOPY if config.has_return_data => memory_ops::returndatacopy(frame),
        Opcode::EXTCODEHASH if config.has_ext_code_hash => environment::extcodehash(rt, frame),

        Opcode::BLOCKHASH => environment::blockhash(rt, frame),
        Opcode::COINBASE => environment::coinbase(rt, frame),
        Opcode::TIMESTAMP => environment::timestamp(rt, frame),
        Opcode::NUMBER => environment::number(rt, frame),
        Opcode::DIFFICULTY => environment::difficulty(rt, frame),
        Opcode::GASLIMIT => environment::gaslimit(rt, frame),
        Opcode::CHAINID if config.has_chain_id => environment::chainid(rt, frame),
        Opcode::SELFBALANCE if config.has_self_balance => environment::selfbalance(rt, frame),
        Opcode::BASEFEE if config.has_base_fee => environment::basefee(rt, frame),
        Opcode::BLOBHASH if config.has_blob_hash => environment::blobhash(rt, frame),
        Opcode::BLOBBASEFEE if config.has_blob_base_fee => environment::blobbasefee(rt, frame),

        Opcode::POP => stack_ops::pop(frame),
        Opcode::MLOAD => memory_ops::mload(frame),
        Opcode::MSTORE => memory_ops::mstore(frame),
        Opcode::MSTORE8 => memory_ops::mstore8(frame),
        Opcode::SLOAD => storage::sload(rt, frame),
        Opcode::SSTORE => storage::sstore(rt, frame),
        Opcode::JUMP => flow::jump(frame),
        Opcode::JUMPI => flow::jumpi(frame),
        Opcode::PC => flow::pc(frame),
        Opcode::MSIZE => flow::msize(frame),
        Opcode::GAS => flow::gas(frame),
        Opcode::JUMPDEST => flow::jumpdest(frame),
        Opcode::TLOAD if config.has_transient_storage => storage::tload(rt, frame),
        Opcode::TSTORE if config.has_transient_storage => storage::tstore(rt, frame),
        Opcode::MCOPY if config.has_mcopy => memory_ops::mcopy(frame),
        Opcode::PUSH0 if config.has_push0 => stack_ops::push0(frame),

        Opcode::CREATE => system::create(rt, frame, false),
        Opcode::CREATE2 if config.has_create2 => system::create(rt, frame, true),
        Opcode::CALL => system::call(rt, frame),
        Opcode::CALLCODE => system::callcode(rt, frame),
        Opcode::RETURN => system::ret(frame),
        Opcode::DELEGATECALL if config.has_delegate_call => system::delegatecall(rt, frame),
        Opcode::STATICCALL if config.has_static_call => system::staticcall(rt, frame),
        Opcode::REVERT if config.has_revert => system::revert(frame),
        Opcode::SELFDESTRUCT => system::selfdestruct(rt, frame),

        other => Err(ExitError::InvalidOpcode(other.as_u8())),
    }
}

pub(crate) fn u256_to_h256(value: U256) -> H256 {
    let mut bytes = [0u8; 32];
    value.to_big_endian(&mut bytes);
    H256(bytes)
}

pub(crate) fn h256_to_u256(value: H256) -> U256 {
    U256::from_big_endian(value.as_bytes())
}

/// The low 20 bytes of a stack word, as an address.
pub(crate) fn u256_to_address(value: U256) -> Address {
    let word = u256_to_h256(value);
    Address::new(H160::from_slice(&word[12..]))
}

pub(crate) fn address_to_u256(address: Address) -> U256 {
    U256::from_big_endian(address.as_bytes())
}
