use hearth_engine_precompiles::PrecompileError;
use std::borrow::Cow;

/// How a frame finished executing.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ExitReason {
    Succeed(ExitSucceed),
    Error(ExitError),
    Revert,
}

impl ExitReason {
    #[must_use]
    pub fn is_succeed(&self) -> bool {
        matches!(self, Self::Succeed(_))
    }

    #[must_use]
    pub fn is_revert(&self) -> bool {
        matches!(self, Self::Revert)
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ExitSucceed {
    /// Execution ran off the end of the code or hit `STOP`.
    Stopped,
    /// Execution hit `RETURN`.
    Returned,
    /// The frame was terminated by `SELFDESTRUCT`.
    SelfDestructed,
}

/// An exception that halts a frame. All gas held by the frame is consumed and
/// its state changes are rolled back; only `ExitReason::Revert` returns the
/// remaining gas to the caller.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ExitError {
    StackUnderflow,
    StackOverflow,
    OutOfGas,
    InvalidJump,
    InvalidOpcode(u8),
    WriteProtection,
    InsufficientBalance,
    CallDepthExceeded,
    OutOfBoundsRead,
    ReturnDataOutOfBounds,
    MaxCodeSizeExceeded,
    /// Deployed code may not start with `0xef` (EIP-3541).
    InvalidCodeEntry,
    AddressCollision,
    KzgProofInvalid,
    CreateInitCodeSizeLimit,
    Other(Cow<'static, str>),
}

impl ExitError {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::StackUnderflow => "ERR_STACK_UNDERFLOW",
            Self::StackOverflow => "ERR_STACK_OVERFLOW",
            Self::OutOfGas => "ERR_OUT_OF_GAS",
            Self::InvalidJump => "ERR_INVALID_JUMP",
            Self::InvalidOpcode(_) => "ERR_INVALID_OPCODE",
            Self::WriteProtection => "ERR_WRITE_PROTECTION",
            Self::InsufficientBalance => "ERR_INSUFFICIENT_BALANCE",
            Self::CallDepthExceeded => "ERR_CALL_TOO_DEEP",
            Self::OutOfBoundsRead => "ERR_OUT_OF_BOUNDS_READ",
            Self::ReturnDataOutOfBounds => "ERR_RETURN_DATA_OUT_OF_BOUNDS",
            Self::MaxCodeSizeExceeded => "ERR_MAX_CODE_SIZE_EXCEEDED",
            Self::InvalidCodeEntry => "ERR_INVALID_CODE_ENTRY",
            Self::AddressCollision => "ERR_ADDRESS_COLLISION",
            Self::KzgProofInvalid => "ERR_KZG_PROOF_INVALID",
            Self::CreateInitCodeSizeLimit => "ERR_INIT_CODE_SIZE_LIMIT",
            Self::Other(msg) => msg,
        }
    }
}

impl From<PrecompileError> for ExitError {
    fn from(e: PrecompileError) -> Self {
        match e {
            PrecompileError::OutOfGas => Self::OutOfGas,
            PrecompileError::Other(Cow::Borrowed("ERR_KZG_PROOF_INVALID")) => Self::KzgProofInvalid,
            PrecompileError::Other(msg) => Self::Other(msg),
        }
    }
}
