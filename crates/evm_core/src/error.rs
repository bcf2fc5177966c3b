use thiserror::Error;

/// Abnormal halt of a frame. Every variant forfeits the frame's remaining
/// gas and yields no output; a revert is not a fault and never appears here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Fault {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("out of gas")]
    OutOfGas,
    #[error("invalid opcode 0x{0:02x}")]
    InvalidOpcode(u8),
    #[error("invalid jump destination")]
    InvalidJump,
    #[error("state modification in static call")]
    StaticCallViolation,
    #[error("memory size overflow")]
    MemorySizeOverflow,
    #[error("output too large")]
    OutputTooLarge,
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,
    #[error("init code too large")]
    InitCodeTooLarge,
}

impl Fault {
    /// Stable integer code, compatible with the C binding's error numbers.
    pub fn code(&self) -> i32 {
        match self {
            Fault::StackOverflow => -1,
            Fault::StackUnderflow => -2,
            Fault::OutOfGas => -3,
            Fault::InvalidJump => -4,
            Fault::InvalidOpcode(_) => -5,
            Fault::MemorySizeOverflow | Fault::ReturnDataOutOfBounds => -6,
            Fault::OutputTooLarge | Fault::InitCodeTooLarge => -8,
            Fault::StaticCallViolation => -11,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("serde-json: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
