//! Execution core of an Ethereum-compatible virtual machine.
//!
//! Code is analysed once per (code hash, fork) into basic blocks, then
//! run by a loop that charges gas and validates the stack per block.
//! State, nested-call orchestration and logs live behind the [`Host`]
//! trait.

pub mod analysis;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fork;
pub mod gas;
pub mod host;
pub mod instructions;
pub mod interpreter;
pub mod memory;
pub mod opcode;
pub mod stack;
pub mod word;

pub use analysis::{analyze, AnalysisCache, BasicBlock, CodeAnalysis, CodeHash};
pub use config::EvmConfig;
pub use dispatch::DispatchTable;
pub use error::{ConfigError, Fault};
pub use fork::{ForkFlags, Hardfork};
pub use gas::Gas;
pub use host::{Access, CallKind, CallRequest, CallResult, Environment, Host, Log};
pub use interpreter::{CallContext, ExecutionResult, Frame, FrameInput, FrameState, Interpreter, Outcome};
pub use memory::SharedMemory;
pub use stack::Stack;
pub use word::{Address, Word, B256};
