//! Frame execution.
//!
//! The loop walks the pre-decoded instruction stream of a `CodeAnalysis`.
//! Block entries charge and validate once for their whole block, so the
//! handlers in between run on unchecked stack paths and only pay the
//! dynamic part of their cost.

use std::sync::Arc;

use tracing::debug;

use crate::analysis::{AnalysisCache, CodeAnalysis};
use crate::config::EvmConfig;
use crate::dispatch::{DispatchTable, StateEffect};
use crate::error::Fault;
use crate::gas::Gas;
use crate::host::Host;
use crate::memory::SharedMemory;
use crate::stack::Stack;
use crate::word::{Address, Word};

/// What a handler asks the loop to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Continue at this instruction index.
    Jump(usize),
    Halt(Halt),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    Stop,
    Return(Vec<u8>),
    Revert(Vec<u8>),
    SelfDestruct,
}

/// Everything a handler may touch while one instruction runs.
pub struct Machine<'a> {
    pub(crate) frame: &'a mut Frame,
    pub(crate) memory: &'a mut SharedMemory,
    pub(crate) host: &'a mut dyn Host,
    pub(crate) table: &'a DispatchTable,
    pub(crate) code: &'a CodeAnalysis,
    pub(crate) max_call_depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    /// Account whose storage and balance this frame acts on.
    pub address: Address,
    pub caller: Address,
    pub value: Word,
    pub is_static: bool,
    pub depth: usize,
    /// Running init code; RETURN output becomes the deployed code.
    pub is_create: bool,
}

impl Default for CallContext {
    fn default() -> Self {
        Self {
            address: Address::zero(),
            caller: Address::zero(),
            value: Word::zero(),
            is_static: false,
            depth: 0,
            is_create: false,
        }
    }
}

/// Arguments of one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub context: CallContext,
    pub input: Vec<u8>,
    pub gas_limit: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Running,
    Stopped,
    Reverted,
    Faulted(Fault),
}

#[derive(Debug)]
pub struct Frame {
    pub(crate) gas: Gas,
    pub(crate) stack: Stack,
    pub(crate) cursor: usize,
    pub(crate) code: Arc<CodeAnalysis>,
    pub(crate) context: CallContext,
    pub(crate) input: Vec<u8>,
    /// Output of the most recent child call.
    pub(crate) return_data: Vec<u8>,
    state: FrameState,
}

impl Frame {
    pub fn new(input: FrameInput, code: Arc<CodeAnalysis>) -> Self {
        Self {
            gas: Gas::new(input.gas_limit),
            stack: Stack::new(),
            cursor: 0,
            code,
            context: input.context,
            input: input.input,
            return_data: Vec::new(),
            state: FrameState::Running,
        }
    }

    /// Rewinds to the first instruction with a fresh gas budget, keeping
    /// code, context and input.
    pub fn reset(&mut self, gas_limit: u64) {
        self.gas = Gas::new(gas_limit);
        self.stack.clear();
        self.cursor = 0;
        self.return_data.clear();
        self.state = FrameState::Running;
    }

    pub fn gas(&self) -> &Gas {
        &self.gas
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn input(&self) -> &[u8] {
        &self.input
    }

    pub fn return_data(&self) -> &[u8] {
        &self.return_data
    }

    pub fn code(&self) -> &Arc<CodeAnalysis> {
        &self.code
    }

    /// Bytecode offset of the next instruction; the code length once the
    /// frame has run off the end.
    pub fn pc(&self) -> usize {
        self.code
            .instruction(self.cursor)
            .map_or(self.code.code().len(), |ins| ins.pc)
    }

    /// Raw byte at `pc()`, `None` past the end of code. Synthetic block
    /// entries report the opcode they precede.
    pub fn current_opcode(&self) -> Option<u8> {
        self.code.code().get(self.pc()).copied()
    }

    pub fn state(&self) -> FrameState {
        self.state
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// STOP, RETURN, SELFDESTRUCT or end of code.
    Stopped(Vec<u8>),
    Reverted(Vec<u8>),
    Faulted(Fault),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub outcome: Outcome,
    pub gas_remaining: u64,
    pub gas_used: u64,
    pub refund: i64,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, Outcome::Stopped(_))
    }

    pub fn output(&self) -> &[u8] {
        match &self.outcome {
            Outcome::Stopped(out) | Outcome::Reverted(out) => out,
            Outcome::Faulted(_) => &[],
        }
    }

    pub fn fault(&self) -> Option<Fault> {
        match self.outcome {
            Outcome::Faulted(f) => Some(f),
            _ => None,
        }
    }
}

/// Entry point for running code. Holds the fork's dispatch table and a
/// handle on the analysis cache; cheap to share across threads.
#[derive(Debug, Clone)]
pub struct Interpreter {
    config: EvmConfig,
    table: Arc<DispatchTable>,
    cache: Arc<AnalysisCache>,
}

impl Interpreter {
    pub fn new(config: EvmConfig) -> Self {
        let cache = Arc::new(AnalysisCache::new(config.analysis_cache_capacity));
        Self::with_cache(config, cache)
    }

    /// Shares `cache` with other interpreters, possibly for other forks.
    pub fn with_cache(config: EvmConfig, cache: Arc<AnalysisCache>) -> Self {
        Self {
            table: Arc::new(DispatchTable::new(config.hardfork)),
            config,
            cache,
        }
    }

    pub fn config(&self) -> &EvmConfig {
        &self.config
    }

    pub fn table(&self) -> &Arc<DispatchTable> {
        &self.table
    }

    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    /// Fresh root memory sized by the configured limit.
    pub fn new_memory(&self) -> SharedMemory {
        SharedMemory::with_limit(self.config.memory_limit)
    }

    pub fn analyze(&self, code: &[u8]) -> Arc<CodeAnalysis> {
        self.cache.get_or_analyze(code, &self.table)
    }

    pub fn execute(
        &self,
        input: FrameInput,
        code: &[u8],
        memory: &mut SharedMemory,
        host: &mut dyn Host,
    ) -> ExecutionResult {
        let mut frame = Frame::new(input, self.analyze(code));
        self.run_frame(&mut frame, memory, host)
    }

    /// Runs `frame` to completion inside a fresh view of `memory`.
    pub fn run_frame(&self, frame: &mut Frame, memory: &mut SharedMemory, host: &mut dyn Host) -> ExecutionResult {
        debug!(
            depth = frame.context.depth,
            gas = frame.gas.remaining(),
            code_hash = %frame.code.hash(),
            is_static = frame.context.is_static,
            "frame enter"
        );
        memory.enter_context();
        let halt = self.run_loop(frame, memory, host);
        memory.exit_context();

        let outcome = match halt {
            Ok(Halt::Stop | Halt::SelfDestruct) => {
                frame.state = FrameState::Stopped;
                Outcome::Stopped(Vec::new())
            }
            Ok(Halt::Return(out)) => {
                frame.state = FrameState::Stopped;
                Outcome::Stopped(out)
            }
            Ok(Halt::Revert(out)) => {
                frame.gas.clear_refund();
                frame.state = FrameState::Reverted;
                Outcome::Reverted(out)
            }
            Err(fault) => {
                frame.gas.exhaust();
                frame.state = FrameState::Faulted(fault);
                Outcome::Faulted(fault)
            }
        };
        let result = ExecutionResult {
            outcome,
            gas_remaining: frame.gas.remaining(),
            gas_used: frame.gas.spent(),
            refund: frame.gas.refunded(),
        };
        debug!(
            depth = frame.context.depth,
            outcome = ?frame.state,
            gas_used = result.gas_used,
            output_len = result.output().len(),
            "frame exit"
        );
        result
    }

    fn run_loop(&self, frame: &mut Frame, memory: &mut SharedMemory, host: &mut dyn Host) -> Result<Halt, Fault> {
        let code = Arc::clone(&frame.code);
        let guarded = frame.context.is_static || host.is_static_violation();
        let mut m = Machine {
            frame,
            memory,
            host,
            table: &self.table,
            code: &code,
            max_call_depth: self.config.max_call_depth,
        };

        loop {
            let Some(ins) = code.instruction(m.frame.cursor) else {
                return Ok(Halt::Stop);
            };
            if guarded {
                check_static(&m, ins.opcode)?;
            }
            match (ins.handler)(&mut m, ins)? {
                Flow::Continue => m.frame.cursor += 1,
                Flow::Jump(target) => m.frame.cursor = target,
                Flow::Halt(halt) => return Ok(halt),
            }
        }
    }
}

fn check_static(m: &Machine<'_>, opcode: u8) -> Result<(), Fault> {
    let violates = match m.table.entry(opcode).state_effect {
        StateEffect::None => false,
        StateEffect::Always => true,
        StateEffect::WhenValue(pos) => m.frame.stack.peek(pos).is_ok_and(|v| !v.is_zero()),
    };
    if violates {
        return Err(Fault::StaticCallViolation);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{Access, CallRequest, CallResult, Environment, Log};
    use crate::word::B256;

    #[derive(Default)]
    struct NullHost {
        env: Environment,
    }

    impl Host for NullHost {
        fn env(&self) -> &Environment {
            &self.env
        }
        fn get_storage(&mut self, _: Address, _: Word) -> Word {
            Word::zero()
        }
        fn original_storage(&mut self, _: Address, _: Word) -> Word {
            Word::zero()
        }
        fn set_storage(&mut self, _: Address, _: Word, _: Word) {}
        fn get_transient(&mut self, _: Address, _: Word) -> Word {
            Word::zero()
        }
        fn set_transient(&mut self, _: Address, _: Word, _: Word) {}
        fn mark_warm(&mut self, _: Access) -> bool {
            false
        }
        fn get_balance(&mut self, _: Address) -> Word {
            Word::zero()
        }
        fn get_code(&mut self, _: Address) -> Vec<u8> {
            Vec::new()
        }
        fn get_code_hash(&mut self, _: Address) -> B256 {
            B256::zero()
        }
        fn is_empty_account(&mut self, _: Address) -> bool {
            true
        }
        fn block_hash(&mut self, _: u64) -> B256 {
            B256::zero()
        }
        fn perform_call(&mut self, req: CallRequest, _: &mut SharedMemory) -> CallResult {
            CallResult::failure(req.gas)
        }
        fn emit_log(&mut self, _: Log) {}
        fn mark_for_destruction(&mut self, _: Address, _: Address) -> bool {
            false
        }
    }

    fn run(code: &[u8], gas: u64) -> (ExecutionResult, Frame) {
        let vm = Interpreter::new(EvmConfig::default());
        let mut frame = Frame::new(
            FrameInput {
                gas_limit: gas,
                ..Default::default()
            },
            vm.analyze(code),
        );
        let mut memory = vm.new_memory();
        let result = vm.run_frame(&mut frame, &mut memory, &mut NullHost::default());
        (result, frame)
    }

    #[test]
    fn pc_tracks_bytecode_offsets() {
        let vm = Interpreter::new(EvmConfig::default());
        let frame = Frame::new(FrameInput::default(), vm.analyze(&[0x60, 0x01]));
        // the synthetic block entry sits on the PUSH1 it precedes
        assert_eq!(frame.pc(), 0);
        assert_eq!(frame.current_opcode(), Some(0x60));

        let (r, frame) = run(&[0x60, 0x01], 100);
        assert!(r.is_success());
        assert_eq!(frame.pc(), 2);
        assert_eq!(frame.current_opcode(), None);
    }

    #[test]
    fn empty_code_stops_without_gas() {
        let (r, frame) = run(&[], 100);
        assert_eq!(r.outcome, Outcome::Stopped(Vec::new()));
        assert_eq!(r.gas_used, 0);
        assert_eq!(frame.state(), FrameState::Stopped);
    }

    #[test]
    fn falling_off_the_end_stops() {
        let (r, frame) = run(&[0x60, 0x01, 0x60, 0x02], 100);
        assert!(r.is_success());
        assert_eq!(r.gas_used, 6);
        assert_eq!(frame.stack().len(), 2);
    }

    #[test]
    fn fault_consumes_everything() {
        let (r, frame) = run(&[0x60, 0x01, 0xfe], 100);
        assert_eq!(r.fault(), Some(Fault::InvalidOpcode(0xfe)));
        assert_eq!(r.gas_remaining, 0);
        assert_eq!(r.gas_used, 100);
        assert_eq!(frame.state(), FrameState::Faulted(Fault::InvalidOpcode(0xfe)));
    }

    #[test]
    fn block_charge_shortfall_is_out_of_gas() {
        let (r, _) = run(&[0x60, 0x01, 0x60, 0x02, 0x01], 8);
        assert_eq!(r.fault(), Some(Fault::OutOfGas));
        assert_eq!(r.gas_remaining, 0);
    }

    #[test]
    fn block_entry_checks_stack() {
        let (r, _) = run(&[0x01], 100);
        assert_eq!(r.fault(), Some(Fault::StackUnderflow));
    }

    #[test]
    fn reset_rewinds_frame() {
        let (_, mut frame) = run(&[0x60, 0x01], 100);
        frame.reset(50);
        assert_eq!(frame.stack().len(), 0);
        assert_eq!(frame.gas().remaining(), 50);
        assert_eq!(frame.state(), FrameState::Running);
    }
}
