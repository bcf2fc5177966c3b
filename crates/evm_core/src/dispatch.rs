//! Per-fork instruction dispatch table.

use std::fmt;

use crate::analysis::Instruction;
use crate::error::Fault;
use crate::fork::{ForkFlags, Hardfork};
use crate::gas::{self, GasSchedule};
use crate::instructions::{arithmetic, bitwise, control, environment, memory, stack, storage, system};
use crate::interpreter::{Flow, Machine};
use crate::opcode::*;
use crate::stack::STACK_LIMIT;

pub type Handler = fn(&mut Machine<'_>, &Instruction) -> Result<Flow, Fault>;

/// How an opcode interacts with the static-call restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateEffect {
    None,
    Always,
    /// Modifies state only when the stack word at this depth (0 = top) is non-zero.
    WhenValue(usize),
}

#[derive(Clone, Copy)]
pub struct DispatchEntry {
    pub name: &'static str,
    pub base_gas: u64,
    pub stack_inputs: u8,
    pub stack_outputs: u8,
    pub immediate: u8,
    pub terminates: bool,
    pub ends_block: bool,
    pub state_effect: StateEffect,
    /// Reads the remaining gas, so needs the rest of its block's static gas handed back.
    pub observes_gas: bool,
    pub defined: bool,
    pub(crate) handler: Handler,
}

impl fmt::Debug for DispatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchEntry")
            .field("name", &self.name)
            .field("base_gas", &self.base_gas)
            .field("stack_inputs", &self.stack_inputs)
            .field("stack_outputs", &self.stack_outputs)
            .field("terminates", &self.terminates)
            .field("state_effect", &self.state_effect)
            .field("defined", &self.defined)
            .finish()
    }
}

impl DispatchEntry {
    fn new(name: &'static str, base_gas: u64, inputs: u8, outputs: u8, handler: Handler) -> Self {
        Self {
            name,
            base_gas,
            stack_inputs: inputs,
            stack_outputs: outputs,
            immediate: 0,
            terminates: false,
            ends_block: false,
            state_effect: StateEffect::None,
            observes_gas: false,
            defined: true,
            handler,
        }
    }

    fn undefined(op: u8) -> Self {
        Self {
            name: name(op),
            terminates: true,
            ends_block: true,
            defined: false,
            ..Self::new("UNDEFINED", 0, 0, 0, control::invalid)
        }
    }

    fn terminal(mut self) -> Self {
        self.terminates = true;
        self.ends_block = true;
        self
    }

    fn branch(mut self) -> Self {
        self.ends_block = true;
        self
    }

    fn state(mut self, effect: StateEffect) -> Self {
        self.state_effect = effect;
        self
    }

    fn observes_gas(mut self) -> Self {
        self.observes_gas = true;
        self
    }

    /// Minimum stack height required before execution.
    pub fn min_stack(&self) -> usize {
        self.stack_inputs as usize
    }

    /// Maximum stack height allowed before execution.
    pub fn max_stack(&self) -> usize {
        STACK_LIMIT - (self.stack_outputs.saturating_sub(self.stack_inputs)) as usize
    }

    pub fn stack_change(&self) -> i32 {
        self.stack_outputs as i32 - self.stack_inputs as i32
    }
}

/// Immutable opcode table for one hardfork. Construct once, share by
/// reference or `Arc`; several tables can live side by side.
pub struct DispatchTable {
    fork: Hardfork,
    schedule: GasSchedule,
    entries: [DispatchEntry; 256],
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTable")
            .field("fork", &self.fork)
            .field("defined", &self.entries.iter().filter(|e| e.defined).count())
            .finish()
    }
}

impl DispatchTable {
    pub fn new(fork: Hardfork) -> Self {
        let flags = fork.flags();
        let schedule = GasSchedule::new(flags);
        let mut t: [DispatchEntry; 256] = std::array::from_fn(|op| DispatchEntry::undefined(op as u8));
        populate(&mut t, &flags, &schedule);
        Self {
            fork,
            schedule,
            entries: t,
        }
    }

    #[inline]
    pub fn entry(&self, opcode: u8) -> &DispatchEntry {
        &self.entries[opcode as usize]
    }

    pub fn fork(&self) -> Hardfork {
        self.fork
    }

    pub fn flags(&self) -> &ForkFlags {
        self.schedule.flags()
    }

    pub fn schedule(&self) -> &GasSchedule {
        &self.schedule
    }
}

fn populate(t: &mut [DispatchEntry; 256], f: &ForkFlags, s: &GasSchedule) {
    use DispatchEntry as E;
    let mut set = |op: u8, e: DispatchEntry| t[op as usize] = e;

    set(STOP, E::new("STOP", 0, 0, 0, control::stop).terminal());
    set(ADD, E::new("ADD", gas::VERYLOW, 2, 1, arithmetic::add));
    set(MUL, E::new("MUL", gas::LOW, 2, 1, arithmetic::mul));
    set(SUB, E::new("SUB", gas::VERYLOW, 2, 1, arithmetic::sub));
    set(DIV, E::new("DIV", gas::LOW, 2, 1, arithmetic::div));
    set(SDIV, E::new("SDIV", gas::LOW, 2, 1, arithmetic::sdiv));
    set(MOD, E::new("MOD", gas::LOW, 2, 1, arithmetic::rem));
    set(SMOD, E::new("SMOD", gas::LOW, 2, 1, arithmetic::srem));
    set(ADDMOD, E::new("ADDMOD", gas::MID, 3, 1, arithmetic::addmod));
    set(MULMOD, E::new("MULMOD", gas::MID, 3, 1, arithmetic::mulmod));
    set(EXP, E::new("EXP", gas::EXP, 2, 1, arithmetic::exp));
    set(SIGNEXTEND, E::new("SIGNEXTEND", gas::LOW, 2, 1, arithmetic::signextend));

    set(LT, E::new("LT", gas::VERYLOW, 2, 1, bitwise::lt));
    set(GT, E::new("GT", gas::VERYLOW, 2, 1, bitwise::gt));
    set(SLT, E::new("SLT", gas::VERYLOW, 2, 1, bitwise::slt));
    set(SGT, E::new("SGT", gas::VERYLOW, 2, 1, bitwise::sgt));
    set(EQ, E::new("EQ", gas::VERYLOW, 2, 1, bitwise::eq));
    set(ISZERO, E::new("ISZERO", gas::VERYLOW, 1, 1, bitwise::iszero));
    set(AND, E::new("AND", gas::VERYLOW, 2, 1, bitwise::and));
    set(OR, E::new("OR", gas::VERYLOW, 2, 1, bitwise::or));
    set(XOR, E::new("XOR", gas::VERYLOW, 2, 1, bitwise::xor));
    set(NOT, E::new("NOT", gas::VERYLOW, 1, 1, bitwise::not));
    set(BYTE, E::new("BYTE", gas::VERYLOW, 2, 1, bitwise::byte));
    if f.bitwise_shifts {
        set(SHL, E::new("SHL", gas::VERYLOW, 2, 1, bitwise::shl));
        set(SHR, E::new("SHR", gas::VERYLOW, 2, 1, bitwise::shr));
        set(SAR, E::new("SAR", gas::VERYLOW, 2, 1, bitwise::sar));
    }

    set(KECCAK256, E::new("KECCAK256", gas::KECCAK256, 2, 1, environment::keccak256));

    set(ADDRESS, E::new("ADDRESS", gas::BASE, 0, 1, environment::address));
    set(BALANCE, E::new("BALANCE", s.balance, 1, 1, environment::balance));
    set(ORIGIN, E::new("ORIGIN", gas::BASE, 0, 1, environment::origin));
    set(CALLER, E::new("CALLER", gas::BASE, 0, 1, environment::caller));
    set(CALLVALUE, E::new("CALLVALUE", gas::BASE, 0, 1, environment::callvalue));
    set(CALLDATALOAD, E::new("CALLDATALOAD", gas::VERYLOW, 1, 1, environment::calldataload));
    set(CALLDATASIZE, E::new("CALLDATASIZE", gas::BASE, 0, 1, environment::calldatasize));
    set(CALLDATACOPY, E::new("CALLDATACOPY", gas::VERYLOW, 3, 0, environment::calldatacopy));
    set(CODESIZE, E::new("CODESIZE", gas::BASE, 0, 1, environment::codesize));
    set(CODECOPY, E::new("CODECOPY", gas::VERYLOW, 3, 0, environment::codecopy));
    set(GASPRICE, E::new("GASPRICE", gas::BASE, 0, 1, environment::gasprice));
    set(EXTCODESIZE, E::new("EXTCODESIZE", s.extcode, 1, 1, environment::extcodesize));
    set(EXTCODECOPY, E::new("EXTCODECOPY", s.extcode, 4, 0, environment::extcodecopy));
    if f.byzantium_opcodes {
        set(RETURNDATASIZE, E::new("RETURNDATASIZE", gas::BASE, 0, 1, environment::returndatasize));
        set(RETURNDATACOPY, E::new("RETURNDATACOPY", gas::VERYLOW, 3, 0, environment::returndatacopy));
    }
    if f.extcodehash {
        set(EXTCODEHASH, E::new("EXTCODEHASH", s.extcodehash, 1, 1, environment::extcodehash));
    }

    set(BLOCKHASH, E::new("BLOCKHASH", gas::BLOCKHASH, 1, 1, environment::blockhash));
    set(COINBASE, E::new("COINBASE", gas::BASE, 0, 1, environment::coinbase));
    set(TIMESTAMP, E::new("TIMESTAMP", gas::BASE, 0, 1, environment::timestamp));
    set(NUMBER, E::new("NUMBER", gas::BASE, 0, 1, environment::number));
    set(PREVRANDAO, E::new("PREVRANDAO", gas::BASE, 0, 1, environment::prevrandao));
    set(GASLIMIT, E::new("GASLIMIT", gas::BASE, 0, 1, environment::gaslimit));
    if f.istanbul_opcodes {
        set(CHAINID, E::new("CHAINID", gas::BASE, 0, 1, environment::chainid));
        set(SELFBALANCE, E::new("SELFBALANCE", gas::LOW, 0, 1, environment::selfbalance));
    }
    if f.basefee {
        set(BASEFEE, E::new("BASEFEE", gas::BASE, 0, 1, environment::basefee));
    }
    if f.blob_opcodes {
        set(BLOBHASH, E::new("BLOBHASH", gas::BLOBHASH, 1, 1, environment::blobhash));
        set(BLOBBASEFEE, E::new("BLOBBASEFEE", gas::BASE, 0, 1, environment::blobbasefee));
    }

    set(POP, E::new("POP", gas::BASE, 1, 0, stack::pop));
    set(MLOAD, E::new("MLOAD", gas::VERYLOW, 1, 1, memory::mload));
    set(MSTORE, E::new("MSTORE", gas::VERYLOW, 2, 0, memory::mstore));
    set(MSTORE8, E::new("MSTORE8", gas::VERYLOW, 2, 0, memory::mstore8));
    set(SLOAD, E::new("SLOAD", s.sload, 1, 1, storage::sload));
    set(
        SSTORE,
        E::new("SSTORE", 0, 2, 0, storage::sstore)
            .state(StateEffect::Always)
            .observes_gas(),
    );
    set(JUMP, E::new("JUMP", gas::MID, 1, 0, control::jump).branch());
    set(JUMPI, E::new("JUMPI", gas::HIGH, 2, 0, control::jumpi).branch());
    set(PC, E::new("PC", gas::BASE, 0, 1, control::pc));
    set(MSIZE, E::new("MSIZE", gas::BASE, 0, 1, memory::msize));
    set(GAS, E::new("GAS", gas::BASE, 0, 1, control::gas).observes_gas());
    set(JUMPDEST, E::new("JUMPDEST", gas::JUMPDEST, 0, 0, control::begin_block));
    if f.transient_storage {
        set(TLOAD, E::new("TLOAD", gas::TRANSIENT, 1, 1, storage::tload));
        set(
            TSTORE,
            E::new("TSTORE", gas::TRANSIENT, 2, 0, storage::tstore).state(StateEffect::Always),
        );
    }
    if f.mcopy {
        set(MCOPY, E::new("MCOPY", gas::VERYLOW, 3, 0, memory::mcopy));
    }
    if f.push0 {
        set(PUSH0, E::new("PUSH0", gas::BASE, 0, 1, stack::push0));
    }
    for op in PUSH1..=PUSH32 {
        let mut e = E::new(name(op), gas::VERYLOW, 0, 1, stack::push);
        e.immediate = immediate_size(op) as u8;
        set(op, e);
    }
    for op in DUP1..=DUP16 {
        let n = op - DUP1 + 1;
        set(op, E::new(name(op), gas::VERYLOW, n, n + 1, stack::dup));
    }
    for op in SWAP1..=SWAP16 {
        let n = op - SWAP1 + 1;
        set(op, E::new(name(op), gas::VERYLOW, n + 1, n + 1, stack::swap));
    }
    for op in LOG0..=LOG4 {
        let topics = op - LOG0;
        set(
            op,
            E::new(name(op), gas::LOG, topics + 2, 0, storage::log).state(StateEffect::Always),
        );
    }

    set(
        CREATE,
        E::new("CREATE", gas::CREATE, 3, 1, system::create)
            .state(StateEffect::Always)
            .observes_gas(),
    );
    set(
        CALL,
        E::new("CALL", s.call, 7, 1, system::call)
            .state(StateEffect::WhenValue(2))
            .observes_gas(),
    );
    set(CALLCODE, E::new("CALLCODE", s.call, 7, 1, system::call).observes_gas());
    set(RETURN, E::new("RETURN", 0, 2, 0, control::ret).terminal());
    if f.delegatecall {
        set(
            DELEGATECALL,
            E::new("DELEGATECALL", s.call, 6, 1, system::call).observes_gas(),
        );
    }
    if f.create2 {
        set(
            CREATE2,
            E::new("CREATE2", gas::CREATE, 4, 1, system::create)
                .state(StateEffect::Always)
                .observes_gas(),
        );
    }
    if f.byzantium_opcodes {
        set(STATICCALL, E::new("STATICCALL", s.call, 6, 1, system::call).observes_gas());
        set(REVERT, E::new("REVERT", 0, 2, 0, control::revert).terminal());
    }
    set(INVALID, E::new("INVALID", 0, 0, 0, control::invalid).terminal());
    set(
        SELFDESTRUCT,
        E::new("SELFDESTRUCT", s.selfdestruct, 1, 0, system::selfdestruct)
            .terminal()
            .state(StateEffect::Always),
    );
}
