//! Bytecode analysis.
//!
//! A single pass turns raw code into a stream of decoded instructions
//! grouped in basic blocks. Every block begins with an entry instruction
//! carrying the block's aggregate static gas and stack bounds, so the
//! interpreter validates and charges once per block instead of once per
//! opcode. A real JUMPDEST serves as its own entry; any other block start
//! gets a synthetic entry that costs nothing beyond the block itself.

mod cache;
mod jumpdest;

use std::fmt;

pub use cache::AnalysisCache;
pub use jumpdest::JumpDestMap;

use crate::dispatch::{DispatchTable, Handler};
use crate::fork::Hardfork;
use crate::instructions::control;
use crate::opcode::{self, immediate_size, JUMP, JUMPDEST, JUMPI};
use crate::word::{self, Word};

/// Content hash of a code blob (blake3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CodeHash([u8; 32]);

impl CodeHash {
    pub fn of(code: &[u8]) -> Self {
        Self(*blake3::hash(code).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for CodeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Requirements checked and gas charged when a block is entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCost {
    pub gas: u64,
    pub stack_required: usize,
    pub stack_max_growth: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    None,
    Push(Word),
    Block(BlockCost),
    /// Pre-resolved destination of a constant jump, as an instruction index.
    JumpTarget(usize),
    /// Static gas of the rest of the block, already charged at block entry.
    GasCorrection(u64),
}

#[derive(Clone)]
pub struct Instruction {
    pub pc: usize,
    pub opcode: u8,
    pub arg: Arg,
    pub(crate) handler: Handler,
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instruction")
            .field("pc", &self.pc)
            .field("op", &opcode::name(self.opcode))
            .field("arg", &self.arg)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub start_pc: usize,
    /// One past the last code byte of the block.
    pub end_pc: usize,
    pub gas_cost: u64,
    pub min_stack_entry: usize,
    pub max_stack_growth: usize,
    pub net_stack_change: i32,
    /// Index of the block's entry instruction.
    pub entry: usize,
    /// Statically known successor pcs.
    pub successors: Vec<usize>,
}

impl BasicBlock {
    pub fn cost(&self) -> BlockCost {
        BlockCost {
            gas: self.gas_cost,
            stack_required: self.min_stack_entry,
            stack_max_growth: self.max_stack_growth,
        }
    }
}

/// Immutable result of analysing one code blob under one fork.
#[derive(Debug)]
pub struct CodeAnalysis {
    code: Vec<u8>,
    hash: CodeHash,
    fork: Hardfork,
    instructions: Vec<Instruction>,
    blocks: Vec<BasicBlock>,
    jumpdests: JumpDestMap,
    /// (pc, instruction index) for every JUMPDEST, sorted by pc.
    jumpdest_index: Vec<(usize, usize)>,
}

impl CodeAnalysis {
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn hash(&self) -> CodeHash {
        self.hash
    }

    pub fn fork(&self) -> Hardfork {
        self.fork
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    #[inline]
    pub fn instruction(&self, index: usize) -> Option<&Instruction> {
        self.instructions.get(index)
    }

    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Block containing `pc`, if any.
    pub fn block_at(&self, pc: usize) -> Option<&BasicBlock> {
        let i = self.blocks.partition_point(|b| b.start_pc <= pc);
        self.blocks[..i].last().filter(|b| pc < b.end_pc)
    }

    pub fn jumpdests(&self) -> &JumpDestMap {
        &self.jumpdests
    }

    #[inline]
    pub fn is_jumpdest(&self, pc: usize) -> bool {
        self.jumpdests.is_set(pc)
    }

    /// Instruction index of the JUMPDEST at `dest`, or `None` when `dest`
    /// is not a valid jump destination.
    pub fn jump_target(&self, dest: Word) -> Option<usize> {
        let pc = usize::try_from(word::to_u64(dest)?).ok()?;
        if !self.jumpdests.is_set(pc) {
            return None;
        }
        self.jumpdest_index
            .binary_search_by_key(&pc, |&(p, _)| p)
            .ok()
            .map(|i| self.jumpdest_index[i].1)
    }
}

struct OpenBlock {
    start_pc: usize,
    entry: usize,
    gas: u64,
    delta: i32,
    min_entry: i32,
    max_growth: i32,
    /// Gas-observing instructions and the block gas accumulated through them.
    observers: Vec<(usize, u64)>,
}

/// How control leaves a block, resolved into successors once every
/// instruction index is known.
enum Exit {
    Fallthrough,
    Jump(usize),
    Branch(usize),
    Terminal,
}

impl OpenBlock {
    fn new(start_pc: usize, entry: usize) -> Self {
        Self {
            start_pc,
            entry,
            gas: 0,
            delta: 0,
            min_entry: 0,
            max_growth: 0,
            observers: Vec::new(),
        }
    }

    fn close(self, end_pc: usize, instructions: &mut [Instruction]) -> BasicBlock {
        for (idx, through) in &self.observers {
            instructions[*idx].arg = Arg::GasCorrection(self.gas - through);
        }
        let block = BasicBlock {
            start_pc: self.start_pc,
            end_pc,
            gas_cost: self.gas,
            min_stack_entry: self.min_entry as usize,
            max_stack_growth: self.max_growth as usize,
            net_stack_change: self.delta,
            entry: self.entry,
            successors: Vec::new(),
        };
        instructions[self.entry].arg = Arg::Block(block.cost());
        block
    }
}

/// Analyses `code` against the opcode set of `table`. Never fails:
/// undefined opcodes become instructions that fault when reached and a
/// truncated final PUSH is zero-padded on the right.
pub fn analyze(code: &[u8], table: &DispatchTable) -> CodeAnalysis {
    let jumpdests = JumpDestMap::scan(code);
    let mut instructions: Vec<Instruction> = Vec::with_capacity(code.len() + 1);
    let mut blocks = Vec::new();
    let mut exits = Vec::new();
    let mut jumpdest_index = Vec::with_capacity(jumpdests.count());
    let mut const_jumps: Vec<(usize, Word)> = Vec::new();
    let mut open: Option<OpenBlock> = None;

    let mut pc = 0;
    while pc < code.len() {
        let op = code[pc];
        let entry = table.entry(op);
        let entry_idx = instructions.len();

        if op == JUMPDEST {
            if let Some(block) = open.take() {
                blocks.push(block.close(pc, &mut instructions));
                exits.push(Exit::Fallthrough);
            }
            jumpdest_index.push((pc, entry_idx));
        } else if open.is_none() {
            instructions.push(Instruction {
                pc,
                opcode: JUMPDEST,
                arg: Arg::Block(BlockCost::default()),
                handler: control::begin_block,
            });
        }
        let block = open.get_or_insert_with(|| OpenBlock::new(pc, entry_idx));

        let imm = immediate_size(op);
        let arg = if imm > 0 {
            let mut buf = [0u8; 32];
            let data = &code[(pc + 1).min(code.len())..(pc + 1 + imm).min(code.len())];
            buf[32 - imm..32 - imm + data.len()].copy_from_slice(data);
            Arg::Push(Word::from_big_endian(&buf))
        } else {
            Arg::None
        };

        // A PUSH directly before the jump always belongs to the same block.
        if op == JUMP || op == JUMPI {
            if let Some(Instruction { arg: Arg::Push(dest), .. }) = instructions.last() {
                const_jumps.push((instructions.len(), *dest));
            }
        }

        block.min_entry = block.min_entry.max(entry.stack_inputs as i32 - block.delta);
        block.delta += entry.stack_change();
        block.max_growth = block.max_growth.max(block.delta);
        block.gas += entry.base_gas;
        if entry.observes_gas {
            block.observers.push((instructions.len(), block.gas));
        }

        let index = instructions.len();
        instructions.push(Instruction {
            pc,
            opcode: op,
            arg,
            handler: entry.handler,
        });

        if entry.ends_block {
            if let Some(block) = open.take() {
                blocks.push(block.close(pc + 1, &mut instructions));
                exits.push(match op {
                    JUMP => Exit::Jump(index),
                    JUMPI => Exit::Branch(index),
                    _ => Exit::Terminal,
                });
            }
        }
        pc += 1 + imm;
    }
    if let Some(block) = open.take() {
        blocks.push(block.close(code.len(), &mut instructions));
        exits.push(Exit::Fallthrough);
    }

    let mut analysis = CodeAnalysis {
        code: code.to_vec(),
        hash: CodeHash::of(code),
        fork: table.fork(),
        instructions,
        blocks,
        jumpdests,
        jumpdest_index,
    };
    for (idx, dest) in const_jumps {
        if let Some(target) = analysis.jump_target(dest) {
            analysis.instructions[idx].arg = Arg::JumpTarget(target);
        }
    }
    link_successors(&mut analysis, &exits);
    analysis
}

fn link_successors(analysis: &mut CodeAnalysis, exits: &[Exit]) {
    let starts: Vec<usize> = analysis.blocks.iter().map(|b| b.start_pc).collect();
    let instructions = &analysis.instructions;
    let resolved = |idx: usize| match instructions[idx].arg {
        Arg::JumpTarget(t) => Some(instructions[t].pc),
        _ => None,
    };
    for (i, (block, exit)) in analysis.blocks.iter_mut().zip(exits).enumerate() {
        let next = starts.get(i + 1).copied().filter(|&s| s == block.end_pc);
        block.successors = match *exit {
            Exit::Fallthrough => next.into_iter().collect(),
            Exit::Jump(idx) => resolved(idx).into_iter().collect(),
            Exit::Branch(idx) => resolved(idx).into_iter().chain(next).collect(),
            Exit::Terminal => Vec::new(),
        };
    }
}

impl fmt::Display for CodeAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "; {} bytes, {:?}, code {}", self.code.len(), self.fork, self.hash)?;
        for (n, block) in self.blocks.iter().enumerate() {
            write!(
                f,
                "block {n} [{:#06x}..{:#06x}) gas={} stack>={} growth=+{} net={:+}",
                block.start_pc,
                block.end_pc,
                block.gas_cost,
                block.min_stack_entry,
                block.max_stack_growth,
                block.net_stack_change,
            )?;
            if !block.successors.is_empty() {
                let succ: Vec<String> = block.successors.iter().map(|pc| format!("{pc:#06x}")).collect();
                write!(f, " -> {}", succ.join(", "))?;
            }
            writeln!(f)?;
            let body = self.instructions[block.entry..]
                .iter()
                .take_while(|ins| ins.pc < block.end_pc);
            for (i, ins) in body.enumerate() {
                let synthetic = i == 0 && self.code.get(ins.pc) != Some(&JUMPDEST);
                if synthetic {
                    continue;
                }
                write!(f, "  {:04x}  {}", ins.pc, opcode::name(ins.opcode))?;
                match ins.arg {
                    Arg::Push(v) => write!(f, " {v:#x}")?,
                    Arg::JumpTarget(t) => write!(f, "  ; -> {:#06x}", self.instructions[t].pc)?,
                    Arg::GasCorrection(c) => write!(f, "  ; +{c}")?,
                    Arg::None | Arg::Block(_) => {}
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
