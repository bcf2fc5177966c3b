use crate::analysis::{Arg, Instruction};
use crate::error::Fault;
use crate::interpreter::{Flow, Machine};
use crate::opcode::{DUP1, SWAP1};
use crate::word::Word;

pub fn pop(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    m.frame.stack.pop_unchecked();
    Ok(Flow::Continue)
}

pub fn push0(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    m.frame.stack.push_unchecked(Word::zero());
    Ok(Flow::Continue)
}

/// PUSH1..PUSH32; the immediate was decoded during analysis.
pub fn push(m: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    let value = match ins.arg {
        Arg::Push(v) => v,
        _ => Word::zero(),
    };
    m.frame.stack.push_unchecked(value);
    Ok(Flow::Continue)
}

pub fn dup(m: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    m.frame.stack.dup_unchecked((ins.opcode - DUP1 + 1) as usize);
    Ok(Flow::Continue)
}

pub fn swap(m: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    m.frame.stack.swap_unchecked((ins.opcode - SWAP1 + 1) as usize);
    Ok(Flow::Continue)
}
