use tracing::trace;

use super::{gas_correction, Instruction};
use crate::analysis::Arg;
use crate::error::Fault;
use crate::gas::MAX_CODE_SIZE;
use crate::interpreter::{Flow, Halt, Machine};
use crate::stack::STACK_LIMIT;
use crate::word::{self, Word};

/// Entry of every basic block, real JUMPDEST or synthetic.
pub fn begin_block(m: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    let Arg::Block(cost) = ins.arg else {
        return Ok(Flow::Continue);
    };
    trace!(pc = ins.pc, gas = m.frame.gas.remaining(), block_gas = cost.gas, "block");
    m.frame.gas.charge(cost.gas)?;
    let height = m.frame.stack.len();
    if height < cost.stack_required {
        return Err(Fault::StackUnderflow);
    }
    if height + cost.stack_max_growth > STACK_LIMIT {
        return Err(Fault::StackOverflow);
    }
    Ok(Flow::Continue)
}

fn destination(m: &Machine<'_>, ins: &Instruction, dest: Word) -> Result<usize, Fault> {
    match ins.arg {
        Arg::JumpTarget(target) => Ok(target),
        _ => m.code.jump_target(dest).ok_or(Fault::InvalidJump),
    }
}

pub fn jump(m: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    let dest = m.frame.stack.pop_unchecked();
    Ok(Flow::Jump(destination(m, ins, dest)?))
}

pub fn jumpi(m: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    let dest = m.frame.stack.pop_unchecked();
    let cond = m.frame.stack.pop_unchecked();
    if cond.is_zero() {
        return Ok(Flow::Continue);
    }
    Ok(Flow::Jump(destination(m, ins, dest)?))
}

pub fn pc(m: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    m.frame.stack.push_unchecked(Word::from(ins.pc));
    Ok(Flow::Continue)
}

/// Gas left as a per-instruction schedule would see it.
pub fn gas(m: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    let left = m.frame.gas.remaining() + gas_correction(ins);
    m.frame.stack.push_unchecked(Word::from(left));
    Ok(Flow::Continue)
}

pub fn stop(_: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    Ok(Flow::Halt(Halt::Stop))
}

fn output(m: &mut Machine<'_>) -> Result<Vec<u8>, Fault> {
    let offset = m.frame.stack.pop_unchecked();
    let len = m.frame.stack.pop_unchecked();
    Ok(match m.memory.resize_for(offset, len, &mut m.frame.gas)? {
        Some((at, n)) => m.memory.slice(at, n).to_vec(),
        None => Vec::new(),
    })
}

pub fn ret(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    if m.frame.context.is_create && m.table.flags().code_size_limit {
        let len = m.frame.stack.peek_unchecked(1);
        if word::saturating_u64(len) > MAX_CODE_SIZE as u64 {
            return Err(Fault::OutputTooLarge);
        }
    }
    Ok(Flow::Halt(Halt::Return(output(m)?)))
}

pub fn revert(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    Ok(Flow::Halt(Halt::Revert(output(m)?)))
}

/// INVALID and every opcode the active fork does not define.
pub fn invalid(_: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    Err(Fault::InvalidOpcode(ins.opcode))
}
