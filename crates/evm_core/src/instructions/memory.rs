use super::{copy_range, push_op, word_offset, Instruction};
use crate::error::Fault;
use crate::interpreter::{Flow, Machine};
use crate::word::{self, Word, WORD_BYTES};

pub fn mload(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let offset = m.frame.stack.peek_unchecked(0);
    let at = word_offset(m, offset, WORD_BYTES as u64)?;
    *m.frame.stack.top_mut_unchecked() = m.memory.get_word(at);
    Ok(Flow::Continue)
}

pub fn mstore(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let offset = m.frame.stack.pop_unchecked();
    let value = m.frame.stack.pop_unchecked();
    let at = word_offset(m, offset, WORD_BYTES as u64)?;
    m.memory.set_word(at, value);
    Ok(Flow::Continue)
}

pub fn mstore8(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let offset = m.frame.stack.pop_unchecked();
    let value = m.frame.stack.pop_unchecked();
    let at = word_offset(m, offset, 1)?;
    m.memory.set_byte(at, value.low_u32() as u8);
    Ok(Flow::Continue)
}

push_op!(msize, |m| Word::from(m.memory.len()));

pub fn mcopy(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let dst = m.frame.stack.pop_unchecked();
    let src = m.frame.stack.pop_unchecked();
    let len = m.frame.stack.pop_unchecked();
    let Some((dst, n)) = copy_range(m, dst, len)? else {
        return Ok(Flow::Continue);
    };
    let src = word::to_u64(src).ok_or(Fault::MemorySizeOverflow)?;
    let end = src.checked_add(n as u64).ok_or(Fault::MemorySizeOverflow)?;
    m.memory.ensure_size(end, &mut m.frame.gas)?;
    m.memory.copy_within(src as usize, dst, n);
    Ok(Flow::Continue)
}
