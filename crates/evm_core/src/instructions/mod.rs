//! Opcode handlers.
//!
//! Every handler runs inside a block whose entry already checked the
//! stack bounds and charged the static gas, so stack access goes through
//! the unchecked paths. Anything dynamic is charged right before the
//! effect it pays for.

pub mod arithmetic;
pub mod bitwise;
pub mod control;
pub mod environment;
pub mod memory;
pub mod stack;
pub mod storage;
pub mod system;

use crate::analysis::{Arg, Instruction};
use crate::error::Fault;
use crate::host::Access;
use crate::interpreter::Machine;
use crate::word::{self, Address, Word};

/// Declares a handler that replaces the top two words `a` (top) and `b`
/// with a single result.
macro_rules! binary_op {
    ($name:ident, |$a:ident, $b:ident| $body:expr) => {
        pub fn $name(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
            let $a = m.frame.stack.pop_unchecked();
            let top = m.frame.stack.top_mut_unchecked();
            let $b = *top;
            *top = $body;
            Ok(Flow::Continue)
        }
    };
}

macro_rules! unary_op {
    ($name:ident, |$a:ident| $body:expr) => {
        pub fn $name(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
            let top = m.frame.stack.top_mut_unchecked();
            let $a = *top;
            *top = $body;
            Ok(Flow::Continue)
        }
    };
}

/// Declares a handler that pushes one value computed from the machine.
macro_rules! push_op {
    ($name:ident, |$m:ident| $body:expr) => {
        pub fn $name($m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
            let value: Word = $body;
            $m.frame.stack.push_unchecked(value);
            Ok(Flow::Continue)
        }
    };
}

pub(crate) use {binary_op, push_op, unary_op};

/// Block gas already charged for the instructions after `ins`.
#[inline]
pub(crate) fn gas_correction(ins: &Instruction) -> u64 {
    match ins.arg {
        Arg::GasCorrection(c) => c,
        _ => 0,
    }
}

/// Charges the cold-account surcharge on first touch (Berlin and later).
pub(crate) fn charge_account_access(m: &mut Machine<'_>, address: Address) -> Result<(), Fault> {
    let surcharge = m.table.schedule().cold_account_surcharge;
    if surcharge > 0 && m.host.mark_warm(Access::Account(address)) {
        m.frame.gas.charge(surcharge)?;
    }
    Ok(())
}

pub(crate) fn pop_address(m: &mut Machine<'_>) -> Address {
    word::word_to_address(m.frame.stack.pop_unchecked())
}

/// Grows memory to cover a full word at `offset` and returns it as an index.
pub(crate) fn word_offset(m: &mut Machine<'_>, offset: Word, width: u64) -> Result<usize, Fault> {
    let start = word::to_u64(offset).ok_or(Fault::MemorySizeOverflow)?;
    let end = start.checked_add(width).ok_or(Fault::MemorySizeOverflow)?;
    m.memory.ensure_size(end, &mut m.frame.gas)?;
    Ok(start as usize)
}

/// Copy-family prologue: charges the per-word copy cost and grows memory
/// for `[dst, dst + len)`. Returns `None` for a zero-length copy.
pub(crate) fn copy_range(m: &mut Machine<'_>, dst: Word, len: Word) -> Result<Option<(usize, usize)>, Fault> {
    if len.is_zero() {
        return Ok(None);
    }
    let n = word::to_u64(len).ok_or(Fault::OutOfGas)?;
    m.frame.gas.charge(crate::gas::copy_cost(n))?;
    m.memory.resize_for(dst, len, &mut m.frame.gas)
}
