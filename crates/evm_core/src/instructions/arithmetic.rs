use super::{binary_op, Instruction};
use crate::error::Fault;
use crate::interpreter::{Flow, Machine};
use crate::word::{self, Word};

binary_op!(add, |a, b| a.overflowing_add(b).0);
binary_op!(mul, |a, b| a.overflowing_mul(b).0);
binary_op!(sub, |a, b| a.overflowing_sub(b).0);
binary_op!(div, |a, b| if b.is_zero() { Word::zero() } else { a / b });
binary_op!(sdiv, |a, b| word::signed_div(a, b));
binary_op!(rem, |a, b| if b.is_zero() { Word::zero() } else { a % b });
binary_op!(srem, |a, b| word::signed_rem(a, b));
binary_op!(signextend, |a, b| word::sign_extend(a, b));

pub fn addmod(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let s = &mut m.frame.stack;
    let a = s.pop_unchecked();
    let b = s.pop_unchecked();
    let n = s.top_mut_unchecked();
    *n = word::add_mod(a, b, *n);
    Ok(Flow::Continue)
}

pub fn mulmod(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let s = &mut m.frame.stack;
    let a = s.pop_unchecked();
    let b = s.pop_unchecked();
    let n = s.top_mut_unchecked();
    *n = word::mul_mod(a, b, *n);
    Ok(Flow::Continue)
}

pub fn exp(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let base = m.frame.stack.pop_unchecked();
    let exponent = m.frame.stack.peek_unchecked(0);
    m.frame.gas.charge(m.table.schedule().exp_cost(exponent))?;
    *m.frame.stack.top_mut_unchecked() = base.overflowing_pow(exponent).0;
    Ok(Flow::Continue)
}
