use super::{binary_op, unary_op, Instruction};
use crate::error::Fault;
use crate::interpreter::{Flow, Machine};
use crate::word::{self, bool_word, Word};

binary_op!(lt, |a, b| bool_word(a < b));
binary_op!(gt, |a, b| bool_word(a > b));
binary_op!(slt, |a, b| bool_word(word::signed_lt(a, b)));
binary_op!(sgt, |a, b| bool_word(word::signed_lt(b, a)));
binary_op!(eq, |a, b| bool_word(a == b));
unary_op!(iszero, |a| bool_word(a.is_zero()));
binary_op!(and, |a, b| a & b);
binary_op!(or, |a, b| a | b);
binary_op!(xor, |a, b| a ^ b);
unary_op!(not, |a| !a);

binary_op!(byte, |i, x| match word::to_u64(i) {
    Some(i) if i < 32 => Word::from(x.byte(31 - i as usize)),
    _ => Word::zero(),
});

binary_op!(shl, |shift, value| match word::to_u64(shift) {
    Some(s) if s < 256 => value << s as usize,
    _ => Word::zero(),
});

binary_op!(shr, |shift, value| match word::to_u64(shift) {
    Some(s) if s < 256 => value >> s as usize,
    _ => Word::zero(),
});

binary_op!(sar, |shift, value| word::arithmetic_shr(shift, value));
