//! Word and address helpers shared by the stack, memory and handlers.

use primitive_types::{H160, H256, U256, U512};

/// 256-bit machine word.
pub type Word = U256;
/// 20-byte account identifier.
pub type Address = H160;
/// 32-byte hash (code hashes, log topics, block hashes).
pub type B256 = H256;

pub const WORD_BYTES: usize = 32;

/// Number of 32-byte words needed to hold `len` bytes.
#[inline]
pub fn words_for(len: u64) -> u64 {
    len.div_ceil(WORD_BYTES as u64)
}

/// Returns the value as `u64` if it fits.
#[inline]
pub fn to_u64(w: Word) -> Option<u64> {
    if w.0[1] != 0 || w.0[2] != 0 || w.0[3] != 0 {
        None
    } else {
        Some(w.0[0])
    }
}

#[inline]
pub fn saturating_u64(w: Word) -> u64 {
    to_u64(w).unwrap_or(u64::MAX)
}

#[inline]
pub fn saturating_usize(w: Word) -> usize {
    usize::try_from(saturating_u64(w)).unwrap_or(usize::MAX)
}

#[inline]
pub fn bool_word(b: bool) -> Word {
    if b {
        Word::one()
    } else {
        Word::zero()
    }
}

pub fn word_to_address(w: Word) -> Address {
    let mut bytes = [0u8; 32];
    w.to_big_endian(&mut bytes);
    Address::from_slice(&bytes[12..])
}

pub fn address_to_word(a: Address) -> Word {
    Word::from_big_endian(a.as_bytes())
}

pub fn word_to_b256(w: Word) -> B256 {
    let mut bytes = [0u8; 32];
    w.to_big_endian(&mut bytes);
    B256::from(bytes)
}

pub fn b256_to_word(h: B256) -> Word {
    Word::from_big_endian(h.as_bytes())
}

pub fn word_to_bytes(w: Word) -> [u8; 32] {
    let mut bytes = [0u8; 32];
    w.to_big_endian(&mut bytes);
    bytes
}

// ── Two's complement ─────────────────────────────────────────────

#[inline]
pub fn is_negative(w: Word) -> bool {
    w.bit(255)
}

#[inline]
pub fn negate(w: Word) -> Word {
    (!w).overflowing_add(Word::one()).0
}

#[inline]
fn abs(w: Word) -> Word {
    if is_negative(w) {
        negate(w)
    } else {
        w
    }
}

pub fn signed_div(a: Word, b: Word) -> Word {
    if b.is_zero() {
        return Word::zero();
    }
    let q = abs(a) / abs(b);
    if is_negative(a) != is_negative(b) {
        negate(q)
    } else {
        q
    }
}

pub fn signed_rem(a: Word, b: Word) -> Word {
    if b.is_zero() {
        return Word::zero();
    }
    let r = abs(a) % abs(b);
    if is_negative(a) {
        negate(r)
    } else {
        r
    }
}

pub fn signed_lt(a: Word, b: Word) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

pub fn arithmetic_shr(shift: Word, value: Word) -> Word {
    let negative = is_negative(value);
    match to_u64(shift) {
        Some(s) if s < 256 => {
            let s = s as usize;
            if negative {
                !((!value) >> s)
            } else {
                value >> s
            }
        }
        _ => {
            if negative {
                Word::MAX
            } else {
                Word::zero()
            }
        }
    }
}

pub fn sign_extend(byte_index: Word, value: Word) -> Word {
    match to_u64(byte_index) {
        Some(b) if b < 31 => {
            let bit = (b * 8 + 7) as usize;
            let mask = (Word::one() << bit) - Word::one();
            if value.bit(bit) {
                value | !mask
            } else {
                value & mask
            }
        }
        _ => value,
    }
}

// ── Modular arithmetic over 512 bits ─────────────────────────────

fn low_half(x: U512) -> Word {
    let U512(ref limbs) = x;
    U256([limbs[0], limbs[1], limbs[2], limbs[3]])
}

pub fn add_mod(a: Word, b: Word, n: Word) -> Word {
    if n.is_zero() {
        return Word::zero();
    }
    low_half((U512::from(a) + U512::from(b)) % U512::from(n))
}

pub fn mul_mod(a: Word, b: Word, n: Word) -> Word {
    if n.is_zero() {
        return Word::zero();
    }
    low_half(a.full_mul(b) % U512::from(n))
}
