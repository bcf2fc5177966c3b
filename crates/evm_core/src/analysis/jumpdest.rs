use crate::opcode::{immediate_size, JUMPDEST};

/// One bit per code byte, set where a JUMPDEST opcode (not PUSH data) sits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpDestMap {
    bits: Vec<u64>,
    len: usize,
}

impl JumpDestMap {
    pub fn scan(code: &[u8]) -> Self {
        let mut map = Self {
            bits: vec![0; code.len().div_ceil(64)],
            len: code.len(),
        };
        let mut pc = 0;
        while pc < code.len() {
            let op = code[pc];
            if op == JUMPDEST {
                map.set(pc);
            }
            pc += 1 + immediate_size(op);
        }
        map
    }

    #[inline]
    fn split(pc: usize) -> (usize, u64) {
        (pc >> 6, 1u64 << (pc & 63))
    }

    fn set(&mut self, pc: usize) {
        let (word, mask) = Self::split(pc);
        self.bits[word] |= mask;
    }

    #[inline]
    pub fn is_set(&self, pc: usize) -> bool {
        if pc >= self.len {
            return false;
        }
        let (word, mask) = Self::split(pc);
        self.bits[word] & mask != 0
    }

    pub fn count(&self) -> usize {
        self.bits.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Length of the code the map covers.
    pub fn code_len(&self) -> usize {
        self.len
    }
}
