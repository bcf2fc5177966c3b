use crate::error::Fault;
use crate::word::Word;

/// Maximum number of words on the operand stack.
pub const STACK_LIMIT: usize = 1024;

/// Fixed-capacity operand stack. Storage is allocated once per frame and
/// never grows.
pub struct Stack {
    data: Box<[Word]>,
    len: usize,
}

impl Default for Stack {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl Stack {
    pub fn new() -> Self {
        Self {
            data: vec![Word::zero(); STACK_LIMIT].into_boxed_slice(),
            len: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        STACK_LIMIT
    }

    /// Bottom-to-top view of the live words.
    pub fn as_slice(&self) -> &[Word] {
        &self.data[..self.len]
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn push(&mut self, w: Word) -> Result<(), Fault> {
        if self.len == STACK_LIMIT {
            return Err(Fault::StackOverflow);
        }
        self.data[self.len] = w;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Result<Word, Fault> {
        if self.len == 0 {
            return Err(Fault::StackUnderflow);
        }
        self.len -= 1;
        Ok(self.data[self.len])
    }

    /// `n`-th word from the top, `0` being the top itself.
    pub fn peek(&self, n: usize) -> Result<Word, Fault> {
        if n >= self.len {
            return Err(Fault::StackUnderflow);
        }
        Ok(self.data[self.len - 1 - n])
    }

    /// Pushes a copy of the `n`-th word from the top (`dup(1)` copies the top).
    pub fn dup(&mut self, n: usize) -> Result<(), Fault> {
        if n == 0 || n > self.len {
            return Err(Fault::StackUnderflow);
        }
        if self.len == STACK_LIMIT {
            return Err(Fault::StackOverflow);
        }
        self.data[self.len] = self.data[self.len - n];
        self.len += 1;
        Ok(())
    }

    /// Exchanges the top with the word `n` positions below it.
    pub fn swap(&mut self, n: usize) -> Result<(), Fault> {
        if n == 0 || self.len < n + 1 {
            return Err(Fault::StackUnderflow);
        }
        let top = self.len - 1;
        self.data.swap(top, top - n);
        Ok(())
    }

    pub fn push_u64(&mut self, v: u64) -> Result<(), Fault> {
        self.push(Word::from(v))
    }

    /// Pops the top word truncated to its low 64 bits.
    pub fn pop_u64(&mut self) -> Result<u64, Fault> {
        Ok(self.pop()?.low_u64())
    }

    // ── Pre-validated paths ──────────────────────────────────────
    //
    // Only reachable from handlers, which run after block entry proved
    // that every stack access in the block stays within bounds.

    #[inline(always)]
    pub(crate) fn push_unchecked(&mut self, w: Word) {
        debug_assert!(self.len < STACK_LIMIT);
        self.data[self.len] = w;
        self.len += 1;
    }

    #[inline(always)]
    pub(crate) fn pop_unchecked(&mut self) -> Word {
        debug_assert!(self.len > 0);
        self.len -= 1;
        self.data[self.len]
    }

    #[inline(always)]
    pub(crate) fn peek_unchecked(&self, n: usize) -> Word {
        self.data[self.len - 1 - n]
    }

    #[inline(always)]
    pub(crate) fn top_mut_unchecked(&mut self) -> &mut Word {
        &mut self.data[self.len - 1]
    }

    #[inline(always)]
    pub(crate) fn dup_unchecked(&mut self, n: usize) {
        self.data[self.len] = self.data[self.len - n];
        self.len += 1;
    }

    #[inline(always)]
    pub(crate) fn swap_unchecked(&mut self, n: usize) {
        let top = self.len - 1;
        self.data.swap(top, top - n);
    }
}
