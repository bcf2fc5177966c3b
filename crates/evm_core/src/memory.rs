//! Linear memory.
//!
//! One `SharedMemory` backs an entire call tree. Each frame works on a
//! view that starts at a checkpoint inside the shared buffer: the child's
//! address 0 is the parent's current end, so nested calls reuse one
//! allocation and the parent's bytes stay out of the child's reach.
//! Leaving a view truncates the buffer back to its checkpoint, keeping
//! the capacity for the next sibling.

use crate::error::Fault;
use crate::gas::{memory_gas, Gas};
use crate::word::{words_for, Word, WORD_BYTES};

/// Default ceiling for a single view, independent of gas.
pub const DEFAULT_MEMORY_LIMIT: u64 = u32::MAX as u64;

#[derive(Debug)]
pub struct SharedMemory {
    buffer: Vec<u8>,
    checkpoints: Vec<usize>,
    current: usize,
    limit: u64,
}

impl Default for SharedMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedMemory {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_MEMORY_LIMIT)
    }

    pub fn with_limit(limit: u64) -> Self {
        Self {
            buffer: Vec::with_capacity(4 * 1024),
            checkpoints: Vec::with_capacity(32),
            current: 0,
            limit,
        }
    }

    /// Opens a new view at the end of the buffer.
    pub fn enter_context(&mut self) {
        self.checkpoints.push(self.current);
        self.current = self.buffer.len();
    }

    /// Drops the active view and resumes the enclosing one.
    pub fn exit_context(&mut self) {
        self.buffer.truncate(self.current);
        self.current = self.checkpoints.pop().unwrap_or(0);
    }

    /// Number of views currently open.
    pub fn depth(&self) -> usize {
        self.checkpoints.len()
    }

    /// Logical size of the active view, always a multiple of 32.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len() - self.current
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes backing every open view. Retained across views.
    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Cost of growing the active view to `new_size` bytes, rounded to words.
    /// Zero when no growth is needed.
    pub fn expansion_cost(&self, new_size: u64) -> Result<u64, Fault> {
        if new_size > self.limit {
            return Err(Fault::MemorySizeOverflow);
        }
        let old_words = (self.len() / WORD_BYTES) as u64;
        let new_words = words_for(new_size);
        if new_words <= old_words {
            return Ok(0);
        }
        Ok(memory_gas(new_words) - memory_gas(old_words))
    }

    /// Grows the active view to hold `new_size` bytes, charging only the
    /// words that were not paid for yet.
    pub fn ensure_size(&mut self, new_size: u64, gas: &mut Gas) -> Result<(), Fault> {
        let cost = self.expansion_cost(new_size)?;
        if cost == 0 {
            return Ok(());
        }
        gas.charge(cost)?;
        let words = words_for(new_size) as usize;
        self.buffer.resize(self.current + words * WORD_BYTES, 0);
        Ok(())
    }

    /// Validates an `(offset, len)` pair popped from the stack and grows the
    /// view to cover it. Zero-length ranges never expand, whatever the offset.
    pub fn resize_for(&mut self, offset: Word, len: Word, gas: &mut Gas) -> Result<Option<(usize, usize)>, Fault> {
        if len.is_zero() {
            return Ok(None);
        }
        let (offset, len) = match (crate::word::to_u64(offset), crate::word::to_u64(len)) {
            (Some(o), Some(l)) => (o, l),
            _ => return Err(Fault::MemorySizeOverflow),
        };
        let end = offset.checked_add(len).ok_or(Fault::MemorySizeOverflow)?;
        self.ensure_size(end, gas)?;
        Ok(Some((offset as usize, len as usize)))
    }

    // ── Public, self-expanding accessors ─────────────────────────

    pub fn load(&mut self, offset: usize, len: usize, gas: &mut Gas) -> Result<&[u8], Fault> {
        if len == 0 {
            return Ok(&[]);
        }
        self.ensure_size(end_of(offset, len)?, gas)?;
        Ok(self.slice(offset, len))
    }

    pub fn store(&mut self, offset: usize, data: &[u8], gas: &mut Gas) -> Result<(), Fault> {
        if data.is_empty() {
            return Ok(());
        }
        self.ensure_size(end_of(offset, data.len())?, gas)?;
        self.set(offset, data);
        Ok(())
    }

    pub fn store_word(&mut self, offset: usize, value: Word, gas: &mut Gas) -> Result<(), Fault> {
        self.ensure_size(end_of(offset, WORD_BYTES)?, gas)?;
        self.set_word(offset, value);
        Ok(())
    }

    pub fn store_byte(&mut self, offset: usize, byte: u8, gas: &mut Gas) -> Result<(), Fault> {
        self.ensure_size(end_of(offset, 1)?, gas)?;
        self.set_byte(offset, byte);
        Ok(())
    }

    // ── Pre-sized access ─────────────────────────────────────────
    //
    // Callers must have grown the view with `ensure_size`/`resize_for`.

    #[inline]
    pub(crate) fn slice(&self, offset: usize, len: usize) -> &[u8] {
        let start = self.current + offset;
        &self.buffer[start..start + len]
    }

    #[inline]
    pub(crate) fn set(&mut self, offset: usize, data: &[u8]) {
        let start = self.current + offset;
        self.buffer[start..start + data.len()].copy_from_slice(data);
    }

    #[inline]
    pub(crate) fn get_word(&self, offset: usize) -> Word {
        Word::from_big_endian(self.slice(offset, WORD_BYTES))
    }

    #[inline]
    pub(crate) fn set_word(&mut self, offset: usize, value: Word) {
        let start = self.current + offset;
        value.to_big_endian(&mut self.buffer[start..start + WORD_BYTES]);
    }

    #[inline]
    pub(crate) fn set_byte(&mut self, offset: usize, byte: u8) {
        self.buffer[self.current + offset] = byte;
    }

    /// Overlap-safe move inside the active view (MCOPY).
    pub(crate) fn copy_within(&mut self, src: usize, dst: usize, len: usize) {
        let base = self.current;
        self.buffer.copy_within(base + src..base + src + len, base + dst);
    }

    /// Copies `len` bytes of `data` starting at `data_offset` to `offset`,
    /// zero-filling whatever lies past the end of `data`.
    pub(crate) fn set_padded(&mut self, offset: usize, data_offset: u64, len: usize, data: &[u8]) {
        let start = self.current + offset;
        let dst = &mut self.buffer[start..start + len];
        let src_start = usize::try_from(data_offset).unwrap_or(usize::MAX).min(data.len());
        let available = (data.len() - src_start).min(len);
        dst[..available].copy_from_slice(&data[src_start..src_start + available]);
        dst[available..].fill(0);
    }
}

fn end_of(offset: usize, len: usize) -> Result<u64, Fault> {
    (offset as u64)
        .checked_add(len as u64)
        .ok_or(Fault::MemorySizeOverflow)
}
