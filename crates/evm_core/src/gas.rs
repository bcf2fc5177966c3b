//! Gas accounting: the per-frame meter, fork-dependent prices and the
//! dynamic cost formulas shared by the handlers.

use crate::error::Fault;
use crate::fork::ForkFlags;
use crate::word::{words_for, Word};

pub const ZERO: u64 = 0;
pub const BASE: u64 = 2;
pub const VERYLOW: u64 = 3;
pub const LOW: u64 = 5;
pub const MID: u64 = 8;
pub const HIGH: u64 = 10;
pub const JUMPDEST: u64 = 1;

pub const EXP: u64 = 10;
pub const KECCAK256: u64 = 30;
pub const KECCAK256_WORD: u64 = 6;
pub const COPY_WORD: u64 = 3;
pub const MEMORY_WORD: u64 = 3;
pub const QUAD_DIVISOR: u64 = 512;
pub const LOG: u64 = 375;
pub const LOG_TOPIC: u64 = 375;
pub const LOG_DATA: u64 = 8;
pub const BLOCKHASH: u64 = 20;
pub const BLOBHASH: u64 = 3;
pub const WARM_STORAGE_READ: u64 = 100;
pub const COLD_SLOAD: u64 = 2100;
pub const COLD_ACCOUNT_ACCESS: u64 = 2600;
pub const TRANSIENT: u64 = 100;

pub const CREATE: u64 = 32000;
pub const INITCODE_WORD: u64 = 2;
pub const CALL_VALUE: u64 = 9000;
pub const CALL_STIPEND: u64 = 2300;
pub const NEW_ACCOUNT: u64 = 25000;
pub const SSTORE_SET: u64 = 20000;
pub const SSTORE_RESET: u64 = 5000;
pub const SSTORE_SENTRY: u64 = CALL_STIPEND;

/// EIP-170 deployed code limit.
pub const MAX_CODE_SIZE: usize = 0x6000;
/// EIP-3860 init code limit.
pub const MAX_INITCODE_SIZE: usize = 2 * MAX_CODE_SIZE;

/// Per-frame gas meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gas {
    limit: u64,
    remaining: u64,
    refunded: i64,
}

impl Gas {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: limit,
            refunded: 0,
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn spent(&self) -> u64 {
        self.limit.saturating_sub(self.remaining)
    }

    pub fn refunded(&self) -> i64 {
        self.refunded
    }

    #[inline]
    pub fn charge(&mut self, cost: u64) -> Result<(), Fault> {
        if cost > self.remaining {
            return Err(Fault::OutOfGas);
        }
        self.remaining -= cost;
        Ok(())
    }

    /// Hands back gas a child call or a pre-charge did not use.
    #[inline]
    pub fn erase_cost(&mut self, returned: u64) {
        self.remaining = self.remaining.saturating_add(returned);
    }

    pub fn record_refund(&mut self, refund: i64) {
        self.refunded += refund;
    }

    pub(crate) fn exhaust(&mut self) {
        self.remaining = 0;
        self.refunded = 0;
    }

    pub(crate) fn clear_refund(&mut self) {
        self.refunded = 0;
    }
}

/// Prices that moved between forks. Values are static floors; cold-access
/// surcharges are charged at execution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSchedule {
    pub sload: u64,
    pub balance: u64,
    pub extcode: u64,
    pub extcodehash: u64,
    pub call: u64,
    pub selfdestruct: u64,
    pub exp_byte: u64,
    pub cold_sload_surcharge: u64,
    pub cold_account_surcharge: u64,
    pub sstore_clears_refund: i64,
    pub selfdestruct_refund: i64,
    flags: ForkFlags,
}

impl GasSchedule {
    pub fn new(flags: ForkFlags) -> Self {
        let (sload, balance, extcode, extcodehash, call) = if flags.access_lists {
            (WARM_STORAGE_READ, WARM_STORAGE_READ, WARM_STORAGE_READ, WARM_STORAGE_READ, WARM_STORAGE_READ)
        } else if flags.net_sstore {
            (800, 700, 700, 700, 700)
        } else if flags.all_but_one_64th {
            (200, 400, 700, 400, 700)
        } else {
            (50, 20, 20, 400, 40)
        };
        Self {
            sload,
            balance,
            extcode,
            extcodehash,
            call,
            selfdestruct: if flags.all_but_one_64th { 5000 } else { 0 },
            exp_byte: if flags.expensive_exp { 50 } else { 10 },
            cold_sload_surcharge: if flags.access_lists { COLD_SLOAD - WARM_STORAGE_READ } else { 0 },
            cold_account_surcharge: if flags.access_lists {
                COLD_ACCOUNT_ACCESS - WARM_STORAGE_READ
            } else {
                0
            },
            sstore_clears_refund: if flags.reduced_refunds { 4800 } else { 15000 },
            selfdestruct_refund: if flags.reduced_refunds { 0 } else { 24000 },
            flags,
        }
    }

    pub fn flags(&self) -> &ForkFlags {
        &self.flags
    }

    pub fn exp_cost(&self, exponent: Word) -> u64 {
        let bytes = (exponent.bits() as u64).div_ceil(8);
        self.exp_byte * bytes
    }

    /// Gas forwarded to a child after every other cost has been paid.
    pub fn call_gas(&self, remaining: u64, requested: Word) -> Result<u64, Fault> {
        if self.flags.all_but_one_64th {
            let cap = remaining - remaining / 64;
            Ok(crate::word::to_u64(requested).map_or(cap, |r| r.min(cap)))
        } else {
            match crate::word::to_u64(requested) {
                Some(r) if r <= remaining => Ok(r),
                _ => Err(Fault::OutOfGas),
            }
        }
    }

    /// SSTORE gas and refund delta for a write of `new` over a slot whose
    /// transaction-start value is `original` and current value is `current`.
    pub fn sstore_cost(&self, original: Word, current: Word, new: Word, was_cold: bool) -> SstoreCost {
        if !self.flags.net_sstore {
            let gas = if current.is_zero() && !new.is_zero() { SSTORE_SET } else { SSTORE_RESET };
            let refund = if !current.is_zero() && new.is_zero() { self.sstore_clears_refund } else { 0 };
            return SstoreCost { gas, refund };
        }

        let (read, reset) = if self.flags.access_lists {
            (WARM_STORAGE_READ, SSTORE_RESET - COLD_SLOAD)
        } else {
            (800, SSTORE_RESET)
        };
        let cold = if was_cold && self.flags.access_lists { COLD_SLOAD } else { 0 };
        let clears = self.sstore_clears_refund;

        if current == new {
            return SstoreCost { gas: read + cold, refund: 0 };
        }

        let mut refund = 0i64;
        let gas = if original == current {
            if !original.is_zero() && new.is_zero() {
                refund += clears;
            }
            if original.is_zero() { SSTORE_SET } else { reset }
        } else {
            if !original.is_zero() {
                if current.is_zero() {
                    refund -= clears;
                } else if new.is_zero() {
                    refund += clears;
                }
            }
            if original == new {
                refund += if original.is_zero() {
                    (SSTORE_SET - read) as i64
                } else {
                    (reset - read) as i64
                };
            }
            read
        };
        SstoreCost { gas: gas + cold, refund }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SstoreCost {
    pub gas: u64,
    pub refund: i64,
}

/// Total cost of a memory of `words` 32-byte words.
#[inline]
pub fn memory_gas(words: u64) -> u64 {
    MEMORY_WORD * words + words * words / QUAD_DIVISOR
}

#[inline]
pub fn copy_cost(len: u64) -> u64 {
    COPY_WORD * words_for(len)
}

#[inline]
pub fn keccak_cost(len: u64) -> u64 {
    KECCAK256_WORD * words_for(len)
}

#[inline]
pub fn log_cost(topics: u64, len: u64) -> u64 {
    LOG_TOPIC * topics + LOG_DATA * len
}
