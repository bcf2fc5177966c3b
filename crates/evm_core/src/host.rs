//! Boundary to the state and call-orchestration layer.
//!
//! The interpreter never touches accounts, storage or logs itself; it
//! asks the host. Nested calls go through `perform_call`, which runs the
//! child synchronously on the same `SharedMemory` and reports success
//! plus leftover gas. A failed child is an ordinary result for the
//! parent, never a fault.

use serde::{Deserialize, Serialize};

use crate::memory::SharedMemory;
use crate::word::{Address, Word, B256};

/// Block and transaction context visible to the running code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    pub coinbase: Address,
    pub timestamp: u64,
    pub number: u64,
    pub prevrandao: Word,
    pub gas_limit: u64,
    pub chain_id: u64,
    pub base_fee: Word,
    pub blob_base_fee: Word,
    pub origin: Address,
    pub gas_price: Word,
    pub blob_hashes: Vec<B256>,
}

/// Item whose first touch in a transaction is charged as cold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    Account(Address),
    Slot(Address, Word),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Create,
    Create2 { salt: Word },
}

impl CallKind {
    pub fn is_create(&self) -> bool {
        matches!(self, CallKind::Create | CallKind::Create2 { .. })
    }
}

/// Everything the host needs to run a child frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRequest {
    pub kind: CallKind,
    /// `msg.sender` seen by the child.
    pub caller: Address,
    /// Account whose code runs. Unused for creates.
    pub code_address: Address,
    /// Account whose storage and balance the child acts on.
    pub recipient: Address,
    /// Value visible as CALLVALUE in the child.
    pub value: Word,
    /// Whether `value` actually moves from `caller` to `recipient`.
    pub transfers_value: bool,
    /// Call data, or init code for creates.
    pub input: Vec<u8>,
    pub gas: u64,
    pub is_static: bool,
    /// Depth of the child frame.
    pub depth: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallResult {
    pub success: bool,
    pub gas_left: u64,
    pub output: Vec<u8>,
    /// Address of the new account on a successful create.
    pub created: Option<Address>,
}

impl CallResult {
    pub fn failure(gas_left: u64) -> Self {
        Self {
            success: false,
            gas_left,
            output: Vec::new(),
            created: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Vec<u8>,
}

pub trait Host {
    fn env(&self) -> &Environment;

    fn get_storage(&mut self, address: Address, key: Word) -> Word;
    /// Value of the slot at the start of the transaction.
    fn original_storage(&mut self, address: Address, key: Word) -> Word;
    fn set_storage(&mut self, address: Address, key: Word, value: Word);

    fn get_transient(&mut self, address: Address, key: Word) -> Word;
    fn set_transient(&mut self, address: Address, key: Word, value: Word);

    /// Marks `access` warm and reports whether it was cold before.
    fn mark_warm(&mut self, access: Access) -> bool;

    fn get_balance(&mut self, address: Address) -> Word;
    fn get_code(&mut self, address: Address) -> Vec<u8>;
    fn get_code_hash(&mut self, address: Address) -> B256;
    /// No code, zero nonce and zero balance (or not existing at all).
    fn is_empty_account(&mut self, address: Address) -> bool;
    fn block_hash(&mut self, number: u64) -> B256;

    fn perform_call(&mut self, request: CallRequest, memory: &mut SharedMemory) -> CallResult;

    fn emit_log(&mut self, log: Log);

    /// Returns `true` the first time `address` is scheduled in this transaction.
    fn mark_for_destruction(&mut self, address: Address, beneficiary: Address) -> bool;

    /// Extra static-context signal from the orchestration layer; the
    /// frame's own static flag is always honoured as well.
    fn is_static_violation(&self) -> bool {
        false
    }
}
