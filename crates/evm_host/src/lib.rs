//! Reference in-memory [`Host`] for `evm_core`.
//!
//! Keeps accounts, storage, logs and access lists in plain maps, journals
//! them per frame and runs nested calls and creates recursively through
//! the interpreter on the caller's `SharedMemory`. Meant for tests and
//! embedding experiments, not as a production state layer.

mod address;
mod state;

use std::collections::HashMap;
use std::sync::Arc;

use evm_core::gas::MAX_CODE_SIZE;
use evm_core::{
    Access, Address, CallContext, CallKind, CallRequest, CallResult, Environment, ExecutionResult,
    ForkFlags, FrameInput, Hardfork, Host, Interpreter, Log, Outcome, SharedMemory, Word, B256,
};
use sha3::{Digest, Keccak256};
use tracing::debug;

pub use address::{create2_address, create_address};
pub use state::Account;
use state::Journaled;

/// Gas per byte of deployed code.
pub const CODE_DEPOSIT_BYTE: u64 = 200;

/// Result of a top-level call or deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub result: ExecutionResult,
    /// Refund accumulated by the whole call tree.
    pub refund: i64,
    pub created: Option<Address>,
}

pub struct InMemoryHost {
    env: Environment,
    interpreter: Arc<Interpreter>,
    fork: Hardfork,
    flags: ForkFlags,
    state: Journaled,
    original: HashMap<(Address, Word), Word>,
    block_hashes: HashMap<u64, B256>,
}

impl InMemoryHost {
    pub fn new(env: Environment, interpreter: Arc<Interpreter>) -> Self {
        Self {
            fork: interpreter.config().hardfork,
            flags: interpreter.config().hardfork.flags(),
            env,
            interpreter,
            state: Journaled::default(),
            original: HashMap::new(),
            block_hashes: HashMap::new(),
        }
    }

    pub fn interpreter(&self) -> &Arc<Interpreter> {
        &self.interpreter
    }

    pub fn insert_account(&mut self, address: Address, account: Account) {
        self.state.accounts.insert(address, account);
    }

    pub fn account(&self, address: Address) -> Option<&Account> {
        self.state.accounts.get(&address)
    }

    pub fn storage(&self, address: Address, key: Word) -> Word {
        self.account(address)
            .and_then(|a| a.storage.get(&key).copied())
            .unwrap_or_default()
    }

    pub fn set_block_hash(&mut self, number: u64, hash: B256) {
        self.block_hashes.insert(number, hash);
    }

    pub fn logs(&self) -> &[Log] {
        &self.state.logs
    }

    pub fn is_destructed(&self, address: Address) -> bool {
        self.state.destructed.contains(&address)
    }

    /// Runs `input` against the code at `to` as a depth-0 message call.
    pub fn call(&mut self, caller: Address, to: Address, value: Word, input: Vec<u8>, gas: u64) -> Receipt {
        self.begin_transaction(caller, Some(to));
        let request = CallRequest {
            kind: CallKind::Call,
            caller,
            code_address: to,
            recipient: to,
            value,
            transfers_value: !value.is_zero(),
            input,
            gas,
            is_static: false,
            depth: 0,
        };
        self.top_level(request)
    }

    /// Deploys `init_code` from `caller` as a depth-0 create.
    pub fn deploy(&mut self, caller: Address, init_code: Vec<u8>, value: Word, gas: u64) -> Receipt {
        self.begin_transaction(caller, None);
        let request = CallRequest {
            kind: CallKind::Create,
            caller,
            code_address: Address::zero(),
            recipient: Address::zero(),
            value,
            transfers_value: !value.is_zero(),
            input: init_code,
            gas,
            is_static: false,
            depth: 0,
        };
        self.top_level(request)
    }

    /// Drops per-transaction data and removes self-destructed accounts.
    /// From Cancun only accounts created in the same transaction go.
    pub fn finalize_transaction(&mut self) {
        let destructed: Vec<Address> = self.state.destructed.drain().collect();
        for address in destructed {
            if self.fork < Hardfork::Cancun || self.state.created.contains(&address) {
                self.state.accounts.remove(&address);
            }
        }
        self.state.created.clear();
        self.state.transient.clear();
        self.state.warm.clear();
        self.state.refund = 0;
        self.original.clear();
    }

    fn begin_transaction(&mut self, caller: Address, to: Option<Address>) {
        if self.flags.access_lists {
            self.state.warm.insert(Access::Account(caller));
            if let Some(to) = to {
                self.state.warm.insert(Access::Account(to));
            }
        }
    }

    fn top_level(&mut self, request: CallRequest) -> Receipt {
        let mut memory = self.interpreter.new_memory();
        let (result, created) = self.dispatch(request, &mut memory);
        let refund = if result.is_success() { self.state.refund } else { 0 };
        Receipt { result, refund, created }
    }

    fn dispatch(&mut self, request: CallRequest, memory: &mut SharedMemory) -> (ExecutionResult, Option<Address>) {
        if request.kind.is_create() {
            self.run_create(request, memory)
        } else {
            (self.run_call(request, memory), None)
        }
    }

    fn run_call(&mut self, req: CallRequest, memory: &mut SharedMemory) -> ExecutionResult {
        let checkpoint = self.state.clone();
        if req.transfers_value && !self.state.transfer(req.caller, req.recipient, req.value) {
            debug!(caller = ?req.caller, value = %req.value, "insufficient balance for call");
            return untouched(req.gas);
        }
        if req.transfers_value || !self.flags.empty_account_rule {
            self.state.account_mut(req.recipient);
        }

        let code = self.get_code(req.code_address);
        let input = FrameInput {
            context: CallContext {
                address: req.recipient,
                caller: req.caller,
                value: req.value,
                is_static: req.is_static,
                depth: req.depth,
                is_create: false,
            },
            input: req.input,
            gas_limit: req.gas,
        };
        let vm = Arc::clone(&self.interpreter);
        let result = vm.execute(input, &code, memory, self);
        if result.is_success() {
            self.state.refund += result.refund;
        } else {
            self.state = checkpoint;
        }
        result
    }

    fn run_create(&mut self, req: CallRequest, memory: &mut SharedMemory) -> (ExecutionResult, Option<Address>) {
        let sender = req.caller;
        let available = self.state.accounts.get(&sender).map_or(Word::zero(), |a| a.balance);
        if available < req.value {
            return (untouched(req.gas), None);
        }
        let nonce = self.state.account_mut(sender).nonce;
        self.state.account_mut(sender).nonce = nonce.saturating_add(1);
        let address = match req.kind {
            CallKind::Create2 { salt } => create2_address(sender, salt, &req.input),
            _ => create_address(sender, nonce),
        };
        if self.flags.access_lists {
            self.state.warm.insert(Access::Account(address));
        }
        let collides = self
            .state
            .accounts
            .get(&address)
            .is_some_and(|a| !a.code.is_empty() || a.nonce != 0);
        if collides {
            debug!(?address, "create collision");
            return (consumed(req.gas), None);
        }

        let checkpoint = self.state.clone();
        let account = self.state.account_mut(address);
        account.storage.clear();
        if self.flags.empty_account_rule {
            account.nonce = 1;
        }
        self.state.transfer(sender, address, req.value);
        self.state.created.insert(address);

        let input = FrameInput {
            context: CallContext {
                address,
                caller: sender,
                value: req.value,
                is_static: false,
                depth: req.depth,
                is_create: true,
            },
            input: Vec::new(),
            gas_limit: req.gas,
        };
        let vm = Arc::clone(&self.interpreter);
        let mut result = vm.execute(input, &req.input, memory, self);
        let code = match &result.outcome {
            Outcome::Stopped(code) => code.clone(),
            _ => {
                self.state = checkpoint;
                return (result, None);
            }
        };

        let deposit = CODE_DEPOSIT_BYTE * code.len() as u64;
        let rejected = (self.flags.code_size_limit && code.len() > MAX_CODE_SIZE)
            || (self.fork >= Hardfork::London && code.first() == Some(&0xef));
        if rejected || (deposit > result.gas_remaining && self.fork >= Hardfork::Homestead) {
            self.state = checkpoint;
            return (consumed(req.gas), None);
        }
        if deposit <= result.gas_remaining {
            result.gas_remaining -= deposit;
            result.gas_used += deposit;
            self.state.account_mut(address).code = code;
        }
        self.state.refund += result.refund;
        result.outcome = Outcome::Stopped(Vec::new());
        (result, Some(address))
    }
}

fn untouched(gas: u64) -> ExecutionResult {
    ExecutionResult {
        outcome: Outcome::Reverted(Vec::new()),
        gas_remaining: gas,
        gas_used: 0,
        refund: 0,
    }
}

fn consumed(gas: u64) -> ExecutionResult {
    ExecutionResult {
        outcome: Outcome::Faulted(evm_core::Fault::OutOfGas),
        gas_remaining: 0,
        gas_used: gas,
        refund: 0,
    }
}

impl Host for InMemoryHost {
    fn env(&self) -> &Environment {
        &self.env
    }

    fn get_storage(&mut self, address: Address, key: Word) -> Word {
        self.storage(address, key)
    }

    fn original_storage(&mut self, address: Address, key: Word) -> Word {
        match self.original.get(&(address, key)) {
            Some(v) => *v,
            None => self.storage(address, key),
        }
    }

    fn set_storage(&mut self, address: Address, key: Word, value: Word) {
        let current = self.storage(address, key);
        self.original.entry((address, key)).or_insert(current);
        let storage = &mut self.state.account_mut(address).storage;
        if value.is_zero() {
            storage.remove(&key);
        } else {
            storage.insert(key, value);
        }
    }

    fn get_transient(&mut self, address: Address, key: Word) -> Word {
        self.state.transient.get(&(address, key)).copied().unwrap_or_default()
    }

    fn set_transient(&mut self, address: Address, key: Word, value: Word) {
        self.state.transient.insert((address, key), value);
    }

    fn mark_warm(&mut self, access: Access) -> bool {
        self.state.warm.insert(access)
    }

    fn get_balance(&mut self, address: Address) -> Word {
        self.account(address).map_or(Word::zero(), |a| a.balance)
    }

    fn get_code(&mut self, address: Address) -> Vec<u8> {
        self.account(address).map(|a| a.code.clone()).unwrap_or_default()
    }

    fn get_code_hash(&mut self, address: Address) -> B256 {
        match self.account(address) {
            Some(a) if !(self.flags.empty_account_rule && a.is_empty()) => {
                B256::from_slice(&Keccak256::digest(&a.code))
            }
            _ => B256::zero(),
        }
    }

    fn is_empty_account(&mut self, address: Address) -> bool {
        self.account(address).map_or(true, Account::is_empty)
    }

    fn block_hash(&mut self, number: u64) -> B256 {
        self.block_hashes.get(&number).copied().unwrap_or_default()
    }

    fn perform_call(&mut self, request: CallRequest, memory: &mut SharedMemory) -> CallResult {
        let (result, created) = self.dispatch(request, memory);
        CallResult {
            success: result.is_success(),
            gas_left: result.gas_remaining,
            output: result.output().to_vec(),
            created,
        }
    }

    fn emit_log(&mut self, log: Log) {
        self.state.logs.push(log);
    }

    fn mark_for_destruction(&mut self, address: Address, beneficiary: Address) -> bool {
        let balance = self.get_balance(address);
        if beneficiary != address {
            self.state.transfer(address, beneficiary, balance);
        } else if self.fork < Hardfork::Cancun || self.state.created.contains(&address) {
            self.state.account_mut(address).balance = Word::zero();
        }
        self.state.destructed.insert(address)
    }
}
