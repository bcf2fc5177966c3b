#![allow(dead_code)]

use std::collections::{HashMap, HashSet};

use evm_core::{
    Access, Address, CallContext, CallRequest, CallResult, Environment, EvmConfig, ExecutionResult,
    FrameInput, Hardfork, Host, Interpreter, Log, SharedMemory, Word, B256,
};

pub const GAS: u64 = 100_000;

/// Host double: flat storage, a warm set and a scripted answer for every
/// nested call. Records what the interpreter asked for.
#[derive(Default)]
pub struct MockHost {
    pub env: Environment,
    pub storage: HashMap<(Address, Word), Word>,
    pub original: HashMap<(Address, Word), Word>,
    pub transient: HashMap<(Address, Word), Word>,
    pub warm: HashSet<Access>,
    pub balances: HashMap<Address, Word>,
    pub code: HashMap<Address, Vec<u8>>,
    pub logs: Vec<Log>,
    pub calls: Vec<CallRequest>,
    pub call_result: Option<CallResult>,
    pub destructed: Vec<(Address, Address)>,
    pub static_violation: bool,
}

impl Host for MockHost {
    fn env(&self) -> &Environment {
        &self.env
    }

    fn get_storage(&mut self, address: Address, key: Word) -> Word {
        self.storage.get(&(address, key)).copied().unwrap_or_default()
    }

    fn original_storage(&mut self, address: Address, key: Word) -> Word {
        match self.original.get(&(address, key)) {
            Some(v) => *v,
            None => self.get_storage(address, key),
        }
    }

    fn set_storage(&mut self, address: Address, key: Word, value: Word) {
        let current = self.get_storage(address, key);
        self.original.entry((address, key)).or_insert(current);
        self.storage.insert((address, key), value);
    }

    fn get_transient(&mut self, address: Address, key: Word) -> Word {
        self.transient.get(&(address, key)).copied().unwrap_or_default()
    }

    fn set_transient(&mut self, address: Address, key: Word, value: Word) {
        self.transient.insert((address, key), value);
    }

    fn mark_warm(&mut self, access: Access) -> bool {
        self.warm.insert(access)
    }

    fn get_balance(&mut self, address: Address) -> Word {
        self.balances.get(&address).copied().unwrap_or_default()
    }

    fn get_code(&mut self, address: Address) -> Vec<u8> {
        self.code.get(&address).cloned().unwrap_or_default()
    }

    fn get_code_hash(&mut self, _: Address) -> B256 {
        B256::repeat_byte(0xcc)
    }

    fn is_empty_account(&mut self, address: Address) -> bool {
        !self.balances.contains_key(&address) && !self.code.contains_key(&address)
    }

    fn block_hash(&mut self, number: u64) -> B256 {
        B256::from_low_u64_be(number + 1000)
    }

    fn perform_call(&mut self, request: CallRequest, memory: &mut SharedMemory) -> CallResult {
        // a child must never see the parent's bytes
        memory.enter_context();
        assert!(memory.is_empty());
        memory.exit_context();
        self.calls.push(request.clone());
        self.call_result.clone().unwrap_or(CallResult {
            success: true,
            gas_left: request.gas,
            output: Vec::new(),
            created: None,
        })
    }

    fn emit_log(&mut self, log: Log) {
        self.logs.push(log);
    }

    fn mark_for_destruction(&mut self, address: Address, beneficiary: Address) -> bool {
        let first = !self.destructed.iter().any(|(a, _)| *a == address);
        self.destructed.push((address, beneficiary));
        first
    }

    fn is_static_violation(&self) -> bool {
        self.static_violation
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn contract() -> Address {
    Address::repeat_byte(0xc0)
}

pub fn input(gas: u64) -> FrameInput {
    FrameInput {
        context: CallContext {
            address: contract(),
            caller: Address::repeat_byte(0xca),
            ..Default::default()
        },
        input: Vec::new(),
        gas_limit: gas,
    }
}

pub fn run_on(fork: Hardfork, code: &[u8], input: FrameInput, host: &mut MockHost) -> ExecutionResult {
    init_tracing();
    let vm = Interpreter::new(EvmConfig::for_fork(fork));
    let mut memory = vm.new_memory();
    vm.execute(input, code, &mut memory, host)
}

pub fn run(code: &[u8]) -> ExecutionResult {
    run_on(Hardfork::Cancun, code, input(GAS), &mut MockHost::default())
}

pub fn word(n: u64) -> [u8; 32] {
    let mut out = [0u8; 32];
    out[24..].copy_from_slice(&n.to_be_bytes());
    out
}
