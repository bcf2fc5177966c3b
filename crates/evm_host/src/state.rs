use std::collections::{HashMap, HashSet};

use evm_core::{Access, Address, Log, Word};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: Word,
    pub nonce: u64,
    pub code: Vec<u8>,
    pub storage: HashMap<Word, Word>,
}

impl Account {
    pub fn with_balance(balance: impl Into<Word>) -> Self {
        Self {
            balance: balance.into(),
            ..Self::default()
        }
    }

    pub fn with_code(code: impl Into<Vec<u8>>) -> Self {
        Self {
            code: code.into(),
            ..Self::default()
        }
    }

    /// No code, zero nonce and zero balance.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.nonce == 0 && self.balance.is_zero()
    }
}

/// Everything a failed frame must roll back.
#[derive(Debug, Clone, Default)]
pub(crate) struct Journaled {
    pub accounts: HashMap<Address, Account>,
    pub transient: HashMap<(Address, Word), Word>,
    pub warm: HashSet<Access>,
    pub logs: Vec<Log>,
    pub destructed: HashSet<Address>,
    pub created: HashSet<Address>,
    pub refund: i64,
}

impl Journaled {
    pub fn account_mut(&mut self, address: Address) -> &mut Account {
        self.accounts.entry(address).or_default()
    }

    /// Moves `value` from `from` to `to`. Returns `false`, changing
    /// nothing, when `from` cannot cover it.
    pub fn transfer(&mut self, from: Address, to: Address, value: Word) -> bool {
        let available = self.accounts.get(&from).map_or(Word::zero(), |a| a.balance);
        if available < value {
            return false;
        }
        if value.is_zero() || from == to {
            return true;
        }
        self.account_mut(from).balance = available - value;
        let dest = self.account_mut(to);
        dest.balance = dest.balance.overflowing_add(value).0;
        true
    }
}
