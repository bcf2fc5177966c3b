use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use super::{analyze, CodeAnalysis, CodeHash};
use crate::dispatch::DispatchTable;
use crate::fork::Hardfork;

type Key = (CodeHash, Hardfork);

#[derive(Debug, Default)]
struct Entries {
    map: HashMap<Key, Arc<CodeAnalysis>>,
    order: VecDeque<Key>,
}

/// Shared store of code analyses, keyed by code hash and fork.
///
/// Lookups take the read lock; a miss analyses outside any lock and then
/// inserts under the write lock, keeping whichever analysis got there
/// first. Oldest entries are evicted once `capacity` is reached.
#[derive(Debug)]
pub struct AnalysisCache {
    entries: RwLock<Entries>,
    capacity: usize,
}

impl AnalysisCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            capacity: capacity.max(1),
        }
    }

    pub fn get(&self, hash: &CodeHash, fork: Hardfork) -> Option<Arc<CodeAnalysis>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.map.get(&(*hash, fork)).cloned()
    }

    pub fn get_or_analyze(&self, code: &[u8], table: &DispatchTable) -> Arc<CodeAnalysis> {
        let hash = CodeHash::of(code);
        if let Some(hit) = self.get(&hash, table.fork()) {
            return hit;
        }

        let fresh = Arc::new(analyze(code, table));
        debug!(
            code_hash = %hash,
            fork = ?table.fork(),
            bytes = code.len(),
            blocks = fresh.blocks().len(),
            "analysis cache miss"
        );

        let key = (hash, table.fork());
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(raced) = entries.map.get(&key) {
            return Arc::clone(raced);
        }
        while entries.map.len() >= self.capacity {
            let Some(oldest) = entries.order.pop_front() else { break };
            entries.map.remove(&oldest);
        }
        entries.order.push_back(key);
        entries.map.insert(key, Arc::clone(&fresh));
        fresh
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.map.clear();
        entries.order.clear();
    }
}
