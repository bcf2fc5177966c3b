use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::fork::Hardfork;
use crate::memory::DEFAULT_MEMORY_LIMIT;

pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;
pub const DEFAULT_CACHE_CAPACITY: usize = 4096;

/// Interpreter configuration. Every field has a default, so `{}` is a
/// valid JSON document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvmConfig {
    pub hardfork: Hardfork,
    pub max_call_depth: usize,
    /// Analyses kept before the oldest is evicted.
    pub analysis_cache_capacity: usize,
    /// Ceiling on one frame's memory view, in bytes.
    pub memory_limit: u64,
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self {
            hardfork: Hardfork::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            analysis_cache_capacity: DEFAULT_CACHE_CAPACITY,
            memory_limit: DEFAULT_MEMORY_LIMIT,
        }
    }
}

impl EvmConfig {
    pub fn for_fork(hardfork: Hardfork) -> Self {
        Self {
            hardfork,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_call_depth == 0 {
            return Err(ConfigError::Invalid("max_call_depth must be at least 1".into()));
        }
        if self.analysis_cache_capacity == 0 {
            return Err(ConfigError::Invalid("analysis_cache_capacity must be at least 1".into()));
        }
        if self.memory_limit == 0 {
            return Err(ConfigError::Invalid("memory_limit must be non-zero".into()));
        }
        Ok(())
    }
}
