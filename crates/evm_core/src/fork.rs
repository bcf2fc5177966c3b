//! Protocol versions and the feature flags derived from them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hardfork {
    Frontier,
    Homestead,
    TangerineWhistle,
    SpuriousDragon,
    Byzantium,
    /// Alias of Petersburg: EIP-1283 net SSTORE metering is not applied,
    /// net metering starts with EIP-2200 at Istanbul.
    Constantinople,
    Petersburg,
    Istanbul,
    Berlin,
    London,
    Merge,
    Shanghai,
    #[default]
    Cancun,
}

impl Hardfork {
    pub const ALL: [Hardfork; 13] = [
        Hardfork::Frontier,
        Hardfork::Homestead,
        Hardfork::TangerineWhistle,
        Hardfork::SpuriousDragon,
        Hardfork::Byzantium,
        Hardfork::Constantinople,
        Hardfork::Petersburg,
        Hardfork::Istanbul,
        Hardfork::Berlin,
        Hardfork::London,
        Hardfork::Merge,
        Hardfork::Shanghai,
        Hardfork::Cancun,
    ];

    pub fn flags(self) -> ForkFlags {
        ForkFlags::for_fork(self)
    }
}

/// Immutable set of switches consulted by the dispatch table and the gas
/// formulas. Built once per call tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForkFlags {
    /// DELEGATECALL (EIP-7)
    pub delegatecall: bool,
    /// EIP-150 gas repricing and the 63/64 call gas rule
    pub all_but_one_64th: bool,
    /// EIP-161 empty-account semantics for new-account charges
    pub empty_account_rule: bool,
    /// EIP-160 EXP byte cost 50
    pub expensive_exp: bool,
    /// EIP-170 deployed code size limit
    pub code_size_limit: bool,
    /// REVERT, RETURNDATASIZE, RETURNDATACOPY, STATICCALL
    pub byzantium_opcodes: bool,
    /// SHL, SHR, SAR
    pub bitwise_shifts: bool,
    pub create2: bool,
    pub extcodehash: bool,
    /// CHAINID, SELFBALANCE
    pub istanbul_opcodes: bool,
    /// EIP-1884 / EIP-2200 repricing and net-metered SSTORE
    pub net_sstore: bool,
    /// EIP-2929 cold/warm access costs
    pub access_lists: bool,
    pub basefee: bool,
    /// EIP-3529 reduced refunds, no SELFDESTRUCT refund
    pub reduced_refunds: bool,
    pub push0: bool,
    /// EIP-3860 initcode size limit and per-word charge
    pub initcode_limit: bool,
    pub transient_storage: bool,
    pub mcopy: bool,
    /// BLOBHASH, BLOBBASEFEE
    pub blob_opcodes: bool,
}

impl ForkFlags {
    pub fn for_fork(fork: Hardfork) -> Self {
        use Hardfork::*;
        let at = |f: Hardfork| fork >= f;
        Self {
            delegatecall: at(Homestead),
            all_but_one_64th: at(TangerineWhistle),
            empty_account_rule: at(SpuriousDragon),
            expensive_exp: at(SpuriousDragon),
            code_size_limit: at(SpuriousDragon),
            byzantium_opcodes: at(Byzantium),
            bitwise_shifts: at(Constantinople),
            create2: at(Constantinople),
            extcodehash: at(Constantinople),
            istanbul_opcodes: at(Istanbul),
            net_sstore: at(Istanbul),
            access_lists: at(Berlin),
            basefee: at(London),
            reduced_refunds: at(London),
            push0: at(Shanghai),
            initcode_limit: at(Shanghai),
            transient_storage: at(Cancun),
            mcopy: at(Cancun),
            blob_opcodes: at(Cancun),
        }
    }
}
