mod common;

use common::*;
use evm_core::{Fault, Hardfork};
use hex_literal::hex;

fn run_at(fork: Hardfork, code: &[u8]) -> evm_core::ExecutionResult {
    run_on(fork, code, input(GAS), &mut MockHost::default())
}

// ── Opcode availability ─────────────────────────────────────────

#[test]
fn opcodes_appear_with_their_fork() {
    // (program, last fork without it, first fork with it)
    let cases: [(&[u8], Hardfork, Hardfork); 8] = [
        (&hex!("6000 6000 fd"), Hardfork::Homestead, Hardfork::Byzantium),
        (&hex!("6001 6001 1b 00"), Hardfork::Byzantium, Hardfork::Constantinople),
        (&hex!("46 00"), Hardfork::Petersburg, Hardfork::Istanbul),
        (&hex!("48 00"), Hardfork::Berlin, Hardfork::London),
        (&hex!("5f 00"), Hardfork::Merge, Hardfork::Shanghai),
        (&hex!("6000 5c 00"), Hardfork::Shanghai, Hardfork::Cancun),
        (&hex!("6000 6000 6000 5e 00"), Hardfork::Shanghai, Hardfork::Cancun),
        (&hex!("4a 00"), Hardfork::Shanghai, Hardfork::Cancun),
    ];
    for (code, before, after) in cases {
        let r = run_at(before, code);
        assert!(
            matches!(r.fault(), Some(Fault::InvalidOpcode(_))),
            "{code:02x?} should be undefined at {before:?}"
        );
        assert_eq!(r.gas_remaining, 0);
        let r = run_at(after, code);
        assert!(r.fault().is_none(), "{code:02x?} should run at {after:?}: {:?}", r.outcome);
    }
}

#[test]
fn push0_shadowed_by_push_data() {
    // PUSH1 0x5f is a plain push under every fork
    let r = run_at(Hardfork::Frontier, &hex!("605f 00"));
    assert!(r.is_success());
}

#[test]
fn delegatecall_needs_homestead() {
    let code = hex!("6000 6000 6000 6000 6001 61ffff f4 00");
    let r = run_at(Hardfork::Frontier, &code);
    assert_eq!(r.fault(), Some(Fault::InvalidOpcode(0xf4)));
    let r = run_at(Hardfork::Homestead, &code);
    assert!(r.is_success());
}

// ── Gas schedule ────────────────────────────────────────────────

#[test]
fn sload_price_history() {
    let code = hex!("6000 54 00");
    let cost = |fork| run_at(fork, &code).gas_used - 3;
    assert_eq!(cost(Hardfork::Frontier), 50);
    assert_eq!(cost(Hardfork::TangerineWhistle), 200);
    assert_eq!(cost(Hardfork::Istanbul), 800);
    assert_eq!(cost(Hardfork::Berlin), 2100);
}

#[test]
fn exp_byte_price() {
    // PUSH2 256, PUSH1 2, EXP: two exponent bytes
    let code = hex!("610100 6002 0a 00");
    assert_eq!(run_at(Hardfork::Frontier, &code).gas_used, 3 + 3 + 10 + 2 * 10);
    assert_eq!(run_at(Hardfork::SpuriousDragon, &code).gas_used, 3 + 3 + 10 + 2 * 50);
}

#[test]
fn frontier_sstore_fresh_slot() {
    let r = run_at(Hardfork::Frontier, &hex!("6001 6000 55 00"));
    assert_eq!(r.gas_used, 3 + 3 + 20000);
}

#[test]
fn constantinople_meters_sstore_like_petersburg() {
    // set, reset to zero, set again: net metering would price these differently
    let code = hex!("6001 6000 55 6000 6000 55 6002 6000 55 00");
    let constantinople = run_at(Hardfork::Constantinople, &code);
    let petersburg = run_at(Hardfork::Petersburg, &code);
    assert_eq!(constantinople.gas_used, petersburg.gas_used);
    assert_eq!(constantinople.refund, petersburg.refund);
    assert_ne!(run_at(Hardfork::Istanbul, &code).gas_used, petersburg.gas_used);
}

#[test]
fn frontier_call_requires_full_gas() {
    // requests 0xffffff with only GAS available: no 63/64 capping before EIP-150
    let code = hex!("6000 6000 6000 6000 6000 6001 62ffffff f1 00");
    let r = run_at(Hardfork::Frontier, &code);
    assert_eq!(r.fault(), Some(Fault::OutOfGas));
    let r = run_at(Hardfork::TangerineWhistle, &code);
    assert!(r.is_success());
}

#[test]
fn keccak_of_empty_input() {
    let r = run(&hex!("6000 6000 20 6000 52 6020 6000 f3"));
    assert_eq!(
        r.output(),
        hex!("c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470")
    );
    assert_eq!(r.gas_used, 3 + 3 + 30 + 3 + 3 + 3 + 3 + 3);
}
