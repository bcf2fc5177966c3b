mod common;

use common::*;
use evm_core::word::{address_to_word, word_to_bytes};
use evm_core::{Access, Address, CallKind, CallResult, Fault, Hardfork, Outcome, Word, B256};
use hex_literal::hex;

/// CALL to 0x01 with no value and zero-sized ranges, 0xffff gas.
const CALL_ONE: [u8; 16] = hex!("6000 6000 6000 6000 6000 6001 61ffff f1");

fn static_input() -> evm_core::FrameInput {
    let mut i = input(GAS);
    i.context.is_static = true;
    i
}

fn with_tail(head: &[u8], tail: &[u8]) -> Vec<u8> {
    [head, tail].concat()
}

// ── Storage ─────────────────────────────────────────────────────

#[test]
fn sstore_clear_earns_refund() {
    let mut host = MockHost::default();
    host.storage.insert((contract(), Word::zero()), Word::one());
    let r = run_on(Hardfork::Cancun, &hex!("6000 6000 55 00"), input(GAS), &mut host);
    assert!(r.is_success());
    // cold slot: 2100 surcharge + 2900 reset
    assert_eq!(r.gas_used, 3 + 3 + 5000);
    assert_eq!(r.refund, 4800);
    assert_eq!(host.storage[&(contract(), Word::zero())], Word::zero());
}

#[test]
fn revert_drops_refund_but_keeps_gas() {
    let mut host = MockHost::default();
    host.storage.insert((contract(), Word::zero()), Word::one());
    let r = run_on(Hardfork::Cancun, &hex!("6000 6000 55 6000 6000 fd"), input(GAS), &mut host);
    assert_eq!(r.outcome, Outcome::Reverted(Vec::new()));
    assert_eq!(r.refund, 0);
    assert_eq!(r.gas_used, 3 + 3 + 5000 + 3 + 3);
}

#[test]
fn fault_drops_refund_and_gas() {
    let mut host = MockHost::default();
    host.storage.insert((contract(), Word::zero()), Word::one());
    let r = run_on(Hardfork::Cancun, &hex!("6000 6000 55 fe"), input(GAS), &mut host);
    assert_eq!(r.fault(), Some(Fault::InvalidOpcode(0xfe)));
    assert_eq!(r.refund, 0);
    assert_eq!(r.gas_remaining, 0);
}

#[test]
fn sstore_sentry() {
    let mut host = MockHost::default();
    // 2306 - 6 for the pushes leaves exactly the stipend
    let r = run_on(Hardfork::Cancun, &hex!("6001 6000 55"), input(2306), &mut host);
    assert_eq!(r.fault(), Some(Fault::OutOfGas));
    assert!(host.storage.is_empty());
}

#[test]
fn sentry_absent_before_istanbul() {
    let mut host = MockHost::default();
    let r = run_on(Hardfork::Petersburg, &hex!("6001 6000 55"), input(20006), &mut host);
    assert!(r.is_success());
    assert_eq!(r.gas_remaining, 0);
}

#[test]
fn sload_cold_then_warm() {
    let mut host = MockHost::default();
    let r = run_on(Hardfork::Cancun, &hex!("6000 54 6000 54 00"), input(GAS), &mut host);
    assert_eq!(r.gas_used, 3 + 2100 + 3 + 100);
    assert!(host.warm.contains(&Access::Slot(contract(), Word::zero())));
}

#[test]
fn transient_storage_roundtrip() {
    // TSTORE(1, 7); TLOAD(1); MSTORE at 0; RETURN 32
    let code = hex!("6007 6001 5d 6001 5c 6000 52 6020 6000 f3");
    let mut host = MockHost::default();
    let r = run_on(Hardfork::Cancun, &code, input(GAS), &mut host);
    assert_eq!(r.output(), word(7));
    assert_eq!(host.transient[&(contract(), Word::one())], Word::from(7));
    assert!(host.storage.is_empty());
}

// ── Account access ──────────────────────────────────────────────

#[test]
fn balance_cold_then_warm() {
    let code = hex!("6001 31 6001 31 00");
    let r = run_on(Hardfork::Cancun, &code, input(GAS), &mut MockHost::default());
    assert_eq!(r.gas_used, 3 + 2600 + 3 + 100);
    let r = run_on(Hardfork::Istanbul, &code, input(GAS), &mut MockHost::default());
    assert_eq!(r.gas_used, 3 + 700 + 3 + 700);
}

#[test]
fn environment_values() {
    let mut host = MockHost::default();
    host.env.chain_id = 5;
    host.env.number = 300;
    let r = run_on(Hardfork::Cancun, &hex!("46 6000 52 6020 6000 f3"), input(GAS), &mut host);
    assert_eq!(r.output(), word(5));

    // BLOCKHASH inside and outside the 256-block window
    let r = run_on(Hardfork::Cancun, &hex!("61012b 40 6000 52 6020 6000 f3"), input(GAS), &mut host);
    assert_eq!(r.output(), word(1299));
    let r = run_on(Hardfork::Cancun, &hex!("602b 40 6000 52 6020 6000 f3"), input(GAS), &mut host);
    assert_eq!(r.output(), word(0));
    let r = run_on(Hardfork::Cancun, &hex!("61012c 40 6000 52 6020 6000 f3"), input(GAS), &mut host);
    assert_eq!(r.output(), word(0));
}

#[test]
fn calldataload_pads_with_zeros() {
    let mut i = input(GAS);
    i.input = vec![1, 2, 3];
    let r = run_on(Hardfork::Cancun, &hex!("6001 35 6000 52 6020 6000 f3"), i, &mut MockHost::default());
    let mut expected = [0u8; 32];
    expected[..2].copy_from_slice(&[2, 3]);
    assert_eq!(r.output(), expected);
}

#[test]
fn gas_opcode_sees_per_instruction_remaining() {
    let r = run(&hex!("5a 6000 52 6020 6000 f3"));
    assert_eq!(r.output(), word(GAS - 2));
}

// ── Logs ────────────────────────────────────────────────────────

#[test]
fn log2_emits_topics_and_data() {
    let code = hex!("61aabb 6000 52 6022 6011 6002 601e a2 00");
    let mut host = MockHost::default();
    let r = run_on(Hardfork::Cancun, &code, input(GAS), &mut host);
    assert!(r.is_success());
    assert_eq!(host.logs.len(), 1);
    let log = &host.logs[0];
    assert_eq!(log.address, contract());
    assert_eq!(log.topics, vec![B256::from_low_u64_be(0x11), B256::from_low_u64_be(0x22)]);
    assert_eq!(log.data, vec![0xaa, 0xbb]);
    assert_eq!(r.gas_used, 3 + 3 + 3 + 3 + 4 * 3 + 375 + 2 * 375 + 2 * 8);
}

// ── Static context ──────────────────────────────────────────────

#[test]
fn static_frame_rejects_writes() {
    let writes: [&[u8]; 5] = [
        &hex!("6001 6000 55"),
        &hex!("6001 6000 5d"),
        &hex!("6000 6000 a0"),
        &hex!("60ee ff"),
        &hex!("6000 6000 6000 f0"),
    ];
    for code in writes {
        let r = run_on(Hardfork::Cancun, code, static_input(), &mut MockHost::default());
        assert_eq!(r.fault(), Some(Fault::StaticCallViolation), "code {code:02x?}");
        assert_eq!(r.gas_remaining, 0);
    }
}

#[test]
fn static_frame_allows_reads_and_plain_calls() {
    let mut host = MockHost::default();
    let code = with_tail(&CALL_ONE, &hex!("6000 54 00"));
    let r = run_on(Hardfork::Cancun, &code, static_input(), &mut host);
    assert!(r.is_success());
    assert!(host.calls[0].is_static);
}

#[test]
fn static_frame_rejects_value_call() {
    let code = hex!("6000 6000 6000 6000 6001 6001 61ffff f1 00");
    let mut host = MockHost::default();
    let r = run_on(Hardfork::Cancun, &code, static_input(), &mut host);
    assert_eq!(r.fault(), Some(Fault::StaticCallViolation));
    assert!(host.calls.is_empty());
}

#[test]
fn host_static_flag_applies_to_any_frame() {
    let mut host = MockHost {
        static_violation: true,
        ..MockHost::default()
    };
    let r = run_on(Hardfork::Cancun, &hex!("6001 6000 55"), input(GAS), &mut host);
    assert_eq!(r.fault(), Some(Fault::StaticCallViolation));
}

// ── Nested calls ────────────────────────────────────────────────

/// Stores 42 at [32, 64), runs CALL_ONE, stores its status at [0, 32)
/// and returns both words.
fn call_and_report() -> Vec<u8> {
    let mut code = hex!("602a 6020 52").to_vec();
    code.extend_from_slice(&CALL_ONE);
    code.extend_from_slice(&hex!("6000 52 6040 6000 f3"));
    code
}

#[test]
fn call_forwards_request_and_keeps_parent_memory() {
    let mut host = MockHost::default();
    let r = run_on(Hardfork::Cancun, &call_and_report(), input(GAS), &mut host);
    assert_eq!(r.output(), [word(1), word(42)].concat());

    assert_eq!(host.calls.len(), 1);
    let req = &host.calls[0];
    assert_eq!(req.kind, CallKind::Call);
    assert_eq!(req.caller, contract());
    assert_eq!(req.recipient, Address::from_low_u64_be(1));
    assert_eq!(req.code_address, Address::from_low_u64_be(1));
    assert_eq!(req.gas, 0xffff);
    assert_eq!(req.depth, 1);
    assert!(!req.transfers_value);
}

#[test]
fn call_at_max_depth_fails_without_host() {
    let mut host = MockHost::default();
    let mut i = input(GAS);
    i.context.depth = 1024;
    let r = run_on(Hardfork::Cancun, &call_and_report(), i, &mut host);
    assert!(r.is_success());
    assert_eq!(r.output(), [word(0), word(42)].concat());
    assert!(host.calls.is_empty());
}

#[test]
fn value_call_at_max_depth_returns_stipend() {
    let code = hex!("6000 6000 6000 6000 6005 6001 61ffff f1 00");
    let mut host = MockHost::default();
    let mut i = input(GAS);
    i.context.depth = 1024;
    let r = run_on(Hardfork::Cancun, &code, i, &mut host);
    assert!(r.is_success());
    assert!(host.calls.is_empty());
    // cold call, value transfer and new account, less the stipend handed back
    assert_eq!(r.gas_used, 7 * 3 + 2600 + 9000 + 25000 - 2300);
}

#[test]
fn call_charges_only_consumed_child_gas() {
    let code = with_tail(&CALL_ONE, &[0x00]);
    let mut host = MockHost::default();
    let r = run_on(Hardfork::Cancun, &code, input(GAS), &mut host);
    // seven pushes, warm CALL 100, cold surcharge 2500, child gas returned
    assert_eq!(r.gas_used, 7 * 3 + 2600);

    host.call_result = Some(CallResult {
        success: true,
        gas_left: 0xffff - 1000,
        ..CallResult::default()
    });
    host.warm.clear();
    let r = run_on(Hardfork::Cancun, &code, input(GAS), &mut host);
    assert_eq!(r.gas_used, 7 * 3 + 2600 + 1000);
}

#[test]
fn value_call_adds_stipend_and_charges() {
    let code = hex!("6000 6000 6000 6000 6005 6001 61ffff f1 00");
    let mut host = MockHost::default();
    host.call_result = Some(CallResult {
        success: true,
        gas_left: 0,
        ..CallResult::default()
    });
    let r = run_on(Hardfork::Cancun, &code, input(2 * GAS), &mut host);
    assert!(r.is_success());
    let req = &host.calls[0];
    assert_eq!(req.value, Word::from(5));
    assert!(req.transfers_value);
    assert_eq!(req.gas, 0xffff + 2300);
    // value transfer 9000 and a new account 25000 on top of the cold call
    assert_eq!(r.gas_used, 7 * 3 + 2600 + 9000 + 25000 + 0xffff);
}

#[test]
fn delegatecall_keeps_caller_and_value() {
    let code = hex!("6000 6000 6000 6000 6001 61ffff f4 00");
    let mut i = input(GAS);
    i.context.value = Word::from(7);
    let mut host = MockHost::default();
    let r = run_on(Hardfork::Cancun, &code, i, &mut host);
    assert!(r.is_success());
    let req = &host.calls[0];
    assert_eq!(req.kind, CallKind::DelegateCall);
    assert_eq!(req.caller, Address::repeat_byte(0xca));
    assert_eq!(req.recipient, contract());
    assert_eq!(req.code_address, Address::from_low_u64_be(1));
    assert_eq!(req.value, Word::from(7));
    assert!(!req.transfers_value);
}

#[test]
fn staticcall_marks_child_static() {
    let code = hex!("6000 6000 6000 6000 6001 61ffff fa 00");
    let mut host = MockHost::default();
    run_on(Hardfork::Cancun, &code, input(GAS), &mut host);
    assert_eq!(host.calls[0].kind, CallKind::StaticCall);
    assert!(host.calls[0].is_static);
}

#[test]
fn failed_child_is_not_a_fault() {
    let mut host = MockHost::default();
    host.call_result = Some(CallResult::failure(0));
    let r = run_on(Hardfork::Cancun, &call_and_report(), input(GAS), &mut host);
    assert!(r.is_success());
    assert_eq!(r.output(), [word(0), word(42)].concat());
}

// ── Return data ─────────────────────────────────────────────────

fn call_returning(output: Vec<u8>) -> MockHost {
    MockHost {
        call_result: Some(CallResult {
            success: true,
            gas_left: 0,
            output,
            created: None,
        }),
        ..MockHost::default()
    }
}

#[test]
fn returndatasize_after_call() {
    let code = with_tail(&CALL_ONE, &hex!("50 3d 6000 52 6020 6000 f3"));
    let mut host = call_returning(vec![1, 2, 3]);
    let r = run_on(Hardfork::Cancun, &code, input(GAS), &mut host);
    assert_eq!(r.output(), word(3));
}

#[test]
fn returndatacopy_past_end_faults() {
    let code = with_tail(&CALL_ONE, &hex!("50 6002 6002 6000 3e 00"));
    let mut host = call_returning(vec![1, 2, 3]);
    let r = run_on(Hardfork::Cancun, &code, input(GAS), &mut host);
    assert_eq!(r.fault(), Some(Fault::ReturnDataOutOfBounds));
}

#[test]
fn call_output_lands_in_parent_memory() {
    // CALL with retOff 0, retLen 2 then RETURN 32 bytes
    let code = hex!("6002 6000 6000 6000 6000 6001 61ffff f1 50 6020 6000 f3");
    let mut host = call_returning(vec![0xde, 0xad, 0xbe]);
    let r = run_on(Hardfork::Cancun, &code, input(GAS), &mut host);
    let mut expected = [0u8; 32];
    expected[..2].copy_from_slice(&[0xde, 0xad]);
    assert_eq!(r.output(), expected);
}

// ── Creation ────────────────────────────────────────────────────

fn creating(address: Address) -> MockHost {
    MockHost {
        call_result: Some(CallResult {
            success: true,
            gas_left: 0,
            output: Vec::new(),
            created: Some(address),
        }),
        ..MockHost::default()
    }
}

#[test]
fn create_pushes_new_address() {
    let fresh = Address::repeat_byte(0xee);
    let mut host = creating(fresh);
    let r = run_on(Hardfork::Cancun, &hex!("6000 6000 6000 f0 6000 52 6020 6000 f3"), input(GAS), &mut host);
    assert_eq!(r.output(), word_to_bytes(address_to_word(fresh)));
    let req = &host.calls[0];
    assert_eq!(req.kind, CallKind::Create);
    assert_eq!(req.caller, contract());
    assert_eq!(req.depth, 1);
    assert!(req.gas > 0);
}

#[test]
fn create2_passes_salt() {
    let mut host = creating(Address::repeat_byte(0xee));
    run_on(Hardfork::Cancun, &hex!("6042 6000 6000 6000 f5 00"), input(GAS), &mut host);
    assert_eq!(host.calls[0].kind, CallKind::Create2 { salt: Word::from(0x42) });
}

#[test]
fn create_gets_all_but_one_64th() {
    let mut host = creating(Address::repeat_byte(0xee));
    run_on(Hardfork::Cancun, &hex!("6000 6000 6000 f0 00"), input(GAS), &mut host);
    let remaining = GAS - 9 - 32000;
    assert_eq!(host.calls[0].gas, remaining - remaining / 64);
}

#[test]
fn initcode_limit_from_shanghai() {
    let code = hex!("61c001 6000 6000 f0 00");
    let r = run_on(Hardfork::Shanghai, &code, input(GAS), &mut creating(Address::repeat_byte(1)));
    assert_eq!(r.fault(), Some(Fault::InitCodeTooLarge));
    let r = run_on(Hardfork::Merge, &code, input(GAS), &mut creating(Address::repeat_byte(1)));
    assert!(r.is_success());
}

#[test]
fn oversized_deploy_output_faults() {
    let mut i = input(GAS);
    i.context.is_create = true;
    let code = hex!("616001 6000 f3");
    let r = run_on(Hardfork::Cancun, &code, i.clone(), &mut MockHost::default());
    assert_eq!(r.fault(), Some(Fault::OutputTooLarge));
    let r = run_on(Hardfork::Homestead, &code, i, &mut MockHost::default());
    assert_eq!(r.output().len(), 0x6001);
}

#[test]
fn failed_create_sets_return_data() {
    let mut host = MockHost {
        call_result: Some(CallResult {
            success: false,
            gas_left: 0,
            output: vec![9, 9],
            created: None,
        }),
        ..MockHost::default()
    };
    let r = run_on(Hardfork::Cancun, &hex!("6000 6000 6000 f0 3d 6000 52 6020 6000 f3"), input(GAS), &mut host);
    assert_eq!(r.output(), word(2));
}

// ── Self-destruct ───────────────────────────────────────────────

#[test]
fn selfdestruct_cold_beneficiary() {
    let mut host = MockHost::default();
    let r = run_on(Hardfork::Cancun, &hex!("60ee ff"), input(GAS), &mut host);
    assert_eq!(r.outcome, Outcome::Stopped(Vec::new()));
    assert_eq!(r.gas_used, 3 + 5000 + 2600);
    assert_eq!(r.refund, 0);
    assert_eq!(host.destructed, vec![(contract(), Address::from_low_u64_be(0xee))]);
}

#[test]
fn selfdestruct_refund_before_london() {
    let mut host = MockHost::default();
    let r = run_on(Hardfork::Istanbul, &hex!("60ee ff"), input(GAS), &mut host);
    assert_eq!(r.gas_used, 3 + 5000);
    assert_eq!(r.refund, 24000);
}
