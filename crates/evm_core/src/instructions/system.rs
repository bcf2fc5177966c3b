//! Nested calls, contract creation and self-destruction.

use super::{charge_account_access, gas_correction, pop_address, Instruction};
use crate::error::Fault;
use crate::gas::{self, CALL_STIPEND, CALL_VALUE, COLD_ACCOUNT_ACCESS, MAX_INITCODE_SIZE, NEW_ACCOUNT};
use crate::host::{Access, CallKind, CallRequest};
use crate::interpreter::{Flow, Halt, Machine};
use crate::opcode::{CALL, CALLCODE, CREATE2, DELEGATECALL};
use crate::word::{self, address_to_word, bool_word, Address, Word};

/// CALL, CALLCODE, DELEGATECALL and STATICCALL.
pub fn call(m: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    let correction = gas_correction(ins);
    m.frame.gas.erase_cost(correction);

    let kind = match ins.opcode {
        CALL => CallKind::Call,
        CALLCODE => CallKind::CallCode,
        DELEGATECALL => CallKind::DelegateCall,
        _ => CallKind::StaticCall,
    };
    let requested = m.frame.stack.pop_unchecked();
    let target = pop_address(m);
    let value = match kind {
        CallKind::Call | CallKind::CallCode => m.frame.stack.pop_unchecked(),
        _ => Word::zero(),
    };
    let in_offset = m.frame.stack.pop_unchecked();
    let in_len = m.frame.stack.pop_unchecked();
    let out_offset = m.frame.stack.pop_unchecked();
    let out_len = m.frame.stack.pop_unchecked();

    let input = m.memory.resize_for(in_offset, in_len, &mut m.frame.gas)?;
    let output = m.memory.resize_for(out_offset, out_len, &mut m.frame.gas)?;

    charge_account_access(m, target)?;
    let transfers_value = !value.is_zero();
    if transfers_value {
        m.frame.gas.charge(CALL_VALUE)?;
    }
    if kind == CallKind::Call
        && (transfers_value || !m.table.flags().empty_account_rule)
        && m.host.is_empty_account(target)
    {
        m.frame.gas.charge(NEW_ACCOUNT)?;
    }

    let child_gas = m.table.schedule().call_gas(m.frame.gas.remaining(), requested)?;
    m.frame.return_data.clear();

    if m.frame.context.depth >= m.max_call_depth {
        // The failed child hands back everything it was given, stipend included.
        if transfers_value {
            m.frame.gas.erase_cost(CALL_STIPEND);
        }
        m.frame.stack.push_unchecked(Word::zero());
        m.frame.gas.charge(correction)?;
        return Ok(Flow::Continue);
    }
    m.frame.gas.charge(child_gas)?;

    let ctx = &m.frame.context;
    let (caller, recipient, call_value) = match kind {
        CallKind::DelegateCall => (ctx.caller, ctx.address, ctx.value),
        CallKind::CallCode => (ctx.address, ctx.address, value),
        _ => (ctx.address, target, value),
    };
    let request = CallRequest {
        kind,
        caller,
        code_address: target,
        recipient,
        value: call_value,
        transfers_value,
        input: input.map_or_else(Vec::new, |(at, n)| m.memory.slice(at, n).to_vec()),
        gas: child_gas + if transfers_value { CALL_STIPEND } else { 0 },
        is_static: ctx.is_static || kind == CallKind::StaticCall,
        depth: ctx.depth + 1,
    };

    let result = m.host.perform_call(request, &mut *m.memory);
    m.frame.gas.erase_cost(result.gas_left);
    if let Some((at, n)) = output {
        let n = n.min(result.output.len());
        m.memory.set(at, &result.output[..n]);
    }
    m.frame.return_data = result.output;
    m.frame.stack.push_unchecked(bool_word(result.success));

    m.frame.gas.charge(correction)?;
    Ok(Flow::Continue)
}

/// CREATE and CREATE2.
pub fn create(m: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    let correction = gas_correction(ins);
    m.frame.gas.erase_cost(correction);

    let value = m.frame.stack.pop_unchecked();
    let offset = m.frame.stack.pop_unchecked();
    let len = m.frame.stack.pop_unchecked();
    let kind = if ins.opcode == CREATE2 {
        CallKind::Create2 {
            salt: m.frame.stack.pop_unchecked(),
        }
    } else {
        CallKind::Create
    };

    let flags = *m.table.flags();
    if flags.initcode_limit && word::saturating_u64(len) > MAX_INITCODE_SIZE as u64 {
        return Err(Fault::InitCodeTooLarge);
    }
    let range = m.memory.resize_for(offset, len, &mut m.frame.gas)?;
    let size = range.map_or(0, |(_, n)| n as u64);
    if flags.initcode_limit {
        m.frame.gas.charge(gas::INITCODE_WORD * word::words_for(size))?;
    }
    if ins.opcode == CREATE2 {
        m.frame.gas.charge(gas::keccak_cost(size))?;
    }

    m.frame.return_data.clear();
    if m.frame.context.depth >= m.max_call_depth {
        m.frame.stack.push_unchecked(Word::zero());
        m.frame.gas.charge(correction)?;
        return Ok(Flow::Continue);
    }

    let remaining = m.frame.gas.remaining();
    let child_gas = if flags.all_but_one_64th {
        remaining - remaining / 64
    } else {
        remaining
    };
    m.frame.gas.charge(child_gas)?;

    let request = CallRequest {
        kind,
        caller: m.frame.context.address,
        code_address: Address::zero(),
        recipient: Address::zero(),
        value,
        transfers_value: !value.is_zero(),
        input: range.map_or_else(Vec::new, |(at, n)| m.memory.slice(at, n).to_vec()),
        gas: child_gas,
        is_static: false,
        depth: m.frame.context.depth + 1,
    };

    let result = m.host.perform_call(request, &mut *m.memory);
    m.frame.gas.erase_cost(result.gas_left);
    let created = match (result.success, result.created) {
        (true, Some(address)) => address_to_word(address),
        _ => Word::zero(),
    };
    if !result.success {
        m.frame.return_data = result.output;
    }
    m.frame.stack.push_unchecked(created);

    m.frame.gas.charge(correction)?;
    Ok(Flow::Continue)
}

pub fn selfdestruct(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let beneficiary = pop_address(m);
    let flags = *m.table.flags();
    let address = m.frame.context.address;

    if flags.access_lists && m.host.mark_warm(Access::Account(beneficiary)) {
        m.frame.gas.charge(COLD_ACCOUNT_ACCESS)?;
    }
    if flags.all_but_one_64th {
        let pays_new_account = !flags.empty_account_rule || !m.host.get_balance(address).is_zero();
        if pays_new_account && m.host.is_empty_account(beneficiary) {
            m.frame.gas.charge(NEW_ACCOUNT)?;
        }
    }

    let refund = m.table.schedule().selfdestruct_refund;
    if m.host.mark_for_destruction(address, beneficiary) && refund > 0 {
        m.frame.gas.record_refund(refund);
    }
    Ok(Flow::Halt(Halt::SelfDestruct))
}
