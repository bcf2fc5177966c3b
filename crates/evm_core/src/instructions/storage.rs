use super::{gas_correction, Instruction};
use crate::error::Fault;
use crate::gas::{self, SSTORE_SENTRY};
use crate::host::{Access, Log};
use crate::interpreter::{Flow, Machine};
use crate::opcode::LOG0;
use crate::word;

pub fn sload(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let key = m.frame.stack.peek_unchecked(0);
    let address = m.frame.context.address;
    let surcharge = m.table.schedule().cold_sload_surcharge;
    if surcharge > 0 && m.host.mark_warm(Access::Slot(address, key)) {
        m.frame.gas.charge(surcharge)?;
    }
    *m.frame.stack.top_mut_unchecked() = m.host.get_storage(address, key);
    Ok(Flow::Continue)
}

pub fn sstore(m: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    let correction = gas_correction(ins);
    m.frame.gas.erase_cost(correction);

    let key = m.frame.stack.pop_unchecked();
    let value = m.frame.stack.pop_unchecked();
    let flags = *m.table.flags();
    if flags.net_sstore && m.frame.gas.remaining() <= SSTORE_SENTRY {
        return Err(Fault::OutOfGas);
    }

    let address = m.frame.context.address;
    let was_cold = flags.access_lists && m.host.mark_warm(Access::Slot(address, key));
    let current = m.host.get_storage(address, key);
    let original = if flags.net_sstore {
        m.host.original_storage(address, key)
    } else {
        current
    };
    let cost = m.table.schedule().sstore_cost(original, current, value, was_cold);
    m.frame.gas.charge(cost.gas)?;
    m.frame.gas.record_refund(cost.refund);
    m.host.set_storage(address, key, value);

    m.frame.gas.charge(correction)?;
    Ok(Flow::Continue)
}

pub fn tload(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let key = m.frame.stack.peek_unchecked(0);
    *m.frame.stack.top_mut_unchecked() = m.host.get_transient(m.frame.context.address, key);
    Ok(Flow::Continue)
}

pub fn tstore(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let key = m.frame.stack.pop_unchecked();
    let value = m.frame.stack.pop_unchecked();
    m.host.set_transient(m.frame.context.address, key, value);
    Ok(Flow::Continue)
}

/// LOG0..LOG4
pub fn log(m: &mut Machine<'_>, ins: &Instruction) -> Result<Flow, Fault> {
    let offset = m.frame.stack.pop_unchecked();
    let len = m.frame.stack.pop_unchecked();
    let count = (ins.opcode - LOG0) as usize;
    let topics = (0..count)
        .map(|_| word::word_to_b256(m.frame.stack.pop_unchecked()))
        .collect();

    let data = match m.memory.resize_for(offset, len, &mut m.frame.gas)? {
        Some((at, n)) => {
            m.frame.gas.charge(gas::log_cost(count as u64, n as u64))?;
            m.memory.slice(at, n).to_vec()
        }
        None => {
            m.frame.gas.charge(gas::log_cost(count as u64, 0))?;
            Vec::new()
        }
    };
    m.host.emit_log(Log {
        address: m.frame.context.address,
        topics,
        data,
    });
    Ok(Flow::Continue)
}
