use sha3::{Digest, Keccak256};

use super::{charge_account_access, copy_range, pop_address, push_op, Instruction};
use crate::error::Fault;
use crate::gas;
use crate::interpreter::{Flow, Machine};
use crate::word::{self, address_to_word, b256_to_word, Word};

pub fn keccak256(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let offset = m.frame.stack.pop_unchecked();
    let len = m.frame.stack.peek_unchecked(0);
    let digest = match m.memory.resize_for(offset, len, &mut m.frame.gas)? {
        Some((at, n)) => {
            m.frame.gas.charge(gas::keccak_cost(n as u64))?;
            Keccak256::digest(m.memory.slice(at, n))
        }
        None => Keccak256::digest(b""),
    };
    *m.frame.stack.top_mut_unchecked() = Word::from_big_endian(&digest);
    Ok(Flow::Continue)
}

// ── Call context ────────────────────────────────────────────────

push_op!(address, |m| address_to_word(m.frame.context.address));
push_op!(caller, |m| address_to_word(m.frame.context.caller));
push_op!(callvalue, |m| m.frame.context.value);
push_op!(calldatasize, |m| Word::from(m.frame.input.len()));
push_op!(codesize, |m| Word::from(m.code.code().len()));
push_op!(returndatasize, |m| Word::from(m.frame.return_data.len()));

pub fn calldataload(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let top = m.frame.stack.top_mut_unchecked();
    let mut buf = [0u8; 32];
    if let Some(start) = word::to_u64(*top).and_then(|o| usize::try_from(o).ok()) {
        let input = &m.frame.input;
        if start < input.len() {
            let n = (input.len() - start).min(32);
            buf[..n].copy_from_slice(&input[start..start + n]);
        }
    }
    *top = Word::from_big_endian(&buf);
    Ok(Flow::Continue)
}

pub fn calldatacopy(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let dst = m.frame.stack.pop_unchecked();
    let src = m.frame.stack.pop_unchecked();
    let len = m.frame.stack.pop_unchecked();
    if let Some((at, n)) = copy_range(m, dst, len)? {
        m.memory.set_padded(at, word::saturating_u64(src), n, &m.frame.input);
    }
    Ok(Flow::Continue)
}

pub fn codecopy(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let dst = m.frame.stack.pop_unchecked();
    let src = m.frame.stack.pop_unchecked();
    let len = m.frame.stack.pop_unchecked();
    if let Some((at, n)) = copy_range(m, dst, len)? {
        m.memory.set_padded(at, word::saturating_u64(src), n, m.code.code());
    }
    Ok(Flow::Continue)
}

pub fn returndatacopy(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let dst = m.frame.stack.pop_unchecked();
    let src = m.frame.stack.pop_unchecked();
    let len = m.frame.stack.pop_unchecked();
    let end = src.checked_add(len).ok_or(Fault::ReturnDataOutOfBounds)?;
    if end > Word::from(m.frame.return_data.len()) {
        return Err(Fault::ReturnDataOutOfBounds);
    }
    if let Some((at, n)) = copy_range(m, dst, len)? {
        let from = src.low_u64() as usize;
        m.memory.set(at, &m.frame.return_data[from..from + n]);
    }
    Ok(Flow::Continue)
}

// ── Other accounts ──────────────────────────────────────────────

pub fn balance(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let address = pop_address(m);
    charge_account_access(m, address)?;
    let value = m.host.get_balance(address);
    m.frame.stack.push_unchecked(value);
    Ok(Flow::Continue)
}

push_op!(selfbalance, |m| m.host.get_balance(m.frame.context.address));

pub fn extcodesize(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let address = pop_address(m);
    charge_account_access(m, address)?;
    let size = m.host.get_code(address).len();
    m.frame.stack.push_unchecked(Word::from(size));
    Ok(Flow::Continue)
}

pub fn extcodehash(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let address = pop_address(m);
    charge_account_access(m, address)?;
    let hash = m.host.get_code_hash(address);
    m.frame.stack.push_unchecked(b256_to_word(hash));
    Ok(Flow::Continue)
}

pub fn extcodecopy(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let address = pop_address(m);
    let dst = m.frame.stack.pop_unchecked();
    let src = m.frame.stack.pop_unchecked();
    let len = m.frame.stack.pop_unchecked();
    charge_account_access(m, address)?;
    if let Some((at, n)) = copy_range(m, dst, len)? {
        let code = m.host.get_code(address);
        m.memory.set_padded(at, word::saturating_u64(src), n, &code);
    }
    Ok(Flow::Continue)
}

// ── Block and transaction ───────────────────────────────────────

push_op!(origin, |m| address_to_word(m.host.env().origin));
push_op!(gasprice, |m| m.host.env().gas_price);
push_op!(coinbase, |m| address_to_word(m.host.env().coinbase));
push_op!(timestamp, |m| Word::from(m.host.env().timestamp));
push_op!(number, |m| Word::from(m.host.env().number));
push_op!(prevrandao, |m| m.host.env().prevrandao);
push_op!(gaslimit, |m| Word::from(m.host.env().gas_limit));
push_op!(chainid, |m| Word::from(m.host.env().chain_id));
push_op!(basefee, |m| m.host.env().base_fee);
push_op!(blobbasefee, |m| m.host.env().blob_base_fee);

/// Hash of one of the 256 most recent complete blocks, zero otherwise.
pub fn blockhash(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let requested = m.frame.stack.peek_unchecked(0);
    let current = m.host.env().number;
    let hash = match word::to_u64(requested) {
        Some(n) if n < current && current - n <= 256 => b256_to_word(m.host.block_hash(n)),
        _ => Word::zero(),
    };
    *m.frame.stack.top_mut_unchecked() = hash;
    Ok(Flow::Continue)
}

pub fn blobhash(m: &mut Machine<'_>, _: &Instruction) -> Result<Flow, Fault> {
    let index = m.frame.stack.peek_unchecked(0);
    let hash = word::to_u64(index)
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| m.host.env().blob_hashes.get(i).copied())
        .map_or(Word::zero(), b256_to_word);
    *m.frame.stack.top_mut_unchecked() = hash;
    Ok(Flow::Continue)
}
