//! Script opcodes: constants, the stack-number codec, handlers and the
//! static dispatch table consulted by the evaluator.
//! Reference: https://en.bitcoin.it/wiki/Script

use std::collections::{HashMap, VecDeque};
use std::sync::LazyLock;

use num_bigint::BigInt;

use crate::ecdsa::Signature;
use crate::error::{BitcoinError, Result};
use crate::hash::{hash160, hash256, ripemd160, sha1, sha256};
use crate::script::Command;
use crate::secp256k1::S256Point;

/// The main (and alt) stack of the script machine
pub type Stack = Vec<Vec<u8>>;

// Constants
pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1NEGATE: u8 = 0x4f;
pub const OP_1: u8 = 0x51;
pub const OP_2: u8 = 0x52;
pub const OP_3: u8 = 0x53;
pub const OP_4: u8 = 0x54;
pub const OP_5: u8 = 0x55;
pub const OP_6: u8 = 0x56;
pub const OP_7: u8 = 0x57;
pub const OP_8: u8 = 0x58;
pub const OP_9: u8 = 0x59;
pub const OP_10: u8 = 0x5a;
pub const OP_11: u8 = 0x5b;
pub const OP_12: u8 = 0x5c;
pub const OP_13: u8 = 0x5d;
pub const OP_14: u8 = 0x5e;
pub const OP_15: u8 = 0x5f;
pub const OP_16: u8 = 0x60;
pub const OP_NOP: u8 = 0x61;
pub const OP_IF: u8 = 0x63;
pub const OP_NOTIF: u8 = 0x64;
pub const OP_ELSE: u8 = 0x67;
pub const OP_ENDIF: u8 = 0x68;
pub const OP_VERIFY: u8 = 0x69;
pub const OP_RETURN: u8 = 0x6a;
pub const OP_TOALTSTACK: u8 = 0x6b;
pub const OP_FROMALTSTACK: u8 = 0x6c;
pub const OP_2DROP: u8 = 0x6d;
pub const OP_2DUP: u8 = 0x6e;
pub const OP_3DUP: u8 = 0x6f;
pub const OP_2OVER: u8 = 0x70;
pub const OP_2ROT: u8 = 0x71;
pub const OP_2SWAP: u8 = 0x72;
pub const OP_IFDUP: u8 = 0x73;
pub const OP_DEPTH: u8 = 0x74;
pub const OP_DROP: u8 = 0x75;
pub const OP_DUP: u8 = 0x76;
pub const OP_NIP: u8 = 0x77;
pub const OP_OVER: u8 = 0x78;
pub const OP_PICK: u8 = 0x79;
pub const OP_ROLL: u8 = 0x7a;
pub const OP_ROT: u8 = 0x7b;
pub const OP_SWAP: u8 = 0x7c;
pub const OP_TUCK: u8 = 0x7d;
pub const OP_CAT: u8 = 0x7e;
pub const OP_SUBSTR: u8 = 0x7f;
pub const OP_LEFT: u8 = 0x80;
pub const OP_RIGHT: u8 = 0x81;
pub const OP_SIZE: u8 = 0x82;
pub const OP_INVERT: u8 = 0x83;
pub const OP_AND: u8 = 0x84;
pub const OP_OR: u8 = 0x85;
pub const OP_XOR: u8 = 0x86;
pub const OP_EQUAL: u8 = 0x87;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_1ADD: u8 = 0x8b;
pub const OP_1SUB: u8 = 0x8c;
pub const OP_2MUL: u8 = 0x8d;
pub const OP_2DIV: u8 = 0x8e;
pub const OP_NEGATE: u8 = 0x8f;
pub const OP_ABS: u8 = 0x90;
pub const OP_NOT: u8 = 0x91;
pub const OP_0NOTEQUAL: u8 = 0x92;
pub const OP_ADD: u8 = 0x93;
pub const OP_SUB: u8 = 0x94;
pub const OP_MUL: u8 = 0x95;
pub const OP_DIV: u8 = 0x96;
pub const OP_MOD: u8 = 0x97;
pub const OP_LSHIFT: u8 = 0x98;
pub const OP_RSHIFT: u8 = 0x99;
pub const OP_BOOLAND: u8 = 0x9a;
pub const OP_BOOLOR: u8 = 0x9b;
pub const OP_NUMEQUAL: u8 = 0x9c;
pub const OP_NUMEQUALVERIFY: u8 = 0x9d;
pub const OP_NUMNOTEQUAL: u8 = 0x9e;
pub const OP_LESSTHAN: u8 = 0x9f;
pub const OP_GREATERTHAN: u8 = 0xa0;
pub const OP_LESSTHANOREQUAL: u8 = 0xa1;
pub const OP_GREATERTHANOREQUAL: u8 = 0xa2;
pub const OP_MIN: u8 = 0xa3;
pub const OP_MAX: u8 = 0xa4;
pub const OP_WITHIN: u8 = 0xa5;
pub const OP_RIPEMD160: u8 = 0xa6;
pub const OP_SHA1: u8 = 0xa7;
pub const OP_SHA256: u8 = 0xa8;
pub const OP_HASH160: u8 = 0xa9;
pub const OP_HASH256: u8 = 0xaa;
pub const OP_CODESEPARATOR: u8 = 0xab;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
pub const OP_CHECKMULTISIG: u8 = 0xae;
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;
pub const OP_NOP1: u8 = 0xb0;
pub const OP_CHECKLOCKTIMEVERIFY: u8 = 0xb1;
pub const OP_CHECKSEQUENCEVERIFY: u8 = 0xb2;
pub const OP_NOP4: u8 = 0xb3;
pub const OP_NOP5: u8 = 0xb4;
pub const OP_NOP6: u8 = 0xb5;
pub const OP_NOP7: u8 = 0xb6;
pub const OP_NOP8: u8 = 0xb7;
pub const OP_NOP9: u8 = 0xb8;
pub const OP_NOP10: u8 = 0xb9;

/// Longest operand accepted by the arithmetic opcodes
const MAX_NUM_SIZE: usize = 4;

// -----------------------------------------------------------------------------
// Number codec

/// Minimal little-endian sign-magnitude encoding; zero is the empty string
pub fn encode_num(num: i64) -> Vec<u8> {
    if num == 0 {
        return Vec::new();
    }
    let negative = num < 0;
    let mut abs = num.unsigned_abs();
    let mut result = Vec::new();
    while abs > 0 {
        result.push((abs & 0xff) as u8);
        abs >>= 8;
    }

    let last = result.len() - 1;
    if result[last] & 0x80 != 0 {
        result.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        result[last] |= 0x80;
    }
    result
}

/// Inverse of [`encode_num`] for elements of up to 8 bytes
pub fn decode_num(element: &[u8]) -> Result<i64> {
    decode_bounded(element, 8)
}

fn decode_bounded(element: &[u8], max_len: usize) -> Result<i64> {
    if element.len() > max_len {
        return Err(BitcoinError::ScriptEvaluationFailed(format!(
            "number of {} bytes exceeds {max_len}",
            element.len()
        )));
    }
    let Some((&last, _)) = element.split_last() else {
        return Ok(0);
    };

    let magnitude = element
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &byte)| acc | ((byte as u64) << (8 * i)));
    let sign_bit = 0x80u64 << (8 * (element.len() - 1));
    if last & 0x80 != 0 {
        Ok(-((magnitude & !sign_bit) as i64))
    } else {
        Ok(magnitude as i64)
    }
}

/// Truthiness of a stack element: any non-zero byte, except a lone
/// sign bit in the last position (negative zero)
pub fn cast_to_bool(element: &[u8]) -> bool {
    for (i, &byte) in element.iter().enumerate() {
        if byte != 0 {
            return !(i == element.len() - 1 && byte == 0x80);
        }
    }
    false
}

// -----------------------------------------------------------------------------
// Dispatch table

/// A handler, tagged by the machine state it touches
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Push a small number
    Push(i64),
    /// Do nothing
    Nop,
    Stack(fn(&mut Stack) -> Result<()>),
    AltStack(fn(&mut Stack, &mut Stack) -> Result<()>),
    /// Needs the remaining commands (conditionals)
    Flow(fn(&mut Stack, &mut VecDeque<Command>) -> Result<()>),
    /// Needs the signature hash
    Signature(fn(&mut Stack, &BigInt) -> Result<()>),
    /// Disabled legacy opcode; always fails
    Disabled,
    /// Named but not implemented by this interpreter
    Unsupported,
}

/// One entry of the opcode table
#[derive(Debug, Clone, Copy)]
pub struct OpCode {
    pub name: &'static str,
    pub operation: Operation,
}

impl OpCode {
    /// Run the handler against the machine state
    pub fn execute(
        &self,
        stack: &mut Stack,
        altstack: &mut Stack,
        cmds: &mut VecDeque<Command>,
        z: &BigInt,
    ) -> Result<()> {
        match self.operation {
            Operation::Push(n) => {
                stack.push(encode_num(n));
                Ok(())
            }
            Operation::Nop => Ok(()),
            Operation::Stack(f) => f(stack),
            Operation::AltStack(f) => f(stack, altstack),
            Operation::Flow(f) => f(stack, cmds),
            Operation::Signature(f) => f(stack, z),
            Operation::Disabled => Err(BitcoinError::InvalidOpcode(self.name)),
            Operation::Unsupported => Err(BitcoinError::ScriptEvaluationFailed(format!(
                "{} is not supported",
                self.name
            ))),
        }
    }
}

/// Opcode table, built once
pub static OP_CODES: LazyLock<HashMap<u8, OpCode>> = LazyLock::new(|| {
    let entries: &[(u8, &str, Operation)] = &[
        // Constants
        (OP_0, "OP_0", Operation::Push(0)),
        (OP_PUSHDATA1, "OP_PUSHDATA1", Operation::Unsupported),
        (OP_PUSHDATA2, "OP_PUSHDATA2", Operation::Unsupported),
        (OP_PUSHDATA4, "OP_PUSHDATA4", Operation::Unsupported),
        (OP_1NEGATE, "OP_1NEGATE", Operation::Push(-1)),
        (OP_1, "OP_1", Operation::Push(1)),
        (OP_2, "OP_2", Operation::Push(2)),
        (OP_3, "OP_3", Operation::Push(3)),
        (OP_4, "OP_4", Operation::Push(4)),
        (OP_5, "OP_5", Operation::Push(5)),
        (OP_6, "OP_6", Operation::Push(6)),
        (OP_7, "OP_7", Operation::Push(7)),
        (OP_8, "OP_8", Operation::Push(8)),
        (OP_9, "OP_9", Operation::Push(9)),
        (OP_10, "OP_10", Operation::Push(10)),
        (OP_11, "OP_11", Operation::Push(11)),
        (OP_12, "OP_12", Operation::Push(12)),
        (OP_13, "OP_13", Operation::Push(13)),
        (OP_14, "OP_14", Operation::Push(14)),
        (OP_15, "OP_15", Operation::Push(15)),
        (OP_16, "OP_16", Operation::Push(16)),
        // Flow control
        (OP_NOP, "OP_NOP", Operation::Nop),
        (OP_IF, "OP_IF", Operation::Flow(op_if)),
        (OP_NOTIF, "OP_NOTIF", Operation::Flow(op_notif)),
        (OP_ELSE, "OP_ELSE", Operation::Flow(op_unbalanced)),
        (OP_ENDIF, "OP_ENDIF", Operation::Flow(op_unbalanced)),
        (OP_VERIFY, "OP_VERIFY", Operation::Stack(op_verify)),
        (OP_RETURN, "OP_RETURN", Operation::Stack(op_return)),
        // Stack
        (OP_TOALTSTACK, "OP_TOALTSTACK", Operation::AltStack(op_toaltstack)),
        (OP_FROMALTSTACK, "OP_FROMALTSTACK", Operation::AltStack(op_fromaltstack)),
        (OP_2DROP, "OP_2DROP", Operation::Stack(op_2drop)),
        (OP_2DUP, "OP_2DUP", Operation::Stack(op_2dup)),
        (OP_3DUP, "OP_3DUP", Operation::Stack(op_3dup)),
        (OP_2OVER, "OP_2OVER", Operation::Stack(op_2over)),
        (OP_2ROT, "OP_2ROT", Operation::Stack(op_2rot)),
        (OP_2SWAP, "OP_2SWAP", Operation::Stack(op_2swap)),
        (OP_IFDUP, "OP_IFDUP", Operation::Stack(op_ifdup)),
        (OP_DEPTH, "OP_DEPTH", Operation::Stack(op_depth)),
        (OP_DROP, "OP_DROP", Operation::Stack(op_drop)),
        (OP_DUP, "OP_DUP", Operation::Stack(op_dup)),
        (OP_NIP, "OP_NIP", Operation::Stack(op_nip)),
        (OP_OVER, "OP_OVER", Operation::Stack(op_over)),
        (OP_PICK, "OP_PICK", Operation::Stack(op_pick)),
        (OP_ROLL, "OP_ROLL", Operation::Stack(op_roll)),
        (OP_ROT, "OP_ROT", Operation::Stack(op_rot)),
        (OP_SWAP, "OP_SWAP", Operation::Stack(op_swap)),
        (OP_TUCK, "OP_TUCK", Operation::Stack(op_tuck)),
        // Splice
        (OP_CAT, "OP_CAT", Operation::Disabled),
        (OP_SUBSTR, "OP_SUBSTR", Operation::Disabled),
        (OP_LEFT, "OP_LEFT", Operation::Disabled),
        (OP_RIGHT, "OP_RIGHT", Operation::Disabled),
        (OP_SIZE, "OP_SIZE", Operation::Stack(op_size)),
        // Bitwise logic
        (OP_INVERT, "OP_INVERT", Operation::Disabled),
        (OP_AND, "OP_AND", Operation::Disabled),
        (OP_OR, "OP_OR", Operation::Disabled),
        (OP_XOR, "OP_XOR", Operation::Disabled),
        (OP_EQUAL, "OP_EQUAL", Operation::Stack(op_equal)),
        (OP_EQUALVERIFY, "OP_EQUALVERIFY", Operation::Stack(op_equalverify)),
        // Arithmetic
        (OP_1ADD, "OP_1ADD", Operation::Stack(op_1add)),
        (OP_1SUB, "OP_1SUB", Operation::Stack(op_1sub)),
        (OP_2MUL, "OP_2MUL", Operation::Disabled),
        (OP_2DIV, "OP_2DIV", Operation::Disabled),
        (OP_NEGATE, "OP_NEGATE", Operation::Stack(op_negate)),
        (OP_ABS, "OP_ABS", Operation::Stack(op_abs)),
        (OP_NOT, "OP_NOT", Operation::Stack(op_not)),
        (OP_0NOTEQUAL, "OP_0NOTEQUAL", Operation::Stack(op_0notequal)),
        (OP_ADD, "OP_ADD", Operation::Stack(op_add)),
        (OP_SUB, "OP_SUB", Operation::Stack(op_sub)),
        (OP_MUL, "OP_MUL", Operation::Disabled),
        (OP_DIV, "OP_DIV", Operation::Disabled),
        (OP_MOD, "OP_MOD", Operation::Disabled),
        (OP_LSHIFT, "OP_LSHIFT", Operation::Disabled),
        (OP_RSHIFT, "OP_RSHIFT", Operation::Disabled),
        (OP_BOOLAND, "OP_BOOLAND", Operation::Stack(op_booland)),
        (OP_BOOLOR, "OP_BOOLOR", Operation::Stack(op_boolor)),
        (OP_NUMEQUAL, "OP_NUMEQUAL", Operation::Stack(op_numequal)),
        (OP_NUMEQUALVERIFY, "OP_NUMEQUALVERIFY", Operation::Stack(op_numequalverify)),
        (OP_NUMNOTEQUAL, "OP_NUMNOTEQUAL", Operation::Stack(op_numnotequal)),
        (OP_LESSTHAN, "OP_LESSTHAN", Operation::Stack(op_lessthan)),
        (OP_GREATERTHAN, "OP_GREATERTHAN", Operation::Stack(op_greaterthan)),
        (OP_LESSTHANOREQUAL, "OP_LESSTHANOREQUAL", Operation::Stack(op_lessthanorequal)),
        (OP_GREATERTHANOREQUAL, "OP_GREATERTHANOREQUAL", Operation::Stack(op_greaterthanorequal)),
        (OP_MIN, "OP_MIN", Operation::Stack(op_min)),
        (OP_MAX, "OP_MAX", Operation::Stack(op_max)),
        (OP_WITHIN, "OP_WITHIN", Operation::Stack(op_within)),
        // Crypto
        (OP_RIPEMD160, "OP_RIPEMD160", Operation::Stack(op_ripemd160)),
        (OP_SHA1, "OP_SHA1", Operation::Stack(op_sha1)),
        (OP_SHA256, "OP_SHA256", Operation::Stack(op_sha256)),
        (OP_HASH160, "OP_HASH160", Operation::Stack(op_hash160)),
        (OP_HASH256, "OP_HASH256", Operation::Stack(op_hash256)),
        (OP_CODESEPARATOR, "OP_CODESEPARATOR", Operation::Nop),
        (OP_CHECKSIG, "OP_CHECKSIG", Operation::Signature(op_checksig)),
        (OP_CHECKSIGVERIFY, "OP_CHECKSIGVERIFY", Operation::Signature(op_checksigverify)),
        (OP_CHECKMULTISIG, "OP_CHECKMULTISIG", Operation::Unsupported),
        (OP_CHECKMULTISIGVERIFY, "OP_CHECKMULTISIGVERIFY", Operation::Unsupported),
        // Expansion
        (OP_NOP1, "OP_NOP1", Operation::Nop),
        (OP_CHECKLOCKTIMEVERIFY, "OP_CHECKLOCKTIMEVERIFY", Operation::Unsupported),
        (OP_CHECKSEQUENCEVERIFY, "OP_CHECKSEQUENCEVERIFY", Operation::Unsupported),
        (OP_NOP4, "OP_NOP4", Operation::Nop),
        (OP_NOP5, "OP_NOP5", Operation::Nop),
        (OP_NOP6, "OP_NOP6", Operation::Nop),
        (OP_NOP7, "OP_NOP7", Operation::Nop),
        (OP_NOP8, "OP_NOP8", Operation::Nop),
        (OP_NOP9, "OP_NOP9", Operation::Nop),
        (OP_NOP10, "OP_NOP10", Operation::Nop),
    ];

    entries
        .iter()
        .map(|&(code, name, operation)| (code, OpCode { name, operation }))
        .collect()
});

/// Human-readable name of an opcode
pub fn op_name(code: u8) -> Option<&'static str> {
    OP_CODES.get(&code).map(|op| op.name)
}

// -----------------------------------------------------------------------------
// Helpers

fn need(stack: &Stack, op: &'static str, needed: usize) -> Result<()> {
    if stack.len() < needed {
        return Err(BitcoinError::InsufficientStackItems {
            op,
            needed,
            available: stack.len(),
        });
    }
    Ok(())
}

fn pop(stack: &mut Stack, op: &'static str) -> Result<Vec<u8>> {
    stack.pop().ok_or(BitcoinError::InsufficientStackItems {
        op,
        needed: 1,
        available: 0,
    })
}

fn pop_num(stack: &mut Stack, op: &'static str) -> Result<i64> {
    decode_bounded(&pop(stack, op)?, MAX_NUM_SIZE)
}

fn push_bool(stack: &mut Stack, value: bool) {
    stack.push(encode_num(value as i64));
}

fn verify_top(stack: &mut Stack, op: &'static str) -> Result<()> {
    if !cast_to_bool(&pop(stack, op)?) {
        return Err(BitcoinError::ScriptEvaluationFailed(format!("{op} failed")));
    }
    Ok(())
}

fn unary(stack: &mut Stack, op: &'static str, f: impl Fn(i64) -> i64) -> Result<()> {
    let a = pop_num(stack, op)?;
    stack.push(encode_num(f(a)));
    Ok(())
}

/// Pops `b` then `a` and pushes `f(a, b)`
fn binary(stack: &mut Stack, op: &'static str, f: impl Fn(i64, i64) -> i64) -> Result<()> {
    need(stack, op, 2)?;
    let b = pop_num(stack, op)?;
    let a = pop_num(stack, op)?;
    stack.push(encode_num(f(a, b)));
    Ok(())
}

fn digest(stack: &mut Stack, op: &'static str, f: impl Fn(&[u8]) -> Vec<u8>) -> Result<()> {
    let element = pop(stack, op)?;
    stack.push(f(&element));
    Ok(())
}

// -----------------------------------------------------------------------------
// Flow control

/// Split the commands up to the matching OP_ENDIF into the if-block and
/// the else-block, then splice the selected block back to the front.
/// Each OP_ELSE at this depth switches which block the following
/// commands belong to, so `IF a ELSE b ELSE c ENDIF` runs `a c` or `b`.
fn branch(stack: &mut Stack, cmds: &mut VecDeque<Command>, op: &'static str, when: bool) -> Result<()> {
    need(stack, op, 1)?;

    let mut if_cmds = Vec::new();
    let mut else_cmds = Vec::new();
    let mut in_else = false;
    let mut found = false;
    let mut endifs_needed = 1;

    while let Some(cmd) = cmds.pop_front() {
        match cmd {
            Command::Op(OP_IF | OP_NOTIF) => endifs_needed += 1,
            Command::Op(OP_ELSE) if endifs_needed == 1 => {
                in_else = !in_else;
                continue;
            }
            Command::Op(OP_ENDIF) if endifs_needed == 1 => {
                found = true;
                break;
            }
            Command::Op(OP_ENDIF) => endifs_needed -= 1,
            _ => {}
        }
        if in_else {
            else_cmds.push(cmd);
        } else {
            if_cmds.push(cmd);
        }
    }

    if !found {
        return Err(BitcoinError::ScriptEvaluationFailed(format!(
            "{op} without matching OP_ENDIF"
        )));
    }

    let condition = cast_to_bool(&pop(stack, op)?);
    let selected = if condition == when { if_cmds } else { else_cmds };
    for cmd in selected.into_iter().rev() {
        cmds.push_front(cmd);
    }
    Ok(())
}

fn op_if(stack: &mut Stack, cmds: &mut VecDeque<Command>) -> Result<()> {
    branch(stack, cmds, "OP_IF", true)
}

fn op_notif(stack: &mut Stack, cmds: &mut VecDeque<Command>) -> Result<()> {
    branch(stack, cmds, "OP_NOTIF", false)
}

/// OP_ELSE / OP_ENDIF reached outside of a conditional
fn op_unbalanced(_stack: &mut Stack, _cmds: &mut VecDeque<Command>) -> Result<()> {
    Err(BitcoinError::ScriptEvaluationFailed(
        "OP_ELSE or OP_ENDIF without OP_IF".into(),
    ))
}

fn op_verify(stack: &mut Stack) -> Result<()> {
    verify_top(stack, "OP_VERIFY")
}

fn op_return(_stack: &mut Stack) -> Result<()> {
    Err(BitcoinError::ScriptEvaluationFailed("OP_RETURN".into()))
}

// -----------------------------------------------------------------------------
// Stack

fn op_toaltstack(stack: &mut Stack, altstack: &mut Stack) -> Result<()> {
    altstack.push(pop(stack, "OP_TOALTSTACK")?);
    Ok(())
}

fn op_fromaltstack(stack: &mut Stack, altstack: &mut Stack) -> Result<()> {
    stack.push(pop(altstack, "OP_FROMALTSTACK")?);
    Ok(())
}

fn op_2drop(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_2DROP", 2)?;
    stack.truncate(stack.len() - 2);
    Ok(())
}

fn op_2dup(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_2DUP", 2)?;
    stack.extend_from_within(stack.len() - 2..);
    Ok(())
}

fn op_3dup(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_3DUP", 3)?;
    stack.extend_from_within(stack.len() - 3..);
    Ok(())
}

fn op_2over(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_2OVER", 4)?;
    let len = stack.len();
    stack.extend_from_within(len - 4..len - 2);
    Ok(())
}

fn op_2rot(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_2ROT", 6)?;
    let len = stack.len();
    let moved: Vec<_> = stack.drain(len - 6..len - 4).collect();
    stack.extend(moved);
    Ok(())
}

fn op_2swap(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_2SWAP", 4)?;
    let len = stack.len();
    let moved: Vec<_> = stack.drain(len - 4..len - 2).collect();
    stack.extend(moved);
    Ok(())
}

fn op_ifdup(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_IFDUP", 1)?;
    let top = stack[stack.len() - 1].clone();
    if cast_to_bool(&top) {
        stack.push(top);
    }
    Ok(())
}

fn op_depth(stack: &mut Stack) -> Result<()> {
    stack.push(encode_num(stack.len() as i64));
    Ok(())
}

fn op_drop(stack: &mut Stack) -> Result<()> {
    pop(stack, "OP_DROP").map(|_| ())
}

fn op_dup(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_DUP", 1)?;
    stack.extend_from_within(stack.len() - 1..);
    Ok(())
}

fn op_nip(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_NIP", 2)?;
    stack.remove(stack.len() - 2);
    Ok(())
}

fn op_over(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_OVER", 2)?;
    let len = stack.len();
    stack.extend_from_within(len - 2..len - 1);
    Ok(())
}

/// Position of the item `n` back from the top, for OP_PICK / OP_ROLL
fn depth_index(stack: &mut Stack, op: &'static str) -> Result<usize> {
    let n = pop_num(stack, op)?;
    let n = usize::try_from(n)
        .map_err(|_| BitcoinError::ScriptEvaluationFailed(format!("{op} with negative index")))?;
    need(stack, op, n + 1)?;
    Ok(stack.len() - 1 - n)
}

fn op_pick(stack: &mut Stack) -> Result<()> {
    let idx = depth_index(stack, "OP_PICK")?;
    stack.push(stack[idx].clone());
    Ok(())
}

fn op_roll(stack: &mut Stack) -> Result<()> {
    let idx = depth_index(stack, "OP_ROLL")?;
    let item = stack.remove(idx);
    stack.push(item);
    Ok(())
}

fn op_rot(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_ROT", 3)?;
    let item = stack.remove(stack.len() - 3);
    stack.push(item);
    Ok(())
}

fn op_swap(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_SWAP", 2)?;
    let len = stack.len();
    stack.swap(len - 2, len - 1);
    Ok(())
}

fn op_tuck(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_TUCK", 2)?;
    let top = stack[stack.len() - 1].clone();
    stack.insert(stack.len() - 2, top);
    Ok(())
}

fn op_size(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_SIZE", 1)?;
    let size = stack[stack.len() - 1].len();
    stack.push(encode_num(size as i64));
    Ok(())
}

fn op_equal(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_EQUAL", 2)?;
    let b = pop(stack, "OP_EQUAL")?;
    let a = pop(stack, "OP_EQUAL")?;
    push_bool(stack, a == b);
    Ok(())
}

fn op_equalverify(stack: &mut Stack) -> Result<()> {
    op_equal(stack)?;
    verify_top(stack, "OP_EQUALVERIFY")
}

// -----------------------------------------------------------------------------
// Arithmetic

fn op_1add(stack: &mut Stack) -> Result<()> {
    unary(stack, "OP_1ADD", |a| a + 1)
}

fn op_1sub(stack: &mut Stack) -> Result<()> {
    unary(stack, "OP_1SUB", |a| a - 1)
}

fn op_negate(stack: &mut Stack) -> Result<()> {
    unary(stack, "OP_NEGATE", |a| -a)
}

fn op_abs(stack: &mut Stack) -> Result<()> {
    unary(stack, "OP_ABS", i64::abs)
}

fn op_not(stack: &mut Stack) -> Result<()> {
    unary(stack, "OP_NOT", |a| (a == 0) as i64)
}

fn op_0notequal(stack: &mut Stack) -> Result<()> {
    unary(stack, "OP_0NOTEQUAL", |a| (a != 0) as i64)
}

fn op_add(stack: &mut Stack) -> Result<()> {
    binary(stack, "OP_ADD", |a, b| a + b)
}

fn op_sub(stack: &mut Stack) -> Result<()> {
    binary(stack, "OP_SUB", |a, b| a - b)
}

fn op_booland(stack: &mut Stack) -> Result<()> {
    binary(stack, "OP_BOOLAND", |a, b| (a != 0 && b != 0) as i64)
}

fn op_boolor(stack: &mut Stack) -> Result<()> {
    binary(stack, "OP_BOOLOR", |a, b| (a != 0 || b != 0) as i64)
}

fn op_numequal(stack: &mut Stack) -> Result<()> {
    binary(stack, "OP_NUMEQUAL", |a, b| (a == b) as i64)
}

fn op_numequalverify(stack: &mut Stack) -> Result<()> {
    op_numequal(stack)?;
    verify_top(stack, "OP_NUMEQUALVERIFY")
}

fn op_numnotequal(stack: &mut Stack) -> Result<()> {
    binary(stack, "OP_NUMNOTEQUAL", |a, b| (a != b) as i64)
}

fn op_lessthan(stack: &mut Stack) -> Result<()> {
    binary(stack, "OP_LESSTHAN", |a, b| (a < b) as i64)
}

fn op_greaterthan(stack: &mut Stack) -> Result<()> {
    binary(stack, "OP_GREATERTHAN", |a, b| (a > b) as i64)
}

fn op_lessthanorequal(stack: &mut Stack) -> Result<()> {
    binary(stack, "OP_LESSTHANOREQUAL", |a, b| (a <= b) as i64)
}

fn op_greaterthanorequal(stack: &mut Stack) -> Result<()> {
    binary(stack, "OP_GREATERTHANOREQUAL", |a, b| (a >= b) as i64)
}

fn op_min(stack: &mut Stack) -> Result<()> {
    binary(stack, "OP_MIN", i64::min)
}

fn op_max(stack: &mut Stack) -> Result<()> {
    binary(stack, "OP_MAX", i64::max)
}

/// x min max -> min <= x < max
fn op_within(stack: &mut Stack) -> Result<()> {
    need(stack, "OP_WITHIN", 3)?;
    let max = pop_num(stack, "OP_WITHIN")?;
    let min = pop_num(stack, "OP_WITHIN")?;
    let x = pop_num(stack, "OP_WITHIN")?;
    push_bool(stack, min <= x && x < max);
    Ok(())
}

// -----------------------------------------------------------------------------
// Crypto

fn op_ripemd160(stack: &mut Stack) -> Result<()> {
    digest(stack, "OP_RIPEMD160", |data| ripemd160(data).to_vec())
}

fn op_sha1(stack: &mut Stack) -> Result<()> {
    digest(stack, "OP_SHA1", |data| sha1(data).to_vec())
}

fn op_sha256(stack: &mut Stack) -> Result<()> {
    digest(stack, "OP_SHA256", |data| sha256(data).to_vec())
}

fn op_hash160(stack: &mut Stack) -> Result<()> {
    digest(stack, "OP_HASH160", |data| hash160(data).to_vec())
}

fn op_hash256(stack: &mut Stack) -> Result<()> {
    digest(stack, "OP_HASH256", |data| hash256(data).to_vec())
}

/// Pops a SEC pubkey then a DER signature with its sighash byte and
/// pushes whether the signature is valid for `z`
fn op_checksig(stack: &mut Stack, z: &BigInt) -> Result<()> {
    need(stack, "OP_CHECKSIG", 2)?;
    let sec = pop(stack, "OP_CHECKSIG")?;
    let mut sig = pop(stack, "OP_CHECKSIG")?;

    // trailing sighash type
    if sig.pop().is_none() {
        return Err(BitcoinError::MalformedSignature("empty signature"));
    }

    let point = S256Point::parse(&sec)?;
    let signature = Signature::parse(&sig)?;
    let valid = point.verify(z, &signature);
    log::trace!("OP_CHECKSIG against {point}: {valid}");
    push_bool(stack, valid);
    Ok(())
}

fn op_checksigverify(stack: &mut Stack, z: &BigInt) -> Result<()> {
    op_checksig(stack, z)?;
    verify_top(stack, "OP_CHECKSIGVERIFY")
}
