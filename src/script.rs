//! Bitcoin Script: the command container, its wire codec and the evaluator
//! Reference: https://en.bitcoin.it/wiki/Script

use std::collections::VecDeque;
use std::fmt;
use std::io::Cursor;

use num_bigint::BigInt;

use crate::encoding::{decode_int, decode_varint, encode_int, encode_varint, read_bytes, read_u8};
use crate::error::{BitcoinError, Result};
use crate::op::{
    OP_CHECKSIG, OP_CODES, OP_DUP, OP_EQUALVERIFY, OP_HASH160, OP_PUSHDATA1, OP_PUSHDATA2,
    OP_PUSHDATA4, Stack, cast_to_bool, op_name,
};

/// Script command - either an opcode or data bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Op(u8),
    Data(Vec<u8>),
}

/// Bitcoin Script
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script {
    pub cmds: Vec<Command>,
}

impl Script {
    pub fn new(cmds: Vec<Command>) -> Self {
        Script { cmds }
    }

    pub fn empty() -> Self {
        Script { cmds: Vec::new() }
    }

    /// Parse a length-prefixed script
    pub fn parse(cursor: &mut Cursor<&[u8]>) -> Result<Self> {
        let length = decode_varint(cursor)?;
        let length = usize::try_from(length)
            .map_err(|_| BitcoinError::Format(format!("Script length {length} too large")))?;
        let raw = read_bytes(cursor, length, "script")?;
        Self::parse_raw(&raw)
    }

    /// Parse script bytes without the length prefix. Every byte must
    /// belong to a command.
    pub fn parse_raw(raw: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(raw);
        let mut cmds = Vec::new();

        while (cursor.position() as usize) < raw.len() {
            let current = read_u8(&mut cursor, "script byte")?;
            let data_len = match current {
                1..=75 => current as usize,
                OP_PUSHDATA1 => decode_int(&mut cursor, 1)? as usize,
                OP_PUSHDATA2 => decode_int(&mut cursor, 2)? as usize,
                OP_PUSHDATA4 => decode_int(&mut cursor, 4)? as usize,
                op => {
                    cmds.push(Command::Op(op));
                    continue;
                }
            };
            let data = read_bytes(&mut cursor, data_len, "script data").map_err(|_| {
                BitcoinError::Format("Parsing script failed: push runs past the end".into())
            })?;
            cmds.push(Command::Data(data));
        }

        Ok(Script { cmds })
    }

    /// Serialize the commands without the length prefix
    pub fn raw_serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();

        for cmd in &self.cmds {
            match cmd {
                Command::Op(opcode) => out.push(*opcode),
                Command::Data(data) => {
                    let length = data.len();
                    if length <= 75 {
                        out.push(length as u8);
                    } else if length <= 0xff {
                        out.push(OP_PUSHDATA1);
                        out.push(length as u8);
                    } else if length <= 0xffff {
                        out.push(OP_PUSHDATA2);
                        out.extend(encode_int(length as u64, 2));
                    } else {
                        out.push(OP_PUSHDATA4);
                        out.extend(encode_int(length as u64, 4));
                    }
                    out.extend_from_slice(data);
                }
            }
        }
        out
    }

    /// Serialize with the varint length prefix
    pub fn serialize(&self) -> Vec<u8> {
        let raw = self.raw_serialize();
        let mut result = encode_varint(raw.len() as u64);
        result.extend(raw);
        result
    }

    /// Concatenate two scripts
    pub fn concat(&self, other: &Script) -> Script {
        let mut cmds = self.cmds.clone();
        cmds.extend(other.cmds.iter().cloned());
        Script { cmds }
    }

    /// Run the script against the signature hash `z`.
    ///
    /// Commands are consumed from a private queue, so the script itself is
    /// left untouched. Succeeds when every command executes and the stack
    /// ends with a truthy top element.
    pub fn evaluate(&self, z: &BigInt) -> Result<()> {
        let mut cmds: VecDeque<Command> = self.cmds.iter().cloned().collect();
        let mut stack = Stack::new();
        let mut altstack = Stack::new();

        while let Some(cmd) = cmds.pop_front() {
            match cmd {
                Command::Data(data) => stack.push(data),
                Command::Op(code) => {
                    let op = OP_CODES.get(&code).ok_or_else(|| {
                        BitcoinError::ScriptEvaluationFailed(format!("unknown opcode 0x{code:02x}"))
                    })?;
                    log::trace!("{} (stack depth {})", op.name, stack.len());
                    op.execute(&mut stack, &mut altstack, &mut cmds, z)?;
                }
            }
        }

        match stack.pop() {
            None => Err(BitcoinError::ScriptEvaluationFailed("empty stack".into())),
            Some(top) if !cast_to_bool(&top) => Err(BitcoinError::ScriptEvaluationFailed(
                "top of stack is false".into(),
            )),
            Some(_) => Ok(()),
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .cmds
            .iter()
            .map(|cmd| match cmd {
                Command::Op(op) => op_name(*op)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("OP_[{op}]")),
                Command::Data(data) => hex::encode(data),
            })
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

impl std::ops::Add for Script {
    type Output = Script;

    fn add(mut self, other: Script) -> Script {
        self.cmds.extend(other.cmds);
        self
    }
}

impl std::ops::Add for &Script {
    type Output = Script;

    fn add(self, other: &Script) -> Script {
        self.concat(other)
    }
}

/// `OP_DUP OP_HASH160 <h160> OP_EQUALVERIFY OP_CHECKSIG`
pub fn p2pkh_script(h160: &[u8; 20]) -> Script {
    Script::new(vec![
        Command::Op(OP_DUP),
        Command::Op(OP_HASH160),
        Command::Data(h160.to_vec()),
        Command::Op(OP_EQUALVERIFY),
        Command::Op(OP_CHECKSIG),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::*;

    const SCRIPT_SIG: &str = "6a47304402207899531a52d59a6de200179928ca900254a36b8dff8bb75f5f5d71b1cdc26125022008b422690b8461cb52c3cc30330b23d574351872b7c361e9aae3649071c1a7160121035d5c93d9ac96881f19ba1f686f15f009ded7c62efe85a872e6a19b43c15a2937";

    fn parse_hex(hex_str: &str) -> Result<Script> {
        let bytes = hex::decode(hex_str).unwrap();
        let mut cursor = Cursor::new(bytes.as_slice());
        Script::parse(&mut cursor)
    }

    fn ops(codes: &[u8]) -> Script {
        Script::new(codes.iter().map(|&c| Command::Op(c)).collect())
    }

    #[test]
    fn test_parse() {
        let script = parse_hex(SCRIPT_SIG).unwrap();
        assert_eq!(script.cmds.len(), 2);
        assert_eq!(
            script.cmds[0],
            Command::Data(
                hex::decode("304402207899531a52d59a6de200179928ca900254a36b8dff8bb75f5f5d71b1cdc26125022008b422690b8461cb52c3cc30330b23d574351872b7c361e9aae3649071c1a71601")
                    .unwrap()
            )
        );
        assert_eq!(
            script.cmds[1],
            Command::Data(
                hex::decode("035d5c93d9ac96881f19ba1f686f15f009ded7c62efe85a872e6a19b43c15a2937")
                    .unwrap()
            )
        );
    }

    #[test]
    fn test_serialize() {
        let script = parse_hex(SCRIPT_SIG).unwrap();
        assert_eq!(hex::encode(script.serialize()), SCRIPT_SIG);
    }

    #[test]
    fn test_parse_length_mismatch() {
        // declares 3 bytes but the push needs 4
        assert!(matches!(parse_hex("03030102"), Err(BitcoinError::Format(_))));
        // declared length longer than the input
        assert!(matches!(parse_hex("05767676"), Err(BitcoinError::Format(_))));
        // a length far beyond the input fails before allocating
        assert!(matches!(
            parse_hex("ffffffffffffffffff76"),
            Err(BitcoinError::Format(_))
        ));
        assert!(matches!(
            Script::parse_raw(&[OP_PUSHDATA4, 0xff, 0xff, 0xff, 0xff, 0x01]),
            Err(BitcoinError::Format(_))
        ));
    }

    #[test]
    fn test_pushdata_serialization() {
        for (len, prefix) in [(75usize, vec![75u8]), (76, vec![0x4c, 76]), (300, vec![0x4d, 0x2c, 0x01])] {
            let script = Script::new(vec![Command::Data(vec![0xab; len])]);
            let raw = script.raw_serialize();
            assert_eq!(&raw[..prefix.len()], prefix.as_slice());
            assert_eq!(Script::parse_raw(&raw).unwrap(), script);
        }

        let big = Script::new(vec![Command::Data(vec![1; 70_000])]);
        let raw = big.raw_serialize();
        assert_eq!(raw[0], OP_PUSHDATA4);
        assert_eq!(Script::parse_raw(&raw).unwrap(), big);
    }

    #[test]
    fn test_script_roundtrip() {
        let script = p2pkh_script(&[0u8; 20]);
        let encoded = script.serialize();
        let mut cursor = Cursor::new(encoded.as_slice());
        assert_eq!(Script::parse(&mut cursor).unwrap(), script);
        assert_eq!(encoded[0] as usize, encoded.len() - 1);
    }

    #[test]
    fn test_evaluate_arithmetic() {
        let script = ops(&[OP_5, OP_2, OP_ADD, OP_7, OP_EQUAL]);
        assert!(script.evaluate(&BigInt::from(0)).is_ok());
        // the parsed script is reusable
        assert!(script.evaluate(&BigInt::from(0)).is_ok());
        assert_eq!(script.cmds.len(), 5);
    }

    #[test]
    fn test_evaluate_falsy_results() {
        let z = BigInt::from(0);
        assert!(matches!(
            ops(&[OP_5, OP_2, OP_ADD, OP_8, OP_EQUAL]).evaluate(&z),
            Err(BitcoinError::ScriptEvaluationFailed(_))
        ));
        assert!(ops(&[OP_0]).evaluate(&z).is_err());
        assert!(ops(&[]).evaluate(&z).is_err());
        assert!(ops(&[OP_1, OP_DROP]).evaluate(&z).is_err());
        assert!(ops(&[0xba]).evaluate(&z).is_err());
    }

    #[test]
    fn test_evaluate_conditionals() {
        let z = BigInt::from(0);
        let branch = |cond| ops(&[cond, OP_IF, OP_2, OP_ELSE, OP_0, OP_ENDIF]);
        assert!(branch(OP_1).evaluate(&z).is_ok());
        assert!(branch(OP_0).evaluate(&z).is_err());

        let nested = ops(&[OP_1, OP_0, OP_NOTIF, OP_IF, OP_3, OP_ENDIF, OP_ELSE, OP_0, OP_ENDIF]);
        assert!(nested.evaluate(&z).is_ok());

        assert!(ops(&[OP_1, OP_IF, OP_1]).evaluate(&z).is_err());
        assert!(ops(&[OP_1, OP_ENDIF]).evaluate(&z).is_err());
    }

    #[test]
    fn test_evaluate_p2pkh() {
        let script_sig = hex::decode("6b483045022100ed81ff192e75a3fd2304004dcadb746fa5e24c5031ccfcf21320b0277457c98f02207a986d955c6e0cb35d446a89d3f56100f4d7f67801c31967743a9c8e10615bed01210349fc4e631e3624a545de3f89f5d8684c7b8138bd94bdd531d2e213bf016b278a").unwrap();
        let script_sig = Script::parse(&mut Cursor::new(script_sig.as_slice())).unwrap();

        let mut h160 = [0u8; 20];
        h160.copy_from_slice(&hex::decode("a802fc56c704ce87c42d7c92eb75e7896bdc41ae").unwrap());
        let combined = &script_sig + &p2pkh_script(&h160);

        let z = BigInt::parse_bytes(
            b"27e0c5994dec7824e56dec6b2fcb342eb7cdb0d0957c2fce9882f715e85d81a6",
            16,
        )
        .unwrap();
        assert!(combined.evaluate(&z).is_ok());
        assert!(combined.evaluate(&(z + 1u32)).is_err());

        let wrong_hash = &script_sig + &p2pkh_script(&[0u8; 20]);
        assert!(wrong_hash.evaluate(&BigInt::from(0)).is_err());
    }

    #[test]
    fn test_display() {
        let script = p2pkh_script(&[0xab; 20]);
        assert_eq!(
            script.to_string(),
            format!("OP_DUP OP_HASH160 {} OP_EQUALVERIFY OP_CHECKSIG", "ab".repeat(20))
        );
        assert_eq!(ops(&[0xba]).to_string(), "OP_[186]");
    }
}
