//! Script decoding.
//!
//! A [`Script`] is the decoded, immutable operation list of a serialized
//! script. Decoding is purely structural: it splits the bytes into
//! operations and rejects truncated pushes, but executes nothing.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use bitcoin::opcodes::{all, Opcode};

use crate::error::ScriptError;

/// Maximum serialized size of a script.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// One decoded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Any opcode above `OP_PUSHDATA4`.
    Code(Opcode),
    /// A data push, keeping the exact push opcode used (`OP_0`, a direct
    /// length byte or `OP_PUSHDATA1/2/4`).
    PushData { opcode: Opcode, data: Vec<u8> },
}

impl Operation {
    pub fn opcode(&self) -> Opcode {
        match self {
            Operation::Code(op) => *op,
            Operation::PushData { opcode, .. } => *opcode,
        }
    }

    /// Non-push opcodes count against the per-script operation limit.
    pub fn counts_toward_limit(&self) -> bool {
        self.opcode().to_u8() > all::OP_PUSHNUM_16.to_u8()
    }

    fn encode_to(&self, out: &mut Vec<u8>) {
        match self {
            Operation::Code(op) => out.push(op.to_u8()),
            Operation::PushData { opcode, data } => {
                let opcode = *opcode;
                out.push(opcode.to_u8());
                let len = data.len();
                if opcode == all::OP_PUSHDATA1 {
                    out.push(len as u8);
                } else if opcode == all::OP_PUSHDATA2 {
                    out.extend_from_slice(&(len as u16).to_le_bytes());
                } else if opcode == all::OP_PUSHDATA4 {
                    out.extend_from_slice(&(len as u32).to_le_bytes());
                }
                out.extend_from_slice(data);
            }
        }
    }

    /// Whether this is the canonical push of `bytes`, which is the pattern
    /// signature removal looks for.
    fn is_canonical_push_of(&self, bytes: &[u8]) -> bool {
        match self {
            Operation::PushData { opcode, data } => {
                data.as_slice() == bytes && *opcode == canonical_push_opcode(bytes.len())
            }
            Operation::Code(_) => false,
        }
    }
}

/// Decoded script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    operations: Vec<Operation>,
}

impl Script {
    /// Splits `bytes` into operations.
    ///
    /// Fails with [`ScriptError::ScriptSize`] for scripts over
    /// [`MAX_SCRIPT_SIZE`] bytes and [`ScriptError::BadOpcode`] when a push
    /// length or payload runs past the end.
    pub fn decode(bytes: &[u8]) -> Result<Self, ScriptError> {
        if bytes.len() > MAX_SCRIPT_SIZE {
            return Err(ScriptError::ScriptSize);
        }

        let mut operations = Vec::new();
        let mut index = 0usize;
        while index < bytes.len() {
            let opcode = bytes[index];
            index += 1;
            let push_len = match opcode {
                0x00..=0x4b => opcode as usize,
                0x4c => read_push_length(bytes, &mut index, 1)?,
                0x4d => read_push_length(bytes, &mut index, 2)?,
                0x4e => read_push_length(bytes, &mut index, 4)?,
                _ => {
                    operations.push(Operation::Code(Opcode::from(opcode)));
                    continue;
                }
            };
            let end = index
                .checked_add(push_len)
                .filter(|end| *end <= bytes.len())
                .ok_or(ScriptError::BadOpcode)?;
            operations.push(Operation::PushData {
                opcode: Opcode::from(opcode),
                data: bytes[index..end].to_vec(),
            });
            index = end;
        }

        Ok(Self { operations })
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Re-serializes the script byte for byte.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_bytes_filtered(|_| true)
    }

    /// Serializes only the operations `keep` accepts.
    pub fn to_bytes_filtered(&self, mut keep: impl FnMut(&Operation) -> bool) -> Vec<u8> {
        let mut out = Vec::new();
        for op in self.operations.iter().filter(|op| keep(op)) {
            op.encode_to(&mut out);
        }
        out
    }

    /// True if every opcode is `OP_16` or below.
    ///
    /// `OP_RESERVED` sits in that range and therefore counts as a push here,
    /// matching the consensus definition.
    pub fn is_push_only(&self) -> bool {
        self.operations
            .iter()
            .all(|op| op.opcode().to_u8() <= all::OP_PUSHNUM_16.to_u8())
    }

    /// Serialized subscript starting at operation `start`, with every
    /// canonical push of one of `signatures` removed.
    pub(crate) fn script_code(&self, start: usize, signatures: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for op in self.operations.iter().skip(start) {
            if !signatures.iter().any(|sig| op.is_canonical_push_of(sig)) {
                op.encode_to(&mut out);
            }
        }
        out
    }
}

/// Exact pay-to-script-hash template: `OP_HASH160 <20 bytes> OP_EQUAL`.
pub fn is_p2sh(script_bytes: &[u8]) -> bool {
    script_bytes.len() == 23
        && script_bytes[0] == all::OP_HASH160.to_u8()
        && script_bytes[1] == all::OP_PUSHBYTES_20.to_u8()
        && script_bytes[22] == all::OP_EQUAL.to_u8()
}

/// Push-only test on raw bytes. Undecodable scripts are not push only.
pub fn is_push_only(script_bytes: &[u8]) -> bool {
    Script::decode(script_bytes)
        .map(|script| script.is_push_only())
        .unwrap_or(false)
}

/// Canonical length-prefixed push of `data`.
pub fn push_encoding(data: &[u8]) -> Vec<u8> {
    let op = Operation::PushData {
        opcode: canonical_push_opcode(data.len()),
        data: data.to_vec(),
    };
    let mut out = Vec::with_capacity(data.len() + 5);
    op.encode_to(&mut out);
    out
}

fn canonical_push_opcode(len: usize) -> Opcode {
    if len < all::OP_PUSHDATA1.to_u8() as usize {
        Opcode::from(len as u8)
    } else if len <= 0xff {
        all::OP_PUSHDATA1
    } else if len <= 0xffff {
        all::OP_PUSHDATA2
    } else {
        all::OP_PUSHDATA4
    }
}

/// Whether `data` was pushed with the shortest possible encoding.
pub fn is_minimal_push(opcode: Opcode, data: &[u8]) -> bool {
    use all::*;

    let opcode = opcode.to_u8();
    if data.is_empty() {
        return opcode == OP_PUSHBYTES_0.to_u8();
    }

    if data.len() == 1 {
        let value = data[0];
        if value == 0x81 {
            return opcode == OP_PUSHNUM_NEG1.to_u8();
        }
        if (1..=16).contains(&value) {
            return opcode == OP_PUSHNUM_1.to_u8() + value - 1;
        }
    }

    if data.len() <= 75 {
        return opcode as usize == data.len();
    }
    if data.len() <= 0xff {
        return opcode == OP_PUSHDATA1.to_u8();
    }
    if data.len() <= 0xffff {
        return opcode == OP_PUSHDATA2.to_u8();
    }
    true
}

/// Execution category of an opcode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum OpcodeClass {
    Push,
    PushNumber,
    FlowControl,
    UpgradableNop,
    Stack,
    Splice,
    Bitwise,
    Arithmetic,
    Crypto,
    Disabled,
    Reserved,
}

pub fn classify(opcode: Opcode) -> OpcodeClass {
    match opcode.to_u8() {
        0x00..=0x4e => OpcodeClass::Push,
        // OP_1NEGATE, OP_1..=OP_16
        0x4f | 0x51..=0x60 => OpcodeClass::PushNumber,
        // OP_NOP, OP_IF, OP_NOTIF, OP_ELSE, OP_ENDIF, OP_VERIFY, OP_RETURN
        0x61 | 0x63 | 0x64 | 0x67..=0x6a => OpcodeClass::FlowControl,
        // OP_TOALTSTACK..=OP_TUCK
        0x6b..=0x7d => OpcodeClass::Stack,
        // OP_SIZE
        0x82 => OpcodeClass::Splice,
        // OP_EQUAL, OP_EQUALVERIFY
        0x87 | 0x88 => OpcodeClass::Bitwise,
        // OP_1ADD, OP_1SUB, OP_NEGATE..=OP_SUB, OP_BOOLAND..=OP_WITHIN
        0x8b | 0x8c | 0x8f..=0x94 | 0x9a..=0xa5 => OpcodeClass::Arithmetic,
        // OP_RIPEMD160..=OP_CHECKMULTISIGVERIFY
        0xa6..=0xaf => OpcodeClass::Crypto,
        // OP_NOP1..=OP_NOP10
        0xb0..=0xb9 => OpcodeClass::UpgradableNop,
        // OP_CAT, OP_SUBSTR, OP_LEFT, OP_RIGHT, OP_INVERT, OP_AND, OP_OR,
        // OP_XOR, OP_2MUL, OP_2DIV, OP_MUL, OP_DIV, OP_MOD, OP_LSHIFT, OP_RSHIFT
        0x7e..=0x81 | 0x83..=0x86 | 0x8d | 0x8e | 0x95..=0x99 => OpcodeClass::Disabled,
        // OP_RESERVED, OP_VER, OP_VERIF, OP_VERNOTIF, OP_RESERVED1,
        // OP_RESERVED2 and everything unassigned
        _ => OpcodeClass::Reserved,
    }
}

/// `OP_IF..=OP_ENDIF`, which are evaluated even inside unexecuted branches.
pub(crate) fn is_conditional(opcode: Opcode) -> bool {
    (all::OP_IF.to_u8()..=all::OP_ENDIF.to_u8()).contains(&opcode.to_u8())
}

fn read_push_length(bytes: &[u8], index: &mut usize, width: usize) -> Result<usize, ScriptError> {
    if bytes.len() < *index + width {
        return Err(ScriptError::BadOpcode);
    }
    let mut len: usize = 0;
    for i in 0..width {
        len |= (bytes[*index + i] as usize) << (8 * i);
    }
    *index += width;
    Ok(len)
}
