//! Numeric model for stack operands.
//!
//! Numbers travel on the stack as little-endian sign-magnitude byte strings:
//! the high bit of the final byte is the sign and zero is the empty string.
//! Operands are limited to [`MAX_SCRIPTNUM_LEN`] bytes, while results of
//! arithmetic on such operands may spill into a fifth byte and are pushed
//! unchanged.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::ScriptError;

/// Maximum byte length of a numeric operand read from the stack.
pub const MAX_SCRIPTNUM_LEN: usize = 4;

/// A decoded script number.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ScriptNum(i64);

impl ScriptNum {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1);

    /// Decodes an operand.
    ///
    /// Fails with [`ScriptError::Unknown`] when `bytes` is longer than
    /// `max_len`, or when `require_minimal` is set and the encoding carries
    /// a redundant trailing byte. `max_len` is capped at eight bytes.
    pub fn decode(
        bytes: &[u8],
        require_minimal: bool,
        max_len: usize,
    ) -> Result<Self, ScriptError> {
        if bytes.len() > max_len.min(8) {
            return Err(ScriptError::Unknown);
        }
        if require_minimal && !is_minimally_encoded(bytes) {
            return Err(ScriptError::Unknown);
        }
        Ok(Self(decode_num(bytes)))
    }

    /// Minimal sign-magnitude encoding of the value.
    pub fn encode(self) -> Vec<u8> {
        encode_num(self.0)
    }

    pub const fn value(self) -> i64 {
        self.0
    }

    /// Value clamped to the `i32` range, used for counts and stack indices.
    pub fn to_i32(self) -> i32 {
        self.0.clamp(i32::MIN as i64, i32::MAX as i64) as i32
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, ScriptError> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(ScriptError::Unknown)
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self, ScriptError> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(ScriptError::Unknown)
    }

    pub fn checked_neg(self) -> Result<Self, ScriptError> {
        self.0.checked_neg().map(Self).ok_or(ScriptError::Unknown)
    }

    pub fn checked_abs(self) -> Result<Self, ScriptError> {
        self.0.checked_abs().map(Self).ok_or(ScriptError::Unknown)
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<i64> for ScriptNum {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<bool> for ScriptNum {
    fn from(value: bool) -> Self {
        Self(value as i64)
    }
}

fn encode_num(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(9);
    let mut abs_value = value.unsigned_abs();

    while abs_value > 0 {
        result.push((abs_value & 0xff) as u8);
        abs_value >>= 8;
    }

    if let Some(last) = result.last_mut() {
        if *last & 0x80 != 0 {
            result.push(if value < 0 { 0x80 } else { 0x00 });
        } else if value < 0 {
            *last |= 0x80;
        }
    }

    result
}

fn decode_num(bytes: &[u8]) -> i64 {
    let Some((&last, _)) = bytes.split_last() else {
        return 0;
    };

    let mut result: i64 = 0;
    for (i, &byte) in bytes.iter().enumerate() {
        result |= (byte as i64) << (8 * i);
    }

    if last & 0x80 != 0 {
        let mask = !(0x80i64 << (8 * (bytes.len() - 1)));
        -(result & mask)
    } else {
        result
    }
}

/// A trailing byte without magnitude bits is only allowed when the byte
/// before it has its high bit set, i.e. when it is needed for the sign.
pub(crate) fn is_minimally_encoded(bytes: &[u8]) -> bool {
    let Some((&last, rest)) = bytes.split_last() else {
        return true;
    };
    if last & 0x7f == 0 {
        match rest.last() {
            None => return false,
            Some(prev) if prev & 0x80 == 0 => return false,
            Some(_) => {}
        }
    }
    true
}

/// Truthiness of a stack element.
///
/// False iff the element is empty or all zero bytes, where the final byte
/// may also be `0x80` (negative zero).
pub fn cast_to_bool(data: &[u8]) -> bool {
    for (i, &byte) in data.iter().enumerate() {
        if byte != 0 {
            return !(i == data.len() - 1 && byte == 0x80);
        }
    }
    false
}
