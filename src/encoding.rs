//! Flag-gated encoding rules for signatures and public keys.
//!
//! These run before the signature checker is consulted, so an encoding
//! violation fails the script even if the signature would verify.

use bitcoin::sighash::EcdsaSighashType;

use crate::{error::ScriptError, flags::VerificationFlags};

const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Half the secp256k1 group order, big-endian.
const HALF_ORDER: [u8; 32] = [
    0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0x5d, 0x57, 0x6e, 0x73, 0x57, 0xa4, 0x50, 0x1d, 0xdf, 0xe9, 0x2f, 0x46, 0x68, 0x1b, 0x20, 0xa0,
];

/// Checks a signature (with trailing hash type byte) against the active flags.
///
/// An empty signature always passes: it is the canonical way to provide a
/// failing signature.
pub fn check_signature_encoding(sig: &[u8], flags: VerificationFlags) -> Result<(), ScriptError> {
    if sig.is_empty() {
        return Ok(());
    }
    let strict_der =
        VerificationFlags::DERSIG | VerificationFlags::LOW_S | VerificationFlags::STRICTENC;
    if flags.bits() & strict_der.bits() != 0 && !is_valid_signature_encoding(sig) {
        return Err(ScriptError::SigDer);
    }
    if flags.contains(VerificationFlags::LOW_S) && !is_low_der_signature(sig) {
        return Err(ScriptError::SigHighS);
    }
    if flags.contains(VerificationFlags::STRICTENC) && !is_defined_hashtype_signature(sig) {
        return Err(ScriptError::SigHashType);
    }
    Ok(())
}

pub fn check_pubkey_encoding(pubkey: &[u8], flags: VerificationFlags) -> Result<(), ScriptError> {
    if flags.contains(VerificationFlags::STRICTENC) && !is_valid_pubkey_encoding(pubkey) {
        return Err(ScriptError::PubkeyType);
    }
    Ok(())
}

/// Strict DER check of `0x30 len 0x02 lenR R 0x02 lenS S hashtype`.
pub fn is_valid_signature_encoding(sig: &[u8]) -> bool {
    if sig.len() < 9 || sig.len() > 73 {
        return false;
    }
    if sig[0] != 0x30 {
        return false;
    }
    if sig[1] as usize != sig.len() - 3 {
        return false;
    }

    let len_r = sig[3] as usize;
    if 5 + len_r >= sig.len() {
        return false;
    }
    let len_s = sig[5 + len_r] as usize;
    if len_r + len_s + 7 != sig.len() {
        return false;
    }

    if sig[2] != 0x02 {
        return false;
    }
    if len_r == 0 {
        return false;
    }
    if sig[4] & 0x80 != 0 {
        return false;
    }
    if len_r > 1 && sig[4] == 0x00 && (sig[5] & 0x80) == 0 {
        return false;
    }

    if sig[len_r + 4] != 0x02 {
        return false;
    }
    if len_s == 0 {
        return false;
    }
    if sig[len_r + 6] & 0x80 != 0 {
        return false;
    }
    if len_s > 1 && sig[len_r + 6] == 0x00 && (sig[len_r + 7] & 0x80) == 0 {
        return false;
    }
    true
}

/// S must satisfy `0 < S <= n/2`.
fn is_low_der_signature(sig: &[u8]) -> bool {
    let len_r = sig[3] as usize;
    let len_s = sig[5 + len_r] as usize;
    let s = &sig[6 + len_r..6 + len_r + len_s];
    let s = strip_leading_zeros(s);
    !s.is_empty() && compare_big_endian(s, strip_leading_zeros(&HALF_ORDER)).is_le()
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}

fn compare_big_endian(a: &[u8], b: &[u8]) -> core::cmp::Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn is_defined_hashtype_signature(sig: &[u8]) -> bool {
    let Some(&hash_type) = sig.last() else {
        return false;
    };
    let base = hash_type & !SIGHASH_ANYONECANPAY;
    (EcdsaSighashType::All as u8..=EcdsaSighashType::Single as u8).contains(&base)
}

fn is_valid_pubkey_encoding(pubkey: &[u8]) -> bool {
    match pubkey.len() {
        33 => matches!(pubkey[0], 0x02 | 0x03),
        65 => pubkey[0] == 0x04,
        _ => false,
    }
}
