//! Transaction fixtures and signing helpers shared by the signed-spend tests.

#![allow(dead_code)]

use bitcoin::{
    absolute::LockTime,
    blockdata::script::{Builder, PushBytesBuf},
    opcodes::all,
    secp256k1::{ecdsa::Signature, All, Message, PublicKey, Secp256k1, SecretKey},
    sighash::{EcdsaSighashType, SighashCache},
    transaction::Version,
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Witness,
};

/// Group order of secp256k1, big endian.
const CURVE_ORDER: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe,
    0xba, 0xae, 0xdc, 0xe6, 0xaf, 0x48, 0xa0, 0x3b, 0xbf, 0xd2, 0x5e, 0x8c, 0xd0, 0x36, 0x41, 0x41,
];

pub fn secret_key(seed: u8) -> SecretKey {
    SecretKey::from_slice(&[seed; 32]).expect("valid secret key")
}

pub fn public_key(secp: &Secp256k1<All>, key: &SecretKey) -> PublicKey {
    PublicKey::from_secret_key(secp, key)
}

pub fn push(data: &[u8]) -> PushBytesBuf {
    PushBytesBuf::try_from(data.to_vec()).expect("push fits")
}

pub fn build_crediting_tx(script_pubkey: &ScriptBuf, value_sat: u64) -> Transaction {
    Transaction {
        version: Version(1),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::default(),
            script_sig: Builder::new().push_int(0).push_int(0).into_script(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(value_sat),
            script_pubkey: script_pubkey.clone(),
        }],
    }
}

pub fn build_spending_tx(credit_tx: &Transaction, value_sat: u64) -> Transaction {
    Transaction {
        version: Version(1),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint {
                txid: credit_tx.compute_txid(),
                vout: 0,
            },
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(value_sat),
            script_pubkey: ScriptBuf::new(),
        }],
    }
}

/// Raw ECDSA signature over the legacy sighash of input 0.
pub fn sign_raw(
    secp: &Secp256k1<All>,
    tx: &Transaction,
    script_code: &ScriptBuf,
    key: &SecretKey,
    sighash_type: EcdsaSighashType,
) -> Signature {
    let sighash = SighashCache::new(tx)
        .legacy_signature_hash(0, script_code, sighash_type.to_u32())
        .expect("legacy sighash");
    let msg = Message::from_digest_slice(&sighash[..]).expect("sighash to message");
    secp.sign_ecdsa(&msg, key)
}

/// DER signature with the hash type byte appended.
pub fn with_hash_type(signature: &Signature, sighash_type: EcdsaSighashType) -> Vec<u8> {
    let mut bytes = signature.serialize_der().to_vec();
    bytes.push(sighash_type.to_u32() as u8);
    bytes
}

pub fn sign(
    secp: &Secp256k1<All>,
    tx: &Transaction,
    script_code: &ScriptBuf,
    key: &SecretKey,
) -> Vec<u8> {
    let signature = sign_raw(secp, tx, script_code, key, EcdsaSighashType::All);
    with_hash_type(&signature, EcdsaSighashType::All)
}

/// Unlocking script `OP_0 <sig>...` for a bare multisig output.
pub fn sign_multisig(
    secp: &Secp256k1<All>,
    tx: &Transaction,
    script_code: &ScriptBuf,
    keys: &[SecretKey],
) -> ScriptBuf {
    let mut script_sig = Builder::new().push_opcode(all::OP_PUSHBYTES_0);
    for key in keys {
        script_sig = script_sig.push_slice(push(&sign(secp, tx, script_code, key)));
    }
    script_sig.into_script()
}

/// Replaces `s` with `n - s`, producing the high-S twin of a low-S signature.
pub fn malleate(signature: &Signature) -> Signature {
    let mut compact = signature.serialize_compact();
    let mut borrow = 0u16;
    for i in (0..32).rev() {
        let lhs = u16::from(CURVE_ORDER[i]);
        let rhs = u16::from(compact[32 + i]) + borrow;
        let (digit, next) = if lhs >= rhs { (lhs - rhs, 0) } else { (lhs + 256 - rhs, 1) };
        compact[32 + i] = digit as u8;
        borrow = next;
    }
    Signature::from_compact(&compact).expect("n - s is a valid scalar")
}

pub fn multisig_script(required: i64, pubkeys: &[Vec<u8>]) -> ScriptBuf {
    let mut builder = Builder::new().push_int(required);
    for pubkey in pubkeys {
        builder = builder.push_slice(push(pubkey));
    }
    builder
        .push_int(pubkeys.len() as i64)
        .push_opcode(all::OP_CHECKMULTISIG)
        .into_script()
}
