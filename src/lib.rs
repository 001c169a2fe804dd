#![cfg_attr(not(feature = "std"), no_std)]
//! Pure-Rust verifier for legacy Bitcoin script spends.
//!
//! Given a locking script, an unlocking script and a set of
//! [`VerificationFlags`], [`verify`] decides whether the spend is valid and,
//! when it is not, reports the first [`ScriptError`] encountered. The rules
//! follow Bitcoin Core's pre-segwit interpreter: pay-to-script-hash
//! evaluation plus the strict-encoding, low-S, null-dummy, push-only,
//! minimal-data, upgradable-NOP and clean-stack policies.
//!
//! Signature validity is a separate question answered by a
//! [`SignatureChecker`]. [`NullSignatureChecker`] treats every signature as
//! invalid, while [`TransactionSignatureChecker`] verifies ECDSA signatures
//! against the legacy sighash of a spending transaction.

#[cfg(not(feature = "std"))]
extern crate alloc;

mod checker;
mod encoding;
mod error;
mod flags;
pub mod interpreter;
mod num;
pub mod script;
mod stack;
mod verify;

pub use checker::{
    CheckerError, NullSignatureChecker, SignatureChecker, TransactionContext,
    TransactionSignatureChecker,
};
pub use encoding::{check_pubkey_encoding, check_signature_encoding, is_valid_signature_encoding};
pub use error::ScriptError;
pub use flags::{
    lookup, resolve, FlagError, VerificationFlags, FLAG_NAMES, VERIFY_CLEANSTACK, VERIFY_DERSIG,
    VERIFY_DISCOURAGE_UPGRADABLE_NOPS, VERIFY_LOW_S, VERIFY_MINIMALDATA, VERIFY_NONE,
    VERIFY_NULLDUMMY, VERIFY_P2SH, VERIFY_SIGPUSHONLY, VERIFY_STRICTENC,
};
pub use interpreter::{MAX_OPS_PER_SCRIPT, MAX_PUBKEYS_PER_MULTISIG};
pub use num::{cast_to_bool, ScriptNum, MAX_SCRIPTNUM_LEN};
pub use script::{Operation, Script, MAX_SCRIPT_SIZE};
pub use stack::{ScriptStack, MAX_SCRIPT_ELEMENT_SIZE, MAX_STACK_SIZE};
pub use verify::{verify, verify_script, Verdict};

/// Flag set used by Bitcoin Core's script test harness for signed vectors.
pub const STANDARD_TEST_FLAGS: VerificationFlags =
    VerificationFlags::P2SH.union(VerificationFlags::STRICTENC);

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::{
        absolute::LockTime,
        blockdata::script::{Builder, PushBytesBuf, ScriptBuf},
        consensus,
        hashes::{hash160, Hash},
        opcodes::all,
        secp256k1::{Message, PublicKey, Secp256k1, SecretKey},
        sighash::{EcdsaSighashType, SighashCache},
        transaction::Version,
        Amount, OutPoint, Sequence, Transaction, TxIn, TxOut, Witness,
    };

    fn run_simple_script(locking: ScriptBuf, unlocking: ScriptBuf) -> Verdict {
        verify(
            locking.as_bytes(),
            unlocking.as_bytes(),
            VerificationFlags::NONE,
            &NullSignatureChecker,
        )
    }

    fn spending_tx(locking: &ScriptBuf) -> Transaction {
        let credit = Transaction {
            version: Version(1),
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::default(),
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(1),
                script_pubkey: locking.clone(),
            }],
        };
        Transaction {
            version: Version(1),
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint {
                    txid: credit.compute_txid(),
                    vout: 0,
                },
                script_sig: ScriptBuf::new(),
                sequence: Sequence::MAX,
                witness: Witness::new(),
            }],
            output: vec![TxOut {
                value: Amount::from_sat(1),
                script_pubkey: ScriptBuf::new(),
            }],
        }
    }

    #[test]
    fn arithmetic_script() {
        let locking = Builder::new()
            .push_opcode(all::OP_ADD)
            .push_int(5)
            .push_opcode(all::OP_NUMEQUAL)
            .into_script();
        let unlocking = Builder::new().push_int(2).push_int(3).into_script();
        assert!(run_simple_script(locking, unlocking).valid);
    }

    #[test]
    fn verify_script_reports_error() {
        let locking = Builder::new().push_opcode(all::OP_VERIFY).into_script();
        let unlocking = Builder::new().push_int(0).into_script();
        assert_eq!(
            verify_script(
                locking.as_bytes(),
                unlocking.as_bytes(),
                STANDARD_TEST_FLAGS,
                &NullSignatureChecker
            ),
            Err(ScriptError::Verify)
        );
    }

    #[test]
    fn p2pkh_with_transaction_checker() {
        let secp = Secp256k1::new();
        let key = SecretKey::from_slice(&[0x42; 32]).unwrap();
        let pubkey = PublicKey::from_secret_key(&secp, &key);
        let pubkey_bytes = pubkey.serialize();
        let pubkey_hash = hash160::Hash::hash(&pubkey_bytes).to_byte_array().to_vec();

        let locking = Builder::new()
            .push_opcode(all::OP_DUP)
            .push_opcode(all::OP_HASH160)
            .push_slice(PushBytesBuf::try_from(pubkey_hash).unwrap())
            .push_opcode(all::OP_EQUALVERIFY)
            .push_opcode(all::OP_CHECKSIG)
            .into_script();

        let mut tx = spending_tx(&locking);
        let sighash = SighashCache::new(&tx)
            .legacy_signature_hash(0, &locking, EcdsaSighashType::All.to_u32())
            .unwrap();
        let msg = Message::from_digest_slice(&sighash[..]).unwrap();
        let mut sig = secp.sign_ecdsa(&msg, &key).serialize_der().to_vec();
        sig.push(EcdsaSighashType::All.to_u32() as u8);

        let unlocking = Builder::new()
            .push_slice(PushBytesBuf::try_from(sig).unwrap())
            .push_slice(PushBytesBuf::try_from(pubkey_bytes.to_vec()).unwrap())
            .into_script();
        tx.input[0].script_sig = unlocking.clone();

        let tx_bytes = consensus::serialize(&tx);
        let context = TransactionContext::parse(&tx_bytes).unwrap();
        let checker = context.checker(0).unwrap();
        let flags = STANDARD_TEST_FLAGS | VerificationFlags::DERSIG | VerificationFlags::LOW_S;
        let (locking, unlocking) = (locking.as_bytes(), unlocking.as_bytes());
        assert_eq!(verify(locking, unlocking, flags, &checker), Verdict::VALID);

        // The same signature means nothing without a transaction.
        assert_eq!(
            verify(locking, unlocking, flags, &NullSignatureChecker).error,
            ScriptError::EvalFalse
        );

        // Committing to one more output invalidates it.
        tx.output.push(tx.output[0].clone());
        let checker = TransactionSignatureChecker::new(&tx, 0).unwrap();
        assert_eq!(
            verify(locking, unlocking, flags, &checker).error,
            ScriptError::EvalFalse
        );
    }
}
