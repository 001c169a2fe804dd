//! Signature checking capability consulted by `OP_CHECKSIG` and friends.

#[cfg(feature = "std")]
use std::sync::OnceLock;

use core::fmt;

use bitcoin::{
    blockdata::script::ScriptBuf,
    consensus,
    hashes::Hash,
    opcodes::all,
    secp256k1::{self, ecdsa::Signature as EcdsaSignature, Message, PublicKey, Secp256k1},
    sighash::SighashCache,
    Transaction,
};

use crate::script::{Operation, Script};

type VerificationContext = Secp256k1<secp256k1::VerifyOnly>;

#[cfg(feature = "std")]
static SECP256K1: OnceLock<VerificationContext> = OnceLock::new();

fn with_secp256k1_verification_ctx<R>(f: impl FnOnce(&VerificationContext) -> R) -> R {
    #[cfg(feature = "std")]
    {
        f(SECP256K1.get_or_init(Secp256k1::verification_only))
    }
    #[cfg(not(feature = "std"))]
    {
        let ctx = Secp256k1::verification_only();
        f(&ctx)
    }
}

/// Answers whether a signature is valid for a public key over the digest
/// implied by `script_code` and the spending context.
///
/// `signature` still carries its trailing hash type byte. `script_code` is
/// the serialized subscript from the last `OP_CODESEPARATOR`, with pushes of
/// the signature(s) being checked already removed. Encoding rules have been
/// enforced by the caller, so implementations only answer the cryptographic
/// question and never fail.
pub trait SignatureChecker {
    fn check_sig(&self, signature: &[u8], pubkey: &[u8], script_code: &[u8]) -> bool;
}

impl<T: SignatureChecker + ?Sized> SignatureChecker for &T {
    fn check_sig(&self, signature: &[u8], pubkey: &[u8], script_code: &[u8]) -> bool {
        (**self).check_sig(signature, pubkey, script_code)
    }
}

/// Checker without a transaction context. Every signature is invalid.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSignatureChecker;

impl SignatureChecker for NullSignatureChecker {
    fn check_sig(&self, _signature: &[u8], _pubkey: &[u8], _script_code: &[u8]) -> bool {
        false
    }
}

/// ECDSA checker over the legacy signature hash of one transaction input.
pub struct TransactionSignatureChecker<'tx> {
    sighash_cache: SighashCache<&'tx Transaction>,
    input_index: usize,
}

impl<'tx> TransactionSignatureChecker<'tx> {
    pub fn new(tx: &'tx Transaction, input_index: usize) -> Result<Self, CheckerError> {
        if input_index >= tx.input.len() {
            return Err(CheckerError::InputIndex);
        }
        Ok(Self {
            sighash_cache: SighashCache::new(tx),
            input_index,
        })
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    fn verify_ecdsa(&self, signature: &[u8], pubkey: &[u8], script_code: &[u8]) -> Option<bool> {
        let (&sighash_type, der) = signature.split_last()?;
        let pubkey = PublicKey::from_slice(pubkey).ok()?;
        let mut signature = EcdsaSignature::from_der_lax(der).ok()?;
        signature.normalize_s();

        let script_code = strip_code_separators(script_code)?;
        let sighash = self
            .sighash_cache
            .legacy_signature_hash(self.input_index, &script_code, u32::from(sighash_type))
            .ok()?;
        let message = Message::from_digest(sighash.to_byte_array());

        Some(with_secp256k1_verification_ctx(|secp| {
            secp.verify_ecdsa(&message, &signature, &pubkey).is_ok()
        }))
    }
}

impl SignatureChecker for TransactionSignatureChecker<'_> {
    fn check_sig(&self, signature: &[u8], pubkey: &[u8], script_code: &[u8]) -> bool {
        self.verify_ecdsa(signature, pubkey, script_code)
            .unwrap_or(false)
    }
}

/// Owns a transaction parsed from its consensus encoding.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    tx: Transaction,
}

impl TransactionContext {
    /// Parses wire bytes. Trailing bytes and non-minimal length prefixes are
    /// rejected by the decoder, so an accepted encoding is canonical.
    pub fn parse(tx_bytes: &[u8]) -> Result<Self, CheckerError> {
        let tx = consensus::deserialize(tx_bytes).map_err(|_| CheckerError::Deserialize)?;
        Ok(Self { tx })
    }

    pub fn tx(&self) -> &Transaction {
        &self.tx
    }

    /// Signature checker for input `input_index`.
    pub fn checker(
        &self,
        input_index: usize,
    ) -> Result<TransactionSignatureChecker<'_>, CheckerError> {
        TransactionSignatureChecker::new(&self.tx, input_index)
    }
}

impl From<Transaction> for TransactionContext {
    fn from(tx: Transaction) -> Self {
        Self { tx }
    }
}

/// Signature hashing commits to the script code with every
/// `OP_CODESEPARATOR` removed.
fn strip_code_separators(script_code: &[u8]) -> Option<ScriptBuf> {
    let script = Script::decode(script_code).ok()?;
    let stripped = script.to_bytes_filtered(|op| *op != Operation::Code(all::OP_CODESEPARATOR));
    Some(ScriptBuf::from_bytes(stripped))
}

/// Errors building a transaction-backed checker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CheckerError {
    /// The input index is out of range for the transaction.
    InputIndex,
    /// The bytes are not a valid transaction.
    Deserialize,
}

impl fmt::Display for CheckerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = match *self {
            CheckerError::InputIndex => "input index out of range",
            CheckerError::Deserialize => "transaction failed to deserialize",
        };
        f.write_str(description)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CheckerError {}

#[cfg(test)]
mod tests {
    use super::*;
    use bitcoin::{
        absolute::LockTime, transaction::Version, Amount, OutPoint, Sequence, TxIn, TxOut, Witness,
    };

    fn one_input_tx() -> Transaction {
        Transaction {
            version: Version(1),
            lock_time: LockTime::ZERO,
            input: vec![TxIn {
                previous_output: OutPoint::default(),
                script_sig: ScriptBuf::from_bytes(vec![all::OP_PUSHNUM_1.to_u8()]),
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
    fn null_checker_rejects_everything() {
        let pubkey = [0x02; 33];
        assert!(!NullSignatureChecker.check_sig(&[0x30, 0x01], &pubkey, &[]));
        assert!(!(&NullSignatureChecker).check_sig(&[], &[], &[]));
    }

    #[test]
    fn input_index_is_validated() {
        let tx = one_input_tx();
        let checker = TransactionSignatureChecker::new(&tx, 0).unwrap();
        assert_eq!(checker.input_index(), 0);
        assert_eq!(
            TransactionSignatureChecker::new(&tx, 1).err(),
            Some(CheckerError::InputIndex)
        );
    }

    #[test]
    fn parse_rejects_trailing_and_garbage_bytes() {
        let mut bytes = consensus::serialize(&one_input_tx());
        let context = TransactionContext::parse(&bytes).unwrap();
        assert_eq!(context.tx(), &one_input_tx());

        let mut trailing = bytes.clone();
        trailing.push(0x00);
        assert_eq!(
            TransactionContext::parse(&trailing).unwrap_err(),
            CheckerError::Deserialize
        );
        assert_eq!(
            TransactionContext::parse(&[0x01, 0x02]).unwrap_err(),
            CheckerError::Deserialize
        );

        // Input count 1 spelled as a three-byte varint.
        assert_eq!(bytes[4], 0x01);
        bytes.splice(4..5, [0xfd, 0x01, 0x00]);
        assert_eq!(
            TransactionContext::parse(&bytes).unwrap_err(),
            CheckerError::Deserialize
        );
    }

    #[test]
    fn malformed_signature_or_key_is_invalid() {
        let tx = one_input_tx();
        let checker = TransactionSignatureChecker::new(&tx, 0).unwrap();
        assert!(!checker.check_sig(&[], &[0x02; 33], &[]));
        let signature = [0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01, 0x01];
        assert!(!checker.check_sig(&signature, &[0x05], &[]));
    }

    #[test]
    fn code_separators_are_stripped() {
        let code = [
            all::OP_PUSHNUM_1.to_u8(),
            all::OP_CODESEPARATOR.to_u8(),
            all::OP_CHECKSIG.to_u8(),
        ];
        let stripped = strip_code_separators(&code).unwrap();
        assert_eq!(
            stripped.as_bytes(),
            &[all::OP_PUSHNUM_1.to_u8(), all::OP_CHECKSIG.to_u8()]
        );
    }
}
