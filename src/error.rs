//! Script failure reasons.

use core::fmt;

/// Reason a script failed to verify.
///
/// The variants mirror the `SCRIPT_ERR_*` identifiers of the reference
/// interpreter. [`ScriptError::name`] returns that identifier and the
/// `Display` impl returns its human-readable description.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScriptError {
    Ok,
    Unknown,
    EvalFalse,
    OpReturn,

    // Resource limits.
    ScriptSize,
    PushSize,
    OpCount,
    StackSize,
    SigCount,
    PubkeyCount,

    // Failed verify operations.
    Verify,
    EqualVerify,
    CheckMultiSigVerify,
    CheckSigVerify,
    NumEqualVerify,

    // Logical and format errors.
    BadOpcode,
    DisabledOpcode,
    InvalidStackOperation,
    InvalidAltstackOperation,
    UnbalancedConditional,

    // Flag-gated rules.
    SigHashType,
    SigDer,
    MinimalData,
    SigPushOnly,
    SigHighS,
    SigNullDummy,
    PubkeyType,
    CleanStack,
    DiscourageUpgradableNops,
}

impl ScriptError {
    /// Every variant, in declaration order.
    pub const ALL: [ScriptError; 29] = [
        ScriptError::Ok,
        ScriptError::Unknown,
        ScriptError::EvalFalse,
        ScriptError::OpReturn,
        ScriptError::ScriptSize,
        ScriptError::PushSize,
        ScriptError::OpCount,
        ScriptError::StackSize,
        ScriptError::SigCount,
        ScriptError::PubkeyCount,
        ScriptError::Verify,
        ScriptError::EqualVerify,
        ScriptError::CheckMultiSigVerify,
        ScriptError::CheckSigVerify,
        ScriptError::NumEqualVerify,
        ScriptError::BadOpcode,
        ScriptError::DisabledOpcode,
        ScriptError::InvalidStackOperation,
        ScriptError::InvalidAltstackOperation,
        ScriptError::UnbalancedConditional,
        ScriptError::SigHashType,
        ScriptError::SigDer,
        ScriptError::MinimalData,
        ScriptError::SigPushOnly,
        ScriptError::SigHighS,
        ScriptError::SigNullDummy,
        ScriptError::PubkeyType,
        ScriptError::CleanStack,
        ScriptError::DiscourageUpgradableNops,
    ];

    /// The upper-case identifier used by script test vectors, e.g. `"EVAL_FALSE"`.
    pub fn name(self) -> &'static str {
        use ScriptError::*;

        match self {
            Ok => "OK",
            Unknown => "UNKNOWN_ERROR",
            EvalFalse => "EVAL_FALSE",
            OpReturn => "OP_RETURN",
            ScriptSize => "SCRIPT_SIZE",
            PushSize => "PUSH_SIZE",
            OpCount => "OP_COUNT",
            StackSize => "STACK_SIZE",
            SigCount => "SIG_COUNT",
            PubkeyCount => "PUBKEY_COUNT",
            Verify => "VERIFY",
            EqualVerify => "EQUALVERIFY",
            CheckMultiSigVerify => "CHECKMULTISIGVERIFY",
            CheckSigVerify => "CHECKSIGVERIFY",
            NumEqualVerify => "NUMEQUALVERIFY",
            BadOpcode => "BAD_OPCODE",
            DisabledOpcode => "DISABLED_OPCODE",
            InvalidStackOperation => "INVALID_STACK_OPERATION",
            InvalidAltstackOperation => "INVALID_ALTSTACK_OPERATION",
            UnbalancedConditional => "UNBALANCED_CONDITIONAL",
            SigHashType => "SIG_HASHTYPE",
            SigDer => "SIG_DER",
            MinimalData => "MINIMALDATA",
            SigPushOnly => "SIG_PUSHONLY",
            SigHighS => "SIG_HIGH_S",
            SigNullDummy => "SIG_NULLDUMMY",
            PubkeyType => "PUBKEYTYPE",
            CleanStack => "CLEANSTACK",
            DiscourageUpgradableNops => "DISCOURAGE_UPGRADABLE_NOPS",
        }
    }

    /// Looks up a variant by its [`name`](ScriptError::name).
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|err| err.name() == name)
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ScriptError::*;

        let description = match *self {
            Ok => "No error",
            Unknown => "unknown error",
            EvalFalse => {
                "Script evaluated without error but finished with a false/empty top stack element"
            }
            OpReturn => "OP_RETURN was encountered",
            ScriptSize => "Script is too big",
            PushSize => "Push value size limit exceeded",
            OpCount => "Operation limit exceeded",
            StackSize => "Stack size limit exceeded",
            SigCount => "Signature count negative or greater than pubkey count",
            PubkeyCount => "Pubkey count negative or limit exceeded",
            Verify => "Script failed an OP_VERIFY operation",
            EqualVerify => "Script failed an OP_EQUALVERIFY operation",
            CheckMultiSigVerify => "Script failed an OP_CHECKMULTISIGVERIFY operation",
            CheckSigVerify => "Script failed an OP_CHECKSIGVERIFY operation",
            NumEqualVerify => "Script failed an OP_NUMEQUALVERIFY operation",
            BadOpcode => "Opcode missing or not understood",
            DisabledOpcode => "Attempted to use a disabled opcode",
            InvalidStackOperation => "Operation not valid with the current stack size",
            InvalidAltstackOperation => "Operation not valid with the current altstack size",
            UnbalancedConditional => "Invalid OP_IF construction",
            SigHashType => "Signature hash type missing or not understood",
            SigDer => "Non-canonical DER signature",
            MinimalData => "Data push larger than necessary",
            SigPushOnly => "Only non-push operators allowed in signatures",
            SigHighS => "Non-canonical signature: S value is unnecessarily high",
            SigNullDummy => "Dummy CHECKMULTISIG argument must be zero",
            PubkeyType => "Public key is neither compressed or uncompressed",
            CleanStack => "Extra items left on stack after execution",
            DiscourageUpgradableNops => "NOPx reserved for soft-fork upgrades",
        };

        f.write_str(description)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ScriptError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_resolvable() {
        for err in ScriptError::ALL {
            assert_eq!(ScriptError::from_name(err.name()), Some(err));
        }
        assert_eq!(ScriptError::from_name("NOT_AN_ERROR"), None);
    }

    #[test]
    fn display_uses_reference_descriptions() {
        assert_eq!(ScriptError::OpCount.to_string(), "Operation limit exceeded");
        assert_eq!(ScriptError::Ok.to_string(), "No error");
    }
}
