//! Verification flags and the name registry used to resolve them.

#[cfg(not(feature = "std"))]
use alloc::string::{String, ToString};

use core::{fmt, ops::BitOr, str::FromStr};

/// Do not enable any verification.
pub const VERIFY_NONE: u32 = 0;
/// Evaluate P2SH (BIP16) subscripts.
pub const VERIFY_P2SH: u32 = 1 << 0;
/// Enforce strict signature and public key encodings.
pub const VERIFY_STRICTENC: u32 = 1 << 1;
/// Enforce strict DER (BIP66) compliance.
pub const VERIFY_DERSIG: u32 = 1 << 2;
/// Require signatures to use low-S form.
pub const VERIFY_LOW_S: u32 = 1 << 3;
/// Require the CHECKMULTISIG dummy element to be empty.
pub const VERIFY_NULLDUMMY: u32 = 1 << 4;
/// Require the unlocking script to be push only.
pub const VERIFY_SIGPUSHONLY: u32 = 1 << 5;
/// Require minimal data pushes and number encodings.
pub const VERIFY_MINIMALDATA: u32 = 1 << 6;
/// Discourage use of upgradable NOP opcodes.
pub const VERIFY_DISCOURAGE_UPGRADABLE_NOPS: u32 = 1 << 7;
/// Require exactly one stack element after evaluation.
pub const VERIFY_CLEANSTACK: u32 = 1 << 8;

const SUPPORTED_FLAGS: u32 = VERIFY_P2SH
    | VERIFY_STRICTENC
    | VERIFY_DERSIG
    | VERIFY_LOW_S
    | VERIFY_NULLDUMMY
    | VERIFY_SIGPUSHONLY
    | VERIFY_MINIMALDATA
    | VERIFY_DISCOURAGE_UPGRADABLE_NOPS
    | VERIFY_CLEANSTACK;

/// Set of verification rules applied on top of the base script semantics.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VerificationFlags(u32);

impl VerificationFlags {
    pub const NONE: Self = Self(VERIFY_NONE);
    pub const P2SH: Self = Self(VERIFY_P2SH);
    pub const STRICTENC: Self = Self(VERIFY_STRICTENC);
    pub const DERSIG: Self = Self(VERIFY_DERSIG);
    pub const LOW_S: Self = Self(VERIFY_LOW_S);
    pub const NULLDUMMY: Self = Self(VERIFY_NULLDUMMY);
    pub const SIGPUSHONLY: Self = Self(VERIFY_SIGPUSHONLY);
    pub const MINIMALDATA: Self = Self(VERIFY_MINIMALDATA);
    pub const DISCOURAGE_UPGRADABLE_NOPS: Self = Self(VERIFY_DISCOURAGE_UPGRADABLE_NOPS);
    pub const CLEANSTACK: Self = Self(VERIFY_CLEANSTACK);

    /// Validates raw flag bits.
    ///
    /// Bits outside the known set are rejected, as is `CLEANSTACK` without
    /// `P2SH`.
    pub fn from_bits(bits: u32) -> Result<Self, FlagError> {
        if bits & !SUPPORTED_FLAGS != 0 {
            return Err(FlagError::UnsupportedBits(bits & !SUPPORTED_FLAGS));
        }
        Self(bits).validated()
    }

    /// Bitwise union, usable in constants.
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if every bit in `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Registry names of the flags set in `self`, in bit order.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        FLAG_NAMES
            .iter()
            .filter(move |(_, flag)| !flag.is_empty() && self.contains(*flag))
            .map(|(name, _)| *name)
    }

    fn validated(self) -> Result<Self, FlagError> {
        if self.contains(Self::CLEANSTACK) && !self.contains(Self::P2SH) {
            return Err(FlagError::CleanStackWithoutP2sh);
        }
        Ok(self)
    }
}

impl BitOr for VerificationFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for VerificationFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        for (i, name) in self.names().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(name)?;
        }
        Ok(())
    }
}

/// Parses a comma-separated list of registry names, e.g. `"P2SH,STRICTENC"`.
///
/// The empty string yields [`VerificationFlags::NONE`].
impl FromStr for VerificationFlags {
    type Err = FlagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::NONE);
        }
        resolve(s.split(','))
    }
}

/// Name table for every supported flag.
pub static FLAG_NAMES: [(&str, VerificationFlags); 10] = [
    ("NONE", VerificationFlags::NONE),
    ("P2SH", VerificationFlags::P2SH),
    ("STRICTENC", VerificationFlags::STRICTENC),
    ("DERSIG", VerificationFlags::DERSIG),
    ("LOW_S", VerificationFlags::LOW_S),
    ("NULLDUMMY", VerificationFlags::NULLDUMMY),
    ("SIGPUSHONLY", VerificationFlags::SIGPUSHONLY),
    ("MINIMALDATA", VerificationFlags::MINIMALDATA),
    ("DISCOURAGE_UPGRADABLE_NOPS", VerificationFlags::DISCOURAGE_UPGRADABLE_NOPS),
    ("CLEANSTACK", VerificationFlags::CLEANSTACK),
];

/// Looks up a single flag by its registry name.
pub fn lookup(name: &str) -> Option<VerificationFlags> {
    FLAG_NAMES
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, flag)| *flag)
}

/// Combines the named flags into one set.
///
/// An empty sequence resolves to [`VerificationFlags::NONE`]. Names are
/// case-sensitive.
pub fn resolve<I, S>(names: I) -> Result<VerificationFlags, FlagError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut flags = VerificationFlags::NONE;
    for name in names {
        let name = name.as_ref();
        let flag = lookup(name).ok_or_else(|| FlagError::UnknownFlag(name.to_string()))?;
        flags = flags | flag;
    }
    flags.validated()
}

/// Errors produced while building a [`VerificationFlags`] value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagError {
    /// A name that is not in [`FLAG_NAMES`].
    UnknownFlag(String),
    /// Bits that no flag is assigned to.
    UnsupportedBits(u32),
    /// `CLEANSTACK` requested without `P2SH`.
    CleanStackWithoutP2sh,
}

impl fmt::Display for FlagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagError::UnknownFlag(name) => write!(f, "unknown verification flag `{name}`"),
            FlagError::UnsupportedBits(bits) => {
                write!(f, "unsupported verification flag bits {bits:#x}")
            }
            FlagError::CleanStackWithoutP2sh => f.write_str("CLEANSTACK requires P2SH"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for FlagError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_name_list_is_none() {
        let names: [&str; 0] = [];
        assert_eq!(resolve(names).unwrap(), VerificationFlags::NONE);
        assert_eq!(
            "".parse::<VerificationFlags>().unwrap(),
            VerificationFlags::NONE
        );
    }

    #[test]
    fn resolves_names_to_reference_bits() {
        let flags = resolve(["P2SH", "STRICTENC"]).unwrap();
        assert_eq!(
            flags,
            VerificationFlags::P2SH | VerificationFlags::STRICTENC
        );
        assert_eq!(flags.bits(), 0b11);
        assert_eq!(lookup("CLEANSTACK").unwrap().bits(), 1 << 8);
        assert_eq!(lookup("DISCOURAGE_UPGRADABLE_NOPS").unwrap().bits(), 1 << 7);
    }

    #[test]
    fn unknown_name_is_a_configuration_error() {
        assert_eq!(
            resolve(["P2SH", "WITNESS"]).unwrap_err(),
            FlagError::UnknownFlag("WITNESS".into())
        );
        assert!("p2sh".parse::<VerificationFlags>().is_err());
    }

    #[test]
    fn cleanstack_requires_p2sh() {
        assert_eq!(
            resolve(["CLEANSTACK"]).unwrap_err(),
            FlagError::CleanStackWithoutP2sh
        );
        assert_eq!(
            VerificationFlags::from_bits(VERIFY_CLEANSTACK).unwrap_err(),
            FlagError::CleanStackWithoutP2sh
        );
        resolve(["P2SH", "CLEANSTACK"]).expect("clean stack with p2sh");
    }

    #[test]
    fn rejects_unknown_bits() {
        let invalid_bit = 1 << 31;
        assert_eq!(
            VerificationFlags::from_bits(invalid_bit | VERIFY_P2SH).unwrap_err(),
            FlagError::UnsupportedBits(invalid_bit)
        );
    }

    #[test]
    fn display_lists_names_in_bit_order() {
        let flags: VerificationFlags = "STRICTENC,P2SH,NONE".parse().unwrap();
        assert_eq!(flags.to_string(), "P2SH,STRICTENC");
        assert_eq!(VerificationFlags::NONE.to_string(), "NONE");
        let roundtrip: VerificationFlags = flags.to_string().parse().unwrap();
        assert_eq!(roundtrip, flags);
    }
}
