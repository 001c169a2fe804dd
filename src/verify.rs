//! Chains an unlocking script, a locking script and (for pay-to-script-hash
//! outputs) a redeem script into a single verdict.

use core::fmt;

use log::{debug, trace};

use crate::{
    checker::SignatureChecker,
    error::ScriptError,
    flags::VerificationFlags,
    interpreter::{execute, ExecutionContext},
    script::{self, Script},
    stack::ScriptStack,
};

/// Outcome of [`verify`].
///
/// `error` is [`ScriptError::Ok`] exactly when `valid` is true.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub valid: bool,
    pub error: ScriptError,
}

impl Verdict {
    pub const VALID: Self = Self {
        valid: true,
        error: ScriptError::Ok,
    };

    pub fn invalid(error: ScriptError) -> Self {
        Self {
            valid: false,
            error,
        }
    }

    pub fn into_result(self) -> Result<(), ScriptError> {
        if self.valid {
            Ok(())
        } else {
            Err(self.error)
        }
    }
}

impl From<Result<(), ScriptError>> for Verdict {
    fn from(result: Result<(), ScriptError>) -> Self {
        match result {
            Ok(()) => Self::VALID,
            Err(error) => Self::invalid(error),
        }
    }
}

/// Verifier progress, reported alongside failures in the debug log.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Stage {
    Start,
    ExecUnlocking,
    ExecLocking,
    MaybeExecRedeem,
    PostCheck,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Start => "start",
            Stage::ExecUnlocking => "unlocking script",
            Stage::ExecLocking => "locking script",
            Stage::MaybeExecRedeem => "redeem script",
            Stage::PostCheck => "post check",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Verifies that `unlocking` satisfies `locking` under `flags`.
///
/// `checker` answers every signature question; use
/// [`NullSignatureChecker`](crate::NullSignatureChecker) when there is no
/// spending transaction.
pub fn verify(
    locking: &[u8],
    unlocking: &[u8],
    flags: VerificationFlags,
    checker: &dyn SignatureChecker,
) -> Verdict {
    let mut verifier = Verifier {
        flags,
        checker,
        stage: Stage::Start,
    };
    match verifier.run(locking, unlocking) {
        Ok(()) => {
            verifier.enter(Stage::Done);
            Verdict::VALID
        }
        Err(error) => {
            debug!(
                "script verification failed in {}: {}",
                verifier.stage,
                error.name()
            );
            Verdict::invalid(error)
        }
    }
}

/// [`verify`] as a `Result`.
pub fn verify_script(
    locking: &[u8],
    unlocking: &[u8],
    flags: VerificationFlags,
    checker: &dyn SignatureChecker,
) -> Result<(), ScriptError> {
    verify(locking, unlocking, flags, checker).into_result()
}

struct Verifier<'a> {
    flags: VerificationFlags,
    checker: &'a dyn SignatureChecker,
    stage: Stage,
}

impl Verifier<'_> {
    fn enter(&mut self, stage: Stage) {
        trace!("verifier: {} -> {}", self.stage, stage);
        self.stage = stage;
    }

    fn run(&mut self, locking: &[u8], unlocking: &[u8]) -> Result<(), ScriptError> {
        let flags = self.flags;

        if flags.contains(VerificationFlags::SIGPUSHONLY) && !script::is_push_only(unlocking) {
            return Err(ScriptError::SigPushOnly);
        }

        self.enter(Stage::ExecUnlocking);
        let unlocking_script = Script::decode(unlocking)?;
        let stack = self.execute(&unlocking_script, ScriptStack::new())?;

        let pay_to_script_hash =
            flags.contains(VerificationFlags::P2SH) && script::is_p2sh(locking);
        let snapshot = pay_to_script_hash.then(|| stack.clone());

        self.enter(Stage::ExecLocking);
        let locking_script = Script::decode(locking)?;
        let stack = self.execute(&locking_script, stack)?;
        if stack.top_is_true() != Some(true) {
            return Err(ScriptError::EvalFalse);
        }

        self.enter(Stage::MaybeExecRedeem);
        let stack = match snapshot {
            Some(snapshot) => {
                trace!("verifier: pay-to-script-hash output, evaluating redeem script");
                self.execute_redeem(&unlocking_script, snapshot)?
            }
            None => stack,
        };

        self.enter(Stage::PostCheck);
        if flags.contains(VerificationFlags::CLEANSTACK) && stack.len() != 1 {
            return Err(ScriptError::CleanStack);
        }
        Ok(())
    }

    fn execute_redeem(
        &self,
        unlocking_script: &Script,
        mut snapshot: ScriptStack,
    ) -> Result<ScriptStack, ScriptError> {
        if !unlocking_script.is_push_only() {
            return Err(ScriptError::SigPushOnly);
        }
        // The locking script already succeeded, so the unlocking script
        // pushed at least the serialized redeem script.
        let serialized = snapshot.pop().map_err(|_| ScriptError::EvalFalse)?;
        let redeem_script = Script::decode(&serialized)?;
        let stack = self.execute(&redeem_script, snapshot)?;
        if stack.top_is_true() != Some(true) {
            return Err(ScriptError::EvalFalse);
        }
        Ok(stack)
    }

    fn execute(&self, script: &Script, stack: ScriptStack) -> Result<ScriptStack, ScriptError> {
        let mut ctx = ExecutionContext::new(stack);
        execute(script, self.flags, &mut ctx, self.checker)?;
        Ok(ctx.into_stack())
    }
}
