//! Stack machine executing one decoded script.
//!
//! [`execute`] walks the operations of a [`Script`] once, front to back.
//! Per operation the checks run in a fixed order: push size, operation
//! count, disabled opcodes, then execution (pushes and regular opcodes only
//! inside executed branches, conditionals always), then the combined stack
//! depth. Any failure aborts the script.

mod arithmetic;
mod crypto;
mod flow;
mod stack_ops;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use bitcoin::opcodes::{all, Opcode};

use crate::{
    checker::SignatureChecker,
    error::ScriptError,
    flags::VerificationFlags,
    num::{ScriptNum, MAX_SCRIPTNUM_LEN},
    script::{classify, is_conditional, is_minimal_push, OpcodeClass, Operation, Script},
    stack::{ScriptStack, MAX_SCRIPT_ELEMENT_SIZE, MAX_STACK_SIZE},
};

/// Maximum number of non-push operations per script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;
/// Maximum key count accepted by `OP_CHECKMULTISIG`.
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;

/// Nesting state of `OP_IF`/`OP_NOTIF` blocks.
///
/// Tracks how many open branches are false, so "is this branch executing"
/// is answered without scanning.
#[derive(Debug, Default, Clone)]
pub(crate) struct ConditionStack {
    branches: Vec<bool>,
    false_count: usize,
}

impl ConditionStack {
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// True when every open branch is being taken.
    pub fn all_true(&self) -> bool {
        self.false_count == 0
    }

    fn push(&mut self, taken: bool) -> Result<(), ScriptError> {
        if self.branches.len() >= MAX_STACK_SIZE {
            return Err(ScriptError::StackSize);
        }
        if !taken {
            self.false_count += 1;
        }
        self.branches.push(taken);
        Ok(())
    }

    fn toggle_top(&mut self) -> Result<(), ScriptError> {
        let top = self
            .branches
            .last_mut()
            .ok_or(ScriptError::UnbalancedConditional)?;
        if *top {
            self.false_count += 1;
        } else {
            self.false_count -= 1;
        }
        *top = !*top;
        Ok(())
    }

    fn pop(&mut self) -> Result<(), ScriptError> {
        let taken = self
            .branches
            .pop()
            .ok_or(ScriptError::UnbalancedConditional)?;
        if !taken {
            self.false_count -= 1;
        }
        Ok(())
    }
}

/// Mutable state of a single script execution.
///
/// The main stack is moved in and handed back out with
/// [`into_stack`](ExecutionContext::into_stack), so consecutive scripts
/// operate on the same data. Everything else starts fresh per script.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    pub(crate) stack: ScriptStack,
    pub(crate) altstack: ScriptStack,
    pub(crate) conditions: ConditionStack,
    pub(crate) op_count: usize,
    pub(crate) code_separator: usize,
}

impl ExecutionContext {
    pub fn new(stack: ScriptStack) -> Self {
        Self {
            stack,
            ..Self::default()
        }
    }

    pub fn stack(&self) -> &ScriptStack {
        &self.stack
    }

    pub fn altstack(&self) -> &ScriptStack {
        &self.altstack
    }

    pub fn op_count(&self) -> usize {
        self.op_count
    }

    pub fn into_stack(self) -> ScriptStack {
        self.stack
    }

    fn is_executing(&self) -> bool {
        self.conditions.all_true()
    }

    pub(crate) fn add_ops(&mut self, count: usize) -> Result<(), ScriptError> {
        self.op_count += count;
        if self.op_count > MAX_OPS_PER_SCRIPT {
            return Err(ScriptError::OpCount);
        }
        Ok(())
    }

    fn ensure_stack_limit(&self) -> Result<(), ScriptError> {
        if self.stack.len() + self.altstack.len() > MAX_STACK_SIZE {
            return Err(ScriptError::StackSize);
        }
        Ok(())
    }

    pub(crate) fn require_minimal(flags: VerificationFlags) -> bool {
        flags.contains(VerificationFlags::MINIMALDATA)
    }

    /// Reads the element `depth` below the top as a 4-byte number.
    pub(crate) fn peek_num(
        &self,
        depth: usize,
        flags: VerificationFlags,
    ) -> Result<ScriptNum, ScriptError> {
        let bytes = self.stack.top(depth)?;
        ScriptNum::decode(bytes, Self::require_minimal(flags), MAX_SCRIPTNUM_LEN)
    }
}

/// Runs `script` against `ctx`.
pub fn execute(
    script: &Script,
    flags: VerificationFlags,
    ctx: &mut ExecutionContext,
    checker: &dyn SignatureChecker,
) -> Result<(), ScriptError> {
    for (index, operation) in script.operations().iter().enumerate() {
        let executing = ctx.is_executing();

        match operation {
            Operation::PushData { opcode, data } => {
                if data.len() > MAX_SCRIPT_ELEMENT_SIZE {
                    return Err(ScriptError::PushSize);
                }
                if executing {
                    if ExecutionContext::require_minimal(flags) && !is_minimal_push(*opcode, data)
                    {
                        return Err(ScriptError::MinimalData);
                    }
                    ctx.stack.push(data.clone());
                }
            }
            Operation::Code(op) => {
                let op = *op;
                if operation.counts_toward_limit() {
                    ctx.add_ops(1)?;
                }
                let class = classify(op);
                if class == OpcodeClass::Disabled {
                    return Err(ScriptError::DisabledOpcode);
                }
                if executing || is_conditional(op) {
                    let step = Step {
                        script,
                        index,
                        flags,
                        checker,
                    };
                    dispatch(ctx, op, class, &step)?;
                }
            }
        }

        ctx.ensure_stack_limit()?;
    }

    if !ctx.conditions.is_empty() {
        return Err(ScriptError::UnbalancedConditional);
    }
    Ok(())
}

/// Everything an opcode handler may need besides the context.
pub(crate) struct Step<'a> {
    pub(crate) script: &'a Script,
    pub(crate) index: usize,
    pub(crate) flags: VerificationFlags,
    pub(crate) checker: &'a dyn SignatureChecker,
}

fn dispatch(
    ctx: &mut ExecutionContext,
    op: Opcode,
    class: OpcodeClass,
    step: &Step<'_>,
) -> Result<(), ScriptError> {
    match class {
        OpcodeClass::PushNumber => {
            let value = i64::from(op.to_u8()) - i64::from(all::OP_PUSHNUM_1.to_u8() - 1);
            ctx.stack.push(ScriptNum::from(value).encode());
            Ok(())
        }
        OpcodeClass::FlowControl | OpcodeClass::UpgradableNop => flow::execute(ctx, op, step.flags),
        OpcodeClass::Stack | OpcodeClass::Splice | OpcodeClass::Bitwise => {
            stack_ops::execute(ctx, op, step.flags)
        }
        OpcodeClass::Arithmetic => arithmetic::execute(ctx, op, step.flags),
        OpcodeClass::Crypto => crypto::execute(ctx, op, step),
        OpcodeClass::Disabled => Err(ScriptError::DisabledOpcode),
        OpcodeClass::Push | OpcodeClass::Reserved => Err(ScriptError::BadOpcode),
    }
}
