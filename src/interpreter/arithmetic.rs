use bitcoin::opcodes::{all, Opcode};

use super::ExecutionContext;
use crate::{error::ScriptError, flags::VerificationFlags, num::ScriptNum};

/// Numeric opcodes. Operands are read as 4-byte numbers; results are pushed
/// with their minimal encoding whatever their width.
pub(super) fn execute(
    ctx: &mut ExecutionContext,
    op: Opcode,
    flags: VerificationFlags,
) -> Result<(), ScriptError> {
    use all::*;

    match op {
        OP_1ADD | OP_1SUB | OP_NEGATE | OP_ABS | OP_NOT | OP_0NOTEQUAL => {
            ctx.stack.require(1)?;
            let n = ctx.peek_num(0, flags)?;
            let result = match op {
                OP_1ADD => n.checked_add(ScriptNum::ONE)?,
                OP_1SUB => n.checked_sub(ScriptNum::ONE)?,
                OP_NEGATE => n.checked_neg()?,
                OP_ABS => n.checked_abs()?,
                OP_NOT => ScriptNum::from(n.is_zero()),
                _ => ScriptNum::from(!n.is_zero()),
            };
            ctx.stack.drop_top()?;
            ctx.stack.push(result.encode());
        }
        OP_WITHIN => {
            ctx.stack.require(3)?;
            let x = ctx.peek_num(2, flags)?;
            let min = ctx.peek_num(1, flags)?;
            let max = ctx.peek_num(0, flags)?;
            for _ in 0..3 {
                ctx.stack.drop_top()?;
            }
            ctx.stack.push_bool(min <= x && x < max);
        }
        _ => {
            ctx.stack.require(2)?;
            let a = ctx.peek_num(1, flags)?;
            let b = ctx.peek_num(0, flags)?;
            let result = match op {
                OP_ADD => a.checked_add(b)?,
                OP_SUB => a.checked_sub(b)?,
                OP_BOOLAND => ScriptNum::from(!a.is_zero() && !b.is_zero()),
                OP_BOOLOR => ScriptNum::from(!a.is_zero() || !b.is_zero()),
                OP_NUMEQUAL | OP_NUMEQUALVERIFY => ScriptNum::from(a == b),
                OP_NUMNOTEQUAL => ScriptNum::from(a != b),
                OP_LESSTHAN => ScriptNum::from(a < b),
                OP_GREATERTHAN => ScriptNum::from(a > b),
                OP_LESSTHANOREQUAL => ScriptNum::from(a <= b),
                OP_GREATERTHANOREQUAL => ScriptNum::from(a >= b),
                OP_MIN => a.min(b),
                OP_MAX => a.max(b),
                _ => return Err(ScriptError::BadOpcode),
            };
            ctx.stack.drop_top()?;
            ctx.stack.drop_top()?;

            if op == OP_NUMEQUALVERIFY {
                if result.is_zero() {
                    return Err(ScriptError::NumEqualVerify);
                }
            } else {
                ctx.stack.push(result.encode());
            }
        }
    }
    Ok(())
}
