use bitcoin::opcodes::{all, Opcode};

use super::ExecutionContext;
use crate::{error::ScriptError, flags::VerificationFlags, num::cast_to_bool};

/// Flow control and the NOP family. `OP_IF`, `OP_NOTIF`, `OP_ELSE` and
/// `OP_ENDIF` also arrive here from unexecuted branches.
pub(super) fn execute(
    ctx: &mut ExecutionContext,
    op: Opcode,
    flags: VerificationFlags,
) -> Result<(), ScriptError> {
    use all::*;

    match op {
        OP_NOP => Ok(()),
        OP_IF | OP_NOTIF => {
            let mut taken = false;
            if ctx.is_executing() {
                let condition = ctx
                    .stack
                    .pop()
                    .map_err(|_| ScriptError::UnbalancedConditional)?;
                taken = cast_to_bool(&condition);
                if op == OP_NOTIF {
                    taken = !taken;
                }
            }
            ctx.conditions.push(taken)
        }
        OP_ELSE => ctx.conditions.toggle_top(),
        OP_ENDIF => ctx.conditions.pop(),
        OP_VERIFY => {
            let value = ctx.stack.top(0)?;
            if !cast_to_bool(value) {
                return Err(ScriptError::Verify);
            }
            ctx.stack.drop_top()
        }
        OP_RETURN => Err(ScriptError::OpReturn),
        _ => {
            // OP_NOP1, OP_NOP2..=OP_NOP10
            if flags.contains(VerificationFlags::DISCOURAGE_UPGRADABLE_NOPS) {
                return Err(ScriptError::DiscourageUpgradableNops);
            }
            Ok(())
        }
    }
}
