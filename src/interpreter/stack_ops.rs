use bitcoin::opcodes::{all, Opcode};

use super::ExecutionContext;
use crate::{
    error::ScriptError,
    flags::VerificationFlags,
    num::{cast_to_bool, ScriptNum},
};

/// Stack shuffling, `OP_SIZE` and byte equality.
pub(super) fn execute(
    ctx: &mut ExecutionContext,
    op: Opcode,
    flags: VerificationFlags,
) -> Result<(), ScriptError> {
    use all::*;

    let stack = &mut ctx.stack;
    match op {
        OP_TOALTSTACK => {
            let top = stack.pop()?;
            ctx.altstack.push(top);
        }
        OP_FROMALTSTACK => {
            let top = ctx
                .altstack
                .pop()
                .map_err(|_| ScriptError::InvalidAltstackOperation)?;
            stack.push(top);
        }
        OP_2DROP => {
            stack.require(2)?;
            stack.drop_top()?;
            stack.drop_top()?;
        }
        OP_2DUP => {
            stack.require(2)?;
            for _ in 0..2 {
                let item = stack.top(1)?.clone();
                stack.push(item);
            }
        }
        OP_3DUP => {
            stack.require(3)?;
            for _ in 0..3 {
                let item = stack.top(2)?.clone();
                stack.push(item);
            }
        }
        OP_2OVER => {
            stack.require(4)?;
            for _ in 0..2 {
                let item = stack.top(3)?.clone();
                stack.push(item);
            }
        }
        OP_2ROT => {
            stack.require(6)?;
            let first = stack.remove(5)?;
            let second = stack.remove(4)?;
            stack.push(first);
            stack.push(second);
        }
        OP_2SWAP => {
            stack.require(4)?;
            stack.swap(3, 1)?;
            stack.swap(2, 0)?;
        }
        OP_IFDUP => {
            let top = stack.top(0)?;
            if cast_to_bool(top) {
                let item = top.clone();
                stack.push(item);
            }
        }
        OP_DEPTH => {
            let depth = ScriptNum::from(stack.len() as i64);
            stack.push(depth.encode());
        }
        OP_DROP => stack.drop_top()?,
        OP_DUP => {
            let item = stack.top(0)?.clone();
            stack.push(item);
        }
        OP_NIP => {
            stack.remove(1)?;
        }
        OP_OVER => {
            let item = stack.top(1)?.clone();
            stack.push(item);
        }
        OP_PICK | OP_ROLL => {
            ctx.stack.require(2)?;
            let n = ctx.peek_num(0, flags)?.to_i32();
            let stack = &mut ctx.stack;
            stack.drop_top()?;
            let depth = usize::try_from(n).map_err(|_| ScriptError::InvalidStackOperation)?;
            if depth >= stack.len() {
                return Err(ScriptError::InvalidStackOperation);
            }
            let item = if op == OP_ROLL {
                stack.remove(depth)?
            } else {
                stack.top(depth)?.clone()
            };
            stack.push(item);
        }
        OP_ROT => {
            stack.require(3)?;
            let item = stack.remove(2)?;
            stack.push(item);
        }
        OP_SWAP => {
            stack.require(2)?;
            stack.swap(0, 1)?;
        }
        OP_TUCK => {
            stack.require(2)?;
            let item = stack.top(0)?.clone();
            stack.insert(2, item)?;
        }
        OP_SIZE => {
            let size = ScriptNum::from(stack.top(0)?.len() as i64);
            stack.push(size.encode());
        }
        OP_EQUAL | OP_EQUALVERIFY => {
            stack.require(2)?;
            let equal = stack.top(0)? == stack.top(1)?;
            stack.drop_top()?;
            stack.drop_top()?;
            if op == OP_EQUALVERIFY {
                if !equal {
                    return Err(ScriptError::EqualVerify);
                }
            } else {
                stack.push_bool(equal);
            }
        }
        _ => return Err(ScriptError::BadOpcode),
    }
    Ok(())
}
