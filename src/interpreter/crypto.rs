#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use bitcoin::{
    hashes::{hash160, ripemd160, sha1, sha256, sha256d, Hash},
    opcodes::{all, Opcode},
};

use super::{ExecutionContext, Step, MAX_PUBKEYS_PER_MULTISIG};
use crate::{
    encoding::{check_pubkey_encoding, check_signature_encoding},
    error::ScriptError,
    flags::VerificationFlags,
};

pub(super) fn execute(
    ctx: &mut ExecutionContext,
    op: Opcode,
    step: &Step<'_>,
) -> Result<(), ScriptError> {
    use all::*;

    match op {
        OP_RIPEMD160 | OP_SHA1 | OP_SHA256 | OP_HASH160 | OP_HASH256 => {
            let data = ctx.stack.pop()?;
            let digest = match op {
                OP_RIPEMD160 => ripemd160::Hash::hash(&data).to_byte_array().to_vec(),
                OP_SHA1 => sha1::Hash::hash(&data).to_byte_array().to_vec(),
                OP_SHA256 => sha256::Hash::hash(&data).to_byte_array().to_vec(),
                OP_HASH160 => hash160::Hash::hash(&data).to_byte_array().to_vec(),
                _ => sha256d::Hash::hash(&data).to_byte_array().to_vec(),
            };
            ctx.stack.push(digest);
            Ok(())
        }
        OP_CODESEPARATOR => {
            ctx.code_separator = step.index + 1;
            Ok(())
        }
        OP_CHECKSIG | OP_CHECKSIGVERIFY => check_sig(ctx, step, op == OP_CHECKSIGVERIFY),
        OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => {
            check_multisig(ctx, step, op == OP_CHECKMULTISIGVERIFY)
        }
        _ => Err(ScriptError::BadOpcode),
    }
}

fn check_sig(ctx: &mut ExecutionContext, step: &Step<'_>, verify: bool) -> Result<(), ScriptError> {
    ctx.stack.require(2)?;
    let signature = ctx.stack.top(1)?;
    let pubkey = ctx.stack.top(0)?;

    let script_code = step
        .script
        .script_code(ctx.code_separator, &[signature.as_slice()]);
    check_signature_encoding(signature, step.flags)?;
    check_pubkey_encoding(pubkey, step.flags)?;
    let success = step.checker.check_sig(signature, pubkey, &script_code);

    ctx.stack.drop_top()?;
    ctx.stack.drop_top()?;
    finish(ctx, success, verify, ScriptError::CheckSigVerify)
}

/// `OP_CHECKMULTISIG` reads, from the top down: the key count, the keys,
/// the signature count, the signatures and one extra dummy element.
/// Signatures must appear in the same order as their keys.
fn check_multisig(
    ctx: &mut ExecutionContext,
    step: &Step<'_>,
    verify: bool,
) -> Result<(), ScriptError> {
    let flags = step.flags;

    ctx.stack.require(1)?;
    let key_count = ctx.peek_num(0, flags)?.to_i32();
    let key_count = usize::try_from(key_count)
        .ok()
        .filter(|n| *n <= MAX_PUBKEYS_PER_MULTISIG)
        .ok_or(ScriptError::PubkeyCount)?;
    ctx.add_ops(key_count)?;

    let sig_count_depth = key_count + 1;
    ctx.stack.require(sig_count_depth + 1)?;
    let sig_count = ctx.peek_num(sig_count_depth, flags)?.to_i32();
    let sig_count = usize::try_from(sig_count)
        .ok()
        .filter(|n| *n <= key_count)
        .ok_or(ScriptError::SigCount)?;

    let first_sig_depth = sig_count_depth + 1;
    let dummy_depth = first_sig_depth + sig_count;
    ctx.stack.require(dummy_depth + 1)?;

    let success = {
        let stack = &ctx.stack;
        let signatures = (0..sig_count)
            .map(|i| stack.top(first_sig_depth + i).map(Vec::as_slice))
            .collect::<Result<Vec<_>, _>>()?;
        let script_code = step.script.script_code(ctx.code_separator, &signatures);

        let mut success = true;
        let (mut sig_index, mut key_index) = (0, 0);
        while success && sig_index < sig_count {
            let signature = signatures[sig_index];
            let pubkey = stack.top(1 + key_index)?;
            check_signature_encoding(signature, flags)?;
            check_pubkey_encoding(pubkey, flags)?;

            if step.checker.check_sig(signature, pubkey, &script_code) {
                sig_index += 1;
            }
            key_index += 1;

            // Not enough keys left to match the remaining signatures.
            if sig_count - sig_index > key_count - key_index {
                success = false;
            }
        }
        success
    };

    for _ in 0..dummy_depth {
        ctx.stack.drop_top()?;
    }
    if flags.contains(VerificationFlags::NULLDUMMY) && !ctx.stack.top(0)?.is_empty() {
        return Err(ScriptError::SigNullDummy);
    }
    ctx.stack.drop_top()?;

    finish(ctx, success, verify, ScriptError::CheckMultiSigVerify)
}

fn finish(
    ctx: &mut ExecutionContext,
    success: bool,
    verify: bool,
    verify_error: ScriptError,
) -> Result<(), ScriptError> {
    if verify {
        if !success {
            return Err(verify_error);
        }
    } else {
        ctx.stack.push_bool(success);
    }
    Ok(())
}
