//! Standard library: conversion functions and builtin function blocks.

pub mod fbs;

use pandaura_syntax::ast::CallArg;
use smol_str::SmolStr;

use crate::error::RuntimeError;
use crate::eval::{eval_expr, EvalContext};
use crate::value::Value;

/// Evaluate a call in expression position (`TO_INT(x)`, `NOW_MS()`).
///
/// Dispatch is by upper-cased name.
pub fn call_function(
    ctx: &mut EvalContext<'_>,
    name: &SmolStr,
    args: &[CallArg],
) -> Result<Value, RuntimeError> {
    let upper = name.to_ascii_uppercase();
    match upper.as_str() {
        "TO_BOOL" => {
            let value = single_arg(ctx, name, args)?;
            Ok(Value::Bool(value.truthy()))
        }
        "TO_INT" => {
            let value = single_arg(ctx, name, args)?;
            value
                .as_i64()
                .map(Value::Int)
                .ok_or(RuntimeError::TypeMismatch)
        }
        "TO_REAL" => {
            let value = single_arg(ctx, name, args)?;
            value
                .as_f64()
                .map(Value::Real)
                .ok_or(RuntimeError::TypeMismatch)
        }
        "NOW_MS" => Ok(Value::Int(ctx.now_ms)),
        _ => Err(RuntimeError::UndefinedFunction(name.clone())),
    }
}

/// Execute a call statement against a function-block instance cell.
pub fn call_block(
    ctx: &mut EvalContext<'_>,
    name: &SmolStr,
    args: &[CallArg],
) -> Result<(), RuntimeError> {
    let instance_id = match ctx.cells.get(name) {
        Some(Value::Instance(id)) => *id,
        Some(_) => return Err(RuntimeError::UndefinedFunctionBlock(name.clone())),
        None => return Err(RuntimeError::UndefinedVariable(name.clone())),
    };
    let fb_type = ctx
        .cells
        .instance(instance_id)
        .map(|fb| fb.fb_type.clone())
        .ok_or_else(|| RuntimeError::UndefinedFunctionBlock(name.clone()))?;
    let inputs = fbs::InputRecord::from_args(ctx, args)?;
    fbs::execute_builtin(ctx, instance_id, &fb_type, &inputs)
}

fn single_arg(
    ctx: &mut EvalContext<'_>,
    name: &SmolStr,
    args: &[CallArg],
) -> Result<Value, RuntimeError> {
    match args {
        [arg] => eval_expr(ctx, &arg.value),
        _ => Err(RuntimeError::InvalidArgument(name.clone())),
    }
}
