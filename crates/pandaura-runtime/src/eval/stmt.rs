//! Statement execution.

use pandaura_syntax::ast::{Stmt, Target};

use super::{eval_expr, EvalContext, LOOP_GUARD_LIMIT};
use crate::error::RuntimeError;
use crate::stdlib;
use crate::value::Value;

/// Execute a statement list in order.
pub fn exec_block(ctx: &mut EvalContext<'_>, block: &[Stmt]) -> Result<(), RuntimeError> {
    for stmt in block {
        exec_stmt(ctx, stmt)?;
    }
    Ok(())
}

/// Execute a single statement.
pub fn exec_stmt(ctx: &mut EvalContext<'_>, stmt: &Stmt) -> Result<(), RuntimeError> {
    match stmt {
        Stmt::Assign { target, value } => {
            let value = eval_expr(ctx, value)?;
            match target {
                Target::Var(name) => ctx.cells.set(name, value),
                Target::Index { name, index } => {
                    let index = eval_expr(ctx, index)?
                        .as_i64()
                        .ok_or(RuntimeError::TypeMismatch)?;
                    ctx.cells.set_element(name, index, value)
                }
            }
        }
        Stmt::Call { name, args } => stdlib::call_block(ctx, name, args),
        Stmt::If {
            condition,
            then_block,
            else_if,
            else_block,
        } => {
            if eval_expr(ctx, condition)?.truthy() {
                return exec_block(ctx, then_block);
            }
            for (cond, block) in else_if {
                if eval_expr(ctx, cond)?.truthy() {
                    return exec_block(ctx, block);
                }
            }
            exec_block(ctx, else_block)
        }
        Stmt::While { condition, body } => {
            let mut iterations = 0u64;
            while eval_expr(ctx, condition)?.truthy() {
                exec_block(ctx, body)?;
                iterations += 1;
                if iterations >= LOOP_GUARD_LIMIT {
                    return Err(RuntimeError::LoopGuard("WHILE".into()));
                }
            }
            Ok(())
        }
        Stmt::For {
            control,
            start,
            end,
            step,
            body,
        } => {
            let start = eval_expr(ctx, start)?
                .as_i64()
                .ok_or(RuntimeError::TypeMismatch)?;
            let end = eval_expr(ctx, end)?
                .as_i64()
                .ok_or(RuntimeError::TypeMismatch)?;
            let step = match step {
                Some(expr) => eval_expr(ctx, expr)?
                    .as_i64()
                    .ok_or(RuntimeError::TypeMismatch)?,
                None => 1,
            };
            if step == 0 {
                return Err(RuntimeError::ForStepZero);
            }
            let mut iterations = 0u64;
            let mut current = start;
            loop {
                let done = if step > 0 { current > end } else { current < end };
                if done {
                    break;
                }
                // The body observes the control variable at its current value.
                ctx.cells.set(control, Value::Int(current))?;
                exec_block(ctx, body)?;
                current = current.wrapping_add(step);
                iterations += 1;
                if iterations >= LOOP_GUARD_LIMIT {
                    return Err(RuntimeError::LoopGuard("FOR".into()));
                }
            }
            Ok(())
        }
        Stmt::Nop => Ok(()),
    }
}
