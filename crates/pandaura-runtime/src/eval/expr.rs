//! Expression evaluation.

use pandaura_syntax::ast::{BinaryOp, Expr, UnaryOp};

use super::EvalContext;
use crate::error::RuntimeError;
use crate::stdlib;
use crate::value::Value;

/// Evaluate an expression to a value.
pub fn eval_expr(ctx: &mut EvalContext<'_>, expr: &Expr) -> Result<Value, RuntimeError> {
    match expr {
        Expr::Number(n) => Ok(if n.fract() == 0.0 && n.abs() < 9.0e15 {
            Value::Int(*n as i64)
        } else {
            Value::Real(*n)
        }),
        Expr::Str(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Time(ms) => Ok(Value::Time(*ms)),
        Expr::Var(name) => ctx
            .cells
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.clone())),
        Expr::Member { target, field } => {
            let value = eval_expr(ctx, target)?;
            match value {
                Value::Instance(id) => ctx
                    .cells
                    .instance_var(id, field.as_str())
                    .cloned()
                    .ok_or_else(|| RuntimeError::UndefinedVariable(field.clone())),
                _ => Err(RuntimeError::TypeMismatch),
            }
        }
        Expr::Index { name, index } => {
            let index = eval_expr(ctx, index)?
                .as_i64()
                .ok_or(RuntimeError::TypeMismatch)?;
            match ctx.cells.get(name) {
                Some(Value::Array(array)) => {
                    let offset = array.offset(index)?;
                    Ok(array.elements[offset].clone())
                }
                Some(_) => Err(RuntimeError::TypeMismatch),
                None => Err(RuntimeError::UndefinedVariable(name.clone())),
            }
        }
        Expr::Call { name, args } => stdlib::call_function(ctx, name, args),
        Expr::Unary { op, expr } => {
            let value = eval_expr(ctx, expr)?;
            eval_unary(*op, value)
        }
        Expr::Binary { op, left, right } => eval_binary(ctx, *op, left, right),
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value, RuntimeError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
        UnaryOp::Neg => match value {
            Value::Int(v) => Ok(Value::Int(v.wrapping_neg())),
            Value::Real(v) => Ok(Value::Real(-v)),
            Value::Time(v) => Ok(Value::Time(-v)),
            Value::Bool(b) => Ok(Value::Int(-i64::from(b))),
            _ => Err(RuntimeError::TypeMismatch),
        },
        UnaryOp::Plus => match value {
            Value::Int(_) | Value::Real(_) | Value::Time(_) | Value::Bool(_) => Ok(value),
            _ => Err(RuntimeError::TypeMismatch),
        },
    }
}

fn eval_binary(
    ctx: &mut EvalContext<'_>,
    op: BinaryOp,
    left: &Expr,
    right: &Expr,
) -> Result<Value, RuntimeError> {
    // AND/OR short-circuit; everything else evaluates both sides.
    match op {
        BinaryOp::And => {
            let lhs = eval_expr(ctx, left)?;
            if !lhs.truthy() {
                return Ok(Value::Bool(false));
            }
            let rhs = eval_expr(ctx, right)?;
            return Ok(Value::Bool(rhs.truthy()));
        }
        BinaryOp::Or => {
            let lhs = eval_expr(ctx, left)?;
            if lhs.truthy() {
                return Ok(Value::Bool(true));
            }
            let rhs = eval_expr(ctx, right)?;
            return Ok(Value::Bool(rhs.truthy()));
        }
        _ => {}
    }

    let lhs = eval_expr(ctx, left)?;
    let rhs = eval_expr(ctx, right)?;
    match op {
        BinaryOp::Add => arithmetic(lhs, rhs, i64::wrapping_add, |a, b| a + b),
        BinaryOp::Sub => arithmetic(lhs, rhs, i64::wrapping_sub, |a, b| a - b),
        BinaryOp::Mul => arithmetic(lhs, rhs, i64::wrapping_mul, |a, b| a * b),
        BinaryOp::Div => divide(lhs, rhs),
        BinaryOp::IntDiv => {
            let a = lhs.as_i64().ok_or(RuntimeError::TypeMismatch)?;
            let b = rhs.as_i64().ok_or(RuntimeError::TypeMismatch)?;
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Int(a.wrapping_div(b)))
        }
        BinaryOp::Mod => modulo(lhs, rhs),
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinaryOp::Neq => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinaryOp::Lt => compare(lhs, rhs, |ord| ord == std::cmp::Ordering::Less),
        BinaryOp::LtEq => compare(lhs, rhs, |ord| ord != std::cmp::Ordering::Greater),
        BinaryOp::Gt => compare(lhs, rhs, |ord| ord == std::cmp::Ordering::Greater),
        BinaryOp::GtEq => compare(lhs, rhs, |ord| ord != std::cmp::Ordering::Less),
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
    }
}

/// Integer arithmetic stays integral (two's complement wrapping); a REAL on
/// either side promotes to f64. String concatenation is deliberately not part
/// of `+`.
fn arithmetic(
    lhs: Value,
    rhs: Value,
    int_op: fn(i64, i64) -> i64,
    real_op: fn(f64, f64) -> f64,
) -> Result<Value, RuntimeError> {
    match (&lhs, &rhs) {
        (Value::Real(_), _) | (_, Value::Real(_)) => {
            let a = lhs.as_f64().ok_or(RuntimeError::TypeMismatch)?;
            let b = rhs.as_f64().ok_or(RuntimeError::TypeMismatch)?;
            Ok(Value::Real(real_op(a, b)))
        }
        _ => {
            let a = lhs.as_i64().ok_or(RuntimeError::TypeMismatch)?;
            let b = rhs.as_i64().ok_or(RuntimeError::TypeMismatch)?;
            Ok(Value::Int(int_op(a, b)))
        }
    }
}

fn divide(lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    match (&lhs, &rhs) {
        (Value::Real(_), _) | (_, Value::Real(_)) => {
            let a = lhs.as_f64().ok_or(RuntimeError::TypeMismatch)?;
            let b = rhs.as_f64().ok_or(RuntimeError::TypeMismatch)?;
            if b == 0.0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Real(a / b))
        }
        _ => {
            let a = lhs.as_i64().ok_or(RuntimeError::TypeMismatch)?;
            let b = rhs.as_i64().ok_or(RuntimeError::TypeMismatch)?;
            if b == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            Ok(Value::Int(a.wrapping_div(b)))
        }
    }
}

fn modulo(lhs: Value, rhs: Value) -> Result<Value, RuntimeError> {
    match (&lhs, &rhs) {
        (Value::Real(_), _) | (_, Value::Real(_)) => {
            let a = lhs.as_f64().ok_or(RuntimeError::TypeMismatch)?;
            let b = rhs.as_f64().ok_or(RuntimeError::TypeMismatch)?;
            if b == 0.0 {
                return Err(RuntimeError::ModuloByZero);
            }
            Ok(Value::Real(a % b))
        }
        _ => {
            let a = lhs.as_i64().ok_or(RuntimeError::TypeMismatch)?;
            let b = rhs.as_i64().ok_or(RuntimeError::TypeMismatch)?;
            if b == 0 {
                return Err(RuntimeError::ModuloByZero);
            }
            Ok(Value::Int(a.wrapping_rem(b)))
        }
    }
}

/// `=` compares by value; numerics compare across Int/Real/Time/Bool.
fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => a == b,
        (Value::Instance(a), Value::Instance(b)) => a == b,
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

fn compare(
    lhs: Value,
    rhs: Value,
    test: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, RuntimeError> {
    if let (Value::Str(a), Value::Str(b)) = (&lhs, &rhs) {
        return Ok(Value::Bool(test(a.cmp(b))));
    }
    let a = lhs.as_f64().ok_or(RuntimeError::TypeMismatch)?;
    let b = rhs.as_f64().ok_or(RuntimeError::TypeMismatch)?;
    let ord = a
        .partial_cmp(&b)
        .ok_or(RuntimeError::TypeMismatch)?;
    Ok(Value::Bool(test(ord)))
}
