//! Builtin function blocks: timers and edge triggers.
//!
//! Each block has a pure `step` struct testable in isolation, plus instance
//! glue that reads and writes the persistent instance record.

mod timers;
mod triggers;

pub use timers::{Tof, Ton, Tp, TimerOutput};
pub use triggers::{FTrig, RTrig};

use indexmap::IndexMap;
use pandaura_syntax::ast::CallArg;
use smol_str::SmolStr;

use crate::error::RuntimeError;
use crate::eval::{eval_expr, EvalContext};
use crate::memory::InstanceId;
use crate::value::Value;

pub(super) const STATE_PREV_IN: &str = "__PREV_IN";
pub(super) const STATE_TIMING: &str = "__TIMING";
pub(super) const STATE_ACTIVE: &str = "__ACTIVE";
pub(super) const STATE_LAST_MS: &str = "__LAST_MS";
pub(super) const STATE_TRIG_M: &str = "__M";

/// Call inputs keyed by upper-cased argument name.
///
/// Positional arguments map onto the block's canonical input order
/// (`IN`, `PT` for timers; `CLK` for triggers).
#[derive(Debug, Default)]
pub struct InputRecord {
    named: IndexMap<SmolStr, Value>,
    positional: Vec<Value>,
}

impl InputRecord {
    /// Evaluate call arguments into an input record.
    pub fn from_args(
        ctx: &mut EvalContext<'_>,
        args: &[CallArg],
    ) -> Result<Self, RuntimeError> {
        let mut record = Self::default();
        for arg in args {
            let value = eval_expr(ctx, &arg.value)?;
            match &arg.name {
                Some(name) => {
                    record
                        .named
                        .insert(name.to_ascii_uppercase().into(), value);
                }
                None => record.positional.push(value),
            }
        }
        Ok(record)
    }

    /// Fetch an input by name, falling back to its positional slot.
    #[must_use]
    pub fn get(&self, name: &str, position: usize) -> Option<&Value> {
        self.named
            .get(name)
            .or_else(|| self.positional.get(position))
    }
}

/// Dispatch a builtin function block by its upper-cased type name.
pub fn execute_builtin(
    ctx: &mut EvalContext<'_>,
    instance_id: InstanceId,
    fb_type: &str,
    inputs: &InputRecord,
) -> Result<(), RuntimeError> {
    match fb_type.to_ascii_uppercase().as_str() {
        "TON" => timers::exec_ton(ctx, instance_id, inputs),
        "TOF" => timers::exec_tof(ctx, instance_id, inputs),
        "TP" => timers::exec_tp(ctx, instance_id, inputs),
        "R_TRIG" => triggers::exec_r_trig(ctx, instance_id, inputs),
        "F_TRIG" => triggers::exec_f_trig(ctx, instance_id, inputs),
        other => Err(RuntimeError::UndefinedFunctionBlock(other.into())),
    }
}

pub(super) fn read_bool_input(
    inputs: &InputRecord,
    name: &str,
    position: usize,
) -> bool {
    inputs.get(name, position).map(Value::truthy).unwrap_or(false)
}

pub(super) fn read_millis_input(
    inputs: &InputRecord,
    name: &str,
    position: usize,
) -> i64 {
    inputs
        .get(name, position)
        .and_then(Value::as_millis)
        .unwrap_or(0)
}

pub(super) fn get_or_init_bool(
    ctx: &mut EvalContext<'_>,
    instance_id: InstanceId,
    name: &str,
    default: bool,
) -> bool {
    match ctx.cells.instance_var(instance_id, name) {
        Some(Value::Bool(value)) => *value,
        _ => {
            ctx.cells
                .set_instance_var(instance_id, name, Value::Bool(default));
            default
        }
    }
}

pub(super) fn write_bool(
    ctx: &mut EvalContext<'_>,
    instance_id: InstanceId,
    name: &str,
    value: bool,
) {
    ctx.cells
        .set_instance_var(instance_id, name, Value::Bool(value));
}

/// Milliseconds elapsed since this instance last ran, clamped at zero.
pub(super) fn elapsed_since(ctx: &mut EvalContext<'_>, instance_id: InstanceId) -> i64 {
    let last = match ctx.cells.instance_var(instance_id, STATE_LAST_MS) {
        Some(Value::Time(value)) | Some(Value::Int(value)) => *value,
        _ => ctx.now_ms,
    };
    ctx.cells
        .set_instance_var(instance_id, STATE_LAST_MS, Value::Time(ctx.now_ms));
    (ctx.now_ms - last).max(0)
}
