//! Timer function blocks: TON, TOF, TP.

use super::{
    elapsed_since, get_or_init_bool, read_bool_input, read_millis_input, write_bool, InputRecord,
    STATE_ACTIVE, STATE_PREV_IN, STATE_TIMING,
};
use crate::error::RuntimeError;
use crate::eval::EvalContext;
use crate::memory::InstanceId;
use crate::value::Value;

/// Timer step result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerOutput {
    /// Output coil.
    pub q: bool,
    /// Elapsed time, milliseconds, capped at PT.
    pub et: i64,
}

/// On-delay timer: Q rises after IN has been true for PT.
#[derive(Debug, Clone)]
pub struct Ton {
    et: i64,
    q: bool,
}

impl Ton {
    #[must_use]
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self { et: 0, q: false }
    }

    /// Advance by `delta` milliseconds.
    pub fn step(&mut self, input: bool, pt: i64, delta: i64) -> TimerOutput {
        let pt = pt.max(0);
        if !input {
            self.et = 0;
            self.q = false;
        } else {
            self.et = self.et.saturating_add(delta);
            self.q = self.et >= pt;
        }
        TimerOutput {
            q: self.q,
            et: self.et.min(pt),
        }
    }
}

impl Default for Ton {
    fn default() -> Self {
        Self::new()
    }
}

/// Off-delay timer: Q holds for PT after IN falls.
#[derive(Debug, Clone)]
pub struct Tof {
    et: i64,
    q: bool,
    prev_in: bool,
    timing: bool,
}

impl Tof {
    #[must_use]
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self {
            et: 0,
            q: false,
            prev_in: false,
            timing: false,
        }
    }

    /// Advance by `delta` milliseconds.
    pub fn step(&mut self, input: bool, pt: i64, delta: i64) -> TimerOutput {
        let pt = pt.max(0);
        if input {
            self.q = true;
            self.et = 0;
            self.timing = false;
        } else {
            if self.prev_in {
                self.timing = true;
                self.et = 0;
            }
            if self.timing {
                self.et = self.et.saturating_add(delta);
                if self.et >= pt {
                    self.q = false;
                    self.timing = false;
                } else {
                    self.q = true;
                }
            } else {
                self.q = false;
                self.et = 0;
            }
        }
        self.prev_in = input;
        TimerOutput {
            q: self.q,
            et: self.et.min(pt),
        }
    }
}

impl Default for Tof {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulse timer: Q true for exactly PT after a rising edge on IN.
#[derive(Debug, Clone)]
pub struct Tp {
    et: i64,
    q: bool,
    prev_in: bool,
    active: bool,
}

impl Tp {
    #[must_use]
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self {
            et: 0,
            q: false,
            prev_in: false,
            active: false,
        }
    }

    /// Advance by `delta` milliseconds.
    pub fn step(&mut self, input: bool, pt: i64, delta: i64) -> TimerOutput {
        let pt = pt.max(0);
        let rising = !self.prev_in && input;
        if rising {
            self.active = true;
            self.et = 0;
        }
        if self.active {
            self.et = self.et.saturating_add(delta);
            if self.et >= pt {
                self.active = false;
                self.et = pt;
            }
        }
        self.q = self.active;
        self.prev_in = input;
        TimerOutput {
            q: self.q,
            et: if self.active { self.et } else { 0 },
        }
    }
}

impl Default for Tp {
    fn default() -> Self {
        Self::new()
    }
}

pub(super) fn exec_ton(
    ctx: &mut EvalContext<'_>,
    instance_id: InstanceId,
    inputs: &InputRecord,
) -> Result<(), RuntimeError> {
    let input = read_bool_input(inputs, "IN", 0);
    let pt = read_millis_input(inputs, "PT", 1);
    let (et, q) = read_timer_state(ctx, instance_id);
    let delta = elapsed_since(ctx, instance_id);
    let mut ton = Ton { et, q };
    let out = ton.step(input, pt, delta);
    write_timer_state(ctx, instance_id, out);
    Ok(())
}

pub(super) fn exec_tof(
    ctx: &mut EvalContext<'_>,
    instance_id: InstanceId,
    inputs: &InputRecord,
) -> Result<(), RuntimeError> {
    let input = read_bool_input(inputs, "IN", 0);
    let pt = read_millis_input(inputs, "PT", 1);
    let (et, q) = read_timer_state(ctx, instance_id);
    let prev_in = get_or_init_bool(ctx, instance_id, STATE_PREV_IN, false);
    let timing = get_or_init_bool(ctx, instance_id, STATE_TIMING, false);
    let delta = elapsed_since(ctx, instance_id);
    let mut tof = Tof {
        et,
        q,
        prev_in,
        timing,
    };
    let out = tof.step(input, pt, delta);
    write_timer_state(ctx, instance_id, out);
    write_bool(ctx, instance_id, STATE_PREV_IN, tof.prev_in);
    write_bool(ctx, instance_id, STATE_TIMING, tof.timing);
    Ok(())
}

pub(super) fn exec_tp(
    ctx: &mut EvalContext<'_>,
    instance_id: InstanceId,
    inputs: &InputRecord,
) -> Result<(), RuntimeError> {
    let input = read_bool_input(inputs, "IN", 0);
    let pt = read_millis_input(inputs, "PT", 1);
    let (et, q) = read_timer_state(ctx, instance_id);
    let prev_in = get_or_init_bool(ctx, instance_id, STATE_PREV_IN, false);
    let active = get_or_init_bool(ctx, instance_id, STATE_ACTIVE, false);
    let delta = elapsed_since(ctx, instance_id);
    let mut tp = Tp {
        et,
        q,
        prev_in,
        active,
    };
    let out = tp.step(input, pt, delta);
    write_timer_state(ctx, instance_id, out);
    write_bool(ctx, instance_id, STATE_PREV_IN, tp.prev_in);
    write_bool(ctx, instance_id, STATE_ACTIVE, tp.active);
    Ok(())
}

fn read_timer_state(ctx: &EvalContext<'_>, instance_id: InstanceId) -> (i64, bool) {
    let et = match ctx.cells.instance_var(instance_id, "ET") {
        Some(Value::Time(value)) | Some(Value::Int(value)) => *value,
        _ => 0,
    };
    let q = matches!(ctx.cells.instance_var(instance_id, "Q"), Some(Value::Bool(true)));
    (et, q)
}

fn write_timer_state(ctx: &mut EvalContext<'_>, instance_id: InstanceId, out: TimerOutput) {
    ctx.cells
        .set_instance_var(instance_id, "Q", Value::Bool(out.q));
    ctx.cells
        .set_instance_var(instance_id, "ET", Value::Time(out.et));
}
