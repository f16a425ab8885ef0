//! Edge-detection function blocks: R_TRIG, F_TRIG.

use super::{get_or_init_bool, read_bool_input, write_bool, InputRecord, STATE_TRIG_M};
use crate::error::RuntimeError;
use crate::eval::EvalContext;
use crate::memory::InstanceId;

/// Rising-edge detector.
#[derive(Debug, Clone)]
pub struct RTrig {
    prev: bool,
}

impl RTrig {
    #[must_use]
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self { prev: false }
    }

    /// Q is true for exactly one step after CLK rises.
    pub fn step(&mut self, clk: bool) -> bool {
        let q = clk && !self.prev;
        self.prev = clk;
        q
    }
}

impl Default for RTrig {
    fn default() -> Self {
        Self::new()
    }
}

/// Falling-edge detector.
#[derive(Debug, Clone)]
pub struct FTrig {
    prev: bool,
}

impl FTrig {
    #[must_use]
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Self { prev: false }
    }

    /// Q is true for exactly one step after CLK falls.
    pub fn step(&mut self, clk: bool) -> bool {
        let not_clk = !clk;
        let q = not_clk && !self.prev;
        self.prev = not_clk;
        q
    }
}

impl Default for FTrig {
    fn default() -> Self {
        Self::new()
    }
}

pub(super) fn exec_r_trig(
    ctx: &mut EvalContext<'_>,
    instance_id: InstanceId,
    inputs: &InputRecord,
) -> Result<(), RuntimeError> {
    let clk = read_bool_input(inputs, "CLK", 0);
    let prev = get_or_init_bool(ctx, instance_id, STATE_TRIG_M, false);
    let q = clk && !prev;
    write_bool(ctx, instance_id, "Q", q);
    write_bool(ctx, instance_id, STATE_TRIG_M, clk);
    Ok(())
}

pub(super) fn exec_f_trig(
    ctx: &mut EvalContext<'_>,
    instance_id: InstanceId,
    inputs: &InputRecord,
) -> Result<(), RuntimeError> {
    let clk = read_bool_input(inputs, "CLK", 0);
    let prev_not_clk = get_or_init_bool(ctx, instance_id, STATE_TRIG_M, false);
    let not_clk = !clk;
    let q = not_clk && !prev_not_clk;
    write_bool(ctx, instance_id, "Q", q);
    write_bool(ctx, instance_id, STATE_TRIG_M, not_clk);
    Ok(())
}
