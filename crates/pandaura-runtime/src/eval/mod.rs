//! Expression and statement evaluation.

mod expr;
mod stmt;

pub use expr::eval_expr;
pub use stmt::{exec_block, exec_stmt};

use crate::memory::Cells;

/// Iteration budget shared by WHILE and FOR loops; tripping it aborts the
/// statement with [`crate::error::RuntimeError::LoopGuard`] so a runaway loop
/// cannot stall the scheduler.
pub const LOOP_GUARD_LIMIT: u64 = 100_000;

/// Evaluation context threaded through expression and statement execution.
pub struct EvalContext<'a> {
    /// Variable table.
    pub cells: &'a mut Cells,
    /// Current scan-cycle timestamp in epoch milliseconds.
    pub now_ms: i64,
}
