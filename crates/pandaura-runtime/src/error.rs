//! Runtime errors.

use smol_str::SmolStr;
use thiserror::Error;

/// Runtime errors for evaluation and scan execution.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Undefined variable or name.
    #[error("undefined variable '{0}'")]
    UndefinedVariable(SmolStr),

    /// Undefined function by name.
    #[error("undefined function '{0}'")]
    UndefinedFunction(SmolStr),

    /// Call target is not a function-block instance.
    #[error("undefined function block '{0}'")]
    UndefinedFunctionBlock(SmolStr),

    /// Type mismatch between values.
    #[error("type mismatch")]
    TypeMismatch,

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// Modulo by zero.
    #[error("modulo by zero")]
    ModuloByZero,

    /// Index out of bounds.
    #[error("array index {index} out of bounds [{lower}..{upper}]")]
    IndexOutOfBounds {
        /// The index used.
        index: i64,
        /// Declared lower bound.
        lower: i64,
        /// Declared upper bound.
        upper: i64,
    },

    /// Loop guard tripped after the configured iteration budget.
    #[error("possible infinite loop in '{0}'")]
    LoopGuard(SmolStr),

    /// FOR loop step cannot be zero.
    #[error("FOR loop step cannot be zero")]
    ForStepZero,

    /// Condition is not BOOL-coercible.
    #[error("condition is not BOOL")]
    ConditionNotBool,

    /// Invalid argument for a function or FB call.
    #[error("invalid argument '{0}'")]
    InvalidArgument(SmolStr),

    /// Watchdog timeout (advisory; the engine continues).
    #[error("watchdog timeout")]
    WatchdogTimeout,

    /// Engine control channel error.
    #[error("control error '{0}'")]
    ControlError(SmolStr),

    /// Invalid engine configuration.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),
}
