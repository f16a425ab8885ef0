//! Runtime value types and coercion.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::RuntimeError;
use crate::memory::InstanceId;

/// Array value with declared bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub elements: Vec<Value>,
    pub lo: i64,
    pub hi: i64,
}

impl ArrayValue {
    /// Translate a declared index into an element offset.
    pub fn offset(&self, index: i64) -> Result<usize, RuntimeError> {
        if index < self.lo || index > self.hi {
            return Err(RuntimeError::IndexOutOfBounds {
                index,
                lower: self.lo,
                upper: self.hi,
            });
        }
        Ok((index - self.lo) as usize)
    }
}

/// Tagged runtime value.
///
/// `Time` carries milliseconds; `Instance` points at a function-block
/// instance record owned by the cell table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "UPPERCASE")]
pub enum Value {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(SmolStr),
    Time(i64),
    Array(ArrayValue),
    Instance(InstanceId),
}

impl Value {
    /// Truthiness used by conditions and BOOL coercion.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(v) | Value::Time(v) => *v != 0,
            Value::Real(v) => *v != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Instance(_) => true,
        }
    }

    /// Numeric view as f64, when the value is numeric.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Int(v) | Value::Time(v) => Some(*v as f64),
            Value::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view with truncation, when the value is numeric.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Int(v) | Value::Time(v) => Some(*v),
            Value::Real(v) => Some(*v as i64),
            _ => None,
        }
    }

    /// Milliseconds view for timer inputs (TIME or numeric).
    #[must_use]
    pub fn as_millis(&self) -> Option<i64> {
        self.as_i64()
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Int(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Time(ms) => write!(f, "T#{ms}ms"),
            Value::Array(a) => write!(f, "ARRAY[{}..{}]", a.lo, a.hi),
            Value::Instance(id) => write!(f, "<instance {}>", id.0),
        }
    }
}

/// Declared type of a variable cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellType {
    Bool,
    Int,
    DInt,
    Real,
    LReal,
    Str,
    Time,
    Array { lo: i64, hi: i64, base: Box<CellType> },
    /// Function-block instance of the named type.
    Fb(SmolStr),
}

impl CellType {
    /// Default value for a freshly allocated cell.
    #[must_use]
    pub fn default_value(&self) -> Value {
        match self {
            CellType::Bool => Value::Bool(false),
            CellType::Int | CellType::DInt => Value::Int(0),
            CellType::Real | CellType::LReal => Value::Real(0.0),
            CellType::Str => Value::Str(SmolStr::default()),
            CellType::Time => Value::Time(0),
            CellType::Array { lo, hi, base } => Value::Array(ArrayValue {
                elements: vec![base.default_value(); (hi - lo + 1).max(0) as usize],
                lo: *lo,
                hi: *hi,
            }),
            // Instance ids are assigned at load; a placeholder never escapes.
            CellType::Fb(_) => Value::Bool(false),
        }
    }

    /// Coerce a value into this cell's type on assignment.
    ///
    /// BOOL via truthiness, INT via truncation, REAL via cast, STRING via
    /// display. Other types pass the value through unchanged.
    #[must_use]
    pub fn coerce(&self, value: Value) -> Value {
        match self {
            CellType::Bool => Value::Bool(value.truthy()),
            CellType::Int | CellType::DInt => {
                Value::Int(value.as_i64().unwrap_or(0))
            }
            CellType::Real | CellType::LReal => {
                Value::Real(value.as_f64().unwrap_or(0.0))
            }
            CellType::Str => match value {
                Value::Str(s) => Value::Str(s),
                other => Value::Str(other.to_string().into()),
            },
            CellType::Time => match value {
                Value::Time(ms) => Value::Time(ms),
                other => Value::Time(other.as_i64().unwrap_or(0)),
            },
            CellType::Array { .. } | CellType::Fb(_) => value,
        }
    }
}

/// Round a value to two decimal places; engine-side writes use this to keep
/// accumulated floating-point drift out of observed tag values.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Apply [`round2`] to REAL values, leaving other variants untouched.
#[must_use]
pub fn rounded(value: Value) -> Value {
    match value {
        Value::Real(v) => Value::Real(round2(v)),
        other => other,
    }
}
