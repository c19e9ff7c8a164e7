//! Error types for parsing and evaluating EL expressions.
//!
//! Lookup misses are not errors: a missing variable or map key yields
//! [`Value::Undefined`](super::value::Value::Undefined).

use thiserror::Error;

use super::expr::Location;
use super::value::ValueType;

/// A malformed expression, reported with the position of the offending input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at {location}")]
pub struct SyntaxError {
    pub location: Location,
    pub message: String,
}

impl SyntaxError {
    pub fn new(location: Location, message: impl Into<String>) -> Self {
        SyntaxError {
            location,
            message: message.into(),
        }
    }
}

/// A value-level failure, independent of where in an expression it happened.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// An impossible conversion between value types.
    #[error("cannot convert value '{value}' of type '{from}' to type '{to}'")]
    Conversion {
        value: String,
        from: ValueType,
        to: ValueType,
    },

    #[error("cannot apply operator '{operator}' to operands of type '{lhs}' and '{rhs}'")]
    InvalidOperands {
        operator: &'static str,
        lhs: ValueType,
        rhs: ValueType,
    },

    #[error("cannot apply operator '{operator}' to operand of type '{operand}'")]
    InvalidOperand {
        operator: &'static str,
        operand: ValueType,
    },

    #[error("index {index} is out of range for {container} of length {length}")]
    IndexOutOfRange {
        index: i64,
        container: ValueType,
        length: u64,
    },

    #[error("range {from}..{to} has more than {limit} elements")]
    RangeTooLarge { from: i64, to: i64, limit: u64 },

    #[error("cannot subscript value of type '{container}' with value of type '{index}'")]
    InvalidSubscript {
        container: ValueType,
        index: ValueType,
    },
}

impl ValueError {
    pub fn is_type_error(&self) -> bool {
        !matches!(
            self,
            ValueError::IndexOutOfRange { .. } | ValueError::RangeTooLarge { .. }
        )
    }

    pub fn is_index_error(&self) -> bool {
        matches!(self, ValueError::IndexOutOfRange { .. })
    }
}

/// A runtime failure, located at the deepest failing sub-expression when the
/// expression carries locations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}{}", at(.location.as_ref()))]
pub struct EvaluationError {
    pub kind: ValueError,
    pub location: Option<Location>,
}

impl EvaluationError {
    pub fn new(kind: ValueError, location: Option<Location>) -> Self {
        EvaluationError { kind, location }
    }
}

impl From<ValueError> for EvaluationError {
    fn from(kind: ValueError) -> Self {
        EvaluationError::new(kind, None)
    }
}

fn at(location: Option<&Location>) -> String {
    location.map(|l| format!(" at {l}")).unwrap_or_default()
}

/// Any failure produced by the EL engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl From<ValueError> for Error {
    fn from(kind: ValueError) -> Self {
        Error::Evaluation(kind.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
