//! EL, the embedded expression language.
//!
//! EL is a small, dynamically typed, side-effect free language used to pick
//! model, decal and tool settings from externally supplied variables:
//!
//! - Literals: numbers, strings, `true`/`false`/`null`, arrays, maps, ranges
//! - Arithmetic, bitwise, comparison and short-circuit logical operators
//! - Subscripts (`a[0]`, `m["key"]`, `m.key`, slices)
//! - Switches `{{ cond -> value, ..., default }}`, first match wins
//! - `${...}` interpolation into host strings
//!
//! # Quick start
//!
//! ```rust
//! use el::{evaluate, interpolate, parse, EvaluationContext, ParserMode, Value, VariableTable};
//!
//! let mut vars = VariableTable::new();
//! vars.set("spawnflags", 2i64);
//!
//! let node = parse("{{ spawnflags & 2 -> 'big', 'small' }}", ParserMode::Strict).unwrap();
//! let value = evaluate(&node, &EvaluationContext::new(&vars)).unwrap();
//! assert_eq!(value, Value::from("big"));
//!
//! assert_eq!(interpolate(&vars, "flags=${spawnflags}").unwrap(), "flags=2");
//! ```

pub mod error;
pub mod eval;
pub mod expr;
pub mod interpolate;
pub mod parser;
pub mod value;

// Re-exports for convenience.
pub use error::{Error, EvaluationError, Result, SyntaxError, ValueError};
pub use eval::{eval_str, evaluate, with_evaluation_context, EvaluationContext};
pub use expr::{BinaryOp, ExpressionKind, ExpressionNode, Location, LogicalOp, UnaryOp};
pub use interpolate::{interpolate, interpolate_at};
pub use parser::{parse, parse_at, ParserMode, MAX_CHAINED_OPERATORS, MAX_NESTING_DEPTH};
pub use value::{ArrayType, IntRange, MapType, Value, ValueType, MAX_RANGE_ELEMENTS};
