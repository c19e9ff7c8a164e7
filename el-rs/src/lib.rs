pub mod cli;
pub mod compilation;
pub mod config;
pub mod el;
pub mod mdl;
pub mod var;

pub use self::el::{
    eval_str, evaluate, interpolate, parse, EvaluationContext, EvaluationError, ExpressionNode,
    Location, ParserMode, SyntaxError, Value, ValueError, ValueType,
};
pub use self::var::{LayeredVariableStore, NullVariableStore, VariableStore, VariableTable};
