//! EL expression trees.
//!
//! An [`ExpressionNode`] exclusively owns its children and is never mutated
//! after construction. Combining trees (see [`ExpressionNode::combine`])
//! builds a new root instead.
//!
//! The source [`Location`] of a node is kept for diagnostics only; it does not
//! take part in equality.

use std::fmt;
use std::sync::Arc;

use super::value::Value;

// ── Location ──────────────────────────────────────────────────────────────────

/// Position in a source text, 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: Option<Arc<str>>,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Location {
            file: None,
            line,
            column,
        }
    }

    pub fn in_file(file: impl Into<Arc<str>>, line: usize, column: usize) -> Self {
        Location {
            file: Some(file.into()),
            line,
            column,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::new(1, 1)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(file) = &self.file {
            write!(f, "{file}, ")?;
        }
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

// ── Operators ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Neg,
    Not,
    BitNot,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Neg => "-",
            UnaryOp::Not => "!",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }
}

/// Short-circuiting operators; the right operand is evaluated only when the
/// left one does not decide the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn symbol(self) -> &'static str {
        match self {
            LogicalOp::And => "&&",
            LogicalOp::Or => "||",
        }
    }
}

// ── Tree ──────────────────────────────────────────────────────────────────────

/// Payload of an [`ExpressionNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExpressionKind {
    Literal(Value),
    Variable(String),
    Unary(UnaryOp, Box<ExpressionNode>),
    Binary(BinaryOp, Box<ExpressionNode>, Box<ExpressionNode>),
    Logical(LogicalOp, Box<ExpressionNode>, Box<ExpressionNode>),
    /// `container[index]`; member access `a.b` parses to this too.
    Subscript(Box<ExpressionNode>, Box<ExpressionNode>),
    Array(Vec<ExpressionNode>),
    Map(Vec<(String, ExpressionNode)>),
    Range(Box<ExpressionNode>, Box<ExpressionNode>),
    /// `condition -> value`, only meaningful inside a switch.
    Case(Box<ExpressionNode>, Box<ExpressionNode>),
    /// Cases tried in order; see [`evaluate`](super::eval::evaluate).
    Switch(Vec<ExpressionNode>),
}

/// An immutable expression tree node.
#[derive(Debug, Clone)]
pub struct ExpressionNode {
    kind: ExpressionKind,
    location: Option<Location>,
}

impl PartialEq for ExpressionNode {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl ExpressionNode {
    pub fn new(kind: ExpressionKind, location: Option<Location>) -> Self {
        ExpressionNode { kind, location }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        ExpressionNode::new(ExpressionKind::Literal(value.into()), None)
    }

    pub fn undefined() -> Self {
        ExpressionNode::literal(Value::Undefined)
    }

    pub fn variable(name: impl Into<String>) -> Self {
        ExpressionNode::new(ExpressionKind::Variable(name.into()), None)
    }

    pub fn switch(cases: Vec<ExpressionNode>, location: Option<Location>) -> Self {
        ExpressionNode::new(ExpressionKind::Switch(cases), location)
    }

    pub fn with_location(mut self, location: Option<Location>) -> Self {
        self.location = location;
        self
    }

    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    /// A two-case switch trying `first` and falling back to `fallback`.
    ///
    /// The result keeps `first`'s location.
    pub fn combine(first: ExpressionNode, fallback: ExpressionNode) -> ExpressionNode {
        let location = first.location.clone();
        ExpressionNode::switch(vec![first, fallback], location)
    }
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ExpressionKind::Literal(v) => write!(f, "{v}"),
            ExpressionKind::Variable(name) => f.write_str(name),
            ExpressionKind::Unary(op, operand) => write!(f, "{}{operand}", op.symbol()),
            ExpressionKind::Binary(op, lhs, rhs) => write!(f, "({lhs} {} {rhs})", op.symbol()),
            ExpressionKind::Logical(op, lhs, rhs) => write!(f, "({lhs} {} {rhs})", op.symbol()),
            ExpressionKind::Subscript(container, index) => write!(f, "{container}[{index}]"),
            ExpressionKind::Array(elements) => {
                f.write_str("[")?;
                write_separated(f, elements)?;
                f.write_str("]")
            }
            ExpressionKind::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {value}", Value::from(key.as_str()))?;
                }
                f.write_str("}")
            }
            ExpressionKind::Range(from, to) => write!(f, "({from}..{to})"),
            ExpressionKind::Case(condition, value) => write!(f, "{condition} -> {value}"),
            ExpressionKind::Switch(cases) => {
                f.write_str("{{ ")?;
                write_separated(f, cases)?;
                f.write_str(" }}")
            }
        }
    }
}

fn write_separated(f: &mut fmt::Formatter<'_>, nodes: &[ExpressionNode]) -> fmt::Result {
    for (i, node) in nodes.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{node}")?;
    }
    Ok(())
}
