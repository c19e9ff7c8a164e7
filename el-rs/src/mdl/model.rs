//! Model definitions.
//!
//! A [`ModelDefinition`] holds one EL expression that, evaluated against an
//! entity's properties, selects the model to display:
//!
//! ```text
//! {{
//!     spawnflags & 2 -> ":maps/b_bh100.bsp",
//!     spawnflags & 1 -> { "path": ":maps/b_bh10.bsp", "skin": 1 },
//!                       ":maps/b_bh25.bsp"
//! }}
//! ```

use std::fmt;
use std::path::PathBuf;

use tracing::warn;

use crate::el::value::parse_number;
use crate::el::{with_evaluation_context, EvaluationError, ExpressionNode, Location, Value};
use crate::var::{NullVariableStore, VariableStore};

/// Keys read from a map-valued model expression.
pub mod keys {
    pub const PATH: &str = "path";
    pub const SKIN: &str = "skin";
    pub const FRAME: &str = "frame";
    pub const SCALE: &str = "scale";
}

/// A per-axis model scale.
pub type Scale = [f64; 3];

pub const DEFAULT_SCALE: Scale = [1.0, 1.0, 1.0];

/// The resolved model of an entity. An empty path means "no model".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ModelSpecification {
    pub path: PathBuf,
    pub skin_index: usize,
    pub frame_index: usize,
}

impl ModelSpecification {
    pub fn new(path: impl Into<PathBuf>, skin_index: usize, frame_index: usize) -> Self {
        ModelSpecification {
            path: path.into(),
            skin_index,
            frame_index,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

impl fmt::Display for ModelSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "path: {}, skin: {}, frame: {}",
            self.path.display(),
            self.skin_index,
            self.frame_index
        )
    }
}

fn model_path(value: &Value) -> PathBuf {
    match value {
        Value::String(s) => PathBuf::from(s.strip_prefix(':').unwrap_or(s)),
        _ => PathBuf::new(),
    }
}

fn model_index(value: &Value) -> usize {
    value
        .number_value()
        .ok()
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map_or(0, |n| n as usize)
}

fn convert_to_model(value: &Value) -> ModelSpecification {
    match value {
        Value::Map(_) => ModelSpecification {
            path: model_path(&value.at_or_default(keys::PATH)),
            skin_index: model_index(&value.at_or_default(keys::SKIN)),
            frame_index: model_index(&value.at_or_default(keys::FRAME)),
        },
        Value::String(_) => ModelSpecification::new(model_path(value), 0, 0),
        _ => ModelSpecification::default(),
    }
}

/// Number → uniform; String of one or three numbers; Array of three Numbers.
fn convert_to_scale(value: &Value) -> Option<Scale> {
    match value {
        Value::Number(n) => Some([*n; 3]),
        Value::String(s) => {
            let parts: Option<Vec<f64>> = s.split_whitespace().map(parse_number).collect();
            match parts.as_deref() {
                Some(&[n]) => Some([n; 3]),
                Some(&[x, y, z]) => Some([x, y, z]),
                _ => None,
            }
        }
        Value::Array(items) => match items.as_slice() {
            [x, y, z] => Some([x.as_number()?, y.as_number()?, z.as_number()?]),
            _ => None,
        },
        _ => None,
    }
}

/// Rule set selecting an entity's model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    expression: ExpressionNode,
}

impl Default for ModelDefinition {
    fn default() -> Self {
        ModelDefinition {
            expression: ExpressionNode::undefined(),
        }
    }
}

impl From<ExpressionNode> for ModelDefinition {
    fn from(expression: ExpressionNode) -> Self {
        ModelDefinition { expression }
    }
}

impl ModelDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty definition that remembers where it was declared.
    pub fn at(location: Location) -> Self {
        ExpressionNode::undefined().with_location(Some(location)).into()
    }

    pub fn expression(&self) -> &ExpressionNode {
        &self.expression
    }

    /// Try this definition first and fall back to `other`.
    pub fn append(&mut self, other: ModelDefinition) {
        let current = std::mem::replace(&mut self.expression, ExpressionNode::undefined());
        self.expression = ExpressionNode::combine(current, other.expression);
    }

    pub fn model_specification(
        &self,
        store: &dyn VariableStore,
    ) -> Result<ModelSpecification, EvaluationError> {
        with_evaluation_context(store, |ctx| Ok(convert_to_model(&ctx.evaluate(&self.expression)?)))
    }

    /// The model selected when no entity properties are known.
    pub fn default_model_specification(&self) -> Result<ModelSpecification, EvaluationError> {
        self.model_specification(&NullVariableStore)
    }

    /// Scale configured by the model expression's `scale` entry, else by
    /// `default_scale_expression`, else [`DEFAULT_SCALE`].
    pub fn scale(
        &self,
        store: &dyn VariableStore,
        default_scale_expression: Option<&ExpressionNode>,
    ) -> Result<Scale, EvaluationError> {
        with_evaluation_context(store, |ctx| {
            let value = ctx.evaluate(&self.expression)?;
            if let Some(scale) = convert_to_scale(&value.at_or_default(keys::SCALE)) {
                return Ok(scale);
            }
            if let Some(expression) = default_scale_expression {
                if let Some(scale) = convert_to_scale(&ctx.evaluate(expression)?) {
                    return Ok(scale);
                }
            }
            Ok(DEFAULT_SCALE)
        })
    }
}

/// [`ModelDefinition::scale`], falling back to [`DEFAULT_SCALE`] on error.
pub fn safe_model_scale(
    definition: &ModelDefinition,
    store: &dyn VariableStore,
    default_scale_expression: Option<&ExpressionNode>,
) -> Scale {
    definition
        .scale(store, default_scale_expression)
        .unwrap_or_else(|e| {
            warn!(error = %e, "could not evaluate model scale, using default");
            DEFAULT_SCALE
        })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
