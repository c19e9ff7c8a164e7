//! Decal definitions.

use crate::el::{with_evaluation_context, EvaluationError, ExpressionNode, Location, Value};
use crate::var::{NullVariableStore, VariableStore};

pub mod keys {
    pub const MATERIAL: &str = "material";
}

/// The resolved decal of an entity. An empty material means "no decal".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DecalSpecification {
    pub material_name: String,
}

impl DecalSpecification {
    pub fn new(material_name: impl Into<String>) -> Self {
        DecalSpecification {
            material_name: material_name.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.material_name.is_empty()
    }
}

fn material_name(value: &Value) -> String {
    value.as_str().map(str::to_owned).unwrap_or_default()
}

fn convert_to_decal(value: &Value) -> DecalSpecification {
    match value {
        Value::Map(_) => DecalSpecification::new(material_name(&value.at_or_default(keys::MATERIAL))),
        Value::String(_) => DecalSpecification::new(material_name(value)),
        Value::Boolean(_)
        | Value::Number(_)
        | Value::Array(_)
        | Value::Range(_)
        | Value::Null
        | Value::Undefined => DecalSpecification::default(),
    }
}

/// Rule set selecting an entity's decal.
#[derive(Debug, Clone, PartialEq)]
pub struct DecalDefinition {
    expression: ExpressionNode,
}

impl Default for DecalDefinition {
    fn default() -> Self {
        DecalDefinition {
            expression: ExpressionNode::undefined(),
        }
    }
}

impl From<ExpressionNode> for DecalDefinition {
    fn from(expression: ExpressionNode) -> Self {
        DecalDefinition { expression }
    }
}

impl DecalDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(location: Location) -> Self {
        ExpressionNode::undefined().with_location(Some(location)).into()
    }

    pub fn expression(&self) -> &ExpressionNode {
        &self.expression
    }

    pub fn append(&mut self, other: DecalDefinition) {
        let current = std::mem::replace(&mut self.expression, ExpressionNode::undefined());
        self.expression = ExpressionNode::combine(current, other.expression);
    }

    pub fn decal_specification(
        &self,
        store: &dyn VariableStore,
    ) -> Result<DecalSpecification, EvaluationError> {
        with_evaluation_context(store, |ctx| Ok(convert_to_decal(&ctx.evaluate(&self.expression)?)))
    }

    pub fn default_decal_specification(&self) -> Result<DecalSpecification, EvaluationError> {
        self.decal_specification(&NullVariableStore)
    }
}
