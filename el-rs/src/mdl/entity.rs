//! Entities and the properties cached from their definitions.
//!
//! Whenever a property changes, the entity re-resolves its model, model
//! scale and decal. A definition that fails to evaluate for this entity's
//! properties is logged and leaves the cache empty; it never fails the
//! property update.

use std::sync::Arc;

use tracing::warn;

use super::decal::{DecalDefinition, DecalSpecification};
use super::model::{safe_model_scale, ModelDefinition, ModelSpecification, Scale, DEFAULT_SCALE};
use crate::el::{ExpressionNode, Value};
use crate::var::{VariableStore, VariableTable};

/// One `key "value"` pair of an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityProperty {
    pub key: String,
    pub value: String,
}

impl EntityProperty {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        EntityProperty {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Exposes an entity's properties as String variables.
#[derive(Debug, Clone, Copy)]
pub struct EntityPropertyStore<'a> {
    properties: &'a [EntityProperty],
}

impl<'a> EntityPropertyStore<'a> {
    pub fn new(properties: &'a [EntityProperty]) -> Self {
        EntityPropertyStore { properties }
    }
}

impl VariableStore for EntityPropertyStore<'_> {
    fn lookup(&self, name: &str) -> Option<Value> {
        self.properties
            .iter()
            .find(|p| p.key == name)
            .map(|p| Value::from(p.value.as_str()))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.properties.iter().map(|p| p.key.clone()).collect();
        names.sort();
        names
    }

    fn clone_store(&self) -> Box<dyn VariableStore> {
        let table: VariableTable = self
            .properties
            .iter()
            .map(|p| (p.key.clone(), p.value.clone()))
            .collect();
        Box::new(table)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointEntityDefinition {
    pub name: String,
    pub model_definition: ModelDefinition,
    pub decal_definition: DecalDefinition,
}

impl PointEntityDefinition {
    pub fn new(
        name: impl Into<String>,
        model_definition: ModelDefinition,
        decal_definition: DecalDefinition,
    ) -> Self {
        PointEntityDefinition {
            name: name.into(),
            model_definition,
            decal_definition,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CachedProperties {
    model_specification: ModelSpecification,
    model_scale: Scale,
    decal_specification: DecalSpecification,
}

impl Default for CachedProperties {
    fn default() -> Self {
        CachedProperties {
            model_specification: ModelSpecification::default(),
            model_scale: DEFAULT_SCALE,
            decal_specification: DecalSpecification::default(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Entity {
    properties: Vec<EntityProperty>,
    definition: Option<Arc<PointEntityDefinition>>,
    default_scale_expression: Option<ExpressionNode>,
    cached: CachedProperties,
}

impl Entity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn properties(&self) -> &[EntityProperty] {
        &self.properties
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.key == key)
            .map(|p| p.value.as_str())
    }

    pub fn definition(&self) -> Option<&PointEntityDefinition> {
        self.definition.as_deref()
    }

    pub fn set_definition(&mut self, definition: Option<Arc<PointEntityDefinition>>) {
        self.definition = definition;
        self.update_cached_properties();
    }

    /// Scale expression used when a model definition has no `scale` entry.
    pub fn set_default_scale_expression(&mut self, expression: Option<ExpressionNode>) {
        self.default_scale_expression = expression;
        self.update_cached_properties();
    }

    pub fn add_or_update_property(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.properties.iter_mut().find(|p| p.key == key) {
            Some(p) => p.value = value,
            None => self.properties.push(EntityProperty { key, value }),
        }
        self.update_cached_properties();
    }

    /// Returns `true` if the property existed.
    pub fn remove_property(&mut self, key: &str) -> bool {
        let before = self.properties.len();
        self.properties.retain(|p| p.key != key);
        let removed = self.properties.len() != before;
        if removed {
            self.update_cached_properties();
        }
        removed
    }

    pub fn model_specification(&self) -> &ModelSpecification {
        &self.cached.model_specification
    }

    pub fn model_scale(&self) -> Scale {
        self.cached.model_scale
    }

    pub fn decal_specification(&self) -> &DecalSpecification {
        &self.cached.decal_specification
    }

    fn update_cached_properties(&mut self) {
        let mut cached = CachedProperties::default();
        if let Some(definition) = &self.definition {
            let store = EntityPropertyStore::new(&self.properties);
            match definition.model_definition.model_specification(&store) {
                Ok(spec) => cached.model_specification = spec,
                Err(e) => warn!(
                    entity = %definition.name,
                    error = %e,
                    "could not update model specification"
                ),
            }
            cached.model_scale = safe_model_scale(
                &definition.model_definition,
                &store,
                self.default_scale_expression.as_ref(),
            );
            match definition.decal_definition.decal_specification(&store) {
                Ok(spec) => cached.decal_specification = spec,
                Err(e) => warn!(
                    entity = %definition.name,
                    error = %e,
                    "could not update decal specification"
                ),
            }
        }
        self.cached = cached;
    }
}
