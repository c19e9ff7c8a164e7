//! Definitions resolved through EL: models, decals and the entities that
//! cache them.

pub mod decal;
pub mod entity;
pub mod model;

pub use decal::{DecalDefinition, DecalSpecification};
pub use entity::{Entity, EntityProperty, EntityPropertyStore, PointEntityDefinition};
pub use model::{safe_model_scale, ModelDefinition, ModelSpecification, Scale, DEFAULT_SCALE};
