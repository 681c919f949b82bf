//! Schema catalog types produced by schema extraction.
//!
//! Entities and fields are immutable inputs to the matching core; nothing in
//! this workspace writes them back.

use serde::{Deserialize, Serialize};

use crate::{EntityId, FieldId, ModelError};

/// A named attribute of an [`Entity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub entity_id: EntityId,
    pub name: String,
    /// Free-form type tag (`"integer"`, `"varchar"`, ...). Not enforced.
    pub data_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sample_values: Vec<String>,
}

/// A structural unit (table, collection, sheet) of a source or target schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Name of the data source that owns this entity.
    #[serde(default)]
    pub data_source: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Entity {
    pub fn field(&self, id: FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| f.id == id)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn require_field(&self, name: &str) -> Result<&Field, ModelError> {
        self.field_by_name(name)
            .ok_or_else(|| ModelError::FieldNotFound {
                entity: self.name.clone(),
                field: name.to_string(),
            })
    }
}

/// All entities extracted from one data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    #[serde(default)]
    pub data_source: String,
    pub entities: Vec<Entity>,
}

impl SchemaCatalog {
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }
}
