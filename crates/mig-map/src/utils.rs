//! Utility functions for mapping operations.

use mig_model::{Entity, Field};

/// Normalizes text for comparison by lowercasing and replacing separators with spaces.
pub fn normalize_text(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .replace(['_', '-', '.', '/', '\\'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Case-folded field name for rule comparisons.
pub fn fold_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Descriptor used to score an entity: its name plus description.
pub fn entity_descriptor(entity: &Entity) -> String {
    match entity.description.as_deref().map(str::trim) {
        Some(description) if !description.is_empty() => {
            format!("{} {}", entity.name, description)
        }
        _ => entity.name.clone(),
    }
}

/// Descriptor used to score a field: its name plus data type.
pub fn field_descriptor(field: &Field) -> String {
    let data_type = field.data_type.trim();
    if data_type.is_empty() {
        field.name.clone()
    } else {
        format!("{} {}", field.name, data_type)
    }
}
