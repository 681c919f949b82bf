use serde::{Deserialize, Serialize};

use crate::{
    EntityId, EntityMappingId, FieldId, ModelError, TransformationRule, ValidationRule,
};

/// Which matching phase produced a field mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOrigin {
    ExactMatch,
    Synonym,
    Pattern,
    Custom,
    Similarity,
}

impl MatchOrigin {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::ExactMatch => "exact",
            Self::Synonym => "synonym",
            Self::Pattern => "pattern",
            Self::Custom => "custom",
            Self::Similarity => "similarity",
        }
    }
}

/// Correspondence between a source field and a target field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub entity_mapping_id: EntityMappingId,
    pub source_field_id: FieldId,
    pub source_field: String,
    pub target_field_id: FieldId,
    pub target_field: String,
    pub confidence: f64,
    pub origin: MatchOrigin,
    /// Transformation chain, kept sorted by ascending `order`.
    #[serde(default)]
    pub transformations: Vec<TransformationRule>,
    /// Set by a reviewer; verified mappings survive re-matching untouched.
    #[serde(default)]
    pub manually_verified: bool,
}

impl FieldMapping {
    /// Replace the transformation chain. Rules are ordered by `order`; equal
    /// orders keep their declaration order.
    pub fn set_transformations(&mut self, mut rules: Vec<TransformationRule>) {
        rules.sort_by_key(|rule| rule.order);
        self.transformations = rules;
    }
}

/// Correspondence between a source entity and a target entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMapping {
    pub id: EntityMappingId,
    pub source_entity_id: EntityId,
    pub source_entity: String,
    pub target_entity_id: EntityId,
    pub target_entity: String,
    pub confidence: f64,
    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,
    #[serde(default)]
    pub validation_rules: Vec<ValidationRule>,
}

impl EntityMapping {
    pub fn field_mapping(&self, source_field_id: FieldId) -> Option<&FieldMapping> {
        self.field_mappings
            .iter()
            .find(|m| m.source_field_id == source_field_id)
    }

    pub fn field_mapping_by_source_name(&self, source_field: &str) -> Option<&FieldMapping> {
        self.field_mappings
            .iter()
            .find(|m| m.source_field.eq_ignore_ascii_case(source_field))
    }

    /// Field mappings that write the target record, one per target field.
    ///
    /// When several source fields map to the same target field the highest
    /// confidence wins; ties go to the earlier mapping. Order follows
    /// `field_mappings`.
    pub fn output_mappings(&self) -> Vec<&FieldMapping> {
        let mut winners: Vec<&FieldMapping> = Vec::with_capacity(self.field_mappings.len());
        for mapping in &self.field_mappings {
            match winners
                .iter_mut()
                .find(|winner| winner.target_field == mapping.target_field)
            {
                Some(winner) if mapping.confidence > winner.confidence => *winner = mapping,
                Some(_) => {}
                None => winners.push(mapping),
            }
        }
        winners
    }

    /// Reviewer action: mark the mapping of `source_field_id` as manually verified.
    pub fn verify_field(&mut self, source_field_id: FieldId) -> Result<(), ModelError> {
        let mapping = self
            .field_mappings
            .iter_mut()
            .find(|m| m.source_field_id == source_field_id)
            .ok_or_else(|| ModelError::FieldMappingNotFound(source_field_id.to_string()))?;
        mapping.manually_verified = true;
        Ok(())
    }

    /// Attach a transformation chain to the mapping of the named source field.
    pub fn attach_transformations(
        &mut self,
        source_field: &str,
        rules: Vec<TransformationRule>,
    ) -> Result<(), ModelError> {
        let mapping = self
            .field_mappings
            .iter_mut()
            .find(|m| m.source_field.eq_ignore_ascii_case(source_field))
            .ok_or_else(|| ModelError::FieldMappingNotFound(source_field.to_string()))?;
        mapping.set_transformations(rules);
        Ok(())
    }

    /// Bind a validation rule to this mapping.
    pub fn bind_validation_rule(&mut self, mut rule: ValidationRule) {
        rule.entity_mapping_id = self.id;
        self.validation_rules.push(rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RuleId, TransformationKind, ValidationRuleKind};

    fn sample_mapping() -> EntityMapping {
        EntityMapping {
            id: EntityMappingId::new(1),
            source_entity_id: EntityId::new(1),
            source_entity: "Customers".into(),
            target_entity_id: EntityId::new(2),
            target_entity: "Client".into(),
            confidence: 0.8,
            field_mappings: vec![FieldMapping {
                entity_mapping_id: EntityMappingId::new(1),
                source_field_id: FieldId::new(10),
                source_field: "cust_id".into(),
                target_field_id: FieldId::new(20),
                target_field: "id".into(),
                confidence: 0.7,
                origin: MatchOrigin::Similarity,
                transformations: Vec::new(),
                manually_verified: false,
            }],
            validation_rules: Vec::new(),
        }
    }

    #[test]
    fn output_mappings_keep_the_strongest_per_target() {
        let mut mapping = sample_mapping();
        let mut weaker = mapping.field_mappings[0].clone();
        weaker.source_field_id = FieldId::new(11);
        weaker.source_field = "customer_id".into();
        weaker.confidence = 0.5;
        let mut stronger = weaker.clone();
        stronger.source_field_id = FieldId::new(12);
        stronger.source_field = "id".into();
        stronger.confidence = 1.0;
        let mut other = weaker.clone();
        other.source_field_id = FieldId::new(13);
        other.source_field = "full_name".into();
        other.target_field_id = FieldId::new(21);
        other.target_field = "name".into();
        mapping.field_mappings.extend([weaker, other, stronger]);

        let sources: Vec<&str> = mapping
            .output_mappings()
            .iter()
            .map(|m| m.source_field.as_str())
            .collect();
        assert_eq!(sources, vec!["id", "full_name"]);
    }

    #[test]
    fn verify_field_sets_flag() {
        let mut mapping = sample_mapping();
        mapping.verify_field(FieldId::new(10)).unwrap();
        assert!(mapping.field_mappings[0].manually_verified);
        assert!(mapping.verify_field(FieldId::new(99)).is_err());
    }

    #[test]
    fn transformations_are_sorted_by_order() {
        let mut mapping = sample_mapping();
        let split = |order, id| TransformationRule {
            id: RuleId::new(id),
            order,
            kind: TransformationKind::Split {
                separator: "-".into(),
                index: 0,
            },
        };
        mapping
            .attach_transformations("CUST_ID", vec![split(3, 1), split(1, 2), split(3, 3)])
            .unwrap();
        let ids: Vec<u64> = mapping.field_mappings[0]
            .transformations
            .iter()
            .map(|r| r.id.get())
            .collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn bound_validation_rules_carry_mapping_id() {
        let mut mapping = sample_mapping();
        mapping.bind_validation_rule(ValidationRule::new("id", ValidationRuleKind::Required));
        assert_eq!(
            mapping.validation_rules[0].entity_mapping_id,
            EntityMappingId::new(1)
        );
    }
}
