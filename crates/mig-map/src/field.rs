//! Field-level correspondence discovery within one entity mapping.
//!
//! Matching runs in two phases. The rule phase walks source fields in
//! catalog order and tries every [`MappingRuleSet`] rule, highest priority
//! first, against the target fields nobody has claimed yet. Whatever is left
//! goes through the same best-score-over-threshold procedure the
//! [`crate::EntityMatcher`] uses, with `name + data type` descriptors.

use std::collections::BTreeSet;

use mig_model::{Entity, EntityMapping, Field, FieldId, FieldMapping, MatchOrigin};
use tracing::{debug, info, info_span};

use crate::entity::DEFAULT_MATCH_THRESHOLD;
use crate::error::{MappingError, Result};
use crate::rules::MappingRuleSet;
use crate::similarity::{TextSimilarity, TfIdfSimilarity};
use crate::utils::field_descriptor;

#[derive(Debug, Clone)]
pub struct FieldMatcher<S = TfIdfSimilarity> {
    similarity: S,
    threshold: f64,
}

impl Default for FieldMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldMatcher {
    pub fn new() -> Self {
        Self::with_similarity(TfIdfSimilarity)
    }
}

impl<S: TextSimilarity> FieldMatcher<S> {
    pub fn with_similarity(similarity: S) -> Self {
        Self {
            similarity,
            threshold: DEFAULT_MATCH_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Field mappings for `mapping`: rule-phase results first, then
    /// similarity-phase results, each in source field order.
    pub fn match_fields(
        &self,
        mapping: &EntityMapping,
        source: &Entity,
        target: &Entity,
        rules: &MappingRuleSet,
    ) -> Result<Vec<FieldMapping>> {
        check_entities(mapping, source, target)?;
        Ok(self.match_remaining(mapping, source, target, rules, &BTreeSet::new(), &BTreeSet::new()))
    }

    /// Re-run matching on `mapping`, leaving manually verified field mappings
    /// untouched. Verified source fields are skipped and their targets stay
    /// claimed. Fresh mappings keep the transformation chain of the mapping
    /// they replace when the source field is the same.
    pub fn rematch(
        &self,
        mapping: &mut EntityMapping,
        source: &Entity,
        target: &Entity,
        rules: &MappingRuleSet,
    ) -> Result<()> {
        check_entities(mapping, source, target)?;

        let (verified, previous): (Vec<FieldMapping>, Vec<FieldMapping>) =
            std::mem::take(&mut mapping.field_mappings)
                .into_iter()
                .partition(|m| m.manually_verified);
        let skipped_sources: BTreeSet<FieldId> =
            verified.iter().map(|m| m.source_field_id).collect();
        let claimed_targets: BTreeSet<FieldId> =
            verified.iter().map(|m| m.target_field_id).collect();

        let mut fresh = self.match_remaining(
            mapping,
            source,
            target,
            rules,
            &skipped_sources,
            &claimed_targets,
        );
        for field_mapping in &mut fresh {
            if let Some(old) = previous
                .iter()
                .find(|old| old.source_field_id == field_mapping.source_field_id)
            {
                field_mapping.transformations = old.transformations.clone();
            }
        }

        debug!(
            mapping = %mapping.id,
            kept = verified.len(),
            replaced = previous.len(),
            produced = fresh.len(),
            "field mappings rematched"
        );
        mapping.field_mappings = verified;
        mapping.field_mappings.extend(fresh);
        Ok(())
    }

    fn match_remaining(
        &self,
        mapping: &EntityMapping,
        source: &Entity,
        target: &Entity,
        rules: &MappingRuleSet,
        skipped_sources: &BTreeSet<FieldId>,
        claimed_targets: &BTreeSet<FieldId>,
    ) -> Vec<FieldMapping> {
        let _span = info_span!(
            "match_fields",
            mapping = %mapping.id,
            source = %source.name,
            target = %target.name
        )
        .entered();

        let mut claimed = claimed_targets.clone();
        let mut results = Vec::new();
        let mut unresolved: Vec<&Field> = Vec::new();

        for source_field in source
            .fields
            .iter()
            .filter(|f| !skipped_sources.contains(&f.id))
        {
            let hit = rules.iter().find_map(|rule| {
                let candidates = target.fields.iter().filter(|t| !claimed.contains(&t.id));
                rule.find_target(source_field, candidates)
                    .map(|target_field| (rule, target_field))
            });
            match hit {
                Some((rule, target_field)) => {
                    debug!(
                        source = %source_field.name,
                        target = %target_field.name,
                        rule = %rule.rule().id,
                        kind = rule.rule().kind.display_name(),
                        "field matched by rule"
                    );
                    claimed.insert(target_field.id);
                    results.push(field_mapping(
                        mapping,
                        source_field,
                        target_field,
                        rule.confidence(),
                        rule.origin(),
                    ));
                }
                None => unresolved.push(source_field),
            }
        }
        let by_rule = results.len();

        let open_targets: Vec<&Field> = target
            .fields
            .iter()
            .filter(|t| !claimed.contains(&t.id))
            .collect();
        let source_text: Vec<String> = unresolved.iter().map(|f| field_descriptor(f)).collect();
        let target_text: Vec<String> = open_targets.iter().map(|f| field_descriptor(f)).collect();
        let matrix = self.similarity.similarity_matrix(&source_text, &target_text);

        let mut unmapped = 0usize;
        for (source_field, best) in unresolved.iter().zip(matrix.best_matches(self.threshold)) {
            match best {
                Some((col, score)) => {
                    let target_field = open_targets[col];
                    debug!(
                        source = %source_field.name,
                        target = %target_field.name,
                        confidence = score,
                        "field matched by similarity"
                    );
                    results.push(field_mapping(
                        mapping,
                        source_field,
                        target_field,
                        score,
                        MatchOrigin::Similarity,
                    ));
                }
                None => {
                    unmapped += 1;
                    debug!(source = %source_field.name, "field left unmapped");
                }
            }
        }

        info!(
            by_rule,
            by_similarity = results.len() - by_rule,
            unmapped,
            "field matching finished"
        );
        results
    }
}

fn check_entities(mapping: &EntityMapping, source: &Entity, target: &Entity) -> Result<()> {
    if mapping.source_entity_id != source.id || mapping.target_entity_id != target.id {
        return Err(MappingError::EntityMismatch {
            mapping: mapping.id.get(),
            expected_source: mapping.source_entity_id.get(),
            expected_target: mapping.target_entity_id.get(),
            source_entity: source.id.get(),
            target_entity: target.id.get(),
        });
    }
    Ok(())
}

fn field_mapping(
    mapping: &EntityMapping,
    source: &Field,
    target: &Field,
    confidence: f64,
    origin: MatchOrigin,
) -> FieldMapping {
    FieldMapping {
        entity_mapping_id: mapping.id,
        source_field_id: source.id,
        source_field: source.name.clone(),
        target_field_id: target.id,
        target_field: target.name.clone(),
        confidence,
        origin,
        transformations: Vec::new(),
        manually_verified: false,
    }
}

/// One line per mapping: `source -> target (origin, confidence)`.
pub fn render_field_mappings(mappings: &[FieldMapping]) -> String {
    mappings
        .iter()
        .map(|m| {
            let verified = if m.manually_verified { ", verified" } else { "" };
            format!(
                "{} -> {} ({}, {:.2}{verified})",
                m.source_field,
                m.target_field,
                m.origin.display_name(),
                m.confidence
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_model::{EntityId, EntityMappingId, MappingRule, MappingRuleKind};

    fn entity(id: u64, name: &str, fields: &[(u64, &str, &str)]) -> Entity {
        Entity {
            id: EntityId::new(id),
            name: name.to_string(),
            description: None,
            data_source: String::new(),
            fields: fields
                .iter()
                .map(|&(field_id, field_name, data_type)| Field {
                    id: FieldId::new(field_id),
                    entity_id: EntityId::new(id),
                    name: field_name.to_string(),
                    data_type: data_type.to_string(),
                    description: None,
                    sample_values: Vec::new(),
                })
                .collect(),
        }
    }

    fn mapping_between(source: &Entity, target: &Entity) -> EntityMapping {
        EntityMapping {
            id: EntityMappingId::new(1),
            source_entity_id: source.id,
            source_entity: source.name.clone(),
            target_entity_id: target.id,
            target_entity: target.name.clone(),
            confidence: 0.5,
            field_mappings: Vec::new(),
            validation_rules: Vec::new(),
        }
    }

    #[test]
    fn rule_phase_precedes_similarity_phase_in_output() {
        let source = entity(1, "Customers", &[(1, "cust_id", "integer"), (2, "EMAIL", "string")]);
        let target = entity(2, "Client", &[(10, "id", "integer"), (11, "email", "string")]);
        let rules =
            MappingRuleSet::new(vec![MappingRule::new(1, MappingRuleKind::ExactMatch, 0)])
                .unwrap();
        let mapping = mapping_between(&source, &target);

        let fields = FieldMatcher::new()
            .match_fields(&mapping, &source, &target, &rules)
            .unwrap();
        insta::assert_snapshot!(render_field_mappings(&fields), @r"
        EMAIL -> email (exact, 1.00)
        cust_id -> id (similarity, 0.66)
        ");
    }

    #[test]
    fn claimed_targets_are_not_offered_again() {
        let source = entity(1, "a", &[(1, "code", "string"), (2, "CODE", "string")]);
        let target = entity(2, "b", &[(10, "code", "string")]);
        let rules =
            MappingRuleSet::new(vec![MappingRule::new(1, MappingRuleKind::ExactMatch, 0)])
                .unwrap();
        let fields = FieldMatcher::new()
            .match_fields(&mapping_between(&source, &target), &source, &target, &rules)
            .unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].source_field_id, FieldId::new(1));
    }

    #[test]
    fn wrong_entities_are_rejected() {
        let source = entity(1, "a", &[]);
        let target = entity(2, "b", &[]);
        let other = entity(3, "c", &[]);
        let err = FieldMatcher::new()
            .match_fields(
                &mapping_between(&source, &target),
                &source,
                &other,
                &MappingRuleSet::empty(),
            )
            .unwrap_err();
        assert!(matches!(err, MappingError::EntityMismatch { mapping: 1, .. }));
    }
}
