use std::collections::BTreeSet;

use mig_map::{EntityMatcher, FieldMatcher, MappingRuleSet, render_field_mappings};
use mig_model::{
    Entity, EntityId, EntityMapping, EntityMappingId, Field, FieldId, FieldMapping,
    MappingRule, MappingRuleKind, MatchOrigin, TransformationKind, TransformationRule,
};

fn entity(id: u64, name: &str, fields: &[(u64, &str, &str)]) -> Entity {
    Entity {
        id: EntityId::new(id),
        name: name.to_string(),
        description: None,
        data_source: "test".to_string(),
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

fn manual_mapping(source: &Entity, target: &Entity) -> EntityMapping {
    EntityMapping {
        id: EntityMappingId::new(1),
        source_entity_id: source.id,
        source_entity: source.name.clone(),
        target_entity_id: target.id,
        target_entity: target.name.clone(),
        confidence: 1.0,
        field_mappings: Vec::new(),
        validation_rules: Vec::new(),
    }
}

fn customers() -> Entity {
    entity(
        1,
        "Customers",
        &[(1, "cust_id", "integer"), (2, "full_name", "string")],
    )
}

fn client() -> Entity {
    entity(2, "Client", &[(10, "id", "integer"), (11, "name", "string")])
}

#[test]
fn each_source_entity_maps_at_most_once_above_threshold() {
    let sources = [
        entity(1, "sales orders", &[]),
        entity(2, "order lines", &[]),
        entity(3, "warehouse", &[]),
    ];
    let targets = [
        entity(10, "orders", &[]),
        entity(11, "order lines detail", &[]),
        entity(12, "products", &[]),
    ];

    let report = EntityMatcher::new().report(&sources, &targets);

    let mapped: BTreeSet<EntityId> = report.mappings.iter().map(|m| m.source_entity_id).collect();
    assert_eq!(mapped.len(), report.mappings.len());
    assert!(report.mappings.iter().all(|m| m.confidence > 0.3));
    assert!(report.mappings.iter().all(|m| m.confidence <= 1.0));

    let pairs: Vec<(&str, &str)> = report
        .mappings
        .iter()
        .map(|m| (m.source_entity.as_str(), m.target_entity.as_str()))
        .collect();
    assert_eq!(
        pairs,
        vec![
            ("sales orders", "orders"),
            ("order lines", "order lines detail")
        ]
    );
    assert_eq!(report.unmapped.len(), 1);
    assert_eq!(report.unmapped[0].name, "warehouse");
}

#[test]
fn tied_targets_resolve_to_the_first_in_catalog_order() {
    let sources = [entity(1, "invoices", &[])];
    let targets = [
        entity(20, "orders", &[]),
        entity(21, "invoices", &[]),
        entity(22, "invoices", &[]),
    ];

    let report = EntityMatcher::new().report(&sources, &targets);

    assert_eq!(report.mappings.len(), 1);
    assert_eq!(report.mappings[0].target_entity_id, EntityId::new(21));
    assert!(report.mappings[0].confidence > 0.99);
}

#[test]
fn exact_match_commits_full_confidence_and_is_not_repeated() {
    let source = entity(1, "people", &[(1, "id", "integer"), (2, "id_number", "integer")]);
    let target = entity(2, "persons", &[(10, "ID", "integer")]);
    let rules =
        MappingRuleSet::new(vec![MappingRule::new(1, MappingRuleKind::ExactMatch, 0)]).unwrap();

    let fields = FieldMatcher::new()
        .match_fields(&manual_mapping(&source, &target), &source, &target, &rules)
        .unwrap();

    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].source_field, "id");
    assert_eq!(fields[0].target_field, "ID");
    assert_eq!(fields[0].confidence, 1.0);
    assert_eq!(fields[0].origin, MatchOrigin::ExactMatch);
}

#[test]
fn higher_priority_pattern_beats_exact_match() {
    let source = entity(1, "a", &[(1, "code", "string")]);
    let target = entity(2, "b", &[(10, "code", "string"), (11, "code_value", "string")]);
    let rules = MappingRuleSet::new(vec![
        MappingRule::new(1, MappingRuleKind::ExactMatch, 1),
        MappingRule::new(
            2,
            MappingRuleKind::Pattern {
                source_pattern: "code".into(),
                target_pattern: "code_v".into(),
            },
            10,
        ),
    ])
    .unwrap();

    let fields = FieldMatcher::new()
        .match_fields(&manual_mapping(&source, &target), &source, &target, &rules)
        .unwrap();

    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].target_field_id, FieldId::new(11));
    assert_eq!(fields[0].confidence, 0.8);
    assert_eq!(fields[0].origin, MatchOrigin::Pattern);
}

#[test]
fn customers_and_client_share_no_vocabulary() {
    let report = EntityMatcher::new().report(&[customers()], &[client()]);

    // "customers" and "client" have no token in common, so nothing clears 0.3.
    assert!(report.mappings.is_empty());
    assert_eq!(report.unmapped.len(), 1);
    assert_eq!(report.unmapped[0].name, "Customers");
    assert_eq!(report.unmapped[0].best_score, Some(0.0));
}

#[test]
fn customers_fields_match_client_fields_by_type_hints() {
    let (source, target) = (customers(), client());
    let fields = FieldMatcher::new()
        .match_fields(
            &manual_mapping(&source, &target),
            &source,
            &target,
            &MappingRuleSet::empty(),
        )
        .unwrap();

    assert!(fields.iter().all(|f| f.confidence > 0.3));
    insta::assert_snapshot!(render_field_mappings(&fields), @r"
    cust_id -> id (similarity, 0.69)
    full_name -> name (similarity, 0.69)
    ");
}

#[test]
fn rematch_keeps_verified_mappings_untouched() {
    let (source, target) = (customers(), client());
    let mut mapping = manual_mapping(&source, &target);

    let verified = FieldMapping {
        entity_mapping_id: mapping.id,
        source_field_id: FieldId::new(2),
        source_field: "full_name".into(),
        target_field_id: FieldId::new(11),
        target_field: "name".into(),
        confidence: 0.42,
        origin: MatchOrigin::Similarity,
        transformations: Vec::new(),
        manually_verified: true,
    };
    let mut stale = FieldMapping {
        source_field_id: FieldId::new(1),
        source_field: "cust_id".into(),
        target_field_id: FieldId::new(11),
        target_field: "name".into(),
        confidence: 0.31,
        manually_verified: false,
        ..verified.clone()
    };
    stale.set_transformations(vec![TransformationRule::new(
        1,
        TransformationKind::CustomFunction {
            function: "trim".into(),
        },
    )]);
    mapping.field_mappings = vec![stale, verified.clone()];

    FieldMatcher::new()
        .rematch(&mut mapping, &source, &target, &MappingRuleSet::empty())
        .unwrap();

    assert_eq!(mapping.field_mappings.len(), 2);
    assert_eq!(mapping.field_mappings[0], verified);
    let fresh = &mapping.field_mappings[1];
    assert_eq!(fresh.source_field, "cust_id");
    assert_eq!(fresh.target_field, "id");
    assert!(!fresh.manually_verified);
    assert_eq!(fresh.transformations.len(), 1);
}

#[test]
fn verify_then_rematch_round_trip() {
    let (source, target) = (customers(), client());
    let mut mapping = manual_mapping(&source, &target);
    let matcher = FieldMatcher::new();
    mapping.field_mappings = matcher
        .match_fields(&mapping, &source, &target, &MappingRuleSet::empty())
        .unwrap();
    mapping.verify_field(FieldId::new(1)).unwrap();

    let rules =
        MappingRuleSet::new(vec![MappingRule::new(1, MappingRuleKind::ExactMatch, 0)]).unwrap();
    matcher.rematch(&mut mapping, &source, &target, &rules).unwrap();

    insta::assert_snapshot!(render_field_mappings(&mapping.field_mappings), @r"
    cust_id -> id (similarity, 0.69, verified)
    full_name -> name (similarity, 0.66)
    ");
}
