//! End-to-end runs of the orchestrator over files on disk.

use std::path::Path;

use mig_cli::config::MigrationConfig;
use mig_cli::pipeline::{Orchestrator, REPORT_FILE, load_catalog};
use mig_map::ConfidenceLevel;
use mig_model::{JobStatus, MatchOrigin, SchemaCatalog, Severity};

const SOURCE_CATALOG: &str = r#"{
  "data_source": "crm",
  "entities": [
    {
      "id": 1,
      "name": "customers",
      "fields": [
        { "id": 1, "entity_id": 1, "name": "cust_id", "data_type": "integer" },
        { "id": 2, "entity_id": 1, "name": "email", "data_type": "string" },
        { "id": 3, "entity_id": 1, "name": "age", "data_type": "string" },
        { "id": 4, "entity_id": 1, "name": "country", "data_type": "string" }
      ]
    },
    { "id": 2, "name": "audit trail", "fields": [] }
  ]
}"#;

const TARGET_CATALOG: &str = r#"{
  "data_source": "warehouse",
  "entities": [
    {
      "id": 10,
      "name": "customers",
      "fields": [
        { "id": 10, "entity_id": 10, "name": "id", "data_type": "integer" },
        { "id": 11, "entity_id": 10, "name": "email", "data_type": "string" },
        { "id": 12, "entity_id": 10, "name": "age", "data_type": "integer" },
        { "id": 13, "entity_id": 10, "name": "country", "data_type": "string" }
      ]
    }
  ]
}"#;

const CONFIG: &str = r#"
[input]
id_column = "cust_id"

[[mapping_rules]]
kind = "synonym"
source_pattern = "cust_id"
target_pattern = "id"
priority = 10

[[mapping_rules]]
kind = "exact_match"

[[transformations]]
source_entity = "customers"
source_field = "email"
rules = [{ kind = "custom_function", function = "lowercase" }]

[[validations]]
source_entity = "customers"
field_name = "email"
kind = "required"
is_critical = true

[[validations]]
source_entity = "customers"
field_name = "age"
kind = "range"
min = 0
max = 120

[[validations]]
source_entity = "customers"
field_name = "country"
kind = "referential"
reference = "countries"

[[references]]
name = "countries"
values = ["GB", "FR", "US"]
"#;

const CUSTOMERS_CSV: &str = "\
cust_id,email,age,country
1,ADA@EXAMPLE.COM,36,GB
2,,41,FR
3,grace@example.com,150,US
";

struct Workspace {
    _dir: tempfile::TempDir,
    source: SchemaCatalog,
    target: SchemaCatalog,
    data_dir: std::path::PathBuf,
    output_dir: std::path::PathBuf,
}

fn workspace(customers_csv: Option<&str>) -> Workspace {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.json");
    let target_path = dir.path().join("target.json");
    std::fs::write(&source_path, SOURCE_CATALOG).unwrap();
    std::fs::write(&target_path, TARGET_CATALOG).unwrap();
    let data_dir = dir.path().join("data");
    std::fs::create_dir(&data_dir).unwrap();
    if let Some(csv) = customers_csv {
        std::fs::write(data_dir.join("customers.csv"), csv).unwrap();
    }
    Workspace {
        source: load_catalog(&source_path).unwrap(),
        target: load_catalog(&target_path).unwrap(),
        output_dir: dir.path().join("out"),
        data_dir,
        _dir: dir,
    }
}

fn orchestrator(config: &str) -> Orchestrator {
    Orchestrator::new(MigrationConfig::parse(config).unwrap())
}

fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

#[test]
fn discovery_applies_rules_before_similarity() {
    let ws = workspace(None);
    let outcome = orchestrator(CONFIG).discover(&ws.source, &ws.target).unwrap();

    assert_eq!(outcome.mappings.len(), 1);
    let mapping = &outcome.mappings[0];
    assert_eq!(mapping.source_entity, "customers");
    assert_eq!(mapping.target_entity, "customers");
    assert!(mapping.confidence > 0.99);

    let fields: Vec<(&str, &str, MatchOrigin)> = mapping
        .field_mappings
        .iter()
        .map(|m| (m.source_field.as_str(), m.target_field.as_str(), m.origin))
        .collect();
    assert_eq!(
        fields,
        vec![
            ("cust_id", "id", MatchOrigin::Synonym),
            ("email", "email", MatchOrigin::ExactMatch),
            ("age", "age", MatchOrigin::ExactMatch),
            ("country", "country", MatchOrigin::ExactMatch),
        ]
    );
    assert_eq!(
        mapping
            .field_mapping_by_source_name("email")
            .unwrap()
            .transformations
            .len(),
        1
    );
    assert_eq!(mapping.validation_rules.len(), 3);
    assert!(
        mapping
            .validation_rules
            .iter()
            .all(|rule| rule.entity_mapping_id == mapping.id)
    );

    assert_eq!(outcome.unmapped.len(), 1);
    assert_eq!(outcome.unmapped[0].name, "audit trail");
    assert_eq!(outcome.levels.get(&ConfidenceLevel::High), Some(&1));
}

#[test]
fn run_transforms_validates_and_writes_outputs() {
    let ws = workspace(Some(CUSTOMERS_CSV));
    let result = orchestrator(CONFIG)
        .run(&ws.source, &ws.target, &ws.data_dir, Some(&ws.output_dir))
        .unwrap();

    assert!(result.errors.is_empty());
    assert_eq!(result.mappings.len(), 1);
    let outcome = &result.mappings[0];
    assert_eq!(outcome.records_loaded, 3);

    let transformation = outcome.transformation.as_ref().unwrap();
    assert_eq!(transformation.status(), JobStatus::Completed);
    assert_eq!(transformation.records_succeeded(), 3);

    let validation = outcome.validation.as_ref().unwrap();
    assert_eq!(validation.status(), JobStatus::Completed);
    assert_ne!(validation.id, transformation.id);
    assert_eq!(validation.records_processed(), 3);
    assert_eq!(validation.records_passed(), 1);
    assert_eq!(validation.records_failed(), 2);

    let report = outcome.validation_report.as_ref().unwrap();
    assert_eq!(report.count(Severity::Critical), 1);
    assert_eq!(report.count(Severity::Error), 1);
    assert!(result.has_failures());

    let failing: Vec<(&str, &str)> = validation
        .errors()
        .iter()
        .map(|e| (e.record_id.as_str(), e.field_name.as_str()))
        .collect();
    assert_eq!(failing, vec![("2", "email"), ("3", "age")]);

    let output = outcome.output.as_ref().unwrap();
    assert_eq!(output, &ws.output_dir.join("customers.csv"));
    insta::assert_snapshot!(read(output).trim_end(), @r"
    cust_id,id,email,age,country
    1,1,ada@example.com,36,GB
    2,2,,41,FR
    3,3,grace@example.com,150,US
    ");

    let report_path = result.report.as_ref().unwrap();
    assert_eq!(report_path, &ws.output_dir.join(REPORT_FILE));
    let json: serde_json::Value = serde_json::from_str(&read(report_path)).unwrap();
    assert_eq!(json["mappings"][0]["validation_report"]["records_failed"], 2);
    assert_eq!(json["mappings"][0]["transformation"]["status"], "COMPLETED");
    assert_eq!(json["unmapped"][0]["name"], "audit trail");
    assert_eq!(json["report"], report_path.to_str().unwrap());
}

#[test]
fn clean_dataset_has_no_failures() {
    let ws = workspace(Some("cust_id,email,age,country\n7,a@b.io,20,FR\n"));
    let result = orchestrator(CONFIG)
        .run(&ws.source, &ws.target, &ws.data_dir, None)
        .unwrap();

    assert!(!result.has_failures());
    assert!(result.report.is_none());
    assert!(result.mappings[0].output.is_none());
    assert!(!ws.output_dir.exists());
}

#[test]
fn missing_dataset_skips_the_mapping() {
    let ws = workspace(None);
    let result = orchestrator(CONFIG)
        .run(&ws.source, &ws.target, &ws.data_dir, None)
        .unwrap();

    let outcome = &result.mappings[0];
    assert!(outcome.dataset.is_none());
    assert!(outcome.transformation.is_none());
    assert!(!result.has_failures());
}

#[test]
fn malformed_transformation_fails_the_job_and_skips_validation() {
    let config = format!(
        "{CONFIG}\n\
         [[transformations]]\n\
         source_entity = \"customers\"\n\
         source_field = \"country\"\n\
         rules = [{{ kind = \"string_replace\", pattern = \"[A-Z\" }}]\n"
    );
    let ws = workspace(Some(CUSTOMERS_CSV));
    let result = orchestrator(&config)
        .run(&ws.source, &ws.target, &ws.data_dir, Some(&ws.output_dir))
        .unwrap();

    let outcome = &result.mappings[0];
    let transformation = outcome.transformation.as_ref().unwrap();
    assert_eq!(transformation.status(), JobStatus::Failed);
    assert!(transformation.failure_reason().is_some());
    assert!(outcome.validation.is_none());
    assert!(outcome.output.is_none());
    assert!(result.has_failures());
}

#[test]
fn custom_functions_can_be_registered_on_the_orchestrator() {
    let config = CONFIG.replace("function = \"lowercase\"", "function = \"mask\"");
    let ws = workspace(Some(CUSTOMERS_CSV));
    let mut orchestrator = orchestrator(&config);
    orchestrator
        .transform_functions_mut()
        .register("mask", |value: &mig_model::Value, _: &mig_model::Record| {
            Ok(value.to_text().map(|_| "***".to_string()).into())
        });

    let result = orchestrator
        .run(&ws.source, &ws.target, &ws.data_dir, Some(&ws.output_dir))
        .unwrap();

    let written = read(result.mappings[0].output.as_ref().unwrap());
    assert!(written.contains("1,1,***,36,GB"));
    assert!(written.contains("2,2,,41,FR"));
}

#[test]
fn unwritable_output_is_reported_and_the_run_continues() {
    let ws = workspace(Some(CUSTOMERS_CSV));
    std::fs::create_dir_all(ws.output_dir.join("customers.csv")).unwrap();

    let result = orchestrator(CONFIG)
        .run(&ws.source, &ws.target, &ws.data_dir, Some(&ws.output_dir))
        .unwrap();

    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].contains("customers.csv"));
    assert!(result.has_failures());
    let outcome = &result.mappings[0];
    assert!(outcome.output.is_none());
    assert_eq!(
        outcome.transformation.as_ref().unwrap().status(),
        JobStatus::Completed
    );
    assert_eq!(outcome.validation.as_ref().unwrap().records_processed(), 3);

    let report_path = result.report.as_ref().unwrap();
    let json: serde_json::Value = serde_json::from_str(&read(report_path)).unwrap();
    assert_eq!(json["errors"].as_array().map(Vec::len), Some(1));
    assert_eq!(json["mappings"][0]["validation_report"]["records_failed"], 2);
}

#[test]
fn shared_targets_keep_the_strongest_field_and_one_id_column() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = |source: &str, fields: &str| {
        let path = dir.path().join(format!("{source}.json"));
        std::fs::write(
            &path,
            format!(
                r#"{{ "data_source": "{source}", "entities": [
                    {{ "id": 1, "name": "people", "fields": [{fields}] }}
                ] }}"#
            ),
        )
        .unwrap();
        load_catalog(&path).unwrap()
    };
    let source = catalog(
        "crm",
        r#"{ "id": 1, "entity_id": 1, "name": "id", "data_type": "integer" },
           { "id": 2, "entity_id": 1, "name": "full_name", "data_type": "string" },
           { "id": 3, "entity_id": 1, "name": "name", "data_type": "string" }"#,
    );
    let target = catalog(
        "warehouse",
        r#"{ "id": 1, "entity_id": 1, "name": "id", "data_type": "integer" },
           { "id": 2, "entity_id": 1, "name": "name", "data_type": "string" }"#,
    );
    let data_dir = dir.path().join("data");
    std::fs::create_dir(&data_dir).unwrap();
    std::fs::write(
        data_dir.join("people.csv"),
        "id,full_name,name\n1,Ada Lovelace,Ada\n",
    )
    .unwrap();
    let output_dir = dir.path().join("out");

    let result = orchestrator("[input]\nid_column = \"id\"\n")
        .run(&source, &target, &data_dir, Some(&output_dir))
        .unwrap();

    let outcome = &result.mappings[0];
    let targets: Vec<(&str, &str)> = outcome
        .mapping
        .field_mappings
        .iter()
        .map(|m| (m.source_field.as_str(), m.target_field.as_str()))
        .collect();
    assert_eq!(
        targets,
        vec![("id", "id"), ("full_name", "name"), ("name", "name")]
    );
    assert_eq!(
        outcome.transformation.as_ref().unwrap().records_succeeded(),
        1
    );
    insta::assert_snapshot!(read(outcome.output.as_ref().unwrap()).trim_end(), @r"
    id,name
    1,Ada
    ");
}
