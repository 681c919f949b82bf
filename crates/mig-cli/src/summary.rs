use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use mig_map::{ConfidenceLevel, ConfidenceThresholds, render_field_mappings};
use mig_model::{JobStatus, Severity};
use mig_cli::types::{MappingOutcome, MatchOutcome, RunResult};

/// Validation errors listed per mapping before the rest is summarised.
const MAX_LISTED_ERRORS: usize = 20;

pub fn print_match_summary(outcome: &MatchOutcome) {
    println!("Similarity: {}", outcome.similarity);
    if let Some(stats) = &outcome.stats {
        println!(
            "Confidence: mean {:.2}, min {:.2}, max {:.2}",
            stats.mean, stats.min, stats.max
        );
    }
    for (level, count) in outcome.levels.iter().rev() {
        println!("  {count} {}", level.description());
    }
    let thresholds = ConfidenceThresholds::default();
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Target"),
        header_cell("Confidence"),
        header_cell("Level"),
        header_cell("Fields"),
        header_cell("Validations"),
    ]);
    apply_table_style(&mut table, 140);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 4, CellAlignment::Right);
    align_column(&mut table, 5, CellAlignment::Right);
    for mapping in &outcome.mappings {
        table.add_row(vec![
            entity_cell(&mapping.source_entity),
            Cell::new(&mapping.target_entity),
            Cell::new(format!("{:.2}", mapping.confidence)),
            level_cell(thresholds.categorize(mapping.confidence)),
            Cell::new(mapping.field_mappings.len()),
            count_cell(mapping.validation_rules.len(), Color::Reset),
        ]);
    }
    for unmapped in &outcome.unmapped {
        let best = unmapped
            .best_score
            .map_or_else(|| "-".to_string(), |score| format!("{score:.2}"));
        table.add_row(vec![
            entity_cell(&unmapped.name),
            dim_cell("unmapped"),
            dim_cell(best),
            dim_cell("-"),
            dim_cell("-"),
            dim_cell("-"),
        ]);
    }
    println!("{table}");

    for mapping in &outcome.mappings {
        if mapping.field_mappings.is_empty() {
            continue;
        }
        println!();
        println!("{} -> {}", mapping.source_entity, mapping.target_entity);
        for line in render_field_mappings(&mapping.field_mappings).lines() {
            println!("  {line}");
        }
    }
}

pub fn print_run_summary(result: &RunResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source"),
        header_cell("Target"),
        header_cell("Records"),
        header_cell("Transformed"),
        header_cell("Rejected"),
        header_cell("Passed"),
        header_cell("Errors"),
        header_cell("Critical"),
        header_cell("Status"),
    ]);
    apply_table_style(&mut table, 165);
    for index in 2..=7 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    align_column(&mut table, 8, CellAlignment::Center);

    let mut total_records = 0usize;
    let mut total_rejected = 0u64;
    let mut total_failed = 0u64;
    for outcome in &result.mappings {
        total_records += outcome.records_loaded;
        let transformation = outcome.transformation.as_ref();
        let report = outcome.validation_report.as_ref();
        let rejected = transformation.map_or(0, |job| job.records_failed());
        total_rejected += rejected;
        total_failed += report.map_or(0, |r| r.records_failed);
        table.add_row(vec![
            entity_cell(&outcome.mapping.source_entity),
            Cell::new(&outcome.mapping.target_entity),
            Cell::new(outcome.records_loaded),
            optional_cell(transformation.map(|job| job.records_succeeded())),
            count_cell(rejected as usize, Color::Red),
            optional_cell(report.map(|r| r.records_passed)),
            count_cell(report.map_or(0, |r| r.count(Severity::Error)), Color::Red),
            count_cell(
                report.map_or(0, |r| r.count(Severity::Critical)),
                Color::Magenta,
            ),
            status_cell(outcome),
        ]);
    }
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(total_records).add_attribute(Attribute::Bold),
        dim_cell("-"),
        count_cell(total_rejected as usize, Color::Red).add_attribute(Attribute::Bold),
        dim_cell("-"),
        count_cell(total_failed as usize, Color::Red).add_attribute(Attribute::Bold),
        dim_cell("-"),
        dim_cell("-"),
    ]);
    println!("{table}");

    print_error_table(result);
    if !result.unmapped.is_empty() {
        println!();
        println!("Unmapped source entities:");
        for unmapped in &result.unmapped {
            println!("- {}", unmapped.name);
        }
    }
    if let Some(path) = &result.report {
        println!("Report: {}", path.display());
    }
    if !result.errors.is_empty() {
        eprintln!("Errors:");
        for error in &result.errors {
            eprintln!("- {error}");
        }
    }
}

fn print_error_table(result: &RunResult) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Mapping"),
        header_cell("Record"),
        header_cell("Field"),
        header_cell("Severity"),
        header_cell("Message"),
    ]);
    apply_table_style(&mut table, 165);
    align_column(&mut table, 3, CellAlignment::Center);

    let mut listed = 0usize;
    let mut hidden = 0usize;
    for outcome in &result.mappings {
        let label = format!(
            "{} -> {}",
            outcome.mapping.source_entity, outcome.mapping.target_entity
        );
        if let Some(job) = &outcome.transformation {
            if let Some(reason) = job.failure_reason() {
                table.add_row(vec![
                    Cell::new(&label),
                    dim_cell("-"),
                    dim_cell("-"),
                    Cell::new("FAILED").fg(Color::Red).add_attribute(Attribute::Bold),
                    Cell::new(reason),
                ]);
                listed += 1;
            }
            for error in job.errors() {
                table.add_row(vec![
                    Cell::new(&label),
                    Cell::new(error.record_id.as_str()),
                    Cell::new(error.field_name.as_deref().unwrap_or("-")),
                    Cell::new("REJECTED").fg(Color::Red),
                    Cell::new(&error.message),
                ]);
                listed += 1;
            }
        }
        let Some(job) = &outcome.validation else {
            continue;
        };
        if let Some(reason) = job.failure_reason() {
            table.add_row(vec![
                Cell::new(&label),
                dim_cell("-"),
                dim_cell("-"),
                Cell::new("FAILED").fg(Color::Red).add_attribute(Attribute::Bold),
                Cell::new(reason),
            ]);
            listed += 1;
        }
        let mut errors: Vec<_> = job.errors().iter().collect();
        errors.sort_by(|a, b| b.severity.cmp(&a.severity));
        hidden += errors.len().saturating_sub(MAX_LISTED_ERRORS);
        for error in errors.into_iter().take(MAX_LISTED_ERRORS) {
            table.add_row(vec![
                Cell::new(&label),
                Cell::new(error.record_id.as_str()),
                Cell::new(&error.field_name),
                severity_cell(error.severity),
                Cell::new(&error.message),
            ]);
            listed += 1;
        }
    }
    if listed == 0 {
        return;
    }
    println!();
    println!("Issues:");
    println!("{table}");
    if hidden > 0 {
        println!("... {hidden} more validation errors in the report");
    }
}

fn apply_table_style(table: &mut Table, width: u16) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::DynamicFullWidth)
        .set_width(width);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn entity_cell(name: &str) -> Cell {
    Cell::new(name)
        .fg(Color::Blue)
        .add_attribute(Attribute::Bold)
}

fn level_cell(level: Option<ConfidenceLevel>) -> Cell {
    match level {
        Some(ConfidenceLevel::High) => Cell::new("high").fg(Color::Green),
        Some(ConfidenceLevel::Medium) => Cell::new("medium").fg(Color::Yellow),
        Some(ConfidenceLevel::Low) => Cell::new("low").fg(Color::Red),
        None => dim_cell("-"),
    }
}

fn status_cell(outcome: &MappingOutcome) -> Cell {
    let transformation = outcome.transformation.as_ref().map(|job| job.status());
    let validation = outcome.validation.as_ref().map(|job| job.status());
    match (transformation, validation) {
        (None, _) => dim_cell("skipped"),
        (Some(JobStatus::Failed), _) | (_, Some(JobStatus::Failed)) => Cell::new("FAILED")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        _ if outcome.has_failures() => Cell::new("✗").fg(Color::Yellow),
        _ => Cell::new("✓")
            .fg(Color::Green)
            .add_attribute(Attribute::Bold),
    }
}

fn severity_cell(severity: Severity) -> Cell {
    match severity {
        Severity::Critical => Cell::new("CRITICAL")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
        Severity::Error => Cell::new("ERROR").fg(Color::Red),
        Severity::Warning => Cell::new("WARN").fg(Color::Yellow),
        Severity::Info => dim_cell("INFO"),
    }
}

fn optional_cell(value: Option<u64>) -> Cell {
    match value {
        Some(value) => Cell::new(value),
        None => dim_cell("-"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
