use anyhow::{Context, Result};
use tracing::info_span;

use mig_cli::pipeline::{Orchestrator, load_catalog, load_config, write_json};
use mig_cli::types::{MatchOutcome, RunResult};
use mig_model::SchemaCatalog;

use crate::cli::{MatchArgs, RunArgs, SchemaArgs};

fn load_inputs(args: &SchemaArgs) -> Result<(Orchestrator, SchemaCatalog, SchemaCatalog)> {
    let config = load_config(args.config.as_deref())?;
    let source = load_catalog(&args.source)?;
    let target = load_catalog(&args.target)?;
    Ok((Orchestrator::new(config), source, target))
}

pub fn run_match(args: &MatchArgs) -> Result<MatchOutcome> {
    let span = info_span!("match", source = %args.schemas.source.display());
    let _guard = span.enter();

    let (orchestrator, source, target) = load_inputs(&args.schemas)?;
    let outcome = orchestrator.discover(&source, &target)?;
    if let Some(path) = &args.output {
        write_json(path, &outcome.mappings).context("write mappings")?;
    }
    Ok(outcome)
}

pub fn run_migration(args: &RunArgs) -> Result<RunResult> {
    let span = info_span!("run", data_dir = %args.data_dir.display());
    let _guard = span.enter();

    let (mut orchestrator, source, target) = load_inputs(&args.schemas)?;
    let output_dir = if args.dry_run {
        None
    } else {
        Some(
            args.output_dir
                .clone()
                .unwrap_or_else(|| args.data_dir.join("output")),
        )
    };
    orchestrator.run(&source, &target, &args.data_dir, output_dir.as_deref())
}
