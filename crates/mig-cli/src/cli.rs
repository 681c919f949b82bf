//! CLI argument definitions for schema-migrate.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "schema-migrate",
    version,
    about = "Discover schema correspondences and migrate records between them",
    long_about = "Match source entities and fields to a target schema, then transform\n\
                  and validate CSV datasets along the discovered mappings.\n\n\
                  Schemas are read as JSON catalogs; rules come from a TOML config."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow record values to appear in trace logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Match source entities and fields against the target schema.
    Match(MatchArgs),

    /// Match, then transform and validate the source datasets.
    Run(RunArgs),
}

#[derive(Parser)]
pub struct SchemaArgs {
    /// Source schema catalog (JSON).
    #[arg(long = "source", value_name = "CATALOG")]
    pub source: PathBuf,

    /// Target schema catalog (JSON).
    #[arg(long = "target", value_name = "CATALOG")]
    pub target: PathBuf,

    /// Migration config with rules and thresholds (TOML).
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Parser)]
pub struct MatchArgs {
    #[command(flatten)]
    pub schemas: SchemaArgs,

    /// Write the discovered mappings as JSON.
    #[arg(long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Parser)]
pub struct RunArgs {
    #[command(flatten)]
    pub schemas: SchemaArgs,

    /// Folder holding one `<source entity>.csv` per source entity.
    #[arg(value_name = "DATA_DIR")]
    pub data_dir: PathBuf,

    /// Output directory for migrated datasets (default: <DATA_DIR>/output).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Transform and validate without writing any files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
