//! Orchestration layer for schema-migrate: config, datasets, logging and the
//! stage pipeline.

#![deny(unsafe_code)]

pub mod config;
pub mod dataset;
pub mod logging;
pub mod pipeline;
pub mod types;
