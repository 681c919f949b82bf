//! Transformation of source records into target records.
//!
//! - **chain**: per-field transformation chains, compiled once per job
//! - **datetime**: strftime-based date reformatting
//! - **number**: `{:,.2f}`-style numeric templates
//! - **functions**: named functions for `custom_function` steps
//! - **engine**: job lifecycle, per-record failure isolation

#![deny(unsafe_code)]

pub mod chain;
pub mod datetime;
pub mod engine;
pub mod error;
pub mod functions;
pub mod number;

pub use chain::FieldChain;
pub use engine::{TransformationEngine, TransformationRun};
pub use error::{Result, TransformError};
pub use functions::{FunctionRegistry, TransformFn};
pub use number::NumberTemplate;
