//! Validation of transformed records against the rules bound to an entity
//! mapping.
//!
//! Every rule is evaluated against every record. A record passes only when
//! all of its rules pass; each failing rule produces one error row whose
//! severity is `CRITICAL` for critical rules and `ERROR` otherwise.

#![deny(unsafe_code)]

pub mod checks;
pub mod context;
pub mod engine;
pub mod error;

pub use checks::CompiledCheck;
pub use context::{PredicateFn, ValidationContext};
pub use engine::{ValidationEngine, ValidationReport, ValidationRun};
pub use error::{Result, ValidateError};
