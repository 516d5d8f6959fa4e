//! Checks over collected archives.

pub mod validate;

pub use validate::{validate_file, Finding, FindingKind, ValidationReport};
