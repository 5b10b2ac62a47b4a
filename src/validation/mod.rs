//! Validation functionality
//!
//! Provides validation logic for:
//! - Input validation of identifiers (security)
//! - Ingest mode, strategy and schema invariants

pub mod ingest;
pub mod input;

pub use ingest::{check_schema_compatibility, validate_ingest};
pub use input::{ValidationError, validate_identifier};
