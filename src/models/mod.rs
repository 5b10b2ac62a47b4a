//! Models module for the SDK
//!
//! Pure data describing what is ingested: datasets and their fields, the batch
//! filter, and the literal values filters compare against.

pub mod dataset;
pub mod digest;
pub mod field;
pub mod filter;
pub mod types;

pub use dataset::{Dataset, DatasetReference};
pub use digest::compute_digest;
pub use field::{Field, FieldRole};
pub use filter::{DatasetFilter, FilterType};
pub use types::{DATE_FORMAT, DataType, Literal, TIMESTAMP_FORMAT};
