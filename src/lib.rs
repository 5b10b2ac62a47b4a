//! Data Persistence SDK - batch ingestion from staging into main datasets
//!
//! Provides unified interfaces for:
//! - Ingest modes (append-only, snapshot, unitemporal and bitemporal delta)
//! - Deduplication and auditing strategies
//! - Dialect-agnostic physical plans rendered for ANSI, DuckDB, PostgreSQL and BigQuery
//! - Atomic plan execution with per-run statistics
//! - Validation of mode, strategy and schema invariants
//! - Configuration files with environment overrides

pub mod clock;
pub mod config;
pub mod dialect;
pub mod error;
pub mod executor;
pub mod ingest_mode;
pub mod ingestor;
pub mod models;
pub mod planner;
pub mod statistics;
pub mod validation;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::IngestConfig;
pub use dialect::{Dialect, ExecutableStatement};
pub use error::{IngestError, IngestResult};
#[cfg(feature = "duckdb-backend")]
pub use executor::DuckDbConnection;
pub use executor::{Connection, Executor};
pub use ingest_mode::{
    AppendOnly, AuditingStrategy, BitemporalDelta, DeduplicationStrategy, IngestMode, Snapshot,
    UnitemporalDelta,
};
pub use ingestor::{IngestRequest, Ingestor, IngestorOptions};
pub use planner::{PhysicalPlan, Planner};
pub use statistics::{IngestorResult, StatisticName};

// Re-export models
pub use models::{
    DataType, Dataset, DatasetFilter, DatasetReference, Field, FieldRole, FilterType, Literal,
};
