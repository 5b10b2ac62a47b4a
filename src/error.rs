//! Error taxonomy for planning, rendering and executing an ingestion
//!
//! Configuration and schema errors are raised before any statement reaches the
//! backend. Execution errors are raised only after the transaction has been
//! rolled back, so no partial write is ever visible to the caller.

use crate::dialect::Dialect;
use crate::validation::ValidationError;

/// Error type for ingestion operations
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// A mode or strategy invariant was violated
    #[error("Invalid ingest mode configuration: {0}")]
    InvalidModeConfiguration(String),

    /// Staging and main datasets cannot exchange records
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The dialect renderer has no way to express an operation
    #[error("Operation '{operation}' is not supported by the {dialect} dialect: {reason}")]
    UnsupportedDialectOperation {
        dialect: Dialect,
        operation: &'static str,
        reason: String,
    },

    /// Fail-on-duplicates found rows that were already ingested or repeated in the batch
    #[error("Duplicate records detected: {count} incoming row(s) share a digest with ingested or batch rows")]
    DuplicateRecordsDetected { count: u64 },

    /// Unexpected key or uniqueness conflict
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The backend connection failed; propagated unchanged
    #[error("Connectivity failure: {0}")]
    ConnectivityFailure(String),

    /// The backend rejected a rendered statement
    #[error("Statement execution failed: {message} (sql: {sql})")]
    Execution { message: String, sql: String },

    /// Identifier validation failure
    #[error("Invalid identifier: {0}")]
    Validation(#[from] ValidationError),

    /// Configuration file could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// Whether re-running the same request may succeed without changing configuration
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IngestError::DuplicateRecordsDetected { .. } | IngestError::ConnectivityFailure(_)
        )
    }

    /// Whether the error was raised before any statement was sent to the backend
    pub fn is_pre_execution(&self) -> bool {
        matches!(
            self,
            IngestError::InvalidModeConfiguration(_)
                | IngestError::SchemaMismatch(_)
                | IngestError::UnsupportedDialectOperation { .. }
                | IngestError::Validation(_)
                | IngestError::Config(_)
        )
    }
}

/// Result type for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(IngestError::DuplicateRecordsDetected { count: 1 }.is_retryable());
        assert!(IngestError::ConnectivityFailure("reset".to_string()).is_retryable());
        assert!(!IngestError::SchemaMismatch("x".to_string()).is_retryable());
        assert!(!IngestError::ConstraintViolation("x".to_string()).is_retryable());
    }

    #[test]
    fn test_unsupported_message_names_dialect() {
        let err = IngestError::UnsupportedDialectOperation {
            dialect: Dialect::Ansi,
            operation: "insert",
            reason: "no window functions".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("ansi"));
        assert!(msg.contains("insert"));
        assert!(err.is_pre_execution());
    }
}
