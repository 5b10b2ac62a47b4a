//! Ingestion entry point
//!
//! ## Example
//!
//! ```rust,no_run
//! use data_persistence_sdk::executor::DuckDbConnection;
//! use data_persistence_sdk::ingest_mode::{IngestMode, Snapshot};
//! use data_persistence_sdk::models::{DataType, Dataset, Field};
//! use data_persistence_sdk::{IngestRequest, Ingestor, IngestorOptions};
//!
//! let schema = |name: &str| {
//!     Dataset::new(Some("demo"), name)
//!         .with_field(Field::new("id", DataType::Integer).primary_key())
//!         .with_field(Field::new("name", DataType::Varchar))
//! };
//! let request = IngestRequest::new(
//!     IngestMode::Snapshot(Snapshot::new()),
//!     schema("staging"),
//!     schema("main"),
//! );
//!
//! let conn = DuckDbConnection::open("warehouse.duckdb").unwrap();
//! let ingestor = Ingestor::new(IngestorOptions::default().create_datasets(true));
//! let result = ingestor.ingest(&request, &conn).unwrap();
//! println!("inserted {:?}", result.statistic_by_name("ROWS_INSERTED"));
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span};
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::dialect::{Dialect, ExecutableStatement, render_plan};
use crate::error::IngestResult;
use crate::executor::{Connection, Executor};
use crate::ingest_mode::IngestMode;
use crate::models::{Dataset, DatasetFilter};
use crate::planner::{PhysicalPlan, Planner};
use crate::statistics::IngestorResult;

/// Everything needed to ingest one batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRequest {
    pub mode: IngestMode,
    pub staging: Dataset,
    pub main: Dataset,
    /// ANDed filters selecting the batch on staging
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<DatasetFilter>,
}

impl IngestRequest {
    pub fn new(mode: IngestMode, staging: Dataset, main: Dataset) -> Self {
        Self {
            mode,
            staging,
            main,
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: DatasetFilter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// Optional behaviour around the core merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct IngestorOptions {
    /// Create the main dataset if it does not exist
    #[serde(default)]
    pub create_datasets: bool,
    /// Delete the consumed batch from staging after a successful merge
    #[serde(default)]
    pub cleanup_staging_data: bool,
    /// Parse every rendered statement before execution
    #[serde(default)]
    pub verify_sql: bool,
}

impl IngestorOptions {
    pub fn create_datasets(mut self, enabled: bool) -> Self {
        self.create_datasets = enabled;
        self
    }

    pub fn cleanup_staging_data(mut self, enabled: bool) -> Self {
        self.cleanup_staging_data = enabled;
        self
    }

    pub fn verify_sql(mut self, enabled: bool) -> Self {
        self.verify_sql = enabled;
        self
    }
}

/// Validates, plans and executes ingestion requests
#[derive(Clone)]
pub struct Ingestor {
    options: IngestorOptions,
    clock: Arc<dyn Clock>,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(IngestorOptions::default())
    }
}

impl Ingestor {
    pub fn new(options: IngestorOptions) -> Self {
        Self {
            options,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the source of the batch time
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn options(&self) -> &IngestorOptions {
        &self.options
    }

    /// Validate `request` and build its plan at the current batch time
    pub fn plan(&self, request: &IngestRequest) -> IngestResult<PhysicalPlan> {
        self.planner().plan(
            &request.mode,
            &request.staging,
            &request.main,
            &request.filters,
            self.clock.now(),
        )
    }

    /// Dry run: the statements `ingest` would send, in order
    pub fn explain(
        &self,
        request: &IngestRequest,
        dialect: Dialect,
    ) -> IngestResult<Vec<ExecutableStatement>> {
        let plan = self.plan(request)?;
        render_plan(&plan, dialect)
    }

    /// Ingest one batch atomically
    ///
    /// Statements are rendered for the connection's dialect.
    pub fn ingest<C: Connection + ?Sized>(
        &self,
        request: &IngestRequest,
        connection: &C,
    ) -> IngestResult<IngestorResult> {
        let run_id = Uuid::new_v4();
        let span = info_span!(
            "ingest",
            run_id = %run_id,
            mode = request.mode.name(),
            dialect = %connection.dialect(),
            main = %request.main.reference,
        );
        let _guard = span.enter();

        let plan = self.plan(request)?;
        info!(
            batch_time = %plan.batch_time,
            steps = plan.operations.len(),
            "Starting ingestion"
        );

        let result = Executor::new()
            .with_verification(self.options.verify_sql)
            .execute(&plan, connection, run_id)?;

        info!(statistics = ?result.statistics(), "Ingestion committed");
        Ok(result)
    }

    fn planner(&self) -> Planner {
        Planner::new()
            .with_dataset_creation(self.options.create_datasets)
            .with_staging_cleanup(self.options.cleanup_staging_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::IngestError;
    use crate::ingest_mode::{AppendOnly, DeduplicationStrategy};
    use crate::models::{DataType, Field, FieldRole};
    use chrono::NaiveDate;

    fn request() -> IngestRequest {
        let schema = |name: &str| {
            Dataset::new(Some("demo"), name)
                .with_field(Field::new("id", DataType::Integer))
                .with_field(Field::new("digest", DataType::Varchar).with_role(FieldRole::Digest))
        };
        IngestRequest::new(
            IngestMode::AppendOnly(
                AppendOnly::new()
                    .digest_field("digest")
                    .deduplication(DeduplicationStrategy::FilterDuplicates),
            ),
            schema("staging"),
            schema("main"),
        )
    }

    #[test]
    fn test_explain_uses_clock() {
        let at = NaiveDate::from_ymd_opt(2024, 5, 6)
            .and_then(|d| d.and_hms_opt(7, 8, 9))
            .unwrap();
        let ingestor = Ingestor::default().with_clock(FixedClock(at));
        let plan = ingestor.plan(&request()).unwrap();
        assert_eq!(plan.batch_time, at);
    }

    #[test]
    fn test_explain_on_ansi_reports_unsupported_dedup() {
        let err = Ingestor::default()
            .explain(&request(), Dialect::Ansi)
            .unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedDialectOperation { .. }));
    }

    #[test]
    fn test_request_deserializes_without_filters() {
        let json = serde_json::to_string(&request()).unwrap();
        let parsed: IngestRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, request());
    }
}
