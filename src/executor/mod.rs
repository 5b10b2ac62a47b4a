//! Plan execution
//!
//! The executor renders a whole plan for the connection's dialect before it
//! touches the backend, then runs every statement inside one transaction.
//! Any failure rolls the transaction back before the error is returned, so a
//! failed ingestion leaves no trace in main or staging.
//!
//! Backends implement the synchronous [`Connection`] trait. DuckDB ships
//! behind the `duckdb-backend` feature.

#[cfg(feature = "duckdb-backend")]
pub mod duckdb;

#[cfg(feature = "duckdb-backend")]
pub use self::duckdb::DuckDbConnection;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dialect::{Dialect, ExecutableStatement, StatementKind, render, verify_statement};
use crate::error::{IngestError, IngestResult};
use crate::ingest_mode::DeduplicationStrategy;
use crate::planner::{OperationKind, PhysicalPlan};
use crate::statistics::{IngestorResult, StatisticsCollector, StepOutcome};

/// Rows returned by an ad-hoc query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    /// One JSON object per row, keyed by column name
    pub rows: Vec<serde_json::Value>,
    pub execution_time_ms: u64,
}

/// A transactional SQL backend
///
/// Implementations map their own failures onto `ConnectivityFailure`,
/// `ConstraintViolation` or `Execution`.
pub trait Connection {
    /// Dialect the backend understands
    fn dialect(&self) -> Dialect;

    fn begin(&self) -> IngestResult<()>;

    fn commit(&self) -> IngestResult<()>;

    fn rollback(&self) -> IngestResult<()>;

    /// Run a mutation and return the number of affected rows
    fn execute(&self, statement: &ExecutableStatement) -> IngestResult<u64>;

    /// Run a query returning a single count
    fn query_count(&self, statement: &ExecutableStatement) -> IngestResult<u64>;
}

/// Open transaction; rolls back when dropped without a commit
pub struct Transaction<'c, C: Connection + ?Sized> {
    connection: &'c C,
    finished: bool,
}

impl<'c, C: Connection + ?Sized> Transaction<'c, C> {
    pub fn begin(connection: &'c C) -> IngestResult<Self> {
        connection.begin()?;
        Ok(Self {
            connection,
            finished: false,
        })
    }

    pub fn commit(mut self) -> IngestResult<()> {
        self.connection.commit()?;
        self.finished = true;
        Ok(())
    }

    pub fn rollback(mut self) {
        self.finished = true;
        if let Err(e) = self.connection.rollback() {
            warn!(error = %e, "Rollback failed");
        }
    }
}

impl<C: Connection + ?Sized> Drop for Transaction<'_, C> {
    fn drop(&mut self) {
        if !self.finished {
            warn!("Transaction dropped before commit, rolling back");
            if let Err(e) = self.connection.rollback() {
                warn!(error = %e, "Rollback failed");
            }
        }
    }
}

/// Runs physical plans against a [`Connection`]
#[derive(Debug, Clone, Default)]
pub struct Executor {
    verify_sql: bool,
}

impl Executor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every rendered statement with the dialect grammar before executing
    pub fn with_verification(mut self, enabled: bool) -> Self {
        self.verify_sql = enabled;
        self
    }

    /// Render, verify and run `plan` atomically
    pub fn execute<C: Connection + ?Sized>(
        &self,
        plan: &PhysicalPlan,
        connection: &C,
        run_id: Uuid,
    ) -> IngestResult<IngestorResult> {
        let dialect = connection.dialect();

        let preamble = plan
            .preamble
            .iter()
            .map(|op| render(op, dialect))
            .collect::<IngestResult<Vec<_>>>()?;
        let steps = plan
            .operations
            .iter()
            .map(|op| Ok((op.kind(), render(op, dialect)?)))
            .collect::<IngestResult<Vec<_>>>()?;

        if self.verify_sql {
            for statement in preamble.iter().chain(steps.iter().map(|(_, s)| s)) {
                verify_statement(statement, dialect)?;
            }
        }

        let transaction = Transaction::begin(connection)?;
        match run_steps(plan, connection, &preamble, &steps) {
            Ok(outcomes) => {
                transaction.commit()?;
                Ok(StatisticsCollector::collect(plan, &outcomes, run_id, dialect))
            }
            Err(e) => {
                warn!(error = %e, "Ingestion failed, rolling back");
                transaction.rollback();
                Err(e)
            }
        }
    }
}

fn run_steps<C: Connection + ?Sized>(
    plan: &PhysicalPlan,
    connection: &C,
    preamble: &[ExecutableStatement],
    steps: &[(OperationKind, ExecutableStatement)],
) -> IngestResult<Vec<StepOutcome>> {
    for statement in preamble {
        debug!(operation = statement.operation, sql = %statement.sql, "Executing");
        connection.execute(statement)?;
    }

    let mut outcomes = Vec::with_capacity(steps.len());
    for (kind, statement) in steps {
        debug!(
            operation = statement.operation,
            sql = %statement.sql,
            params = statement.params.len(),
            "Executing"
        );
        let rows = match statement.kind {
            StatementKind::Query => connection.query_count(statement)?,
            StatementKind::Mutation => connection.execute(statement)?,
        };

        match kind {
            OperationKind::DetectDuplicates
                if rows > 0
                    && plan.deduplication() == Some(DeduplicationStrategy::FailOnDuplicates) =>
            {
                return Err(IngestError::DuplicateRecordsDetected { count: rows });
            }
            OperationKind::MatchPrimaryKeys if rows > 0 => {
                return Err(IngestError::ConstraintViolation(format!(
                    "{} primary key value(s) in the incoming batch are NULL or occur more than once",
                    rows
                )));
            }
            OperationKind::CheckBatchTime if rows > 0 => {
                return Err(IngestError::ConstraintViolation(format!(
                    "{} open row(s) start after batch time {}",
                    rows, plan.batch_time
                )));
            }
            OperationKind::SelectIncoming => {
                info!(rows, "Incoming batch counted");
            }
            _ if kind.is_mutation() => {
                info!(operation = kind.name(), rows, "Step applied");
            }
            _ => {}
        }

        outcomes.push(StepOutcome { kind: *kind, rows });
    }
    Ok(outcomes)
}
