//! Dialect rendering
//!
//! Each supported backend has one [`DialectProfile`]: its lexical conventions
//! plus a renderer table with one entry per logical operation. A missing
//! entry means the dialect cannot express that operation, reported as
//! `UnsupportedDialectOperation` before anything is executed.
//!
//! Text, number and boolean filter values are bound as parameters. Dates and
//! timestamps are embedded with the dialect's literal syntax.
//!
//! ## Example
//!
//! ```rust
//! use data_persistence_sdk::dialect::{Dialect, render};
//! use data_persistence_sdk::models::DatasetReference;
//! use data_persistence_sdk::planner::{IncomingBatch, Operation, SelectIncoming};
//!
//! let op = Operation::SelectIncoming(SelectIncoming {
//!     batch: IncomingBatch {
//!         staging: DatasetReference::new(Some("demo"), "staging"),
//!         fields: vec!["id".to_string()],
//!         filters: vec![],
//!     },
//! });
//! let statement = render(&op, Dialect::BigQuery).unwrap();
//! assert_eq!(statement.sql, "SELECT COUNT(*) FROM `demo`.`staging` AS stage");
//! ```

mod ansi;
mod bigquery;
mod duckdb;
mod postgres;
mod standard;
mod writer;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlparser::dialect::{
    AnsiDialect, BigQueryDialect, Dialect as SqlDialect, DuckDbDialect, PostgreSqlDialect,
};
use sqlparser::parser::Parser;

use crate::error::{IngestError, IngestResult};
use crate::models::{DATE_FORMAT, Literal, TIMESTAMP_FORMAT};
use crate::planner::{
    CheckBatchTime, CleanupStaging, CloseTemporalRows, CreateDataset, DeletePartition,
    DetectDuplicates, Insert, MatchPrimaryKeys, Operation, PhysicalPlan, SelectIncoming, Update,
};

use writer::{SqlWriter, Syntax};

/// Supported SQL backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Ansi,
    #[default]
    DuckDb,
    Postgres,
    BigQuery,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Ansi => "ansi",
            Dialect::DuckDb => "duckdb",
            Dialect::Postgres => "postgres",
            Dialect::BigQuery => "bigquery",
        }
    }

    pub fn all() -> [Dialect; 4] {
        [
            Dialect::Ansi,
            Dialect::DuckDb,
            Dialect::Postgres,
            Dialect::BigQuery,
        ]
    }

    fn parser_dialect(&self) -> Box<dyn SqlDialect + Send + Sync> {
        match self {
            Dialect::Ansi => Box::new(AnsiDialect {}),
            Dialect::DuckDb => Box::new(DuckDbDialect {}),
            Dialect::Postgres => Box::new(PostgreSqlDialect {}),
            Dialect::BigQuery => Box::new(BigQueryDialect {}),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "ansi" => Ok(Dialect::Ansi),
            "duckdb" => Ok(Dialect::DuckDb),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "bigquery" | "bq" => Ok(Dialect::BigQuery),
            other => Err(format!("Unknown dialect: {}", other)),
        }
    }
}

/// Whether a statement returns a single count or reports affected rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatementKind {
    Query,
    Mutation,
}

/// SQL text plus its bound parameters, in placeholder order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutableStatement {
    /// Name of the logical operation the statement was rendered from
    pub operation: &'static str,
    pub kind: StatementKind,
    pub sql: String,
    pub params: Vec<Literal>,
}

impl std::fmt::Display for ExecutableStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql)
    }
}

pub(crate) type RenderFn<T> = fn(&mut SqlWriter<'_>, &T) -> IngestResult<()>;

/// One renderer per logical operation; `None` marks an unsupported operation
pub(crate) struct Renderers {
    pub select_incoming: Option<RenderFn<SelectIncoming>>,
    pub detect_duplicates: Option<RenderFn<DetectDuplicates>>,
    pub match_primary_keys: Option<RenderFn<MatchPrimaryKeys>>,
    pub check_batch_time: Option<RenderFn<CheckBatchTime>>,
    pub delete_partition: Option<RenderFn<DeletePartition>>,
    pub close_temporal_rows: Option<RenderFn<CloseTemporalRows>>,
    pub update: Option<RenderFn<Update>>,
    pub insert: Option<RenderFn<Insert>>,
    pub cleanup_staging: Option<RenderFn<CleanupStaging>>,
    pub create_dataset: Option<RenderFn<CreateDataset>>,
}

pub(crate) struct DialectProfile {
    pub syntax: Syntax,
    pub renderers: Renderers,
}

fn profile(dialect: Dialect) -> &'static DialectProfile {
    match dialect {
        Dialect::Ansi => &ansi::PROFILE,
        Dialect::DuckDb => &duckdb::PROFILE,
        Dialect::Postgres => &postgres::PROFILE,
        Dialect::BigQuery => &bigquery::PROFILE,
    }
}

/// Render one logical operation for `dialect`
pub fn render(operation: &Operation, dialect: Dialect) -> IngestResult<ExecutableStatement> {
    let profile = profile(dialect);
    let table = &profile.renderers;
    let mut w = SqlWriter::new(&profile.syntax);
    let kind = operation.kind();

    let rendered = match operation {
        Operation::CreateDataset(op) => apply(table.create_dataset, &mut w, op),
        Operation::SelectIncoming(op) => apply(table.select_incoming, &mut w, op),
        Operation::DetectDuplicates(op) => apply(table.detect_duplicates, &mut w, op),
        Operation::MatchPrimaryKeys(op) => apply(table.match_primary_keys, &mut w, op),
        Operation::CheckBatchTime(op) => apply(table.check_batch_time, &mut w, op),
        Operation::DeletePartition(op) => apply(table.delete_partition, &mut w, op),
        Operation::CloseTemporalRows(op) => apply(table.close_temporal_rows, &mut w, op),
        Operation::Update(op) => apply(table.update, &mut w, op),
        Operation::Insert(op) => apply(table.insert, &mut w, op),
        Operation::CleanupStaging(op) => apply(table.cleanup_staging, &mut w, op),
    };

    match rendered {
        Some(result) => result?,
        None => {
            return Err(IngestError::UnsupportedDialectOperation {
                dialect,
                operation: kind.name(),
                reason: "no renderer for this operation".to_string(),
            });
        }
    }

    let statement_kind = if kind.is_mutation() {
        StatementKind::Mutation
    } else {
        StatementKind::Query
    };
    Ok(w.finish(kind.name(), statement_kind))
}

fn apply<T>(
    renderer: Option<RenderFn<T>>,
    w: &mut SqlWriter<'_>,
    op: &T,
) -> Option<IngestResult<()>> {
    renderer.map(|render| render(w, op))
}

/// Render the preamble followed by every plan step
///
/// Fails on the first operation the dialect cannot express, so an unsupported
/// plan never starts executing.
pub fn render_plan(plan: &PhysicalPlan, dialect: Dialect) -> IngestResult<Vec<ExecutableStatement>> {
    plan.preamble
        .iter()
        .chain(plan.operations.iter())
        .map(|op| render(op, dialect))
        .collect()
}

/// Parse a rendered statement with the dialect's SQL grammar
pub fn verify_statement(statement: &ExecutableStatement, dialect: Dialect) -> IngestResult<()> {
    let parser_dialect = dialect.parser_dialect();
    Parser::parse_sql(parser_dialect.as_ref(), &statement.sql)
        .map(|_| ())
        .map_err(|e| IngestError::UnsupportedDialectOperation {
            dialect,
            operation: statement.operation,
            reason: format!("rendered SQL does not parse: {}", e),
        })
}

pub(crate) fn positional_placeholder(_index: usize) -> String {
    "?".to_string()
}

pub(crate) fn timestamp_literal(value: &NaiveDateTime) -> String {
    format!("TIMESTAMP '{}'", value.format(TIMESTAMP_FORMAT))
}

pub(crate) fn date_literal(value: &NaiveDate) -> String {
    format!("DATE '{}'", value.format(DATE_FORMAT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DatasetFilter, DatasetReference, FilterType};
    use crate::planner::IncomingBatch;

    fn batch(filters: Vec<DatasetFilter>) -> IncomingBatch {
        IncomingBatch {
            staging: DatasetReference::new(Some("demo"), "staging"),
            fields: vec!["id".to_string(), "name".to_string()],
            filters,
        }
    }

    #[test]
    fn test_dialect_from_str() {
        assert_eq!("DuckDB".parse::<Dialect>().unwrap(), Dialect::DuckDb);
        assert_eq!("postgresql".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert!("oracle".parse::<Dialect>().is_err());
    }

    #[test]
    fn test_placeholders_follow_dialect() {
        let op = Operation::SelectIncoming(SelectIncoming {
            batch: batch(vec![
                DatasetFilter::of("name", FilterType::EqualTo, "a"),
                DatasetFilter::of("id", FilterType::GreaterThan, 3i64),
            ]),
        });

        let pg = render(&op, Dialect::Postgres).unwrap();
        assert!(pg.sql.ends_with(r#"WHERE stage."name" = $1 AND stage."id" > $2"#));
        assert_eq!(pg.params, vec![Literal::from("a"), Literal::Integer(3)]);

        let duck = render(&op, Dialect::DuckDb).unwrap();
        assert!(duck.sql.ends_with(r#"WHERE stage."name" = ? AND stage."id" > ?"#));
        assert_eq!(duck.kind, StatementKind::Query);
    }

    #[test]
    fn test_identifier_quotes_are_escaped() {
        let syntax = &profile(Dialect::DuckDb).syntax;
        let w = SqlWriter::new(syntax);
        assert_eq!(w.quote(r#"we"ird"#), r#""we""ird""#);
    }

    #[test]
    fn test_timestamp_filter_is_inlined() {
        let ts = Literal::timestamp("2024-01-02 03:04:05").unwrap();
        let op = Operation::SelectIncoming(SelectIncoming {
            batch: batch(vec![DatasetFilter::of("loaded_at", FilterType::LessThan, ts)]),
        });

        let bq = render(&op, Dialect::BigQuery).unwrap();
        assert!(bq.sql.contains("PARSE_DATETIME('%Y-%m-%d %H:%M:%S', '2024-01-02 03:04:05')"));
        assert!(bq.params.is_empty());
    }
}
