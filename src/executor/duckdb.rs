//! DuckDB connection
//!
//! Embedded backend for local runs and tests. Supports both file-based
//! persistence and in-memory mode.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use duckdb::types::{TimeUnit, ToSqlOutput, Value, ValueRef};
use duckdb::{ToSql, params_from_iter};

use super::{Connection, QueryResult};
use crate::dialect::{Dialect, ExecutableStatement};
use crate::error::{IngestError, IngestResult};
use crate::models::Literal;

/// DuckDB connection (wrapped in Mutex for thread safety)
pub struct DuckDbConnection {
    /// Path to the database file (None for in-memory)
    db_path: Option<PathBuf>,
    connection: Mutex<duckdb::Connection>,
}

impl DuckDbConnection {
    /// Open a file-based database
    pub fn open(db_path: impl AsRef<Path>) -> IngestResult<Self> {
        let path = db_path.as_ref().to_path_buf();
        let connection = duckdb::Connection::open(&path).map_err(|e| {
            IngestError::ConnectivityFailure(format!("Failed to open DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: Some(path),
            connection: Mutex::new(connection),
        })
    }

    pub fn in_memory() -> IngestResult<Self> {
        let connection = duckdb::Connection::open_in_memory().map_err(|e| {
            IngestError::ConnectivityFailure(format!("Failed to create in-memory DuckDB: {}", e))
        })?;

        Ok(Self {
            db_path: None,
            connection: Mutex::new(connection),
        })
    }

    /// Get the database file path (None for in-memory)
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Execute multiple SQL statements outside of any ingestion
    pub fn execute_batch(&self, sql: &str) -> IngestResult<()> {
        self.lock()?
            .execute_batch(sql)
            .map_err(|e| statement_error(e, sql))
    }

    /// Run an ad-hoc query, returning every row as a JSON object
    pub fn query(&self, sql: &str) -> IngestResult<QueryResult> {
        let start = std::time::Instant::now();
        let conn = self.lock()?;

        let mut stmt = conn.prepare(sql).map_err(|e| statement_error(e, sql))?;

        // Columns are only known once the statement has run
        let mut result_rows = stmt.query([]).map_err(|e| statement_error(e, sql))?;

        let column_count = result_rows.as_ref().map(|r| r.column_count()).unwrap_or(0);
        let columns: Vec<String> = (0..column_count)
            .map(|i| {
                result_rows
                    .as_ref()
                    .and_then(|r| r.column_name(i).ok())
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("col{}", i))
            })
            .collect();

        let mut rows = Vec::new();
        while let Some(row) = result_rows.next().map_err(|e| statement_error(e, sql))? {
            rows.push(row_to_json(row, &columns));
        }

        Ok(QueryResult {
            columns,
            rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn lock(&self) -> IngestResult<MutexGuard<'_, duckdb::Connection>> {
        self.connection
            .lock()
            .map_err(|e| IngestError::ConnectivityFailure(format!("Lock error: {}", e)))
    }

    fn control(&self, sql: &str) -> IngestResult<()> {
        self.lock()?
            .execute_batch(sql)
            .map_err(|e| IngestError::ConnectivityFailure(format!("{} failed: {}", sql, e)))
    }
}

impl Connection for DuckDbConnection {
    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    fn begin(&self) -> IngestResult<()> {
        self.control("BEGIN TRANSACTION")
    }

    fn commit(&self) -> IngestResult<()> {
        self.control("COMMIT")
    }

    fn rollback(&self) -> IngestResult<()> {
        self.control("ROLLBACK")
    }

    fn execute(&self, statement: &ExecutableStatement) -> IngestResult<u64> {
        let conn = self.lock()?;
        conn.execute(&statement.sql, params_from_iter(statement.params.iter()))
            .map(|rows| rows as u64)
            .map_err(|e| statement_error(e, &statement.sql))
    }

    fn query_count(&self, statement: &ExecutableStatement) -> IngestResult<u64> {
        let conn = self.lock()?;
        conn.query_row(
            &statement.sql,
            params_from_iter(statement.params.iter()),
            |row| row.get::<_, i64>(0),
        )
        .map(|count| count.max(0) as u64)
        .map_err(|e| statement_error(e, &statement.sql))
    }
}

/// Dates and timestamps bind as native DuckDB values, never as text
impl ToSql for Literal {
    fn to_sql(&self) -> duckdb::Result<ToSqlOutput<'_>> {
        let value = match self {
            Literal::Text(s) => Value::Text(s.clone()),
            Literal::Integer(i) => Value::BigInt(*i),
            Literal::Float(f) => Value::Double(*f),
            Literal::Boolean(b) => Value::Boolean(*b),
            // Days since 1970-01-01
            Literal::Date(d) => {
                Value::Date32(d.signed_duration_since(NaiveDate::default()).num_days() as i32)
            }
            Literal::Timestamp(ts) => {
                Value::Timestamp(TimeUnit::Microsecond, ts.and_utc().timestamp_micros())
            }
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

fn statement_error(error: duckdb::Error, sql: &str) -> IngestError {
    let message = error.to_string();
    if message.contains("Constraint Error") {
        IngestError::ConstraintViolation(message)
    } else {
        IngestError::Execution {
            message,
            sql: sql.to_string(),
        }
    }
}

fn row_to_json(row: &duckdb::Row, columns: &[String]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for (i, col_name) in columns.iter().enumerate() {
        let value = match row.get_ref(i) {
            Ok(value_ref) => value_ref_to_json(value_ref),
            Err(_) => serde_json::Value::Null,
        };
        map.insert(col_name.clone(), value);
    }
    serde_json::Value::Object(map)
}

fn value_ref_to_json(value: ValueRef) -> serde_json::Value {
    match value {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Boolean(b) => serde_json::Value::Bool(b),
        ValueRef::TinyInt(i) => i.into(),
        ValueRef::SmallInt(i) => i.into(),
        ValueRef::Int(i) => i.into(),
        ValueRef::BigInt(i) => i.into(),
        // i128 may not fit in a JSON number
        ValueRef::HugeInt(i) => serde_json::Value::String(i.to_string()),
        ValueRef::UTinyInt(i) => i.into(),
        ValueRef::USmallInt(i) => i.into(),
        ValueRef::UInt(i) => i.into(),
        ValueRef::UBigInt(i) => i.into(),
        ValueRef::Float(f) => serde_json::Number::from_f64(f as f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Double(f) => serde_json::Number::from_f64(f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes).into_owned().into(),
        ValueRef::Decimal(d) => serde_json::Value::String(d.to_string()),
        // Temporal and nested values; cast to VARCHAR in SQL for a stable text form
        other => serde_json::Value::String(format!("{:?}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::StatementKind;

    fn statement(sql: &str, params: Vec<Literal>) -> ExecutableStatement {
        ExecutableStatement {
            operation: "test",
            kind: StatementKind::Mutation,
            sql: sql.to_string(),
            params,
        }
    }

    #[test]
    fn test_in_memory_has_no_path() {
        let conn = DuckDbConnection::in_memory().unwrap();
        assert!(conn.db_path().is_none());
    }

    #[test]
    fn test_bound_literals() {
        let conn = DuckDbConnection::in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name VARCHAR, n BIGINT, ok BOOLEAN)")
            .unwrap();
        let inserted = conn
            .execute(&statement(
                "INSERT INTO t VALUES (?, ?, ?)",
                vec![Literal::from("a"), Literal::Integer(7), Literal::Boolean(true)],
            ))
            .unwrap();
        assert_eq!(inserted, 1);

        let count = conn
            .query_count(&statement(
                "SELECT COUNT(*) FROM t WHERE name = ? AND n > ?",
                vec![Literal::from("a"), Literal::Integer(3)],
            ))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_bound_temporal_literals() {
        let conn = DuckDbConnection::in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (d DATE, ts TIMESTAMP); \
             INSERT INTO t VALUES (DATE '2023-01-02', TIMESTAMP '2023-01-02 08:30:00'), \
             (DATE '1969-12-31', TIMESTAMP '1969-12-31 23:59:59')",
        )
        .unwrap();

        let matched = |d: &str, ts: &str| {
            conn.query_count(&statement(
                "SELECT COUNT(*) FROM t WHERE d = ? AND ts = ?",
                vec![
                    Literal::Date(NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap()),
                    Literal::timestamp(ts).unwrap(),
                ],
            ))
            .unwrap()
        };
        assert_eq!(matched("2023-01-02", "2023-01-02 08:30:00"), 1);
        assert_eq!(matched("1969-12-31", "1969-12-31 23:59:59"), 1);
        assert_eq!(matched("2023-01-02", "2023-01-02 08:30:01"), 0);

        let inserted = conn
            .execute(&statement(
                "INSERT INTO t VALUES (?, ?)",
                vec![
                    Literal::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
                    Literal::timestamp("9999-12-31 23:59:59").unwrap(),
                ],
            ))
            .unwrap();
        assert_eq!(inserted, 1);
        let result = conn
            .query(
                "SELECT CAST(d AS VARCHAR) AS d, CAST(ts AS VARCHAR) AS ts \
                 FROM t WHERE d > DATE '2024-01-01'",
            )
            .unwrap();
        assert_eq!(result.rows[0]["d"], serde_json::json!("2024-02-29"));
        assert_eq!(result.rows[0]["ts"], serde_json::json!("9999-12-31 23:59:59"));
    }

    #[test]
    fn test_rollback_discards_writes() {
        let conn = DuckDbConnection::in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (n INTEGER)").unwrap();
        conn.begin().unwrap();
        conn.execute(&statement("INSERT INTO t VALUES (1)", vec![]))
            .unwrap();
        conn.rollback().unwrap();

        let result = conn.query("SELECT COUNT(*) AS c FROM t").unwrap();
        assert_eq!(result.rows[0]["c"], serde_json::json!(0));
    }

    #[test]
    fn test_bad_sql_is_execution_error() {
        let conn = DuckDbConnection::in_memory().unwrap();
        let err = conn
            .execute(&statement("INSERT INTO missing VALUES (1)", vec![]))
            .unwrap_err();
        assert!(matches!(err, IngestError::Execution { .. }));
    }
}
