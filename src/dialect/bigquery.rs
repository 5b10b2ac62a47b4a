//! BigQuery: backtick identifiers, `DATETIME` values, `MERGE` for updates
//!
//! BigQuery rejects `UPDATE`/`DELETE` without a `WHERE` clause, so full-table
//! statements carry `WHERE TRUE`.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::IngestResult;
use crate::models::{DATE_FORMAT, DataType, TIMESTAMP_FORMAT};
use crate::planner::Update;

use super::standard::{self, SINK, STAGE};
use super::writer::{SqlWriter, Syntax};
use super::{Dialect, DialectProfile, Renderers, positional_placeholder};

pub(crate) static PROFILE: DialectProfile = DialectProfile {
    syntax: Syntax {
        dialect: Dialect::BigQuery,
        quote: ('`', '`'),
        placeholder: positional_placeholder,
        timestamp_literal,
        date_literal,
        type_name,
        dml_target_alias: true,
        window_functions: true,
        distinct_from: true,
        all_rows_predicate: Some("TRUE"),
        create_if_not_exists: true,
    },
    renderers: Renderers {
        select_incoming: Some(standard::select_incoming),
        detect_duplicates: Some(standard::detect_duplicates),
        match_primary_keys: Some(standard::match_primary_keys),
        check_batch_time: Some(standard::check_batch_time),
        delete_partition: Some(standard::delete_partition),
        close_temporal_rows: Some(standard::close_temporal_rows),
        update: Some(update_merge),
        insert: Some(standard::insert),
        cleanup_staging: Some(standard::cleanup_staging),
        create_dataset: Some(standard::create_dataset),
    },
};

fn timestamp_literal(value: &NaiveDateTime) -> String {
    format!(
        "PARSE_DATETIME('{}', '{}')",
        TIMESTAMP_FORMAT,
        value.format(TIMESTAMP_FORMAT)
    )
}

fn date_literal(value: &NaiveDate) -> String {
    format!("DATE '{}'", value.format(DATE_FORMAT))
}

fn type_name(data_type: &DataType) -> String {
    match data_type {
        DataType::Integer | DataType::BigInt => "INT64".to_string(),
        DataType::Double => "FLOAT64".to_string(),
        DataType::Decimal { precision, scale } => format!("NUMERIC({},{})", precision, scale),
        DataType::Varchar => "STRING".to_string(),
        DataType::Boolean => "BOOL".to_string(),
        DataType::Date => "DATE".to_string(),
        DataType::Timestamp => "DATETIME".to_string(),
    }
}

/// `MERGE ... WHEN MATCHED THEN UPDATE`; unmatched rows are left to the insert step
fn update_merge(w: &mut SqlWriter<'_>, op: &Update) -> IngestResult<()> {
    let main = w.table_name(&op.main);
    w.push("MERGE INTO ")
        .push(&main)
        .push(" AS ")
        .push(SINK)
        .push(" USING (SELECT ")
        .columns(STAGE, &op.batch.fields)
        .push(" FROM ")
        .table(&op.batch.staging, STAGE);
    w.begin_query().filters(STAGE, &op.batch.filters).end_query();
    w.push(") AS ").push(STAGE).push(" ON ");
    for (i, key) in op.primary_keys.iter().enumerate() {
        if i > 0 {
            w.push(" AND ");
        }
        w.column(SINK, key).push(" = ").column(STAGE, key);
    }
    w.push(" WHEN MATCHED");
    if let Some(version) = &op.version_field {
        w.push(" AND ").newer_version(STAGE, SINK, version);
    }
    w.push(" THEN UPDATE SET ");
    standard::set_list(w, op, |w, field| {
        w.column(STAGE, field);
    });
    Ok(())
}
