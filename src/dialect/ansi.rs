//! ANSI SQL-92 core
//!
//! No DML target aliases, no window functions and no `CREATE TABLE IF NOT EXISTS`.
//! Updates use correlated subqueries and NULL-safe comparisons are spelled out
//! with `IS NULL`; digest deduplication is unsupported.

use crate::error::IngestResult;
use crate::models::DataType;
use crate::planner::Update;

use super::standard::{self, STAGE};
use super::writer::{SqlWriter, Syntax};
use super::{
    Dialect, DialectProfile, Renderers, date_literal, positional_placeholder, timestamp_literal,
};

pub(crate) static PROFILE: DialectProfile = DialectProfile {
    syntax: Syntax {
        dialect: Dialect::Ansi,
        quote: ('"', '"'),
        placeholder: positional_placeholder,
        timestamp_literal,
        date_literal,
        type_name,
        dml_target_alias: false,
        window_functions: false,
        distinct_from: false,
        all_rows_predicate: None,
        create_if_not_exists: false,
    },
    renderers: Renderers {
        select_incoming: Some(standard::select_incoming),
        detect_duplicates: None,
        match_primary_keys: Some(standard::match_primary_keys),
        check_batch_time: Some(standard::check_batch_time),
        delete_partition: Some(standard::delete_partition),
        close_temporal_rows: Some(standard::close_temporal_rows),
        update: Some(update_correlated),
        insert: Some(standard::insert),
        cleanup_staging: Some(standard::cleanup_staging),
        create_dataset: Some(standard::create_dataset),
    },
};

fn type_name(data_type: &DataType) -> String {
    match data_type {
        DataType::Double => "DOUBLE PRECISION".to_string(),
        DataType::Varchar => "VARCHAR(255)".to_string(),
        other => other.to_string(),
    }
}

/// `SET f = (SELECT stage.f ...)` per field, restricted by a correlated `EXISTS`
fn update_correlated(w: &mut SqlWriter<'_>, op: &Update) -> IngestResult<()> {
    w.push("UPDATE ");
    let sink = w.dml_target(&op.main, standard::SINK);
    w.push(" SET ");
    standard::set_list(w, op, |w, field| {
        w.push("(SELECT ")
            .column(STAGE, field)
            .push(" FROM ")
            .table(&op.batch.staging, STAGE);
        w.begin_query()
            .key_match(&sink, STAGE, &op.primary_keys)
            .filters(STAGE, &op.batch.filters)
            .end_query()
            .push(")");
    });
    w.conjunct().push("EXISTS (SELECT 1 FROM ").table(&op.batch.staging, STAGE);
    w.begin_query()
        .key_match(&sink, STAGE, &op.primary_keys)
        .filters(STAGE, &op.batch.filters);
    if let Some(version) = &op.version_field {
        w.conjunct().newer_version(STAGE, &sink, version);
    }
    w.end_query().push(")");
    Ok(())
}
