//! Renderers shared by dialects that follow standard SQL for an operation
//!
//! Incoming rows are always read as `stage`; the main dataset is `sink`.

use crate::error::{IngestError, IngestResult};
use crate::planner::{
    CheckBatchTime, CleanupStaging, CloseTemporalRows, CreateDataset, DeletePartition,
    DetectDuplicates, Insert, InsertCondition, MatchPrimaryKeys, SelectIncoming, Update,
};

use super::writer::SqlWriter;

pub(crate) const STAGE: &str = "stage";
pub(crate) const SINK: &str = "sink";
pub(crate) const INCOMING: &str = "incoming";
pub(crate) const ROW_NUMBER_COLUMN: &str = "dedup_row_num";

pub(crate) fn select_incoming(w: &mut SqlWriter<'_>, op: &SelectIncoming) -> IngestResult<()> {
    w.push("SELECT COUNT(*) FROM ").table(&op.batch.staging, STAGE);
    w.filters(STAGE, &op.batch.filters);
    Ok(())
}

pub(crate) fn detect_duplicates(w: &mut SqlWriter<'_>, op: &DetectDuplicates) -> IngestResult<()> {
    require_window_functions(w, "detect_duplicates")?;
    let row_number = w.quote(ROW_NUMBER_COLUMN);

    w.push("SELECT COUNT(*) FROM (SELECT ")
        .column(STAGE, &op.digest_field)
        .push(", ");
    row_number_over(w, &op.digest_field);
    w.push(" AS ").push(&row_number);
    w.push(" FROM ").table(&op.batch.staging, STAGE);
    w.begin_query().filters(STAGE, &op.batch.filters).end_query();
    w.push(") AS ").push(INCOMING);
    w.push(" WHERE ")
        .push(INCOMING)
        .push(".")
        .push(&row_number)
        .push(" > 1 OR EXISTS (SELECT 1 FROM ")
        .table(&op.main, SINK);
    w.begin_query()
        .same_value(SINK, INCOMING, &op.digest_field)
        .end_query()
        .push(")");
    Ok(())
}

pub(crate) fn match_primary_keys(w: &mut SqlWriter<'_>, op: &MatchPrimaryKeys) -> IngestResult<()> {
    w.push("SELECT COUNT(*) FROM (SELECT ")
        .columns(STAGE, &op.primary_keys)
        .push(" FROM ")
        .table(&op.batch.staging, STAGE);
    w.begin_query().filters(STAGE, &op.batch.filters).end_query();
    w.push(" GROUP BY ")
        .columns(STAGE, &op.primary_keys)
        .push(" HAVING COUNT(*) > 1 OR ")
        .any_null(STAGE, &op.primary_keys)
        .push(") AS conflicts");
    Ok(())
}

pub(crate) fn check_batch_time(w: &mut SqlWriter<'_>, op: &CheckBatchTime) -> IngestResult<()> {
    w.push("SELECT COUNT(*) FROM ").table(&op.main, SINK);
    w.conjunct()
        .column(SINK, &op.valid_to_field)
        .push(" = ")
        .timestamp(&op.open_sentinel);
    w.conjunct()
        .column(SINK, &op.valid_from_field)
        .push(" > ")
        .timestamp(&op.batch_time);
    w.conjunct().push("EXISTS (SELECT 1 FROM ").table(&op.batch.staging, STAGE);
    w.begin_query()
        .key_match(SINK, STAGE, &op.primary_keys)
        .filters(STAGE, &op.batch.filters)
        .end_query()
        .push(")");
    Ok(())
}

pub(crate) fn delete_partition(w: &mut SqlWriter<'_>, op: &DeletePartition) -> IngestResult<()> {
    w.push("DELETE FROM ");
    if op.partition_fields.is_empty() {
        let main = w.table_name(&op.main);
        w.push(&main).all_rows();
        return Ok(());
    }

    let sink = w.dml_target(&op.main, SINK);
    w.conjunct().push("EXISTS (SELECT 1 FROM ").table(&op.batch.staging, STAGE);
    w.begin_query();
    for field in &op.partition_fields {
        w.same_value(&sink, STAGE, field);
    }
    w.filters(STAGE, &op.batch.filters).end_query().push(")");
    Ok(())
}

pub(crate) fn close_temporal_rows(
    w: &mut SqlWriter<'_>,
    op: &CloseTemporalRows,
) -> IngestResult<()> {
    w.push("UPDATE ");
    let sink = w.dml_target(&op.main, SINK);
    w.push(" SET ")
        .ident(&op.valid_to_field)
        .push(" = ")
        .timestamp(&op.batch_time);
    w.conjunct()
        .column(&sink, &op.valid_to_field)
        .push(" = ")
        .timestamp(&op.open_sentinel);
    w.conjunct().push("EXISTS (SELECT 1 FROM ").table(&op.batch.staging, STAGE);
    w.begin_query()
        .key_match(&sink, STAGE, &op.primary_keys)
        .filters(STAGE, &op.batch.filters);
    if let Some(digest) = &op.digest_field {
        w.different_value(&sink, STAGE, digest);
    }
    w.end_query().push(")");
    Ok(())
}

/// `UPDATE ... FROM` join form
pub(crate) fn update_from(w: &mut SqlWriter<'_>, op: &Update) -> IngestResult<()> {
    w.push("UPDATE ");
    let sink = w.dml_target(&op.main, SINK);
    w.push(" SET ");
    set_list(w, op, |w, field| {
        w.column(STAGE, field);
    });
    w.push(" FROM ").table(&op.batch.staging, STAGE);
    w.key_match(&sink, STAGE, &op.primary_keys)
        .filters(STAGE, &op.batch.filters);
    if let Some(version) = &op.version_field {
        w.conjunct().newer_version(STAGE, &sink, version);
    }
    Ok(())
}

pub(crate) fn insert(w: &mut SqlWriter<'_>, op: &Insert) -> IngestResult<()> {
    let main = w.table_name(&op.main);
    w.push("INSERT INTO ").push(&main).push(" (");
    w.list(&op.batch.fields, |w, f| {
        w.ident(f);
    });
    for stamp in &op.stamps {
        w.push(", ").ident(&stamp.field);
    }
    w.push(") SELECT ");

    if let InsertCondition::DigestNotPresent { digest_field } = &op.condition {
        require_window_functions(w, "insert")?;
        let row_number = w.quote(ROW_NUMBER_COLUMN);
        select_values(w, op, INCOMING);
        w.push(" FROM (SELECT ").columns(STAGE, &op.batch.fields).push(", ");
        row_number_over(w, digest_field);
        w.push(" AS ").push(&row_number);
        w.push(" FROM ").table(&op.batch.staging, STAGE);
        w.begin_query().filters(STAGE, &op.batch.filters).end_query();
        w.push(") AS ").push(INCOMING);
        w.conjunct().push(INCOMING).push(".").push(&row_number).push(" = 1");
        w.conjunct().push("NOT EXISTS (SELECT 1 FROM ").table(&op.main, SINK);
        w.begin_query()
            .same_value(SINK, INCOMING, digest_field)
            .end_query()
            .push(")");
        return Ok(());
    }

    select_values(w, op, STAGE);
    w.push(" FROM ").table(&op.batch.staging, STAGE);
    w.filters(STAGE, &op.batch.filters);

    match &op.condition {
        InsertCondition::All | InsertCondition::DigestNotPresent { .. } => {}
        InsertCondition::KeyNotPresent { primary_keys } => {
            w.conjunct().push("NOT EXISTS (SELECT 1 FROM ").table(&op.main, SINK);
            w.begin_query()
                .key_match(SINK, STAGE, primary_keys)
                .end_query()
                .push(")");
        }
        InsertCondition::NoOpenRowWithDigest {
            primary_keys,
            digest_field,
            valid_to_field,
            open_sentinel,
        } => {
            w.conjunct().push("NOT EXISTS (SELECT 1 FROM ").table(&op.main, SINK);
            w.begin_query().key_match(SINK, STAGE, primary_keys);
            w.conjunct()
                .column(SINK, valid_to_field)
                .push(" = ")
                .timestamp(open_sentinel);
            w.same_value(SINK, STAGE, digest_field);
            w.end_query().push(")");
        }
    }
    Ok(())
}

pub(crate) fn cleanup_staging(w: &mut SqlWriter<'_>, op: &CleanupStaging) -> IngestResult<()> {
    w.push("DELETE FROM ");
    if op.batch.filters.is_empty() {
        let staging = w.table_name(&op.batch.staging);
        w.push(&staging).all_rows();
        return Ok(());
    }
    let stage = w.dml_target(&op.batch.staging, STAGE);
    w.filters(&stage, &op.batch.filters);
    Ok(())
}

pub(crate) fn create_dataset(w: &mut SqlWriter<'_>, op: &CreateDataset) -> IngestResult<()> {
    w.push("CREATE TABLE ");
    if w.syntax().create_if_not_exists {
        w.push("IF NOT EXISTS ");
    }
    let name = w.table_name(&op.dataset.reference);
    w.push(&name).push(" (");
    let type_name = w.syntax().type_name;
    w.list(&op.dataset.fields, |w, field| {
        w.ident(&field.name)
            .push(" ")
            .push(&type_name(&field.data_type));
        if !field.nullable {
            w.push(" NOT NULL");
        }
    });
    w.push(")");
    Ok(())
}

/// `SET f = <value>, ..., stamp = <ts>` for an update
pub(crate) fn set_list(
    w: &mut SqlWriter<'_>,
    op: &Update,
    mut value: impl FnMut(&mut SqlWriter<'_>, &String),
) {
    w.list(&op.set_fields, |w, field| {
        w.ident(field).push(" = ");
        value(w, field);
    });
    for (i, stamp) in op.stamps.iter().enumerate() {
        if i > 0 || !op.set_fields.is_empty() {
            w.push(", ");
        }
        w.ident(&stamp.field).push(" = ").timestamp(&stamp.value);
    }
}

fn select_values(w: &mut SqlWriter<'_>, op: &Insert, qualifier: &str) {
    w.columns(qualifier, &op.batch.fields);
    for stamp in &op.stamps {
        w.push(", ").timestamp(&stamp.value);
    }
}

fn row_number_over(w: &mut SqlWriter<'_>, digest_field: &str) {
    w.push("ROW_NUMBER() OVER (PARTITION BY ")
        .column(STAGE, digest_field)
        .push(" ORDER BY ")
        .column(STAGE, digest_field)
        .push(")");
}

fn require_window_functions(w: &SqlWriter<'_>, operation: &'static str) -> IngestResult<()> {
    if w.syntax().window_functions {
        return Ok(());
    }
    Err(IngestError::UnsupportedDialectOperation {
        dialect: w.syntax().dialect,
        operation,
        reason: "digest deduplication needs window functions".to_string(),
    })
}
