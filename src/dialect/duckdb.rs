//! DuckDB: `?` placeholders, double-quoted identifiers, `UPDATE ... FROM`

use crate::models::DataType;

use super::standard;
use super::writer::Syntax;
use super::{
    Dialect, DialectProfile, Renderers, date_literal, positional_placeholder, timestamp_literal,
};

pub(crate) static PROFILE: DialectProfile = DialectProfile {
    syntax: Syntax {
        dialect: Dialect::DuckDb,
        quote: ('"', '"'),
        placeholder: positional_placeholder,
        timestamp_literal,
        date_literal,
        type_name,
        dml_target_alias: true,
        window_functions: true,
        distinct_from: true,
        all_rows_predicate: None,
        create_if_not_exists: true,
    },
    renderers: Renderers {
        select_incoming: Some(standard::select_incoming),
        detect_duplicates: Some(standard::detect_duplicates),
        match_primary_keys: Some(standard::match_primary_keys),
        check_batch_time: Some(standard::check_batch_time),
        delete_partition: Some(standard::delete_partition),
        close_temporal_rows: Some(standard::close_temporal_rows),
        update: Some(standard::update_from),
        insert: Some(standard::insert),
        cleanup_staging: Some(standard::cleanup_staging),
        create_dataset: Some(standard::create_dataset),
    },
};

fn type_name(data_type: &DataType) -> String {
    data_type.to_string()
}
