//! Mode, strategy and schema invariants
//!
//! Everything here runs before a plan is built, so configuration mistakes never
//! reach the backend.

use std::collections::HashSet;

use crate::error::{IngestError, IngestResult};
use crate::ingest_mode::IngestMode;
use crate::models::{DataType, Dataset, DatasetFilter, Field, FieldRole};

use super::input::validate_identifier;

/// Validate a complete ingestion request
///
/// Fails with `InvalidModeConfiguration` when a mode or strategy invariant is
/// violated and with `SchemaMismatch` when staging and main cannot exchange records.
pub fn validate_ingest(
    mode: &IngestMode,
    staging: &Dataset,
    main: &Dataset,
    filters: &[DatasetFilter],
) -> IngestResult<()> {
    validate_dataset(staging)?;
    validate_dataset(main)?;

    for filter in filters {
        validate_filter(staging, filter)?;
    }

    if let Some(audit) = mode.auditing().audit_field() {
        let field = require_field(main, audit, "audit field")?;
        if field.primary_key {
            return Err(invalid(format!(
                "Audit field '{}' is part of the primary key and cannot be written",
                audit
            )));
        }
        require_type(main, audit, DataType::Timestamp, "audit field")?;
    }

    match mode {
        IngestMode::AppendOnly(m) => {
            if m.deduplication.requires_digest() && m.digest_field.is_none() {
                return Err(invalid(format!(
                    "Deduplication strategy '{}' requires a digest field",
                    m.deduplication
                )));
            }
            if let Some(digest) = &m.digest_field {
                require_digest(staging, main, digest)?;
            }
        }
        IngestMode::Snapshot(m) => {
            for partition in &m.partition_fields {
                require_field(staging, partition, "partition field")?;
                require_field(main, partition, "partition field")?;
            }
        }
        IngestMode::UnitemporalDelta(m) => {
            let keys = require_keys(mode, staging, main)?;
            if let Some(version) = &m.version_field {
                require_field(staging, version, "version field")?;
                require_field(main, version, "version field")?;
                if keys.contains(&version.as_str()) {
                    return Err(invalid(format!(
                        "Version field '{}' cannot be part of the primary key",
                        version
                    )));
                }
            }
        }
        IngestMode::BitemporalDelta(m) => {
            require_keys(mode, staging, main)?;
            if m.valid_from_field == m.valid_to_field {
                return Err(invalid(
                    "valid_from and valid_to must be distinct fields".to_string(),
                ));
            }
            require_type(main, &m.valid_from_field, DataType::Timestamp, "valid_from field")?;
            require_type(main, &m.valid_to_field, DataType::Timestamp, "valid_to field")?;
            if let Some(digest) = &m.digest_field {
                require_digest(staging, main, digest)?;
            }
        }
    }

    check_schema_compatibility(staging, main, &mode.managed_fields())
}

/// Check that staging data fields and main data fields match by name and type
///
/// `managed` lists main fields the mode writes itself; they are not expected
/// on staging. Field order does not matter.
pub fn check_schema_compatibility(
    staging: &Dataset,
    main: &Dataset,
    managed: &[&str],
) -> IngestResult<()> {
    let staging_fields = staging.data_fields(&[]);
    let main_fields = main.data_fields(managed);

    for field in &staging_fields {
        match main_fields.iter().find(|f| f.name == field.name) {
            None => {
                return Err(IngestError::SchemaMismatch(format!(
                    "Staging field '{}' has no counterpart on main dataset {}",
                    field.name, main.reference
                )));
            }
            Some(target) if target.data_type != field.data_type => {
                return Err(IngestError::SchemaMismatch(format!(
                    "Field '{}' is {} on staging but {} on main",
                    field.name, field.data_type, target.data_type
                )));
            }
            Some(_) => {}
        }
    }

    if let Some(missing) = main_fields
        .iter()
        .find(|f| !staging_fields.iter().any(|s| s.name == f.name))
    {
        return Err(IngestError::SchemaMismatch(format!(
            "Main field '{}' is not provided by staging dataset {}",
            missing.name, staging.reference
        )));
    }

    Ok(())
}

fn validate_dataset(dataset: &Dataset) -> IngestResult<()> {
    if let Some(namespace) = &dataset.reference.namespace {
        validate_identifier("namespace", namespace)?;
    }
    validate_identifier("dataset name", &dataset.reference.name)?;

    let mut seen = HashSet::new();
    for field in &dataset.fields {
        validate_identifier("field name", &field.name)?;
        if !seen.insert(field.name.as_str()) {
            return Err(IngestError::SchemaMismatch(format!(
                "Field '{}' is declared twice on {}",
                field.name, dataset.reference
            )));
        }
    }

    let digests = dataset
        .fields
        .iter()
        .filter(|f| f.role == FieldRole::Digest)
        .count();
    if digests > 1 {
        return Err(invalid(format!(
            "Dataset {} flags {} digest fields; at most one is allowed",
            dataset.reference, digests
        )));
    }

    Ok(())
}

fn validate_filter(staging: &Dataset, filter: &DatasetFilter) -> IngestResult<()> {
    filter.check_arity().map_err(invalid)?;
    require_field(staging, &filter.field, "filter field")?;
    Ok(())
}

fn require_field<'a>(
    dataset: &'a Dataset,
    name: &str,
    what: &str,
) -> IngestResult<&'a Field> {
    dataset.field(name).ok_or_else(|| {
        invalid(format!(
            "The {} '{}' does not exist on dataset {}",
            what, name, dataset.reference
        ))
    })
}

fn require_type(dataset: &Dataset, name: &str, expected: DataType, what: &str) -> IngestResult<()> {
    let field = require_field(dataset, name, what)?;
    if field.data_type != expected {
        return Err(invalid(format!(
            "The {} '{}' must be {}, found {}",
            what, name, expected, field.data_type
        )));
    }
    Ok(())
}

fn require_digest(staging: &Dataset, main: &Dataset, digest: &str) -> IngestResult<()> {
    let field = require_field(staging, digest, "digest field")?;
    if field.role != FieldRole::Digest {
        return Err(invalid(format!(
            "Field '{}' is not declared as the digest of staging dataset {}",
            digest, staging.reference
        )));
    }
    require_field(main, digest, "digest field")?;
    Ok(())
}

fn require_keys<'a>(
    mode: &'a IngestMode,
    staging: &Dataset,
    main: &'a Dataset,
) -> IngestResult<Vec<&'a str>> {
    let keys = mode.primary_keys(main);
    if keys.is_empty() {
        return Err(invalid(format!(
            "Mode '{}' requires primary keys but none were declared on the mode or on {}",
            mode.name(),
            main.reference
        )));
    }
    for key in &keys {
        require_field(staging, key, "primary key")?;
        require_field(main, key, "primary key")?;
    }
    Ok(keys)
}

fn invalid(message: String) -> IngestError {
    IngestError::InvalidModeConfiguration(message)
}
