//! Translation of an ingest mode into a physical plan

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::{IngestError, IngestResult};
use crate::ingest_mode::{
    AppendOnly, BitemporalDelta, DeduplicationStrategy, IngestMode, Snapshot, UnitemporalDelta,
};
use crate::models::{Dataset, DatasetFilter};
use crate::validation::validate_ingest;

use super::operation::*;

/// `valid_to` value of a row that has not been superseded
pub static OPEN_SENTINEL: Lazy<NaiveDateTime> = Lazy::new(|| {
    NaiveDate::from_ymd_opt(9999, 12, 31)
        .and_then(|d| d.and_hms_opt(23, 59, 59))
        .expect("Invalid sentinel")
});

/// Builds physical plans
///
/// Planning is pure: the same mode, datasets, filters and batch time always
/// produce the same plan.
#[derive(Debug, Clone, Default)]
pub struct Planner {
    create_datasets: bool,
    cleanup_staging_data: bool,
}

impl Planner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the main dataset if missing, inside the ingest transaction
    pub fn with_dataset_creation(mut self, enabled: bool) -> Self {
        self.create_datasets = enabled;
        self
    }

    /// Delete the consumed batch from staging as the last step
    pub fn with_staging_cleanup(mut self, enabled: bool) -> Self {
        self.cleanup_staging_data = enabled;
        self
    }

    /// Validate the request and build its plan
    ///
    /// Fails with `InvalidModeConfiguration` or `SchemaMismatch` when the mode
    /// and datasets cannot be ingested together.
    pub fn plan(
        &self,
        mode: &IngestMode,
        staging: &Dataset,
        main: &Dataset,
        filters: &[DatasetFilter],
        batch_time: NaiveDateTime,
    ) -> IngestResult<PhysicalPlan> {
        validate_ingest(mode, staging, main, filters)?;

        let batch = IncomingBatch {
            staging: staging.reference.clone(),
            fields: staging
                .data_fields(&[])
                .into_iter()
                .map(|f| f.name.clone())
                .collect(),
            filters: filters.to_vec(),
        };
        let stamps = mode
            .auditing()
            .audit_field()
            .map(|field| Stamp {
                field: field.to_string(),
                value: batch_time,
            })
            .into_iter()
            .collect::<Vec<_>>();

        let mut operations = vec![Operation::SelectIncoming(SelectIncoming {
            batch: batch.clone(),
        })];

        match mode {
            IngestMode::AppendOnly(m) => {
                plan_append_only(m, &batch, main, stamps, &mut operations)?
            }
            IngestMode::Snapshot(m) => plan_snapshot(m, &batch, main, stamps, &mut operations),
            IngestMode::UnitemporalDelta(m) => {
                let keys = key_names(mode, main)?;
                plan_unitemporal(m, &batch, main, keys, stamps, &mut operations)?
            }
            IngestMode::BitemporalDelta(m) => {
                let keys = key_names(mode, main)?;
                plan_bitemporal(m, &batch, main, keys, stamps, batch_time, &mut operations)
            }
        }

        if self.cleanup_staging_data {
            operations.push(Operation::CleanupStaging(CleanupStaging { batch }));
        }

        let preamble = if self.create_datasets {
            vec![Operation::CreateDataset(CreateDataset {
                dataset: main.clone(),
            })]
        } else {
            Vec::new()
        };

        let plan = PhysicalPlan {
            mode: mode.name(),
            batch_time,
            preamble,
            operations,
        };
        debug!(mode = plan.mode, steps = ?plan.kinds(), "Built physical plan");
        Ok(plan)
    }
}

fn plan_append_only(
    mode: &AppendOnly,
    batch: &IncomingBatch,
    main: &Dataset,
    stamps: Vec<Stamp>,
    operations: &mut Vec<Operation>,
) -> IngestResult<()> {
    let condition = match mode.deduplication {
        DeduplicationStrategy::AllowDuplicates => InsertCondition::All,
        strategy => {
            let digest_field = mode.digest_field.clone().ok_or_else(|| {
                IngestError::InvalidModeConfiguration(format!(
                    "Deduplication strategy '{}' requires a digest field",
                    strategy
                ))
            })?;
            operations.push(Operation::DetectDuplicates(DetectDuplicates {
                batch: batch.clone(),
                main: main.reference.clone(),
                digest_field: digest_field.clone(),
                strategy,
            }));
            match strategy {
                DeduplicationStrategy::FilterDuplicates => {
                    InsertCondition::DigestNotPresent { digest_field }
                }
                // The duplicate check aborts the run before the insert otherwise
                _ => InsertCondition::All,
            }
        }
    };

    operations.push(Operation::Insert(Insert {
        batch: batch.clone(),
        main: main.reference.clone(),
        condition,
        stamps,
    }));
    Ok(())
}

fn plan_snapshot(
    mode: &Snapshot,
    batch: &IncomingBatch,
    main: &Dataset,
    stamps: Vec<Stamp>,
    operations: &mut Vec<Operation>,
) {
    operations.push(Operation::DeletePartition(DeletePartition {
        batch: batch.clone(),
        main: main.reference.clone(),
        partition_fields: mode.partition_fields.clone(),
    }));
    operations.push(Operation::Insert(Insert {
        batch: batch.clone(),
        main: main.reference.clone(),
        condition: InsertCondition::All,
        stamps,
    }));
}

fn plan_unitemporal(
    mode: &UnitemporalDelta,
    batch: &IncomingBatch,
    main: &Dataset,
    primary_keys: Vec<String>,
    stamps: Vec<Stamp>,
    operations: &mut Vec<Operation>,
) -> IngestResult<()> {
    let set_fields: Vec<String> = batch
        .fields
        .iter()
        .filter(|f| !primary_keys.contains(f))
        .cloned()
        .collect();
    if set_fields.is_empty() && stamps.is_empty() {
        return Err(IngestError::InvalidModeConfiguration(format!(
            "Dataset {} has no non-key fields to update",
            main.reference
        )));
    }

    operations.push(Operation::MatchPrimaryKeys(MatchPrimaryKeys {
        batch: batch.clone(),
        primary_keys: primary_keys.clone(),
    }));
    operations.push(Operation::Update(Update {
        batch: batch.clone(),
        main: main.reference.clone(),
        primary_keys: primary_keys.clone(),
        set_fields,
        version_field: mode.version_field.clone(),
        stamps: stamps.clone(),
    }));
    operations.push(Operation::Insert(Insert {
        batch: batch.clone(),
        main: main.reference.clone(),
        condition: InsertCondition::KeyNotPresent { primary_keys },
        stamps,
    }));
    Ok(())
}

fn plan_bitemporal(
    mode: &BitemporalDelta,
    batch: &IncomingBatch,
    main: &Dataset,
    primary_keys: Vec<String>,
    audit_stamps: Vec<Stamp>,
    batch_time: NaiveDateTime,
    operations: &mut Vec<Operation>,
) {
    let open_sentinel = *OPEN_SENTINEL;

    operations.push(Operation::MatchPrimaryKeys(MatchPrimaryKeys {
        batch: batch.clone(),
        primary_keys: primary_keys.clone(),
    }));
    operations.push(Operation::CheckBatchTime(CheckBatchTime {
        batch: batch.clone(),
        main: main.reference.clone(),
        primary_keys: primary_keys.clone(),
        valid_from_field: mode.valid_from_field.clone(),
        valid_to_field: mode.valid_to_field.clone(),
        batch_time,
        open_sentinel,
    }));
    operations.push(Operation::CloseTemporalRows(CloseTemporalRows {
        batch: batch.clone(),
        main: main.reference.clone(),
        primary_keys: primary_keys.clone(),
        valid_to_field: mode.valid_to_field.clone(),
        batch_time,
        open_sentinel,
        digest_field: mode.digest_field.clone(),
    }));

    let condition = match &mode.digest_field {
        Some(digest_field) => InsertCondition::NoOpenRowWithDigest {
            primary_keys,
            digest_field: digest_field.clone(),
            valid_to_field: mode.valid_to_field.clone(),
            open_sentinel,
        },
        None => InsertCondition::All,
    };

    let mut stamps = vec![
        Stamp {
            field: mode.valid_from_field.clone(),
            value: batch_time,
        },
        Stamp {
            field: mode.valid_to_field.clone(),
            value: open_sentinel,
        },
    ];
    stamps.extend(audit_stamps);

    operations.push(Operation::Insert(Insert {
        batch: batch.clone(),
        main: main.reference.clone(),
        condition,
        stamps,
    }));
}

fn key_names(mode: &IngestMode, main: &Dataset) -> IngestResult<Vec<String>> {
    let keys: Vec<String> = mode
        .primary_keys(main)
        .into_iter()
        .map(str::to_string)
        .collect();
    if keys.is_empty() {
        return Err(IngestError::InvalidModeConfiguration(format!(
            "Mode '{}' requires primary keys",
            mode.name()
        )));
    }
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataType, Field, FieldRole};

    fn batch_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap()
    }

    fn dataset(name: &str) -> Dataset {
        Dataset::new(Some("demo"), name)
            .with_field(Field::new("id", DataType::Integer).primary_key())
            .with_field(Field::new("name", DataType::Varchar))
            .with_field(Field::new("digest", DataType::Varchar).with_role(FieldRole::Digest))
    }

    #[test]
    fn test_open_sentinel_value() {
        assert_eq!(
            OPEN_SENTINEL.format("%Y-%m-%d %H:%M:%S").to_string(),
            "9999-12-31 23:59:59"
        );
    }

    #[test]
    fn test_batch_reads_staging_data_fields() {
        let mode = IngestMode::AppendOnly(AppendOnly::new());
        let plan = Planner::new()
            .plan(&mode, &dataset("staging"), &dataset("main"), &[], batch_time())
            .unwrap();
        match &plan.operations[0] {
            Operation::SelectIncoming(select) => {
                assert_eq!(select.batch.fields, vec!["id", "name", "digest"]);
            }
            other => panic!("unexpected first operation {:?}", other.kind()),
        }
    }

    #[test]
    fn test_incompatible_schemas_rejected() {
        let staging = Dataset::new(Some("demo"), "staging")
            .with_field(Field::new("id", DataType::Integer));
        let main = Dataset::new(Some("demo"), "main")
            .with_field(Field::new("other", DataType::Varchar));
        let mode = IngestMode::AppendOnly(AppendOnly::new());
        let err = Planner::new()
            .plan(&mode, &staging, &main, &[], batch_time())
            .unwrap_err();
        assert!(matches!(err, IngestError::SchemaMismatch(_)));
    }

    #[test]
    fn test_unitemporal_without_updatable_fields_rejected() {
        let keys_only = Dataset::new(Some("demo"), "t")
            .with_field(Field::new("id", DataType::Integer).primary_key());
        let mode = IngestMode::UnitemporalDelta(UnitemporalDelta::new(&["id"]));
        let err = Planner::new()
            .plan(&mode, &keys_only, &keys_only, &[], batch_time())
            .unwrap_err();
        assert!(matches!(err, IngestError::InvalidModeConfiguration(_)));
    }
}
