//! Logical operations of a physical plan
//!
//! Operations are dialect agnostic. They carry resolved field names and the
//! literal values (batch time, open sentinel) the renderer embeds.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::ingest_mode::DeduplicationStrategy;
use crate::models::{Dataset, DatasetFilter, DatasetReference};

/// The staged rows belonging to the current batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomingBatch {
    pub staging: DatasetReference,
    /// Data fields copied from staging, in staging declaration order
    pub fields: Vec<String>,
    /// ANDed batch filters
    pub filters: Vec<DatasetFilter>,
}

/// A main dataset field written with a generated timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stamp {
    pub field: String,
    pub value: NaiveDateTime,
}

/// Count the incoming rows
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectIncoming {
    pub batch: IncomingBatch,
}

/// Count incoming rows whose digest repeats in the batch or already exists in main
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectDuplicates {
    pub batch: IncomingBatch,
    pub main: DatasetReference,
    pub digest_field: String,
    pub strategy: DeduplicationStrategy,
}

/// Count batch primary keys that are NULL or occur more than once
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchPrimaryKeys {
    pub batch: IncomingBatch,
    pub primary_keys: Vec<String>,
}

/// Delete main rows of every partition present in the batch
///
/// With no partition fields the whole main dataset is deleted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletePartition {
    pub batch: IncomingBatch,
    pub main: DatasetReference,
    pub partition_fields: Vec<String>,
}

/// Count open main rows matched by the batch whose validity starts after the batch time
///
/// Closing such a row would give it a `valid_to` before its `valid_from`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckBatchTime {
    pub batch: IncomingBatch,
    pub main: DatasetReference,
    pub primary_keys: Vec<String>,
    pub valid_from_field: String,
    pub valid_to_field: String,
    pub batch_time: NaiveDateTime,
    pub open_sentinel: NaiveDateTime,
}

/// Close the open main rows matched by primary key
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloseTemporalRows {
    pub batch: IncomingBatch,
    pub main: DatasetReference,
    pub primary_keys: Vec<String>,
    pub valid_to_field: String,
    pub batch_time: NaiveDateTime,
    pub open_sentinel: NaiveDateTime,
    /// When set, rows whose digest is unchanged stay open
    pub digest_field: Option<String>,
}

/// Update main rows matched by primary key in place
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub batch: IncomingBatch,
    pub main: DatasetReference,
    pub primary_keys: Vec<String>,
    /// Fields overwritten from staging (never the keys)
    pub set_fields: Vec<String>,
    pub version_field: Option<String>,
    pub stamps: Vec<Stamp>,
}

/// Which incoming rows an insert writes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InsertCondition {
    /// Every incoming row
    All,
    /// The first row per digest, and only if the digest is not already in main
    DigestNotPresent { digest_field: String },
    /// Rows whose primary key is not in main
    KeyNotPresent { primary_keys: Vec<String> },
    /// Rows without an open main row carrying the same key and digest
    NoOpenRowWithDigest {
        primary_keys: Vec<String>,
        digest_field: String,
        valid_to_field: String,
        open_sentinel: NaiveDateTime,
    },
}

/// Insert incoming rows into main
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insert {
    pub batch: IncomingBatch,
    pub main: DatasetReference,
    pub condition: InsertCondition,
    pub stamps: Vec<Stamp>,
}

/// Delete the consumed batch from staging
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanupStaging {
    pub batch: IncomingBatch,
}

/// Create the main dataset if it does not exist
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateDataset {
    pub dataset: Dataset,
}

/// Discriminant of an [`Operation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    CreateDataset,
    SelectIncoming,
    DetectDuplicates,
    MatchPrimaryKeys,
    CheckBatchTime,
    DeletePartition,
    CloseTemporalRows,
    Update,
    Insert,
    CleanupStaging,
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            OperationKind::CreateDataset => "create_dataset",
            OperationKind::SelectIncoming => "select_incoming",
            OperationKind::DetectDuplicates => "detect_duplicates",
            OperationKind::MatchPrimaryKeys => "match_primary_keys",
            OperationKind::CheckBatchTime => "check_batch_time",
            OperationKind::DeletePartition => "delete_partition",
            OperationKind::CloseTemporalRows => "close_temporal_rows",
            OperationKind::Update => "update",
            OperationKind::Insert => "insert",
            OperationKind::CleanupStaging => "cleanup_staging",
        }
    }

    /// Whether the operation changes persistent state
    pub fn is_mutation(&self) -> bool {
        !matches!(
            self,
            OperationKind::SelectIncoming
                | OperationKind::DetectDuplicates
                | OperationKind::MatchPrimaryKeys
                | OperationKind::CheckBatchTime
        )
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One step of a physical plan
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    CreateDataset(CreateDataset),
    SelectIncoming(SelectIncoming),
    DetectDuplicates(DetectDuplicates),
    MatchPrimaryKeys(MatchPrimaryKeys),
    CheckBatchTime(CheckBatchTime),
    DeletePartition(DeletePartition),
    CloseTemporalRows(CloseTemporalRows),
    Update(Update),
    Insert(Insert),
    CleanupStaging(CleanupStaging),
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::CreateDataset(_) => OperationKind::CreateDataset,
            Operation::SelectIncoming(_) => OperationKind::SelectIncoming,
            Operation::DetectDuplicates(_) => OperationKind::DetectDuplicates,
            Operation::MatchPrimaryKeys(_) => OperationKind::MatchPrimaryKeys,
            Operation::CheckBatchTime(_) => OperationKind::CheckBatchTime,
            Operation::DeletePartition(_) => OperationKind::DeletePartition,
            Operation::CloseTemporalRows(_) => OperationKind::CloseTemporalRows,
            Operation::Update(_) => OperationKind::Update,
            Operation::Insert(_) => OperationKind::Insert,
            Operation::CleanupStaging(_) => OperationKind::CleanupStaging,
        }
    }
}

/// Ordered logical operations for one execution
///
/// `operations` always starts with `SelectIncoming`, followed by read-only
/// checks and then mutations. `preamble` holds setup statements (dataset
/// creation) that run first inside the same transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalPlan {
    /// Ingest mode name
    pub mode: &'static str,
    /// Timestamp embedded in audit and validity values
    pub batch_time: NaiveDateTime,
    pub preamble: Vec<Operation>,
    pub operations: Vec<Operation>,
}

impl PhysicalPlan {
    /// Operation kinds in execution order, preamble excluded
    pub fn kinds(&self) -> Vec<OperationKind> {
        self.operations.iter().map(Operation::kind).collect()
    }

    pub fn contains(&self, kind: OperationKind) -> bool {
        self.operations.iter().any(|op| op.kind() == kind)
    }

    /// Deduplication strategy of the duplicate check, if the plan has one
    pub fn deduplication(&self) -> Option<DeduplicationStrategy> {
        self.operations.iter().find_map(|op| match op {
            Operation::DetectDuplicates(d) => Some(d.strategy),
            _ => None,
        })
    }
}
