//! Ingest modes
//!
//! An ingest mode selects the merge semantics of one execution. It is a closed
//! tagged union: the planner matches on it exhaustively, so a new mode is a
//! compile error at every site that has to learn about it.
//!
//! ## Example
//!
//! ```rust
//! use data_persistence_sdk::ingest_mode::{
//!     AppendOnly, AuditingStrategy, DeduplicationStrategy, IngestMode,
//! };
//!
//! let mode = IngestMode::AppendOnly(
//!     AppendOnly::new()
//!         .digest_field("digest")
//!         .deduplication(DeduplicationStrategy::FilterDuplicates)
//!         .auditing(AuditingStrategy::date_time("audit_ts")),
//! );
//! assert_eq!(mode.name(), "append_only");
//! assert_eq!(mode.managed_fields(), vec!["audit_ts"]);
//! ```

mod audit;
mod deduplication;

pub use audit::AuditingStrategy;
pub use deduplication::DeduplicationStrategy;

use serde::{Deserialize, Serialize};

use crate::models::Dataset;

/// Rows are only ever inserted, never updated
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AppendOnly {
    /// Digest column used for duplicate detection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest_field: Option<String>,
    #[serde(default)]
    pub deduplication: DeduplicationStrategy,
    #[serde(default)]
    pub auditing: AuditingStrategy,
}

impl AppendOnly {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn digest_field(mut self, field: impl Into<String>) -> Self {
        self.digest_field = Some(field.into());
        self
    }

    pub fn deduplication(mut self, strategy: DeduplicationStrategy) -> Self {
        self.deduplication = strategy;
        self
    }

    pub fn auditing(mut self, auditing: AuditingStrategy) -> Self {
        self.auditing = auditing;
        self
    }
}

/// The partitions present in the batch are replaced by the batch
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Partition columns; empty means the whole main dataset is one partition
    #[serde(default)]
    pub partition_fields: Vec<String>,
    #[serde(default)]
    pub auditing: AuditingStrategy,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition_fields(mut self, fields: &[&str]) -> Self {
        self.partition_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn auditing(mut self, auditing: AuditingStrategy) -> Self {
        self.auditing = auditing;
        self
    }
}

/// Rows are updated in place by primary key or inserted; only the latest version is kept
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitemporalDelta {
    /// Matching key; empty falls back to the main dataset's primary key fields
    #[serde(default)]
    pub primary_keys: Vec<String>,
    /// When set, a matched row is only updated if the incoming version is greater
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_field: Option<String>,
    #[serde(default)]
    pub auditing: AuditingStrategy,
}

impl UnitemporalDelta {
    pub fn new(primary_keys: &[&str]) -> Self {
        Self {
            primary_keys: primary_keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn version_field(mut self, field: impl Into<String>) -> Self {
        self.version_field = Some(field.into());
        self
    }

    pub fn auditing(mut self, auditing: AuditingStrategy) -> Self {
        self.auditing = auditing;
        self
    }
}

/// Open rows matched by primary key are closed at batch time and replaced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitemporalDelta {
    /// Matching key; empty falls back to the main dataset's primary key fields
    #[serde(default)]
    pub primary_keys: Vec<String>,
    pub valid_from_field: String,
    pub valid_to_field: String,
    /// When set, an incoming row whose digest equals the open row's is left alone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest_field: Option<String>,
    #[serde(default)]
    pub auditing: AuditingStrategy,
}

impl BitemporalDelta {
    pub fn new(
        primary_keys: &[&str],
        valid_from_field: impl Into<String>,
        valid_to_field: impl Into<String>,
    ) -> Self {
        Self {
            primary_keys: primary_keys.iter().map(|k| k.to_string()).collect(),
            valid_from_field: valid_from_field.into(),
            valid_to_field: valid_to_field.into(),
            digest_field: None,
            auditing: AuditingStrategy::NoAuditing,
        }
    }

    pub fn digest_field(mut self, field: impl Into<String>) -> Self {
        self.digest_field = Some(field.into());
        self
    }

    pub fn auditing(mut self, auditing: AuditingStrategy) -> Self {
        self.auditing = auditing;
        self
    }
}

/// The merge semantics governing one execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum IngestMode {
    AppendOnly(AppendOnly),
    Snapshot(Snapshot),
    UnitemporalDelta(UnitemporalDelta),
    BitemporalDelta(BitemporalDelta),
}

impl IngestMode {
    /// Stable mode name for logs and configuration
    pub fn name(&self) -> &'static str {
        match self {
            IngestMode::AppendOnly(_) => "append_only",
            IngestMode::Snapshot(_) => "snapshot",
            IngestMode::UnitemporalDelta(_) => "unitemporal_delta",
            IngestMode::BitemporalDelta(_) => "bitemporal_delta",
        }
    }

    pub fn auditing(&self) -> &AuditingStrategy {
        match self {
            IngestMode::AppendOnly(m) => &m.auditing,
            IngestMode::Snapshot(m) => &m.auditing,
            IngestMode::UnitemporalDelta(m) => &m.auditing,
            IngestMode::BitemporalDelta(m) => &m.auditing,
        }
    }

    /// Deduplication strategy, for modes that have one
    pub fn deduplication(&self) -> Option<DeduplicationStrategy> {
        match self {
            IngestMode::AppendOnly(m) => Some(m.deduplication),
            IngestMode::Snapshot(_)
            | IngestMode::UnitemporalDelta(_)
            | IngestMode::BitemporalDelta(_) => None,
        }
    }

    /// Matching key of a delta mode
    ///
    /// An empty key list falls back to the main dataset's primary key fields.
    /// Non-delta modes have no matching key.
    pub fn primary_keys<'a>(&'a self, main: &'a Dataset) -> Vec<&'a str> {
        let declared = match self {
            IngestMode::UnitemporalDelta(m) => &m.primary_keys,
            IngestMode::BitemporalDelta(m) => &m.primary_keys,
            IngestMode::AppendOnly(_) | IngestMode::Snapshot(_) => return Vec::new(),
        };
        if declared.is_empty() {
            main.primary_keys()
        } else {
            declared.iter().map(String::as_str).collect()
        }
    }

    /// Main dataset fields written by the mode itself rather than copied from staging
    pub fn managed_fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        if let IngestMode::BitemporalDelta(m) = self {
            fields.push(m.valid_from_field.as_str());
            fields.push(m.valid_to_field.as_str());
        }
        if let Some(audit) = self.auditing().audit_field() {
            fields.push(audit);
        }
        fields
    }
}
