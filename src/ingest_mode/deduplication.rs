//! Deduplication strategies

use serde::{Deserialize, Serialize};

/// Policy for incoming rows whose digest repeats inside the batch or is already in main
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeduplicationStrategy {
    /// Insert every incoming row (default)
    #[default]
    AllowDuplicates,
    /// Abort the run before mutating main if any duplicate is found
    FailOnDuplicates,
    /// Drop duplicates and insert the remaining rows
    FilterDuplicates,
}

impl DeduplicationStrategy {
    /// Whether the strategy needs a digest column
    pub fn requires_digest(&self) -> bool {
        !matches!(self, DeduplicationStrategy::AllowDuplicates)
    }
}

impl std::fmt::Display for DeduplicationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeduplicationStrategy::AllowDuplicates => write!(f, "allow_duplicates"),
            DeduplicationStrategy::FailOnDuplicates => write!(f, "fail_on_duplicates"),
            DeduplicationStrategy::FilterDuplicates => write!(f, "filter_duplicates"),
        }
    }
}
