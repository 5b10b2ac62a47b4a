//! Ingestion statistics
//!
//! A statistic is only reported when the plan contained the step that
//! produces it, so absence and zero stay distinguishable.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dialect::Dialect;
use crate::ingest_mode::DeduplicationStrategy;
use crate::planner::{OperationKind, PhysicalPlan};

/// Closed set of statistic names
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatisticName {
    IncomingRecordCount,
    RowsInserted,
    RowsUpdated,
    RowsTerminated,
    RowsDeleted,
    RowsWithErrors,
}

impl StatisticName {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatisticName::IncomingRecordCount => "INCOMING_RECORD_COUNT",
            StatisticName::RowsInserted => "ROWS_INSERTED",
            StatisticName::RowsUpdated => "ROWS_UPDATED",
            StatisticName::RowsTerminated => "ROWS_TERMINATED",
            StatisticName::RowsDeleted => "ROWS_DELETED",
            StatisticName::RowsWithErrors => "ROWS_WITH_ERRORS",
        }
    }

    /// Statistic fed by the count of an operation, if any
    fn for_operation(kind: OperationKind) -> Option<StatisticName> {
        match kind {
            OperationKind::SelectIncoming => Some(StatisticName::IncomingRecordCount),
            OperationKind::Insert => Some(StatisticName::RowsInserted),
            OperationKind::Update => Some(StatisticName::RowsUpdated),
            OperationKind::CloseTemporalRows => Some(StatisticName::RowsTerminated),
            OperationKind::DeletePartition => Some(StatisticName::RowsDeleted),
            OperationKind::DetectDuplicates => Some(StatisticName::RowsWithErrors),
            OperationKind::CreateDataset
            | OperationKind::MatchPrimaryKeys
            | OperationKind::CheckBatchTime
            | OperationKind::CleanupStaging => None,
        }
    }
}

impl std::fmt::Display for StatisticName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StatisticName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INCOMING_RECORD_COUNT" => Ok(StatisticName::IncomingRecordCount),
            "ROWS_INSERTED" => Ok(StatisticName::RowsInserted),
            "ROWS_UPDATED" => Ok(StatisticName::RowsUpdated),
            "ROWS_TERMINATED" => Ok(StatisticName::RowsTerminated),
            "ROWS_DELETED" => Ok(StatisticName::RowsDeleted),
            "ROWS_WITH_ERRORS" => Ok(StatisticName::RowsWithErrors),
            _ => Err(format!("Unknown statistic: {}", s)),
        }
    }
}

/// Count returned by one executed plan step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutcome {
    pub kind: OperationKind,
    pub rows: u64,
}

/// Immutable outcome of one successful ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestorResult {
    run_id: Uuid,
    mode: &'static str,
    dialect: Dialect,
    ingestion_timestamp: NaiveDateTime,
    statistics: BTreeMap<StatisticName, u64>,
    duplicates_filtered: Option<u64>,
}

impl IngestorResult {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn mode(&self) -> &'static str {
        self.mode
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Batch time used for audit and validity values
    pub fn ingestion_timestamp(&self) -> NaiveDateTime {
        self.ingestion_timestamp
    }

    pub fn statistic(&self, name: StatisticName) -> Option<u64> {
        self.statistics.get(&name).copied()
    }

    /// Look up a statistic by its wire name, e.g. `"ROWS_INSERTED"`
    pub fn statistic_by_name(&self, name: &str) -> Option<u64> {
        name.parse().ok().and_then(|n| self.statistic(n))
    }

    pub fn statistics(&self) -> &BTreeMap<StatisticName, u64> {
        &self.statistics
    }

    /// Incoming rows skipped by filter-duplicates
    pub fn duplicates_filtered(&self) -> Option<u64> {
        self.duplicates_filtered
    }
}

/// Builds an [`IngestorResult`] from a plan and its step outcomes
pub struct StatisticsCollector;

impl StatisticsCollector {
    /// Collect the statistics of the steps present in `plan`
    ///
    /// Repeated steps of one kind are summed. The duplicate check reports
    /// rejected rows under fail-on-duplicates (always zero once the run has
    /// succeeded) and zero under filter-duplicates.
    pub fn collect(
        plan: &PhysicalPlan,
        outcomes: &[StepOutcome],
        run_id: Uuid,
        dialect: Dialect,
    ) -> IngestorResult {
        let mut statistics = BTreeMap::new();
        let mut duplicates_filtered = None;

        for outcome in outcomes {
            let Some(name) = StatisticName::for_operation(outcome.kind) else {
                continue;
            };
            let rows = if outcome.kind == OperationKind::DetectDuplicates {
                match plan.deduplication() {
                    Some(DeduplicationStrategy::FilterDuplicates) => {
                        *duplicates_filtered.get_or_insert(0) += outcome.rows;
                        0
                    }
                    _ => outcome.rows,
                }
            } else {
                outcome.rows
            };
            *statistics.entry(name).or_insert(0) += rows;
        }

        IngestorResult {
            run_id,
            mode: plan.mode,
            dialect,
            ingestion_timestamp: plan.batch_time,
            statistics,
            duplicates_filtered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn plan() -> PhysicalPlan {
        PhysicalPlan {
            mode: "snapshot",
            batch_time: NaiveDate::from_ymd_opt(2024, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap(),
            preamble: vec![],
            operations: vec![],
        }
    }

    #[test]
    fn test_only_present_steps_are_reported() {
        let outcomes = [
            StepOutcome {
                kind: OperationKind::SelectIncoming,
                rows: 3,
            },
            StepOutcome {
                kind: OperationKind::DeletePartition,
                rows: 2,
            },
            StepOutcome {
                kind: OperationKind::Insert,
                rows: 3,
            },
        ];
        let result = StatisticsCollector::collect(&plan(), &outcomes, Uuid::new_v4(), Dialect::DuckDb);

        assert_eq!(result.statistic_by_name("INCOMING_RECORD_COUNT"), Some(3));
        assert_eq!(result.statistic_by_name("ROWS_DELETED"), Some(2));
        assert_eq!(result.statistic_by_name("ROWS_INSERTED"), Some(3));
        assert_eq!(result.statistic_by_name("ROWS_UPDATED"), None);
        assert_eq!(result.statistic_by_name("ROWS_WITH_ERRORS"), None);
        assert_eq!(result.statistic_by_name("NOT_A_STATISTIC"), None);
    }

    #[test]
    fn test_statistic_names_serialize_screaming() {
        let json = serde_json::to_string(&StatisticName::RowsTerminated).unwrap();
        assert_eq!(json, "\"ROWS_TERMINATED\"");
    }
}
