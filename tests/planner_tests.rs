//! Planner tests: step order, strategy resolution and determinism

use chrono::{NaiveDate, NaiveDateTime};
use data_persistence_sdk::ingest_mode::{
    AppendOnly, AuditingStrategy, BitemporalDelta, DeduplicationStrategy, IngestMode, Snapshot,
    UnitemporalDelta,
};
use data_persistence_sdk::models::{DataType, Dataset, DatasetFilter, Field, FieldRole, FilterType};
use data_persistence_sdk::planner::{
    InsertCondition, OPEN_SENTINEL, Operation, OperationKind, PhysicalPlan, Planner,
};

fn batch_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap()
}

fn staging() -> Dataset {
    Dataset::new(Some("demo"), "staging")
        .with_field(Field::new("id", DataType::Integer).primary_key())
        .with_field(Field::new("name", DataType::Varchar))
        .with_field(Field::new("version", DataType::Integer))
        .with_field(Field::new("digest", DataType::Varchar).with_role(FieldRole::Digest))
}

fn main_dataset() -> Dataset {
    Dataset::new(Some("demo"), "main")
        .with_field(Field::new("id", DataType::Integer).primary_key())
        .with_field(Field::new("name", DataType::Varchar))
        .with_field(Field::new("version", DataType::Integer))
        .with_field(Field::new("digest", DataType::Varchar).with_role(FieldRole::Digest))
        .with_field(Field::new("valid_from", DataType::Timestamp).with_role(FieldRole::Temporal))
        .with_field(Field::new("valid_to", DataType::Timestamp).with_role(FieldRole::Temporal))
        .with_field(Field::new("audit_ts", DataType::Timestamp).with_role(FieldRole::Audit))
}

fn plan(mode: IngestMode) -> PhysicalPlan {
    Planner::new()
        .plan(&mode, &staging(), &main_dataset(), &[], batch_time())
        .unwrap()
}

fn insert_of(plan: &PhysicalPlan) -> &data_persistence_sdk::planner::Insert {
    plan.operations
        .iter()
        .find_map(|op| match op {
            Operation::Insert(insert) => Some(insert),
            _ => None,
        })
        .expect("plan has an insert")
}

#[test]
fn test_append_only_allow_duplicates_has_no_check() {
    let plan = plan(IngestMode::AppendOnly(AppendOnly::new()));
    assert_eq!(
        plan.kinds(),
        vec![OperationKind::SelectIncoming, OperationKind::Insert]
    );
    assert_eq!(insert_of(&plan).condition, InsertCondition::All);
}

#[test]
fn test_append_only_filter_duplicates() {
    let plan = plan(IngestMode::AppendOnly(
        AppendOnly::new()
            .digest_field("digest")
            .deduplication(DeduplicationStrategy::FilterDuplicates),
    ));
    assert_eq!(
        plan.kinds(),
        vec![
            OperationKind::SelectIncoming,
            OperationKind::DetectDuplicates,
            OperationKind::Insert
        ]
    );
    assert_eq!(
        insert_of(&plan).condition,
        InsertCondition::DigestNotPresent {
            digest_field: "digest".to_string()
        }
    );
    assert_eq!(
        plan.deduplication(),
        Some(DeduplicationStrategy::FilterDuplicates)
    );
}

#[test]
fn test_append_only_fail_on_duplicates_inserts_everything_after_check() {
    let plan = plan(IngestMode::AppendOnly(
        AppendOnly::new()
            .digest_field("digest")
            .deduplication(DeduplicationStrategy::FailOnDuplicates),
    ));
    assert!(plan.contains(OperationKind::DetectDuplicates));
    assert_eq!(insert_of(&plan).condition, InsertCondition::All);
}

#[test]
fn test_snapshot_deletes_before_insert() {
    let plan = plan(IngestMode::Snapshot(Snapshot::new().partition_fields(&["name"])));
    assert_eq!(
        plan.kinds(),
        vec![
            OperationKind::SelectIncoming,
            OperationKind::DeletePartition,
            OperationKind::Insert
        ]
    );
    match &plan.operations[1] {
        Operation::DeletePartition(delete) => assert_eq!(delete.partition_fields, vec!["name"]),
        other => panic!("unexpected operation {}", other.kind()),
    }
}

#[test]
fn test_unitemporal_updates_non_key_fields() {
    let plan = plan(IngestMode::UnitemporalDelta(
        UnitemporalDelta::new(&["id"])
            .version_field("version")
            .auditing(AuditingStrategy::date_time("audit_ts")),
    ));
    assert_eq!(
        plan.kinds(),
        vec![
            OperationKind::SelectIncoming,
            OperationKind::MatchPrimaryKeys,
            OperationKind::Update,
            OperationKind::Insert
        ]
    );
    match &plan.operations[2] {
        Operation::Update(update) => {
            assert_eq!(update.set_fields, vec!["name", "version", "digest"]);
            assert_eq!(update.version_field.as_deref(), Some("version"));
            assert_eq!(update.stamps.len(), 1);
            assert_eq!(update.stamps[0].value, batch_time());
        }
        other => panic!("unexpected operation {}", other.kind()),
    }
    assert_eq!(
        insert_of(&plan).condition,
        InsertCondition::KeyNotPresent {
            primary_keys: vec!["id".to_string()]
        }
    );
}

#[test]
fn test_unitemporal_falls_back_to_main_primary_keys() {
    let plan = plan(IngestMode::UnitemporalDelta(UnitemporalDelta::default()));
    match &plan.operations[1] {
        Operation::MatchPrimaryKeys(m) => assert_eq!(m.primary_keys, vec!["id"]),
        other => panic!("unexpected operation {}", other.kind()),
    }
}

#[test]
fn test_bitemporal_closes_then_inserts_open_rows() {
    let plan = plan(IngestMode::BitemporalDelta(
        BitemporalDelta::new(&["id"], "valid_from", "valid_to")
            .auditing(AuditingStrategy::date_time("audit_ts")),
    ));
    assert_eq!(
        plan.kinds(),
        vec![
            OperationKind::SelectIncoming,
            OperationKind::MatchPrimaryKeys,
            OperationKind::CheckBatchTime,
            OperationKind::CloseTemporalRows,
            OperationKind::Insert
        ]
    );

    match &plan.operations[2] {
        Operation::CheckBatchTime(check) => {
            assert_eq!(check.batch_time, batch_time());
            assert_eq!(check.valid_from_field, "valid_from");
        }
        other => panic!("unexpected operation {}", other.kind()),
    }

    match &plan.operations[3] {
        Operation::CloseTemporalRows(close) => {
            assert_eq!(close.batch_time, batch_time());
            assert_eq!(close.open_sentinel, *OPEN_SENTINEL);
            assert!(close.digest_field.is_none());
        }
        other => panic!("unexpected operation {}", other.kind()),
    }

    let insert = insert_of(&plan);
    let stamped: Vec<(&str, NaiveDateTime)> = insert
        .stamps
        .iter()
        .map(|s| (s.field.as_str(), s.value))
        .collect();
    assert_eq!(
        stamped,
        vec![
            ("valid_from", batch_time()),
            ("valid_to", *OPEN_SENTINEL),
            ("audit_ts", batch_time())
        ]
    );
    assert_eq!(insert.batch.fields, vec!["id", "name", "version", "digest"]);
}

#[test]
fn test_bitemporal_with_digest_skips_unchanged_rows() {
    let plan = plan(IngestMode::BitemporalDelta(
        BitemporalDelta::new(&["id"], "valid_from", "valid_to").digest_field("digest"),
    ));
    assert!(matches!(
        insert_of(&plan).condition,
        InsertCondition::NoOpenRowWithDigest { .. }
    ));
}

#[test]
fn test_filters_and_cleanup_carried_into_plan() {
    let filter = DatasetFilter::of("version", FilterType::GreaterThanOrEqual, 2i64);
    let plan = Planner::new()
        .with_staging_cleanup(true)
        .plan(
            &IngestMode::AppendOnly(AppendOnly::new()),
            &staging(),
            &main_dataset(),
            std::slice::from_ref(&filter),
            batch_time(),
        )
        .unwrap();

    assert_eq!(plan.kinds().last(), Some(&OperationKind::CleanupStaging));
    match &plan.operations[0] {
        Operation::SelectIncoming(select) => assert_eq!(select.batch.filters, vec![filter]),
        other => panic!("unexpected operation {}", other.kind()),
    }
}

#[test]
fn test_dataset_creation_goes_to_preamble() {
    let plan = Planner::new()
        .with_dataset_creation(true)
        .plan(
            &IngestMode::Snapshot(Snapshot::new()),
            &staging(),
            &main_dataset(),
            &[],
            batch_time(),
        )
        .unwrap();
    assert_eq!(plan.preamble.len(), 1);
    assert_eq!(plan.operations[0].kind(), OperationKind::SelectIncoming);
}

#[test]
fn test_planning_is_deterministic() {
    let mode = IngestMode::BitemporalDelta(
        BitemporalDelta::new(&["id"], "valid_from", "valid_to").digest_field("digest"),
    );
    assert_eq!(plan(mode.clone()), plan(mode));
}

#[test]
fn test_every_plan_reads_before_it_writes() {
    let modes = vec![
        IngestMode::AppendOnly(AppendOnly::new()),
        IngestMode::Snapshot(Snapshot::new()),
        IngestMode::UnitemporalDelta(UnitemporalDelta::new(&["id"])),
        IngestMode::BitemporalDelta(BitemporalDelta::new(&["id"], "valid_from", "valid_to")),
    ];
    for mode in modes {
        let kinds = plan(mode).kinds();
        assert_eq!(kinds[0], OperationKind::SelectIncoming);
        let first_write = kinds.iter().position(|k| k.is_mutation()).unwrap();
        assert!(kinds[first_write..].iter().all(|k| k.is_mutation()));
    }
}
