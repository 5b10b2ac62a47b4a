//! Planner module
//!
//! Validates an ingest request and turns it into a [`PhysicalPlan`]: an ordered list of
//! dialect-agnostic operations. Plans always start by counting the incoming
//! batch, then run read-only checks, then mutations.
//!
//! | Mode              | Steps                                                  |
//! |-------------------|--------------------------------------------------------|
//! | append only       | select, detect duplicates (unless allowed), insert     |
//! | snapshot          | select, delete partitions, insert                      |
//! | unitemporal delta | select, match primary keys, update, insert             |
//! | bitemporal delta  | select, match primary keys, check batch time, close    |
//! |                   | open rows, insert                                      |

pub mod operation;
mod plan;

pub use operation::{
    CheckBatchTime, CleanupStaging, CloseTemporalRows, CreateDataset, DeletePartition,
    DetectDuplicates, IncomingBatch, Insert, InsertCondition, MatchPrimaryKeys, Operation,
    OperationKind, PhysicalPlan, SelectIncoming, Stamp, Update,
};
pub use plan::{OPEN_SENTINEL, Planner};
