//! Upsert coordination and read-back verification.
//!
//! [`upsert_records`] applies a normalized batch to a [`FoodStore`] one
//! record at a time. A record-level store failure is recorded with the
//! record's natural key and the batch continues; a batch-level failure
//! aborts with the highest index already committed.
//!
//! [`verify_read_back`] reads the store back with a limit equal to the
//! number of rows just written and compares counts. A mismatch is logged,
//! not raised: by then the batch has committed.

use tracing::{debug, warn};

use crate::error::{PersistenceError, StoreError};
use crate::models::FoodRecord;
use crate::store::{FoodStore, UpsertOutcome};

/// A record the store refused, while the store itself stayed usable.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFailure {
    pub index: usize,
    pub natural_key: String,
    pub reason: String,
}

/// Per-batch upsert tallies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpsertReport {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub failures: Vec<RecordFailure>,
    /// Highest batch index whose write committed.
    pub last_committed: Option<usize>,
}

impl UpsertReport {
    /// Records now present in the store with this batch's values.
    pub fn persisted(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

pub async fn upsert_records(
    store: &dyn FoodStore,
    records: &[FoodRecord],
) -> Result<UpsertReport, PersistenceError> {
    let mut report = UpsertReport::default();

    for (index, record) in records.iter().enumerate() {
        match store.upsert_food(record).await {
            Ok(outcome) => {
                debug!(key = %record.natural_key, ?outcome, "upserted");
                match outcome {
                    UpsertOutcome::Inserted => report.inserted += 1,
                    UpsertOutcome::Updated => report.updated += 1,
                    UpsertOutcome::Unchanged => report.unchanged += 1,
                }
                report.last_committed = Some(index);
            }
            Err(StoreError::Record(reason)) => {
                warn!(key = %record.natural_key, index, %reason, "record not persisted");
                report.failures.push(RecordFailure {
                    index,
                    natural_key: record.natural_key.clone(),
                    reason,
                });
            }
            Err(StoreError::Batch(reason)) => {
                return Err(PersistenceError::BatchAborted {
                    failed_index: index,
                    natural_key: record.natural_key.clone(),
                    last_committed: report.last_committed,
                    reason,
                });
            }
        }
    }

    Ok(report)
}

/// Outcome of the post-write read-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    pub expected: usize,
    pub read_back: usize,
}

impl Verification {
    pub fn matched(&self) -> bool {
        self.expected == self.read_back
    }
}

pub async fn verify_read_back(
    store: &dyn FoodStore,
    expected: usize,
) -> Result<Verification, PersistenceError> {
    let rows = store
        .read_foods(expected)
        .await
        .map_err(|e| PersistenceError::ReadBack(e.to_string()))?;
    let verification = Verification {
        expected,
        read_back: rows.len(),
    };
    if !verification.matched() {
        warn!(
            expected,
            read_back = verification.read_back,
            "read-back count does not match rows written"
        );
    }
    Ok(verification)
}
