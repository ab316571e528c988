//! Error taxonomy for the ingestion pipeline.
//!
//! Errors fall into two classes:
//!
//! | Class | Types | Effect |
//! |-------|-------|--------|
//! | Fatal | [`SourceError`], [`PersistenceError`] | abort the run |
//! | Recoverable | [`ValidationError`], [`StoreError::Record`] | count, sample, continue |

use thiserror::Error;

use crate::models::SourceKind;

/// Whole-source failure while reading rows.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{source_kind} source '{origin}' could not be fetched: {reason}")]
    Fetch {
        source_kind: SourceKind,
        origin: String,
        reason: String,
    },
    #[error("{source_kind} source '{origin}' could not be parsed: {reason}")]
    Parse {
        source_kind: SourceKind,
        origin: String,
        reason: String,
    },
}

impl SourceError {
    pub fn fetch(kind: SourceKind, origin: impl Into<String>, reason: impl ToString) -> Self {
        SourceError::Fetch {
            source_kind: kind,
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    pub fn parse(kind: SourceKind, origin: impl Into<String>, reason: impl ToString) -> Self {
        SourceError::Parse {
            source_kind: kind,
            origin: origin.into(),
            reason: reason.to_string(),
        }
    }

    /// Pipeline stage that failed, for the run summary.
    pub fn stage(&self) -> &'static str {
        match self {
            SourceError::Fetch { .. } => "fetch",
            SourceError::Parse { .. } => "parse",
        }
    }
}

/// Per-row rejection reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("malformed row: {0}")]
    Malformed(String),
    #[error("missing or blank name")]
    MissingName,
    #[error("negative value {value} for nutrient '{nutrient}'")]
    NegativeNutrient { nutrient: String, value: f64 },
    #[error("conflicting duplicate of natural key '{0}'")]
    ConflictingDuplicate(String),
    #[error("duplicate of natural key '{0}' dropped")]
    DuplicateKey(String),
}

/// Failure reported by a [`FoodStore`](crate::store::FoodStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write of a single record failed; the store is still usable.
    #[error("record write failed: {0}")]
    Record(String),
    /// The store is unusable for the rest of the batch.
    #[error("store unavailable: {0}")]
    Batch(String),
}

/// Fatal persistence failure of an upsert batch.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error(
        "upsert batch aborted at record {failed_index} ({natural_key}): {reason}; last committed index: {}",
        .last_committed.map(|i| i.to_string()).unwrap_or_else(|| "none".to_string())
    )]
    BatchAborted {
        failed_index: usize,
        natural_key: String,
        last_committed: Option<usize>,
        reason: String,
    },
    #[error("read-back failed: {0}")]
    ReadBack(String),
}
