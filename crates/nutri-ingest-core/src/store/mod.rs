//! Storage abstraction for nutri-ingest.
//!
//! The [`FoodStore`] trait defines the three operations the upsert
//! coordinator needs, enabling pluggable backends (SQLite in the
//! `nutri-ingest` crate, [`memory::InMemoryStore`] for tests).
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{FoodRecord, PersistedFood};

/// What a single upsert did to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// No row had this natural key; a new row was created.
    Inserted,
    /// A row existed with different content and was overwritten.
    Updated,
    /// A row existed with identical content; nothing was written.
    Unchanged,
}

/// Abstract food table keyed by natural key.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`upsert_food`](FoodStore::upsert_food) | Atomically insert or update one record |
/// | [`read_foods`](FoodStore::read_foods) | Read back up to `limit` rows, ordered by natural key |
/// | [`count_foods`](FoodStore::count_foods) | Total number of stored rows |
#[async_trait]
pub trait FoodStore: Send + Sync {
    /// Insert the record, or update the row with the same natural key.
    ///
    /// On update, every field except the row id and `created_at` takes the
    /// record's value.
    async fn upsert_food(&self, record: &FoodRecord) -> Result<UpsertOutcome, StoreError>;

    /// Read up to `limit` stored rows.
    async fn read_foods(&self, limit: usize) -> Result<Vec<PersistedFood>, StoreError>;

    async fn count_foods(&self) -> Result<usize, StoreError>;
}
