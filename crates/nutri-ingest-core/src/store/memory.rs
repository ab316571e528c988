//! In-memory [`FoodStore`] implementation for testing.
//!
//! Rows live in a `BTreeMap` keyed by natural key behind `std::sync::RwLock`,
//! so reads come back in the same order the SQLite store returns them.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{FoodRecord, PersistedFood};

use super::{FoodStore, UpsertOutcome};

/// In-memory food table.
pub struct InMemoryStore {
    rows: RwLock<BTreeMap<String, PersistedFood>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Look up one stored row by natural key.
    pub fn get(&self, natural_key: &str) -> Option<PersistedFood> {
        self.rows.read().ok()?.get(natural_key).cloned()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Batch("in-memory store lock poisoned".to_string())
}

#[async_trait]
impl FoodStore for InMemoryStore {
    async fn upsert_food(&self, record: &FoodRecord) -> Result<UpsertOutcome, StoreError> {
        let hash = record.content_hash();
        let now = Utc::now();
        let mut rows = self.rows.write().map_err(poisoned)?;

        match rows.get_mut(&record.natural_key) {
            Some(existing) if existing.content_hash == hash => Ok(UpsertOutcome::Unchanged),
            Some(existing) => {
                existing.record = record.clone();
                existing.content_hash = hash;
                existing.updated_at = now;
                Ok(UpsertOutcome::Updated)
            }
            None => {
                rows.insert(
                    record.natural_key.clone(),
                    PersistedFood {
                        id: Uuid::new_v4().to_string(),
                        record: record.clone(),
                        content_hash: hash,
                        created_at: now,
                        updated_at: now,
                    },
                );
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn read_foods(&self, limit: usize) -> Result<Vec<PersistedFood>, StoreError> {
        let rows = self.rows.read().map_err(poisoned)?;
        Ok(rows.values().take(limit).cloned().collect())
    }

    async fn count_foods(&self) -> Result<usize, StoreError> {
        Ok(self.rows.read().map_err(poisoned)?.len())
    }
}
