//! SQLite-backed [`FoodStore`] implementation.
//!
//! Each upsert runs in its own transaction: look up the row by natural key,
//! skip the write when the content hash is unchanged, otherwise
//! `INSERT ... ON CONFLICT(natural_key) DO UPDATE`. The row id and
//! `created_at` are never touched by the update branch.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use nutri_ingest_core::error::StoreError;
use nutri_ingest_core::models::{FoodRecord, PersistedFood, Serving, SourceKind};
use nutri_ingest_core::store::{FoodStore, UpsertOutcome};

/// SQLite implementation of the [`FoodStore`] trait over the `foods` table.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Split sqlx failures into "this record" and "this store".
///
/// Constraint and encoding problems only affect the record being written.
/// Pool, I/O, and SQLite busy/locked/full/corrupt conditions mean later
/// records would fail the same way.
fn classify(err: sqlx::Error) -> StoreError {
    let batch_level = match &err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|c| c.parse::<i32>().ok())
            .map(|code| matches!(code & 0xff, 5 | 6 | 10 | 11 | 13 | 14 | 26))
            .unwrap_or(false),
        sqlx::Error::Encode(_)
        | sqlx::Error::Decode(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::RowNotFound => false,
        _ => true,
    };
    if batch_level {
        StoreError::Batch(err.to_string())
    } else {
        StoreError::Record(err.to_string())
    }
}

fn from_ts(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Record(format!("timestamp out of range: {}", secs)))
}

#[async_trait]
impl FoodStore for SqliteStore {
    async fn upsert_food(&self, record: &FoodRecord) -> Result<UpsertOutcome, StoreError> {
        let content_hash = record.content_hash();
        let nutrients_json = serde_json::to_string(&record.nutrients)
            .map_err(|e| StoreError::Record(e.to_string()))?;
        let now = Utc::now().timestamp();

        let mut tx = self.pool.begin().await.map_err(classify)?;

        let existing: Option<(String, String)> =
            sqlx::query_as("SELECT id, content_hash FROM foods WHERE natural_key = ?")
                .bind(&record.natural_key)
                .fetch_optional(&mut *tx)
                .await
                .map_err(classify)?;

        let (id, outcome) = match existing {
            Some((_, ref hash)) if *hash == content_hash => {
                tx.commit().await.map_err(classify)?;
                return Ok(UpsertOutcome::Unchanged);
            }
            Some((id, _)) => (id, UpsertOutcome::Updated),
            None => (Uuid::new_v4().to_string(), UpsertOutcome::Inserted),
        };

        sqlx::query(
            r#"
            INSERT INTO foods (id, natural_key, name, brand, nutrients_json,
                               serving_amount, serving_unit, source, ingested_at,
                               content_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(natural_key) DO UPDATE SET
                name = excluded.name,
                brand = excluded.brand,
                nutrients_json = excluded.nutrients_json,
                serving_amount = excluded.serving_amount,
                serving_unit = excluded.serving_unit,
                source = excluded.source,
                ingested_at = excluded.ingested_at,
                content_hash = excluded.content_hash,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&id)
        .bind(&record.natural_key)
        .bind(&record.name)
        .bind(&record.brand)
        .bind(&nutrients_json)
        .bind(record.serving.as_ref().map(|s| s.amount))
        .bind(record.serving.as_ref().map(|s| s.unit.clone()))
        .bind(record.source.as_str())
        .bind(record.ingested_at.timestamp())
        .bind(&content_hash)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(classify)?;

        tx.commit().await.map_err(classify)?;
        Ok(outcome)
    }

    async fn read_foods(&self, limit: usize) -> Result<Vec<PersistedFood>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, natural_key, name, brand, nutrients_json, serving_amount,
                   serving_unit, source, ingested_at, content_hash, created_at, updated_at
            FROM foods
            ORDER BY natural_key
            LIMIT ?
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .map_err(classify)?;

        let mut foods = Vec::with_capacity(rows.len());
        for row in rows {
            let source_str: String = row.try_get("source").map_err(classify)?;
            let source = SourceKind::parse(&source_str)
                .ok_or_else(|| StoreError::Record(format!("unknown source '{}'", source_str)))?;
            let nutrients_json: String = row.try_get("nutrients_json").map_err(classify)?;
            let nutrients: BTreeMap<String, f64> = serde_json::from_str(&nutrients_json)
                .map_err(|e| StoreError::Record(e.to_string()))?;
            let amount: Option<f64> = row.try_get("serving_amount").map_err(classify)?;
            let unit: Option<String> = row.try_get("serving_unit").map_err(classify)?;

            foods.push(PersistedFood {
                id: row.try_get("id").map_err(classify)?,
                record: FoodRecord {
                    natural_key: row.try_get("natural_key").map_err(classify)?,
                    name: row.try_get("name").map_err(classify)?,
                    brand: row.try_get("brand").map_err(classify)?,
                    nutrients,
                    serving: amount.zip(unit).map(|(amount, unit)| Serving { amount, unit }),
                    source,
                    ingested_at: from_ts(row.try_get("ingested_at").map_err(classify)?)?,
                },
                content_hash: row.try_get("content_hash").map_err(classify)?,
                created_at: from_ts(row.try_get("created_at").map_err(classify)?)?,
                updated_at: from_ts(row.try_get("updated_at").map_err(classify)?)?,
            });
        }
        Ok(foods)
    }

    async fn count_foods(&self) -> Result<usize, StoreError> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM foods")
            .fetch_one(&self.pool)
            .await
            .map_err(classify)?;
        Ok(n as usize)
    }
}
