use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create the `foods` table and its indexes. Safe to run repeatedly.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS foods (
            id TEXT PRIMARY KEY,
            natural_key TEXT NOT NULL,
            name TEXT NOT NULL,
            brand TEXT,
            nutrients_json TEXT NOT NULL DEFAULT '{}',
            serving_amount REAL,
            serving_unit TEXT,
            source TEXT NOT NULL,
            ingested_at INTEGER NOT NULL,
            content_hash TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL,
            UNIQUE(natural_key)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_foods_source ON foods(source)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_foods_updated_at ON foods(updated_at DESC)")
        .execute(pool)
        .await?;

    Ok(())
}
