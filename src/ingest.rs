//! Ingestion pipeline orchestration.
//!
//! Coordinates the full run: source adapter → normalizer → upsert
//! coordinator → read-back verification. Each stage is a separate method on
//! [`Pipeline`] taking and returning plain values, so any stage can be
//! exercised on its own.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{info, warn};

use nutri_ingest_core::error::{PersistenceError, SourceError};
use nutri_ingest_core::models::{FoodRecord, RawRow, SourceKind};
use nutri_ingest_core::normalize::{normalize_rows, NormalizeOutcome};
use nutri_ingest_core::store::FoodStore;
use nutri_ingest_core::upsert::{upsert_records, verify_read_back, UpsertReport, Verification};

use crate::config::Config;
use crate::connector_api::ApiSource;
use crate::connector_csv::FlatFileSource;
use crate::connector_json::DocumentSource;
use crate::db;
use crate::migrate;
use crate::sqlite_store::SqliteStore;
use crate::traits::SourceAdapter;

/// Fatal failure of an ingestion run, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("source {stage} failed: {source}")]
    Source {
        stage: &'static str,
        #[source]
        source: SourceError,
    },
    #[error("persistence failed: {0}")]
    Persistence(#[from] PersistenceError),
    #[error("no [api] section configured; pass --from-file or configure the API")]
    ApiNotConfigured,
}

impl From<SourceError> for IngestError {
    fn from(source: SourceError) -> Self {
        IngestError::Source {
            stage: source.stage(),
            source,
        }
    }
}

/// Everything a run reports back to the caller.
#[derive(Debug, Clone)]
pub struct IngestSummary {
    pub source: SourceKind,
    pub origin: String,
    pub normalize: NormalizeOutcome,
    pub upsert: UpsertReport,
    pub verification: Verification,
}

/// Pick the adapter for a run: API when no file is given, otherwise by
/// file extension (`.csv`/`.tsv` → flat file, anything else → document).
pub fn select_source(
    config: &Config,
    from_file: Option<&Path>,
) -> Result<Box<dyn SourceAdapter>, IngestError> {
    let Some(path) = from_file else {
        let api = config.api.clone().ok_or(IngestError::ApiNotConfigured)?;
        return Ok(Box::new(ApiSource::new(api)));
    };
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let path: PathBuf = path.to_path_buf();
    Ok(match ext.as_str() {
        "csv" => Box::new(FlatFileSource::new(path, &config.flat_file)),
        "tsv" => Box::new(FlatFileSource::tab_separated(path, &config.flat_file)),
        _ => Box::new(DocumentSource::new(path)),
    })
}

/// One ingestion run against one store.
pub struct Pipeline<'a> {
    config: &'a Config,
    store: &'a dyn FoodStore,
    ingested_at: DateTime<Utc>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, store: &'a dyn FoodStore) -> Self {
        // Whole seconds: the store keeps second precision.
        let now = Utc::now();
        let ingested_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        Self {
            config,
            store,
            ingested_at,
        }
    }

    /// Pin the run timestamp (tests, replays).
    pub fn with_ingested_at(mut self, ingested_at: DateTime<Utc>) -> Self {
        self.ingested_at = ingested_at;
        self
    }

    pub async fn adapt(&self, source: &dyn SourceAdapter) -> Result<Vec<RawRow>, IngestError> {
        let rows = source.fetch_rows().await?;
        info!(source = %source.kind(), origin = %source.describe(), rows = rows.len(), "read source");
        Ok(rows)
    }

    pub fn normalize(&self, kind: SourceKind, rows: &[RawRow]) -> NormalizeOutcome {
        let outcome = normalize_rows(
            rows,
            kind,
            self.config.field_maps.for_source(kind),
            &self.config.normalize,
            self.ingested_at,
        );
        info!(
            read = outcome.rows_read,
            accepted = outcome.accepted(),
            rejected = outcome.rejected,
            duplicates = outcome.duplicates,
            policy = self.config.normalize.duplicate_policy.as_str(),
            "normalized rows"
        );
        for sample in &outcome.samples {
            warn!(position = sample.position, "{}", sample.error);
        }
        outcome
    }

    pub async fn upsert(&self, records: &[FoodRecord]) -> Result<UpsertReport, IngestError> {
        let report = upsert_records(self.store, records).await?;
        info!(
            inserted = report.inserted,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failures.len(),
            "upserted records"
        );
        Ok(report)
    }

    pub async fn verify(&self, written: usize) -> Result<Verification, IngestError> {
        Ok(verify_read_back(self.store, written).await?)
    }

    /// adapt → normalize → upsert → verify.
    pub async fn run(&self, source: &dyn SourceAdapter) -> Result<IngestSummary, IngestError> {
        let rows = self.adapt(source).await?;
        let normalize = self.normalize(source.kind(), &rows);
        let upsert = self.upsert(&normalize.records).await?;
        let verification = self.verify(upsert.persisted()).await?;
        Ok(IngestSummary {
            source: source.kind(),
            origin: source.describe(),
            normalize,
            upsert,
            verification,
        })
    }
}

/// CLI entry point for `nutri ingest`.
pub async fn run_ingest(config: &Config, from_file: Option<&Path>) -> anyhow::Result<()> {
    let source = select_source(config, from_file)?;

    let pool = db::connect(config).await?;
    migrate::create_schema(&pool).await?;
    let store = SqliteStore::new(pool);

    let result = Pipeline::new(config, &store).run(source.as_ref()).await;
    store.pool().close().await;
    let summary = result?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &IngestSummary) {
    let n = &summary.normalize;
    let u = &summary.upsert;
    let v = &summary.verification;

    println!("ingest {} ({})", summary.source, summary.origin);
    println!("  rows read: {}", n.rows_read);
    println!("  rows normalized: {}", n.accepted());
    println!("  rows rejected: {}", n.rejected);
    println!("  duplicates dropped: {}", n.duplicates);
    for sample in &n.samples {
        println!("    {}", sample);
    }
    println!(
        "  persisted: {} (inserted {}, updated {}, unchanged {})",
        u.persisted(),
        u.inserted,
        u.updated,
        u.unchanged
    );
    println!("  persistence failures: {}", u.failures.len());
    for failure in &u.failures {
        println!("    {}: {}", failure.natural_key, failure.reason);
    }
    println!(
        "  read back: {} of {}{}",
        v.read_back,
        v.expected,
        if v.matched() { "" } else { " (MISMATCH)" }
    );
    println!(
        "Ingested {} rows. Store now holds {} rows (queried).",
        u.persisted(),
        v.read_back
    );
    println!("ok");
}
