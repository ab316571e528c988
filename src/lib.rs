//! # Nutri Ingest
//!
//! Nutrition data ingestion into a local SQLite store, plus a completeness
//! audit for the enriched exercise dataset.
//!
//! Foods arrive from one of three sources (a remote API, a delimited flat
//! file, or a JSON document), are normalized into canonical records through
//! explicit per-source field maps, deduplicated by natural key, and upserted
//! idempotently. Every run finishes by reading the store back and comparing
//! counts.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────┐   ┌──────────┐   ┌──────────┐
//! │   Sources    │──▶│ Normalizer │──▶│  Upsert  │──▶│  SQLite  │
//! │ API/CSV/JSON │   │ field maps │   │  + read  │   │  foods   │
//! └──────────────┘   └────────────┘   │   back   │   └──────────┘
//!                                     └──────────┘
//! ```
//!
//! Pure logic (field maps, normalization, upsert coordination, the audit)
//! lives in `nutri-ingest-core`; this crate adds the I/O: connectors,
//! configuration, the SQLite store and the CLI.
//!
//! ## Quick Start
//!
//! ```bash
//! nutri init                            # create database
//! nutri ingest --from-file foods.csv    # ingest a flat-file export
//! nutri ingest                          # ingest from [api].url
//! nutri audit ejercicios.json           # exercise quality report
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`traits`] | Source adapter trait |
//! | [`connector_api`] | Remote API source |
//! | [`connector_csv`] | Delimited flat-file source |
//! | [`connector_json`] | JSON document source |
//! | [`ingest`] | Ingestion pipeline |
//! | [`sqlite_store`] | SQLite-backed food store |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`audit_cmd`] | Exercise quality audit command |

pub mod audit_cmd;
pub mod config;
pub mod connector_api;
pub mod connector_csv;
pub mod connector_json;
pub mod db;
pub mod ingest;
pub mod migrate;
pub mod sqlite_store;
pub mod traits;
