//! # nutri-ingest core
//!
//! Shared, I/O-free logic for nutri-ingest: the canonical food model, the
//! per-source field maps, the normalizer, the store abstraction, the upsert
//! coordinator, and the exercise quality auditor.
//!
//! This crate contains no tokio, sqlx, HTTP, or filesystem I/O. Source
//! adapters and the SQLite store live in the `nutri-ingest` crate.

pub mod audit;
pub mod error;
pub mod field_map;
pub mod models;
pub mod normalize;
pub mod store;
pub mod upsert;
