//! Extension trait for row sources.
//!
//! The three built-in adapters ([`ApiSource`](crate::connector_api::ApiSource),
//! [`FlatFileSource`](crate::connector_csv::FlatFileSource),
//! [`DocumentSource`](crate::connector_json::DocumentSource)) implement
//! [`SourceAdapter`]; anything else that can produce [`RawRow`]s for one of
//! the known schemas can be fed to the pipeline the same way.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use nutri_ingest::traits::SourceAdapter;
//! use nutri_ingest_core::error::SourceError;
//! use nutri_ingest_core::models::{RawRow, SourceKind};
//!
//! struct Fixed(Vec<RawRow>);
//!
//! #[async_trait]
//! impl SourceAdapter for Fixed {
//!     fn kind(&self) -> SourceKind { SourceKind::Document }
//!     fn describe(&self) -> String { "fixed rows".to_string() }
//!     async fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
//!         Ok(self.0.clone())
//!     }
//! }
//! ```

use async_trait::async_trait;

use nutri_ingest_core::error::SourceError;
use nutri_ingest_core::models::{RawRow, SourceKind};

/// A data source that produces raw rows for normalization.
///
/// # Contract
///
/// - A failure to reach or decode the source as a whole is a [`SourceError`].
/// - A single undecodable row is returned as [`RawRow::malformed`] so the
///   normalizer can count it; it never fails the whole fetch.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which field map applies to the rows.
    fn kind(&self) -> SourceKind;

    /// Human-readable origin (URL or path) for logs and errors.
    fn describe(&self) -> String;

    async fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError>;
}
