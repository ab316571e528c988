//! Remote foods API connector.
//!
//! Issues exactly one GET to `[api].url` and turns the JSON response into
//! raw rows. There is no pagination and no retry: a failed request fails
//! the source.
//!
//! # Configuration
//!
//! ```toml
//! [api]
//! url = "https://foods.example.com/api/v2/search?categories=fruits&page_size=200"
//! rows_pointer = "/products"      # where the row array sits in the response
//! api_key_env = "FOODS_API_KEY"   # optional bearer token
//! timeout_secs = 30
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use nutri_ingest_core::error::SourceError;
use nutri_ingest_core::models::{RawRow, SourceKind};

use crate::config::ApiConfig;
use crate::connector_json::rows_from_value;
use crate::traits::SourceAdapter;

pub struct ApiSource {
    config: ApiConfig,
}

impl ApiSource {
    pub fn new(config: ApiConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SourceAdapter for ApiSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Api
    }

    fn describe(&self) -> String {
        self.config.url.clone()
    }

    async fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
        let origin = self.describe();
        let fetch_err = |e: &dyn std::fmt::Display| SourceError::fetch(SourceKind::Api, &origin, e);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()
            .map_err(|e| fetch_err(&e))?;

        let mut request = client.get(&self.config.url);
        if let Some(var) = &self.config.api_key_env {
            let key = std::env::var(var)
                .map_err(|_| fetch_err(&format!("environment variable {} is not set", var)))?;
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| fetch_err(&e))?;
        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(fetch_err(&format!("HTTP {}: {}", status, body_text)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SourceError::parse(SourceKind::Api, &origin, e))?;
        let rows = rows_from_response(body, &self.config.rows_pointer, &origin)?;
        info!(url = %origin, rows = rows.len(), "fetched rows from API");
        Ok(rows)
    }
}

/// Locate the row collection in a response body and split it into rows.
pub fn rows_from_response(
    body: Value,
    rows_pointer: &str,
    origin: &str,
) -> Result<Vec<RawRow>, SourceError> {
    let located = if rows_pointer.is_empty() {
        body
    } else {
        let mut body = body;
        body.pointer_mut(rows_pointer)
            .map(Value::take)
            .ok_or_else(|| {
                SourceError::parse(
                    SourceKind::Api,
                    origin,
                    format!("response has no value at '{}'", rows_pointer),
                )
            })?
    };
    rows_from_value(located, SourceKind::Api, origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_rows_at_root() {
        let rows = rows_from_response(json!([{"product_name": "Apple"}]), "", "u").unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_rows_under_pointer() {
        let body = json!({"count": 2, "products": [{"product_name": "A"}, {"product_name": "B"}]});
        let rows = rows_from_response(body, "/products", "u").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].lookup("product_name"), Some(&json!("B")));
    }

    #[test]
    fn test_missing_pointer_is_parse_error() {
        let err = rows_from_response(json!({"items": []}), "/products", "u").unwrap_err();
        assert_eq!(err.stage(), "parse");
        assert!(err.to_string().contains("/products"));
    }

    #[tokio::test]
    async fn test_unset_api_key_fails_before_any_request() {
        let source = ApiSource::new(ApiConfig {
            url: "http://127.0.0.1:9/foods".to_string(),
            rows_pointer: String::new(),
            api_key_env: Some("NUTRI_INGEST_TEST_UNSET_KEY".to_string()),
            timeout_secs: 1,
        });
        let err = source.fetch_rows().await.unwrap_err();
        assert_eq!(err.stage(), "fetch");
        assert!(err.to_string().contains("NUTRI_INGEST_TEST_UNSET_KEY"));
    }
}
