//! Structured-document connector.
//!
//! Reads a JSON file holding either an array of row objects or a single row
//! object. Each object becomes one [`RawRow`]; a non-object array element is
//! forwarded as a malformed row. Any other top-level value is a parse error.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use nutri_ingest_core::error::SourceError;
use nutri_ingest_core::models::{RawRow, SourceKind};

use crate::traits::SourceAdapter;

pub struct DocumentSource {
    path: PathBuf,
}

impl DocumentSource {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl SourceAdapter for DocumentSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Document
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
        let origin = self.describe();
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SourceError::fetch(SourceKind::Document, &origin, e))?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| SourceError::parse(SourceKind::Document, &origin, e))?;
        rows_from_value(value, SourceKind::Document, &origin)
    }
}

/// Split a decoded JSON value into raw rows.
pub fn rows_from_value(
    value: Value,
    kind: SourceKind,
    origin: &str,
) -> Result<Vec<RawRow>, SourceError> {
    match value {
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(fields) => RawRow::new(i + 1, fields),
                other => RawRow::malformed(i + 1, format!("expected an object, found {}", type_name(&other))),
            })
            .collect()),
        Value::Object(fields) => Ok(vec![RawRow::new(1, fields)]),
        other => Err(SourceError::parse(
            kind,
            origin,
            format!(
                "expected an array of objects or a single object, found {}",
                type_name(&other)
            ),
        )),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutri_ingest_core::models::RawBody;
    use serde_json::json;

    #[test]
    fn test_array_becomes_rows_in_order() {
        let rows = rows_from_value(
            json!([{"name": "Apple"}, {"name": "Pear"}]),
            SourceKind::Document,
            "t",
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].position, 2);
        assert_eq!(rows[1].lookup("name"), Some(&json!("Pear")));
    }

    #[test]
    fn test_single_object_becomes_one_row() {
        let rows = rows_from_value(json!({"name": "Apple"}), SourceKind::Document, "t").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].position, 1);
    }

    #[test]
    fn test_non_object_element_is_forwarded_as_malformed() {
        let rows = rows_from_value(json!([{"name": "Apple"}, 42]), SourceKind::Document, "t").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(matches!(&rows[1].body, RawBody::Malformed(m) if m.contains("a number")));
    }

    #[test]
    fn test_scalar_document_is_a_parse_error() {
        let err = rows_from_value(json!("nope"), SourceKind::Document, "foods.json").unwrap_err();
        assert!(matches!(err, SourceError::Parse { .. }));
        assert!(err.to_string().contains("foods.json"));
    }

    #[tokio::test]
    async fn test_reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("foods.json");
        std::fs::write(&path, r#"[{"name": "Apple", "calories": 52}]"#).unwrap();
        let rows = DocumentSource::new(path).fetch_rows().await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_a_fetch_error() {
        let err = DocumentSource::new(PathBuf::from("/nonexistent/foods.json"))
            .fetch_rows()
            .await
            .unwrap_err();
        assert_eq!(err.stage(), "fetch");
    }

    #[tokio::test]
    async fn test_invalid_json_is_a_parse_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("foods.json");
        std::fs::write(&path, "[{").unwrap();
        let err = DocumentSource::new(path).fetch_rows().await.unwrap_err();
        assert_eq!(err.stage(), "parse");
    }
}
