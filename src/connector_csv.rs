//! Flat-file (delimited text) connector.
//!
//! The export this reads starts with provider boilerplate, e.g.
//!
//! ```text
//! Data Provided By MyFoodData.com ...
//! Click "File" ...
//! If you have a google account ...
//! ID,name,Food Group,Calories,Fat (g),...
//! 167512,"Pillsbury Golden Layer Buttermilk Biscuits",Baked Foods,307,13.2,...
//! ```
//!
//! The first `skip_lines` lines are dropped unconditionally, whatever they
//! contain. The next line is the header; every following record becomes a
//! [`RawRow`] keyed by header names. Short records simply lack the trailing
//! keys, extra trailing values are ignored, and a record the CSV reader
//! cannot decode is forwarded as malformed.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::{Map, Value};

use nutri_ingest_core::error::SourceError;
use nutri_ingest_core::models::{RawRow, SourceKind};

use crate::config::FlatFileConfig;
use crate::traits::SourceAdapter;

pub struct FlatFileSource {
    path: PathBuf,
    skip_lines: usize,
    delimiter: u8,
}

impl FlatFileSource {
    pub fn new(path: PathBuf, config: &FlatFileConfig) -> Self {
        Self {
            path,
            skip_lines: config.skip_lines,
            delimiter: config.delimiter as u8,
        }
    }

    /// Same as [`new`](Self::new) but with a tab delimiter, for `.tsv` files.
    pub fn tab_separated(path: PathBuf, config: &FlatFileConfig) -> Self {
        Self {
            delimiter: b'\t',
            ..Self::new(path, config)
        }
    }
}

#[async_trait]
impl SourceAdapter for FlatFileSource {
    fn kind(&self) -> SourceKind {
        SourceKind::FlatFile
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch_rows(&self) -> Result<Vec<RawRow>, SourceError> {
        let origin = self.describe();
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| SourceError::fetch(SourceKind::FlatFile, &origin, e))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| SourceError::parse(SourceKind::FlatFile, &origin, e))?;
        parse_flat_file(&text, self.skip_lines, self.delimiter, &origin)
    }
}

/// Parse delimited text after discarding `skip_lines` leading lines.
pub fn parse_flat_file(
    text: &str,
    skip_lines: usize,
    delimiter: u8,
    origin: &str,
) -> Result<Vec<RawRow>, SourceError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let body = skip_leading_lines(text, skip_lines);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| SourceError::parse(SourceKind::FlatFile, origin, e))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    if headers.is_empty() {
        return Ok(Vec::new());
    }

    let mut rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let position = i + 1;
        match record {
            Ok(record) => {
                let mut fields = Map::new();
                for (header, value) in headers.iter().zip(record.iter()) {
                    fields.insert(header.clone(), Value::String(value.to_string()));
                }
                rows.push(RawRow::new(position, fields));
            }
            Err(e) => rows.push(RawRow::malformed(position, e.to_string())),
        }
    }
    Ok(rows)
}

/// Slice off the first `n` lines (`\n` or `\r\n` terminated).
fn skip_leading_lines(text: &str, n: usize) -> &str {
    let mut rest = text;
    for _ in 0..n {
        match rest.find('\n') {
            Some(idx) => rest = &rest[idx + 1..],
            None => return "",
        }
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;
    use nutri_ingest_core::models::RawBody;
    use serde_json::json;

    const PREAMBLE: &str = "Data Provided By MyFoodData.com\nClick \"File\" then \"Make a copy\"\nIf you have a google account, sign in\n";

    #[test]
    fn test_header_is_fourth_line() {
        let text = format!("{PREAMBLE}name,brand,calories\nApple,Generic,52\n");
        let rows = parse_flat_file(&text, 3, b',', "t").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].lookup("name"), Some(&json!("Apple")));
        assert_eq!(rows[0].lookup("brand"), Some(&json!("Generic")));
        assert_eq!(rows[0].lookup("calories"), Some(&json!("52")));
    }

    #[test]
    fn test_header_only_file_yields_no_rows() {
        let text = format!("{PREAMBLE}name,brand,calories\n");
        assert!(parse_flat_file(&text, 3, b',', "t").unwrap().is_empty());
    }

    #[test]
    fn test_metadata_lines_skipped_even_if_they_look_tabular() {
        let text = "a,b,c\n1,2,3\n4,5,6\nname,calories\nRice,130\n";
        let rows = parse_flat_file(text, 3, b',', "t").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].lookup("name"), Some(&json!("Rice")));
        assert_eq!(rows[0].lookup("a"), None);
    }

    #[test]
    fn test_file_shorter_than_preamble_is_empty() {
        assert!(parse_flat_file("only\ntwo lines", 3, b',', "t")
            .unwrap()
            .is_empty());
        assert!(parse_flat_file("", 3, b',', "t").unwrap().is_empty());
    }

    #[test]
    fn test_crlf_and_quoted_fields() {
        let text = "m1\r\nm2\r\nm3\r\nname,Fat (g)\r\n\"Biscuits, buttermilk\",13.2\r\n";
        let rows = parse_flat_file(text, 3, b',', "t").unwrap();
        assert_eq!(rows[0].lookup("name"), Some(&json!("Biscuits, buttermilk")));
        assert_eq!(rows[0].lookup("Fat (g)"), Some(&json!("13.2")));
    }

    #[test]
    fn test_short_and_long_records() {
        let text = format!("{PREAMBLE}name,brand,calories\nPear\nFig,Acme,74,extra\n");
        let rows = parse_flat_file(&text, 3, b',', "t").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].lookup("brand"), None);
        assert_eq!(rows[1].lookup("calories"), Some(&json!("74")));
        assert!(matches!(&rows[1].body, RawBody::Fields(f) if f.len() == 3));
    }

    #[test]
    fn test_tab_delimiter() {
        let text = format!("{PREAMBLE}name\tcalories\nKale\t49\n");
        let rows = parse_flat_file(&text, 3, b'\t', "t").unwrap();
        assert_eq!(rows[0].lookup("calories"), Some(&json!("49")));
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_a_parse_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("foods.csv");
        std::fs::write(&path, [0xff, 0xfe, 0x00, b'\n']).unwrap();
        let source = FlatFileSource::new(path, &FlatFileConfig::default());
        let err = source.fetch_rows().await.unwrap_err();
        assert_eq!(err.stage(), "parse");
    }
}
