//! Core data models used throughout nutri-ingest.
//!
//! These types represent the raw rows, canonical food records, and persisted
//! rows that flow through the ingestion pipeline, plus the exercise records
//! read by the quality auditor.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Which of the three source schemas produced a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Api,
    FlatFile,
    Document,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Api => "api",
            SourceKind::FlatFile => "flat-file",
            SourceKind::Document => "document",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "api" => Some(SourceKind::Api),
            "flat-file" => Some(SourceKind::FlatFile),
            "document" => Some(SourceKind::Document),
            _ => None,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded content of a raw row.
#[derive(Debug, Clone, PartialEq)]
pub enum RawBody {
    /// Source keys mapped to their untrusted values, in source order.
    Fields(Map<String, Value>),
    /// The adapter could not decode this row; the reason is kept for rejection.
    Malformed(String),
}

/// Raw item produced by a source adapter before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based position of the row within its source.
    pub position: usize,
    pub body: RawBody,
}

impl RawRow {
    pub fn new(position: usize, fields: Map<String, Value>) -> Self {
        Self {
            position,
            body: RawBody::Fields(fields),
        }
    }

    pub fn malformed(position: usize, reason: impl Into<String>) -> Self {
        Self {
            position,
            body: RawBody::Malformed(reason.into()),
        }
    }

    /// Look up a key, following dots into nested objects when the full key
    /// is not present verbatim.
    pub fn lookup(&self, key: &str) -> Option<&Value> {
        let fields = match &self.body {
            RawBody::Fields(f) => f,
            RawBody::Malformed(_) => return None,
        };
        if let Some(v) = fields.get(key) {
            return Some(v);
        }
        let mut parts = key.split('.');
        let mut current = fields.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

/// Serving size attached to a food record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Serving {
    pub amount: f64,
    pub unit: String,
}

/// Canonical food record produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodRecord {
    pub natural_key: String,
    pub name: String,
    pub brand: Option<String>,
    pub nutrients: BTreeMap<String, f64>,
    pub serving: Option<Serving>,
    pub source: SourceKind,
    pub ingested_at: DateTime<Utc>,
}

impl FoodRecord {
    /// SHA-256 over every canonical field except `ingested_at`.
    ///
    /// Two records with the same hash carry the same content, so re-applying
    /// one over the other is a no-op.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.natural_key.as_bytes());
        hasher.update([0]);
        hasher.update(self.name.as_bytes());
        hasher.update([0]);
        hasher.update(self.brand.as_deref().unwrap_or("").as_bytes());
        hasher.update([0]);
        for (name, amount) in &self.nutrients {
            hasher.update(name.as_bytes());
            hasher.update(amount.to_le_bytes());
        }
        hasher.update([0]);
        if let Some(serving) = &self.serving {
            hasher.update(serving.amount.to_le_bytes());
            hasher.update(serving.unit.as_bytes());
        }
        hasher.update([0]);
        hasher.update(self.source.as_str().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Derive the natural key from a name and optional brand.
///
/// Case-insensitive and whitespace-collapsed, so `"  Apple "` / `"GENERIC"`
/// and `"apple"` / `"generic"` map to the same key.
pub fn natural_key(name: &str, brand: Option<&str>) -> String {
    format!(
        "{}|{}",
        escape_part(&collapse_lower(name)),
        brand.map(|b| escape_part(&collapse_lower(b))).unwrap_or_default()
    )
}

/// Escape backslashes and `|` so the joined key splits back unambiguously.
fn escape_part(s: &str) -> String {
    s.replace('\\', "\\\\").replace('|', "\\|")
}

fn collapse_lower(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// A food row as held by a store.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedFood {
    pub id: String,
    pub record: FoodRecord,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One exercise from the enriched exercise document.
///
/// Kept as the raw JSON object, in document order. Every field is read
/// leniently through the accessors: the auditor's job is to report defects,
/// so a null name or a mistyped muscle list must still produce a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExerciseRecord(pub Map<String, Value>);

impl ExerciseRecord {
    pub fn id(&self) -> Option<&Value> {
        self.0.get("id")
    }

    /// `nombre_en` as display text; non-string values are rendered as JSON.
    pub fn name(&self) -> String {
        match self.0.get("nombre_en") {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    /// `nombre_en` only when it is actually a string.
    pub fn name_str(&self) -> Option<&str> {
        self.0.get("nombre_en").and_then(Value::as_str)
    }

    /// Values of the `puntuaciones_1a5` object; empty when absent or not an object.
    pub fn scores(&self) -> impl Iterator<Item = &Value> {
        self.0
            .get("puntuaciones_1a5")
            .and_then(Value::as_object)
            .into_iter()
            .flat_map(|m| m.values())
    }

    /// `emg.estado`, when it is a string.
    pub fn emg_estado(&self) -> Option<&str> {
        self.0.get("emg")?.get("estado")?.as_str()
    }

    /// True when `musculos_principales` is present and non-empty, whatever its type.
    pub fn has_main_muscles(&self) -> bool {
        self.0.get("musculos_principales").map_or(false, is_truthy)
    }
}

/// JSON truthiness: null, false, zero and empty strings/arrays/objects are false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
