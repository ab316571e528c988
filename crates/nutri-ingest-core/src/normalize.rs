//! Normalization of raw rows into canonical [`FoodRecord`]s.
//!
//! Every [`RawRow`], whichever source produced it, goes through the same
//! steps:
//!
//! 1. Resolve canonical fields through the source's [`FieldMap`].
//! 2. Coerce numeric-looking values; anything else becomes absent.
//! 3. Reject rows that are malformed, nameless, or carry a negative nutrient.
//! 4. Resolve in-batch repeats of a natural key with a [`DuplicatePolicy`].
//!
//! Rejections are counted and sampled in the [`NormalizeOutcome`]; a bad row
//! never aborts the batch.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ValidationError;
use crate::field_map::FieldMap;
use crate::models::{natural_key, FoodRecord, RawBody, RawRow, Serving, SourceKind};

/// Tie-break for rows sharing a natural key within one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Identical repeats collapse into one record; repeats with differing
    /// content are all rejected. The result does not depend on row order.
    #[default]
    RejectConflicting,
    /// Keep the first row for each key, drop later ones.
    FirstWins,
    /// Keep the last row for each key, drop earlier ones.
    LastWins,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            DuplicatePolicy::RejectConflicting => "reject-conflicting",
            DuplicatePolicy::FirstWins => "first-wins",
            DuplicatePolicy::LastWins => "last-wins",
        }
    }
}

/// Tunables for [`normalize_rows`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NormalizeOptions {
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    #[serde(default = "default_max_rejection_samples")]
    pub max_rejection_samples: usize,
}

fn default_max_rejection_samples() -> usize {
    20
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::default(),
            max_rejection_samples: default_max_rejection_samples(),
        }
    }
}

/// A row that did not become a record, and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub position: usize,
    pub natural_key: Option<String>,
    pub error: ValidationError,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.position, self.error)
    }
}

/// Result of normalizing one batch.
#[derive(Debug, Clone, Default)]
pub struct NormalizeOutcome {
    /// Unique-by-key records, in order of each key's first appearance.
    pub records: Vec<FoodRecord>,
    pub rows_read: usize,
    /// Rows rejected by validation or as conflicting duplicates.
    pub rejected: usize,
    /// Rows dropped because another row with the same key was kept.
    pub duplicates: usize,
    /// Bounded sample of rejected and dropped rows.
    pub samples: Vec<Rejection>,
}

impl NormalizeOutcome {
    pub fn accepted(&self) -> usize {
        self.records.len()
    }

    fn note(&mut self, limit: usize, rejection: Rejection) {
        if self.samples.len() < limit {
            self.samples.push(rejection);
        }
    }
}

/// Normalize a batch of raw rows from one source.
pub fn normalize_rows(
    rows: &[RawRow],
    source: SourceKind,
    field_map: &FieldMap,
    options: &NormalizeOptions,
    ingested_at: DateTime<Utc>,
) -> NormalizeOutcome {
    let limit = options.max_rejection_samples;
    let mut outcome = NormalizeOutcome {
        rows_read: rows.len(),
        ..Default::default()
    };

    // Group candidates by key, keeping first-appearance order of keys.
    let mut groups: Vec<Vec<(usize, FoodRecord)>> = Vec::new();
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for row in rows {
        match normalize_row(row, source, field_map, ingested_at) {
            Ok(record) => match index_by_key.get(&record.natural_key) {
                Some(&i) => groups[i].push((row.position, record)),
                None => {
                    index_by_key.insert(record.natural_key.clone(), groups.len());
                    groups.push(vec![(row.position, record)]);
                }
            },
            Err(error) => {
                outcome.rejected += 1;
                outcome.note(
                    limit,
                    Rejection {
                        position: row.position,
                        natural_key: None,
                        error,
                    },
                );
            }
        }
    }

    for mut group in groups {
        if group.len() == 1 {
            if let Some((_, record)) = group.pop() {
                outcome.records.push(record);
            }
            continue;
        }

        let key = group[0].1.natural_key.clone();
        let keep = match options.duplicate_policy {
            DuplicatePolicy::FirstWins => Some(0),
            DuplicatePolicy::LastWins => Some(group.len() - 1),
            DuplicatePolicy::RejectConflicting => {
                let first_hash = group[0].1.content_hash();
                if group.iter().all(|(_, r)| r.content_hash() == first_hash) {
                    Some(0)
                } else {
                    None
                }
            }
        };

        match keep {
            Some(kept) => {
                for (i, (position, _)) in group.iter().enumerate() {
                    if i == kept {
                        continue;
                    }
                    outcome.duplicates += 1;
                    outcome.note(
                        limit,
                        Rejection {
                            position: *position,
                            natural_key: Some(key.clone()),
                            error: ValidationError::DuplicateKey(key.clone()),
                        },
                    );
                }
                let (_, record) = group.swap_remove(kept);
                outcome.records.push(record);
            }
            None => {
                for (position, _) in &group {
                    outcome.rejected += 1;
                    outcome.note(
                        limit,
                        Rejection {
                            position: *position,
                            natural_key: Some(key.clone()),
                            error: ValidationError::ConflictingDuplicate(key.clone()),
                        },
                    );
                }
            }
        }
    }

    outcome
}

/// Map one raw row to a canonical record, or say why it cannot be.
pub fn normalize_row(
    row: &RawRow,
    source: SourceKind,
    field_map: &FieldMap,
    ingested_at: DateTime<Utc>,
) -> Result<FoodRecord, ValidationError> {
    if let RawBody::Malformed(reason) = &row.body {
        return Err(ValidationError::Malformed(reason.clone()));
    }

    let name = first_text(row, &field_map.name).ok_or(ValidationError::MissingName)?;
    let brand = first_text(row, &field_map.brand);

    let mut nutrients = BTreeMap::new();
    for entry in &field_map.nutrients {
        let Some(amount) = first_present(row, &entry.keys).and_then(coerce_number) else {
            continue;
        };
        if amount < 0.0 {
            return Err(ValidationError::NegativeNutrient {
                nutrient: entry.nutrient.clone(),
                value: amount,
            });
        }
        // Fold -0.0 into 0.0 so equal content hashes equally.
        nutrients.insert(entry.nutrient.clone(), amount + 0.0);
    }

    let serving = first_present(row, &field_map.serving_amount)
        .and_then(coerce_number)
        .filter(|amount| *amount > 0.0)
        .and_then(|amount| {
            first_text(row, &field_map.serving_unit)
                .or_else(|| field_map.serving_unit_default.clone())
                .map(|unit| Serving { amount, unit })
        });

    Ok(FoodRecord {
        natural_key: natural_key(&name, brand.as_deref()),
        name,
        brand,
        nutrients,
        serving,
        source,
        ingested_at,
    })
}

/// First value under any of `keys` that is not null or blank.
fn first_present<'r>(row: &'r RawRow, keys: &[String]) -> Option<&'r Value> {
    keys.iter()
        .filter_map(|k| row.lookup(k))
        .find(|v| !is_blank(v))
}

/// First value under any of `keys` usable as text. Booleans, arrays and
/// objects are skipped so a later key can still supply the field.
fn first_text(row: &RawRow, keys: &[String]) -> Option<String> {
    keys.iter()
        .filter_map(|k| row.lookup(k))
        .find_map(|v| match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Numbers pass through; numeric strings are parsed; everything else,
/// including NaN and infinities, is absent.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
