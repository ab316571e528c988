//! Completeness audit over the enriched exercise dataset.
//!
//! Independent of the food pipeline: takes already-loaded
//! [`ExerciseRecord`]s and counts the gaps an enrichment pass tends to
//! leave behind (zero scores, fallback EMG classification, missing muscle
//! targets, non-integer ids).

use serde::Deserialize;
use serde_json::Value;

use crate::models::ExerciseRecord;

/// Audit tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuditOptions {
    /// `emg.estado` value meaning "no exercise-specific EMG data".
    #[serde(default = "default_generic_emg_tag")]
    pub generic_emg_tag: String,
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
    /// Substrings that must all appear in `nombre_en` of the spot-check record.
    #[serde(default = "default_spot_check_terms")]
    pub spot_check_terms: Vec<String>,
}

fn default_generic_emg_tag() -> String {
    "proxy_sin_tabla_emg".to_string()
}
fn default_sample_limit() -> usize {
    5
}
fn default_spot_check_terms() -> Vec<String> {
    vec!["Bench Press".to_string(), "Barbell".to_string()]
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            generic_emg_tag: default_generic_emg_tag(),
            sample_limit: default_sample_limit(),
            spot_check_terms: default_spot_check_terms(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QualityReport {
    /// Every entry of the exercise array, readable or not.
    pub total: usize,
    pub zero_scores: usize,
    pub generic_emg: usize,
    pub missing_muscles: usize,
    pub invalid_ids: usize,
    /// Entries that are not JSON objects. Counted in `total`, in no metric.
    pub unreadable: usize,
    /// First few problems, muscle and id issues interleaved in record order.
    pub error_samples: Vec<String>,
    pub spot_check: Option<ExerciseRecord>,
}

impl QualityReport {
    pub fn zero_scores_pct(&self) -> f64 {
        percentage(self.zero_scores, self.total)
    }

    pub fn generic_emg_pct(&self) -> f64 {
        percentage(self.generic_emg, self.total)
    }
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

pub fn audit_exercises(records: &[ExerciseRecord], options: &AuditOptions) -> QualityReport {
    let mut report = QualityReport {
        total: records.len(),
        ..Default::default()
    };
    for ex in records {
        if ex.scores().any(|s| s.as_f64() == Some(0.0)) {
            report.zero_scores += 1;
        }

        if ex.emg_estado() == Some(options.generic_emg_tag.as_str()) {
            report.generic_emg += 1;
        }

        if !ex.has_main_muscles() {
            report.missing_muscles += 1;
            push_sample(&mut report, options, format!("{}: No main muscles", ex.name()));
        }

        if !ex.id().map_or(false, is_integer) {
            report.invalid_ids += 1;
            push_sample(&mut report, options, format!("{}: Invalid ID", ex.name()));
        }
    }

    report.spot_check = records
        .iter()
        .find(|ex| {
            ex.name_str().map_or(false, |name| {
                options
                    .spot_check_terms
                    .iter()
                    .all(|t| name.contains(t.as_str()))
            })
        })
        .cloned();

    report
}

/// Audit a whole document set; unreadable entries count towards `total`.
pub fn audit_set(set: &ExerciseSet, options: &AuditOptions) -> QualityReport {
    let mut report = audit_exercises(&set.records, options);
    report.unreadable = set.unreadable.len();
    report.total += report.unreadable;
    report
}

fn push_sample(report: &mut QualityReport, options: &AuditOptions, msg: String) {
    if report.error_samples.len() < options.sample_limit {
        report.error_samples.push(msg);
    }
}

fn is_integer(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.is_i64() || n.is_u64())
}

/// Exercises read out of a document, plus the entries that could not be read.
#[derive(Debug, Default)]
pub struct ExerciseSet {
    pub records: Vec<ExerciseRecord>,
    /// `(index, reason)` for entries that are not JSON objects.
    pub unreadable: Vec<(usize, String)>,
}

/// Pull the exercise list out of `doc[field]`. A missing field is an empty set.
pub fn read_exercises(doc: &Value, field: &str) -> ExerciseSet {
    let mut set = ExerciseSet::default();
    let Some(items) = doc.get(field).and_then(Value::as_array) else {
        return set;
    };
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::Object(fields) => set.records.push(ExerciseRecord(fields.clone())),
            other => set
                .unreadable
                .push((i, format!("expected an object, found {}", other))),
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn exercise(id: Value, name: &str, scores: Value, estado: &str, muscles: Value) -> ExerciseRecord {
        serde_json::from_value(json!({
            "id": id,
            "nombre_en": name,
            "puntuaciones_1a5": scores,
            "emg": {"estado": estado},
            "musculos_principales": muscles,
        }))
        .unwrap()
    }

    fn five() -> Vec<ExerciseRecord> {
        vec![
            exercise(json!(1), "Barbell Bench Press", json!({"fuerza": 5, "hipertrofia": 4}), "tabla_emg", json!(["pectoral"])),
            exercise(json!(2), "Squat", json!({"fuerza": 0, "hipertrofia": 4}), "tabla_emg", json!(["quads"])),
            exercise(json!(3), "Deadlift", json!({"fuerza": 5, "hipertrofia": 0}), "proxy_sin_tabla_emg", json!(["glutes"])),
            exercise(json!(4), "Row", json!({"fuerza": 3}), "tabla_emg", json!(["lats"])),
            exercise(json!(5), "Curl", json!({"fuerza": 2}), "tabla_emg", json!(["biceps"])),
        ]
    }

    #[test]
    fn test_zero_score_and_generic_emg_percentages() {
        let report = audit_exercises(&five(), &AuditOptions::default());
        assert_eq!(report.total, 5);
        assert_eq!(report.zero_scores, 2);
        assert_eq!(report.zero_scores_pct(), 40.0);
        assert_eq!(report.generic_emg, 1);
        assert_eq!(report.generic_emg_pct(), 20.0);
        assert_eq!(format!("{:.1}", report.zero_scores_pct()), "40.0");
        assert_eq!(report.missing_muscles, 0);
        assert!(report.error_samples.is_empty());
    }

    #[test]
    fn test_spot_check_requires_all_terms() {
        let report = audit_exercises(&five(), &AuditOptions::default());
        assert_eq!(
            report.spot_check.map(|e| e.name()),
            Some("Barbell Bench Press".to_string())
        );

        let records = vec![exercise(json!(1), "Dumbbell Bench Press", json!({}), "x", json!(["chest"]))];
        assert!(audit_exercises(&records, &AuditOptions::default())
            .spot_check
            .is_none());
    }

    #[test]
    fn test_invalid_ids_and_missing_muscles_share_one_sample() {
        let records = vec![
            exercise(json!("7"), "A", json!({}), "x", json!([])),
            exercise(json!(2.5), "B", json!({}), "x", json!(["m"])),
            exercise(json!(3), "C", json!({}), "x", json!(null)),
        ];
        let report = audit_exercises(&records, &AuditOptions::default());
        assert_eq!(report.invalid_ids, 2);
        assert_eq!(report.missing_muscles, 2);
        assert_eq!(
            report.error_samples,
            vec![
                "A: No main muscles",
                "A: Invalid ID",
                "B: Invalid ID",
                "C: No main muscles",
            ]
        );
    }

    #[test]
    fn test_error_samples_are_capped() {
        let records: Vec<_> = (0..10)
            .map(|i| exercise(json!(null), &format!("E{i}"), json!({}), "x", json!([])))
            .collect();
        let report = audit_exercises(&records, &AuditOptions::default());
        assert_eq!(report.missing_muscles, 10);
        assert_eq!(report.invalid_ids, 10);
        assert_eq!(report.error_samples.len(), 5);
    }

    #[test]
    fn test_empty_set_reports_zero_percent() {
        let report = audit_exercises(&[], &AuditOptions::default());
        assert_eq!(report.zero_scores_pct(), 0.0);
        assert_eq!(report.generic_emg_pct(), 0.0);
    }

    #[test]
    fn test_read_exercises_keeps_unknown_fields_and_flags_non_objects() {
        let doc = json!({
            "exercises": [
                {"id": 1, "nombre_en": "Press", "equipo": "barbell"},
                "oops",
                {"id": 2, "nombre_en": "Row", "musculos_principales": "lats"}
            ]
        });
        let set = read_exercises(&doc, "exercises");
        assert_eq!(set.records.len(), 2);
        assert_eq!(set.records[0].0.get("equipo"), Some(&json!("barbell")));
        assert_eq!(set.unreadable.len(), 1);
        assert_eq!(set.unreadable[0].0, 1);
        assert!(set.records[1].has_main_muscles());

        assert!(read_exercises(&json!({}), "exercises").records.is_empty());
    }

    #[test]
    fn test_mistyped_fields_still_count_towards_total() {
        let doc = json!({
            "exercises": [
                {"id": 1, "nombre_en": "Squat", "puntuaciones_1a5": {"fuerza": 0}, "musculos_principales": ["quads"]},
                {"id": 2, "nombre_en": null, "puntuaciones_1a5": {"fuerza": 0}, "musculos_principales": ["lats"]},
                {"id": 3, "nombre_en": "Fly", "puntuaciones_1a5": {"fuerza": 4}, "musculos_principales": "pectoral"},
                {"id": 4, "nombre_en": "Row", "puntuaciones_1a5": {"fuerza": 3}, "emg": {"estado": "proxy_sin_tabla_emg"}, "musculos_principales": ["lats"]},
                {"id": 5, "nombre_en": "Curl", "puntuaciones_1a5": {"fuerza": 2}, "musculos_principales": ["biceps"]}
            ]
        });
        let set = read_exercises(&doc, "exercises");
        assert!(set.unreadable.is_empty());

        let report = audit_set(&set, &AuditOptions::default());
        assert_eq!(report.total, 5);
        assert_eq!(report.zero_scores, 2);
        assert_eq!(format!("{:.1}", report.zero_scores_pct()), "40.0");
        assert_eq!(report.generic_emg, 1);
        assert_eq!(format!("{:.1}", report.generic_emg_pct()), "20.0");
        assert_eq!(report.missing_muscles, 0);
    }

    #[test]
    fn test_non_object_entries_stay_in_the_denominator() {
        let doc = json!({
            "exercises": [
                {"id": 1, "nombre_en": "Squat", "puntuaciones_1a5": {"fuerza": 0}, "musculos_principales": ["quads"]},
                {"id": 2, "nombre_en": "Row", "puntuaciones_1a5": {"fuerza": 3}, "musculos_principales": ["lats"]},
                null,
                7
            ]
        });
        let report = audit_set(&read_exercises(&doc, "exercises"), &AuditOptions::default());
        assert_eq!(report.total, 4);
        assert_eq!(report.unreadable, 2);
        assert_eq!(report.zero_scores_pct(), 25.0);
    }

    #[test]
    fn test_null_name_is_rendered_in_samples() {
        let mut records = vec![exercise(json!("x"), "A", json!({}), "x", json!([]))];
        records[0].0.insert("nombre_en".into(), Value::Null);
        let report = audit_exercises(&records, &AuditOptions::default());
        assert_eq!(report.error_samples, vec!["null: No main muscles", "null: Invalid ID"]);
        assert!(report.spot_check.is_none());
    }
}
