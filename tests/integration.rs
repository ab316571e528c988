use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn nutri_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("nutri");
    path
}

const PREAMBLE: &str = "Data Provided By MyFoodData.com\n\
Click \"File\" then \"Make a copy\"\n\
If you have a google account, sign in first\n";

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();
    fs::create_dir_all(root.join("data")).unwrap();

    fs::write(
        root.join("foods.csv"),
        format!("{PREAMBLE}name,brand,calories\nApple,Generic,52\n"),
    )
    .unwrap();
    fs::write(
        root.join("header_only.csv"),
        format!("{PREAMBLE}name,brand,calories\n"),
    )
    .unwrap();
    fs::write(
        root.join("foods.json"),
        r#"[
            {"name": "Banana", "brand": "Generic", "nutrients": {"calories": "89", "protein_g": 1.1}},
            {"name": "Oats", "brand": "Acme", "nutrients": {"calories": 389}, "serving": {"amount": 40, "unit": "g"}},
            {"name": "", "nutrients": {"calories": 10}},
            {"name": "Rice", "nutrients": {"calories": -5}}
        ]"#,
    )
    .unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/foods.sqlite"

[flat_file]
skip_lines = 3
"#,
        root.display()
    );

    let config_path = config_dir.join("nutri.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_nutri_output(config_path: &Path, args: &[&str]) -> Output {
    let binary = nutri_binary();
    Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run nutri binary at {:?}: {}", binary, e))
}

fn run_nutri(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let output = run_nutri_output(config_path, args);
    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

fn data_file(config_path: &Path, name: &str) -> String {
    config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join(name)
        .to_str()
        .unwrap()
        .to_string()
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_nutri(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(Path::new(&data_file(&config_path, "data/foods.sqlite")).exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_nutri(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_nutri(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_ingest_flat_file() {
    let (_tmp, config_path) = setup_test_env();
    let csv = data_file(&config_path, "foods.csv");

    let (stdout, stderr, success) = run_nutri(&config_path, &["ingest", "--from-file", &csv]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("rows read: 1"));
    assert!(stdout.contains("rows normalized: 1"));
    assert!(stdout.contains("inserted 1"));
    assert!(stdout.contains("read back: 1 of 1"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_ingest_idempotent_no_duplicates() {
    let (_tmp, config_path) = setup_test_env();
    let csv = data_file(&config_path, "foods.csv");

    let (stdout1, _, success1) = run_nutri(&config_path, &["ingest", "--from-file", &csv]);
    assert!(success1);
    assert!(stdout1.contains("inserted 1"));

    let (stdout2, stderr2, success2) = run_nutri(&config_path, &["ingest", "--from-file", &csv]);
    assert!(success2, "second ingest failed: {}", stderr2);
    assert!(stdout2.contains("inserted 0"));
    assert!(stdout2.contains("unchanged 1"));
    assert!(stdout2.contains("Store now holds 1 rows"));
}

#[test]
fn test_ingest_header_only_file() {
    let (_tmp, config_path) = setup_test_env();
    let csv = data_file(&config_path, "header_only.csv");

    let (stdout, stderr, success) = run_nutri(&config_path, &["ingest", "--from-file", &csv]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("rows normalized: 0"));
    assert!(stdout.contains("persisted: 0"));
}

#[test]
fn test_ingest_document_rejects_bad_rows() {
    let (_tmp, config_path) = setup_test_env();
    let json = data_file(&config_path, "foods.json");

    let (stdout, stderr, success) = run_nutri(&config_path, &["ingest", "--from-file", &json]);
    assert!(success, "ingest failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("rows read: 4"));
    assert!(stdout.contains("rows normalized: 2"));
    assert!(stdout.contains("rows rejected: 2"));
    assert!(stdout.contains("read back: 2 of 2"));
}

#[test]
fn test_ingest_missing_file_fails() {
    let (_tmp, config_path) = setup_test_env();
    let missing = data_file(&config_path, "nope.csv");

    let (stdout, stderr, success) = run_nutri(&config_path, &["ingest", "--from-file", &missing]);
    assert!(!success, "ingest should fail: stdout={}", stdout);
    assert!(stderr.contains("nope.csv"));
    assert!(!stdout.contains("ok"));
}

#[test]
fn test_ingest_without_api_config_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_nutri(&config_path, &["ingest"]);
    assert!(!success);
    assert!(stderr.contains("api"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("absent.toml");

    let (_, stderr, success) = run_nutri(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}

#[test]
fn test_audit_missing_file_exits_1() {
    let (_tmp, config_path) = setup_test_env();
    let missing = data_file(&config_path, "ejercicios.json");

    let output = run_nutri_output(&config_path, &["audit", &missing]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("File not found"));
}

#[test]
fn test_audit_report() {
    let (_tmp, config_path) = setup_test_env();
    let path = data_file(&config_path, "ejercicios.json");
    fs::write(
        &path,
        r#"{"exercises": [
            {"id": 1, "nombre_en": "Barbell Bench Press", "puntuaciones_1a5": {"fuerza": 5}, "emg": {"estado": "tabla_emg"}, "musculos_principales": ["pectoral"]},
            {"id": 2, "nombre_en": "Squat", "puntuaciones_1a5": {"fuerza": 0}, "emg": {"estado": "tabla_emg"}, "musculos_principales": ["quads"]},
            {"id": 3, "nombre_en": "Deadlift", "puntuaciones_1a5": {"fuerza": 0}, "emg": {"estado": "proxy_sin_tabla_emg"}, "musculos_principales": ["glutes"]},
            {"id": 4, "nombre_en": "Row", "puntuaciones_1a5": {"fuerza": 3}, "emg": {"estado": "tabla_emg"}, "musculos_principales": ["lats"]},
            {"id": "5", "nombre_en": "Curl", "puntuaciones_1a5": {"fuerza": 2}, "emg": {"estado": "tabla_emg"}, "musculos_principales": []}
        ]}"#,
    )
    .unwrap();

    let (stdout, stderr, success) = run_nutri(&config_path, &["audit", &path]);
    assert!(success, "audit failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Total exercises in JSON: 5"));
    assert!(stdout.contains("Missing/Zero Scores: 2 (40.0%)"));
    assert!(stdout.contains("Generic EMG Proxy: 1 (20.0%)"));
    assert!(stdout.contains("Missing Muscle Targets: 1"));
    assert!(stdout.contains("Invalid IDs: 1"));
    assert!(stdout.contains("Curl: No main muscles"));
    assert!(stdout.contains("--- Sample: Barbell Bench Press ---"));
}

#[test]
fn test_audit_runs_without_config_file() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("ej.json");
    fs::write(&path, r#"{"exercises": []}"#).unwrap();

    let (stdout, stderr, success) = run_nutri(
        &tmp.path().join("absent.toml"),
        &["audit", path.to_str().unwrap()],
    );
    assert!(success, "audit failed: {}", stderr);
    assert!(stdout.contains("Total exercises in JSON: 0"));
    assert!(stdout.contains("(0.0%)"));
}
