//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/foods.sqlite"
//!
//! [api]
//! url = "https://foods.example.com/api/v2/search?page_size=200"
//! rows_pointer = "/products"
//! api_key_env = "FOODS_API_KEY"
//! timeout_secs = 30
//!
//! [flat_file]
//! skip_lines = 3
//!
//! [normalize]
//! duplicate_policy = "reject-conflicting"   # or "first-wins", "last-wins"
//! max_rejection_samples = 20
//!
//! [audit]
//! path = "ejercicios_enriquecidos_es.json"
//!
//! # Optional: replace a built-in field map wholesale.
//! # [field_maps.flat_file]
//! # name = ["Food"]
//! # nutrients = [{ nutrient = "calories", keys = ["kcal"] }]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use nutri_ingest_core::audit::AuditOptions;
use nutri_ingest_core::field_map::FieldMaps;
use nutri_ingest_core::normalize::NormalizeOptions;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub flat_file: FlatFileConfig,
    #[serde(default)]
    pub normalize: NormalizeOptions,
    #[serde(default)]
    pub audit: AuditConfig,
    #[serde(default)]
    pub field_maps: FieldMaps,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_busy_timeout_secs() -> u64 {
    5
}
fn default_max_connections() -> u32 {
    1
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    pub url: String,
    /// JSON pointer to the row array inside the response; empty means the root.
    #[serde(default)]
    pub rows_pointer: String,
    /// Name of the environment variable holding a bearer token, if any.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct FlatFileConfig {
    /// Leading non-tabular lines discarded before the header.
    #[serde(default = "default_skip_lines")]
    pub skip_lines: usize,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for FlatFileConfig {
    fn default() -> Self {
        Self {
            skip_lines: default_skip_lines(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_skip_lines() -> usize {
    3
}
fn default_delimiter() -> char {
    ','
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuditConfig {
    #[serde(default = "default_audit_path")]
    pub path: PathBuf,
    /// Field of the top-level object that holds the exercise array.
    #[serde(default = "default_collection_field")]
    pub collection_field: String,
    #[serde(flatten)]
    pub options: AuditOptions,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            path: default_audit_path(),
            collection_field: default_collection_field(),
            options: AuditOptions::default(),
        }
    }
}

fn default_audit_path() -> PathBuf {
    PathBuf::from("ejercicios_enriquecidos_es.json")
}
fn default_collection_field() -> String {
    "exercises".to_string()
}

impl Config {
    /// Config used by commands that can run without a config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/foods.sqlite"),
                busy_timeout_secs: default_busy_timeout_secs(),
                max_connections: default_max_connections(),
            },
            api: None,
            flat_file: FlatFileConfig::default(),
            normalize: NormalizeOptions::default(),
            audit: AuditConfig::default(),
            field_maps: FieldMaps::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.db.max_connections == 0 {
        anyhow::bail!("db.max_connections must be >= 1");
    }

    if let Some(api) = &config.api {
        if !(api.url.starts_with("http://") || api.url.starts_with("https://")) {
            anyhow::bail!("api.url must be an http(s) URL, got '{}'", api.url);
        }
        if api.timeout_secs == 0 {
            anyhow::bail!("api.timeout_secs must be > 0");
        }
        if !api.rows_pointer.is_empty() && !api.rows_pointer.starts_with('/') {
            anyhow::bail!(
                "api.rows_pointer must be empty or a JSON pointer starting with '/', got '{}'",
                api.rows_pointer
            );
        }
    }

    if !config.flat_file.delimiter.is_ascii() {
        anyhow::bail!("flat_file.delimiter must be a single ASCII character");
    }

    if config.audit.options.sample_limit == 0 {
        anyhow::bail!("audit.sample_limit must be >= 1");
    }

    for (label, map) in [
        ("api", &config.field_maps.api),
        ("flat_file", &config.field_maps.flat_file),
        ("document", &config.field_maps.document),
    ] {
        map.validate()
            .map_err(|e| anyhow::anyhow!("field_maps.{}: {}", label, e))?;
    }

    Ok(config)
}
