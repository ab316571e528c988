//! `nutri audit`: completeness report over the enriched exercise document.
//!
//! Loads the document, hands the exercise list to
//! [`audit_set`](nutri_ingest_core::audit::audit_set), and prints
//! the report followed by the spot-check record.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::info;

use nutri_ingest_core::audit::{audit_set, read_exercises, QualityReport};

use crate::config::AuditConfig;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Report plus the entries that were not exercise objects.
#[derive(Debug)]
pub struct AuditRun {
    pub report: QualityReport,
    pub unreadable: Vec<(usize, String)>,
}

pub fn load_and_audit(config: &AuditConfig, path: &Path) -> Result<AuditRun, AuditError> {
    let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => AuditError::NotFound(path.to_path_buf()),
        _ => AuditError::Read {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    let doc: Value = serde_json::from_str(&text).map_err(|e| AuditError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;

    let set = read_exercises(&doc, &config.collection_field);
    let report = audit_set(&set, &config.options);
    info!(
        path = %path.display(),
        total = report.total,
        unreadable = report.unreadable,
        "audited exercises"
    );
    Ok(AuditRun {
        report,
        unreadable: set.unreadable,
    })
}

/// CLI entry point. A missing document prints `File not found` and exits 1.
pub fn run_audit(config: &AuditConfig, path: Option<&Path>) -> anyhow::Result<()> {
    let path = path.unwrap_or(&config.path);
    let run = match load_and_audit(config, path) {
        Ok(run) => run,
        Err(AuditError::NotFound(_)) => {
            println!("File not found");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    print_report(&run, config.options.sample_limit)?;
    Ok(())
}

fn print_report(run: &AuditRun, sample_limit: usize) -> anyhow::Result<()> {
    let r = &run.report;
    println!("Total exercises in JSON: {}", r.total);
    println!("--- Quality Report ---");
    println!(
        "Missing/Zero Scores: {} ({:.1}%)",
        r.zero_scores,
        r.zero_scores_pct()
    );
    println!(
        "Generic EMG Proxy: {} ({:.1}%)",
        r.generic_emg,
        r.generic_emg_pct()
    );
    println!("Missing Muscle Targets: {}", r.missing_muscles);
    println!("Invalid IDs: {}", r.invalid_ids);
    if !run.unreadable.is_empty() {
        println!("Unreadable entries: {}", run.unreadable.len());
        for (index, reason) in run.unreadable.iter().take(sample_limit) {
            println!("  [{}] {}", index, reason);
        }
    }

    if !r.error_samples.is_empty() {
        println!("Sample Errors: {:?}", r.error_samples);
    }

    if let Some(target) = &r.spot_check {
        println!();
        println!("--- Sample: {} ---", target.name());
        println!("{}", serde_json::to_string_pretty(target)?);
    }
    Ok(())
}
