use std::fmt::Write as _;

use anyhow::Result;
use sd_core::signal::DivergenceReport;
use sd_store::{RecordingEntry, RecordingKey};
use serde::Serialize;

use crate::cli::OutputFormat;

/// Un clip classé face à l'échantillon.
#[derive(Debug, Serialize)]
pub struct RankedEntry {
    pub key: RecordingKey,
    pub report: DivergenceReport,
}

/// Un clip qui n'a pas pu être comparé.
#[derive(Debug, Serialize)]
pub struct FailedEntry {
    pub key: RecordingKey,
    pub error: String,
}

/// Résultat de `rank`, trié par score croissant.
#[derive(Debug, Serialize)]
pub struct Ranking {
    pub sample: RecordingKey,
    pub ranked: Vec<RankedEntry>,
    pub failed: Vec<FailedEntry>,
}

impl Ranking {
    pub fn sort(&mut self) {
        self.ranked
            .sort_by(|a, b| a.report.score.value().total_cmp(&b.report.score.value()));
    }
}

/// Text mode prints the bare score so the output can be piped.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn comparison(report: &DivergenceReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report.score.value().to_string()),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}

/// Confirmation d'un import.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn saved(entry: &RecordingEntry, seconds: f64, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format!(
            "{} → {} ({seconds:.1} s)",
            entry.key, entry.file_name
        )),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(entry)?),
    }
}

/// Listing du catalogue.
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn entries(entries: &[&RecordingEntry], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            for e in entries {
                let _ = writeln!(
                    out,
                    "{:>4}  {}  {}  {} octets",
                    e.id, e.key, e.file_name, e.byte_len
                );
            }
            Ok(out.trim_end().to_string())
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(entries)?),
    }
}

/// # Errors
/// Returns an error if JSON serialization fails.
pub fn ranking(ranking: &Ranking, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => {
            let mut out = format!("Échantillon : {}", ranking.sample);
            for (i, r) in ranking.ranked.iter().enumerate() {
                let _ = write!(out, "\n{:>4}  {}  {}", i + 1, r.report.score, r.key);
            }
            for f in &ranking.failed {
                let _ = write!(out, "\n   -  échec      {}  ({})", f.key, f.error);
            }
            Ok(out)
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(ranking)?),
    }
}
