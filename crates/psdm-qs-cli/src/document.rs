//! JSON document sink.

use anyhow::{Context, Result};
use colored::Colorize;
use indexmap::IndexMap;
use psdm_qs_core::{build_run_document, fetch_label_mapping, ProposalRecord, QuestionnaireBackend};
use std::fs;
use std::path::Path;

pub fn cmd_json<B: QuestionnaireBackend>(
    backend: &B,
    run: &str,
    use_labels: bool,
    path: &Path,
) -> Result<()> {
    let mapping = if use_labels {
        Some(fetch_label_mapping(backend, run)?)
    } else {
        None
    };
    let document = build_run_document(backend, run, mapping.as_ref())?;
    write_document(&document, path)?;
    println!(
        "{} {} ({} proposals)",
        "Saved data into".green().bold(),
        path.display(),
        document.len()
    );
    Ok(())
}

/// Writes proposal id → record as one JSON object, keys in insertion order.
pub fn write_document(document: &IndexMap<String, ProposalRecord>, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(document)?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
