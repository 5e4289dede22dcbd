//! Read-only inspection commands and single-attribute writes.

use anyhow::Result;
use colored::Colorize;
use psdm_qs_core::{fetch_label_mapping, QuestionnaireBackend, QuestionnaireClient};
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn cmd_labels<B: QuestionnaireBackend>(backend: &B, run: &str) -> Result<()> {
    let mapping = fetch_label_mapping(backend, run)?;
    eprintln!("{} {} attributes", "Labelled".cyan(), mapping.len());
    print_json(&mapping)
}

pub fn cmd_set_attr(
    client: &QuestionnaireClient,
    run: &str,
    proposal_id: &str,
    attribute_id: &str,
    value: &str,
) -> Result<()> {
    let response = client.update_proposal_attribute(run, proposal_id, attribute_id, value)?;
    eprintln!(
        "{} {proposal_id}/{attribute_id} in {run}",
        "Updated".green().bold()
    );
    print_json(&response)
}
