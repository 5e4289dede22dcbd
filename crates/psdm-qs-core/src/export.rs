//! Run-level exports: one pass over every proposal of a run, shaped for a sink.
//!
//! Proposals are fetched one at a time. The first failure aborts the whole
//! run and nothing partial is returned.

use crate::backend::{fetch_proposal_details, QuestionnaireBackend};
use crate::error::Result;
use crate::labels::{project, relabel, ColumnSpec, LabelMapping};
use crate::record::ProposalRecord;
use crate::value::AttrValue;
use indexmap::IndexMap;
use serde::Serialize;

/// Header row plus one projected row per proposal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<AttrValue>>,
}

/// Listing fields overlaid with the proposal's flattened details.
fn merged_record<B: QuestionnaireBackend + ?Sized>(
    backend: &B,
    run: &str,
    proposal_id: &str,
    seed: ProposalRecord,
    mapping: Option<&LabelMapping>,
) -> Result<ProposalRecord> {
    tracing::info!(run, proposal_id, "getting details for proposal");
    let details = fetch_proposal_details(backend, run, proposal_id)?;
    let details = match mapping {
        Some(mapping) => relabel(&details, mapping),
        None => details,
    };
    let mut record = seed;
    record.merge(details);
    Ok(record)
}

/// Tabular export: proposals in sorted id order, columns as given.
pub fn build_run_table<B: QuestionnaireBackend + ?Sized>(
    backend: &B,
    run: &str,
    columns: &ColumnSpec,
) -> Result<RunTable> {
    let proposals = backend.fetch_proposal_list(run)?;
    let mut ids: Vec<&String> = proposals.keys().collect();
    ids.sort();

    let mut rows = Vec::with_capacity(ids.len());
    for id in ids {
        let record = merged_record(backend, run, id, proposals[id].to_record(), None)?;
        rows.push(project(&record, columns));
    }
    Ok(RunTable {
        header: columns.labels(),
        rows,
    })
}

/// Document export: proposal id → full record, in backend list order.
/// With a mapping, detail keys are renamed to their reporting labels.
pub fn build_run_document<B: QuestionnaireBackend + ?Sized>(
    backend: &B,
    run: &str,
    mapping: Option<&LabelMapping>,
) -> Result<IndexMap<String, ProposalRecord>> {
    let proposals = backend.fetch_proposal_list(run)?;
    let mut document = IndexMap::with_capacity(proposals.len());
    for (id, listing) in &proposals {
        let record = merged_record(backend, run, id, listing.to_record(), mapping)?;
        document.insert(id.clone(), record);
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use crate::record::AttributeFragment;
    use crate::QsError;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> AttributeFragment {
        serde_json::from_value(value).unwrap()
    }

    fn backend() -> InMemoryBackend {
        InMemoryBackend::new()
            .with_proposal(
                "run16",
                "LR02",
                "XPP",
                attrs(json!({"xray": [{"id": "xray-energy-1", "val": "9.5"}]})),
                json!({"info": {"proposalTitle": "Second"}}),
            )
            .with_proposal(
                "run16",
                "LR01",
                "MFX",
                attrs(json!({"xray": [{"id": "xraytech-tech-1", "val": "SAXS"}]})),
                json!({"info": {"proposalTitle": "First"}}),
            )
    }

    #[test]
    fn table_rows_are_sorted_and_projected() {
        let mut columns = ColumnSpec::default();
        columns.push("Instrument", "Instrument");
        columns.push("xray-energy-1", "Energy");
        columns.push("title", "Title");

        let table = build_run_table(&backend(), "run16", &columns).unwrap();
        assert_eq!(table.header, vec!["Proposal", "Instrument", "Energy", "Title"]);
        assert_eq!(
            table.rows,
            vec![
                vec![
                    AttrValue::from("LR01"),
                    AttrValue::from("MFX"),
                    AttrValue::empty(),
                    AttrValue::from("First")
                ],
                vec![
                    AttrValue::from("LR02"),
                    AttrValue::from("XPP"),
                    AttrValue::from("9.5"),
                    AttrValue::from("Second")
                ],
            ]
        );
    }

    #[test]
    fn document_keeps_list_order_and_relabels() {
        let mut mapping = LabelMapping::default();
        mapping.insert("xraytech-tech-1", "xraytech-tech");

        let document = build_run_document(&backend(), "run16", Some(&mapping)).unwrap();
        let ids: Vec<_> = document.keys().cloned().collect();
        assert_eq!(ids, vec!["LR02", "LR01"]);
        let lr01 = &document["LR01"];
        assert_eq!(lr01.get("Instrument"), Some(&AttrValue::from("MFX")));
        assert_eq!(lr01.get("xraytech-tech"), Some(&AttrValue::from("SAXS")));
        assert!(!lr01.contains_key("xraytech-tech-1"));
    }

    #[test]
    fn remote_failure_aborts_the_run() {
        let backend = backend().fail("status/run16/LR01", 500);
        let err = build_run_table(&backend, "run16", &ColumnSpec::default()).unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(matches!(err, QsError::Remote { .. }));
        // LR02 sorts after LR01 and is never requested.
        assert!(!backend.calls().iter().any(|c| c.contains("LR02")));
    }
}
