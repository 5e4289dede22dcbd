//! The questionnaire backend as seen by the exporters.
//!
//! The HTTP client implements this trait; tests and offline tools plug in
//! their own implementation.

use crate::error::Result;
use crate::labels::{FormFieldDefinition, LabelMapping};
use crate::record::{build_proposal_record, AttributeFragment, ProposalRecord};
use crate::value::AttrValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One experiment from the run's proposal list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalListing {
    pub proposal_id: String,
    pub instrument: AttrValue,
}

impl ProposalListing {
    /// Seed record for exports: `Instrument` and `proposal_id`.
    pub fn to_record(&self) -> ProposalRecord {
        let mut record = ProposalRecord::default();
        record.insert("Instrument", self.instrument.clone());
        record.insert("proposal_id", self.proposal_id.clone());
        record
    }
}

/// Proposal list keyed by proposal id, in backend order.
pub type ProposalList = IndexMap<String, ProposalListing>;

pub trait QuestionnaireBackend {
    fn fetch_proposal_list(&self, run: &str) -> Result<ProposalList>;

    fn fetch_proposal_attributes(&self, run: &str, proposal_id: &str) -> Result<AttributeFragment>;

    /// Status/urawi document with `info` and `contacts` sections.
    fn fetch_proposal_status_info(&self, run: &str, proposal_id: &str) -> Result<Value>;

    fn fetch_form_tab_names(&self, run: &str) -> Result<Vec<String>>;

    fn fetch_form_definitions(&self, run: &str, tab_name: &str) -> Result<Vec<FormFieldDefinition>>;
}

/// Fetches and flattens one proposal. Either fetch failing aborts.
pub fn fetch_proposal_details<B: QuestionnaireBackend + ?Sized>(
    backend: &B,
    run: &str,
    proposal_id: &str,
) -> Result<ProposalRecord> {
    let attributes = backend.fetch_proposal_attributes(run, proposal_id)?;
    let status = backend.fetch_proposal_status_info(run, proposal_id)?;
    build_proposal_record(proposal_id, &attributes, &status)
}

/// Label mapping for a run, accumulated across every form tab in order.
pub fn fetch_label_mapping<B: QuestionnaireBackend + ?Sized>(
    backend: &B,
    run: &str,
) -> Result<LabelMapping> {
    let mut mapping = LabelMapping::default();
    for tab in backend.fetch_form_tab_names(run)? {
        tracing::info!(run, tab = %tab, "getting form data");
        let definitions = backend.fetch_form_definitions(run, &tab)?;
        mapping.extend_from_definitions(&definitions)?;
    }
    Ok(mapping)
}
