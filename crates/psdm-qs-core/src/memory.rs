//! In-memory backend for tests and offline replays of captured responses.

use crate::backend::{ProposalList, ProposalListing, QuestionnaireBackend};
use crate::error::{QsError, Result};
use crate::labels::FormFieldDefinition;
use crate::record::AttributeFragment;
use crate::value::AttrValue;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

/// Serves canned responses. Anything not registered answers 404, and
/// [`InMemoryBackend::fail`] forces a status for one call path.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    lists: HashMap<String, ProposalList>,
    attributes: HashMap<String, AttributeFragment>,
    status: HashMap<String, Value>,
    tabs: HashMap<String, Vec<(String, Vec<FormFieldDefinition>)>>,
    failures: HashMap<String, u16>,
    calls: RefCell<Vec<String>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_proposal(
        mut self,
        run: &str,
        proposal_id: &str,
        instrument: &str,
        attributes: AttributeFragment,
        status: Value,
    ) -> Self {
        self.lists.entry(run.to_string()).or_default().insert(
            proposal_id.to_string(),
            ProposalListing {
                proposal_id: proposal_id.to_string(),
                instrument: AttrValue::from(instrument),
            },
        );
        self.attributes
            .insert(format!("attributes/{run}/{proposal_id}"), attributes);
        self.status.insert(format!("status/{run}/{proposal_id}"), status);
        self
    }

    pub fn with_tab(mut self, run: &str, tab_name: &str, definitions: Vec<FormFieldDefinition>) -> Self {
        self.tabs
            .entry(run.to_string())
            .or_default()
            .push((tab_name.to_string(), definitions));
        self
    }

    /// Makes the call identified by `path` (as recorded in [`InMemoryBackend::calls`]) fail.
    pub fn fail(mut self, path: &str, status: u16) -> Self {
        self.failures.insert(path.to_string(), status);
        self
    }

    /// Call paths served so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, path: String) -> Result<String> {
        self.calls.borrow_mut().push(path.clone());
        match self.failures.get(&path) {
            Some(status) => Err(QsError::Remote {
                status: *status,
                url: path,
            }),
            None => Ok(path),
        }
    }
}

fn not_found(path: String) -> QsError {
    QsError::Remote {
        status: 404,
        url: path,
    }
}

impl QuestionnaireBackend for InMemoryBackend {
    fn fetch_proposal_list(&self, run: &str) -> Result<ProposalList> {
        let path = self.record(format!("experiments/{run}"))?;
        self.lists.get(run).cloned().ok_or_else(|| not_found(path))
    }

    fn fetch_proposal_attributes(&self, run: &str, proposal_id: &str) -> Result<AttributeFragment> {
        let path = self.record(format!("attributes/{run}/{proposal_id}"))?;
        self.attributes.get(&path).cloned().ok_or_else(|| not_found(path))
    }

    fn fetch_proposal_status_info(&self, run: &str, proposal_id: &str) -> Result<Value> {
        let path = self.record(format!("status/{run}/{proposal_id}"))?;
        self.status.get(&path).cloned().ok_or_else(|| not_found(path))
    }

    fn fetch_form_tab_names(&self, run: &str) -> Result<Vec<String>> {
        let path = self.record(format!("tabnames/{run}"))?;
        self.tabs
            .get(run)
            .map(|tabs| tabs.iter().map(|(name, _)| name.clone()).collect())
            .ok_or_else(|| not_found(path))
    }

    fn fetch_form_definitions(&self, run: &str, tab_name: &str) -> Result<Vec<FormFieldDefinition>> {
        let path = self.record(format!("form_data_definitions/{run}/{tab_name}"))?;
        self.tabs
            .get(run)
            .and_then(|tabs| tabs.iter().find(|(name, _)| name == tab_name))
            .map(|(_, definitions)| definitions.clone())
            .ok_or_else(|| not_found(path))
    }
}
