//! Proposal Record Builder.
//!
//! Merges the per-proposal attribute list and the status/urawi document into
//! one flat, insertion-ordered map of attribute-id → value, synthesising the
//! beryllium lens summaries on the way.

pub mod lens;

use crate::error::Result;
use crate::value::AttrValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use lens::{lens_stack_recipe, COMBINED_LENS_KEY, LENS_LOCATIONS};

/// One `{id, val}` pair from the attribute endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeEntry {
    pub id: String,
    pub val: AttrValue,
}

impl AttributeEntry {
    pub fn new(id: impl Into<String>, val: impl Into<AttrValue>) -> Self {
        Self {
            id: id.into(),
            val: val.into(),
        }
    }
}

/// Raw attribute data: category name (`hutch`, `xray`, ...) → `{id, val}` pairs,
/// in the order the backend sent them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeFragment(pub IndexMap<String, Vec<AttributeEntry>>);

impl AttributeFragment {
    pub fn category(&self, name: &str) -> &[AttributeEntry] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push(&mut self, category: &str, entry: AttributeEntry) {
        self.0.entry(category.to_string()).or_default().push(entry);
    }

    /// Every entry across every category, categories in input order.
    pub fn entries(&self) -> impl Iterator<Item = &AttributeEntry> {
        self.0.values().flatten()
    }
}

/// Flattened proposal: attribute-id → value. Always holds `proposal_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalRecord(IndexMap<String, AttrValue>);

impl ProposalRecord {
    /// Seeds `proposal_id` and `Proposal`; downstream consumers expect either key.
    pub fn new(proposal_id: &str) -> Self {
        let mut record = Self::default();
        record.insert("proposal_id", proposal_id);
        record.insert("Proposal", proposal_id);
        record
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttrValue)> {
        self.0.iter()
    }

    /// Overlays `other` onto `self`; keys in `other` win.
    pub fn merge(&mut self, other: ProposalRecord) {
        self.0.extend(other.0);
    }

    pub fn into_inner(self) -> IndexMap<String, AttrValue> {
        self.0
    }
}

impl FromIterator<(String, AttrValue)> for ProposalRecord {
    fn from_iter<I: IntoIterator<Item = (String, AttrValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Status/urawi fields copied into the record when their path exists.
const STATUS_FIELDS: [(&str, &str); 6] = [
    ("info.proposalTitle", "title"),
    ("info.proposalAbstract", "abstract"),
    ("info.spokesPerson.firstName", "Spokesperson First"),
    ("info.spokesPerson.lastName", "Spokesperson Last"),
    ("info.spokesPerson.email", "Spokesperson Email"),
    ("info.nonURAWI_proposal", "nonURAWI_proposal"),
];

/// Walks a dotted path through nested objects. Any missing segment yields `None`.
pub fn lookup_path<'a>(data: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(data, |current, segment| current.as_object()?.get(segment))
}

fn copy_if_present(record: &mut ProposalRecord, status: &Value, path: &str, dest: &str) {
    if let Some(value) = lookup_path(status, path) {
        record.insert(dest, AttrValue::from(value));
    }
}

fn copy_if_truthy(record: &mut ProposalRecord, status: &Value, path: &str, dest: &str) {
    if let Some(value) = lookup_path(status, path).map(AttrValue::from) {
        if value.is_truthy() {
            record.insert(dest, value);
        }
    }
}

/// Builds the flat record for one proposal.
///
/// Later categories overwrite earlier ones on id collision. A non-integer
/// flag under a lens-stack prefix is an error; missing status fields are not.
pub fn build_proposal_record(
    proposal_id: &str,
    attributes: &AttributeFragment,
    status: &Value,
) -> Result<ProposalRecord> {
    let mut record = ProposalRecord::new(proposal_id);

    for entry in attributes.entries() {
        record.insert(entry.id.clone(), entry.val.clone());
    }

    lens::apply_lens_summaries(&mut record, attributes.category("hutch"))?;

    copy_if_truthy(&mut record, status, "info.startDate", "StartDate");
    copy_if_truthy(&mut record, status, "info.stopDate", "EndDate");
    copy_if_present(&mut record, status, "contacts.point_of_contact", "urawi_poc");
    if let Some(poc) = record.get("personnel-poc-sci1").cloned() {
        record.insert("POC", poc);
    }
    for (path, dest) in STATUS_FIELDS {
        copy_if_present(&mut record, status, path, dest);
    }

    Ok(record)
}
