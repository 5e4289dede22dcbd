//! Column/Label Mapper.
//!
//! Form definitions may carry a reporting label for an attribute. Repeated
//! attributes (`quantity > 1`) without one are grouped under a label derived
//! from their id, so `xraytech-tech-1`, `xraytech-tech-2`, ... share a column
//! name. The mapping is built once per run and drives column order for every
//! output sink.

use crate::error::Result;
use crate::record::ProposalRecord;
use crate::value::AttrValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub const PROPOSAL_COLUMN: (&str, &str) = ("proposal_id", "Proposal");

/// One field of a questionnaire form tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormFieldDefinition {
    pub attribute_id: String,
    #[serde(default)]
    pub reporting_label: Option<String>,
    #[serde(default)]
    pub quantity: Option<AttrValue>,
}

/// attribute-id → reporting label, in first-insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelMapping(IndexMap<String, String>);

impl LabelMapping {
    pub fn insert(&mut self, attribute_id: impl Into<String>, label: impl Into<String>) {
        self.0.insert(attribute_id.into(), label.into());
    }

    pub fn get(&self, attribute_id: &str) -> Option<&str> {
        self.0.get(attribute_id).map(String::as_str)
    }

    /// Label for `attribute_id`, falling back to the id itself.
    pub fn label_for<'a>(&'a self, attribute_id: &'a str) -> &'a str {
        self.get(attribute_id).unwrap_or(attribute_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Folds one tab's definitions into the mapping; same id means last wins.
    pub fn extend_from_definitions(&mut self, definitions: &[FormFieldDefinition]) -> Result<()> {
        for definition in definitions {
            if let Some(label) = &definition.reporting_label {
                self.insert(definition.attribute_id.clone(), label.clone());
            } else if let Some(quantity) = &definition.quantity {
                if quantity.as_int(&definition.attribute_id)? > 1 {
                    self.insert(
                        definition.attribute_id.clone(),
                        group_label(&definition.attribute_id),
                    );
                }
            }
        }
        Ok(())
    }
}

pub fn build_label_mapping(definitions: &[FormFieldDefinition]) -> Result<LabelMapping> {
    let mut mapping = LabelMapping::default();
    mapping.extend_from_definitions(definitions)?;
    Ok(mapping)
}

/// Group label for a repeated attribute.
///
/// Truncates at one character before the last underscore. Without an
/// underscore the last two characters are dropped (`xraytech-tech-2` →
/// `xraytech-tech`). Existing spreadsheet headers depend on this exact
/// boundary.
pub fn group_label(attribute_id: &str) -> String {
    let chars: Vec<char> = attribute_id.chars().collect();
    let len = chars.len() as isize;
    let underscore = chars
        .iter()
        .rposition(|c| *c == '_')
        .map(|i| i as isize)
        .unwrap_or(-1);
    let end = underscore - 1;
    let end = if end < 0 { (len + end).max(0) } else { end.min(len) };
    chars[..end as usize].iter().collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub attribute_id: String,
    pub label: String,
}

/// One entry of an attributes file: `{"attr": ..., "label": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeColumn {
    pub attr: String,
    pub label: String,
}

/// Ordered output columns. The first column is always `proposal_id` / `Proposal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec(Vec<Column>);

impl Default for ColumnSpec {
    fn default() -> Self {
        Self(vec![Column {
            attribute_id: PROPOSAL_COLUMN.0.to_string(),
            label: PROPOSAL_COLUMN.1.to_string(),
        }])
    }
}

impl ColumnSpec {
    pub fn push(&mut self, attribute_id: impl Into<String>, label: impl Into<String>) {
        self.0.push(Column {
            attribute_id: attribute_id.into(),
            label: label.into(),
        });
    }

    /// Proposal column followed by every mapped attribute, in mapping order.
    pub fn from_mapping(mapping: &LabelMapping) -> Self {
        let mut spec = Self::default();
        for (id, label) in mapping.iter() {
            spec.push(id, label);
        }
        spec
    }

    /// Proposal column followed by the configured attributes, in file order.
    pub fn from_attribute_list(attributes: &[AttributeColumn]) -> Self {
        let mut spec = Self::default();
        for attr in attributes {
            spec.push(attr.attr.clone(), attr.label.clone());
        }
        spec
    }

    pub fn columns(&self) -> &[Column] {
        &self.0
    }

    pub fn labels(&self) -> Vec<String> {
        self.0.iter().map(|c| c.label.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One value per column, in column order; absent attributes become empty text.
pub fn project(record: &ProposalRecord, columns: &ColumnSpec) -> Vec<AttrValue> {
    columns
        .columns()
        .iter()
        .map(|c| record.get(&c.attribute_id).cloned().unwrap_or_else(AttrValue::empty))
        .collect()
}

/// Re-keys a record by reporting label. Unmapped ids keep their own name;
/// when two ids share a label the later one wins.
pub fn relabel(record: &ProposalRecord, mapping: &LabelMapping) -> ProposalRecord {
    record
        .iter()
        .map(|(k, v)| (mapping.label_for(k).to_string(), v.clone()))
        .collect()
}
