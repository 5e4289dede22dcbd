//! Questionnaire client core.
//!
//! Pulls per-proposal metadata from the questionnaire web service and turns
//! it into flat, labelled rows:
//! - [`record`]: flatten attribute/status JSON into a [`ProposalRecord`]
//!   (including the derived beryllium lens summaries)
//! - [`labels`]: reporting-label mapping and column projection
//! - [`headers`]: column lookup by existing header text for incremental sheet updates
//! - [`client`]: blocking HTTP transport implementing [`QuestionnaireBackend`]
//! - [`config`] / [`kerberos`]: credentials from options, environment or the Kerberos ticket cache
//! - [`export`]: run-level table and document exports
//!
//! Writers for concrete sinks (xlsx, JSON files, online sheets) live in the CLI.

pub mod auth;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod headers;
pub mod kerberos;
pub mod labels;
pub mod memory;
pub mod personnel;
pub mod record;
pub mod value;

pub use auth::AuthContext;
pub use backend::{
    fetch_label_mapping, fetch_proposal_details, ProposalList, ProposalListing,
    QuestionnaireBackend,
};
pub use client::QuestionnaireClient;
pub use config::{ClientConfig, ConnectionOptions};
pub use error::{QsError, Result};
pub use export::{build_run_document, build_run_table, RunTable};
pub use headers::{column_letter, match_columns, plan_column_updates, ColumnUpdate};
pub use labels::{
    build_label_mapping, group_label, project, relabel, AttributeColumn, Column, ColumnSpec,
    FormFieldDefinition, LabelMapping,
};
pub use memory::InMemoryBackend;
pub use record::{build_proposal_record, AttributeEntry, AttributeFragment, ProposalRecord};
pub use value::AttrValue;
