//! Blocking HTTP client for the questionnaire web service.
//!
//! Calls are strictly sequential. Any status above 299 becomes
//! [`QsError::Remote`] and aborts the caller's operation; there is no retry.

use crate::backend::{ProposalList, ProposalListing, QuestionnaireBackend};
use crate::config::ClientConfig;
use crate::error::{QsError, Result};
use crate::labels::FormFieldDefinition;
use crate::personnel::{annotate_personnel, PersonnelEntry};
use crate::record::AttributeFragment;
use reqwest::blocking::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

#[derive(Deserialize)]
struct ExperimentsEnvelope {
    experiments: Vec<ProposalListing>,
}

#[derive(Deserialize)]
struct StatusEnvelope {
    experiment_status: Value,
}

#[derive(Deserialize)]
struct PersonnelEnvelope {
    proposals_personnel: Vec<PersonnelEntry>,
}

pub struct QuestionnaireClient {
    http: Client,
    config: ClientConfig,
}

impl QuestionnaireClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http = Client::builder().build().map_err(|e| QsError::Transport {
            url: config.base_url.to_string(),
            message: format!("failed to build http client: {e}"),
        })?;
        Ok(Self::with_http_client(config, http))
    }

    /// Uses a caller-built `reqwest` client (proxies, TLS roots, ...).
    pub fn with_http_client(config: ClientConfig, http: Client) -> Self {
        tracing::debug!(
            base_url = %config.base_url,
            auth = config.auth.kind(),
            "questionnaire client ready"
        );
        Self { http, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                QsError::Config(format!(
                    "questionnaire URL `{}` cannot be a base",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder, url: &Url) -> Result<String> {
        let response = self
            .config
            .auth
            .apply(request)
            .send()
            .map_err(|e| QsError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        let status = response.status().as_u16();
        if status > 299 {
            tracing::warn!(url = %url, status, "questionnaire call failed");
            return Err(QsError::Remote {
                status,
                url: url.to_string(),
            });
        }
        response.text().map_err(|e| QsError::Transport {
            url: url.to_string(),
            message: format!("failed to read response body: {e}"),
        })
    }

    fn parse<T: DeserializeOwned>(url: &Url, body: &str) -> Result<T> {
        serde_json::from_str(body).map_err(|e| QsError::decode(url.as_str(), e.to_string()))
    }

    fn get_json<T: DeserializeOwned>(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<T> {
        let url = self.endpoint(segments)?;
        tracing::debug!(url = %url, "GET");
        let mut request = self.http.get(url.clone());
        if !query.is_empty() {
            request = request.query(query);
        }
        let body = self.send(request, &url)?;
        Self::parse(&url, &body)
    }

    /// Names of the fields in a run that are comboboxes.
    pub fn enumerations(&self, run: &str) -> Result<Value> {
        self.get_json(&["ws", "questionnaire", run, "get_enum_field_names"], &[])
    }

    /// Change log for every proposal in a run: who changed what, when.
    pub fn proposals_status(&self, run: &str) -> Result<Value> {
        let envelope: StatusEnvelope =
            self.get_json(&["ws", "questionnaire", "proposals_status", run], &[])?;
        Ok(envelope.experiment_status)
    }

    /// Personnel for every proposal in a run, with `daysToStart` / `daysToEnd`.
    pub fn proposals_personnel(&self, run: &str) -> Result<Vec<PersonnelEntry>> {
        let now = chrono::Local::now().naive_local();
        let envelope: PersonnelEnvelope =
            self.get_json(&["ws", "questionnaire", "proposals_personnel", run], &[])?;
        let mut entries = envelope.proposals_personnel;
        annotate_personnel(&mut entries, now)?;
        Ok(entries)
    }

    /// Best guess of experiment name (e.g. `xppi0915`) → proposal id (e.g. `LI09`).
    pub fn experiment_to_proposal_ids(&self) -> Result<Value> {
        self.get_json(&["ws", "questionnaire", "getURAWIProposalIds"], &[])
    }

    /// Best guess of proposal id and run period for an experiment name.
    pub fn lookup_by_experiment_name(&self, experiment_name: &str) -> Result<Value> {
        self.get_json(
            &["ws", "questionnaire", "lookupByExperimentName"],
            &[("experiment_name", experiment_name)],
        )
    }

    /// Writes one attribute value. Needs write authorization on the backend.
    pub fn update_proposal_attribute(
        &self,
        run: &str,
        proposal_id: &str,
        attribute_id: &str,
        value: &str,
    ) -> Result<Value> {
        let url = self.endpoint(&["ws", "proposal", "attribute", run, proposal_id])?;
        tracing::info!(url = %url, attribute = attribute_id, "updating proposal attribute");
        let request = self
            .http
            .post(url.clone())
            .form(&[("run_id", run), ("id", attribute_id), ("val", value)]);
        let body = self.send(request, &url)?;
        Self::parse(&url, &body)
    }
}

impl QuestionnaireBackend for QuestionnaireClient {
    fn fetch_proposal_list(&self, run: &str) -> Result<ProposalList> {
        let envelope: ExperimentsEnvelope =
            self.get_json(&["ws", "questionnaire", "experiments", run], &[])?;
        Ok(envelope
            .experiments
            .into_iter()
            .map(|listing| (listing.proposal_id.clone(), listing))
            .collect())
    }

    fn fetch_proposal_attributes(&self, run: &str, proposal_id: &str) -> Result<AttributeFragment> {
        self.get_json(&["ws", "proposal", "attribute", run, proposal_id], &[])
    }

    fn fetch_proposal_status_info(&self, run: &str, proposal_id: &str) -> Result<Value> {
        self.get_json(&["ws", "questionnaire", "urawidata", run, proposal_id], &[])
    }

    fn fetch_form_tab_names(&self, run: &str) -> Result<Vec<String>> {
        self.get_json(&["ws", "questionnaire", run, "tabnames"], &[])
    }

    fn fetch_form_definitions(&self, run: &str, tab_name: &str) -> Result<Vec<FormFieldDefinition>> {
        self.get_json(
            &["ws", "questionnaire", run, "form_data_definitions"],
            &[("form_name", tab_name)],
        )
    }
}
