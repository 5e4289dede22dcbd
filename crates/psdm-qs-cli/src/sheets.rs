//! Online-sheet sink (Google Sheets API v4).
//!
//! Only the configured columns are touched. Each is located by its header text
//! in row 1 (or appended after the last used header cell), cleared, and
//! rewritten from the top. Columns maintained by hand stay as they are.

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use psdm_qs_core::{
    build_run_table, plan_column_updates, AttrValue, AttributeColumn, ColumnSpec, ColumnUpdate,
    QuestionnaireBackend,
};
use reqwest::blocking::{Client, RequestBuilder};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use url::Url;

use crate::google_auth;

pub const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

/// Where column updates land.
pub trait SheetStore {
    /// Row 1 of `sheet`, as displayed. Empty when the sheet is empty.
    fn read_header(&self, sheet: &str) -> Result<Vec<String>>;

    fn clear_ranges(&self, ranges: &[String]) -> Result<()>;

    fn write_columns(&self, updates: &[ColumnUpdate]) -> Result<()>;
}

pub struct GoogleSheetsClient {
    http: Client,
    api_base: Url,
    spreadsheet_id: String,
    token: String,
}

impl GoogleSheetsClient {
    /// Credentials from `GOOGLE_SHEETS_ACCESS_TOKEN`, or minted from the
    /// service-account key named by `CREDENTIALS_JSON`.
    pub fn from_env(spreadsheet_id: &str) -> Result<Self> {
        let http = Client::new();
        let token = google_auth::sheets_access_token(
            &http,
            |key| std::env::var(key).ok(),
            chrono::Utc::now().timestamp(),
        )?;
        Self::new(http, SHEETS_API_URL, spreadsheet_id, &token)
    }

    pub fn new(http: Client, api_base: &str, spreadsheet_id: &str, token: &str) -> Result<Self> {
        let api_base = Url::parse(api_base).with_context(|| format!("invalid API URL `{api_base}`"))?;
        Ok(Self {
            http,
            api_base,
            spreadsheet_id: spreadsheet_id.to_string(),
            token: token.to_string(),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("API URL `{}` cannot take a path", self.api_base))?
            .pop_if_empty()
            .push(&self.spreadsheet_id)
            .extend(segments);
        Ok(url)
    }

    fn send(&self, request: RequestBuilder) -> Result<Value> {
        let response = request.bearer_auth(&self.token).send()?;
        let status = response.status();
        let body = response.text()?;
        if !status.is_success() {
            bail!("Sheets API returned {status}: {body}");
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }
}

impl SheetStore for GoogleSheetsClient {
    fn read_header(&self, sheet: &str) -> Result<Vec<String>> {
        let range = format!("{}!1:1", psdm_qs_core::headers::quote_sheet_name(sheet));
        let url = self.url(&["values", &range])?;
        tracing::debug!(url = %url, "reading header row");
        let response = self.send(self.http.get(url))?;
        Ok(header_cells(&response))
    }

    fn clear_ranges(&self, ranges: &[String]) -> Result<()> {
        if ranges.is_empty() {
            return Ok(());
        }
        let url = self.url(&["values:batchClear"])?;
        self.send(self.http.post(url).json(&json!({ "ranges": ranges })))?;
        Ok(())
    }

    fn write_columns(&self, updates: &[ColumnUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }
        let url = self.url(&["values:batchUpdate"])?;
        self.send(self.http.post(url).json(&batch_update_body(updates)))?;
        Ok(())
    }
}

/// First row of a `values.get` response.
fn header_cells(response: &Value) -> Vec<String> {
    response["values"]
        .get(0)
        .and_then(Value::as_array)
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn cell_value(value: &AttrValue) -> Value {
    match value {
        AttrValue::Null => Value::String(String::new()),
        AttrValue::Structured(v) => Value::String(v.to_string()),
        other => other.to_json(),
    }
}

fn batch_update_body(updates: &[ColumnUpdate]) -> Value {
    let data: Vec<Value> = updates
        .iter()
        .map(|update| {
            let column: Vec<Value> = update.values.iter().map(cell_value).collect();
            json!({
                "range": update.range,
                "majorDimension": "COLUMNS",
                "values": [column],
            })
        })
        .collect();
    json!({ "valueInputOption": "USER_ENTERED", "data": data })
}

/// Reads a JSON array of `{"attr": ..., "label": ...}` objects.
pub fn read_attributes_file(path: &Path) -> Result<Vec<AttributeColumn>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid attributes file {}", path.display()))
}

/// Fetches the run, then rewrites the configured columns. Returns the number
/// of proposal rows written. Nothing is cleared if fetching fails.
pub fn update_sheet<B: QuestionnaireBackend, S: SheetStore>(
    backend: &B,
    store: &S,
    run: &str,
    sheet: &str,
    attributes: &[AttributeColumn],
) -> Result<usize> {
    let columns = ColumnSpec::from_attribute_list(attributes);
    let table = build_run_table(backend, run, &columns)?;
    let header = store.read_header(sheet)?;
    let updates = plan_column_updates(sheet, &header, &columns, &table.rows);
    let ranges: Vec<String> = updates.iter().map(|u| u.clear_range.clone()).collect();
    tracing::info!(sheet, columns = updates.len(), rows = table.rows.len(), "updating sheet");
    store.clear_ranges(&ranges)?;
    store.write_columns(&updates)?;
    Ok(table.rows.len())
}

pub fn cmd_sheet<B: QuestionnaireBackend>(
    backend: &B,
    run: &str,
    attributes_file: &Path,
    spreadsheet_id: &str,
    sheet: &str,
) -> Result<()> {
    let attributes = read_attributes_file(attributes_file)?;
    let store = GoogleSheetsClient::from_env(spreadsheet_id)?;
    let rows = update_sheet(backend, &store, run, sheet, &attributes)?;
    println!(
        "{} {} columns x {} proposals in {}",
        "Updated".green().bold(),
        attributes.len() + 1,
        rows,
        sheet
    );
    Ok(())
}
