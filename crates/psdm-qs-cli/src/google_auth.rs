//! Access tokens for the Sheets API.
//!
//! A ready token in `GOOGLE_SHEETS_ACCESS_TOKEN` wins. Otherwise the
//! service-account key named by `CREDENTIALS_JSON` signs an RS256 JWT grant,
//! which is exchanged at the key's `token_uri` (OAuth2 JWT bearer flow).

use anyhow::{bail, Context, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const ACCESS_TOKEN_ENV: &str = "GOOGLE_SHEETS_ACCESS_TOKEN";
pub const CREDENTIALS_ENV: &str = "CREDENTIALS_JSON";
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const GRANT_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// The fields of a service-account key file this client needs.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read service-account key {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("invalid service-account key {}", path.display()))
    }
}

#[derive(Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Signed JWT asserting `key` for `scope`, issued at `now` (Unix seconds).
pub fn signed_grant(key: &ServiceAccountKey, scope: &str, now: i64) -> Result<String> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();
    let claims = GrantClaims {
        iss: &key.client_email,
        scope,
        aud: &key.token_uri,
        iat: now,
        exp: now + GRANT_LIFETIME_SECS,
    };
    let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .context("service-account private key is not an RSA PEM key")?;
    Ok(jsonwebtoken::encode(&header, &claims, &signing_key)?)
}

/// Exchanges a signed grant for an access token.
pub fn exchange_grant(http: &Client, key: &ServiceAccountKey, scope: &str, now: i64) -> Result<String> {
    let assertion = signed_grant(key, scope, now)?;
    tracing::debug!(token_uri = %key.token_uri, client = %key.client_email, "exchanging service-account grant");
    let response = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()?;
    let status = response.status();
    let body = response.text()?;
    if !status.is_success() {
        bail!("token exchange at {} returned {status}: {body}", key.token_uri);
    }
    let token: TokenResponse =
        serde_json::from_str(&body).context("unexpected token endpoint response")?;
    Ok(token.access_token)
}

/// Access token for the Sheets API from `env`.
pub fn sheets_access_token(
    http: &Client,
    env: impl Fn(&str) -> Option<String>,
    now: i64,
) -> Result<String> {
    let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());
    if let Some(token) = non_empty(ACCESS_TOKEN_ENV) {
        return Ok(token);
    }
    let Some(path) = non_empty(CREDENTIALS_ENV) else {
        bail!("set {CREDENTIALS_ENV} to a service-account key file, or {ACCESS_TOKEN_ENV} to an access token");
    };
    let key = ServiceAccountKey::from_file(Path::new(&path))?;
    exchange_grant(http, &key, SHEETS_SCOPE, now)
}
