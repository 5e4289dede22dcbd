//! Client configuration: base URL and credentials, from arguments or environment.

use crate::auth::AuthContext;
use crate::error::{QsError, Result};
use crate::kerberos;
use url::Url;

pub const KERBEROS_URL: &str = "https://pswww.slac.stanford.edu/ws-kerb/questionnaire/";
pub const BASIC_AUTH_URL: &str = "https://pswww.slac.stanford.edu/ws-auth/questionnaire/";

pub const NEGOTIATE_TOKEN_ENV: &str = "QS_NEGOTIATE_TOKEN";
pub const USER_ENV: &str = "QS_USER";
pub const PASSWORD_ENV: &str = "QS_PASSWORD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub auth: AuthContext,
}

/// Connection options as given on the command line. Unset credentials are
/// looked up in the environment.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
    pub url: Option<String>,
    pub use_kerberos: bool,
    pub user: Option<String>,
    pub password: Option<String>,
    pub negotiate_token: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: &str, auth: AuthContext) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            auth,
        })
    }

    /// Resolves options against the process environment. Without an explicit
    /// token, Kerberos mode requests a ticket from the credential cache.
    pub fn from_options(options: &ConnectionOptions) -> Result<Self> {
        Self::resolve(
            options,
            |key| std::env::var(key).ok(),
            kerberos::negotiate_token,
        )
    }

    /// Same as [`ClientConfig::from_options`] with an explicit environment
    /// lookup and ticket source. `ticket` gets the service name `HTTP@<host>`.
    pub fn resolve(
        options: &ConnectionOptions,
        env: impl Fn(&str) -> Option<String>,
        ticket: impl FnOnce(&str) -> Result<String>,
    ) -> Result<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if options.use_kerberos {
            let base_url = normalize_base_url(options.url.as_deref().unwrap_or(KERBEROS_URL))?;
            let token = match non_empty(options.negotiate_token.clone())
                .or_else(|| non_empty(env(NEGOTIATE_TOKEN_ENV)))
            {
                Some(token) => token,
                None => {
                    let service = kerberos::service_name(&base_url)?;
                    tracing::debug!(service = %service, "requesting Kerberos ticket");
                    ticket(&service)?
                }
            };
            return Ok(Self {
                base_url,
                auth: AuthContext::Negotiate { token },
            });
        }

        let user = non_empty(options.user.clone())
            .or_else(|| non_empty(env(USER_ENV)))
            .or_else(|| non_empty(env("USER")))
            .ok_or_else(|| {
                QsError::Config(format!("basic auth needs a user; pass --user or set {USER_ENV}"))
            })?;
        let password = non_empty(options.password.clone())
            .or_else(|| env(PASSWORD_ENV))
            .ok_or_else(|| {
                QsError::Config(format!(
                    "basic auth needs a password; pass --password or set {PASSWORD_ENV}"
                ))
            })?;
        let url = options.url.as_deref().unwrap_or(BASIC_AUTH_URL);
        Self::new(url, AuthContext::Basic { user, password })
    }
}

impl ConnectionOptions {
    /// Basic auth with no password from the options or `env`; the caller may prompt.
    pub fn needs_password(&self, env: impl Fn(&str) -> Option<String>) -> bool {
        !self.use_kerberos
            && self.password.as_deref().map_or(true, |p| p.trim().is_empty())
            && env(PASSWORD_ENV).is_none()
    }
}

/// Parses the base URL and makes sure it ends with `/` so endpoints append cleanly.
pub fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| QsError::Config(format!("invalid questionnaire URL `{raw}`: {e}")))?;
    if url.cannot_be_a_base() {
        return Err(QsError::Config(format!("questionnaire URL `{raw}` cannot be a base")));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
