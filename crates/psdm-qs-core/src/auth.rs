//! Credentials attached to every questionnaire request.

use reqwest::blocking::RequestBuilder;
use reqwest::header::AUTHORIZATION;
use std::fmt;

/// Immutable authentication context, built once per client.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// Kerberos: the base64 GSSAPI token sent as `Authorization: Negotiate <token>`.
    Negotiate { token: String },
    /// HTTP basic auth against the `ws-auth` endpoint.
    Basic { user: String, password: String },
}

impl AuthContext {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthContext::Negotiate { .. } => "kerberos",
            AuthContext::Basic { .. } => "basic",
        }
    }

    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            AuthContext::Negotiate { token } => {
                request.header(AUTHORIZATION, format!("Negotiate {token}"))
            }
            AuthContext::Basic { user, password } => request.basic_auth(user, Some(password)),
        }
    }
}

// Secrets stay out of logs.
impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthContext::Negotiate { .. } => f
                .debug_struct("Negotiate")
                .field("token", &"<redacted>")
                .finish(),
            AuthContext::Basic { user, .. } => f
                .debug_struct("Basic")
                .field("user", user)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}
