//! Kerberos tokens for the questionnaire host.
//!
//! The token is the initial GSSAPI context token for the host-based service
//! `HTTP@<host>`, taken from the user's credential cache (`kinit`) and sent
//! base64-encoded as `Authorization: Negotiate <token>`.

use crate::error::{QsError, Result};
use url::Url;

/// Host-based service name for the questionnaire host: `HTTP@<host>`.
pub fn service_name(base_url: &Url) -> Result<String> {
    let host = base_url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| QsError::Config(format!("questionnaire URL `{base_url}` has no host")))?;
    Ok(format!("HTTP@{host}"))
}

/// Initial context token for `service`, base64-encoded.
#[cfg(feature = "kerberos")]
pub fn negotiate_token(service: &str) -> Result<String> {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use libgssapi::context::{ClientCtx, CtxFlags};
    use libgssapi::name::Name;
    use libgssapi::oid::{GSS_MECH_KRB5, GSS_NT_HOSTBASED_SERVICE};

    let failed = |e: libgssapi::error::Error| {
        QsError::Config(format!(
            "no Kerberos ticket for {service} (run kinit, or use --no-kerberos): {e}"
        ))
    };
    let name = Name::new(service.as_bytes(), Some(&GSS_NT_HOSTBASED_SERVICE)).map_err(failed)?;
    let name = name.canonicalize(Some(&GSS_MECH_KRB5)).map_err(failed)?;
    let mut ctx = ClientCtx::new(None, name, CtxFlags::GSS_C_MUTUAL_FLAG, Some(&GSS_MECH_KRB5));
    let token = ctx
        .step(None, None)
        .map_err(failed)?
        .ok_or_else(|| QsError::Config(format!("GSSAPI returned no initial token for {service}")))?;
    tracing::debug!(service, "obtained Kerberos token");
    Ok(STANDARD.encode(&*token))
}

#[cfg(not(feature = "kerberos"))]
pub fn negotiate_token(service: &str) -> Result<String> {
    Err(QsError::Config(format!(
        "cannot request a Kerberos ticket for {service}: built without the `kerberos` feature; \
         pass --negotiate-token, set {}, or use --no-kerberos",
        crate::config::NEGOTIATE_TOKEN_ENV
    )))
}
