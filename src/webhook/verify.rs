//! Subscription handshake for the platform's webhook setup.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::VerificationError;

/// Query parameters sent with the GET handshake.
#[derive(Debug, Default, Deserialize)]
pub struct HandshakeQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// Check the presented token against the configured secret.
///
/// On success returns the challenge to echo back (empty if none was sent).
pub fn verify(expected: &SecretString, query: HandshakeQuery) -> Result<String, VerificationError> {
    let mode = query.mode.as_deref().unwrap_or("-");

    let Some(token) = query.verify_token.as_deref() else {
        warn!(stage = "verify", mode, "Webhook handshake without verify token");
        return Err(VerificationError::MissingToken);
    };

    if token != expected.expose_secret() {
        warn!(stage = "verify", mode, "Webhook verify token mismatch");
        return Err(VerificationError::TokenMismatch);
    }

    info!(stage = "verify", mode, "Webhook verified");
    Ok(query.challenge.unwrap_or_default())
}
