//! Configuration types.
//!
//! Everything is read from the environment. Secrets have no defaults: a missing
//! `RESPONDER_VERIFY_TOKEN` or `RESPONDER_ACCESS_TOKEN` aborts startup.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default Messenger Graph API base URL.
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com/v12.0";

/// How the "recently completed a transaction" signal is produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransactionMode {
    /// Simulated signal, `true` with the given probability.
    Random { probability: f64 },
    /// Always report a recent transaction.
    Always,
    /// Never report a recent transaction.
    Never,
}

/// Outbound send settings.
#[derive(Debug, Clone)]
pub struct SendConfig {
    /// Messenger Graph API base URL (no trailing slash).
    pub graph_url: String,
    /// Page access token passed to the send API.
    pub access_token: SecretString,
    /// Total attempts per reply, including the first. 1 disables retry.
    pub max_attempts: u32,
    /// Pause between attempts.
    pub retry_delay: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Secret compared against `hub.verify_token`.
    pub verify_token: SecretString,
    pub bind_address: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub send: SendConfig,
    pub transactions: TransactionMode,
    /// How long shutdown waits for in-flight webhook processing.
    pub shutdown_grace: Duration,
}

impl AppConfig {
    /// Build config from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let verify_token = get("RESPONDER_VERIFY_TOKEN")
            .ok_or_else(|| ConfigError::MissingEnvVar("RESPONDER_VERIFY_TOKEN".into()))?;
        let access_token = get("RESPONDER_ACCESS_TOKEN")
            .ok_or_else(|| ConfigError::MissingEnvVar("RESPONDER_ACCESS_TOKEN".into()))?;

        let graph_url = get("RESPONDER_GRAPH_URL")
            .unwrap_or_else(|| DEFAULT_GRAPH_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let port: u16 = parse_or(get("PORT"), "PORT", 3000)?;
        let bind_address = get("RESPONDER_BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string());
        let db_path = get("RESPONDER_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/responses.db"));

        let max_attempts: u32 = parse_or(get("RESPONDER_SEND_ATTEMPTS"), "RESPONDER_SEND_ATTEMPTS", 1)?;
        if max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RESPONDER_SEND_ATTEMPTS".into(),
                message: "must be at least 1".into(),
            });
        }
        let retry_delay_ms: u64 = parse_or(
            get("RESPONDER_SEND_RETRY_DELAY_MS"),
            "RESPONDER_SEND_RETRY_DELAY_MS",
            500,
        )?;
        let timeout_secs: u64 = parse_or(
            get("RESPONDER_SEND_TIMEOUT_SECS"),
            "RESPONDER_SEND_TIMEOUT_SECS",
            10,
        )?;

        let shutdown_grace_secs: u64 = parse_or(
            get("RESPONDER_SHUTDOWN_GRACE_SECS"),
            "RESPONDER_SHUTDOWN_GRACE_SECS",
            30,
        )?;

        let transactions = parse_transaction_mode(
            get("RESPONDER_TRANSACTION_MODE").as_deref(),
            get("RESPONDER_TRANSACTION_PROBABILITY"),
        )?;

        Ok(Self {
            verify_token: SecretString::from(verify_token),
            bind_address,
            port,
            db_path,
            send: SendConfig {
                graph_url,
                access_token: SecretString::from(access_token),
                max_attempts,
                retry_delay: Duration::from_millis(retry_delay_ms),
                timeout: Duration::from_secs(timeout_secs),
            },
            transactions,
            shutdown_grace: Duration::from_secs(shutdown_grace_secs),
        })
    }

    /// `host:port` for the listener.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(s) => s.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

fn parse_transaction_mode(
    mode: Option<&str>,
    probability: Option<String>,
) -> Result<TransactionMode, ConfigError> {
    match mode.map(|m| m.trim().to_ascii_lowercase()).as_deref() {
        None | Some("random") => {
            let probability: f64 = parse_or(probability, "RESPONDER_TRANSACTION_PROBABILITY", 0.5)?;
            if !(0.0..=1.0).contains(&probability) {
                return Err(ConfigError::InvalidValue {
                    key: "RESPONDER_TRANSACTION_PROBABILITY".into(),
                    message: format!("{probability} is outside 0.0..=1.0"),
                });
            }
            Ok(TransactionMode::Random { probability })
        }
        Some("always") => Ok(TransactionMode::Always),
        Some("never") => Ok(TransactionMode::Never),
        Some(other) => Err(ConfigError::InvalidValue {
            key: "RESPONDER_TRANSACTION_MODE".into(),
            message: format!("unknown mode '{other}' (expected random, always or never)"),
        }),
    }
}
