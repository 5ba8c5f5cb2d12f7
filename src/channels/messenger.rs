//! Messenger Send API client.
//!
//! POSTs `{"recipient":{"id"},"message":{"text"}}` to `{graph_url}/me/messages`,
//! passing the page access token as the `access_token` query parameter.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::channels::MessageSender;
use crate::config::SendConfig;
use crate::error::{ConfigError, DeliveryError};

/// Longest response body kept in a rejection error.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    recipient: Recipient<'a>,
    message: OutboundText<'a>,
}

#[derive(Debug, Serialize)]
struct Recipient<'a> {
    id: &'a str,
}

#[derive(Debug, Serialize)]
struct OutboundText<'a> {
    text: &'a str,
}

/// Sends replies through the Graph API.
pub struct MessengerClient {
    graph_url: String,
    access_token: SecretString,
    timeout: Duration,
    client: reqwest::Client,
}

impl MessengerClient {
    pub fn new(config: &SendConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            graph_url: config.graph_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            timeout: config.timeout,
            client,
        })
    }

    fn api_url(&self) -> String {
        format!("{}/me/messages", self.graph_url)
    }
}

#[async_trait]
impl MessageSender for MessengerClient {
    fn name(&self) -> &str {
        "messenger"
    }

    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), DeliveryError> {
        if text.is_empty() {
            return Err(DeliveryError::EmptyMessage {
                recipient: recipient_id.to_string(),
            });
        }

        let body = SendRequest {
            recipient: Recipient { id: recipient_id },
            message: OutboundText { text },
        };

        let resp = self
            .client
            .post(self.api_url())
            .query(&[("access_token", self.access_token.expose_secret())])
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                // reqwest errors embed the URL, which carries the token.
                let e = e.without_url();
                if e.is_timeout() {
                    DeliveryError::Timeout {
                        recipient: recipient_id.to_string(),
                        timeout: self.timeout,
                    }
                } else {
                    DeliveryError::Network {
                        recipient: recipient_id.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| body.is_char_boundary(*i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(DeliveryError::Rejected {
                recipient: recipient_id.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        tracing::info!(recipient = recipient_id, "Messenger reply sent");
        Ok(())
    }
}
