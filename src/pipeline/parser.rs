//! Webhook payload parser.
//!
//! Decodes a Messenger-style delivery into zero or more [`InboundEvent`]s.
//! Entries and messaging items are iterated, never indexed, so an empty
//! `entry` array simply yields no events.

use serde::Deserialize;
use tracing::debug;

use crate::error::ParseError;
use crate::pipeline::types::InboundEvent;

// ── Wire format ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(default)]
    object: String,
    entry: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    #[serde(default)]
    id: String,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    messaging: Vec<MessagingEvent>,
}

#[derive(Debug, Deserialize)]
struct MessagingEvent {
    sender: Participant,
    #[serde(default)]
    recipient: Option<Participant>,
    #[serde(default)]
    timestamp: i64,
    /// Absent for delivery/read receipts and postbacks.
    #[serde(default)]
    message: Option<MessageBody>,
}

#[derive(Debug, Deserialize)]
struct Participant {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    mid: Option<String>,
    /// Absent for attachment-only messages.
    #[serde(default)]
    text: Option<String>,
}

// ── Parsing ─────────────────────────────────────────────────────────

/// Decode a raw POST body into inbound events.
///
/// Events without a text body (receipts, attachments, empty or whitespace-only
/// text) and events with an empty sender id are dropped here.
pub fn parse_events(body: &[u8]) -> Result<Vec<InboundEvent>, ParseError> {
    let payload: WebhookPayload = serde_json::from_slice(body)?;

    let mut events = Vec::new();
    for entry in payload.entry {
        for item in entry.messaging {
            let Some(message) = item.message else {
                debug!(entry = %entry.id, "Skipping messaging item without a message");
                continue;
            };
            let text = message.text.unwrap_or_default();
            if text.trim().is_empty() {
                debug!(entry = %entry.id, sender = %item.sender.id, "Skipping message with empty text");
                continue;
            }
            if item.sender.id.is_empty() {
                debug!(entry = %entry.id, "Skipping message with empty sender id");
                continue;
            }

            events.push(InboundEvent {
                sender_id: item.sender.id,
                recipient_id: item.recipient.map(|r| r.id).unwrap_or_default(),
                message_id: message.mid.filter(|mid| !mid.is_empty()),
                text,
                timestamp_millis: if item.timestamp != 0 { item.timestamp } else { entry.time },
            });
        }
    }

    debug!(object = %payload.object, count = events.len(), "Parsed webhook payload");
    Ok(events)
}
