//! Shared types for the response pipeline.

use serde::{Deserialize, Serialize};

// ── Inbound event ───────────────────────────────────────────────────

/// One normalized (sender, text) pair extracted from a webhook delivery.
///
/// Built by the event parser; never constructed with an empty sender or text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Page-scoped id of the user who wrote the message.
    pub sender_id: String,
    /// Page id the message was addressed to.
    pub recipient_id: String,
    /// Platform message id (`mid`), when present.
    pub message_id: Option<String>,
    /// Message body.
    pub text: String,
    /// Platform timestamp in epoch milliseconds.
    pub timestamp_millis: i64,
}

// ── Sentiment ───────────────────────────────────────────────────────

/// Categorical sentiment of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    Negative,
    Neutral,
    Positive,
}

impl Polarity {
    /// Normalize a signed score: positive → Positive, negative → Negative, zero → Neutral.
    pub fn from_score(score: i32) -> Self {
        match score.signum() {
            1 => Self::Positive,
            -1 => Self::Negative,
            _ => Self::Neutral,
        }
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Positive => "positive",
        }
    }
}

/// Output of a sentiment classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentimentResult {
    pub polarity: Polarity,
    /// Classifier confidence in `0.0..=1.0`.
    pub confidence: f32,
}

impl SentimentResult {
    /// Result used when the classifier is unavailable.
    pub fn neutral_fallback() -> Self {
        Self {
            polarity: Polarity::Neutral,
            confidence: 0.0,
        }
    }
}

// ── Decision ────────────────────────────────────────────────────────

/// Canned reply chosen for an event plus the transaction flag to persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplyDecision {
    pub reply_text: &'static str,
    pub transaction_status: bool,
}

/// What happened to one event after orchestration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub sender_id: String,
    pub message_id: Option<String>,
    /// `None` when the event was a redelivery and was skipped.
    pub decision: Option<ReplyDecision>,
    /// The reply reached the platform.
    pub delivered: bool,
    /// Surrogate id of the stored record, if persistence succeeded.
    pub record_id: Option<i64>,
}

impl Outcome {
    /// Outcome for an already-answered message id: nothing sent, nothing stored.
    pub fn duplicate(event: &InboundEvent) -> Self {
        Self {
            sender_id: event.sender_id.clone(),
            message_id: event.message_id.clone(),
            decision: None,
            delivered: false,
            record_id: None,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        self.decision.is_none()
    }
}
