//! Per-event orchestration: one inbound message in, one sent and stored reply out.
//!
//! Flow per event:
//! 0. Claim the platform message id; a redelivered id is skipped entirely
//! 1. Transaction status lookup
//! 2. Sentiment classification (falls back to Neutral on failure)
//! 3. Reply policy
//! 4. Outbound send, under the configured retry policy
//! 5. Append to the response store
//!
//! Steps 4 and 5 are independent: a failed send is still recorded, and a failed
//! append never triggers a resend. Nothing here holds a lock across I/O.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::channels::{MessageSender, NoRetry, RetryPolicy};
use crate::error::DeliveryError;
use crate::pipeline::policy;
use crate::pipeline::types::{InboundEvent, Outcome, ReplyDecision, SentimentResult};
use crate::sentiment::SentimentClassifier;
use crate::store::{NewResponseRecord, ResponseStore};
use crate::transactions::TransactionStatusProvider;

/// Coordinates classification, reply selection, delivery and persistence.
pub struct ResponseOrchestrator {
    classifier: Arc<dyn SentimentClassifier>,
    transactions: Arc<dyn TransactionStatusProvider>,
    sender: Arc<dyn MessageSender>,
    store: Arc<dyn ResponseStore>,
    retry: Arc<dyn RetryPolicy>,
}

impl ResponseOrchestrator {
    /// Create an orchestrator that sends each reply once.
    pub fn new(
        classifier: Arc<dyn SentimentClassifier>,
        transactions: Arc<dyn TransactionStatusProvider>,
        sender: Arc<dyn MessageSender>,
        store: Arc<dyn ResponseStore>,
    ) -> Self {
        Self {
            classifier,
            transactions,
            sender,
            store,
            retry: Arc::new(NoRetry),
        }
    }

    /// Replace the delivery retry policy.
    pub fn with_retry_policy(mut self, retry: Arc<dyn RetryPolicy>) -> Self {
        self.retry = retry;
        self
    }

    /// Process a single event through the full pipeline.
    pub async fn handle(&self, event: &InboundEvent) -> Outcome {
        info!(
            sender = %event.sender_id,
            mid = event.message_id.as_deref().unwrap_or("-"),
            "Processing inbound message"
        );

        if !self.claim(event).await {
            return Outcome::duplicate(event);
        }

        let recently_completed = self.transactions.recently_completed(&event.sender_id).await;
        let sentiment = self.classify(event).await;
        let decision = policy::decide(sentiment.polarity, recently_completed);

        debug!(
            sender = %event.sender_id,
            polarity = sentiment.polarity.label(),
            confidence = sentiment.confidence,
            recently_completed,
            "Reply decided"
        );

        let delivered = match self.deliver(&event.sender_id, decision.reply_text).await {
            Ok(()) => true,
            Err(e) => {
                error!(sender = %event.sender_id, stage = "deliver", error = %e, "Failed to send reply");
                false
            }
        };

        let record_id = self.persist(event, &decision).await;

        Outcome {
            sender_id: event.sender_id.clone(),
            message_id: event.message_id.clone(),
            decision: Some(decision),
            delivered,
            record_id,
        }
    }

    /// Process a batch of events (one webhook delivery).
    ///
    /// Events are handled independently; one failing event does not affect the rest.
    pub async fn handle_batch(&self, events: Vec<InboundEvent>) -> Vec<Outcome> {
        let count = events.len();
        if count == 0 {
            debug!("No events to process");
            return Vec::new();
        }

        let mut outcomes = Vec::with_capacity(count);
        for event in &events {
            outcomes.push(self.handle(event).await);
        }

        info!(
            total = count,
            duplicates = outcomes.iter().filter(|o| o.is_duplicate()).count(),
            delivered = outcomes.iter().filter(|o| o.delivered).count(),
            stored = outcomes.iter().filter(|o| o.record_id.is_some()).count(),
            "Batch processing complete"
        );
        outcomes
    }

    /// `false` only when the message id was already claimed. Events without an
    /// id, or a store that cannot answer, are processed.
    async fn claim(&self, event: &InboundEvent) -> bool {
        let Some(mid) = event.message_id.as_deref() else {
            return true;
        };
        match self.store.claim_message(mid).await {
            Ok(true) => true,
            Ok(false) => {
                info!(sender = %event.sender_id, stage = "dedupe", mid, "Skipping redelivered message");
                false
            }
            Err(e) => {
                warn!(
                    sender = %event.sender_id,
                    stage = "dedupe",
                    mid,
                    error = %e,
                    "Could not claim message id, processing anyway"
                );
                true
            }
        }
    }

    async fn classify(&self, event: &InboundEvent) -> SentimentResult {
        match self.classifier.classify(&event.text).await {
            Ok(result) => result,
            Err(e) => {
                warn!(
                    sender = %event.sender_id,
                    stage = "classify",
                    classifier = self.classifier.name(),
                    error = %e,
                    "Classification failed, falling back to neutral"
                );
                SentimentResult::neutral_fallback()
            }
        }
    }

    async fn deliver(&self, recipient_id: &str, text: &str) -> Result<(), DeliveryError> {
        let max_attempts = self.retry.max_attempts().max(1);
        let mut attempt = 1;
        loop {
            match self.sender.send(recipient_id, text).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt < max_attempts && self.retry.should_retry(&e) => {
                    attempt += 1;
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        sender = recipient_id,
                        stage = "deliver",
                        channel = self.sender.name(),
                        attempt,
                        max_attempts,
                        error = %e,
                        "Send failed, retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn persist(&self, event: &InboundEvent, decision: &ReplyDecision) -> Option<i64> {
        let record = NewResponseRecord {
            sender_id: event.sender_id.clone(),
            response_text: decision.reply_text.to_string(),
            completed_transaction: decision.transaction_status,
            message_id: event.message_id.clone(),
        };
        match self.store.append(&record).await {
            Ok(id) => Some(id),
            Err(e) => {
                error!(sender = %event.sender_id, stage = "persist", error = %e, "Failed to store response");
                None
            }
        }
    }
}
