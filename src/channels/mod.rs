//! Outbound message delivery.

pub mod messenger;
pub mod retry;

use async_trait::async_trait;

use crate::error::DeliveryError;

pub use messenger::MessengerClient;
pub use retry::{FixedBackoff, NoRetry, RetryPolicy};

/// (recipient, text) → delivery result capability.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Channel name for logging (e.g. "messenger").
    fn name(&self) -> &str;

    /// Deliver `text` to `recipient_id`.
    async fn send(&self, recipient_id: &str, text: &str) -> Result<(), DeliveryError>;
}
