//! "Recently completed a transaction" signal.
//!
//! No order system is wired in yet, so the default provider simulates the
//! signal. Callers must tolerate different answers for the same sender.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;

use crate::config::TransactionMode;

/// Sender → "recently completed a purchase" capability.
#[async_trait]
pub trait TransactionStatusProvider: Send + Sync {
    async fn recently_completed(&self, sender_id: &str) -> bool;
}

/// Simulated signal: `true` with a fixed probability.
pub struct RandomTransactionStatus {
    probability: f64,
}

impl RandomTransactionStatus {
    /// `probability` is clamped to `0.0..=1.0`.
    pub fn new(probability: f64) -> Self {
        Self {
            probability: probability.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl TransactionStatusProvider for RandomTransactionStatus {
    async fn recently_completed(&self, _sender_id: &str) -> bool {
        rand::thread_rng().gen_bool(self.probability)
    }
}

/// Constant answer, for deterministic deployments and tests.
pub struct FixedTransactionStatus(pub bool);

#[async_trait]
impl TransactionStatusProvider for FixedTransactionStatus {
    async fn recently_completed(&self, _sender_id: &str) -> bool {
        self.0
    }
}

/// Build the provider selected by configuration.
pub fn from_mode(mode: TransactionMode) -> Arc<dyn TransactionStatusProvider> {
    match mode {
        TransactionMode::Random { probability } => Arc::new(RandomTransactionStatus::new(probability)),
        TransactionMode::Always => Arc::new(FixedTransactionStatus(true)),
        TransactionMode::Never => Arc::new(FixedTransactionStatus(false)),
    }
}
