//! Append-only response log abstraction.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::Serialize;

use crate::error::DatabaseError;

/// A persisted reply outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResponseRecord {
    /// Surrogate key assigned by the store.
    pub id: i64,
    pub sender_id: String,
    pub response_text: String,
    /// Stored as a 0/1 integer.
    pub completed_transaction: bool,
    /// `None` for rows written before timestamps were recorded.
    pub created_at: Option<DateTime<Utc>>,
    /// Platform message id the reply answered. Unique when present.
    pub message_id: Option<String>,
}

/// Insert-side shape of a [`ResponseRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResponseRecord {
    pub sender_id: String,
    pub response_text: String,
    pub completed_transaction: bool,
    pub message_id: Option<String>,
}

/// Lazy, single-pass sequence of records in insertion order.
pub type ResponseStream = Pin<Box<dyn Stream<Item = ResponseRecord> + Send>>;

/// Append-only response log.
#[async_trait]
pub trait ResponseStore: Send + Sync {
    /// Claim a platform message id for processing.
    ///
    /// Returns `false` when the id was already claimed, i.e. the event is a
    /// redelivery and must not be answered again.
    async fn claim_message(&self, message_id: &str) -> Result<bool, DatabaseError>;

    /// Append a record; returns its surrogate id.
    async fn append(&self, record: &NewResponseRecord) -> Result<i64, DatabaseError>;

    /// Every stored record, oldest first.
    ///
    /// Query failures are logged and produce an empty stream.
    async fn list_all(&self) -> ResponseStream;
}
