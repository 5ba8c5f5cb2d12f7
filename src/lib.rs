//! Sentiment Responder — canned replies to messaging-platform webhooks.

pub mod channels;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod sentiment;
pub mod store;
pub mod transactions;
pub mod webhook;
