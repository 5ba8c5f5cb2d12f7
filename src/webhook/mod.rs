//! Webhook endpoint for the messaging platform.

pub mod routes;
pub mod verify;

pub use routes::{AppState, drain_in_flight, router};
