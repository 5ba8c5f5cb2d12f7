//! Inbound message pipeline.
//!
//! Every webhook delivery flows through:
//! 1. `parser::parse_events()`: payload to normalized events
//! 2. `ResponseOrchestrator::handle()`: sentiment and transaction status
//! 3. `policy::decide()`: the canned-reply table
//!
//! Delivery and persistence happen inside the orchestrator, per event.

pub mod orchestrator;
pub mod parser;
pub mod policy;
pub mod types;

pub use orchestrator::ResponseOrchestrator;
