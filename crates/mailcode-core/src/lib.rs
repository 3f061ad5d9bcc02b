//! Ambient building blocks shared by mailcode services.
//!
//! Config loading, tracing setup, health probes, request-id middleware and
//! serde helpers. Nothing in here knows about one-time codes.

pub mod config;
pub mod health;
pub mod middleware;
pub mod serde;
pub mod tracing;
