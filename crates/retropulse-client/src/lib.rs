//! RetroPulse Client - sync transport for board sessions
//!
//! Connects a [`retropulse_core::SyncSession`] to a running server: REST
//! for snapshots, quotas, and mutations, WebSocket for the event stream.

pub mod client;
pub mod error;

pub use client::BoardClient;
pub use error::ClientError;
