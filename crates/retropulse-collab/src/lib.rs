//! Shared collaboration infrastructure for RetroPulse retrospective boards.
//!
//! This crate provides the collaboration primitives the board engine builds on:
//! - Permission management with fine-grained access control
//! - Real-time presence awareness for board participants

pub mod permissions;
pub mod presence;

pub use permissions::Permissions;
pub use presence::{Participant, PresenceStatus};
