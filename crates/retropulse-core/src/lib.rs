//! RetroPulse Core - real-time collaborative retrospective board engine
//!
//! This crate provides the core functionality for RetroPulse boards:
//!
//! - **Board**: board and column entities with an Open→Closed lifecycle
//! - **Card**: feedback/action cards with one-level parent/child grouping
//!   and aggregated reaction counts
//! - **Relationship**: the pure link/unlink/reaction/delete engine that
//!   keeps the canonical pointers and the embedded child summaries in step
//! - **Quota**: advisory client tracker and authoritative server ledger for
//!   per-user card and reaction limits
//! - **Event**: the WebSocket event vocabulary shared by server broadcast
//!   and optimistic local application
//! - **State**: the single reducer both the optimistic and the remote path
//!   run through
//! - **Sync**: the client session with fetch-then-resubscribe reconnection
//!   and optimistic rollback
//! - **Config**: system-wide configuration for the server, quotas, and
//!   board defaults
//!
//! # Architecture
//!
//! All mutation flows through the relationship engine's pure functions and
//! the `BoardState` reducer. Clients apply changes optimistically, the
//! server applies the same events authoritatively, and remote deltas are
//! made safe by idempotent no-ops plus per-card version guards.

pub mod board;
pub mod card;
pub mod config;
pub mod error;
pub mod event;
pub mod quota;
pub mod relationship;
pub mod state;
pub mod store;
pub mod sync;
pub mod validation;

pub use board::{Board, BoardId, BoardPhase, Column, ColumnId};
pub use card::{Card, CardId, CardSummary, CardType};
pub use config::{BoardConfig, ConfigError, QuotaConfig, RetroConfig, ServerConfig};
pub use error::{
    BoardError, QuotaError, RelationshipError, Result, RetroError, SyncError, ValidationError,
};
pub use event::{BoardEvent, EventEnvelope, EventId};
pub use quota::{QuotaKind, QuotaLedger, QuotaSnapshot, QuotaState, QuotaTracker};
pub use relationship::{apply_delete, apply_link, apply_reaction_delta, apply_unlink, can_link, LinkKind};
pub use state::{Applied, BoardState};
pub use store::CardStore;
pub use sync::{ConnectionPhase, SyncSession};
