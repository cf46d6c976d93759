//! Error types for retropulse-core

use thiserror::Error;

use crate::board::BoardId;
use crate::card::{CardId, CardType};
use crate::quota::QuotaKind;
use crate::relationship::LinkKind;

/// Result type alias for RetroPulse operations
pub type Result<T> = std::result::Result<T, RetroError>;

/// Main error type for RetroPulse operations
#[derive(Error, Debug)]
pub enum RetroError {
    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Card relationship errors
    #[error("Relationship error: {0}")]
    Relationship(#[from] RelationshipError),

    /// Quota errors
    #[error("Quota error: {0}")]
    Quota(#[from] QuotaError),

    /// Board lifecycle errors
    #[error("Board error: {0}")]
    Board(#[from] BoardError),

    /// Sync session errors
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// A store invariant was already broken on entry. This is a logic bug,
    /// not a user-facing validation failure; callers log it and refetch.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Input validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Alias is empty or too long
    #[error("alias must be between 1 and {max} characters")]
    AliasLength { max: usize },

    /// Alias contains a disallowed character
    #[error("alias may only contain letters, digits, spaces, '_' and '-'")]
    AliasCharset,

    /// Card content is empty
    #[error("card content must not be empty")]
    ContentEmpty,

    /// Card content is too long
    #[error("card content must be at most {max} characters")]
    ContentLength { max: usize },

    /// Board name is empty
    #[error("board name must not be empty")]
    BoardNameEmpty,

    /// Board name is too long
    #[error("board name must be at most {max} characters")]
    BoardNameLength { max: usize },

    /// Column name is empty
    #[error("column name must not be empty")]
    ColumnNameEmpty,

    /// Column name is too long
    #[error("column name must be at most {max} characters")]
    ColumnNameLength { max: usize },
}

/// Card relationship errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelationshipError {
    /// A card cannot be linked to itself
    #[error("card {0} cannot be linked to itself")]
    SelfLink(CardId),

    /// Referenced card does not exist in the store
    #[error("card not found: {0}")]
    UnknownCard(CardId),

    /// The source card already has a parent
    #[error("card {0} already has a parent")]
    AlreadyParented(CardId),

    /// The target card is itself a child (one-level hierarchy)
    #[error("card {0} is already a child and cannot become a parent")]
    DepthExceeded(CardId),

    /// The card types are incompatible for this link kind
    #[error("cannot {kind} link {source_type} card to {target_type} card")]
    TypeMismatch {
        kind: LinkKind,
        source_type: CardType,
        target_type: CardType,
    },

    /// Linking would create a cycle
    #[error("linking {source_card} under {target} would create a cycle")]
    Cycle { source_card: CardId, target: CardId },

    /// The card has no link of this kind to remove
    #[error("card {0} is not linked")]
    NotLinked(CardId),
}

/// Quota errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuotaError {
    /// The per-user limit for this quota kind is exhausted
    #[error("{kind} quota exceeded (limit {limit})")]
    Exceeded { kind: QuotaKind, limit: u32 },
}

/// Board lifecycle errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// The board is closed and rejects mutations
    #[error("board {0} is closed")]
    Closed(BoardId),

    /// Referenced column does not exist on this board
    #[error("column not found: {0}")]
    UnknownColumn(String),

    /// Invalid board phase transition
    #[error("invalid board phase transition from {from} to {to}")]
    InvalidPhaseTransition { from: String, to: String },
}

/// Sync session errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The session is not live (no snapshot installed yet)
    #[error("sync session is not live")]
    NotLive,

    /// Unknown optimistic operation id
    #[error("unknown optimistic operation: {0}")]
    UnknownOp(u64),
}
