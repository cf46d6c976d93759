//! Board and column entities
//!
//! Phase transitions:
//! ```text
//! Open → Closed
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BoardError, Result};

/// Unique identifier for a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoardId(pub Uuid);

impl BoardId {
    /// Create a new random board ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a board ID from a string
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::error::RetroError::NotFound(format!("board id {}: {}", s, e)))
    }
}

impl Default for BoardId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BoardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ColumnId(pub Uuid);

impl ColumnId {
    /// Create a new random column ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ColumnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ColumnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The lifecycle phase of a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardPhase {
    /// Board accepts cards, reactions, and links
    Open,
    /// Board is read-only; all mutating operations are rejected
    Closed,
}

impl BoardPhase {
    /// Check if a phase transition is valid
    pub fn can_transition_to(&self, target: &BoardPhase) -> bool {
        matches!((self, target), (BoardPhase::Open, BoardPhase::Closed))
    }

    /// Check if the board accepts mutations in this phase
    pub fn is_mutable(&self) -> bool {
        matches!(self, BoardPhase::Open)
    }
}

impl Default for BoardPhase {
    fn default() -> Self {
        BoardPhase::Open
    }
}

impl std::fmt::Display for BoardPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoardPhase::Open => write!(f, "OPEN"),
            BoardPhase::Closed => write!(f, "CLOSED"),
        }
    }
}

/// A column on a board (e.g. "Went well", "Needs improvement", "Actions")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    pub name: String,
}

impl Column {
    /// Create a new column with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ColumnId::new(),
            name: name.into(),
        }
    }
}

/// A retrospective board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Unique identifier
    pub id: BoardId,
    /// Display name
    pub name: String,
    /// Opaque hash of the user who created the board (the facilitator)
    pub owner_hash: String,
    /// Current lifecycle phase
    pub phase: BoardPhase,
    /// Columns cards are posted into
    pub columns: Vec<Column>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Board {
    /// Create a new open board with the given columns
    pub fn new(
        name: impl Into<String>,
        owner_hash: impl Into<String>,
        column_names: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: BoardId::new(),
            name: name.into(),
            owner_hash: owner_hash.into(),
            phase: BoardPhase::Open,
            columns: column_names.into_iter().map(Column::new).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Rename the board
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.updated_at = Utc::now();
    }

    /// Close the board, rejecting further mutations
    pub fn close(&mut self) -> Result<()> {
        if !self.phase.can_transition_to(&BoardPhase::Closed) {
            return Err(BoardError::InvalidPhaseTransition {
                from: self.phase.to_string(),
                to: BoardPhase::Closed.to_string(),
            }
            .into());
        }
        self.phase = BoardPhase::Closed;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Look up a column by ID
    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Check if the board has a column with the given ID
    pub fn has_column(&self, id: ColumnId) -> bool {
        self.column(id).is_some()
    }

    /// Check if the given user owns (facilitates) this board
    pub fn is_owned_by(&self, user_hash: &str) -> bool {
        self.owner_hash == user_hash
    }
}
