//! Board events pushed over the WebSocket transport.
//!
//! The same payloads drive both directions: the server broadcasts them to
//! every subscribed client, and the optimistic local path feeds the
//! equivalent event through the same reducer before the server confirms.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use retropulse_collab::Participant;

use crate::board::BoardId;
use crate::card::{Card, CardId};
use crate::relationship::LinkKind;

/// Unique identifier for an event, used for logging and correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    /// Create a new random event ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A server-pushed board event.
///
/// Card mutations carry the card's post-mutation `version`; reducers drop
/// anything at or below the version they already hold, so duplicated or
/// out-of-order deliveries cannot double-apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all_fields = "camelCase")]
pub enum BoardEvent {
    #[serde(rename = "card:created")]
    CardCreated { card: Card },

    #[serde(rename = "card:updated")]
    CardUpdated { card: Card },

    #[serde(rename = "card:deleted")]
    CardDeleted { card_id: CardId },

    #[serde(rename = "card:linked")]
    CardLinked {
        source_id: CardId,
        target_id: CardId,
        link_kind: LinkKind,
    },

    #[serde(rename = "card:unlinked")]
    CardUnlinked { card_id: CardId, link_kind: LinkKind },

    #[serde(rename = "reaction:added")]
    ReactionAdded { card_id: CardId, version: u64 },

    #[serde(rename = "reaction:removed")]
    ReactionRemoved { card_id: CardId, version: u64 },

    #[serde(rename = "user:joined")]
    UserJoined { participant: Participant },

    #[serde(rename = "user:alias_changed")]
    UserAliasChanged { user_hash: String, alias: String },

    #[serde(rename = "board:renamed")]
    BoardRenamed { name: String },

    #[serde(rename = "board:closed")]
    BoardClosed,
}

impl BoardEvent {
    /// The wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            BoardEvent::CardCreated { .. } => "card:created",
            BoardEvent::CardUpdated { .. } => "card:updated",
            BoardEvent::CardDeleted { .. } => "card:deleted",
            BoardEvent::CardLinked { .. } => "card:linked",
            BoardEvent::CardUnlinked { .. } => "card:unlinked",
            BoardEvent::ReactionAdded { .. } => "reaction:added",
            BoardEvent::ReactionRemoved { .. } => "reaction:removed",
            BoardEvent::UserJoined { .. } => "user:joined",
            BoardEvent::UserAliasChanged { .. } => "user:alias_changed",
            BoardEvent::BoardRenamed { .. } => "board:renamed",
            BoardEvent::BoardClosed => "board:closed",
        }
    }

    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            BoardEvent::CardCreated { card } => format!("Card created: {}", card.id),
            BoardEvent::CardUpdated { card } => {
                format!("Card updated: {} (v{})", card.id, card.version)
            }
            BoardEvent::CardDeleted { card_id } => format!("Card deleted: {}", card_id),
            BoardEvent::CardLinked {
                source_id,
                target_id,
                link_kind,
            } => format!("Card {} linked to {} ({})", source_id, target_id, link_kind),
            BoardEvent::CardUnlinked { card_id, link_kind } => {
                format!("Card {} unlinked ({})", card_id, link_kind)
            }
            BoardEvent::ReactionAdded { card_id, .. } => format!("Reaction added: {}", card_id),
            BoardEvent::ReactionRemoved { card_id, .. } => {
                format!("Reaction removed: {}", card_id)
            }
            BoardEvent::UserJoined { participant } => {
                format!("User joined: {}", participant.alias)
            }
            BoardEvent::UserAliasChanged { alias, .. } => format!("Alias changed: {}", alias),
            BoardEvent::BoardRenamed { name } => format!("Board renamed: {}", name),
            BoardEvent::BoardClosed => "Board closed".to_string(),
        }
    }
}

/// Envelope carrying an event and the board it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub board_id: BoardId,
    /// Correlates log lines across server and clients
    pub event_id: EventId,
    #[serde(flatten)]
    pub event: BoardEvent,
}

impl EventEnvelope {
    /// Wrap an event for the given board
    pub fn new(board_id: BoardId, event: BoardEvent) -> Self {
        Self {
            board_id,
            event_id: EventId::new(),
            event,
        }
    }
}
