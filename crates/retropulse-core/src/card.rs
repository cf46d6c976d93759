//! Card entities and the summaries embedded for hierarchical rendering

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::board::{BoardId, ColumnId};
use crate::error::Result;

/// Unique identifier for a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CardId(pub Uuid);

impl CardId {
    /// Create a new random card ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a card ID from a string
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| crate::error::RetroError::NotFound(format!("card id {}: {}", s, e)))
    }
}

impl Default for CardId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind of card posted to a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    /// Feedback about the sprint ("went well", "needs improvement")
    Feedback,
    /// A follow-up action item
    Action,
}

impl std::fmt::Display for CardType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardType::Feedback => write!(f, "feedback"),
            CardType::Action => write!(f, "action"),
        }
    }
}

/// Denormalized child entry embedded in a parent card for rendering.
///
/// Entries are a derived view of the canonical cards; the relationship
/// engine is the only code that writes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardSummary {
    pub id: CardId,
    pub content: String,
    pub card_type: CardType,
    pub direct_reaction_count: u32,
    pub is_anonymous: bool,
}

/// A card on a retrospective board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// Unique identifier
    pub id: CardId,
    /// Board the card belongs to
    pub board_id: BoardId,
    /// Column the card is posted in
    pub column_id: ColumnId,
    /// User-provided text
    pub content: String,
    /// Feedback or action
    pub card_type: CardType,
    /// Parent card, if this card has been grouped under another
    pub parent_card_id: Option<CardId>,
    /// Feedback card an action card was created for (separate axis from
    /// parent/child grouping)
    pub linked_feedback_id: Option<CardId>,
    /// Reactions on this card alone
    pub direct_reaction_count: u32,
    /// Own reactions plus the sum of all direct children's reactions
    pub aggregated_reaction_count: u32,
    /// Embedded child summaries, kept consistent with the canonical
    /// parent pointers by the relationship engine
    pub children: Vec<CardSummary>,
    /// If true, the creator identity is withheld from non-owner clients
    pub is_anonymous: bool,
    /// Opaque creator hash; None once redacted for the wire
    pub created_by_hash: Option<String>,
    /// Creation timestamp, used for recency sort
    pub created_at: DateTime<Utc>,
    /// Monotonic counter bumped on every mutation; stale remote events
    /// carrying an older version are dropped
    pub version: u64,
}

impl Card {
    /// Create a new standalone card
    pub fn new(
        board_id: BoardId,
        column_id: ColumnId,
        content: impl Into<String>,
        card_type: CardType,
        created_by_hash: impl Into<String>,
        is_anonymous: bool,
    ) -> Self {
        Self {
            id: CardId::new(),
            board_id,
            column_id,
            content: content.into(),
            card_type,
            parent_card_id: None,
            linked_feedback_id: None,
            direct_reaction_count: 0,
            aggregated_reaction_count: 0,
            children: Vec::new(),
            is_anonymous,
            created_by_hash: Some(created_by_hash.into()),
            created_at: Utc::now(),
            version: 0,
        }
    }

    /// Produce the summary embedded in a parent's `children` array
    pub fn summary(&self) -> CardSummary {
        CardSummary {
            id: self.id,
            content: self.content.clone(),
            card_type: self.card_type,
            direct_reaction_count: self.direct_reaction_count,
            is_anonymous: self.is_anonymous,
        }
    }

    /// Copy of the card with the creator identity withheld when anonymous
    pub fn redacted(&self) -> Card {
        let mut card = self.clone();
        if card.is_anonymous {
            card.created_by_hash = None;
        }
        card
    }

    /// Check if the given user created this card
    pub fn is_owned_by(&self, user_hash: &str) -> bool {
        self.created_by_hash.as_deref() == Some(user_hash)
    }

    /// Check if this card is grouped under a parent
    pub fn is_child(&self) -> bool {
        self.parent_card_id.is_some()
    }

    /// Check if this card has children grouped under it
    pub fn is_parent(&self) -> bool {
        !self.children.is_empty()
    }

    /// Record a mutation by bumping the version counter
    pub fn bump(&mut self) {
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_card(card_type: CardType) -> Card {
        Card::new(
            BoardId::new(),
            ColumnId::new(),
            "Deploys were smooth",
            card_type,
            "user-hash",
            false,
        )
    }

    #[test]
    fn new_card_is_standalone() {
        let card = test_card(CardType::Feedback);
        assert!(card.parent_card_id.is_none());
        assert!(card.linked_feedback_id.is_none());
        assert_eq!(card.direct_reaction_count, 0);
        assert_eq!(card.aggregated_reaction_count, 0);
        assert!(!card.is_child());
        assert!(!card.is_parent());
        assert_eq!(card.version, 0);
    }

    #[test]
    fn summary_reflects_card() {
        let mut card = test_card(CardType::Feedback);
        card.direct_reaction_count = 3;
        let summary = card.summary();
        assert_eq!(summary.id, card.id);
        assert_eq!(summary.direct_reaction_count, 3);
        assert_eq!(summary.card_type, CardType::Feedback);
    }

    #[test]
    fn redaction_withholds_creator_only_when_anonymous() {
        let named = test_card(CardType::Feedback);
        assert_eq!(
            named.redacted().created_by_hash,
            Some("user-hash".to_string())
        );

        let mut anon = test_card(CardType::Feedback);
        anon.is_anonymous = true;
        assert_eq!(anon.redacted().created_by_hash, None);
        // Redaction never mutates the original
        assert!(anon.is_owned_by("user-hash"));
    }

    #[test]
    fn ownership() {
        let card = test_card(CardType::Action);
        assert!(card.is_owned_by("user-hash"));
        assert!(!card.is_owned_by("other"));

        let mut redacted = card.redacted();
        redacted.is_anonymous = true;
        let redacted = redacted.redacted();
        assert!(!redacted.is_owned_by("user-hash"));
    }

    #[test]
    fn card_serde_round_trip() {
        let card = test_card(CardType::Action);
        let json = serde_json::to_string(&card).unwrap();
        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(card, back);
    }

    #[test]
    fn card_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&CardType::Feedback).unwrap(),
            "\"feedback\""
        );
        assert_eq!(
            serde_json::to_string(&CardType::Action).unwrap(),
            "\"action\""
        );
    }
}
