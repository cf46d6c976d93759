//! The canonical card map for a board.
//!
//! The store is the single owner of card state within a client or a board
//! room. All relationship mutations go through the functions in
//! [`crate::relationship`], which take a store and return a new one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::board::ColumnId;
use crate::card::{Card, CardId};
use crate::error::{Result, RetroError};

/// Canonical map of card ID to card entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardStore {
    cards: BTreeMap<CardId, Card>,
}

impl CardStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            cards: BTreeMap::new(),
        }
    }

    /// Get a card by ID
    pub fn get(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    /// Get a mutable card by ID
    pub fn get_mut(&mut self, id: CardId) -> Option<&mut Card> {
        self.cards.get_mut(&id)
    }

    /// Check if a card is present
    pub fn contains(&self, id: CardId) -> bool {
        self.cards.contains_key(&id)
    }

    /// Insert a card, replacing any existing entry with the same ID
    pub fn insert(&mut self, card: Card) {
        self.cards.insert(card.id, card);
    }

    /// Remove a card, returning it if present
    pub fn remove(&mut self, id: CardId) -> Option<Card> {
        self.cards.remove(&id)
    }

    /// Number of cards in the store
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterate over all cards
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.values()
    }

    /// Cards in a column, newest first
    pub fn cards_in_column(&self, column_id: ColumnId) -> Vec<&Card> {
        let mut cards: Vec<_> = self
            .cards
            .values()
            .filter(|c| c.column_id == column_id)
            .collect();
        cards.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        cards
    }

    /// IDs of the direct children of a card, per the canonical pointers
    pub fn children_of(&self, parent_id: CardId) -> Vec<CardId> {
        self.cards
            .values()
            .filter(|c| c.parent_card_id == Some(parent_id))
            .map(|c| c.id)
            .collect()
    }

    /// Verify the store invariants, returning the first violation found.
    ///
    /// Checked: hierarchy depth of at most one level, aggregated counts
    /// equal to own direct plus children direct, and embedded child
    /// summaries agreeing with the canonical entries.
    pub fn verify_consistency(&self) -> Result<()> {
        for card in self.cards.values() {
            if let Some(parent_id) = card.parent_card_id {
                let parent = self.get(parent_id).ok_or_else(|| {
                    RetroError::InvariantViolation(format!(
                        "card {} references missing parent {}",
                        card.id, parent_id
                    ))
                })?;
                if parent.parent_card_id.is_some() {
                    return Err(RetroError::InvariantViolation(format!(
                        "card {} is a grandchild via parent {}",
                        card.id, parent_id
                    )));
                }
            }

            let children_sum: u32 = self
                .children_of(card.id)
                .iter()
                .filter_map(|id| self.get(*id))
                .map(|c| c.direct_reaction_count)
                .sum();
            if card.aggregated_reaction_count != card.direct_reaction_count + children_sum {
                return Err(RetroError::InvariantViolation(format!(
                    "card {} aggregate {} != direct {} + children {}",
                    card.id, card.aggregated_reaction_count, card.direct_reaction_count, children_sum
                )));
            }

            if self.children_of(card.id).len() != card.children.len() {
                return Err(RetroError::InvariantViolation(format!(
                    "card {} embeds {} children but {} cards point at it",
                    card.id,
                    card.children.len(),
                    self.children_of(card.id).len()
                )));
            }

            for summary in &card.children {
                let child = self.get(summary.id).ok_or_else(|| {
                    RetroError::InvariantViolation(format!(
                        "card {} embeds missing child {}",
                        card.id, summary.id
                    ))
                })?;
                if child.parent_card_id != Some(card.id) {
                    return Err(RetroError::InvariantViolation(format!(
                        "card {} embeds child {} that does not point back",
                        card.id, summary.id
                    )));
                }
                if summary.direct_reaction_count != child.direct_reaction_count
                    || summary.content != child.content
                {
                    return Err(RetroError::InvariantViolation(format!(
                        "stale embedded summary for child {} under {}",
                        summary.id, card.id
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardId;
    use crate::card::CardType;

    fn card_in(board_id: BoardId, column_id: ColumnId) -> Card {
        Card::new(
            board_id,
            column_id,
            "note",
            CardType::Feedback,
            "user",
            false,
        )
    }

    #[test]
    fn insert_get_remove() {
        let mut store = CardStore::new();
        let card = card_in(BoardId::new(), ColumnId::new());
        let id = card.id;

        store.insert(card);
        assert!(store.contains(id));
        assert_eq!(store.len(), 1);

        let removed = store.remove(id).unwrap();
        assert_eq!(removed.id, id);
        assert!(store.is_empty());
        assert!(store.remove(id).is_none());
    }

    #[test]
    fn column_cards_sorted_newest_first() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let mut store = CardStore::new();

        let mut older = card_in(board, column);
        older.created_at = chrono::Utc::now() - chrono::Duration::minutes(5);
        let older_id = older.id;
        let newer = card_in(board, column);
        let newer_id = newer.id;

        store.insert(older);
        store.insert(newer);
        store.insert(card_in(board, ColumnId::new()));

        let cards = store.cards_in_column(column);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].id, newer_id);
        assert_eq!(cards[1].id, older_id);
    }

    #[test]
    fn consistency_detects_stale_summary() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let mut store = CardStore::new();

        let mut parent = card_in(board, column);
        let mut child = card_in(board, column);
        child.parent_card_id = Some(parent.id);
        child.direct_reaction_count = 2;
        child.aggregated_reaction_count = 2;
        parent.children.push(child.summary());
        parent.aggregated_reaction_count = 2;
        let child_id = child.id;

        store.insert(parent);
        store.insert(child);
        assert!(store.verify_consistency().is_ok());

        // Bump the canonical count without refreshing the embedded summary
        store.get_mut(child_id).unwrap().direct_reaction_count = 3;
        assert!(store.verify_consistency().is_err());
    }

    #[test]
    fn consistency_detects_grandchild() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let mut store = CardStore::new();

        let a = card_in(board, column);
        let mut b = card_in(board, column);
        let mut c = card_in(board, column);
        b.parent_card_id = Some(a.id);
        c.parent_card_id = Some(b.id);

        store.insert(a);
        store.insert(b);
        store.insert(c);
        assert!(store.verify_consistency().is_err());
    }
}
