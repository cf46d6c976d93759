//! Full board state and the event reducer.
//!
//! [`BoardState::apply`] is the single mutation path: the optimistic local
//! route and the remote event route both go through it, so there is no
//! duplicated mutation logic to drift apart. Application is idempotent
//! against out-of-order delivery; commuting no-ops are reported as
//! [`Applied::Noop`] and version-guarded drops as [`Applied::Stale`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use retropulse_collab::Participant;

use crate::board::Board;
use crate::event::BoardEvent;
use crate::error::Result;
use crate::relationship::{self, LinkKind};
use crate::store::CardStore;

/// Outcome of applying an event to a board state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The event mutated the state
    Applied,
    /// The event commuted to nothing (entity absent, link impossible on
    /// this replica, board already closed)
    Noop,
    /// The event carried a version at or below the local one and was dropped
    Stale,
    /// The event arrived before the snapshot fetch completed and was
    /// discarded by the sync session
    Discarded,
}

/// The complete replicated state of one board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardState {
    pub board: Board,
    pub cards: CardStore,
    /// Participants keyed by user hash
    pub participants: BTreeMap<String, Participant>,
}

impl BoardState {
    /// Create the state for a freshly created board
    pub fn new(board: Board) -> Self {
        Self {
            board,
            cards: CardStore::new(),
            participants: BTreeMap::new(),
        }
    }

    /// Apply an event, returning what happened.
    ///
    /// Errors are reserved for invariant violations (corrupt state); every
    /// expected race resolves to `Noop` or `Stale`.
    pub fn apply(&mut self, event: &BoardEvent) -> Result<Applied> {
        match event {
            BoardEvent::CardCreated { card } => {
                if self.cards.contains(card.id) {
                    return Ok(Applied::Noop);
                }
                if !self.board.phase.is_mutable() {
                    return Ok(Applied::Noop);
                }
                self.cards.insert(card.clone());
                Ok(Applied::Applied)
            }

            BoardEvent::CardUpdated { card } => {
                let Some(existing) = self.cards.get(card.id) else {
                    // Commutes with a concurrent delete
                    return Ok(Applied::Noop);
                };
                if card.version <= existing.version {
                    return Ok(Applied::Stale);
                }
                let parent_id = existing.parent_card_id;
                self.cards.insert(card.clone());
                // An edit changes the content mirrored in the parent's
                // embedded entry; keep the dual representation in step
                if let Some(parent_id) = parent_id {
                    self.refresh_parent(parent_id)?;
                }
                Ok(Applied::Applied)
            }

            BoardEvent::CardDeleted { card_id } => {
                if !self.cards.contains(*card_id) {
                    return Ok(Applied::Noop);
                }
                self.cards = relationship::apply_delete(&self.cards, *card_id)?;
                Ok(Applied::Applied)
            }

            BoardEvent::CardLinked {
                source_id,
                target_id,
                link_kind,
            } => {
                if !relationship::can_link(&self.cards, *source_id, *target_id, *link_kind) {
                    // The link is impossible on this replica (a card was
                    // deleted or re-grouped concurrently); skip rather than
                    // corrupt
                    return Ok(Applied::Noop);
                }
                self.cards =
                    relationship::apply_link(&self.cards, *source_id, *target_id, *link_kind)?;
                Ok(Applied::Applied)
            }

            BoardEvent::CardUnlinked { card_id, link_kind } => {
                let result = match link_kind {
                    LinkKind::ParentChild => relationship::apply_unlink(&self.cards, *card_id),
                    LinkKind::ActionFeedback => {
                        relationship::apply_action_unlink(&self.cards, *card_id)
                    }
                };
                match result {
                    Ok(cards) => {
                        self.cards = cards;
                        Ok(Applied::Applied)
                    }
                    Err(crate::error::RetroError::Relationship(_)) => Ok(Applied::Noop),
                    Err(e) => Err(e),
                }
            }

            BoardEvent::ReactionAdded { card_id, version } => {
                self.apply_reaction(*card_id, *version, 1)
            }

            BoardEvent::ReactionRemoved { card_id, version } => {
                self.apply_reaction(*card_id, *version, -1)
            }

            BoardEvent::UserJoined { participant } => {
                self.participants
                    .insert(participant.user_hash.clone(), participant.clone());
                Ok(Applied::Applied)
            }

            BoardEvent::UserAliasChanged { user_hash, alias } => {
                match self.participants.get_mut(user_hash) {
                    Some(participant) => {
                        participant.rename(alias.clone());
                        Ok(Applied::Applied)
                    }
                    None => Ok(Applied::Noop),
                }
            }

            BoardEvent::BoardRenamed { name } => {
                if self.board.name == *name {
                    return Ok(Applied::Noop);
                }
                self.board.rename(name.clone());
                Ok(Applied::Applied)
            }

            BoardEvent::BoardClosed => {
                if !self.board.phase.is_mutable() {
                    return Ok(Applied::Noop);
                }
                self.board.close()?;
                Ok(Applied::Applied)
            }
        }
    }

    fn apply_reaction(&mut self, card_id: crate::card::CardId, version: u64, delta: i32) -> Result<Applied> {
        let Some(card) = self.cards.get(card_id) else {
            return Ok(Applied::Noop);
        };
        if version <= card.version {
            return Ok(Applied::Stale);
        }
        self.cards = relationship::apply_reaction_delta(&self.cards, card_id, delta)?;
        // Pin the exact server version rather than the local bump
        if let Some(card) = self.cards.get_mut(card_id) {
            card.version = version;
        }
        Ok(Applied::Applied)
    }

    fn refresh_parent(&mut self, parent_id: crate::card::CardId) -> Result<()> {
        // Embedded entries and the aggregate are rebuilt from the canonical
        // cards, never patched individually
        let summaries: Vec<_> = {
            let Some(parent) = self.cards.get(parent_id) else {
                return Ok(());
            };
            parent
                .children
                .iter()
                .filter_map(|s| self.cards.get(s.id).map(|c| c.summary()))
                .collect()
        };
        let children_sum: u32 = summaries.iter().map(|s| s.direct_reaction_count).sum();
        if let Some(parent) = self.cards.get_mut(parent_id) {
            parent.children = summaries;
            parent.aggregated_reaction_count = parent.direct_reaction_count + children_sum;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardId, ColumnId};
    use crate::card::{Card, CardId, CardType};

    fn test_state() -> BoardState {
        BoardState::new(Board::new(
            "Sprint Retro",
            "facilitator",
            vec!["Went well".into(), "Actions".into()],
        ))
    }

    fn feedback(state: &BoardState) -> Card {
        Card::new(
            state.board.id,
            state.board.columns[0].id,
            "note",
            CardType::Feedback,
            "user",
            false,
        )
    }

    #[test]
    fn created_then_duplicate_is_noop() {
        let mut state = test_state();
        let card = feedback(&state);

        let applied = state
            .apply(&BoardEvent::CardCreated { card: card.clone() })
            .unwrap();
        assert_eq!(applied, Applied::Applied);
        assert_eq!(state.cards.len(), 1);

        let applied = state.apply(&BoardEvent::CardCreated { card }).unwrap();
        assert_eq!(applied, Applied::Noop);
        assert_eq!(state.cards.len(), 1);
    }

    #[test]
    fn delete_absent_card_is_noop() {
        let mut state = test_state();
        let applied = state
            .apply(&BoardEvent::CardDeleted {
                card_id: CardId::new(),
            })
            .unwrap();
        assert_eq!(applied, Applied::Noop);
    }

    #[test]
    fn stale_update_is_dropped() {
        let mut state = test_state();
        let mut card = feedback(&state);
        card.version = 5;
        card.content = "fresh".into();
        state
            .apply(&BoardEvent::CardCreated { card: card.clone() })
            .unwrap();

        let mut stale = card.clone();
        stale.version = 4;
        stale.content = "stale".into();
        let applied = state.apply(&BoardEvent::CardUpdated { card: stale }).unwrap();
        assert_eq!(applied, Applied::Stale);
        assert_eq!(state.cards.get(card.id).unwrap().content, "fresh");

        let mut newer = card.clone();
        newer.version = 6;
        newer.content = "newer".into();
        let applied = state.apply(&BoardEvent::CardUpdated { card: newer }).unwrap();
        assert_eq!(applied, Applied::Applied);
        assert_eq!(state.cards.get(card.id).unwrap().content, "newer");
    }

    #[test]
    fn update_for_locally_deleted_card_commutes() {
        let mut state = test_state();
        let card = feedback(&state);
        state
            .apply(&BoardEvent::CardCreated { card: card.clone() })
            .unwrap();
        state
            .apply(&BoardEvent::CardDeleted { card_id: card.id })
            .unwrap();

        let mut update = card.clone();
        update.version = 9;
        let applied = state.apply(&BoardEvent::CardUpdated { card: update }).unwrap();
        assert_eq!(applied, Applied::Noop);
        assert!(state.cards.get(card.id).is_none());
    }

    #[test]
    fn duplicate_reaction_event_does_not_double_count() {
        let mut state = test_state();
        let card = feedback(&state);
        let card_id = card.id;
        state.apply(&BoardEvent::CardCreated { card }).unwrap();

        let event = BoardEvent::ReactionAdded {
            card_id,
            version: 1,
        };
        assert_eq!(state.apply(&event).unwrap(), Applied::Applied);
        assert_eq!(state.cards.get(card_id).unwrap().direct_reaction_count, 1);

        // Redelivery of the same event is version-stale
        assert_eq!(state.apply(&event).unwrap(), Applied::Stale);
        assert_eq!(state.cards.get(card_id).unwrap().direct_reaction_count, 1);
    }

    #[test]
    fn linked_event_applies_and_diverged_link_commutes() {
        let mut state = test_state();
        let a = feedback(&state);
        let b = feedback(&state);
        let (a_id, b_id) = (a.id, b.id);
        state.apply(&BoardEvent::CardCreated { card: a }).unwrap();
        state.apply(&BoardEvent::CardCreated { card: b }).unwrap();

        let applied = state
            .apply(&BoardEvent::CardLinked {
                source_id: b_id,
                target_id: a_id,
                link_kind: LinkKind::ParentChild,
            })
            .unwrap();
        assert_eq!(applied, Applied::Applied);
        state.cards.verify_consistency().unwrap();

        // A link event referencing a card this replica already dropped
        let applied = state
            .apply(&BoardEvent::CardLinked {
                source_id: CardId::new(),
                target_id: a_id,
                link_kind: LinkKind::ParentChild,
            })
            .unwrap();
        assert_eq!(applied, Applied::Noop);
    }

    #[test]
    fn unlink_event_twice_is_noop() {
        let mut state = test_state();
        let a = feedback(&state);
        let b = feedback(&state);
        let (a_id, b_id) = (a.id, b.id);
        state.apply(&BoardEvent::CardCreated { card: a }).unwrap();
        state.apply(&BoardEvent::CardCreated { card: b }).unwrap();
        state
            .apply(&BoardEvent::CardLinked {
                source_id: b_id,
                target_id: a_id,
                link_kind: LinkKind::ParentChild,
            })
            .unwrap();

        let unlink = BoardEvent::CardUnlinked {
            card_id: b_id,
            link_kind: LinkKind::ParentChild,
        };
        assert_eq!(state.apply(&unlink).unwrap(), Applied::Applied);
        assert_eq!(state.apply(&unlink).unwrap(), Applied::Noop);
    }

    #[test]
    fn board_lifecycle_events() {
        let mut state = test_state();

        let applied = state
            .apply(&BoardEvent::BoardRenamed {
                name: "Renamed".into(),
            })
            .unwrap();
        assert_eq!(applied, Applied::Applied);
        assert_eq!(state.board.name, "Renamed");

        assert_eq!(state.apply(&BoardEvent::BoardClosed).unwrap(), Applied::Applied);
        // Closing twice commutes
        assert_eq!(state.apply(&BoardEvent::BoardClosed).unwrap(), Applied::Noop);

        // Card creation on a closed board commutes to nothing
        let card = feedback(&state);
        assert_eq!(
            state.apply(&BoardEvent::CardCreated { card }).unwrap(),
            Applied::Noop
        );
    }

    #[test]
    fn participant_events() {
        let mut state = test_state();
        let participant = Participant::new("hash-1", "Alice", state.board.id.to_string());

        state
            .apply(&BoardEvent::UserJoined {
                participant: participant.clone(),
            })
            .unwrap();
        assert_eq!(state.participants.len(), 1);

        let applied = state
            .apply(&BoardEvent::UserAliasChanged {
                user_hash: "hash-1".into(),
                alias: "Alicia".into(),
            })
            .unwrap();
        assert_eq!(applied, Applied::Applied);
        assert_eq!(state.participants["hash-1"].alias, "Alicia");

        // Alias change for an unknown participant commutes
        let applied = state
            .apply(&BoardEvent::UserAliasChanged {
                user_hash: "ghost".into(),
                alias: "Ghost".into(),
            })
            .unwrap();
        assert_eq!(applied, Applied::Noop);
    }
}
