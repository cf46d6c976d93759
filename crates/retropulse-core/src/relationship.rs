//! The card relationship engine.
//!
//! Pure functions over a [`CardStore`]: each takes the current store and
//! returns a new one, so callers can swap state atomically and roll back by
//! keeping the old snapshot. Linking rules follow the one-level hierarchy:
//! a child card may never itself have children, feedback groups under
//! feedback, and action cards link to the feedback card they were raised
//! for on a separate axis.
//!
//! Business-rule rejections are reported through [`check_link`] before
//! mutation; the `apply_*` functions re-assert their preconditions because
//! network races can change state between check and apply.

use serde::{Deserialize, Serialize};

use crate::card::{Card, CardId, CardType};
use crate::error::{RelationshipError, Result, RetroError};
use crate::store::CardStore;

/// The kind of link between two cards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LinkKind {
    /// Group a feedback card under another feedback card
    #[serde(rename = "parent_of")]
    ParentChild,
    /// Attach an action card to the feedback card it addresses
    #[serde(rename = "action_feedback")]
    ActionFeedback,
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkKind::ParentChild => write!(f, "parent_of"),
            LinkKind::ActionFeedback => write!(f, "action_feedback"),
        }
    }
}

/// Walk an ancestor chain from `start`, following `next`, looking for
/// `needle`. The visited set guards against corrupt stores; the hierarchy
/// is one level deep today, but the walk stays correct if that is ever
/// relaxed.
fn has_ancestor(
    store: &CardStore,
    start: CardId,
    needle: CardId,
    next: fn(&Card) -> Option<CardId>,
) -> bool {
    let mut visited = std::collections::BTreeSet::new();
    let mut current = start;
    while let Some(card) = store.get(current) {
        if !visited.insert(current) {
            return true; // already cyclic; any link would keep it so
        }
        match next(card) {
            Some(ancestor_id) => {
                if ancestor_id == needle {
                    return true;
                }
                current = ancestor_id;
            }
            None => return false,
        }
    }
    false
}

/// Check whether linking `source` under/to `target` is legal.
///
/// Returns the specific rule that would be violated; [`can_link`] collapses
/// this into the boolean predicate the UI consults.
pub fn check_link(
    store: &CardStore,
    source_id: CardId,
    target_id: CardId,
    kind: LinkKind,
) -> std::result::Result<(), RelationshipError> {
    if source_id == target_id {
        return Err(RelationshipError::SelfLink(source_id));
    }
    let source = store
        .get(source_id)
        .ok_or(RelationshipError::UnknownCard(source_id))?;
    let target = store
        .get(target_id)
        .ok_or(RelationshipError::UnknownCard(target_id))?;

    match kind {
        LinkKind::ParentChild => {
            if source.parent_card_id.is_some() {
                return Err(RelationshipError::AlreadyParented(source_id));
            }
            if source.is_parent() {
                // A card with children may not become someone's child either
                return Err(RelationshipError::DepthExceeded(source_id));
            }
            if target.parent_card_id.is_some() {
                return Err(RelationshipError::DepthExceeded(target_id));
            }
            if source.card_type != CardType::Feedback || target.card_type != CardType::Feedback {
                return Err(RelationshipError::TypeMismatch {
                    kind,
                    source_type: source.card_type,
                    target_type: target.card_type,
                });
            }
            if has_ancestor(store, target_id, source_id, |c| c.parent_card_id) {
                return Err(RelationshipError::Cycle {
                    source_card: source_id,
                    target: target_id,
                });
            }
        }
        LinkKind::ActionFeedback => {
            if source.card_type != CardType::Action || target.card_type != CardType::Feedback {
                return Err(RelationshipError::TypeMismatch {
                    kind,
                    source_type: source.card_type,
                    target_type: target.card_type,
                });
            }
            if has_ancestor(store, target_id, source_id, |c| c.linked_feedback_id) {
                return Err(RelationshipError::Cycle {
                    source_card: source_id,
                    target: target_id,
                });
            }
        }
    }
    Ok(())
}

/// Boolean predicate: is this link legal right now?
pub fn can_link(store: &CardStore, source_id: CardId, target_id: CardId, kind: LinkKind) -> bool {
    check_link(store, source_id, target_id, kind).is_ok()
}

/// Mutable card access for the apply functions; absence at this point means
/// the store changed under us mid-transformation.
fn card_mut(store: &mut CardStore, id: CardId) -> Result<&mut Card> {
    store
        .get_mut(id)
        .ok_or_else(|| RetroError::InvariantViolation(format!("card {} vanished mid-apply", id)))
}

/// Rebuild a parent's derived state from the canonical entries: every
/// embedded summary is refreshed and the aggregate recomputed. This is the
/// only place the dual representation (pointer + embedded array) is
/// reconciled, so the two can never diverge by updating one side alone.
fn refresh_parent(store: &mut CardStore, parent_id: CardId) -> Result<()> {
    let summaries: Vec<_> = {
        let parent = store
            .get(parent_id)
            .ok_or_else(|| RetroError::InvariantViolation(format!("missing parent {}", parent_id)))?;
        parent
            .children
            .iter()
            .map(|s| {
                store
                    .get(s.id)
                    .map(Card::summary)
                    .ok_or_else(|| {
                        RetroError::InvariantViolation(format!(
                            "parent {} embeds missing child {}",
                            parent_id, s.id
                        ))
                    })
            })
            .collect::<Result<_>>()?
    };

    let children_sum: u32 = summaries.iter().map(|s| s.direct_reaction_count).sum();
    let parent = card_mut(store, parent_id)?;
    parent.children = summaries;
    parent.aggregated_reaction_count = parent.direct_reaction_count + children_sum;
    Ok(())
}

/// Link `source` under/to `target`, returning the updated store.
///
/// Re-asserts [`check_link`]; a violation here means the state changed
/// between check and apply and surfaces as the specific rule hit.
pub fn apply_link(
    store: &CardStore,
    source_id: CardId,
    target_id: CardId,
    kind: LinkKind,
) -> Result<CardStore> {
    check_link(store, source_id, target_id, kind).map_err(RetroError::Relationship)?;

    let mut next = store.clone();
    match kind {
        LinkKind::ParentChild => {
            let summary = {
                let source = card_mut(&mut next, source_id)?;
                source.parent_card_id = Some(target_id);
                source.bump();
                source.summary()
            };
            let target = card_mut(&mut next, target_id)?;
            target.children.push(summary);
            target.bump();
            refresh_parent(&mut next, target_id)?;
        }
        LinkKind::ActionFeedback => {
            let source = card_mut(&mut next, source_id)?;
            source.linked_feedback_id = Some(target_id);
            source.bump();
        }
    }
    Ok(next)
}

/// Remove `child` from its parent group, returning the updated store.
///
/// Signals [`RelationshipError::NotLinked`] when the card has no parent, so
/// callers can distinguish "nothing to do" from "already handled".
pub fn apply_unlink(store: &CardStore, child_id: CardId) -> Result<CardStore> {
    let child = store
        .get(child_id)
        .ok_or(RelationshipError::UnknownCard(child_id))?;
    let parent_id = child
        .parent_card_id
        .ok_or(RelationshipError::NotLinked(child_id))?;

    let mut next = store.clone();
    {
        let child = card_mut(&mut next, child_id)?;
        child.parent_card_id = None;
        child.bump();
    }
    if let Some(parent) = next.get_mut(parent_id) {
        parent.children.retain(|s| s.id != child_id);
        parent.bump();
        refresh_parent(&mut next, parent_id)?;
    }
    Ok(next)
}

/// Detach an action card from its linked feedback card.
pub fn apply_action_unlink(store: &CardStore, source_id: CardId) -> Result<CardStore> {
    let source = store
        .get(source_id)
        .ok_or(RelationshipError::UnknownCard(source_id))?;
    if source.linked_feedback_id.is_none() {
        return Err(RelationshipError::NotLinked(source_id).into());
    }

    let mut next = store.clone();
    let source = card_mut(&mut next, source_id)?;
    source.linked_feedback_id = None;
    source.bump();
    Ok(next)
}

/// Apply a reaction delta (+1 or -1) to a card, returning the updated store.
///
/// The direct count is floored at zero. When the card is a child, the
/// parent's aggregate and the embedded child entry are updated in the same
/// transformation; updating one without the other was a real defect class
/// in systems of this shape.
pub fn apply_reaction_delta(store: &CardStore, card_id: CardId, delta: i32) -> Result<CardStore> {
    let card = store
        .get(card_id)
        .ok_or(RelationshipError::UnknownCard(card_id))?;

    let old_direct = card.direct_reaction_count;
    let new_direct = (i64::from(old_direct) + i64::from(delta)).max(0) as u32;
    if new_direct == old_direct {
        return Ok(store.clone());
    }

    let mut next = store.clone();
    let parent_id = {
        let card = card_mut(&mut next, card_id)?;
        card.direct_reaction_count = new_direct;
        card.bump();
        let children_sum: u32 = card.children.iter().map(|s| s.direct_reaction_count).sum();
        // Own aggregate: direct plus any children this card has
        card.aggregated_reaction_count = new_direct + children_sum;
        card.parent_card_id
    };

    if let Some(parent_id) = parent_id {
        if next.get(parent_id).is_none() {
            return Err(RetroError::InvariantViolation(format!(
                "card {} points at missing parent {}",
                card_id, parent_id
            )));
        }
        card_mut(&mut next, parent_id)?.bump();
        refresh_parent(&mut next, parent_id)?;
    }
    Ok(next)
}

/// Delete a card, returning the updated store.
///
/// Children are orphaned (never deleted), a parent link is removed first,
/// and dangling action→feedback references to the deleted card are cleared.
/// Deleting an absent card returns the store unchanged.
pub fn apply_delete(store: &CardStore, card_id: CardId) -> Result<CardStore> {
    if !store.contains(card_id) {
        return Ok(store.clone());
    }

    // Detach from a parent group first so the parent's derived state stays
    // consistent once the card is gone.
    let mut next = if store.get(card_id).map(|c| c.is_child()).unwrap_or(false) {
        apply_unlink(store, card_id)?
    } else {
        store.clone()
    };

    for child_id in next.children_of(card_id) {
        if let Some(child) = next.get_mut(child_id) {
            child.parent_card_id = None;
            child.bump();
        }
    }

    let dangling: Vec<CardId> = next
        .iter()
        .filter(|c| c.linked_feedback_id == Some(card_id))
        .map(|c| c.id)
        .collect();
    for id in dangling {
        if let Some(card) = next.get_mut(id) {
            card.linked_feedback_id = None;
            card.bump();
        }
    }

    next.remove(card_id);
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardId, ColumnId};

    fn store_with(cards: Vec<Card>) -> CardStore {
        let mut store = CardStore::new();
        for card in cards {
            store.insert(card);
        }
        store
    }

    fn feedback(board: BoardId, column: ColumnId) -> Card {
        Card::new(board, column, "note", CardType::Feedback, "user", false)
    }

    fn action(board: BoardId, column: ColumnId) -> Card {
        Card::new(board, column, "do it", CardType::Action, "user", false)
    }

    #[test]
    fn link_two_standalone_feedback_cards() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let b = feedback(board, column);
        let (a_id, b_id) = (a.id, b.id);
        let store = store_with(vec![a, b]);

        assert!(can_link(&store, b_id, a_id, LinkKind::ParentChild));

        let store = apply_link(&store, b_id, a_id, LinkKind::ParentChild).unwrap();
        let parent = store.get(a_id).unwrap();
        assert_eq!(parent.children.len(), 1);
        assert_eq!(parent.children[0].id, b_id);
        assert_eq!(parent.aggregated_reaction_count, 0);
        assert_eq!(store.get(b_id).unwrap().parent_card_id, Some(a_id));
        store.verify_consistency().unwrap();
    }

    #[test]
    fn reaction_on_child_propagates_to_parent() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let b = feedback(board, column);
        let (a_id, b_id) = (a.id, b.id);
        let store = store_with(vec![a, b]);
        let store = apply_link(&store, b_id, a_id, LinkKind::ParentChild).unwrap();

        let store = apply_reaction_delta(&store, b_id, 1).unwrap();
        assert_eq!(store.get(b_id).unwrap().direct_reaction_count, 1);
        assert_eq!(store.get(b_id).unwrap().aggregated_reaction_count, 1);
        let parent = store.get(a_id).unwrap();
        assert_eq!(parent.direct_reaction_count, 0);
        assert_eq!(parent.aggregated_reaction_count, 1);
        // Embedded entry and canonical entry agree
        assert_eq!(parent.children[0].direct_reaction_count, 1);
        store.verify_consistency().unwrap();
    }

    #[test]
    fn one_level_rule_rejects_linking_under_a_child() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let b = feedback(board, column);
        let c = feedback(board, column);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        let store = store_with(vec![a, b, c]);
        let store = apply_link(&store, b_id, a_id, LinkKind::ParentChild).unwrap();

        // B already has parent A; C may not group under B
        assert!(!can_link(&store, c_id, b_id, LinkKind::ParentChild));
        assert_eq!(
            check_link(&store, c_id, b_id, LinkKind::ParentChild),
            Err(RelationshipError::DepthExceeded(b_id))
        );
        // And B itself may not become someone's child again, nor a parent's parent
        assert_eq!(
            check_link(&store, b_id, c_id, LinkKind::ParentChild),
            Err(RelationshipError::AlreadyParented(b_id))
        );
        // A has children, so it cannot become a child of C
        assert_eq!(
            check_link(&store, a_id, c_id, LinkKind::ParentChild),
            Err(RelationshipError::DepthExceeded(a_id))
        );
    }

    #[test]
    fn self_link_rejected() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let a_id = a.id;
        let store = store_with(vec![a]);

        assert_eq!(
            check_link(&store, a_id, a_id, LinkKind::ParentChild),
            Err(RelationshipError::SelfLink(a_id))
        );
    }

    #[test]
    fn action_cards_use_the_action_feedback_axis() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let d = action(board, column);
        let (a_id, d_id) = (a.id, d.id);
        let store = store_with(vec![a, d]);

        assert!(can_link(&store, d_id, a_id, LinkKind::ActionFeedback));
        // Wrong link kind for an action card
        assert!(!can_link(&store, d_id, a_id, LinkKind::ParentChild));
        // And the axis is directional: feedback does not link to action
        assert!(!can_link(&store, a_id, d_id, LinkKind::ActionFeedback));

        let store = apply_link(&store, d_id, a_id, LinkKind::ActionFeedback).unwrap();
        assert_eq!(store.get(d_id).unwrap().linked_feedback_id, Some(a_id));
        // The parent/child side is untouched
        assert!(store.get(a_id).unwrap().children.is_empty());

        let store = apply_action_unlink(&store, d_id).unwrap();
        assert_eq!(store.get(d_id).unwrap().linked_feedback_id, None);
    }

    #[test]
    fn link_unlink_round_trip_restores_counts() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let mut a = feedback(board, column);
        a.direct_reaction_count = 2;
        a.aggregated_reaction_count = 2;
        let b = feedback(board, column);
        let (a_id, b_id) = (a.id, b.id);
        let store = store_with(vec![a, b]);

        let linked = apply_link(&store, b_id, a_id, LinkKind::ParentChild).unwrap();
        let linked = apply_reaction_delta(&linked, b_id, 1).unwrap();
        assert_eq!(linked.get(a_id).unwrap().aggregated_reaction_count, 3);

        let unlinked = apply_unlink(&linked, b_id).unwrap();
        assert_eq!(unlinked.get(b_id).unwrap().parent_card_id, None);
        let former_parent = unlinked.get(a_id).unwrap();
        assert!(former_parent.children.is_empty());
        assert_eq!(former_parent.aggregated_reaction_count, 2);
        unlinked.verify_consistency().unwrap();
    }

    #[test]
    fn unlink_without_parent_signals_not_linked() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let a_id = a.id;
        let store = store_with(vec![a]);

        match apply_unlink(&store, a_id) {
            Err(RetroError::Relationship(RelationshipError::NotLinked(id))) => {
                assert_eq!(id, a_id)
            }
            other => panic!("expected NotLinked, got {:?}", other),
        }
    }

    #[test]
    fn reaction_delta_floors_at_zero() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let a_id = a.id;
        let store = store_with(vec![a]);

        let store = apply_reaction_delta(&store, a_id, -1).unwrap();
        assert_eq!(store.get(a_id).unwrap().direct_reaction_count, 0);
        assert_eq!(store.get(a_id).unwrap().aggregated_reaction_count, 0);
    }

    #[test]
    fn reaction_on_parent_updates_own_aggregate() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let b = feedback(board, column);
        let (a_id, b_id) = (a.id, b.id);
        let store = store_with(vec![a, b]);
        let store = apply_link(&store, b_id, a_id, LinkKind::ParentChild).unwrap();
        let store = apply_reaction_delta(&store, b_id, 1).unwrap();

        let store = apply_reaction_delta(&store, a_id, 1).unwrap();
        let parent = store.get(a_id).unwrap();
        assert_eq!(parent.direct_reaction_count, 1);
        assert_eq!(parent.aggregated_reaction_count, 2);
        store.verify_consistency().unwrap();
    }

    #[test]
    fn delete_parent_orphans_children() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let b = feedback(board, column);
        let (a_id, b_id) = (a.id, b.id);
        let store = store_with(vec![a, b]);
        let store = apply_link(&store, b_id, a_id, LinkKind::ParentChild).unwrap();

        let store = apply_delete(&store, a_id).unwrap();
        assert!(store.get(a_id).is_none());
        let orphan = store.get(b_id).unwrap();
        assert_eq!(orphan.parent_card_id, None);
        store.verify_consistency().unwrap();
    }

    #[test]
    fn delete_child_repairs_parent_aggregate() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let b = feedback(board, column);
        let (a_id, b_id) = (a.id, b.id);
        let store = store_with(vec![a, b]);
        let store = apply_link(&store, b_id, a_id, LinkKind::ParentChild).unwrap();
        let store = apply_reaction_delta(&store, b_id, 1).unwrap();

        let store = apply_delete(&store, b_id).unwrap();
        let parent = store.get(a_id).unwrap();
        assert!(parent.children.is_empty());
        assert_eq!(parent.aggregated_reaction_count, 0);
        store.verify_consistency().unwrap();
    }

    #[test]
    fn delete_feedback_clears_dangling_action_links() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let d = action(board, column);
        let (a_id, d_id) = (a.id, d.id);
        let store = store_with(vec![a, d]);
        let store = apply_link(&store, d_id, a_id, LinkKind::ActionFeedback).unwrap();

        let store = apply_delete(&store, a_id).unwrap();
        assert_eq!(store.get(d_id).unwrap().linked_feedback_id, None);
    }

    #[test]
    fn delete_absent_card_is_noop() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let store = store_with(vec![a]);

        let after = apply_delete(&store, CardId::new()).unwrap();
        assert_eq!(after, store);
    }

    #[test]
    fn apply_link_reasserts_precondition() {
        let board = BoardId::new();
        let column = ColumnId::new();
        let a = feedback(board, column);
        let b = feedback(board, column);
        let c = feedback(board, column);
        let (a_id, b_id, c_id) = (a.id, b.id, c.id);
        let store = store_with(vec![a, b, c]);
        let store = apply_link(&store, b_id, a_id, LinkKind::ParentChild).unwrap();

        // The race: a second client grouped B already; applying C under B
        // must fail even if the caller skipped can_link
        match apply_link(&store, c_id, b_id, LinkKind::ParentChild) {
            Err(RetroError::Relationship(RelationshipError::DepthExceeded(id))) => {
                assert_eq!(id, b_id)
            }
            other => panic!("expected DepthExceeded, got {:?}", other),
        }
    }
}
