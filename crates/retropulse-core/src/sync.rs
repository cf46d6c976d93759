//! Client sync session: optimistic updates, rollback, and remote event
//! reconciliation.
//!
//! The session is transport-agnostic; `retropulse-client` feeds it decoded
//! envelopes and snapshots. The reconnection contract is
//! fetch-then-resubscribe: after a (re)connect the session discards every
//! event delivered before the snapshot lands, because applying a stale
//! delta on top of fresh state could regress a value.
//!
//! Connection phases:
//! ```text
//! Disconnected → Fetching → Live
//!        ↑___________↺________|
//! ```

use crate::error::{Result, RetroError, SyncError};
use crate::event::{BoardEvent, EventEnvelope};
use crate::quota::{QuotaKind, QuotaSnapshot, QuotaTracker};
use crate::state::{Applied, BoardState};

/// Where the session is in the connect/fetch/subscribe cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// No transport attached
    Disconnected,
    /// Connected; waiting for the REST snapshot before applying events
    Fetching,
    /// Snapshot installed; events apply as they arrive
    Live,
}

/// One in-flight optimistic operation.
#[derive(Debug, Clone)]
struct PendingOp {
    id: u64,
    event: BoardEvent,
    /// State snapshot taken before this op applied, for rollback
    pre_state: BoardState,
}

/// Client-side session for one board.
pub struct SyncSession {
    phase: ConnectionPhase,
    state: Option<BoardState>,
    pending: Vec<PendingOp>,
    next_op_id: u64,
    quota: QuotaTracker,
    discarded_events: u64,
}

impl SyncSession {
    /// Create a disconnected session
    pub fn new() -> Self {
        Self {
            phase: ConnectionPhase::Disconnected,
            state: None,
            pending: Vec::new(),
            next_op_id: 1,
            quota: QuotaTracker::new(),
            discarded_events: 0,
        }
    }

    /// Current connection phase
    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    /// The replicated board state, if a snapshot has been installed
    pub fn state(&self) -> Option<&BoardState> {
        self.state.as_ref()
    }

    /// The advisory quota view
    pub fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    /// Install a refetched quota reading
    pub fn load_quota(&mut self, kind: QuotaKind, snapshot: QuotaSnapshot) {
        self.quota.load(kind, snapshot);
    }

    /// Number of events discarded while waiting for a snapshot
    pub fn discarded_events(&self) -> u64 {
        self.discarded_events
    }

    /// Transport connected (or reconnected): enter the fetch window.
    /// Events received from here on are discarded until the snapshot lands.
    pub fn begin_fetch(&mut self) {
        self.phase = ConnectionPhase::Fetching;
    }

    /// Install the REST snapshot, replacing local state wholesale.
    ///
    /// Any optimistic ops still journaled predate the snapshot and are
    /// dropped; the fetched state already reflects their server outcome.
    pub fn install_snapshot(&mut self, state: BoardState) {
        self.state = Some(state);
        self.pending.clear();
        self.phase = ConnectionPhase::Live;
    }

    /// Transport dropped
    pub fn disconnect(&mut self) {
        self.phase = ConnectionPhase::Disconnected;
    }

    /// Apply a server-pushed event.
    ///
    /// Returns [`Applied::Discarded`] outside the live phase. An invariant
    /// violation flips the session back to `Fetching` so the caller
    /// self-heals with a full refetch.
    pub fn handle_remote(&mut self, envelope: &EventEnvelope) -> Result<Applied> {
        if self.phase != ConnectionPhase::Live {
            self.discarded_events += 1;
            return Ok(Applied::Discarded);
        }
        let state = self.state.as_mut().ok_or(SyncError::NotLive)?;
        if state.board.id != envelope.board_id {
            return Ok(Applied::Noop);
        }
        match state.apply(&envelope.event) {
            Ok(applied) => Ok(applied),
            Err(err @ RetroError::InvariantViolation(_)) => {
                self.phase = ConnectionPhase::Fetching;
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Apply a local mutation optimistically, before server confirmation.
    ///
    /// Returns the operation id used to [`confirm`](Self::confirm) or
    /// [`reject`](Self::reject) once the HTTP response arrives.
    pub fn apply_optimistic(&mut self, event: BoardEvent) -> Result<u64> {
        if self.phase != ConnectionPhase::Live {
            return Err(SyncError::NotLive.into());
        }
        let state = self.state.as_mut().ok_or(SyncError::NotLive)?;
        let pre_state = state.clone();
        state.apply(&event)?;

        match &event {
            BoardEvent::CardCreated { .. } | BoardEvent::CardDeleted { .. } => {
                self.quota.note_mutation(QuotaKind::Cards)
            }
            BoardEvent::ReactionAdded { .. } | BoardEvent::ReactionRemoved { .. } => {
                self.quota.note_mutation(QuotaKind::Reactions)
            }
            _ => {}
        }

        let id = self.next_op_id;
        self.next_op_id += 1;
        self.pending.push(PendingOp {
            id,
            event,
            pre_state,
        });
        Ok(id)
    }

    /// Server confirmed the operation. The optional event is the server's
    /// reconciled form (e.g. the confirmed card with its assigned version)
    /// and runs through the same reducer.
    pub fn confirm(&mut self, op_id: u64, server_event: Option<&BoardEvent>) -> Result<Applied> {
        let idx = self
            .pending
            .iter()
            .position(|op| op.id == op_id)
            .ok_or(SyncError::UnknownOp(op_id))?;
        self.pending.remove(idx);

        match server_event {
            Some(event) => {
                let state = self.state.as_mut().ok_or(SyncError::NotLive)?;
                state.apply(event)
            }
            None => Ok(Applied::Noop),
        }
    }

    /// Server rejected the operation: roll back to its pre-state and replay
    /// every later in-flight op so unrelated optimistic work survives.
    pub fn reject(&mut self, op_id: u64) -> Result<()> {
        let idx = self
            .pending
            .iter()
            .position(|op| op.id == op_id)
            .ok_or(SyncError::UnknownOp(op_id))?;
        let rejected = self.pending.remove(idx);

        let mut state = rejected.pre_state;
        let mut replayed = Vec::with_capacity(self.pending.len());
        for op in self.pending.drain(idx..) {
            let pre_state = state.clone();
            // A replay can legitimately no-op if it depended on the
            // rejected op; its own confirm/reject still resolves it
            state.apply(&op.event)?;
            replayed.push(PendingOp {
                id: op.id,
                event: op.event,
                pre_state,
            });
        }
        self.pending.extend(replayed);
        self.state = Some(state);
        Ok(())
    }

    /// Number of in-flight optimistic operations
    pub fn pending_ops(&self) -> usize {
        self.pending.len()
    }
}

impl Default for SyncSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::card::{Card, CardType};
    use crate::event::EventEnvelope;

    fn snapshot() -> BoardState {
        BoardState::new(Board::new(
            "Sprint Retro",
            "facilitator",
            vec!["Went well".into()],
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

    fn live_session() -> SyncSession {
        let mut session = SyncSession::new();
        session.begin_fetch();
        session.install_snapshot(snapshot());
        session
    }

    #[test]
    fn events_before_snapshot_are_discarded() {
        let mut session = SyncSession::new();
        session.begin_fetch();

        let state = snapshot();
        let card = feedback(&state);
        let envelope = EventEnvelope::new(state.board.id, BoardEvent::CardCreated { card });

        let applied = session.handle_remote(&envelope).unwrap();
        assert_eq!(applied, Applied::Discarded);
        assert_eq!(session.discarded_events(), 1);

        session.install_snapshot(state);
        assert_eq!(session.phase(), ConnectionPhase::Live);
        // The same event now applies
        let applied = session.handle_remote(&envelope).unwrap();
        assert_eq!(applied, Applied::Applied);
        assert_eq!(session.state().unwrap().cards.len(), 1);
    }

    #[test]
    fn event_for_another_board_is_ignored() {
        let mut session = live_session();
        let other = snapshot();
        let card = feedback(&other);
        let envelope = EventEnvelope::new(other.board.id, BoardEvent::CardCreated { card });

        assert_eq!(session.handle_remote(&envelope).unwrap(), Applied::Noop);
        assert!(session.state().unwrap().cards.is_empty());
    }

    #[test]
    fn optimistic_create_then_confirm() {
        let mut session = live_session();
        let card = feedback(session.state().unwrap());
        let card_id = card.id;

        let op = session
            .apply_optimistic(BoardEvent::CardCreated { card: card.clone() })
            .unwrap();
        assert_eq!(session.state().unwrap().cards.len(), 1);
        assert_eq!(session.pending_ops(), 1);

        // Server confirms with the version it assigned
        let mut confirmed = card;
        confirmed.version = 1;
        session
            .confirm(op, Some(&BoardEvent::CardUpdated { card: confirmed }))
            .unwrap();
        assert_eq!(session.pending_ops(), 0);
        assert_eq!(session.state().unwrap().cards.get(card_id).unwrap().version, 1);
    }

    #[test]
    fn optimistic_rejection_rolls_back() {
        let mut session = live_session();
        let card = feedback(session.state().unwrap());
        let card_id = card.id;

        let op = session
            .apply_optimistic(BoardEvent::CardCreated { card })
            .unwrap();
        assert!(session.state().unwrap().cards.contains(card_id));

        session.reject(op).unwrap();
        assert!(!session.state().unwrap().cards.contains(card_id));
        assert_eq!(session.pending_ops(), 0);
    }

    #[test]
    fn rejection_preserves_later_inflight_ops() {
        let mut session = live_session();
        let first = feedback(session.state().unwrap());
        let second = feedback(session.state().unwrap());
        let (first_id, second_id) = (first.id, second.id);

        let op_first = session
            .apply_optimistic(BoardEvent::CardCreated { card: first })
            .unwrap();
        let op_second = session
            .apply_optimistic(BoardEvent::CardCreated { card: second })
            .unwrap();
        assert_eq!(session.state().unwrap().cards.len(), 2);

        // The first op bounces; the second's optimistic effect survives
        session.reject(op_first).unwrap();
        let state = session.state().unwrap();
        assert!(!state.cards.contains(first_id));
        assert!(state.cards.contains(second_id));

        // And the survivor can still be confirmed
        session.confirm(op_second, None).unwrap();
        assert_eq!(session.pending_ops(), 0);
    }

    #[test]
    fn optimistic_mutations_mark_quota_stale() {
        let mut session = live_session();
        session.load_quota(
            QuotaKind::Cards,
            QuotaSnapshot {
                used: 0,
                limit: Some(10),
            },
        );

        let card = feedback(session.state().unwrap());
        session
            .apply_optimistic(BoardEvent::CardCreated { card })
            .unwrap();
        assert_eq!(
            session.quota().state(QuotaKind::Cards),
            crate::quota::QuotaState::Stale
        );
    }

    #[test]
    fn optimistic_requires_live_phase() {
        let mut session = SyncSession::new();
        let state = snapshot();
        let card = feedback(&state);

        let err = session
            .apply_optimistic(BoardEvent::CardCreated { card })
            .unwrap_err();
        assert!(matches!(err, RetroError::Sync(SyncError::NotLive)));
    }

    #[test]
    fn confirm_unknown_op_errors() {
        let mut session = live_session();
        let err = session.confirm(42, None).unwrap_err();
        assert!(matches!(err, RetroError::Sync(SyncError::UnknownOp(42))));
    }

    #[test]
    fn reconnect_drops_stale_journal() {
        let mut session = live_session();
        let card = feedback(session.state().unwrap());
        session
            .apply_optimistic(BoardEvent::CardCreated { card })
            .unwrap();
        assert_eq!(session.pending_ops(), 1);

        session.disconnect();
        session.begin_fetch();
        session.install_snapshot(snapshot());
        assert_eq!(session.pending_ops(), 0);
        assert_eq!(session.phase(), ConnectionPhase::Live);
    }
}
