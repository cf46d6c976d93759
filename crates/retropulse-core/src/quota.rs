//! Per-user quotas for card creation and reactions.
//!
//! Two halves: the [`QuotaTracker`] is the client-side advisory view that
//! disables controls before a request is even issued, and the
//! [`QuotaLedger`] is the server-side authoritative count that actually
//! rejects with a quota error. The tracker tolerates being stale; a server
//! rejection after a stale "allowed" reading is a normal race, not a bug.
//!
//! Tracker state transitions:
//! ```text
//! Unknown → Loaded ↔ Stale
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::QuotaError;

/// Which quota a count applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaKind {
    /// Card creation quota
    Cards,
    /// Reaction quota
    Reactions,
}

impl std::fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaKind::Cards => write!(f, "card"),
            QuotaKind::Reactions => write!(f, "reaction"),
        }
    }
}

/// Freshness of a client-side quota reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaState {
    /// No reading fetched yet
    Unknown,
    /// Reading reflects the last server response
    Loaded,
    /// A mutation happened since the last reading; refetch pending
    Stale,
}

impl QuotaState {
    /// Check if a state transition is valid
    pub fn can_transition_to(&self, target: &QuotaState) -> bool {
        match (self, target) {
            (QuotaState::Unknown, QuotaState::Loaded) => true,
            (QuotaState::Loaded, QuotaState::Stale) => true,
            (QuotaState::Stale, QuotaState::Loaded) => true,
            // A mutation while already stale stays stale
            (QuotaState::Stale, QuotaState::Stale) => true,
            _ => false,
        }
    }
}

impl Default for QuotaState {
    fn default() -> Self {
        QuotaState::Unknown
    }
}

/// A point-in-time quota reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaSnapshot {
    /// Count consumed by this user on this board
    pub used: u32,
    /// Configured limit; None means unlimited
    pub limit: Option<u32>,
}

impl QuotaSnapshot {
    /// Remaining allowance, None when unlimited
    pub fn remaining(&self) -> Option<u32> {
        self.limit.map(|l| l.saturating_sub(self.used))
    }

    /// Check if the allowance is used up
    pub fn is_exhausted(&self) -> bool {
        matches!(self.remaining(), Some(0))
    }
}

/// Client-side advisory quota view for one user on one board.
///
/// The answers are best-effort: while `Unknown` everything is allowed and
/// the server stays authoritative.
#[derive(Debug, Clone, Default)]
pub struct QuotaTracker {
    cards: (QuotaState, QuotaSnapshot),
    reactions: (QuotaState, QuotaSnapshot),
}

impl QuotaTracker {
    /// Create a tracker with both quotas unknown
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: QuotaKind) -> &(QuotaState, QuotaSnapshot) {
        match kind {
            QuotaKind::Cards => &self.cards,
            QuotaKind::Reactions => &self.reactions,
        }
    }

    fn slot_mut(&mut self, kind: QuotaKind) -> &mut (QuotaState, QuotaSnapshot) {
        match kind {
            QuotaKind::Cards => &mut self.cards,
            QuotaKind::Reactions => &mut self.reactions,
        }
    }

    /// Current freshness of a quota reading
    pub fn state(&self, kind: QuotaKind) -> QuotaState {
        self.slot(kind).0
    }

    /// Last known reading for a quota
    pub fn snapshot(&self, kind: QuotaKind) -> QuotaSnapshot {
        self.slot(kind).1
    }

    /// Install a fresh server reading
    pub fn load(&mut self, kind: QuotaKind, snapshot: QuotaSnapshot) {
        let slot = self.slot_mut(kind);
        slot.0 = QuotaState::Loaded;
        slot.1 = snapshot;
    }

    /// Record a local mutation that could change this quota; the reading is
    /// stale until the next load
    pub fn note_mutation(&mut self, kind: QuotaKind) {
        let slot = self.slot_mut(kind);
        if slot.0 != QuotaState::Unknown {
            slot.0 = QuotaState::Stale;
        }
    }

    fn allows(&self, kind: QuotaKind) -> bool {
        let (state, snapshot) = self.slot(kind);
        match state {
            QuotaState::Unknown => true,
            _ => !snapshot.is_exhausted(),
        }
    }

    /// Advisory check consulted before issuing a card creation
    pub fn can_create_card(&self) -> bool {
        self.allows(QuotaKind::Cards)
    }

    /// Advisory check consulted before issuing a reaction
    pub fn can_react(&self) -> bool {
        self.allows(QuotaKind::Reactions)
    }
}

/// Server-side authoritative per-user usage counts for one board.
#[derive(Debug, Clone, Default)]
pub struct QuotaLedger {
    card_limit: Option<u32>,
    reaction_limit: Option<u32>,
    used: HashMap<(String, QuotaKind), u32>,
}

impl QuotaLedger {
    /// Create a ledger with the configured limits (None = unlimited)
    pub fn new(card_limit: Option<u32>, reaction_limit: Option<u32>) -> Self {
        Self {
            card_limit,
            reaction_limit,
            used: HashMap::new(),
        }
    }

    fn limit(&self, kind: QuotaKind) -> Option<u32> {
        match kind {
            QuotaKind::Cards => self.card_limit,
            QuotaKind::Reactions => self.reaction_limit,
        }
    }

    fn used(&self, kind: QuotaKind, user_hash: &str) -> u32 {
        self.used
            .get(&(user_hash.to_string(), kind))
            .copied()
            .unwrap_or(0)
    }

    /// Check whether the user has allowance left
    pub fn check(&self, kind: QuotaKind, user_hash: &str) -> Result<(), QuotaError> {
        if let Some(limit) = self.limit(kind) {
            if self.used(kind, user_hash) >= limit {
                return Err(QuotaError::Exceeded { kind, limit });
            }
        }
        Ok(())
    }

    /// Consume one unit of allowance
    pub fn charge(&mut self, kind: QuotaKind, user_hash: &str) -> Result<(), QuotaError> {
        self.check(kind, user_hash)?;
        *self
            .used
            .entry((user_hash.to_string(), kind))
            .or_insert(0) += 1;
        Ok(())
    }

    /// Return one unit of allowance (card deleted, reaction removed)
    pub fn release(&mut self, kind: QuotaKind, user_hash: &str) {
        if let Some(count) = self.used.get_mut(&(user_hash.to_string(), kind)) {
            *count = count.saturating_sub(1);
        }
    }

    /// Current reading for a user, suitable for the quota endpoints
    pub fn snapshot(&self, kind: QuotaKind, user_hash: &str) -> QuotaSnapshot {
        QuotaSnapshot {
            used: self.used(kind, user_hash),
            limit: self.limit(kind),
        }
    }
}
