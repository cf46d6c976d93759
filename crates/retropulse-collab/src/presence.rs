//! Real-time presence awareness for board participants.
//!
//! Tracks who is currently on a board, under which alias, and whether they
//! are actively contributing or have gone idle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status indicating a participant's current presence state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// Participant is actively working on the board
    Active,
    /// Participant has the board open but is idle
    Idle,
    /// Participant is away from the application
    Away,
    /// Participant is offline
    Offline,
}

impl Default for PresenceStatus {
    fn default() -> Self {
        PresenceStatus::Offline
    }
}

impl PresenceStatus {
    /// Check if the participant is considered online (active, idle, or away).
    pub fn is_online(&self) -> bool {
        !matches!(self, PresenceStatus::Offline)
    }

    /// Check if the participant is actively working.
    pub fn is_active(&self) -> bool {
        matches!(self, PresenceStatus::Active)
    }
}

/// A participant's presence on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// Opaque hash identifying the user (never a login identity)
    pub user_hash: String,

    /// Display alias chosen by the participant
    pub alias: String,

    /// ID of the board the participant has joined
    pub board_id: String,

    /// Current presence status
    pub status: PresenceStatus,

    /// Color assigned to this participant for visual identification
    pub color: Option<String>,

    /// When this participant joined the board
    pub joined_at: DateTime<Utc>,

    /// Last time activity was detected
    pub last_active_at: DateTime<Utc>,
}

impl Participant {
    /// Create a new participant joining a board.
    pub fn new(
        user_hash: impl Into<String>,
        alias: impl Into<String>,
        board_id: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_hash: user_hash.into(),
            alias: alias.into(),
            board_id: board_id.into(),
            status: PresenceStatus::Active,
            color: None,
            joined_at: now,
            last_active_at: now,
        }
    }

    /// Set the color for this participant.
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Change the participant's alias.
    pub fn rename(&mut self, alias: impl Into<String>) {
        self.alias = alias.into();
        self.touch();
    }

    /// Mark the participant as active and update last_active_at.
    pub fn touch(&mut self) {
        self.last_active_at = Utc::now();
        if self.status != PresenceStatus::Active {
            self.status = PresenceStatus::Active;
        }
    }

    /// Mark the participant as idle.
    pub fn mark_idle(&mut self) {
        self.status = PresenceStatus::Idle;
    }

    /// Mark the participant as away.
    pub fn mark_away(&mut self) {
        self.status = PresenceStatus::Away;
    }

    /// Mark the participant as offline.
    pub fn mark_offline(&mut self) {
        self.status = PresenceStatus::Offline;
    }

    /// Get the duration since the participant joined.
    pub fn session_duration(&self) -> chrono::Duration {
        Utc::now() - self.joined_at
    }

    /// Get the duration since the last activity.
    pub fn idle_duration(&self) -> chrono::Duration {
        Utc::now() - self.last_active_at
    }

    /// Check if the participant should be considered idle based on a threshold.
    pub fn should_be_idle(&self, idle_threshold: chrono::Duration) -> bool {
        self.status == PresenceStatus::Active && self.idle_duration() > idle_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_status() {
        assert!(PresenceStatus::Active.is_online());
        assert!(PresenceStatus::Idle.is_online());
        assert!(PresenceStatus::Away.is_online());
        assert!(!PresenceStatus::Offline.is_online());

        assert!(PresenceStatus::Active.is_active());
        assert!(!PresenceStatus::Idle.is_active());
    }

    #[test]
    fn test_participant_creation() {
        let participant = Participant::new("hash-1", "Alice", "board-1").with_color("#FF5733");

        assert_eq!(participant.status, PresenceStatus::Active);
        assert_eq!(participant.alias, "Alice");
        assert_eq!(participant.color, Some("#FF5733".to_string()));
    }

    #[test]
    fn test_participant_status_updates() {
        let mut participant = Participant::new("hash-1", "Alice", "board-1");

        participant.mark_idle();
        assert_eq!(participant.status, PresenceStatus::Idle);

        participant.touch();
        assert_eq!(participant.status, PresenceStatus::Active);

        participant.mark_offline();
        assert_eq!(participant.status, PresenceStatus::Offline);
    }

    #[test]
    fn test_participant_rename() {
        let mut participant = Participant::new("hash-1", "Alice", "board-1");
        participant.mark_away();

        participant.rename("Bob");
        assert_eq!(participant.alias, "Bob");
        // Renaming counts as activity
        assert_eq!(participant.status, PresenceStatus::Active);
    }

    #[test]
    fn test_participant_serde_round_trip() {
        let participant = Participant::new("hash-1", "Alice", "board-1");
        let json = serde_json::to_string(&participant).unwrap();
        let back: Participant = serde_json::from_str(&json).unwrap();
        assert_eq!(participant, back);
    }
}
