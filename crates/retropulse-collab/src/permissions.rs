//! Permission management with fine-grained access control using bitflags.
//!
//! Board-level permissions combine into the roles a retrospective actually
//! uses: silent observers, regular participants, and the facilitator who
//! owns the board lifecycle.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Bitflag-based permissions for board access control.
    ///
    /// Permissions can be combined using bitwise operations to create
    /// custom permission sets or use the predefined role constants.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Permissions: u32 {
        /// Permission to view the board and its cards
        const VIEW = 0b00000001;
        /// Permission to create and edit own cards
        const POST = 0b00000010;
        /// Permission to add and remove reactions
        const REACT = 0b00000100;
        /// Permission to edit or delete other participants' cards
        const MODERATE = 0b00001000;
        /// Full administrative access to the board (rename, close, delete)
        const ADMIN = 0b00010000;
    }
}

impl Serialize for Permissions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Permissions {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u32::deserialize(deserializer)?;
        Permissions::from_bits(bits).ok_or_else(|| {
            serde::de::Error::custom(format!("invalid permission bits: {}", bits))
        })
    }
}

impl Permissions {
    /// Observer role: can only view the board
    pub const OBSERVER: Permissions = Permissions::VIEW;

    /// Participant role: can view, post cards, and react
    pub const PARTICIPANT: Permissions = Permissions::VIEW
        .union(Permissions::POST)
        .union(Permissions::REACT);

    /// Facilitator role: full access including moderation and board lifecycle
    pub const FACILITATOR: Permissions = Permissions::PARTICIPANT
        .union(Permissions::MODERATE)
        .union(Permissions::ADMIN);

    /// Check if this permission set allows viewing
    #[inline]
    pub fn can_view(&self) -> bool {
        self.contains(Permissions::VIEW)
    }

    /// Check if this permission set allows posting cards
    #[inline]
    pub fn can_post(&self) -> bool {
        self.contains(Permissions::POST)
    }

    /// Check if this permission set allows reacting
    #[inline]
    pub fn can_react(&self) -> bool {
        self.contains(Permissions::REACT)
    }

    /// Check if this permission set allows moderating others' cards
    #[inline]
    pub fn can_moderate(&self) -> bool {
        self.contains(Permissions::MODERATE)
    }

    /// Check if this permission set has board admin access
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.contains(Permissions::ADMIN)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Permissions::PARTICIPANT
    }
}
