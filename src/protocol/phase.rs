use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the two parties at the table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    /// P1: opens the deck and applies the first bulk layer.
    First,
    /// P2: applies the second bulk layer and publishes the final deck.
    Second,
}

impl Seat {
    pub fn other(self) -> Self {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seat::First => f.write_str("P1"),
            Seat::Second => f.write_str("P2"),
        }
    }
}

/// Shuffle/deal progress. A deck message is tagged with the phase that
/// produced it, so the receiver can refuse out-of-turn or partial hand-offs.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Canonical plaintext deck, agreed out of band.
    Init = 0,
    /// P1's bulk layer applied and shuffled.
    BulkFirst = 1,
    /// P2's bulk layer applied and shuffled.
    BulkSecond = 2,
    /// P1's bulk layer swapped for per-slot keys.
    RekeyFirst = 3,
    /// P2's bulk layer swapped for per-slot keys.
    RekeySecond = 4,
    /// Both players hold the final deck; slots may be drawn.
    Ready = 5,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Init,
        Phase::BulkFirst,
        Phase::BulkSecond,
        Phase::RekeyFirst,
        Phase::RekeySecond,
        Phase::Ready,
    ];

    pub fn next(self) -> Option<Phase> {
        match self {
            Phase::Init => Some(Phase::BulkFirst),
            Phase::BulkFirst => Some(Phase::BulkSecond),
            Phase::BulkSecond => Some(Phase::RekeyFirst),
            Phase::RekeyFirst => Some(Phase::RekeySecond),
            Phase::RekeySecond => Some(Phase::Ready),
            Phase::Ready => None,
        }
    }

    /// The seat whose work moves the game out of this phase.
    pub fn actor(self) -> Option<Seat> {
        match self {
            Phase::Init | Phase::BulkSecond | Phase::RekeySecond => Some(Seat::First),
            Phase::BulkFirst | Phase::RekeyFirst => Some(Seat::Second),
            Phase::Ready => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Init => "INIT",
            Phase::BulkFirst => "BULK_P1",
            Phase::BulkSecond => "BULK_P2",
            Phase::RekeyFirst => "REKEY_P1",
            Phase::RekeySecond => "REKEY_P2",
            Phase::Ready => "READY",
        };
        f.write_str(name)
    }
}

/// Per-slot draw bookkeeping once the deck is ready.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotState {
    Ready,
    Drawn,
}
