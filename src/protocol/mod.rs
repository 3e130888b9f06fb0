//! The two-party shuffle and deal.
//!
//! P1 opens the canonical deck, each player applies a bulk layer and
//! shuffles, then each player swaps its bulk layer for one key per slot.
//! Drawing a slot needs both players to remove their per-slot layer, and
//! the one who removes it last learns the card.

pub mod error;
pub mod messages;
pub mod phase;
pub mod player;
pub mod table;

pub use error::{ProtocolError, ViolationReason};
pub use messages::{DeckMessage, DrawOutcome, DrawRequest, DrawResponse, PartialDecryption};
pub use phase::{Phase, Seat, SlotState};
pub use player::Player;
pub use table::Table;
