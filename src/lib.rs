//! Two-party mental poker: shuffle and deal a 52-card deck between two
//! mutually distrusting players using a commutative exponentiation cipher.

pub mod card;
pub mod cipher;
pub mod config;
pub mod crypto_serde;
pub mod deck;
pub mod protocol;
pub mod wire;

#[cfg(test)]
pub mod test_utils;

pub use card::{Card, Suit};
pub use cipher::{CommutativeKey, SharedPrimes};
pub use config::ProtocolConfig;
pub use deck::{Blob, Deck, DECK_SIZE};
pub use protocol::{Player, ProtocolError, Seat, Table};
pub use wire::{WireError, WireMessage};
