//! card: single-byte wire codec for the 52 playing cards
//!
//! Layout: bit 7 is a marker that is always set, bits 5-6 hold the suit and
//! bits 0-4 the rank. The marker keeps every encoded card nonzero, so the zero
//! byte is free to mean "no card recovered".

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Rank = u8; // 1..13 (A=1)

pub const MARKER_BIT: u8 = 0x80;
const SUIT_MASK: u8 = 0x60;
const SUIT_SHIFT: u8 = 5;
const RANK_MASK: u8 = 0x1f;

pub const MIN_RANK: Rank = 1;
pub const MAX_RANK: Rank = 13;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardError {
    #[error("invalid card encoding {0:#04x}: marker bit unset")]
    InvalidCardEncoding(u8),

    #[error("rank {0} outside 1..=13")]
    RankOutOfRange(u8),

    #[error("suit {0} outside 0..=3")]
    SuitOutOfRange(u8),
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Suit {
    Clubs = 0,    // C
    Diamonds = 1, // D
    Hearts = 2,   // H
    Spades = 3,   // S
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Result<Self, CardError> {
        match value {
            0 => Ok(Suit::Clubs),
            1 => Ok(Suit::Diamonds),
            2 => Ok(Suit::Hearts),
            3 => Ok(Suit::Spades),
            _ => Err(CardError::SuitOutOfRange(value)),
        }
    }

    fn symbol(self) -> char {
        match self {
            Suit::Clubs => 'C',
            Suit::Diamonds => 'D',
            Suit::Hearts => 'H',
            Suit::Spades => 'S',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Card {
    suit: Suit,
    rank: Rank,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Result<Self, CardError> {
        if !(MIN_RANK..=MAX_RANK).contains(&rank) {
            return Err(CardError::RankOutOfRange(rank));
        }
        Ok(Self { suit, rank })
    }

    pub fn suit(&self) -> Suit {
        self.suit
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    #[inline]
    pub fn encode(self) -> u8 {
        MARKER_BIT | (self.suit.as_u8() << SUIT_SHIFT) | self.rank
    }

    pub fn decode(byte: u8) -> Result<Self, CardError> {
        if byte & MARKER_BIT == 0 {
            return Err(CardError::InvalidCardEncoding(byte));
        }
        let suit = Suit::from_u8((byte & SUIT_MASK) >> SUIT_SHIFT)?;
        Self::new(suit, byte & RANK_MASK)
    }

    /// All 52 cards in the agreed order: suits Clubs..Spades, ranks 1..=13.
    pub fn canonical_order() -> impl Iterator<Item = Card> {
        Suit::ALL
            .into_iter()
            .flat_map(|suit| (MIN_RANK..=MAX_RANK).map(move |rank| Card { suit, rank }))
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rank = match self.rank {
            1 => "A".to_string(),
            11 => "J".to_string(),
            12 => "Q".to_string(),
            13 => "K".to_string(),
            r => r.to_string(),
        };
        write!(f, "{rank}{}", self.suit.symbol())
    }
}

impl TryFrom<u8> for Card {
    type Error = CardError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        Card::decode(byte)
    }
}

impl From<Card> for u8 {
    fn from(card: Card) -> Self {
        card.encode()
    }
}
