//! The 52-slot deck of ciphertext blobs and the bulk transforms applied to it.

pub mod blob;

pub use blob::{Blob, BlobCardError};

use std::fmt;

use rand::{CryptoRng, Rng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::card::Card;
use crate::cipher::{CipherError, CommutativeKey};

pub const DECK_SIZE: usize = 52;

const LOG_TARGET: &str = "mental_poker::deck";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeckError {
    #[error("Invalid deck size: expected 52, got {0}")]
    InvalidDeckSize(usize),

    #[error("expected {expected} per-slot keys, got {actual}")]
    KeyCountMismatch { expected: usize, actual: usize },

    #[error("slot {slot}: {source}")]
    Cipher {
        slot: usize,
        #[source]
        source: CipherError,
    },
}

/// Ordered ciphertext slots. Slot position is public; which card a slot
/// holds is the secret.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Blob>", into = "Vec<Blob>")]
pub struct Deck {
    slots: Vec<Blob>,
}

impl Deck {
    /// The agreed plaintext deck: one single-byte blob per card, in
    /// [`Card::canonical_order`]. Both players build it independently.
    pub fn canonical() -> Self {
        Self {
            slots: Card::canonical_order().map(Blob::from_card).collect(),
        }
    }

    pub fn from_blobs(slots: Vec<Blob>) -> Result<Self, DeckError> {
        if slots.len() != DECK_SIZE {
            return Err(DeckError::InvalidDeckSize(slots.len()));
        }
        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&Blob> {
        self.slots.get(slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Blob> {
        self.slots.iter()
    }

    pub fn into_blobs(self) -> Vec<Blob> {
        self.slots
    }

    /// Uniform in-place permutation: for each `i` in `0..len-1`, swap slot `i`
    /// with a slot drawn uniformly from `i..len`.
    pub fn shuffle<R: RngCore + CryptoRng>(&mut self, rng: &mut R) {
        let len = self.slots.len();
        for i in 0..len.saturating_sub(1) {
            let j = rng.gen_range(i..len);
            self.slots.swap(i, j);
        }
    }

    /// Apply `key` to every slot.
    pub fn map_encrypt(&mut self, key: &CommutativeKey) -> Result<(), DeckError> {
        self.map_slots(|slot, value| {
            key.encrypt(&value)
                .map_err(|source| DeckError::Cipher { slot, source })
        })
    }

    /// Remove `key`'s layer from every slot.
    pub fn map_decrypt(&mut self, key: &CommutativeKey) -> Result<(), DeckError> {
        self.map_slots(|slot, value| {
            key.decrypt(&value)
                .map_err(|source| DeckError::Cipher { slot, source })
        })
    }

    /// Apply `keys[i]` to slot `i`.
    pub fn map_encrypt_per_slot(&mut self, keys: &[CommutativeKey]) -> Result<(), DeckError> {
        if keys.len() != self.slots.len() {
            return Err(DeckError::KeyCountMismatch {
                expected: self.slots.len(),
                actual: keys.len(),
            });
        }
        self.map_slots(|slot, value| {
            keys[slot]
                .encrypt(&value)
                .map_err(|source| DeckError::Cipher { slot, source })
        })
    }

    /// Swap a bulk layer for per-slot layers: slot `i` becomes
    /// `E(keys[i], D(bulk, slot_i))`. The deck is left untouched on failure.
    pub fn rekey(&mut self, bulk: &CommutativeKey, keys: &[CommutativeKey]) -> Result<(), DeckError> {
        let mut next = self.clone();
        next.map_decrypt(bulk)?;
        next.map_encrypt_per_slot(keys)?;
        *self = next;
        tracing::debug!(target: LOG_TARGET, slots = self.slots.len(), "re-keyed deck");
        Ok(())
    }

    /// Run `f` over every slot value, committing only if all slots succeed.
    fn map_slots<F>(&mut self, mut f: F) -> Result<(), DeckError>
    where
        F: FnMut(usize, num_bigint::BigUint) -> Result<num_bigint::BigUint, DeckError>,
    {
        let next = self
            .slots
            .iter()
            .enumerate()
            .map(|(slot, blob)| f(slot, blob.to_biguint()).map(|value| Blob::from_biguint(&value)))
            .collect::<Result<Vec<_>, _>>()?;
        self.slots = next;
        Ok(())
    }
}

impl TryFrom<Vec<Blob>> for Deck {
    type Error = DeckError;

    fn try_from(slots: Vec<Blob>) -> Result<Self, Self::Error> {
        Deck::from_blobs(slots)
    }
}

impl From<Deck> for Vec<Blob> {
    fn from(deck: Deck) -> Self {
        deck.slots
    }
}

impl fmt::Display for Deck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, blob) in self.slots.iter().enumerate() {
            writeln!(f, "Card {}: {}", i + 1, blob)?;
        }
        write!(f, "===")
    }
}
