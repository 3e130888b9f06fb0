use std::fmt;

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::card::{Card, CardError};

/// A ciphertext slot value: the minimal big-endian encoding of an integer
/// below the shared modulus. Zero encodes as the empty string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blob(#[serde(with = "crate::crypto_serde::bytes")] Vec<u8>);

impl Blob {
    pub fn from_biguint(value: &BigUint) -> Self {
        if value.is_zero() {
            Self(Vec::new())
        } else {
            Self(value.to_bytes_be())
        }
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    /// Wrap bytes as received. Callers on a trust boundary should check
    /// [`Blob::is_minimal`].
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn from_card(card: Card) -> Self {
        Self(vec![card.encode()])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// No leading zero byte.
    pub fn is_minimal(&self) -> bool {
        self.0.first() != Some(&0)
    }

    /// Interpret a fully decrypted slot. Only a single byte carrying a valid
    /// card encoding is accepted.
    pub fn to_card(&self) -> Result<Card, BlobCardError> {
        match self.0.as_slice() {
            [byte] => Card::decode(*byte).map_err(BlobCardError::Codec),
            other => Err(BlobCardError::Length(other.len())),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobCardError {
    #[error("decrypted value is {0} bytes long, expected exactly one")]
    Length(usize),

    #[error(transparent)]
    Codec(#[from] CardError),
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob(0x{})", hex::encode(&self.0))
    }
}

impl fmt::Display for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}
