//! Length-framed binary encoding of the messages exchanged between players.
//!
//! Every blob is a `u32` big-endian length followed by its minimal
//! big-endian bytes. Slot indices travel as `u16`. Decoding is strict:
//! padded blobs, unknown tags and bytes left over after a message are all
//! refused.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::deck::{Blob, Deck, DECK_SIZE};
use crate::protocol::{
    DeckMessage, DrawOutcome, DrawRequest, DrawResponse, PartialDecryption, Phase, Seat,
    ViolationReason,
};

/// Largest blob accepted from the wire, far above any modulus in use.
pub const MAX_BLOB_LEN: usize = 1024;
pub const MAX_REASON_LEN: usize = 1024;

const OUTCOME_FAILED: u8 = 0;
const OUTCOME_REVEALED: u8 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("input ended early: {needed} more bytes required")]
    Truncated { needed: usize },

    #[error("{0} unexpected bytes after the message")]
    Trailing(usize),

    #[error("blob has a leading zero byte")]
    NonMinimal,

    #[error("length field {len} exceeds the limit of {max}")]
    Oversized { len: usize, max: usize },

    #[error("deck carries {0} slots, expected {DECK_SIZE}")]
    DeckSize(usize),

    #[error("slot {0} does not fit in a u16")]
    SlotTooLarge(usize),

    #[error("unknown phase tag {0}")]
    UnknownPhase(u8),

    #[error("unknown seat tag {0}")]
    UnknownSeat(u8),

    #[error("unknown draw outcome tag {0}")]
    UnknownTag(u8),

    #[error("failure reason is not valid UTF-8")]
    Utf8,
}

/// A message with a binary frame.
pub trait WireMessage: Sized {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), WireError>;

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError>;

    fn to_frame(&self) -> Result<Bytes, WireError> {
        let mut buf = BytesMut::new();
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode exactly one message spanning all of `bytes`.
    fn from_frame(mut bytes: &[u8]) -> Result<Self, WireError> {
        let value = Self::decode(&mut bytes)?;
        if bytes.has_remaining() {
            return Err(WireError::Trailing(bytes.remaining()));
        }
        Ok(value)
    }
}

fn need<B: Buf>(buf: &B, len: usize) -> Result<(), WireError> {
    if buf.remaining() < len {
        return Err(WireError::Truncated {
            needed: len - buf.remaining(),
        });
    }
    Ok(())
}

fn put_slot<B: BufMut>(buf: &mut B, slot: usize) -> Result<(), WireError> {
    let slot = u16::try_from(slot).map_err(|_| WireError::SlotTooLarge(slot))?;
    buf.put_u16(slot);
    Ok(())
}

fn get_slot<B: Buf>(buf: &mut B) -> Result<usize, WireError> {
    need(buf, 2)?;
    Ok(buf.get_u16() as usize)
}

fn get_tag<B: Buf>(buf: &mut B) -> Result<u8, WireError> {
    need(buf, 1)?;
    Ok(buf.get_u8())
}

impl WireMessage for Blob {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), WireError> {
        let bytes = self.as_bytes();
        if bytes.len() > MAX_BLOB_LEN {
            return Err(WireError::Oversized {
                len: bytes.len(),
                max: MAX_BLOB_LEN,
            });
        }
        buf.put_u32(bytes.len() as u32);
        buf.put_slice(bytes);
        Ok(())
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        need(buf, 4)?;
        let len = buf.get_u32() as usize;
        if len > MAX_BLOB_LEN {
            return Err(WireError::Oversized {
                len,
                max: MAX_BLOB_LEN,
            });
        }
        need(buf, len)?;
        let mut bytes = vec![0u8; len];
        buf.copy_to_slice(&mut bytes);
        let blob = Blob::from_bytes(bytes);
        if !blob.is_minimal() {
            return Err(WireError::NonMinimal);
        }
        Ok(blob)
    }
}

impl WireMessage for Deck {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), WireError> {
        buf.put_u16(self.len() as u16);
        self.iter().try_for_each(|blob| blob.encode(buf))
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        need(buf, 2)?;
        let count = buf.get_u16() as usize;
        if count != DECK_SIZE {
            return Err(WireError::DeckSize(count));
        }
        let blobs = (0..count)
            .map(|_| Blob::decode(buf))
            .collect::<Result<Vec<_>, _>>()?;
        Deck::from_blobs(blobs).map_err(|_| WireError::DeckSize(count))
    }
}

impl WireMessage for DeckMessage {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), WireError> {
        buf.put_u8(self.phase.as_u8());
        self.deck.encode(buf)
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        let tag = get_tag(buf)?;
        let phase = Phase::from_u8(tag).ok_or(WireError::UnknownPhase(tag))?;
        let deck = Deck::decode(buf)?;
        Ok(Self { phase, deck })
    }
}

impl WireMessage for DrawRequest {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), WireError> {
        put_slot(buf, self.slot)?;
        buf.put_u8(match self.recipient {
            Seat::First => 1,
            Seat::Second => 2,
        });
        Ok(())
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        let slot = get_slot(buf)?;
        let recipient = match get_tag(buf)? {
            1 => Seat::First,
            2 => Seat::Second,
            other => return Err(WireError::UnknownSeat(other)),
        };
        Ok(Self { slot, recipient })
    }
}

impl WireMessage for PartialDecryption {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), WireError> {
        put_slot(buf, self.slot)?;
        self.blob.encode(buf)
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        let slot = get_slot(buf)?;
        let blob = Blob::decode(buf)?;
        Ok(Self { slot, blob })
    }
}

/// A failed outcome travels as its human-readable reason and arrives as
/// [`ViolationReason::PeerReported`].
impl WireMessage for DrawResponse {
    fn encode<B: BufMut>(&self, buf: &mut B) -> Result<(), WireError> {
        put_slot(buf, self.slot)?;
        match &self.outcome {
            DrawOutcome::Revealed { blob } => {
                buf.put_u8(OUTCOME_REVEALED);
                blob.encode(buf)
            }
            DrawOutcome::Failed { reason } => {
                let text = match reason {
                    ViolationReason::PeerReported { message } => message.clone(),
                    other => other.to_string(),
                };
                let bytes = text.as_bytes();
                // Truncate on a char boundary rather than refuse to report.
                let mut len = bytes.len().min(MAX_REASON_LEN);
                while !text.is_char_boundary(len) {
                    len -= 1;
                }
                buf.put_u8(OUTCOME_FAILED);
                buf.put_u16(len as u16);
                buf.put_slice(&bytes[..len]);
                Ok(())
            }
        }
    }

    fn decode<B: Buf>(buf: &mut B) -> Result<Self, WireError> {
        let slot = get_slot(buf)?;
        let outcome = match get_tag(buf)? {
            OUTCOME_REVEALED => DrawOutcome::Revealed {
                blob: Blob::decode(buf)?,
            },
            OUTCOME_FAILED => {
                need(buf, 2)?;
                let len = buf.get_u16() as usize;
                if len > MAX_REASON_LEN {
                    return Err(WireError::Oversized {
                        len,
                        max: MAX_REASON_LEN,
                    });
                }
                need(buf, len)?;
                let mut bytes = vec![0u8; len];
                buf.copy_to_slice(&mut bytes);
                let message = String::from_utf8(bytes).map_err(|_| WireError::Utf8)?;
                DrawOutcome::Failed {
                    reason: ViolationReason::PeerReported { message },
                }
            }
            other => return Err(WireError::UnknownTag(other)),
        };
        Ok(Self { slot, outcome })
    }
}
