use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::phase::{Phase, Seat};
use crate::cipher::KeyGenerationError;
use crate::config::ConfigError;
use crate::deck::{Blob, BlobCardError};

/// Why a message from the other party was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationReason {
    #[error("expected a deck from {expected}, got one from {actual}")]
    UnexpectedPhase { expected: Phase, actual: Phase },

    #[error("opening deck differs from the agreed canonical deck")]
    NonCanonicalOpening,

    #[error("blob is not below the shared modulus")]
    BlobOutOfRange,

    #[error("blob has a leading zero byte")]
    NonMinimalBlob,

    #[error("decrypted value is {len} bytes long, expected exactly one")]
    WrongLength { len: usize },

    #[error("decrypted byte {byte:#04x} is not a valid card")]
    InvalidCard { byte: u8 },

    #[error("slot already drawn")]
    AlreadyDrawn,

    #[error("draw addressed to the wrong recipient")]
    WrongRecipient,

    #[error("response for a slot this player never decrypted")]
    UnrequestedSlot,

    #[error("slot already answered")]
    DuplicateResponse,

    #[error("other party reported: {message}")]
    PeerReported { message: String },
}

impl ViolationReason {
    /// Classify a fully decrypted slot that failed card validation.
    pub(crate) fn undecodable(blob: &Blob, err: BlobCardError) -> Self {
        match (err, blob.as_bytes()) {
            (BlobCardError::Codec(_), [byte]) => ViolationReason::InvalidCard { byte: *byte },
            _ => ViolationReason::WrongLength { len: blob.len() },
        }
    }
}

fn slot_label(slot: &Option<usize>) -> String {
    slot.map(|s| format!(" at slot {s}")).unwrap_or_default()
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("key generation failed: {0}")]
    KeyGeneration(#[from] KeyGenerationError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The other party deviated from the protocol, or tampered with a
    /// ciphertext. Not locally recoverable.
    #[error("protocol violation during {phase}{}: {reason}", slot_label(.slot))]
    Violation {
        phase: Phase,
        slot: Option<usize>,
        reason: ViolationReason,
    },

    #[error("{seat} cannot do that now: requires {expected}, currently {actual}")]
    OutOfOrder {
        seat: Seat,
        expected: Phase,
        actual: Phase,
    },

    #[error("slot {0} is outside the deck")]
    SlotOutOfRange(usize),

    /// A locally produced value broke a cipher precondition.
    #[error("internal consistency failure: {0}")]
    Internal(String),
}

impl ProtocolError {
    pub fn violation(phase: Phase, slot: Option<usize>, reason: ViolationReason) -> Self {
        Self::Violation {
            phase,
            slot,
            reason,
        }
    }

    pub fn is_violation(&self) -> bool {
        matches!(self, Self::Violation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_names_phase_and_slot() {
        let err = ProtocolError::violation(Phase::Ready, Some(7), ViolationReason::AlreadyDrawn);
        assert_eq!(
            err.to_string(),
            "protocol violation during READY at slot 7: slot already drawn"
        );

        let err = ProtocolError::violation(
            Phase::BulkFirst,
            None,
            ViolationReason::UnexpectedPhase {
                expected: Phase::BulkFirst,
                actual: Phase::RekeyFirst,
            },
        );
        assert_eq!(
            err.to_string(),
            "protocol violation during BULK_P1: expected a deck from BULK_P1, got one from REKEY_P1"
        );
        assert!(err.is_violation());
    }

    #[test]
    fn reasons_serialize_with_kind_tag() {
        let json = serde_json::to_value(ViolationReason::InvalidCard { byte: 0x01 }).unwrap();
        assert_eq!(json["kind"], "invalid_card");
        assert_eq!(json["byte"], 1);
    }
}
