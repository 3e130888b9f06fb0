use serde::{Deserialize, Serialize};

use super::error::{ProtocolError, ViolationReason};
use super::phase::{Phase, Seat};
use crate::card::Card;
use crate::deck::{Blob, Deck};

/// A whole deck handed from one party to the other, tagged with the phase
/// whose work it carries. Decks only ever cross the boundary complete.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckMessage {
    pub phase: Phase,
    pub deck: Deck,
}

/// Ask the other party to remove its layer from `slot`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRequest {
    pub slot: usize,
    /// The seat that will complete the decryption and learn the card.
    pub recipient: Seat,
}

/// `slot` with the sender's per-slot layer removed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDecryption {
    pub slot: usize,
    pub blob: Blob,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DrawOutcome {
    /// The fully decrypted one-byte card encoding.
    Revealed { blob: Blob },
    /// Explicit failure marker.
    Failed { reason: ViolationReason },
}

/// Sent back by the recipient when a card is shown to both players.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawResponse {
    pub slot: usize,
    pub outcome: DrawOutcome,
}

impl DrawResponse {
    pub fn from_result(slot: usize, result: &Result<Card, ProtocolError>) -> Self {
        let outcome = match result {
            Ok(card) => DrawOutcome::Revealed {
                blob: Blob::from_card(*card),
            },
            Err(ProtocolError::Violation { reason, .. }) => DrawOutcome::Failed {
                reason: reason.clone(),
            },
            Err(other) => DrawOutcome::Failed {
                reason: ViolationReason::PeerReported {
                    message: other.to_string(),
                },
            },
        };
        Self { slot, outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Suit;
    use crate::test_utils::serde::{assert_round_trip_eq, assert_round_trip_json};

    #[test]
    fn messages_survive_json() {
        assert_round_trip_eq(&DeckMessage {
            phase: Phase::BulkFirst,
            deck: Deck::canonical(),
        });
        assert_round_trip_eq(&DrawRequest {
            slot: 3,
            recipient: Seat::Second,
        });
        assert_round_trip_json(&PartialDecryption {
            slot: 9,
            blob: Blob::from_bytes(vec![0x12, 0x34]),
        });
    }

    #[test]
    fn response_carries_card_or_failure_marker() {
        let card = Card::new(Suit::Hearts, 4).unwrap();
        let ok = DrawResponse::from_result(2, &Ok(card));
        assert_eq!(
            ok.outcome,
            DrawOutcome::Revealed {
                blob: Blob::from_card(card)
            }
        );

        let failed = DrawResponse::from_result(
            2,
            &Err(ProtocolError::violation(
                Phase::Ready,
                Some(2),
                ViolationReason::WrongLength { len: 16 },
            )),
        );
        assert_eq!(
            failed.outcome,
            DrawOutcome::Failed {
                reason: ViolationReason::WrongLength { len: 16 }
            }
        );

        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["outcome"]["status"], "failed");
        assert_eq!(json["outcome"]["reason"]["kind"], "wrong_length");
        assert_round_trip_eq(&failed);
    }
}
