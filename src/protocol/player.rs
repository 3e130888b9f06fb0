use num_bigint::BigUint;
use rand::{CryptoRng, RngCore};
use tracing::{debug, info, instrument, warn};

use super::error::{ProtocolError, ViolationReason};
use super::messages::{DeckMessage, DrawOutcome, DrawRequest, DrawResponse, PartialDecryption};
use super::phase::{Phase, Seat, SlotState};
use crate::card::Card;
use crate::cipher::{CipherError, CommutativeKey, SharedPrimes};
use crate::config::ProtocolConfig;
use crate::deck::{Blob, Deck, DeckError};

const LOG_TARGET: &str = "mental_poker::protocol::player";

/// Everything one party holds privately for a single game.
///
/// Keys never leave this struct. Two `Player`s only interact through
/// [`DeckMessage`], [`DrawRequest`], [`PartialDecryption`] and
/// [`DrawResponse`] values, so independent games never share state.
#[derive(Debug)]
pub struct Player {
    seat: Seat,
    primes: SharedPrimes,
    modulus: BigUint,
    config: ProtocolConfig,
    /// Last phase this player produced or accepted.
    phase: Phase,
    bulk_key: Option<CommutativeKey>,
    slot_keys: Vec<CommutativeKey>,
    deck: Option<Deck>,
    slots: Vec<SlotState>,
    /// Slots whose reveal from the other party has been consumed.
    answered: Vec<bool>,
}

impl Player {
    pub fn new(seat: Seat, primes: SharedPrimes, config: ProtocolConfig) -> Self {
        let modulus = primes.modulus();
        Self {
            seat,
            primes,
            modulus,
            config,
            phase: Phase::Init,
            bulk_key: None,
            slot_keys: Vec::new(),
            deck: None,
            slots: Vec::new(),
            answered: Vec::new(),
        }
    }

    pub fn seat(&self) -> Seat {
        self.seat
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    /// The final drawable deck, once this player has it.
    pub fn deck(&self) -> Option<&Deck> {
        self.deck.as_ref()
    }

    pub fn slot_state(&self, slot: usize) -> Option<SlotState> {
        self.slots.get(slot).copied()
    }

    pub fn drawn_count(&self) -> usize {
        self.slots.iter().filter(|s| **s == SlotState::Drawn).count()
    }

    /// P1 opens the game with the agreed plaintext deck.
    pub fn open_deck(&self) -> Result<DeckMessage, ProtocolError> {
        if self.seat != Seat::First || self.phase != Phase::Init {
            return Err(self.out_of_order(Phase::Init));
        }
        Ok(DeckMessage {
            phase: Phase::Init,
            deck: Deck::canonical(),
        })
    }

    /// Accept a deck from the other party (or P1's own opening deck), do this
    /// seat's work for the phase and return the deck to hand on.
    ///
    /// Returns `None` once P1 has accepted the final deck. On any error the
    /// player is left as it was before the call.
    #[instrument(target = LOG_TARGET, skip_all, fields(seat = %self.seat, phase = %msg.phase))]
    pub fn handle_deck<R: RngCore + CryptoRng>(
        &mut self,
        msg: DeckMessage,
        rng: &mut R,
    ) -> Result<Option<DeckMessage>, ProtocolError> {
        let expected = self.expected_incoming();
        if expected != Some(msg.phase) {
            warn!(target: LOG_TARGET, expected = ?expected, actual = %msg.phase, "deck out of turn");
            return Err(ProtocolError::violation(
                msg.phase,
                None,
                ViolationReason::UnexpectedPhase {
                    expected: expected.unwrap_or(self.phase),
                    actual: msg.phase,
                },
            ));
        }
        self.validate_incoming(&msg)?;

        let DeckMessage { phase, deck } = msg;
        match phase {
            Phase::Init | Phase::BulkFirst => self.bulk_encrypt_and_shuffle(phase, deck, rng).map(Some),
            Phase::BulkSecond | Phase::RekeyFirst => self.rekey(phase, deck, rng).map(Some),
            Phase::RekeySecond => {
                self.accept_final(deck);
                Ok(None)
            }
            Phase::Ready => Err(ProtocolError::Internal(
                "no deck is expected once the game is ready".to_string(),
            )),
        }
    }

    fn expected_incoming(&self) -> Option<Phase> {
        match (self.seat, self.phase) {
            (Seat::First, Phase::Init) => Some(Phase::Init),
            (Seat::Second, Phase::Init) => Some(Phase::BulkFirst),
            (Seat::First, Phase::BulkFirst) => Some(Phase::BulkSecond),
            (Seat::Second, Phase::BulkSecond) => Some(Phase::RekeyFirst),
            (Seat::First, Phase::RekeyFirst) => Some(Phase::RekeySecond),
            _ => None,
        }
    }

    fn validate_incoming(&self, msg: &DeckMessage) -> Result<(), ProtocolError> {
        if msg.phase == Phase::Init {
            if msg.deck != Deck::canonical() {
                return Err(ProtocolError::violation(
                    msg.phase,
                    None,
                    ViolationReason::NonCanonicalOpening,
                ));
            }
            return Ok(());
        }
        for (slot, blob) in msg.deck.iter().enumerate() {
            self.check_blob(msg.phase, slot, blob)?;
        }
        Ok(())
    }

    fn check_blob(&self, phase: Phase, slot: usize, blob: &Blob) -> Result<(), ProtocolError> {
        if !blob.is_minimal() {
            return Err(ProtocolError::violation(
                phase,
                Some(slot),
                ViolationReason::NonMinimalBlob,
            ));
        }
        if blob.to_biguint() >= self.modulus {
            return Err(ProtocolError::violation(
                phase,
                Some(slot),
                ViolationReason::BlobOutOfRange,
            ));
        }
        Ok(())
    }

    fn bulk_encrypt_and_shuffle<R: RngCore + CryptoRng>(
        &mut self,
        incoming: Phase,
        mut deck: Deck,
        rng: &mut R,
    ) -> Result<DeckMessage, ProtocolError> {
        let key = CommutativeKey::generate(&self.primes, rng, &self.config)?;
        deck.map_encrypt(&key).map_err(internal)?;
        deck.shuffle(rng);

        let produced = next_phase(incoming);
        self.bulk_key = Some(key);
        self.phase = produced;
        info!(target: LOG_TARGET, seat = %self.seat, phase = %produced, "bulk layer applied and deck shuffled");
        tracing::trace!(target: LOG_TARGET, "deck after {produced}:\n{deck}");

        Ok(DeckMessage {
            phase: produced,
            deck,
        })
    }

    fn rekey<R: RngCore + CryptoRng>(
        &mut self,
        incoming: Phase,
        mut deck: Deck,
        rng: &mut R,
    ) -> Result<DeckMessage, ProtocolError> {
        let bulk = self
            .bulk_key
            .as_ref()
            .ok_or_else(|| ProtocolError::Internal("bulk key missing at re-key".to_string()))?;

        let slot_keys = (0..deck.len())
            .map(|_| CommutativeKey::generate(&self.primes, rng, &self.config))
            .collect::<Result<Vec<_>, _>>()?;
        deck.rekey(bulk, &slot_keys).map_err(internal)?;

        let produced = next_phase(incoming);
        // The bulk key has done its job; drop it so it cannot outlive the phase.
        self.bulk_key = None;
        self.slot_keys = slot_keys;
        self.phase = produced;
        info!(target: LOG_TARGET, seat = %self.seat, phase = %produced, "per-slot keys applied");

        if produced == Phase::RekeySecond {
            // P2 holds the final deck as soon as it publishes it.
            self.accept_final(deck.clone());
        }
        Ok(DeckMessage {
            phase: produced,
            deck,
        })
    }

    fn accept_final(&mut self, deck: Deck) {
        self.slots = vec![SlotState::Ready; deck.len()];
        self.answered = vec![false; deck.len()];
        self.deck = Some(deck);
        self.phase = Phase::Ready;
        info!(target: LOG_TARGET, seat = %self.seat, "deck ready to draw");
    }

    /// Start drawing `slot` for this player.
    pub fn request_draw(&self, slot: usize) -> Result<DrawRequest, ProtocolError> {
        self.check_drawable(slot)?;
        Ok(DrawRequest {
            slot,
            recipient: self.seat,
        })
    }

    /// Remove this player's per-slot layer for the other party. The slot is
    /// consumed here, so a second request for it is refused even if the
    /// first draw never completes.
    #[instrument(target = LOG_TARGET, skip_all, fields(seat = %self.seat, slot = request.slot))]
    pub fn partial_decrypt(&mut self, request: &DrawRequest) -> Result<PartialDecryption, ProtocolError> {
        let slot = request.slot;
        self.check_drawable(slot)?;
        if request.recipient == self.seat {
            return Err(ProtocolError::violation(
                Phase::Ready,
                Some(slot),
                ViolationReason::WrongRecipient,
            ));
        }

        self.slots[slot] = SlotState::Drawn;
        let blob = self.remove_layer(slot, &self.final_blob(slot)?)?;
        debug!(target: LOG_TARGET, "partial decryption sent");
        Ok(PartialDecryption { slot, blob })
    }

    /// Remove this player's layer from the partial decryption and read the
    /// card. A result that is not a valid one-byte card is a protocol
    /// violation; the slot stays consumed and other slots are unaffected.
    #[instrument(target = LOG_TARGET, skip_all, fields(seat = %self.seat, slot = partial.slot))]
    pub fn finish_draw(&mut self, partial: &PartialDecryption) -> Result<Card, ProtocolError> {
        let slot = partial.slot;
        self.check_drawable(slot)?;
        self.slots[slot] = SlotState::Drawn;

        self.check_blob(Phase::Ready, slot, &partial.blob)?;
        let plain = self.remove_layer(slot, &partial.blob)?;
        match plain.to_card() {
            Ok(card) => {
                debug!(target: LOG_TARGET, %card, "card drawn");
                Ok(card)
            }
            Err(err) => {
                warn!(target: LOG_TARGET, error = %err, "decrypted slot is not a card");
                Err(ProtocolError::violation(
                    Phase::Ready,
                    Some(slot),
                    ViolationReason::undecodable(&plain, err),
                ))
            }
        }
    }

    /// Learn a card the recipient chose to reveal for a slot this player
    /// partially decrypted. Only the first response for a slot is accepted,
    /// whatever its outcome.
    pub fn accept_response(&mut self, response: &DrawResponse) -> Result<Card, ProtocolError> {
        let slot = response.slot;
        match self.slot_state(slot) {
            Some(SlotState::Drawn) if self.answered[slot] => {
                return Err(ProtocolError::violation(
                    Phase::Ready,
                    Some(slot),
                    ViolationReason::DuplicateResponse,
                ))
            }
            Some(SlotState::Drawn) => self.answered[slot] = true,
            Some(SlotState::Ready) => {
                return Err(ProtocolError::violation(
                    Phase::Ready,
                    Some(slot),
                    ViolationReason::UnrequestedSlot,
                ))
            }
            None => return Err(self.range_or_order(slot)),
        }

        match &response.outcome {
            DrawOutcome::Revealed { blob } => blob.to_card().map_err(|err| {
                ProtocolError::violation(
                    Phase::Ready,
                    Some(slot),
                    ViolationReason::undecodable(blob, err),
                )
            }),
            DrawOutcome::Failed { reason } => {
                warn!(target: LOG_TARGET, seat = %self.seat, slot, %reason, "other party reported a failed draw");
                Err(ProtocolError::violation(Phase::Ready, Some(slot), reason.clone()))
            }
        }
    }

    fn check_drawable(&self, slot: usize) -> Result<(), ProtocolError> {
        match self.slot_state(slot) {
            Some(SlotState::Ready) => Ok(()),
            Some(SlotState::Drawn) => Err(ProtocolError::violation(
                Phase::Ready,
                Some(slot),
                ViolationReason::AlreadyDrawn,
            )),
            None => Err(self.range_or_order(slot)),
        }
    }

    fn range_or_order(&self, slot: usize) -> ProtocolError {
        if self.is_ready() {
            ProtocolError::SlotOutOfRange(slot)
        } else {
            self.out_of_order(Phase::Ready)
        }
    }

    fn final_blob(&self, slot: usize) -> Result<Blob, ProtocolError> {
        self.deck
            .as_ref()
            .and_then(|deck| deck.get(slot))
            .cloned()
            .ok_or(ProtocolError::SlotOutOfRange(slot))
    }

    fn remove_layer(&self, slot: usize, blob: &Blob) -> Result<Blob, ProtocolError> {
        let key = self
            .slot_keys
            .get(slot)
            .ok_or(ProtocolError::SlotOutOfRange(slot))?;
        let value = key.decrypt(&blob.to_biguint()).map_err(|err| match err {
            CipherError::CiphertextRange { .. } => ProtocolError::violation(
                Phase::Ready,
                Some(slot),
                ViolationReason::BlobOutOfRange,
            ),
            other => ProtocolError::Internal(other.to_string()),
        })?;
        Ok(Blob::from_biguint(&value))
    }

    fn out_of_order(&self, expected: Phase) -> ProtocolError {
        ProtocolError::OutOfOrder {
            seat: self.seat,
            expected,
            actual: self.phase,
        }
    }
}

fn next_phase(incoming: Phase) -> Phase {
    incoming.next().unwrap_or(Phase::Ready)
}

/// Transform failures on an already validated deck can only come from a
/// local precondition breach.
fn internal(err: DeckError) -> ProtocolError {
    ProtocolError::Internal(err.to_string())
}
