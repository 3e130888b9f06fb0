use rand::{CryptoRng, RngCore};
use tracing::{info, instrument};

use super::error::ProtocolError;
use super::messages::{DeckMessage, DrawResponse};
use super::phase::{Phase, Seat, SlotState};
use super::player::Player;
use crate::card::Card;
use crate::cipher::SharedPrimes;
use crate::config::ProtocolConfig;

const LOG_TARGET: &str = "mental_poker::protocol::table";

/// Both players in one process, with the deck hand-offs routed between them.
///
/// Each [`Player`] still only sees the messages addressed to it; the table
/// just carries them across. Useful for demos, tests and single-host games.
#[derive(Debug)]
pub struct Table {
    first: Player,
    second: Player,
    in_flight: Option<DeckMessage>,
}

impl Table {
    pub fn new(primes: SharedPrimes, config: ProtocolConfig) -> Result<Self, ProtocolError> {
        config.validate()?;
        Ok(Self {
            first: Player::new(Seat::First, primes.clone(), config.clone()),
            second: Player::new(Seat::Second, primes, config),
            in_flight: None,
        })
    }

    /// Generate fresh shared primes and seat both players.
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        config: ProtocolConfig,
    ) -> Result<Self, ProtocolError> {
        config.validate()?;
        let primes = SharedPrimes::generate(rng, &config)?;
        Self::new(primes, config)
    }

    pub fn player(&self, seat: Seat) -> &Player {
        match seat {
            Seat::First => &self.first,
            Seat::Second => &self.second,
        }
    }

    fn player_mut(&mut self, seat: Seat) -> &mut Player {
        match seat {
            Seat::First => &mut self.first,
            Seat::Second => &mut self.second,
        }
    }

    /// The phase of the last deck handed across, or `Ready` once both players
    /// hold the final deck.
    pub fn phase(&self) -> Phase {
        if self.first.is_ready() && self.second.is_ready() {
            return Phase::Ready;
        }
        self.in_flight
            .as_ref()
            .map(|msg| msg.phase)
            .unwrap_or(Phase::Init)
    }

    /// Deliver the pending deck to the seat whose turn it is. A no-op once
    /// ready. A failed step keeps the pending deck, so it can be retried.
    pub fn step<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<Phase, ProtocolError> {
        if self.phase() == Phase::Ready {
            return Ok(Phase::Ready);
        }
        let msg = match self.in_flight.take() {
            Some(msg) => msg,
            None => self.first.open_deck()?,
        };
        let Some(actor) = msg.phase.actor() else {
            return Err(ProtocolError::Internal(format!(
                "no seat acts on a {} deck",
                msg.phase
            )));
        };

        match self.player_mut(actor).handle_deck(msg.clone(), rng) {
            Ok(next) => {
                self.in_flight = next;
                Ok(self.phase())
            }
            Err(err) => {
                self.in_flight = Some(msg);
                Err(err)
            }
        }
    }

    /// Run every shuffle phase until both players can draw.
    #[instrument(target = LOG_TARGET, skip_all)]
    pub fn deal<R: RngCore + CryptoRng>(&mut self, rng: &mut R) -> Result<(), ProtocolError> {
        while self.step(rng)? != Phase::Ready {}
        info!(target: LOG_TARGET, "deck shuffled and ready");
        Ok(())
    }

    /// Draw `slot` face up: P1 removes its layer, P2 finishes the decryption
    /// and reveals the card back to P1.
    pub fn draw(&mut self, slot: usize) -> Result<Card, ProtocolError> {
        let request = self.second.request_draw(slot)?;
        let partial = self.first.partial_decrypt(&request)?;
        let result = self.second.finish_draw(&partial);
        // P1 hears the outcome either way, failure marker included.
        let response = DrawResponse::from_result(slot, &result);
        let seen = self.first.accept_response(&response);
        let card = result?;
        let seen = seen?;
        if seen != card {
            return Err(ProtocolError::Internal(format!(
                "slot {slot} revealed as {seen} but decrypted as {card}"
            )));
        }
        Ok(card)
    }

    /// Draw `slot` privately for `recipient`; the other seat never learns it.
    pub fn draw_for(&mut self, slot: usize, recipient: Seat) -> Result<Card, ProtocolError> {
        let request = self.player(recipient).request_draw(slot)?;
        let partial = self.player_mut(recipient.other()).partial_decrypt(&request)?;
        self.player_mut(recipient).finish_draw(&partial)
    }

    /// Draw state as seen by P1, which partially decrypts every slot.
    pub fn slot_state(&self, slot: usize) -> Option<SlotState> {
        self.first.slot_state(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::deck::{Blob, Deck, DECK_SIZE};
    use crate::protocol::ViolationReason;
    use crate::test_utils::{seeded_rng, test_config, TEST_PRIMES};
    use num_bigint::BigUint;
    use num_traits::{One, Zero};
    use std::collections::HashSet;

    fn table() -> Table {
        Table::new(TEST_PRIMES.clone(), test_config()).unwrap()
    }

    /// Shift a blob's value by one, staying below the modulus.
    fn nudged(blob: &Blob) -> Blob {
        let value = blob.to_biguint();
        if value.is_zero() {
            Blob::from_biguint(&BigUint::one())
        } else {
            Blob::from_biguint(&(value - 1u32))
        }
    }

    #[test]
    fn failed_shared_draw_reaches_p1() {
        let mut rng = seeded_rng(406);
        let mut table = table();
        for _ in 0..4 {
            table.step(&mut rng).unwrap();
        }
        // Corrupt P1's copy of the final deck before it is accepted.
        let msg = table.in_flight.as_mut().unwrap();
        assert_eq!(msg.phase, Phase::RekeySecond);
        let mut blobs = msg.deck.clone().into_blobs();
        blobs[10] = nudged(&blobs[10]);
        msg.deck = Deck::from_blobs(blobs).unwrap();
        table.deal(&mut rng).unwrap();

        let err = table.draw(10).unwrap_err();
        assert!(err.is_violation(), "unexpected error: {err}");

        // P1 already consumed the failure marker for slot 10.
        let replay = DrawResponse::from_result(10, &Err(err));
        assert!(matches!(
            table.first.accept_response(&replay),
            Err(ProtocolError::Violation {
                reason: ViolationReason::DuplicateResponse,
                ..
            })
        ));
        assert!(table.draw(11).is_ok());
    }

    #[test]
    fn steps_walk_every_phase_once() {
        let mut rng = seeded_rng(400);
        let mut table = table();
        assert_eq!(table.phase(), Phase::Init);

        let walked: Vec<_> = (0..5).map(|_| table.step(&mut rng).unwrap()).collect();
        assert_eq!(
            walked,
            vec![
                Phase::BulkFirst,
                Phase::BulkSecond,
                Phase::RekeyFirst,
                Phase::RekeySecond,
                Phase::Ready
            ]
        );
        assert_eq!(table.step(&mut rng).unwrap(), Phase::Ready);
    }

    #[test]
    fn dealt_deck_draws_every_card_once() {
        let mut rng = seeded_rng(401);
        let mut table = table();
        table.deal(&mut rng).unwrap();

        let cards: HashSet<Card> = (0..DECK_SIZE).map(|slot| table.draw(slot).unwrap()).collect();
        assert_eq!(cards, Card::canonical_order().collect());
        assert!((0..DECK_SIZE).all(|slot| table.slot_state(slot) == Some(SlotState::Drawn)));
    }

    #[test]
    fn drawing_before_the_deal_is_out_of_order() {
        let mut table = table();
        assert!(matches!(
            table.draw(0),
            Err(ProtocolError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn private_and_shared_draws_mix() {
        let mut rng = seeded_rng(402);
        let mut table = table();
        table.deal(&mut rng).unwrap();

        let mut cards = HashSet::new();
        for slot in (0..DECK_SIZE).rev() {
            let card = match slot % 3 {
                0 => table.draw(slot),
                1 => table.draw_for(slot, Seat::First),
                _ => table.draw_for(slot, Seat::Second),
            }
            .unwrap();
            assert!(cards.insert(card));
        }
        assert_eq!(cards.len(), DECK_SIZE);

        assert!(matches!(
            table.draw_for(7, Seat::Second),
            Err(ProtocolError::Violation {
                reason: ViolationReason::AlreadyDrawn,
                ..
            })
        ));
    }

    #[test]
    fn shuffles_differ_between_games() {
        let mut a = table();
        let mut b = table();
        a.deal(&mut seeded_rng(403)).unwrap();
        b.deal(&mut seeded_rng(404)).unwrap();
        let order_a: Vec<_> = (0..DECK_SIZE).map(|s| a.draw(s).unwrap()).collect();
        let order_b: Vec<_> = (0..DECK_SIZE).map(|s| b.draw(s).unwrap()).collect();
        assert_ne!(order_a, order_b);
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = ProtocolConfig {
            prime_bits: 8,
            ..test_config()
        };
        assert!(matches!(
            Table::new(TEST_PRIMES.clone(), config),
            Err(ProtocolError::Config(ConfigError::PrimeBitsTooSmall(8)))
        ));
    }

    #[test]
    fn generates_its_own_primes() {
        let mut rng = seeded_rng(405);
        let mut table = Table::generate(&mut rng, test_config()).unwrap();
        table.deal(&mut rng).unwrap();
        assert!(table.draw(0).is_ok());
    }
}
