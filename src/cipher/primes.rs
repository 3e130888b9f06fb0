use num_bigint::{BigUint, RandBigInt};
use num_prime::nt_funcs::is_prime;
use num_prime::PrimalityTestConfig;
use num_traits::One;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use super::error::KeyGenerationError;
use crate::config::{ProtocolConfig, MIN_PRIME_BITS};

const LOG_TARGET: &str = "mental_poker::cipher::primes";

/// The prime pair both players derive every key from.
///
/// Agreed once during INIT and never reused across unrelated games. Keys are
/// only commutative when they share the modulus `n = p * q`. Deserializing
/// runs the same checks as [`SharedPrimes::new`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PrimesRepr", into = "PrimesRepr")]
pub struct SharedPrimes {
    p: BigUint,
    q: BigUint,
}

/// Unvalidated serde shape of [`SharedPrimes`].
#[derive(Serialize, Deserialize)]
struct PrimesRepr {
    #[serde(with = "crate::crypto_serde::biguint")]
    p: BigUint,
    #[serde(with = "crate::crypto_serde::biguint")]
    q: BigUint,
}

impl TryFrom<PrimesRepr> for SharedPrimes {
    type Error = KeyGenerationError;

    fn try_from(repr: PrimesRepr) -> Result<Self, Self::Error> {
        SharedPrimes::new(repr.p, repr.q)
    }
}

impl From<SharedPrimes> for PrimesRepr {
    fn from(primes: SharedPrimes) -> Self {
        Self {
            p: primes.p,
            q: primes.q,
        }
    }
}

impl SharedPrimes {
    /// Validate an externally agreed prime pair.
    pub fn new(p: BigUint, q: BigUint) -> Result<Self, KeyGenerationError> {
        if p == q {
            return Err(KeyGenerationError::DegeneratePrimes("p and q are equal"));
        }
        for prime in [&p, &q] {
            if prime.bits() < MIN_PRIME_BITS as u64 {
                return Err(KeyGenerationError::ModulusTooSmall {
                    bits: (&p * &q).bits(),
                });
            }
            if !is_probable_prime(prime) {
                return Err(KeyGenerationError::DegeneratePrimes("value is not prime"));
            }
        }
        Ok(Self { p, q })
    }

    /// Generate two distinct primes of exactly `config.prime_bits` bits.
    #[tracing::instrument(target = LOG_TARGET, skip_all, fields(bits = config.prime_bits, safe = config.safe_primes))]
    pub fn generate<R: RngCore + CryptoRng>(
        rng: &mut R,
        config: &ProtocolConfig,
    ) -> Result<Self, KeyGenerationError> {
        let p = gen_prime(rng, config)?;
        let q = loop {
            let candidate = gen_prime(rng, config)?;
            if candidate != p {
                break candidate;
            }
        };
        tracing::debug!(target: LOG_TARGET, modulus_bits = (&p * &q).bits(), "generated shared primes");
        Self::new(p, q)
    }

    pub fn p(&self) -> &BigUint {
        &self.p
    }

    pub fn q(&self) -> &BigUint {
        &self.q
    }

    pub fn modulus(&self) -> BigUint {
        &self.p * &self.q
    }

    /// `(p - 1)(q - 1)`. Both primes are at least `2^(MIN_PRIME_BITS - 1)`
    /// once constructed, so neither factor underflows.
    pub fn phi(&self) -> BigUint {
        (&self.p - 1u32) * (&self.q - 1u32)
    }
}

fn is_probable_prime(candidate: &BigUint) -> bool {
    is_prime(candidate, Some(PrimalityTestConfig::default())).probably()
}

/// Random odd candidate with the top bit forced so it has exactly `bits` bits.
fn candidate<R: RngCore + CryptoRng>(rng: &mut R, bits: usize) -> BigUint {
    let mut cand = rng.gen_biguint(bits as u64);
    cand |= BigUint::one() << (bits - 1);
    cand |= BigUint::one();
    cand
}

fn gen_prime<R: RngCore + CryptoRng>(
    rng: &mut R,
    config: &ProtocolConfig,
) -> Result<BigUint, KeyGenerationError> {
    let bits = config.prime_bits;
    for _ in 0..config.max_prime_attempts {
        if config.safe_primes {
            // p = 2p' + 1 has `bits` bits when p' has `bits - 1`.
            let half = candidate(rng, bits - 1);
            if !is_probable_prime(&half) {
                continue;
            }
            let p = (half << 1u32) + BigUint::one();
            if is_probable_prime(&p) {
                return Ok(p);
            }
        } else {
            let p = candidate(rng, bits);
            if is_probable_prime(&p) {
                return Ok(p);
            }
        }
    }
    Err(KeyGenerationError::PrimeSearchExhausted {
        bits,
        attempts: config.max_prime_attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{seeded_rng, serde::assert_round_trip_eq};

    fn config(bits: usize, safe: bool) -> ProtocolConfig {
        ProtocolConfig {
            prime_bits: bits,
            safe_primes: safe,
            ..ProtocolConfig::default()
        }
    }

    #[test]
    fn generates_distinct_primes_of_exact_size() {
        let mut rng = seeded_rng(1);
        let primes = SharedPrimes::generate(&mut rng, &config(64, false)).unwrap();
        assert_ne!(primes.p(), primes.q());
        assert_eq!(primes.p().bits(), 64);
        assert_eq!(primes.q().bits(), 64);
        assert_eq!(
            primes.phi(),
            (primes.p() - 1u32) * (primes.q() - 1u32),
            "phi must equal (p-1)(q-1)"
        );
    }

    #[test]
    fn safe_primes_have_prime_half() {
        let mut rng = seeded_rng(2);
        let primes = SharedPrimes::generate(&mut rng, &config(32, true)).unwrap();
        for p in [primes.p(), primes.q()] {
            assert_eq!(p.bits(), 32);
            let half: BigUint = (p - 1u32) >> 1u32;
            assert!(is_probable_prime(&half));
        }
    }

    #[test]
    fn exhausted_search_is_reported() {
        let mut rng = seeded_rng(3);
        let cfg = ProtocolConfig {
            max_prime_attempts: 1,
            ..config(512, true)
        };
        // A single safe-prime candidate at this size essentially never succeeds.
        let result = SharedPrimes::generate(&mut rng, &cfg);
        assert!(matches!(
            result,
            Err(KeyGenerationError::PrimeSearchExhausted { bits: 512, attempts: 1 })
        ));
    }

    #[test]
    fn rejects_degenerate_pairs() {
        let p = BigUint::from(65_537u32);
        assert_eq!(
            SharedPrimes::new(p.clone(), p.clone()),
            Err(KeyGenerationError::DegeneratePrimes("p and q are equal"))
        );
        assert_eq!(
            SharedPrimes::new(p.clone(), BigUint::from(65_539u32 * 3)),
            Err(KeyGenerationError::DegeneratePrimes("value is not prime"))
        );
        assert!(matches!(
            SharedPrimes::new(p, BigUint::from(251u32)),
            Err(KeyGenerationError::ModulusTooSmall { .. })
        ));
        assert!(SharedPrimes::new(BigUint::from(65_537u32), BigUint::from(65_539u32)).is_ok());
    }

    #[test]
    fn primes_survive_json() {
        assert_round_trip_eq(&*crate::test_utils::TEST_PRIMES);
        let json = serde_json::to_value(&*crate::test_utils::TEST_PRIMES).unwrap();
        assert!(json["p"].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn deserializing_validates_the_pair() {
        let err = serde_json::from_str::<SharedPrimes>(r#"{"p":"0x00","q":"0x05"}"#).unwrap_err();
        assert!(err.to_string().contains("too small"), "{err}");

        let err = serde_json::from_str::<SharedPrimes>(r#"{"p":"0x010001","q":"0x010001"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("p and q are equal"), "{err}");

        // 0x030009 = 196617 = 3 * 65539
        let err = serde_json::from_str::<SharedPrimes>(r#"{"p":"0x010001","q":"0x030009"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("not prime"), "{err}");

        let ok: SharedPrimes =
            serde_json::from_str(r#"{"p":"0x010001","q":"0x010003"}"#).unwrap();
        assert_eq!(ok.phi(), BigUint::from(65_536u64 * 65_538u64));
    }
}
