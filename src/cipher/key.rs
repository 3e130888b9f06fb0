use std::fmt;
use std::sync::atomic::{compiler_fence, Ordering};

use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::{CryptoRng, RngCore};

use super::error::{CipherError, KeyGenerationError};
use super::primes::SharedPrimes;
use crate::config::ProtocolConfig;

const LOG_TARGET: &str = "mental_poker::cipher::key";

/// One exponent pair over the shared modulus.
///
/// Every key generated from the same [`SharedPrimes`] commutes with every
/// other: `E_a(E_b(m)) = m^(e_a * e_b) = E_b(E_a(m)) mod n`. A key never leaves
/// the player that generated it; only values transformed by it do.
pub struct CommutativeKey {
    n: BigUint,
    phi: BigUint,
    e: BigUint,
    d: BigUint,
}

impl CommutativeKey {
    /// Sample `e` uniformly from `[0, phi)` until `gcd(e, phi) = 1`, then set
    /// `d = e^-1 mod phi`.
    ///
    /// Sampling is bounded by `config.max_exponent_attempts`. `e = 1` passes
    /// the gcd filter and yields an identity key; it is kept and flagged
    /// unless `config.reject_identity_exponent` is set.
    pub fn generate<R: RngCore + CryptoRng>(
        primes: &SharedPrimes,
        rng: &mut R,
        config: &ProtocolConfig,
    ) -> Result<Self, KeyGenerationError> {
        let n = primes.modulus();
        let phi = primes.phi();
        if phi <= BigUint::one() {
            return Err(KeyGenerationError::DegeneratePrimes("phi is not above one"));
        }

        let mut attempts = 0;
        let e = loop {
            if attempts == config.max_exponent_attempts {
                return Err(KeyGenerationError::ExponentSearchExhausted { attempts });
            }
            attempts += 1;

            let e = rng.gen_biguint_below(&phi);
            if !e.gcd(&phi).is_one() {
                continue;
            }
            if e.is_one() {
                if config.reject_identity_exponent {
                    tracing::debug!(target: LOG_TARGET, "resampling identity exponent");
                    continue;
                }
                tracing::warn!(
                    target: LOG_TARGET,
                    "sampled identity exponent e = 1; this key leaves values unchanged"
                );
            }
            break e;
        };

        let d = e.modinv(&phi).ok_or(KeyGenerationError::NoInverse)?;
        tracing::trace!(target: LOG_TARGET, attempts, modulus_bits = n.bits(), "generated key");

        Ok(Self { n, phi, e, d })
    }

    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// True when `e = 1`, a key that encrypts every value to itself.
    pub fn is_identity(&self) -> bool {
        self.e.is_one()
    }

    /// `plaintext^e mod n`. The plaintext must be strictly below `n`.
    pub fn encrypt(&self, plaintext: &BigUint) -> Result<BigUint, CipherError> {
        if plaintext >= &self.n {
            return Err(CipherError::PrecondRange {
                value_bits: plaintext.bits(),
                modulus_bits: self.n.bits(),
            });
        }
        Ok(plaintext.modpow(&self.e, &self.n))
    }

    /// `ciphertext^d mod n`. The ciphertext must be strictly below `n`.
    pub fn decrypt(&self, ciphertext: &BigUint) -> Result<BigUint, CipherError> {
        if ciphertext >= &self.n {
            return Err(CipherError::CiphertextRange {
                value_bits: ciphertext.bits(),
                modulus_bits: self.n.bits(),
            });
        }
        Ok(ciphertext.modpow(&self.d, &self.n))
    }
}

impl fmt::Debug for CommutativeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommutativeKey")
            .field("modulus_bits", &self.n.bits())
            .finish_non_exhaustive()
    }
}

impl Drop for CommutativeKey {
    fn drop(&mut self) {
        wipe(&mut self.e);
        wipe(&mut self.d);
        wipe(&mut self.phi);
        compiler_fence(Ordering::SeqCst);
    }
}

/// Zero the limbs of `value` in place.
///
/// `set_zero` only truncates the digit vector. Clearing set bits from the
/// lowest up keeps the top limb nonzero until the very last write, so the
/// buffer is never shrunk or reallocated while it still holds secret limbs.
fn wipe(value: &mut BigUint) {
    for bit in 0..value.bits() {
        if value.bit(bit) {
            value.set_bit(bit, false);
        }
    }
}
