use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyGenerationError {
    #[error("degenerate prime pair: {0}")]
    DegeneratePrimes(&'static str),

    #[error("modulus of {bits} bits is too small for the card domain")]
    ModulusTooSmall { bits: u64 },

    #[error("no {bits}-bit prime found after {attempts} candidates")]
    PrimeSearchExhausted { bits: usize, attempts: u32 },

    #[error("no exponent coprime to phi found after {attempts} samples")]
    ExponentSearchExhausted { attempts: u32 },

    #[error("exponent has no inverse modulo phi")]
    NoInverse,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CipherError {
    #[error("key generation failed: {0}")]
    KeyGeneration(#[from] KeyGenerationError),

    /// The plaintext was not strictly below the modulus. Encrypting it would
    /// silently reduce it and lose the original value.
    #[error("plaintext of {value_bits} bits is not below the {modulus_bits}-bit modulus")]
    PrecondRange { value_bits: u64, modulus_bits: u64 },

    #[error("ciphertext of {value_bits} bits is not below the {modulus_bits}-bit modulus")]
    CiphertextRange { value_bits: u64, modulus_bits: u64 },
}
