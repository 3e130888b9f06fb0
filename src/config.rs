use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest prime size accepted. Keeps the modulus far above the one-byte
/// card domain so plaintexts can never wrap.
pub const MIN_PRIME_BITS: usize = 16;

pub const DEFAULT_PRIME_BITS: usize = 128;
pub const DEFAULT_MAX_PRIME_ATTEMPTS: u32 = 1_000_000;
pub const DEFAULT_MAX_EXPONENT_ATTEMPTS: u32 = 1_024;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("prime_bits must be at least {MIN_PRIME_BITS}, got {0}")]
    PrimeBitsTooSmall(usize),

    #[error("{0} must be greater than zero")]
    ZeroBound(&'static str),

    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Knobs shared by both players. Both sides must agree on `prime_bits` and
/// `safe_primes` only when they generate the shared primes themselves; the
/// remaining fields are local policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Bit length of each shared prime.
    pub prime_bits: usize,
    /// Generate primes of the form `2p' + 1` with `p'` prime.
    pub safe_primes: bool,
    /// Upper bound on prime candidates tested before giving up.
    pub max_prime_attempts: u32,
    /// Upper bound on exponent samples tested for coprimality with phi.
    pub max_exponent_attempts: u32,
    /// Resample `e = 1` instead of accepting it with a warning.
    pub reject_identity_exponent: bool,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            prime_bits: DEFAULT_PRIME_BITS,
            safe_primes: false,
            max_prime_attempts: DEFAULT_MAX_PRIME_ATTEMPTS,
            max_exponent_attempts: DEFAULT_MAX_EXPONENT_ATTEMPTS,
            reject_identity_exponent: false,
        }
    }
}

impl ProtocolConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prime_bits < MIN_PRIME_BITS {
            return Err(ConfigError::PrimeBitsTooSmall(self.prime_bits));
        }
        if self.max_prime_attempts == 0 {
            return Err(ConfigError::ZeroBound("max_prime_attempts"));
        }
        if self.max_exponent_attempts == 0 {
            return Err(ConfigError::ZeroBound("max_exponent_attempts"));
        }
        Ok(())
    }

    /// Parse a JSON document, filling missing fields with defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
