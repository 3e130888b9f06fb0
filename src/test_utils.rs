//! Common test fixtures.

use once_cell::sync::Lazy;
use rand::{rngs::StdRng, SeedableRng};

use crate::cipher::SharedPrimes;
use crate::config::ProtocolConfig;

/// Deterministic CSPRNG so failures reproduce.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Small primes keep the per-slot key generation in tests fast.
pub fn test_config() -> ProtocolConfig {
    ProtocolConfig {
        prime_bits: 64,
        ..ProtocolConfig::default()
    }
}

/// One shared prime pair for the whole test binary.
pub static TEST_PRIMES: Lazy<SharedPrimes> = Lazy::new(|| {
    SharedPrimes::generate(&mut seeded_rng(0x5eed), &test_config())
        .expect("test primes should generate")
});

/// Helpers shared across test modules.
pub mod serde {
    use std::fmt::Debug;

    /// Assert that a value survives a serde_json round-trip using structural equality.
    pub fn assert_round_trip_eq<T>(value: &T)
    where
        T: ::serde::Serialize + ::serde::de::DeserializeOwned + PartialEq + Debug,
    {
        let json = serde_json::to_string(value)
            .expect("serialization should succeed during round-trip testing");
        let restored: T = serde_json::from_str(&json)
            .expect("deserialization should succeed during round-trip testing");
        assert_eq!(restored, *value, "serde_json round-trip altered the value");
    }

    /// Assert that serde_json emits the same payload before and after round-tripping.
    pub fn assert_round_trip_json<T>(value: &T)
    where
        T: ::serde::Serialize + ::serde::de::DeserializeOwned,
    {
        let json = serde_json::to_value(value)
            .expect("serialization to value should succeed during round-trip testing");
        let restored: T = serde_json::from_value(json.clone())
            .expect("deserialization from value should succeed during round-trip testing");
        let json_after = serde_json::to_value(restored)
            .expect("re-serialization should succeed during round-trip testing");
        assert_eq!(
            json_after, json,
            "serde_json round-trip altered the payload"
        );
    }
}
