//! Commutative exponentiation cipher over a modulus shared by both players.

pub mod error;
pub mod key;
pub mod primes;

pub use error::*;
pub use key::CommutativeKey;
pub use primes::SharedPrimes;
