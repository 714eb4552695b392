//! Core types and data structures

use num_bigint::BigUint;
use num_traits::Zero;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PaillierError, Result};
use crate::primes::DEFAULT_PRIMALITY_ROUNDS;

/// Paillier ciphertext, an element of [0, n^2)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ciphertext {
    #[serde(with = "crate::records::decimal")]
    pub(crate) value: BigUint,
}

impl Ciphertext {
    /// Wrap a raw value; range checks happen when the ciphertext is used with a key
    pub fn new(value: BigUint) -> Self {
        Ciphertext { value }
    }

    /// Get the raw value
    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// Consume the ciphertext, returning the raw value
    pub fn into_inner(self) -> BigUint {
        self.value
    }

    /// Get the size in bytes
    pub fn size_bytes(&self) -> usize {
        self.value.to_bytes_be().len()
    }
}

impl From<BigUint> for Ciphertext {
    fn from(value: BigUint) -> Self {
        Ciphertext::new(value)
    }
}

impl fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ciphertext({} bytes)", self.size_bytes())
    }
}

/// Per-candidate counts decoded from an aggregate plaintext
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TallyResult {
    /// Count for each candidate, in candidate index order
    pub counts: Vec<u64>,
    /// Set when value remained above the highest slot after decoding
    pub overflow: bool,
    /// What was left after all slots were consumed; zero unless `overflow`
    pub remainder: BigUint,
}

impl TallyResult {
    /// Sum of all decoded counts, wide enough for any number of `u64` slots
    pub fn total_votes(&self) -> u128 {
        self.counts.iter().map(|&count| u128::from(count)).sum()
    }

    /// Turn an overflowing tally into [`PaillierError::DecodeOverflow`]
    pub fn into_checked(self) -> Result<Self> {
        if self.overflow {
            return Err(PaillierError::DecodeOverflow {
                remainder: self.remainder.to_string(),
            });
        }
        Ok(self)
    }

    pub fn is_clean(&self) -> bool {
        !self.overflow && self.remainder.is_zero()
    }
}

/// Configuration for key generation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaillierConfig {
    /// Bit size of each of the two secret primes
    pub prime_bits: u64,
    /// Number of Miller-Rabin rounds for primality testing
    pub primality_rounds: usize,
}

impl Default for PaillierConfig {
    fn default() -> Self {
        PaillierConfig {
            prime_bits: 512,
            primality_rounds: DEFAULT_PRIMALITY_ROUNDS,
        }
    }
}
