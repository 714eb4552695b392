//! Error types for the Paillier tally library

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaillierError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaillierError {
    #[error("Key generation failed: {0}")]
    KeyGenerationFailure(String),

    #[error(
        "Invalid key size: {0} bits per prime (must be at least {min})",
        min = crate::primes::MIN_PRIME_BITS
    )]
    InvalidKeySize(u64),

    #[error("Plaintext outside [0, n)")]
    InvalidPlaintext,

    #[error("Ciphertext outside [0, n^2) or not invertible")]
    InvalidCiphertext,

    #[error("Cannot aggregate an empty list of ciphertexts")]
    EmptyAggregate,

    #[error("Decoded tally overflowed its slots (remainder {remainder})")]
    DecodeOverflow { remainder: String },

    #[error("Invalid candidate index {index} (candidate count is {candidate_count})")]
    InvalidCandidate {
        index: usize,
        candidate_count: usize,
    },

    #[error("Invalid slot size: {0} (must be at least 2)")]
    InvalidSlotSize(u64),

    #[error("Slot encoding needs {required_bits} bits but the modulus only has {available_bits}")]
    CapacityExceeded {
        required_bits: u64,
        available_bits: u64,
    },

    #[error("Private key does not belong to this public key")]
    KeyMismatch,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cannot {action} while the election is {state}")]
    InvalidTransition { state: String, action: String },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("IO error: {0}")]
    IOError(String),
}

impl From<std::io::Error> for PaillierError {
    fn from(err: std::io::Error) -> Self {
        PaillierError::IOError(err.to_string())
    }
}

impl From<serde_json::Error> for PaillierError {
    fn from(err: serde_json::Error) -> Self {
        PaillierError::MalformedRecord(err.to_string())
    }
}
