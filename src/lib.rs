//! # Paillier Tally
//!
//! Privacy-preserving vote tallying with the Paillier cryptosystem:
//! - Probable-prime generation (Miller-Rabin) and key derivation
//! - Probabilistic encryption, decryption and ciphertext-space addition
//! - Slot encoding that packs several candidate counters into one plaintext
//! - Sequential and parallel aggregation of encrypted ballots
//! - An election state machine tying the pieces together
//!
//! Voters and the aggregator only ever see a [`Paillier`] (public key). Decryption is
//! only available on a [`PaillierAuthority`], which owns the private key.
//!
//! ## Example
//!
//! ```rust
//! use paillier_tally::{aggregate, KeyPair, PaillierAuthority, VoteCodec};
//!
//! let authority = PaillierAuthority::new(KeyPair::generate(64).unwrap());
//! let codec = VoteCodec::new(3, 1000).unwrap();
//! codec.check_capacity(authority.public_key()).unwrap();
//!
//! // Voters encrypt one-hot choices with the public key
//! let ballots: Vec<_> = [0, 0, 2]
//!     .iter()
//!     .map(|&choice| codec.encode_ballot(choice, authority.public()).unwrap())
//!     .collect();
//!
//! // The aggregator multiplies ciphertexts without decrypting anything
//! let encrypted_sum = aggregate(&ballots, authority.public_key()).unwrap();
//!
//! // Only the authority can decrypt the final sum
//! let total = authority.decrypt(&encrypted_sum).unwrap();
//! let tally = codec.decode_checked(&total).unwrap();
//! assert_eq!(tally.counts, vec![2, 0, 1]);
//! ```

pub mod aggregator;
pub mod codec;
pub mod election;
pub mod encryption;
pub mod error;
pub mod homomorphic;
pub mod keys;
pub mod primes;
pub mod records;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use aggregator::{aggregate, aggregate_parallel};
pub use codec::VoteCodec;
pub use election::{Election, ElectionConfig, ElectionResult, ElectionState};
pub use encryption::{Paillier, PaillierAuthority};
pub use error::{PaillierError, Result};
pub use homomorphic::{homomorphic_add, HomomorphicOperations};
pub use keys::{KeyPair, PrivateKey, PublicKey};
pub use primes::{generate_prime, is_probable_prime};
pub use records::{AggregateRecord, BallotBox, PrivateKeyRecord, PublicKeyRecord};
pub use types::{Ciphertext, PaillierConfig, TallyResult};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
