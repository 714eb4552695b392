//! Slot encoding of one-hot votes into a single plaintext integer
//!
//! Candidate `i` is encoded as `S^i`, so summing ballots adds one to the base-S digit
//! belonging to the chosen candidate. Decoding reads the digits back little-endian.
//! Digits stay independent only while every count is below `S`.

use log::warn;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{pow, Zero};

use crate::encryption::Paillier;
use crate::error::{PaillierError, Result};
use crate::keys::PublicKey;
use crate::types::{Ciphertext, TallyResult};

/// Packs per-candidate counters into base-`slot_size` digits
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteCodec {
    candidate_count: usize,
    slot_size: u64,
}

impl VoteCodec {
    pub fn new(candidate_count: usize, slot_size: u64) -> Result<Self> {
        if candidate_count == 0 {
            return Err(PaillierError::InvalidConfig(
                "candidate count must be at least 1".to_string(),
            ));
        }
        if slot_size < 2 {
            return Err(PaillierError::InvalidSlotSize(slot_size));
        }

        Ok(VoteCodec {
            candidate_count,
            slot_size,
        })
    }

    pub fn candidate_count(&self) -> usize {
        self.candidate_count
    }

    pub fn slot_size(&self) -> u64 {
        self.slot_size
    }

    /// Largest number of ballots that can be tallied without a slot carrying over
    pub fn max_ballots(&self) -> u64 {
        self.slot_size - 1
    }

    /// S^C, the smallest value that no longer fits in the slots
    pub fn plaintext_bound(&self) -> BigUint {
        pow(BigUint::from(self.slot_size), self.candidate_count)
    }

    /// Ensure a full tally fits below n, so the aggregate cannot wrap mod n
    pub fn check_capacity(&self, public_key: &PublicKey) -> Result<()> {
        let bound = self.plaintext_bound();
        if &bound > public_key.modulus() {
            return Err(PaillierError::CapacityExceeded {
                required_bits: bound.bits(),
                available_bits: public_key.bit_size(),
            });
        }
        Ok(())
    }

    /// Encode a vote for candidate `index` as S^index
    pub fn encode_choice(&self, index: usize) -> Result<BigUint> {
        if index >= self.candidate_count {
            return Err(PaillierError::InvalidCandidate {
                index,
                candidate_count: self.candidate_count,
            });
        }
        Ok(pow(BigUint::from(self.slot_size), index))
    }

    /// Encode and encrypt a vote for candidate `index`
    pub fn encode_ballot(&self, index: usize, paillier: &Paillier) -> Result<Ciphertext> {
        let plaintext = self.encode_choice(index)?;
        paillier.encrypt(&plaintext)
    }

    /// Split an aggregate plaintext into per-candidate counts
    ///
    /// A non-zero value left after the last slot sets `overflow`; counts are still
    /// returned so the caller can inspect them, but they must not be trusted.
    pub fn decode_aggregate(&self, total: &BigUint) -> TallyResult {
        let slot = BigUint::from(self.slot_size);
        let mut rest = total.clone();
        let mut counts = Vec::with_capacity(self.candidate_count);

        for _ in 0..self.candidate_count {
            let (quotient, count) = rest.div_rem(&slot);
            // count < slot_size <= u64::MAX, so it is at most one u64 digit
            counts.push(count.to_u64_digits().first().copied().unwrap_or(0));
            rest = quotient;
        }

        let overflow = !rest.is_zero();
        if overflow {
            warn!(
                "aggregate exceeds {} slots of size {}; tally is corrupt",
                self.candidate_count, self.slot_size
            );
        }

        TallyResult {
            counts,
            overflow,
            remainder: rest,
        }
    }

    /// Like [`decode_aggregate`](Self::decode_aggregate) but reports overflow as an error
    pub fn decode_checked(&self, total: &BigUint) -> Result<TallyResult> {
        self.decode_aggregate(total).into_checked()
    }

    /// Decode an aggregate of exactly `ballot_count` one-hot ballots
    ///
    /// A carry out of a lower slot is invisible to [`decode_aggregate`](Self::decode_aggregate)
    /// (1000 votes for candidate 0 read as one vote for candidate 1 when S = 1000), but it
    /// always shrinks the decoded total. Any mismatch with the number of ballots, or a
    /// ballot count that could not fit a slot, sets `overflow`.
    pub fn decode_with_ballot_count(&self, total: &BigUint, ballot_count: u64) -> TallyResult {
        let mut tally = self.decode_aggregate(total);

        if ballot_count > self.max_ballots()
            || tally.total_votes() != u128::from(ballot_count)
        {
            if !tally.overflow {
                warn!(
                    "decoded {} votes from {} ballots (slot size {}); a slot carried over",
                    tally.total_votes(),
                    ballot_count,
                    self.slot_size
                );
            }
            tally.overflow = true;
        }

        tally
    }
}
