//! Election lifecycle driving the cryptosystem
//!
//! An [`Election`] moves through Configured -> KeysIssued -> VotingOpen -> Tallied ->
//! Revealed. Each transition checks the current state and leaves it untouched on error.

use log::{info, warn};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::aggregator::{aggregate, aggregate_parallel};
use crate::codec::VoteCodec;
use crate::encryption::PaillierAuthority;
use crate::error::{PaillierError, Result};
use crate::records::{AggregateRecord, BallotBox, PrivateKeyRecord, PublicKeyRecord};
use crate::types::{Ciphertext, PaillierConfig};

pub const DEFAULT_SLOT_SIZE: u64 = 1000;
pub const MIN_CANDIDATES: usize = 2;
pub const MAX_CANDIDATES: usize = 5;

/// Ballot counts at or above this are aggregated with a parallel reduction
const PARALLEL_AGGREGATION_THRESHOLD: usize = 64;

fn default_slot_size() -> u64 {
    DEFAULT_SLOT_SIZE
}

/// Candidate list and slot capacity for one election
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionConfig {
    pub candidates: Vec<String>,
    #[serde(default = "default_slot_size")]
    pub slot_size: u64,
}

impl ElectionConfig {
    pub fn new<I, S>(candidates: I, slot_size: u64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let config = ElectionConfig {
            candidates: candidates
                .into_iter()
                .map(|name| Into::<String>::into(name).trim().to_string())
                .collect(),
            slot_size,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let count = self.candidates.len();
        if !(MIN_CANDIDATES..=MAX_CANDIDATES).contains(&count) {
            return Err(PaillierError::InvalidConfig(format!(
                "need between {} and {} candidates, got {}",
                MIN_CANDIDATES, MAX_CANDIDATES, count
            )));
        }

        let mut seen = HashSet::new();
        for name in &self.candidates {
            if name.trim().is_empty() {
                return Err(PaillierError::InvalidConfig(
                    "candidate names must not be blank".to_string(),
                ));
            }
            if !seen.insert(name.as_str()) {
                return Err(PaillierError::InvalidConfig(format!(
                    "duplicate candidate {:?}",
                    name
                )));
            }
        }

        if self.slot_size < 2 {
            return Err(PaillierError::InvalidSlotSize(self.slot_size));
        }

        Ok(())
    }

    /// The codec matching this candidate list
    pub fn codec(&self) -> Result<VoteCodec> {
        VoteCodec::new(self.candidates.len(), self.slot_size)
    }
}

/// Where an election is in its lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElectionState {
    Configured,
    KeysIssued,
    VotingOpen,
    Tallied,
    Revealed,
}

impl fmt::Display for ElectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElectionState::Configured => write!(f, "Configured"),
            ElectionState::KeysIssued => write!(f, "KeysIssued"),
            ElectionState::VotingOpen => write!(f, "VotingOpen"),
            ElectionState::Tallied => write!(f, "Tallied"),
            ElectionState::Revealed => write!(f, "Revealed"),
        }
    }
}

/// Final, decoded outcome of an election
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ElectionResult {
    /// (candidate name, votes) in configured order
    pub tallies: Vec<(String, u64)>,
    pub ballot_count: u64,
    /// Set when the decoded slots cannot be trusted
    pub overflow: bool,
    pub remainder: BigUint,
}

impl ElectionResult {
    pub fn total_votes(&self) -> u128 {
        self.tallies
            .iter()
            .map(|(_, count)| u128::from(*count))
            .sum()
    }

    pub fn votes_for(&self, candidate: &str) -> Option<u64> {
        self.tallies
            .iter()
            .find(|(name, _)| name == candidate)
            .map(|(_, count)| *count)
    }
}

enum Phase {
    Configured,
    KeysIssued {
        authority: PaillierAuthority,
    },
    VotingOpen {
        authority: PaillierAuthority,
        ballots: Vec<Ciphertext>,
    },
    Tallied {
        authority: PaillierAuthority,
        ballots: Vec<Ciphertext>,
        aggregate: Ciphertext,
    },
    Revealed {
        authority: PaillierAuthority,
        ballots: Vec<Ciphertext>,
        aggregate: Ciphertext,
        result: ElectionResult,
    },
}

impl Phase {
    fn state(&self) -> ElectionState {
        match self {
            Phase::Configured => ElectionState::Configured,
            Phase::KeysIssued { .. } => ElectionState::KeysIssued,
            Phase::VotingOpen { .. } => ElectionState::VotingOpen,
            Phase::Tallied { .. } => ElectionState::Tallied,
            Phase::Revealed { .. } => ElectionState::Revealed,
        }
    }

    fn authority(&self) -> Option<&PaillierAuthority> {
        match self {
            Phase::Configured => None,
            Phase::KeysIssued { authority }
            | Phase::VotingOpen { authority, .. }
            | Phase::Tallied { authority, .. }
            | Phase::Revealed { authority, .. } => Some(authority),
        }
    }

    fn ballots(&self) -> &[Ciphertext] {
        match self {
            Phase::Configured | Phase::KeysIssued { .. } => &[],
            Phase::VotingOpen { ballots, .. }
            | Phase::Tallied { ballots, .. }
            | Phase::Revealed { ballots, .. } => ballots.as_slice(),
        }
    }
}

/// A single election run by the tallying authority
pub struct Election {
    config: ElectionConfig,
    codec: VoteCodec,
    phase: Phase,
}

impl Election {
    /// Start a new election in the Configured state
    pub fn new(config: ElectionConfig) -> Result<Self> {
        config.validate()?;
        let codec = config.codec()?;
        info!(
            "election configured with {} candidates, slot size {}",
            config.candidates.len(),
            config.slot_size
        );
        Ok(Election {
            config,
            codec,
            phase: Phase::Configured,
        })
    }

    pub fn state(&self) -> ElectionState {
        self.phase.state()
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn codec(&self) -> &VoteCodec {
        &self.codec
    }

    pub fn ballots(&self) -> &[Ciphertext] {
        self.phase.ballots()
    }

    fn invalid(&self, action: &str) -> PaillierError {
        PaillierError::InvalidTransition {
            state: self.state().to_string(),
            action: action.to_string(),
        }
    }

    /// Configured -> KeysIssued: generate the key pair
    pub fn issue_keys(&mut self, config: &PaillierConfig) -> Result<()> {
        if !matches!(self.phase, Phase::Configured) {
            return Err(self.invalid("issue keys"));
        }

        let authority = PaillierAuthority::generate(config)?;
        self.install_keys(authority)
    }

    /// Configured -> KeysIssued with an existing authority (e.g. keys loaded from disk)
    pub fn install_keys(&mut self, authority: PaillierAuthority) -> Result<()> {
        if !matches!(self.phase, Phase::Configured) {
            return Err(self.invalid("install keys"));
        }

        self.codec.check_capacity(authority.public_key())?;
        info!("keys issued: {}", authority.public_key());
        self.phase = Phase::KeysIssued { authority };
        Ok(())
    }

    /// KeysIssued -> VotingOpen with an empty ballot box
    pub fn open_voting(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.phase, Phase::Configured) {
            Phase::KeysIssued { authority } => {
                info!("voting open");
                self.phase = Phase::VotingOpen {
                    authority,
                    ballots: Vec::new(),
                };
                Ok(())
            }
            other => {
                self.phase = other;
                Err(self.invalid("open voting"))
            }
        }
    }

    /// Encode and encrypt a vote for candidate `index`, then drop it in the box
    pub fn cast_vote(&mut self, index: usize) -> Result<&Ciphertext> {
        let ballot = match &self.phase {
            Phase::VotingOpen { authority, .. } => {
                self.codec.encode_ballot(index, authority.public())?
            }
            _ => return Err(self.invalid("cast a vote")),
        };
        self.push_ballot(ballot)
    }

    /// Accept a ballot encrypted elsewhere under this election's public key
    pub fn submit_ballot(&mut self, ballot: Ciphertext) -> Result<&Ciphertext> {
        match &self.phase {
            Phase::VotingOpen { authority, .. } => authority.public().check_ciphertext(&ballot)?,
            _ => return Err(self.invalid("submit a ballot")),
        }
        self.push_ballot(ballot)
    }

    fn push_ballot(&mut self, ballot: Ciphertext) -> Result<&Ciphertext> {
        let max_ballots = self.codec.max_ballots();
        let state = self.state();
        match &mut self.phase {
            Phase::VotingOpen { ballots, .. } => {
                let index = ballots.len();
                ballots.push(ballot);
                if ballots.len() as u64 > max_ballots {
                    warn!(
                        "{} ballots exceed slot capacity {}; the tally will overflow",
                        ballots.len(),
                        max_ballots
                    );
                }
                Ok(&ballots[index])
            }
            _ => Err(PaillierError::InvalidTransition {
                state: state.to_string(),
                action: "add a ballot".to_string(),
            }),
        }
    }

    /// VotingOpen -> Tallied: fold every ballot into one ciphertext
    pub fn tally(&mut self) -> Result<&Ciphertext> {
        let aggregate = match &self.phase {
            Phase::VotingOpen { authority, ballots } => {
                let public_key = authority.public_key();
                if ballots.len() >= PARALLEL_AGGREGATION_THRESHOLD {
                    aggregate_parallel(ballots, public_key)?
                } else {
                    aggregate(ballots, public_key)?
                }
            }
            _ => return Err(self.invalid("tally")),
        };

        match std::mem::replace(&mut self.phase, Phase::Configured) {
            Phase::VotingOpen { authority, ballots } => {
                info!("tallied {} ballots", ballots.len());
                self.phase = Phase::Tallied {
                    authority,
                    ballots,
                    aggregate,
                };
            }
            other => self.phase = other,
        }

        match &self.phase {
            Phase::Tallied { aggregate, .. } => Ok(aggregate),
            _ => Err(self.invalid("tally")),
        }
    }

    /// Tallied -> Revealed: decrypt the aggregate and decode the per-candidate counts
    pub fn reveal(&mut self) -> Result<&ElectionResult> {
        let result = match &self.phase {
            Phase::Tallied {
                authority,
                ballots,
                aggregate,
            } => {
                let total = authority.decrypt(aggregate)?;
                let tally = self
                    .codec
                    .decode_with_ballot_count(&total, ballots.len() as u64);

                ElectionResult {
                    tallies: self
                        .config
                        .candidates
                        .iter()
                        .cloned()
                        .zip(tally.counts.iter().copied())
                        .collect(),
                    ballot_count: ballots.len() as u64,
                    overflow: tally.overflow,
                    remainder: tally.remainder,
                }
            }
            _ => return Err(self.invalid("reveal")),
        };

        if result.overflow {
            warn!("revealed tally failed its integrity check");
        } else {
            info!("revealed tally of {} votes", result.total_votes());
        }

        match std::mem::replace(&mut self.phase, Phase::Configured) {
            Phase::Tallied {
                authority,
                ballots,
                aggregate,
            } => {
                self.phase = Phase::Revealed {
                    authority,
                    ballots,
                    aggregate,
                    result,
                };
            }
            other => self.phase = other,
        }

        match &self.phase {
            Phase::Revealed { result, .. } => Ok(result),
            _ => Err(self.invalid("reveal")),
        }
    }

    /// The revealed result, once available
    pub fn result(&self) -> Option<&ElectionResult> {
        match &self.phase {
            Phase::Revealed { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Public key record for voters and the aggregator
    pub fn public_key_record(&self) -> Result<PublicKeyRecord> {
        self.phase
            .authority()
            .map(|authority| PublicKeyRecord::from(authority.public_key()))
            .ok_or_else(|| self.invalid("export the public key"))
    }

    /// Private key record, for the authority's offline storage only
    pub fn private_key_record(&self) -> Result<PrivateKeyRecord> {
        self.phase
            .authority()
            .map(|authority| PrivateKeyRecord::from(authority.private_key()))
            .ok_or_else(|| self.invalid("export the private key"))
    }

    pub fn ballot_box(&self) -> BallotBox {
        BallotBox::new(self.ballots().to_vec())
    }

    pub fn aggregate_record(&self) -> Result<AggregateRecord> {
        match &self.phase {
            Phase::Tallied {
                ballots, aggregate, ..
            }
            | Phase::Revealed {
                ballots, aggregate, ..
            } => Ok(AggregateRecord {
                encrypted_sum: aggregate.clone(),
                ballot_count: Some(ballots.len() as u64),
            }),
            _ => Err(self.invalid("export the aggregate")),
        }
    }
}

impl fmt::Debug for Election {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Election")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("ballots", &self.ballots().len())
            .finish()
    }
}
