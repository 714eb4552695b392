//! Records exchanged between the roles of an election
//!
//! Every big integer is written as a decimal string, since the values exceed what JSON
//! numbers can carry portably.

use log::{debug, info};
use num_bigint::BigUint;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{PaillierError, Result};
use crate::keys::{PrivateKey, PublicKey};
use crate::types::Ciphertext;

/// Serde helpers storing a [`BigUint`] as a decimal string
pub mod decimal {
    use num_bigint::BigUint;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        BigUint::parse_bytes(text.trim().as_bytes(), 10)
            .ok_or_else(|| D::Error::custom(format!("not a decimal integer: {:?}", text)))
    }
}

/// Public key as published to voters and the aggregator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyRecord {
    #[serde(with = "decimal")]
    pub n: BigUint,
    #[serde(with = "decimal")]
    pub g: BigUint,
}

impl From<&PublicKey> for PublicKeyRecord {
    fn from(key: &PublicKey) -> Self {
        PublicKeyRecord {
            n: key.modulus().clone(),
            g: key.generator().clone(),
        }
    }
}

impl TryFrom<PublicKeyRecord> for PublicKey {
    type Error = PaillierError;

    fn try_from(record: PublicKeyRecord) -> Result<Self> {
        let key = PublicKey::new(record.n)
            .map_err(|err| PaillierError::MalformedRecord(err.to_string()))?;
        if key.generator() != &record.g {
            return Err(PaillierError::MalformedRecord(
                "public key g must equal n + 1".to_string(),
            ));
        }
        Ok(key)
    }
}

/// Private key, kept offline by the authority
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrivateKeyRecord {
    #[serde(with = "decimal")]
    pub n: BigUint,
    #[serde(with = "decimal", alias = "lam")]
    pub lambda: BigUint,
    #[serde(with = "decimal")]
    pub mu: BigUint,
}

impl std::fmt::Debug for PrivateKeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKeyRecord({} bits, ***)", self.n.bits())
    }
}

impl From<&PrivateKey> for PrivateKeyRecord {
    fn from(key: &PrivateKey) -> Self {
        PrivateKeyRecord {
            n: key.modulus().clone(),
            lambda: key.lambda().clone(),
            mu: key.mu().clone(),
        }
    }
}

impl TryFrom<PrivateKeyRecord> for PrivateKey {
    type Error = PaillierError;

    fn try_from(record: PrivateKeyRecord) -> Result<Self> {
        PrivateKey::new(record.n, record.lambda, record.mu)
            .map_err(|err| PaillierError::MalformedRecord(err.to_string()))
    }
}

/// Ordered list of submitted ballots
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BallotBox {
    pub ballots: Vec<Ciphertext>,
}

impl BallotBox {
    pub fn new(ballots: Vec<Ciphertext>) -> Self {
        BallotBox { ballots }
    }

    pub fn len(&self) -> usize {
        self.ballots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ballots.is_empty()
    }
}

/// Output of the aggregator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub encrypted_sum: Ciphertext,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ballot_count: Option<u64>,
}

/// Serialize a record as pretty-printed JSON
pub fn to_json_string<T: Serialize>(record: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(record)?)
}

/// Parse a record from JSON text
pub fn from_json_str<T: DeserializeOwned>(text: &str) -> Result<T> {
    Ok(serde_json::from_str(text)?)
}

/// Write a record to `path` as pretty-printed JSON
pub fn save_json<T: Serialize>(path: impl AsRef<Path>, record: &T) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .map_err(|err| PaillierError::IOError(format!("{}: {}", path.display(), err)))?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, record)?;
    writer.flush()?;

    info!("saved record to {}", path.display());
    Ok(())
}

/// Read a record from `path`; a missing file is an `IOError`, bad content `MalformedRecord`
pub fn load_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|err| PaillierError::IOError(format!("{}: {}", path.display(), err)))?;

    let record = serde_json::from_reader(BufReader::new(file))
        .map_err(|err| PaillierError::MalformedRecord(format!("{}: {}", path.display(), err)))?;

    debug!("loaded record from {}", path.display());
    Ok(record)
}
