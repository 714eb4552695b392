//! Folding encrypted ballots into a single aggregate ciphertext

use log::debug;
use rayon::prelude::*;

use crate::error::{PaillierError, Result};
use crate::homomorphic::homomorphic_add;
use crate::keys::PublicKey;
use crate::types::Ciphertext;

fn check_all(ciphertexts: &[Ciphertext], public_key: &PublicKey) -> Result<()> {
    if ciphertexts.is_empty() {
        return Err(PaillierError::EmptyAggregate);
    }
    if ciphertexts
        .iter()
        .any(|ct| !public_key.is_in_ciphertext_range(ct.value()))
    {
        return Err(PaillierError::InvalidCiphertext);
    }
    Ok(())
}

/// Multiply all ballots together mod n^2, left to right
///
/// The result decrypts to the sum of the ballots' plaintexts mod n. An empty input is
/// an error: there is no ciphertext that can stand in for zero without fresh randomness.
pub fn aggregate(ciphertexts: &[Ciphertext], public_key: &PublicKey) -> Result<Ciphertext> {
    check_all(ciphertexts, public_key)?;
    debug!("aggregating {} ciphertexts sequentially", ciphertexts.len());

    let n_squared = public_key.modulus_squared();
    let (first, rest) = ciphertexts
        .split_first()
        .ok_or(PaillierError::EmptyAggregate)?;

    rest.iter()
        .try_fold(first.clone(), |acc, ct| homomorphic_add(&acc, ct, n_squared))
}

/// Same as [`aggregate`], reduced as a parallel tree
pub fn aggregate_parallel(
    ciphertexts: &[Ciphertext],
    public_key: &PublicKey,
) -> Result<Ciphertext> {
    check_all(ciphertexts, public_key)?;
    debug!("aggregating {} ciphertexts in parallel", ciphertexts.len());

    let n_squared = public_key.modulus_squared();
    ciphertexts
        .par_iter()
        .cloned()
        .map(Ok::<Ciphertext, PaillierError>)
        .reduce_with(|a, b| homomorphic_add(&a?, &b?, n_squared))
        .unwrap_or(Err(PaillierError::EmptyAggregate))
}
