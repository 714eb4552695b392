//! Probable prime generation with the Miller-Rabin test

use log::debug;
use num_bigint::{BigUint, RandBigInt};
use num_integer::Integer;
use num_traits::One;
use rand::{thread_rng, CryptoRng, RngCore};

use crate::error::{PaillierError, Result};
use crate::utils::{factor_powers_of_two, mod_exp, random_in_range};

/// Smallest prime size accepted by [`generate_prime`]
pub const MIN_PRIME_BITS: u64 = 16;

/// Default number of Miller-Rabin rounds (false positive rate <= 4^-20)
pub const DEFAULT_PRIMALITY_ROUNDS: usize = 20;

/// Miller-Rabin primality test
///
/// Each of the `rounds` bases is drawn independently from [2, n - 2]. A composite
/// survives all rounds with probability at most 4^-rounds.
pub fn is_probable_prime(n: &BigUint, rounds: usize) -> bool {
    is_probable_prime_with_rng(n, rounds, &mut thread_rng())
}

pub(crate) fn is_probable_prime_with_rng<R: RngCore + CryptoRng>(
    n: &BigUint,
    rounds: usize,
    rng: &mut R,
) -> bool {
    let one = BigUint::one();
    let two = BigUint::from(2u32);
    let three = BigUint::from(3u32);

    if n <= &one {
        return false;
    }
    if n == &two || n == &three {
        return true;
    }
    if n.is_even() {
        return false;
    }

    let n_minus_1 = n - &one;
    let (r, d) = factor_powers_of_two(&n_minus_1);

    'witness: for _ in 0..rounds {
        // upper bound is exclusive, so this draws from [2, n - 2]
        let a = random_in_range(rng, &two, &n_minus_1);
        let mut x = mod_exp(&a, &d, n);

        if x == one || x == n_minus_1 {
            continue;
        }

        for _ in 1..r {
            x = mod_exp(&x, &two, n);
            if x == n_minus_1 {
                continue 'witness;
            }
        }

        return false;
    }

    true
}

/// Generate a probable prime of exactly `bits` bits
pub fn generate_prime(bits: u64) -> Result<BigUint> {
    generate_prime_with_rounds(bits, DEFAULT_PRIMALITY_ROUNDS)
}

/// Generate a probable prime of exactly `bits` bits using `rounds` Miller-Rabin rounds
pub fn generate_prime_with_rounds(bits: u64, rounds: usize) -> Result<BigUint> {
    if bits < MIN_PRIME_BITS {
        return Err(PaillierError::InvalidKeySize(bits));
    }
    check_rounds(rounds)?;
    Ok(sample_prime(bits, rounds, &mut thread_rng()))
}

/// Zero rounds would accept every odd candidate
pub(crate) fn check_rounds(rounds: usize) -> Result<()> {
    if rounds == 0 {
        return Err(PaillierError::InvalidConfig(
            "primality_rounds must be at least 1".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn sample_prime<R: RngCore + CryptoRng>(
    bits: u64,
    rounds: usize,
    rng: &mut R,
) -> BigUint {
    let mut attempts: u64 = 0;

    loop {
        attempts += 1;

        let mut candidate = rng.gen_biguint(bits);
        candidate |= BigUint::one() << (bits - 1); // top bit: exactly `bits` long
        candidate |= BigUint::one(); // odd

        if is_probable_prime_with_rng(&candidate, rounds, rng) {
            debug!("found {}-bit probable prime after {} candidates", bits, attempts);
            return candidate;
        }
    }
}

/// Generate two distinct probable primes of `bits` bits each
pub fn generate_distinct_primes(bits: u64, rounds: usize) -> Result<(BigUint, BigUint)> {
    let p = generate_prime_with_rounds(bits, rounds)?;
    let mut q = generate_prime_with_rounds(bits, rounds)?;
    while q == p {
        debug!("drew p == q, redrawing q");
        q = generate_prime_with_rounds(bits, rounds)?;
    }
    Ok((p, q))
}
