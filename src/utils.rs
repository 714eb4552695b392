//! Number theory helpers shared by key generation, encryption and decryption

use num_bigint::{BigInt, BigUint, RandBigInt, Sign};
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{CryptoRng, RngCore};

/// Modular exponentiation: base^exp mod modulus
pub fn mod_exp(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    base.modpow(exp, modulus)
}

/// Compute modular inverse using the extended Euclidean algorithm
///
/// Returns `None` when `a` and `m` are not coprime.
pub fn mod_inverse(a: &BigUint, m: &BigUint) -> Option<BigUint> {
    if m.is_zero() {
        return None;
    }

    let m_int = BigInt::from(m.clone());
    let (gcd, x, _) = extended_gcd(&BigInt::from(a % m), &m_int);

    if !gcd.is_one() {
        return None;
    }

    // x may be negative; bring it back into [0, m)
    let x = x.mod_floor(&m_int);
    match x.into_parts() {
        (Sign::Minus, _) => None,
        (_, magnitude) => Some(magnitude),
    }
}

/// Extended Euclidean algorithm, iterative so deep moduli don't grow the stack
fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let q = &old_r / &r;

        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);

        let next_s = &old_s - &q * &s;
        old_s = std::mem::replace(&mut s, next_s);

        let next_t = &old_t - &q * &t;
        old_t = std::mem::replace(&mut t, next_t);
    }

    (old_r, old_s, old_t)
}

/// Least common multiple, computed as a * b / gcd(a, b)
pub fn lcm(a: &BigUint, b: &BigUint) -> BigUint {
    let gcd = a.gcd(b);
    if gcd.is_zero() {
        return BigUint::zero();
    }
    (a * b) / gcd
}

/// The Paillier L-function: L(x) = (x - 1) / n
///
/// Returns `None` for x = 0, which has no preimage in Z*_{n^2}.
pub fn l_function(x: &BigUint, n: &BigUint) -> Option<BigUint> {
    if x.is_zero() || n.is_zero() {
        return None;
    }
    Some((x - BigUint::one()) / n)
}

/// Factor out powers of 2 from n: returns (r, d) with n = 2^r * d and d odd
pub fn factor_powers_of_two(n: &BigUint) -> (u64, BigUint) {
    if n.is_zero() {
        return (0, BigUint::zero());
    }

    let r = n.trailing_zeros().unwrap_or(0);
    (r, n >> r)
}

/// Generate a random element in the range [low, high)
pub fn random_in_range<R: RngCore + CryptoRng>(
    rng: &mut R,
    low: &BigUint,
    high: &BigUint,
) -> BigUint {
    rng.gen_biguint_range(low, high)
}

/// Sample r in [1, n) with gcd(r, n) = 1, retrying until one is found
pub fn random_coprime<R: RngCore + CryptoRng>(rng: &mut R, n: &BigUint) -> BigUint {
    loop {
        let r = random_in_range(rng, &BigUint::one(), n);
        if r.gcd(n).is_one() {
            return r;
        }
    }
}
