//! Key generation and management

use log::{debug, info, warn};
use num_bigint::BigUint;
use num_traits::{One, Zero};
use std::fmt;

use crate::error::{PaillierError, Result};
use crate::primes::{
    check_rounds, generate_distinct_primes, DEFAULT_PRIMALITY_ROUNDS, MIN_PRIME_BITS,
};
use crate::types::PaillierConfig;
use crate::utils::{l_function, lcm, mod_exp, mod_inverse};

/// How many fresh prime pairs key derivation may draw before giving up
pub const KEYGEN_MAX_ATTEMPTS: usize = 16;

/// Paillier public key (n, g) with g = n + 1
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey {
    pub(crate) n: BigUint,
    pub(crate) g: BigUint,
    pub(crate) n_squared: BigUint,
}

impl PublicKey {
    /// Create a public key from its modulus; g is fixed to n + 1
    pub fn new(n: BigUint) -> Result<Self> {
        let g = &n + BigUint::one();
        let n_squared = &n * &n;
        let public_key = PublicKey { n, g, n_squared };
        public_key.validate()?;
        Ok(public_key)
    }

    /// Get the plaintext modulus n
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// Get the generator g
    pub fn generator(&self) -> &BigUint {
        &self.g
    }

    /// Get the ciphertext modulus n^2
    pub fn modulus_squared(&self) -> &BigUint {
        &self.n_squared
    }

    /// Get the bit size of the modulus
    pub fn bit_size(&self) -> u64 {
        self.n.bits()
    }

    /// Validate the public key
    pub fn validate(&self) -> Result<()> {
        if self.n <= BigUint::from(3u32) {
            return Err(PaillierError::InvalidConfig(
                "Modulus n must be > 3".to_string(),
            ));
        }

        if self.g != &self.n + BigUint::one() {
            return Err(PaillierError::InvalidConfig(
                "Generator g must equal n + 1".to_string(),
            ));
        }

        if self.n_squared != &self.n * &self.n {
            return Err(PaillierError::InvalidConfig(
                "Cached n^2 does not match n".to_string(),
            ));
        }

        Ok(())
    }

    /// Whether `m` is a valid plaintext, i.e. 0 <= m < n
    pub fn is_valid_plaintext(&self, m: &BigUint) -> bool {
        m < &self.n
    }

    /// Whether `c` lies in the ciphertext space [0, n^2)
    pub fn is_in_ciphertext_range(&self, c: &BigUint) -> bool {
        c < &self.n_squared
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({} bits)", self.bit_size())
    }
}

/// Paillier private key (n, lambda, mu)
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    pub(crate) n: BigUint,
    pub(crate) lambda: BigUint,
    pub(crate) mu: BigUint,
    pub(crate) n_squared: BigUint,
}

impl PrivateKey {
    /// Create a private key from its components, checking that mu inverts L(g^lambda)
    pub fn new(n: BigUint, lambda: BigUint, mu: BigUint) -> Result<Self> {
        let n_squared = &n * &n;
        let private_key = PrivateKey {
            n,
            lambda,
            mu,
            n_squared,
        };
        private_key.validate()?;
        Ok(private_key)
    }

    /// Get the modulus n this key decrypts under
    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    /// Get lambda = lcm(p - 1, q - 1)
    pub fn lambda(&self) -> &BigUint {
        &self.lambda
    }

    /// Get mu = L(g^lambda mod n^2)^-1 mod n
    pub fn mu(&self) -> &BigUint {
        &self.mu
    }

    /// Check that mu is the inverse of L(g^lambda mod n^2) modulo n
    pub fn validate(&self) -> Result<()> {
        if self.n <= BigUint::from(3u32) || self.lambda.is_zero() {
            return Err(PaillierError::InvalidConfig(
                "Private key components out of range".to_string(),
            ));
        }

        if self.mu.is_zero() || self.mu >= self.n {
            return Err(PaillierError::InvalidConfig(
                "mu must be in [1, n)".to_string(),
            ));
        }

        let g = &self.n + BigUint::one();
        let u = mod_exp(&g, &self.lambda, &self.n_squared);
        let l = l_function(&u, &self.n).ok_or_else(|| {
            PaillierError::InvalidConfig("L(g^lambda) is undefined".to_string())
        })?;

        if (l * &self.mu) % &self.n != BigUint::one() {
            return Err(PaillierError::InvalidConfig(
                "mu is not the inverse of L(g^lambda mod n^2)".to_string(),
            ));
        }

        Ok(())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("bits", &self.n.bits())
            .field("lambda", &"***")
            .field("mu", &"***")
            .finish()
    }
}

impl fmt::Display for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(***)")
    }
}

/// Paillier key pair
#[derive(Clone, Debug)]
pub struct KeyPair {
    pub public_key: PublicKey,
    pub private_key: PrivateKey,
}

impl KeyPair {
    /// Generate a new key pair from two `prime_bits`-bit probable primes
    ///
    /// # Example
    ///
    /// ```rust
    /// use paillier_tally::KeyPair;
    ///
    /// let keypair = KeyPair::generate(64).expect("Failed to generate keys");
    /// assert!(keypair.bit_size() >= 127);
    /// ```
    pub fn generate(prime_bits: u64) -> Result<Self> {
        Self::generate_with_rounds(prime_bits, DEFAULT_PRIMALITY_ROUNDS)
    }

    /// Generate a key pair as described by `config`
    pub fn generate_with_config(config: &PaillierConfig) -> Result<Self> {
        Self::generate_with_rounds(config.prime_bits, config.primality_rounds)
    }

    /// Generate a key pair using `rounds` Miller-Rabin rounds per prime candidate
    pub fn generate_with_rounds(prime_bits: u64, rounds: usize) -> Result<Self> {
        if prime_bits < MIN_PRIME_BITS {
            return Err(PaillierError::InvalidKeySize(prime_bits));
        }
        check_rounds(rounds)?;

        for attempt in 1..=KEYGEN_MAX_ATTEMPTS {
            let (p, q) = generate_distinct_primes(prime_bits, rounds)?;

            match Self::from_primes(&p, &q) {
                Ok(keypair) => {
                    info!(
                        "generated {}-bit Paillier key pair (attempt {})",
                        keypair.bit_size(),
                        attempt
                    );
                    return Ok(keypair);
                }
                Err(PaillierError::KeyGenerationFailure(reason)) => {
                    warn!("discarding prime pair: {}", reason);
                }
                Err(err) => return Err(err),
            }
        }

        Err(PaillierError::KeyGenerationFailure(format!(
            "no usable prime pair after {} attempts",
            KEYGEN_MAX_ATTEMPTS
        )))
    }

    /// Derive a key pair from two distinct primes
    pub fn from_primes(p: &BigUint, q: &BigUint) -> Result<Self> {
        if p == q {
            return Err(PaillierError::KeyGenerationFailure(
                "p and q must be distinct".to_string(),
            ));
        }
        if p <= &BigUint::one() || q <= &BigUint::one() {
            return Err(PaillierError::KeyGenerationFailure(
                "p and q must be greater than 1".to_string(),
            ));
        }

        let n = p * q;
        let n_squared = &n * &n;
        let g = &n + BigUint::one();

        let lambda = lcm(&(p - BigUint::one()), &(q - BigUint::one()));

        let u = mod_exp(&g, &lambda, &n_squared);
        let l = l_function(&u, &n).ok_or_else(|| {
            PaillierError::KeyGenerationFailure("L(g^lambda) is undefined".to_string())
        })?;
        let mu = mod_inverse(&l, &n).ok_or_else(|| {
            PaillierError::KeyGenerationFailure(
                "L(g^lambda mod n^2) has no inverse mod n".to_string(),
            )
        })?;

        debug!("derived key material for {}-bit modulus", n.bits());

        Ok(KeyPair {
            public_key: PublicKey {
                n: n.clone(),
                g,
                n_squared: n_squared.clone(),
            },
            private_key: PrivateKey {
                n,
                lambda,
                mu,
                n_squared,
            },
        })
    }

    /// Assemble a key pair from separately loaded halves
    pub fn from_parts(public_key: PublicKey, private_key: PrivateKey) -> Result<Self> {
        if public_key.n != private_key.n {
            return Err(PaillierError::KeyMismatch);
        }
        Ok(KeyPair {
            public_key,
            private_key,
        })
    }

    /// Get the bit size of the modulus
    pub fn bit_size(&self) -> u64 {
        self.public_key.bit_size()
    }
}

impl fmt::Display for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyPair({} bits)", self.bit_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_generation() {
        let keypair = KeyPair::generate(64).unwrap();
        assert!(keypair.bit_size() >= 127 && keypair.bit_size() <= 128);
        keypair.public_key.validate().unwrap();
        keypair.private_key.validate().unwrap();
        assert_eq!(
            keypair.public_key.g,
            &keypair.public_key.n + BigUint::one()
        );
    }

    #[test]
    fn test_key_size_validation() {
        assert_eq!(
            KeyPair::generate(8).unwrap_err(),
            PaillierError::InvalidKeySize(8)
        );
        assert!(KeyPair::generate(16).is_ok());
    }

    #[test]
    fn test_zero_primality_rounds_rejected() {
        assert!(matches!(
            KeyPair::generate_with_rounds(32, 0),
            Err(PaillierError::InvalidConfig(_))
        ));

        let config = PaillierConfig {
            prime_bits: 32,
            primality_rounds: 0,
        };
        assert!(matches!(
            KeyPair::generate_with_config(&config),
            Err(PaillierError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_primes_known_values() {
        // p = 11, q = 13: n = 143, lambda = lcm(10, 12) = 60
        let keypair = KeyPair::from_primes(&BigUint::from(11u32), &BigUint::from(13u32)).unwrap();
        assert_eq!(keypair.public_key.n, BigUint::from(143u32));
        assert_eq!(keypair.public_key.n_squared, BigUint::from(143u32 * 143));
        assert_eq!(keypair.private_key.lambda, BigUint::from(60u32));

        let u = mod_exp(
            &keypair.public_key.g,
            &keypair.private_key.lambda,
            &keypair.public_key.n_squared,
        );
        let l = l_function(&u, &keypair.public_key.n).unwrap();
        assert_eq!(
            (l * &keypair.private_key.mu) % &keypair.public_key.n,
            BigUint::one()
        );
    }

    #[test]
    fn test_from_primes_rejects_equal_primes() {
        let p = BigUint::from(11u32);
        assert!(matches!(
            KeyPair::from_primes(&p, &p),
            Err(PaillierError::KeyGenerationFailure(_))
        ));
    }

    #[test]
    fn test_from_primes_rejects_non_invertible() {
        // n = 3 * 7 = 21, lambda = lcm(2, 6) = 6, L(22^6 mod 441) = 6 shares a factor with 21
        assert!(matches!(
            KeyPair::from_primes(&BigUint::from(3u32), &BigUint::from(7u32)),
            Err(PaillierError::KeyGenerationFailure(_))
        ));
    }

    #[test]
    fn test_public_key_validation() {
        let keypair = KeyPair::generate(32).unwrap();
        assert!(keypair.public_key.validate().is_ok());

        let invalid = PublicKey {
            n: BigUint::from(15u32),
            g: BigUint::from(7u32),
            n_squared: BigUint::from(225u32),
        };
        assert!(invalid.validate().is_err());
        assert!(PublicKey::new(BigUint::from(2u32)).is_err());
    }

    #[test]
    fn test_private_key_new_checks_mu() {
        let keypair = KeyPair::generate(32).unwrap();
        let sk = &keypair.private_key;
        assert!(PrivateKey::new(sk.n.clone(), sk.lambda.clone(), sk.mu.clone()).is_ok());

        let wrong_mu = (&sk.mu + BigUint::one()) % &sk.n;
        assert!(PrivateKey::new(sk.n.clone(), sk.lambda.clone(), wrong_mu).is_err());
    }

    #[test]
    fn test_from_parts_detects_mismatch() {
        let a = KeyPair::generate(32).unwrap();
        let b = KeyPair::generate(32).unwrap();
        assert!(KeyPair::from_parts(a.public_key.clone(), a.private_key.clone()).is_ok());
        assert_eq!(
            KeyPair::from_parts(a.public_key, b.private_key).unwrap_err(),
            PaillierError::KeyMismatch
        );
    }

    #[test]
    fn test_private_key_formatting_hides_secrets() {
        let keypair = KeyPair::generate(32).unwrap();
        let debug = format!("{:?}", keypair.private_key);
        assert!(!debug.contains(&keypair.private_key.lambda.to_string()));
        assert_eq!(format!("{}", keypair.private_key), "PrivateKey(***)");
    }
}
