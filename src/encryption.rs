//! Core Paillier encryption and decryption operations
//!
//! Encryption only needs the public key and lives on [`Paillier`]. Decryption lives on
//! [`PaillierAuthority`], which cannot be built without a private key.

use log::debug;
use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::One;
use rand::{thread_rng, CryptoRng, RngCore};
use rayon::prelude::*;

use crate::error::{PaillierError, Result};
use crate::keys::{KeyPair, PrivateKey, PublicKey};
use crate::types::{Ciphertext, PaillierConfig};
use crate::utils::{l_function, mod_exp, random_coprime};

/// Public-key Paillier capability: encryption and ciphertext arithmetic
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Paillier {
    pub public_key: PublicKey,
}

impl Paillier {
    /// Create a new Paillier instance for the given public key
    pub fn new(public_key: PublicKey) -> Self {
        Paillier { public_key }
    }

    /// Get the public key
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Encrypt a plaintext message m in [0, n)
    pub fn encrypt(&self, plaintext: &BigUint) -> Result<Ciphertext> {
        self.encrypt_with_rng(plaintext, &mut thread_rng())
    }

    pub(crate) fn encrypt_with_rng<R: RngCore + CryptoRng>(
        &self,
        plaintext: &BigUint,
        rng: &mut R,
    ) -> Result<Ciphertext> {
        if !self.public_key.is_valid_plaintext(plaintext) {
            return Err(PaillierError::InvalidPlaintext);
        }

        let r = random_coprime(rng, &self.public_key.n);
        Ok(self.encrypt_raw(plaintext, &r))
    }

    /// Encrypt with a caller-supplied randomizer (for test vectors)
    ///
    /// `randomness` must lie in [1, n) and be coprime to n.
    pub fn encrypt_with_randomness(
        &self,
        plaintext: &BigUint,
        randomness: &BigUint,
    ) -> Result<Ciphertext> {
        if !self.public_key.is_valid_plaintext(plaintext) {
            return Err(PaillierError::InvalidPlaintext);
        }

        let n = &self.public_key.n;
        if randomness >= n || !randomness.gcd(n).is_one() {
            return Err(PaillierError::InvalidConfig(
                "randomizer must be in [1, n) and coprime to n".to_string(),
            ));
        }

        Ok(self.encrypt_raw(plaintext, randomness))
    }

    /// c = (g^m mod n^2) * (r^n mod n^2) mod n^2
    fn encrypt_raw(&self, plaintext: &BigUint, r: &BigUint) -> Ciphertext {
        let pk = &self.public_key;
        let g_m = mod_exp(&pk.g, plaintext, &pk.n_squared);
        let r_n = mod_exp(r, &pk.n, &pk.n_squared);
        Ciphertext::new((g_m * r_n) % &pk.n_squared)
    }

    /// Encrypt many plaintexts in parallel
    pub fn encrypt_batch(&self, plaintexts: &[BigUint]) -> Result<Vec<Ciphertext>> {
        debug!("encrypting batch of {} plaintexts", plaintexts.len());
        plaintexts
            .par_iter()
            .map(|m| self.encrypt(m))
            .collect()
    }

    /// Re-randomize a ciphertext (produces a different encryption of the same plaintext)
    pub fn rerandomize(&self, ciphertext: &Ciphertext) -> Result<Ciphertext> {
        self.check_ciphertext(ciphertext)?;

        let pk = &self.public_key;
        let r = random_coprime(&mut thread_rng(), &pk.n);
        let r_n = mod_exp(&r, &pk.n, &pk.n_squared);

        Ok(Ciphertext::new((&ciphertext.value * r_n) % &pk.n_squared))
    }

    /// Reject values outside the ciphertext space [0, n^2)
    pub fn check_ciphertext(&self, ciphertext: &Ciphertext) -> Result<()> {
        if !self.public_key.is_in_ciphertext_range(&ciphertext.value) {
            return Err(PaillierError::InvalidCiphertext);
        }
        Ok(())
    }
}

/// Full key-pair capability held by the tallying authority
#[derive(Clone, Debug)]
pub struct PaillierAuthority {
    paillier: Paillier,
    private_key: PrivateKey,
}

impl PaillierAuthority {
    /// Wrap a key pair
    pub fn new(keypair: KeyPair) -> Self {
        PaillierAuthority {
            paillier: Paillier::new(keypair.public_key),
            private_key: keypair.private_key,
        }
    }

    /// Generate fresh keys as described by `config`
    pub fn generate(config: &PaillierConfig) -> Result<Self> {
        KeyPair::generate_with_config(config).map(Self::new)
    }

    /// Rebuild the authority from separately loaded key halves
    pub fn from_parts(public_key: PublicKey, private_key: PrivateKey) -> Result<Self> {
        KeyPair::from_parts(public_key, private_key).map(Self::new)
    }

    /// The public half, safe to hand to voters and aggregators
    pub fn public(&self) -> &Paillier {
        &self.paillier
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.paillier.public_key
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Decrypt a ciphertext: m = L(c^lambda mod n^2) * mu mod n
    pub fn decrypt(&self, ciphertext: &Ciphertext) -> Result<BigUint> {
        self.paillier.check_ciphertext(ciphertext)?;

        let sk = &self.private_key;
        if !ciphertext.value.gcd(&sk.n).is_one() {
            return Err(PaillierError::InvalidCiphertext);
        }

        let u = mod_exp(&ciphertext.value, &sk.lambda, &sk.n_squared);
        let l = l_function(&u, &sk.n).ok_or(PaillierError::InvalidCiphertext)?;

        Ok((l * &sk.mu) % &sk.n)
    }

    /// Decrypt many ciphertexts in parallel
    pub fn decrypt_batch(&self, ciphertexts: &[Ciphertext]) -> Result<Vec<BigUint>> {
        ciphertexts.par_iter().map(|ct| self.decrypt(ct)).collect()
    }
}
