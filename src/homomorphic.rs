//! Homomorphic operations on ciphertexts

use num_bigint::BigUint;

use crate::encryption::Paillier;
use crate::error::{PaillierError, Result};
use crate::types::Ciphertext;
use crate::utils::{mod_exp, mod_inverse};

/// Combine two ciphertexts so the result decrypts to the sum of their plaintexts mod n
///
/// Both operands must lie in [0, n^2).
pub fn homomorphic_add(
    ct1: &Ciphertext,
    ct2: &Ciphertext,
    n_squared: &BigUint,
) -> Result<Ciphertext> {
    if &ct1.value >= n_squared || &ct2.value >= n_squared {
        return Err(PaillierError::InvalidCiphertext);
    }
    Ok(Ciphertext::new((&ct1.value * &ct2.value) % n_squared))
}

/// Trait for homomorphic operations
pub trait HomomorphicOperations {
    /// Enc(m1) * Enc(m2) = Enc(m1 + m2)
    fn homomorphic_add(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Result<Ciphertext>;

    /// Enc(m) * g^k = Enc(m + k), without fresh randomness
    fn homomorphic_add_plaintext(&self, ct: &Ciphertext, k: &BigUint) -> Result<Ciphertext>;

    /// Enc(m)^k = Enc(k * m)
    fn homomorphic_scalar_mul(&self, ct: &Ciphertext, k: &BigUint) -> Result<Ciphertext>;

    /// Enc(m)^-1 = Enc(-m mod n)
    fn homomorphic_negate(&self, ct: &Ciphertext) -> Result<Ciphertext>;

    /// Enc(a) * Enc(b)^-1 = Enc(a - b mod n)
    fn homomorphic_subtract(&self, ct_a: &Ciphertext, ct_b: &Ciphertext) -> Result<Ciphertext>;

    /// Fold a non-empty list of ciphertexts with `homomorphic_add`
    fn homomorphic_batch_add(&self, ciphertexts: &[Ciphertext]) -> Result<Ciphertext>;

    /// Enc(sum of a_i * m_i)
    fn homomorphic_linear_combination(
        &self,
        ciphertexts: &[Ciphertext],
        coefficients: &[BigUint],
    ) -> Result<Ciphertext>;
}

impl HomomorphicOperations for Paillier {
    fn homomorphic_add(&self, ct1: &Ciphertext, ct2: &Ciphertext) -> Result<Ciphertext> {
        homomorphic_add(ct1, ct2, &self.public_key.n_squared)
    }

    fn homomorphic_add_plaintext(&self, ct: &Ciphertext, k: &BigUint) -> Result<Ciphertext> {
        self.check_ciphertext(ct)?;
        if !self.public_key.is_valid_plaintext(k) {
            return Err(PaillierError::InvalidPlaintext);
        }

        let pk = &self.public_key;
        let g_k = mod_exp(&pk.g, k, &pk.n_squared);
        Ok(Ciphertext::new((&ct.value * g_k) % &pk.n_squared))
    }

    fn homomorphic_scalar_mul(&self, ct: &Ciphertext, k: &BigUint) -> Result<Ciphertext> {
        self.check_ciphertext(ct)?;
        Ok(Ciphertext::new(mod_exp(
            &ct.value,
            k,
            &self.public_key.n_squared,
        )))
    }

    fn homomorphic_negate(&self, ct: &Ciphertext) -> Result<Ciphertext> {
        self.check_ciphertext(ct)?;
        let inverse = mod_inverse(&ct.value, &self.public_key.n_squared)
            .ok_or(PaillierError::InvalidCiphertext)?;
        Ok(Ciphertext::new(inverse))
    }

    fn homomorphic_subtract(&self, ct_a: &Ciphertext, ct_b: &Ciphertext) -> Result<Ciphertext> {
        // a - b = a + (-b)
        let ct_b_neg = self.homomorphic_negate(ct_b)?;
        self.homomorphic_add(ct_a, &ct_b_neg)
    }

    fn homomorphic_batch_add(&self, ciphertexts: &[Ciphertext]) -> Result<Ciphertext> {
        let (first, rest) = ciphertexts
            .split_first()
            .ok_or(PaillierError::EmptyAggregate)?;
        self.check_ciphertext(first)?;

        rest.iter()
            .try_fold(first.clone(), |acc, ct| self.homomorphic_add(&acc, ct))
    }

    fn homomorphic_linear_combination(
        &self,
        ciphertexts: &[Ciphertext],
        coefficients: &[BigUint],
    ) -> Result<Ciphertext> {
        if ciphertexts.len() != coefficients.len() {
            return Err(PaillierError::InvalidConfig(format!(
                "length mismatch: {} ciphertexts, {} coefficients",
                ciphertexts.len(),
                coefficients.len()
            )));
        }

        let terms = ciphertexts
            .iter()
            .zip(coefficients)
            .map(|(ct, coeff)| self.homomorphic_scalar_mul(ct, coeff))
            .collect::<Result<Vec<_>>>()?;

        self.homomorphic_batch_add(&terms)
    }
}
