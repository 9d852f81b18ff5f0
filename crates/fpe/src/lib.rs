//! A Feistel-based format-preserving cipher over a configurable alphabet,
//! adequate for pseudonymization but not certified against NIST FF1/FF3
//! (spec §1 non-goals, §4.4).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Number of Feistel rounds. Ten rounds is the FF1-conventional choice for
/// unbalanced Feistel ciphers over small alphabets.
const ROUNDS: u8 = 10;

/// Maximum number of cycle-walking attempts before giving up (spec §4.4:
/// shared with the transformer-level collision retry bound).
pub const MAX_CYCLE_WALK_ATTEMPTS: u32 = 8;

#[derive(Debug, Error)]
pub enum FpeError {
    #[error("no value in the legal set was reached after {0} cycle-walking attempts")]
    ExhaustedDomain(u32),
    #[error("character {0:?} is not a member of the alphabet")]
    NotInAlphabet(char),
}

/// An ordered character set defining an FPE domain of radix `chars.len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    chars: Vec<char>,
}

impl Alphabet {
    #[must_use]
    pub fn new(chars: Vec<char>) -> Self {
        Self { chars }
    }

    #[must_use]
    pub fn digits() -> Self {
        Self::new("0123456789".chars().collect())
    }

    #[must_use]
    pub fn hex_lower() -> Self {
        Self::new("0123456789abcdef".chars().collect())
    }

    /// Digits + uppercase letters, the IBAN BBAN alphabet (spec §4.7).
    #[must_use]
    pub fn alphanumeric_upper() -> Self {
        Self::new("0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ".chars().collect())
    }

    #[must_use]
    pub fn radix(&self) -> usize {
        self.chars.len()
    }

    #[must_use]
    pub fn index_of(&self, c: char) -> Option<usize> {
        self.chars.iter().position(|&x| x == c)
    }

    #[must_use]
    pub fn char_at(&self, idx: usize) -> char {
        self.chars[idx]
    }

    /// Encodes a string into alphabet indices.
    pub fn encode(&self, s: &str) -> Result<Vec<usize>, FpeError> {
        s.chars().map(|c| self.index_of(c).ok_or(FpeError::NotInAlphabet(c))).collect()
    }

    #[must_use]
    pub fn decode(&self, block: &[usize]) -> String {
        block.iter().map(|&i| self.char_at(i)).collect()
    }
}

fn block_to_int(alphabet: &Alphabet, digits: &[usize]) -> u128 {
    let r = alphabet.radix() as u128;
    digits.iter().fold(0u128, |acc, &d| acc * r + d as u128)
}

fn int_to_block(alphabet: &Alphabet, mut value: u128, len: usize) -> Vec<usize> {
    let r = alphabet.radix() as u128;
    let mut out = vec![0usize; len];
    for slot in out.iter_mut().rev() {
        *slot = (value % r) as usize;
        value /= r;
    }
    out
}

fn pow_u128(base: u128, exp: usize) -> u128 {
    let mut result = 1u128;
    for _ in 0..exp {
        result = result.saturating_mul(base);
    }
    result
}

/// `PRF(K, T || round || side)` reduced modulo `radix^modulus_digits`.
fn prf_reduced(key: &[u8], tweak: &[u8], round: u8, alphabet: &Alphabet, side: &[usize], modulus_digits: usize) -> u128 {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(tweak);
    mac.update(&[round]);
    mac.update(alphabet.decode(side).as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut buf = [0u8; 16];
    buf.copy_from_slice(&digest[0..16]);
    let raw = u128::from_be_bytes(buf);

    let modulus = pow_u128(alphabet.radix() as u128, modulus_digits);
    if modulus == 0 { 0 } else { raw % modulus }
}

fn split(block: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let n = block.len();
    let u = n.div_ceil(2);
    (block[..u].to_vec(), block[u..].to_vec())
}

/// Encrypts `block` (a sequence of alphabet indices) in place of the
/// Feistel structure described in spec §4.4. Empty input is the identity.
#[must_use]
pub fn fpe_encrypt(key: &[u8], tweak: &[u8], alphabet: &Alphabet, block: &[usize]) -> Vec<usize> {
    if block.len() <= 1 {
        // A single symbol has no Feistel structure to shuffle; cycle-walking
        // at the transformer level handles collisions for these domains.
        return block.to_vec();
    }
    let (mut a, mut b) = split(block);

    for round in 0..ROUNDS {
        let m = a.len();
        let f = prf_reduced(key, tweak, round, alphabet, &b, m);
        let num_a = block_to_int(alphabet, &a);
        let modulus = pow_u128(alphabet.radix() as u128, m);
        let y = (num_a + f) % modulus;
        let c = int_to_block(alphabet, y, m);
        a = b;
        b = c;
    }

    let mut out = a;
    out.extend(b);
    out
}

/// Exact inverse of [`fpe_encrypt`] under the same key, tweak, and alphabet.
#[must_use]
pub fn fpe_decrypt(key: &[u8], tweak: &[u8], alphabet: &Alphabet, block: &[usize]) -> Vec<usize> {
    if block.len() <= 1 {
        return block.to_vec();
    }
    let (mut a, mut b) = split(block);

    for round in (0..ROUNDS).rev() {
        // Undo: forward had A_{i+1} = B_i, B_{i+1} = C = STR_m(y) with m = len(A_i).
        let m = b.len();
        let b_i = a.clone(); // B_i = A_{i+1}
        let f = prf_reduced(key, tweak, round, alphabet, &b_i, m);
        let y = block_to_int(alphabet, &b);
        let modulus = pow_u128(alphabet.radix() as u128, m);
        let num_a_i = (y + modulus - (f % modulus)) % modulus;
        let a_i = int_to_block(alphabet, num_a_i, m);
        a = a_i;
        b = b_i;
    }

    let mut out = a;
    out.extend(b);
    out
}

/// Repeatedly re-encrypts `block` with a retry-perturbed tweak until the
/// result satisfies `is_legal`, or gives up after
/// [`MAX_CYCLE_WALK_ATTEMPTS`] attempts (spec §4.4: used for constrained
/// domains such as "digit strings excluding a leading zero").
///
/// # Errors
/// Returns [`FpeError::ExhaustedDomain`] if no legal value is reached.
pub fn fpe_encrypt_cycle_walk(
    key: &[u8],
    tweak: &[u8],
    alphabet: &Alphabet,
    block: &[usize],
    is_legal: impl Fn(&[usize]) -> bool,
) -> Result<Vec<usize>, FpeError> {
    let mut perturbed_tweak = tweak.to_vec();
    for attempt in 0..MAX_CYCLE_WALK_ATTEMPTS {
        perturbed_tweak.truncate(tweak.len());
        perturbed_tweak.push(attempt as u8);
        let candidate = fpe_encrypt(key, &perturbed_tweak, alphabet, block);
        if is_legal(&candidate) {
            if attempt > 0 {
                tracing::debug!(attempt, "fpe cycle-walk found legal value");
            }
            return Ok(candidate);
        }
    }
    Err(FpeError::ExhaustedDomain(MAX_CYCLE_WALK_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> Vec<u8> {
        b"0123456789abcdef0123456789abcdef".to_vec()
    }

    #[test]
    fn digits_round_trip() {
        let alphabet = Alphabet::digits();
        let block = alphabet.encode("4539148803436467").unwrap();
        let ct = fpe_encrypt(&key(), b"col:cc", &alphabet, &block);
        let pt = fpe_decrypt(&key(), b"col:cc", &alphabet, &ct);
        assert_eq!(pt, block);
        assert_eq!(ct.len(), block.len());
    }

    #[test]
    fn hex_round_trip_preserves_length() {
        let alphabet = Alphabet::hex_lower();
        let block = alphabet.encode("e3b0c44298fc1c14").unwrap();
        let ct = fpe_encrypt(&key(), b"col:uuid", &alphabet, &block);
        let pt = fpe_decrypt(&key(), b"col:uuid", &alphabet, &ct);
        assert_eq!(pt, block);
        assert_eq!(ct.len(), block.len());
    }

    #[test]
    fn alphanumeric_round_trip() {
        let alphabet = Alphabet::alphanumeric_upper();
        let block = alphabet.encode("GB29NWBK60161331926819").unwrap();
        let ct = fpe_encrypt(&key(), b"col:iban", &alphabet, &block);
        let pt = fpe_decrypt(&key(), b"col:iban", &alphabet, &ct);
        assert_eq!(pt, block);
    }

    #[test]
    fn deterministic_for_same_key_and_tweak() {
        let alphabet = Alphabet::digits();
        let block = alphabet.encode("123456789").unwrap();
        let a = fpe_encrypt(&key(), b"col", &alphabet, &block);
        let b = fpe_encrypt(&key(), b"col", &alphabet, &block);
        assert_eq!(a, b);
    }

    #[test]
    fn different_tweak_changes_output() {
        let alphabet = Alphabet::digits();
        let block = alphabet.encode("123456789").unwrap();
        let a = fpe_encrypt(&key(), b"col-a", &alphabet, &block);
        let b = fpe_encrypt(&key(), b"col-b", &alphabet, &block);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_block_is_identity() {
        let alphabet = Alphabet::digits();
        let ct = fpe_encrypt(&key(), b"col", &alphabet, &[]);
        assert!(ct.is_empty());
    }

    #[test]
    fn single_symbol_block_is_identity_without_cycle_walk() {
        let alphabet = Alphabet::digits();
        let block = vec![7];
        let ct = fpe_encrypt(&key(), b"col", &alphabet, &block);
        assert_eq!(ct, block);
    }

    #[test]
    fn cycle_walk_finds_legal_nonzero_leading_digit() {
        let alphabet = Alphabet::digits();
        let block = alphabet.encode("0555512345").unwrap();
        let result = fpe_encrypt_cycle_walk(&key(), b"col:phone", &alphabet, &block, |c| c[0] != 0).unwrap();
        assert_ne!(result[0], 0);
    }

    #[test]
    fn cycle_walk_reports_exhausted_domain_when_never_legal() {
        let alphabet = Alphabet::digits();
        let block = alphabet.encode("1234").unwrap();
        let err = fpe_encrypt_cycle_walk(&key(), b"col", &alphabet, &block, |_| false).unwrap_err();
        assert!(matches!(err, FpeError::ExhaustedDomain(MAX_CYCLE_WALK_ATTEMPTS)));
    }
}
