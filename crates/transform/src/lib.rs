//! Shape-preserving transformers (spec §4.7). Each transformer receives a
//! `TransformCtx` (the column's key material, the vault, and the bundled
//! corpora) plus the original value and detector params, and returns an
//! anonymized value of the identical format-signature.
//!
//! Every transformer that calls into FPE runs under the collision-retry
//! loop described in spec §4.4: if the candidate already reverse-maps to a
//! *different* original, the attempt is repeated with a perturbed tweak, up
//! to [`maskvault_fpe::MAX_CYCLE_WALK_ATTEMPTS`] times.

mod address;
mod credit_card;
mod date;
mod domain;
mod email;
mod free_text;
mod iban;
mod name;
mod numeric_id;
mod phone;
mod uuid;

use maskvault_detect::{DataType, DetectorParams};
use maskvault_fakedata::Corpora;
use maskvault_fpe::{Alphabet as FpeAlphabet, FpeError};
use maskvault_format::{decompose, recompose, Alphabet as FormatAlphabet, PayloadSegment};
use maskvault_vault::{Vault, VaultError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("no collision-free value found after {0} attempts")]
    ExhaustedDomain(u32),
    #[error("value could not be parsed under the expected format: {0}")]
    FormatUnparseable(String),
    #[error(transparent)]
    Vault(#[from] VaultError),
    #[error(transparent)]
    Fpe(#[from] FpeError),
}

/// Everything a transformer needs besides the cell value itself.
pub struct TransformCtx<'a> {
    pub column: &'a str,
    pub column_key: &'a [u8; 32],
    pub master_key: &'a [u8; 32],
    pub vault: &'a Vault,
    pub corpora: &'a Corpora,
    pub preserve_domains: bool,
}

const MAX_ATTEMPTS: u8 = maskvault_fpe::MAX_CYCLE_WALK_ATTEMPTS as u8;

/// Runs `candidate_fn` with increasing attempt counters until it produces a
/// value that either has no existing reverse mapping, or already reverse-maps
/// to `original` (idempotent replay of a previous run). Gives up with
/// [`TransformError::ExhaustedDomain`] after [`MAX_ATTEMPTS`] tries.
fn with_collision_retry(
    ctx: &TransformCtx,
    original: &str,
    mut candidate_fn: impl FnMut(u8) -> Result<String, TransformError>,
) -> Result<String, TransformError> {
    for attempt in 0..MAX_ATTEMPTS {
        let candidate = candidate_fn(attempt)?;
        match ctx.vault.get_reverse(ctx.column, &candidate)? {
            None => return Ok(candidate),
            Some(existing) if existing == original => return Ok(candidate),
            Some(_) => {
                tracing::debug!(column = ctx.column, attempt, "transform candidate collided, retrying");
            }
        }
    }
    Err(TransformError::ExhaustedDomain(u32::from(MAX_ATTEMPTS)))
}

/// Splits `s` on any of `seps`, returning each token paired with the
/// separator that followed it (`None` for the final token). Used by the
/// email and free-text transformers to reassemble tokenized values exactly.
fn tokenize_with_seps(s: &str, seps: &[char]) -> Vec<(String, Option<char>)> {
    let mut out = Vec::new();
    let mut cur = String::new();
    for c in s.chars() {
        if seps.contains(&c) {
            out.push((std::mem::take(&mut cur), Some(c)));
        } else {
            cur.push(c);
        }
    }
    out.push((cur, None));
    out
}

/// FPE-encrypts every `Digit` payload segment of `value` as a single
/// concatenated block (preserving each segment's length and every
/// non-digit character in place, leading zeros included). Used by the
/// numeric-id transformer, which reduces to "reshape the digits, keep
/// everything else" with no internal group structure to respect (unlike
/// phone numbers, which carve off a leading country code and enforce a
/// non-zero leading digit per group).
fn fpe_reshape_digits(column_key: &[u8; 32], tweak_base: &[u8], attempt: u8, value: &str) -> Result<String, TransformError> {
    let (shape, segments) = decompose(value);
    let digit_chars: Vec<char> =
        segments.iter().filter(|s| s.alphabet == FormatAlphabet::Digit).flat_map(|s| s.chars.clone()).collect();
    if digit_chars.is_empty() {
        return Ok(value.to_string());
    }
    let digit_str: String = digit_chars.into_iter().collect();
    let alphabet = FpeAlphabet::digits();
    let block = alphabet.encode(&digit_str).map_err(TransformError::Fpe)?;

    let mut tweak = tweak_base.to_vec();
    tweak.push(attempt);

    let ct = maskvault_fpe::fpe_encrypt(column_key, &tweak, &alphabet, &block);
    let new_digits: Vec<char> = alphabet.decode(&ct).chars().collect();

    let mut cursor = 0usize;
    let mut new_segments = Vec::with_capacity(segments.len());
    for seg in segments {
        if seg.alphabet == FormatAlphabet::Digit {
            let len = seg.chars.len();
            new_segments.push(PayloadSegment { alphabet: seg.alphabet, chars: new_digits[cursor..cursor + len].to_vec() });
            cursor += len;
        } else {
            new_segments.push(seg);
        }
    }
    Ok(recompose(&shape, &new_segments))
}

/// Dispatches `value` to the transformer matching `data_type` (spec §4.7 /
/// §4.8 step 5).
///
/// # Errors
/// Propagates [`TransformError::ExhaustedDomain`] if collision-retry is
/// exhausted, [`TransformError::FormatUnparseable`] if `value` does not
/// match the shape the detector expected, and any vault I/O failure.
pub fn transform(ctx: &TransformCtx, value: &str, data_type: DataType, params: &DetectorParams) -> Result<String, TransformError> {
    match data_type {
        DataType::Email => email::transform(ctx, value),
        DataType::Phone => phone::transform(ctx, value, params),
        DataType::Name => name::transform(ctx, value),
        DataType::Uuid => uuid::transform(ctx, value),
        DataType::Date => date::transform(ctx, value, params),
        DataType::NumericId => numeric_id::transform(ctx, value),
        DataType::CreditCard => credit_card::transform(ctx, value),
        DataType::Iban => iban::transform(ctx, value),
        DataType::Address => address::transform(ctx, value),
        DataType::Domain => domain::transform(ctx, value),
        DataType::FreeText => free_text::transform(ctx, value),
    }
}
