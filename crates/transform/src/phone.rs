use crate::{with_collision_retry, TransformCtx, TransformError};
use maskvault_detect::DetectorParams;
use maskvault_format::{decompose, recompose, Alphabet as FormatAlphabet, PayloadSegment};
use maskvault_fpe::Alphabet as FpeAlphabet;

/// FPE-reshapes the national-number digits, preserves every punctuation
/// character (`+`, `-`, spaces, parentheses) in place, and forces the
/// leading digit of *each* digit group non-zero via cycle-walking. When the
/// detector found a leading `+country` code, that digit group is carved off
/// and left untouched rather than folded into the FPE block, so e.g.
/// `+61-421-555-829` still starts with `+61-` (spec §4.7).
pub fn transform(ctx: &TransformCtx, value: &str, params: &DetectorParams) -> Result<String, TransformError> {
    let leading_plus = matches!(params, DetectorParams::Phone { leading_plus: true });
    let tweak_base = format!("{}:phone", ctx.column).into_bytes();

    with_collision_retry(ctx, value, |attempt| {
        let (shape, segments) = decompose(value);
        let digit_segment_lens: Vec<usize> =
            segments.iter().filter(|s| s.alphabet == FormatAlphabet::Digit).map(|s| s.chars.len()).collect();
        if digit_segment_lens.is_empty() {
            return Err(TransformError::FormatUnparseable(value.to_string()));
        }

        let (country_len, national_lens): (usize, &[usize]) = if leading_plus {
            (digit_segment_lens[0], &digit_segment_lens[1..])
        } else {
            (0, &digit_segment_lens[..])
        };
        if national_lens.is_empty() {
            return Ok(value.to_string());
        }

        let digit_chars: Vec<char> =
            segments.iter().filter(|s| s.alphabet == FormatAlphabet::Digit).flat_map(|s| s.chars.clone()).collect();
        let national_digits: String = digit_chars[country_len..].iter().collect();

        let alphabet = FpeAlphabet::digits();
        let block = alphabet.encode(&national_digits).map_err(TransformError::Fpe)?;
        let mut tweak = tweak_base.clone();
        tweak.push(attempt);

        let group_starts = segment_starts(national_lens);
        let ct = maskvault_fpe::fpe_encrypt_cycle_walk(ctx.column_key, &tweak, &alphabet, &block, |c| {
            group_starts.iter().all(|&start| c[start] != 0)
        })?;
        let new_national: Vec<char> = alphabet.decode(&ct).chars().collect();

        let mut new_digits = digit_chars[..country_len].to_vec();
        new_digits.extend(new_national);

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
    })
}

/// Cumulative start offset of each digit group within the concatenated
/// national-number block, used to enforce a non-zero leading digit per
/// group rather than only at the very start of the block.
fn segment_starts(lens: &[usize]) -> Vec<usize> {
    let mut acc = 0;
    let mut out = Vec::with_capacity(lens.len());
    for &len in lens {
        out.push(acc);
        acc += len;
    }
    out
}
