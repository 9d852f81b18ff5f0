use crate::{with_collision_retry, TransformCtx, TransformError};
use maskvault_format::checksum::luhn_check_digit;
use maskvault_format::{decompose, recompose, Alphabet as FormatAlphabet, PayloadSegment};
use maskvault_fpe::Alphabet as FpeAlphabet;

/// FPE-encrypts every digit but the last (the Luhn check digit), cycle-
/// walking to keep the leading digit non-zero, then recomputes the check
/// digit over the new payload so the result still passes Luhn validation
/// (spec §4.7).
pub fn transform(ctx: &TransformCtx, value: &str) -> Result<String, TransformError> {
    let tweak_base = format!("{}:credit_card", ctx.column).into_bytes();
    with_collision_retry(ctx, value, |attempt| {
        let (shape, segments) = decompose(value);
        let digit_chars: Vec<char> =
            segments.iter().filter(|s| s.alphabet == FormatAlphabet::Digit).flat_map(|s| s.chars.clone()).collect();
        if digit_chars.len() < 2 {
            return Err(TransformError::FormatUnparseable(value.to_string()));
        }

        let payload_len = digit_chars.len() - 1;
        let payload: String = digit_chars[..payload_len].iter().collect();
        let alphabet = FpeAlphabet::digits();
        let block = alphabet.encode(&payload).map_err(TransformError::Fpe)?;
        let mut tweak = tweak_base.clone();
        tweak.push(attempt);
        let ct = maskvault_fpe::fpe_encrypt_cycle_walk(ctx.column_key, &tweak, &alphabet, &block, |c| c[0] != 0)?;

        let mut new_digits: Vec<u8> = alphabet.decode(&ct).into_bytes();
        let check = luhn_check_digit(&new_digits);
        new_digits.push(check);
        let new_digit_chars: Vec<char> = new_digits.iter().map(|&b| b as char).collect();

        let mut cursor = 0usize;
        let mut new_segments = Vec::with_capacity(segments.len());
        for seg in segments {
            if seg.alphabet == FormatAlphabet::Digit {
                let len = seg.chars.len();
                new_segments.push(PayloadSegment { alphabet: seg.alphabet, chars: new_digit_chars[cursor..cursor + len].to_vec() });
                cursor += len;
            } else {
                new_segments.push(seg);
            }
        }
        Ok(recompose(&shape, &new_segments))
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;
    use maskvault_format::checksum::luhn_is_valid;

    #[test]
    fn credit_card_output_passes_luhn() {
        let h = Harness::new("cc_basic");
        let key = h.schedule.column_key("card").unwrap();
        let ctx = h.ctx("card", &key);

        let out = super::transform(&ctx, "4539148803436467").unwrap();
        assert_eq!(out.len(), 16);
        let digits: Vec<u8> = out.bytes().collect();
        assert!(luhn_is_valid(&digits));
    }

    #[test]
    fn credit_card_preserves_grouping() {
        let h = Harness::new("cc_grouped");
        let key = h.schedule.column_key("card").unwrap();
        let ctx = h.ctx("card", &key);

        let out = super::transform(&ctx, "4539 1488 0343 6467").unwrap();
        assert_eq!(out.matches(' ').count(), 3);
        assert_eq!(out.len(), "4539 1488 0343 6467".len());
    }

    #[test]
    fn credit_card_never_starts_with_zero() {
        let h = Harness::new("cc_nonzero_leading");
        let key = h.schedule.column_key("card").unwrap();
        let ctx = h.ctx("card", &key);

        for value in ["4539148803436467", "4916591699064740", "4024007198726394"] {
            let out = super::transform(&ctx, value).unwrap();
            assert_ne!(out.chars().next(), Some('0'));
        }
    }
}
