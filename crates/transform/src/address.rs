use crate::{with_collision_retry, TransformCtx, TransformError};
use maskvault_fakedata::{draw, Corpus};
use maskvault_format::{apply_case_style, case_style_of, decompose, Alphabet as FormatAlphabet, Slot};
use maskvault_fpe::Alphabet as FpeAlphabet;

const STREET_TYPE_TOKENS: &[&str] = &[
    "st", "street", "ave", "avenue", "rd", "road", "blvd", "boulevard", "ln", "lane", "dr", "drive", "ct", "court",
    "pl", "place", "way", "terrace", "circle", "trail", "pkwy", "parkway", "hwy", "highway",
];

/// Walks the address's shape slot-by-slot: digit runs (street numbers,
/// postcodes) are FPE-reshaped exact-length, recognized street-type tokens
/// are preserved verbatim, and every other alphabetic run is replaced with a
/// corpus draw (case-preserved, length not constrained). Literal and
/// whitespace slots — including commas — pass through untouched, which is
/// what keeps the number of comma-separated fields identical (spec §4.7).
pub fn transform(ctx: &TransformCtx, value: &str) -> Result<String, TransformError> {
    let tweak_base = format!("{}:address", ctx.column).into_bytes();
    with_collision_retry(ctx, value, |attempt| {
        let (shape, segments) = decompose(value);
        let mut tweak = tweak_base.clone();
        tweak.push(attempt);
        let digit_alphabet = FpeAlphabet::digits();

        let mut seg_iter = segments.into_iter();
        let mut out = String::new();
        for slot in &shape.slots {
            match slot {
                Slot::Payload { alphabet: FormatAlphabet::Digit, .. } => {
                    let seg = seg_iter.next().expect("shape/segment count must line up");
                    let s: String = seg.chars.iter().collect();
                    let block = digit_alphabet.encode(&s).map_err(TransformError::Fpe)?;
                    let ct = maskvault_fpe::fpe_encrypt(ctx.column_key, &tweak, &digit_alphabet, &block);
                    out.push_str(&digit_alphabet.decode(&ct));
                }
                Slot::Payload { .. } => {
                    let seg = seg_iter.next().expect("shape/segment count must line up");
                    let word: String = seg.chars.iter().collect();
                    if STREET_TYPE_TOKENS.contains(&word.to_lowercase().as_str()) {
                        out.push_str(&word);
                    } else {
                        let style = case_style_of(&word);
                        let replacement =
                            draw(Corpus::CityName, ctx.corpora, ctx.column_key, &format!("{word}:{attempt}"));
                        out.push_str(&apply_case_style(replacement, style));
                    }
                }
                Slot::Whitespace => out.push(' '),
                Slot::Literal(c) => out.push(*c),
            }
        }
        Ok(out)
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;

    #[test]
    fn address_preserves_field_count_and_street_type() {
        let h = Harness::new("address_basic");
        let key = h.schedule.column_key("mailing_address").unwrap();
        let ctx = h.ctx("mailing_address", &key);

        let out = super::transform(&ctx, "123 Main St, Springfield").unwrap();
        assert_eq!(out.matches(',').count(), 1);
        assert!(out.contains("St"));
    }

    #[test]
    fn address_is_deterministic() {
        let h = Harness::new("address_det");
        let key = h.schedule.column_key("mailing_address").unwrap();
        let ctx = h.ctx("mailing_address", &key);
        let a = super::transform(&ctx, "456 Oak Avenue").unwrap();
        let b = super::transform(&ctx, "456 Oak Avenue").unwrap();
        assert_eq!(a, b);
    }
}
