use crate::{with_collision_retry, TransformCtx, TransformError};
use maskvault_fpe::Alphabet as FpeAlphabet;

/// FPE-encrypts the hex digits of a UUID as a single block under the
/// lowercase-hex alphabet, preserving dash positions and per-character case
/// (spec §4.7).
pub fn transform(ctx: &TransformCtx, value: &str) -> Result<String, TransformError> {
    let tweak_base = format!("{}:uuid", ctx.column).into_bytes();
    with_collision_retry(ctx, value, |attempt| {
        let lower = value.to_lowercase();
        let hex_str: String = lower.chars().filter(char::is_ascii_hexdigit).collect();
        if hex_str.is_empty() {
            return Ok(value.to_string());
        }

        let alphabet = FpeAlphabet::hex_lower();
        let block = alphabet.encode(&hex_str).map_err(TransformError::Fpe)?;
        let mut tweak = tweak_base.clone();
        tweak.push(attempt);
        let ct = maskvault_fpe::fpe_encrypt(ctx.column_key, &tweak, &alphabet, &block);
        let new_hex: Vec<char> = alphabet.decode(&ct).chars().collect();

        let mut hex_iter = new_hex.into_iter();
        let mut out = String::with_capacity(value.len());
        for c in value.chars() {
            if c.is_ascii_hexdigit() {
                let nc = hex_iter.next().expect("hex digit count must match the decoded block");
                out.push(if c.is_ascii_uppercase() { nc.to_ascii_uppercase() } else { nc });
            } else {
                out.push(c);
            }
        }
        Ok(out)
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;

    #[test]
    fn uuid_preserves_dashes_and_length() {
        let h = Harness::new("uuid_basic");
        let key = h.schedule.column_key("id").unwrap();
        let ctx = h.ctx("id", &key);

        let out = super::transform(&ctx, "550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(out.len(), "550e8400-e29b-41d4-a716-446655440000".len());
        assert_eq!(out.matches('-').count(), 4);
    }

    #[test]
    fn uuid_preserves_uppercase() {
        let h = Harness::new("uuid_upper");
        let key = h.schedule.column_key("id").unwrap();
        let ctx = h.ctx("id", &key);

        let out = super::transform(&ctx, "550E8400-E29B-41D4-A716-446655440000").unwrap();
        assert!(out.chars().filter(char::is_ascii_hexdigit).all(|c| c.is_ascii_uppercase()));
    }
}
