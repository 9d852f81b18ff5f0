use crate::{fpe_reshape_digits, with_collision_retry, TransformCtx, TransformError};

/// FPE-reshapes the digit run(s) of an opaque numeric identifier, keeping
/// leading zeros (no nonzero-leading constraint, unlike phone numbers) and
/// any surrounding non-digit characters in place (spec §4.7).
pub fn transform(ctx: &TransformCtx, value: &str) -> Result<String, TransformError> {
    let tweak_base = format!("{}:numeric_id", ctx.column).into_bytes();
    with_collision_retry(ctx, value, |attempt| fpe_reshape_digits(ctx.column_key, &tweak_base, attempt, value))
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;

    #[test]
    fn numeric_id_preserves_length_and_leading_zeros() {
        let h = Harness::new("numeric_id_basic");
        let key = h.schedule.column_key("legacy_id").unwrap();
        let ctx = h.ctx("legacy_id", &key);

        let out = super::transform(&ctx, "00123").unwrap();
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn numeric_id_is_deterministic() {
        let h = Harness::new("numeric_id_det");
        let key = h.schedule.column_key("legacy_id").unwrap();
        let ctx = h.ctx("legacy_id", &key);
        let a = super::transform(&ctx, "00456").unwrap();
        let b = super::transform(&ctx, "00456").unwrap();
        assert_eq!(a, b);
    }
}
