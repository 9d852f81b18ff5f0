use crate::{tokenize_with_seps, with_collision_retry, TransformCtx, TransformError};
use maskvault_fakedata::{draw, Corpus};
use maskvault_format::{apply_case_style, case_style_of};

/// Splits local-part and domain, draws a fake local part token-by-token from
/// the first-name corpus (preserving `.`/`_` separators and per-token case),
/// and derives the domain via [`crate::domain::derive`] (spec §4.7).
pub fn transform(ctx: &TransformCtx, value: &str) -> Result<String, TransformError> {
    let (local, domain) =
        value.split_once('@').ok_or_else(|| TransformError::FormatUnparseable(format!("{value:?} has no '@'")))?;

    with_collision_retry(ctx, value, |attempt| {
        let anon_local = transform_local(ctx, local, attempt);
        let anon_domain = super::domain::derive(ctx.master_key, ctx.corpora, domain, attempt, ctx.preserve_domains);
        Ok(format!("{anon_local}@{anon_domain}"))
    })
}

fn transform_local(ctx: &TransformCtx, local: &str, attempt: u8) -> String {
    tokenize_with_seps(local, &['.', '_'])
        .into_iter()
        .map(|(tok, sep)| {
            let style = case_style_of(&tok);
            let replacement = draw(Corpus::FirstName, ctx.corpora, ctx.column_key, &format!("{tok}:{attempt}"));
            let cased = apply_case_style(replacement, style);
            match sep {
                Some(c) => format!("{cased}{c}"),
                None => cased,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;

    #[test]
    fn email_preserves_shape_and_is_deterministic() {
        let h = Harness::new("email_basic");
        let key = h.schedule.column_key("contact").unwrap();
        let ctx = h.ctx("contact", &key);

        let a = super::transform(&ctx, "john.smith@example.com").unwrap();
        let b = super::transform(&ctx, "john.smith@example.com").unwrap();
        assert_eq!(a, b);
        assert!(a.contains('@'));
        assert!(a.contains('.'));
    }

    #[test]
    fn email_rejects_value_without_at_sign() {
        let h = Harness::new("email_bad");
        let key = h.schedule.column_key("contact").unwrap();
        let ctx = h.ctx("contact", &key);
        assert!(super::transform(&ctx, "not-an-email").is_err());
    }
}
