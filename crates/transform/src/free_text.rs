use crate::{with_collision_retry, TransformCtx, TransformError};
use maskvault_fakedata::{draw, Corpus};

/// Replaces each whitespace-separated token: a leading-capital token draws
/// from the last-name corpus (treated as a possible proper noun), anything
/// else draws from the length-bucketed free-text corpus (spec §4.7). This
/// is the catch-all transformer and never fails to parse.
pub fn transform(ctx: &TransformCtx, value: &str) -> Result<String, TransformError> {
    with_collision_retry(ctx, value, |attempt| {
        let out: Vec<String> = value
            .split_whitespace()
            .map(|tok| {
                let keyed = format!("{tok}:{attempt}");
                if tok.chars().next().is_some_and(char::is_uppercase) {
                    draw(Corpus::LastName, ctx.corpora, ctx.column_key, &keyed).to_string()
                } else {
                    let bucket = Corpus::free_text_for_len(tok.len());
                    draw(bucket, ctx.corpora, ctx.column_key, &keyed).to_string()
                }
            })
            .collect();
        Ok(out.join(" "))
    })
}
