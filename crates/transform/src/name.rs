use crate::{with_collision_retry, TransformCtx, TransformError};
use maskvault_fakedata::{draw, Corpus};
use maskvault_format::{apply_case_style, case_style_of};

/// Draws a replacement per whitespace-separated token: first token from the
/// first-name corpus, last token from the last-name corpus (when more than
/// one token is present), any middle tokens also from the first-name
/// corpus. Hyphens inside a token are treated as an internal segment break
/// so compound names ("Smith-Jones") stay compound (spec §4.7).
pub fn transform(ctx: &TransformCtx, value: &str) -> Result<String, TransformError> {
    with_collision_retry(ctx, value, |attempt| {
        let tokens: Vec<&str> = value.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(TransformError::FormatUnparseable(value.to_string()));
        }
        let n = tokens.len();
        let rendered: Vec<String> = tokens
            .iter()
            .enumerate()
            .map(|(i, tok)| {
                let corpus = if n > 1 && i == n - 1 { Corpus::LastName } else { Corpus::FirstName };
                render_token(ctx, corpus, tok, attempt)
            })
            .collect();
        Ok(rendered.join(" "))
    })
}

fn render_token(ctx: &TransformCtx, corpus: Corpus, tok: &str, attempt: u8) -> String {
    tok.split('-')
        .map(|part| {
            let style = case_style_of(part);
            let replacement = draw(corpus, ctx.corpora, ctx.column_key, &format!("{part}:{attempt}"));
            apply_case_style(replacement, style)
        })
        .collect::<Vec<_>>()
        .join("-")
}
