use crate::{with_collision_retry, TransformCtx, TransformError};
use maskvault_fakedata::Corpora;

/// `HMAC(master_key, "domain:" || value || ":" || attempt) -> index into
/// the fake-domain corpus` (spec §4.7). TLD is preserved when it already
/// appears in the bundled TLD corpus and `preserve_tld` is set.
pub(crate) fn derive(master_key: &[u8; 32], corpora: &Corpora, domain: &str, attempt: u8, preserve_tld: bool) -> String {
    let tag = maskvault_keys::hmac_sha256(master_key, format!("domain:{domain}:{attempt}").as_bytes())
        .expect("hmac key length is fixed at 32 bytes");
    let base_idx = (u64::from_be_bytes(tag[0..8].try_into().unwrap()) as usize) % corpora.fake_domain_bases.len();
    let base = &corpora.fake_domain_bases[base_idx];

    let original_tld = domain.rsplit('.').next().unwrap_or("");
    let tld = if preserve_tld && corpora.fake_tlds.iter().any(|t| t == original_tld) {
        original_tld.to_string()
    } else {
        let tld_idx = (u64::from_be_bytes(tag[8..16].try_into().unwrap()) as usize) % corpora.fake_tlds.len();
        corpora.fake_tlds[tld_idx].clone()
    };
    format!("{base}.{tld}")
}

pub fn transform(ctx: &TransformCtx, value: &str) -> Result<String, TransformError> {
    with_collision_retry(ctx, value, |attempt| Ok(derive(ctx.master_key, ctx.corpora, value, attempt, true)))
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;

    #[test]
    fn domain_is_deterministic_and_tld_preserved_when_known() {
        let h = Harness::new("domain_basic");
        let key = h.schedule.column_key("site").unwrap();
        let ctx = h.ctx("site", &key);
        let a = super::transform(&ctx, "example.com").unwrap();
        let b = super::transform(&ctx, "example.com").unwrap();
        assert_eq!(a, b);
        assert!(a.ends_with(".com"));
    }
}
