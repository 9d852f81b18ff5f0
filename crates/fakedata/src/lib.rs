//! Static fake-data corpora and the deterministic draw function used by the
//! `fake` anonymization mode (spec §4.5). Draws are a pure function of the
//! per-column key and the original value — no randomness, no I/O.

mod corpus;

pub use corpus::Corpora;

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Which bundled word list a column is mapped against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corpus {
    FirstName,
    LastName,
    StreetType,
    CityName,
    FakeTld,
    FakeDomainBase,
    FreeTextShort,
    FreeTextMedium,
    FreeTextLong,
}

impl Corpus {
    /// Stable name folded into the HMAC input so that the same original
    /// value draws independently from different corpora (spec §4.5).
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::StreetType => "street_type",
            Self::CityName => "city_name",
            Self::FakeTld => "fake_tld",
            Self::FakeDomainBase => "fake_domain_base",
            Self::FreeTextShort => "free_text_short",
            Self::FreeTextMedium => "free_text_medium",
            Self::FreeTextLong => "free_text_long",
        }
    }

    fn words<'a>(self, corpora: &'a Corpora) -> &'a [String] {
        match self {
            Self::FirstName => &corpora.first_names,
            Self::LastName => &corpora.last_names,
            Self::StreetType => &corpora.street_types,
            Self::CityName => &corpora.city_names,
            Self::FakeTld => &corpora.fake_tlds,
            Self::FakeDomainBase => &corpora.fake_domain_bases,
            Self::FreeTextShort => &corpora.free_text_short,
            Self::FreeTextMedium => &corpora.free_text_medium,
            Self::FreeTextLong => &corpora.free_text_long,
        }
    }

    /// Buckets free text by length, per the short/medium/long split decided
    /// for the free-text transformer (≤4 / 5-8 / ≥9 characters).
    #[must_use]
    pub fn free_text_for_len(len: usize) -> Self {
        match len {
            0..=4 => Self::FreeTextShort,
            5..=8 => Self::FreeTextMedium,
            _ => Self::FreeTextLong,
        }
    }
}

/// `draw(corpus, column_key, original) = corpus[HMAC(column_key, corpus_name || 0x1f || original) mod len(corpus)]`
/// (spec §4.5). Deterministic: the same `(corpus, column_key, original)`
/// triple always yields the same word.
#[must_use]
pub fn draw<'a>(corpus: Corpus, corpora: &'a Corpora, column_key: &[u8], original: &str) -> &'a str {
    let words = corpus.words(corpora);
    debug_assert!(!words.is_empty(), "corpus must never be empty");

    let mut mac = <HmacSha256 as Mac>::new_from_slice(column_key).expect("HMAC accepts any key length");
    mac.update(corpus.name().as_bytes());
    mac.update(&[0x1f]);
    mac.update(original.as_bytes());
    let digest = mac.finalize().into_bytes();

    let mut buf = [0u8; 8];
    buf.copy_from_slice(&digest[0..8]);
    let raw = u64::from_be_bytes(buf);

    let idx = (raw % words.len() as u64) as usize;
    &words[idx]
}
