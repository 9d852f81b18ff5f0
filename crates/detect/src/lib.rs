//! Column type detection: given a sample of non-null cells from a column,
//! decides which [`DataType`] (and associated parameters) the column holds
//! (spec §4.6). Detection is a pure function of the sample and is cached
//! per column by the coordinator via [`DetectorCache`].

use std::collections::HashMap;
use std::sync::RwLock;

use regex::Regex;
use std::sync::LazyLock;

/// The closed set of column types this core can recognize and anonymize
/// (spec §9 design note: a tagged enum, not open-ended dynamic dispatch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Uuid,
    Email,
    Phone,
    CreditCard,
    Iban,
    Date,
    NumericId,
    Domain,
    Name,
    Address,
    FreeText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    Ymd,
    Dmy,
    Mdy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTemplate {
    pub order: DateOrder,
    pub separator: char,
}

/// Auxiliary detection output needed by a transformer beyond the bare
/// [`DataType`] (spec §4.6: "format template for dates, separator and
/// country code for phones").
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorParams {
    None,
    Date { template: DateTemplate },
    Phone { leading_plus: bool },
}

#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub data_type: DataType,
    pub confidence: f64,
    pub params: DetectorParams,
}

/// Minimum fraction of a sample that must match a candidate rule for that
/// rule to win the column (spec §4.6 names 80% explicitly for credit card
/// and IBAN; the same bar is applied uniformly to every prefilter rule).
const ACCEPT_THRESHOLD: f64 = 0.8;

static UUID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap());
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
static IBAN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z]{2}\d{2}[A-Z0-9]{10,30}$").unwrap());
static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9.-]+\.[a-z]{2,}$").unwrap());

const STOPWORDS: &[&str] = &[
    "the", "and", "of", "in", "on", "at", "for", "to", "a", "an", "or", "is", "are", "was", "were", "it",
];

const STREET_TYPES: &[&str] = &[
    "st", "street", "ave", "avenue", "rd", "road", "blvd", "boulevard", "ln", "lane", "dr", "drive", "ct",
    "court", "pl", "place", "way", "terrace", "circle", "trail", "pkwy", "parkway", "hwy", "highway",
];

const DATE_TEMPLATES: &[DateTemplate] = &[
    DateTemplate { order: DateOrder::Ymd, separator: '-' },
    DateTemplate { order: DateOrder::Ymd, separator: '/' },
    DateTemplate { order: DateOrder::Ymd, separator: '.' },
    DateTemplate { order: DateOrder::Dmy, separator: '/' },
    DateTemplate { order: DateOrder::Dmy, separator: '-' },
    DateTemplate { order: DateOrder::Dmy, separator: '.' },
    DateTemplate { order: DateOrder::Mdy, separator: '/' },
    DateTemplate { order: DateOrder::Mdy, separator: '-' },
    DateTemplate { order: DateOrder::Mdy, separator: '.' },
];

fn fraction_matching(samples: &[&str], mut pred: impl FnMut(&str) -> bool) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let hits = samples.iter().filter(|s| pred(s)).count();
    hits as f64 / samples.len() as f64
}

fn strip_punctuation(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace() && *c != '-' && *c != '(' && *c != ')').collect()
}

fn is_phone_like(s: &str) -> bool {
    let stripped = strip_punctuation(s);
    let digits: &str = stripped.strip_prefix('+').unwrap_or(&stripped);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    (7..=15).contains(&digits.len())
}

fn is_credit_card_like(s: &str) -> bool {
    let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    if !(13..=19).contains(&digits.len()) {
        return false;
    }
    maskvault_format::checksum::luhn_is_valid(digits.as_bytes())
}

fn is_iban_like(s: &str) -> bool {
    let upper = s.to_uppercase();
    IBAN_RE.is_match(&upper) && maskvault_format::checksum::iso7064_iban_is_valid(&upper)
}

fn is_numeric_id_like(s: &str) -> bool {
    (3..=20).contains(&s.len()) && !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn parse_date(s: &str, template: &DateTemplate) -> bool {
    let parts: Vec<&str> = s.split(template.separator).collect();
    if parts.len() != 3 {
        return false;
    }
    let Ok(a) = parts[0].parse::<i32>() else { return false };
    let Ok(b) = parts[1].parse::<u32>() else { return false };
    let Ok(c) = parts[2].parse::<u32>() else { return false };

    let (y, m, d) = match template.order {
        DateOrder::Ymd => (a, b, c),
        DateOrder::Dmy => (c, b, a as u32),
        DateOrder::Mdy => (c, a as u32, b),
    };
    chrono::NaiveDate::from_ymd_opt(y, m, d).is_some()
}

fn detect_date(samples: &[&str]) -> Option<DetectionResult> {
    let mut best: Option<(DateTemplate, usize)> = None;
    for template in DATE_TEMPLATES {
        let hits = samples.iter().filter(|s| parse_date(s, template)).count();
        if best.is_none_or(|(_, best_hits)| hits > best_hits) {
            best = Some((*template, hits));
        }
    }
    let (template, hits) = best?;
    if samples.is_empty() {
        return None;
    }
    let confidence = hits as f64 / samples.len() as f64;
    if confidence >= ACCEPT_THRESHOLD {
        Some(DetectionResult { data_type: DataType::Date, confidence, params: DetectorParams::Date { template } })
    } else {
        None
    }
}

fn is_name_token(tok: &str) -> bool {
    if !(2..=20).contains(&tok.len()) {
        return false;
    }
    if !tok.chars().all(|c| c.is_alphabetic()) {
        return false;
    }
    if STOPWORDS.contains(&tok.to_lowercase().as_str()) {
        return false;
    }
    let mut chars = tok.chars();
    let Some(first) = chars.next() else { return false };
    first.is_uppercase() && chars.all(|c| c.is_lowercase())
}

fn is_name_like(s: &str) -> bool {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    (1..=4).contains(&tokens.len()) && tokens.iter().all(|t| is_name_token(t))
}

fn detect_name(column_name: &str, samples: &[&str]) -> Option<DetectionResult> {
    let fraction = fraction_matching(samples, is_name_like);
    if fraction < ACCEPT_THRESHOLD {
        return None;
    }
    let column_boost = if Regex::new(r"(?i)name|user|customer|employee|person").unwrap().is_match(column_name) {
        0.2
    } else {
        0.0
    };
    Some(DetectionResult {
        data_type: DataType::Name,
        confidence: (fraction + column_boost).min(1.0),
        params: DetectorParams::None,
    })
}

fn is_address_like(s: &str) -> bool {
    let lower = s.to_lowercase();
    let has_street_type = STREET_TYPES.iter().any(|t| lower.split(|c: char| !c.is_alphanumeric()).any(|tok| tok == *t));
    let has_digits = s.chars().any(|c| c.is_ascii_digit());
    has_street_type && has_digits
}

fn detect_address(samples: &[&str]) -> Option<DetectionResult> {
    let fraction = fraction_matching(samples, is_address_like);
    if fraction >= 0.3 {
        Some(DetectionResult { data_type: DataType::Address, confidence: fraction, params: DetectorParams::None })
    } else {
        None
    }
}

/// Runs the full detection pipeline over `samples` (spec §4.6: regex
/// prefilter in priority order, then name heuristic, then address
/// heuristic, then free-text fallback). `samples` should already be capped
/// at 1000 non-null cells by the caller.
#[must_use]
pub fn detect(column_name: &str, samples: &[&str]) -> DetectionResult {
    if samples.is_empty() {
        return DetectionResult { data_type: DataType::FreeText, confidence: 1.0, params: DetectorParams::None };
    }

    let uuid_fraction = fraction_matching(samples, |s| UUID_RE.is_match(s));
    if uuid_fraction >= ACCEPT_THRESHOLD {
        return DetectionResult { data_type: DataType::Uuid, confidence: uuid_fraction, params: DetectorParams::None };
    }

    let email_fraction = fraction_matching(samples, |s| EMAIL_RE.is_match(s));
    if email_fraction >= ACCEPT_THRESHOLD {
        return DetectionResult { data_type: DataType::Email, confidence: email_fraction, params: DetectorParams::None };
    }

    let phone_fraction = fraction_matching(samples, is_phone_like);
    if phone_fraction >= ACCEPT_THRESHOLD {
        let leading_plus = samples.iter().filter(|s| s.trim_start().starts_with('+')).count() * 2 >= samples.len();
        return DetectionResult {
            data_type: DataType::Phone,
            confidence: phone_fraction,
            params: DetectorParams::Phone { leading_plus },
        };
    }

    let cc_fraction = fraction_matching(samples, is_credit_card_like);
    if cc_fraction >= ACCEPT_THRESHOLD {
        return DetectionResult { data_type: DataType::CreditCard, confidence: cc_fraction, params: DetectorParams::None };
    }

    let iban_fraction = fraction_matching(samples, is_iban_like);
    if iban_fraction >= ACCEPT_THRESHOLD {
        return DetectionResult { data_type: DataType::Iban, confidence: iban_fraction, params: DetectorParams::None };
    }

    if let Some(result) = detect_date(samples) {
        return result;
    }

    let numeric_fraction = fraction_matching(samples, is_numeric_id_like);
    if numeric_fraction >= ACCEPT_THRESHOLD {
        return DetectionResult { data_type: DataType::NumericId, confidence: numeric_fraction, params: DetectorParams::None };
    }

    let domain_fraction = fraction_matching(samples, |s| DOMAIN_RE.is_match(&s.to_lowercase()));
    if domain_fraction >= ACCEPT_THRESHOLD {
        return DetectionResult { data_type: DataType::Domain, confidence: domain_fraction, params: DetectorParams::None };
    }

    if let Some(result) = detect_name(column_name, samples) {
        return result;
    }

    if let Some(result) = detect_address(samples) {
        return result;
    }

    DetectionResult { data_type: DataType::FreeText, confidence: 1.0, params: DetectorParams::None }
}

/// Memoizes [`detect`] results per column for the lifetime of a run (spec
/// §4.6: "detector decisions do not change mid-column").
#[derive(Default)]
pub struct DetectorCache {
    cache: RwLock<HashMap<String, DetectionResult>>,
}

impl DetectorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached result for `column`, computing and storing it via
    /// `sample` on first use.
    pub fn get_or_detect(&self, column: &str, sample: impl FnOnce() -> Vec<String>) -> DetectionResult {
        if let Some(cached) = self.cache.read().expect("detector cache poisoned").get(column) {
            return cached.clone();
        }
        let owned_sample = sample();
        let refs: Vec<&str> = owned_sample.iter().map(String::as_str).collect();
        let result = detect(column, &refs);
        self.cache.write().expect("detector cache poisoned").insert(column.to_string(), result.clone());
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_uuid_column() {
        let samples = vec!["550e8400-e29b-41d4-a716-446655440000", "6fa459ea-ee8a-3ca4-894e-db77e160355e"];
        let result = detect("id", &samples);
        assert_eq!(result.data_type, DataType::Uuid);
    }

    #[test]
    fn detects_email_column() {
        let samples = vec!["john@example.com", "jane.doe@corp.test"];
        let result = detect("contact", &samples);
        assert_eq!(result.data_type, DataType::Email);
    }

    #[test]
    fn detects_phone_column() {
        let samples = vec!["+1-555-123-4567", "+44 20 7946 0958"];
        let result = detect("phone_number", &samples);
        assert_eq!(result.data_type, DataType::Phone);
    }

    #[test]
    fn detects_credit_card_column() {
        let samples = vec!["4539148803436467", "4916591699064740"];
        let result = detect("card", &samples);
        assert_eq!(result.data_type, DataType::CreditCard);
    }

    #[test]
    fn detects_iban_column() {
        let samples = vec!["GB29NWBK60161331926819", "GB29NWBK60161331926819"];
        let result = detect("iban", &samples);
        assert_eq!(result.data_type, DataType::Iban);
    }

    #[test]
    fn detects_iso_date_column() {
        let samples = vec!["2020-02-29", "1999-12-31", "2024-01-15"];
        let result = detect("signup_date", &samples);
        assert_eq!(result.data_type, DataType::Date);
        assert!(matches!(result.params, DetectorParams::Date { template } if template.separator == '-'));
    }

    #[test]
    fn detects_numeric_id_column() {
        let samples = vec!["00123", "00456", "00789"];
        let result = detect("legacy_id", &samples);
        assert_eq!(result.data_type, DataType::NumericId);
    }

    #[test]
    fn detects_domain_column() {
        let samples = vec!["example.com", "corp.test"];
        let result = detect("website", &samples);
        assert_eq!(result.data_type, DataType::Domain);
    }

    #[test]
    fn detects_name_column_with_column_name_boost() {
        let samples = vec!["John Smith", "Jane Doe", "Alice Brown"];
        let result = detect("customer_name", &samples);
        assert_eq!(result.data_type, DataType::Name);
        assert!(result.confidence > 0.9);
    }

    #[test]
    fn detects_address_column() {
        let samples = vec!["123 Main St", "456 Oak Avenue", "789 Elm Road"];
        let result = detect("mailing_address", &samples);
        assert_eq!(result.data_type, DataType::Address);
    }

    #[test]
    fn falls_back_to_free_text() {
        let samples = vec!["lorem ipsum dolor sit amet", "the quick brown fox"];
        let result = detect("notes", &samples);
        assert_eq!(result.data_type, DataType::FreeText);
    }

    #[test]
    fn detector_cache_only_computes_once() {
        let cache = DetectorCache::new();
        let calls = std::cell::Cell::new(0);
        let sample = || {
            calls.set(calls.get() + 1);
            vec!["john@example.com".to_string()]
        };
        let a = cache.get_or_detect("email", sample);
        let b = cache.get_or_detect("email", || {
            calls.set(calls.get() + 1);
            vec!["john@example.com".to_string()]
        });
        assert_eq!(a.data_type, b.data_type);
        assert_eq!(calls.get(), 1);
    }
}
