//! Decomposes a string into a position-by-position shape (the "format
//! signature") plus the runs of same-class characters that carry the
//! actual payload, and recomposes a shape plus fresh payload back into a
//! string. This is the shared notion of "format-preserving" that every
//! transformer in `maskvault-transform` is checked against.

pub mod checksum;

use serde::{Deserialize, Serialize};

/// The alphabet a payload run is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alphabet {
    Upper,
    Lower,
    Digit,
}

impl Alphabet {
    #[must_use]
    pub const fn size(self) -> usize {
        match self {
            Self::Upper | Self::Lower => 26,
            Self::Digit => 10,
        }
    }

    /// Maps a rank `0..size()` to the corresponding character.
    ///
    /// # Panics
    /// Panics if `rank >= self.size()`; callers are expected to reduce
    /// modulo `size()` before calling this.
    #[must_use]
    pub fn char_at(self, rank: usize) -> char {
        assert!(rank < self.size(), "rank out of range for alphabet");
        match self {
            Self::Upper => (b'A' + rank as u8) as char,
            Self::Lower => (b'a' + rank as u8) as char,
            Self::Digit => (b'0' + rank as u8) as char,
        }
    }

    #[must_use]
    pub fn rank_of(self, c: char) -> Option<usize> {
        match (self, c) {
            (Self::Upper, 'A'..='Z') => Some(c as usize - 'A' as usize),
            (Self::Lower, 'a'..='z') => Some(c as usize - 'a' as usize),
            (Self::Digit, '0'..='9') => Some(c as usize - '0' as usize),
            _ => None,
        }
    }

    fn classify(c: char) -> Option<Self> {
        if c.is_ascii_uppercase() {
            Some(Self::Upper)
        } else if c.is_ascii_lowercase() {
            Some(Self::Lower)
        } else if c.is_ascii_digit() {
            Some(Self::Digit)
        } else {
            None
        }
    }
}

/// One element of a string's shape: either a run of same-alphabet
/// characters (a payload segment, identified only by alphabet + length) or
/// a single non-alphanumeric codepoint preserved literally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slot {
    Payload { alphabet: Alphabet, len: usize },
    /// Any whitespace codepoint; whitespace positions match each other
    /// without requiring the exact same character (spec §3).
    Whitespace,
    /// A specific punctuation codepoint that must reappear identically.
    Literal(char),
}

/// The position-by-position class mask of a string (spec §3's "format
/// signature"). Two strings are format-equivalent iff their `Shape`s are
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub slots: Vec<Slot>,
}

impl Shape {
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.slots
            .iter()
            .map(|s| match s {
                Slot::Payload { len, .. } => *len,
                _ => 0,
            })
            .sum()
    }
}

/// A contiguous run of same-alphabet payload characters extracted during
/// `decompose`, in left-to-right order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadSegment {
    pub alphabet: Alphabet,
    pub chars: Vec<char>,
}

/// Splits `s` into its shape and payload segments.
#[must_use]
pub fn decompose(s: &str) -> (Shape, Vec<PayloadSegment>) {
    let mut slots = Vec::new();
    let mut segments = Vec::new();

    let mut run: Option<(Alphabet, Vec<char>)> = None;
    let flush = |run: &mut Option<(Alphabet, Vec<char>)>, slots: &mut Vec<Slot>, segments: &mut Vec<PayloadSegment>| {
        if let Some((alphabet, chars)) = run.take() {
            slots.push(Slot::Payload { alphabet, len: chars.len() });
            segments.push(PayloadSegment { alphabet, chars });
        }
    };

    for c in s.chars() {
        match Alphabet::classify(c) {
            Some(alphabet) => match &mut run {
                Some((cur_alphabet, chars)) if *cur_alphabet == alphabet => chars.push(c),
                _ => {
                    flush(&mut run, &mut slots, &mut segments);
                    run = Some((alphabet, vec![c]));
                }
            },
            None => {
                flush(&mut run, &mut slots, &mut segments);
                if c.is_whitespace() {
                    slots.push(Slot::Whitespace);
                } else {
                    slots.push(Slot::Literal(c));
                }
            }
        }
    }
    flush(&mut run, &mut slots, &mut segments);

    (Shape { slots }, segments)
}

/// The format signature of `s`, i.e. its shape with payload content erased.
#[must_use]
pub fn format_signature(s: &str) -> Shape {
    decompose(s).0
}

/// Rebuilds a string from a shape and a matching list of payload segments.
/// `segments` must appear in the same left-to-right order and with the same
/// lengths as the `Slot::Payload` entries in `shape`; mismatches panic since
/// this is always an internal-contract violation, never a function of
/// untrusted input (both `shape` and `segments` originate from this
/// process's own `decompose`/transformer logic).
///
/// # Panics
/// Panics if `segments` does not line up with `shape`'s payload slots.
#[must_use]
pub fn recompose(shape: &Shape, segments: &[PayloadSegment]) -> String {
    let mut out = String::new();
    let mut seg_iter = segments.iter();
    for slot in &shape.slots {
        match slot {
            Slot::Payload { len, .. } => {
                let seg = seg_iter.next().expect("recompose: missing payload segment");
                assert_eq!(seg.chars.len(), *len, "recompose: payload segment length mismatch");
                out.extend(seg.chars.iter());
            }
            Slot::Whitespace => out.push(' '),
            Slot::Literal(c) => out.push(*c),
        }
    }
    out
}

/// Capitalization style of a single alphabetic token, used by the name and
/// free-text transformers to reproduce the original's casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseStyle {
    /// First letter uppercase, rest lowercase: "Smith".
    Title,
    /// Every letter uppercase: "SMITH".
    AllCaps,
    /// Every letter lowercase: "smith".
    AllLower,
    /// Anything else: "sMiTh".
    Mixed,
}

#[must_use]
pub fn case_style_of(word: &str) -> CaseStyle {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return CaseStyle::Mixed;
    }
    if letters.iter().all(|c| c.is_uppercase()) {
        CaseStyle::AllCaps
    } else if letters.iter().all(|c| c.is_lowercase()) {
        CaseStyle::AllLower
    } else if letters[0].is_uppercase() && letters[1..].iter().all(|c| c.is_lowercase()) {
        CaseStyle::Title
    } else {
        CaseStyle::Mixed
    }
}

/// Applies `style` to `word`, leaving non-alphabetic characters untouched.
#[must_use]
pub fn apply_case_style(word: &str, style: CaseStyle) -> String {
    match style {
        CaseStyle::AllCaps => word.to_uppercase(),
        CaseStyle::AllLower => word.to_lowercase(),
        CaseStyle::Title => {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
                None => String::new(),
            }
        }
        CaseStyle::Mixed => word.to_string(),
    }
}
