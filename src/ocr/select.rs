//! Candidate Validator & Selector.
//!
//! Cleans raw OCR outputs, filters them by shape and picks one winner.
//! The length bands below were tuned against real captcha samples; they are
//! kept as named constants so they can be recalibrated in one place.

use regex::Regex;
use std::sync::LazyLock;

/// Shape accepted by the primary filter.
pub const PRIMARY_PATTERN: &str = r"^[A-Za-z0-9]{2,10}$";
/// Shape accepted when nothing passes the primary filter.
pub const LENIENT_PATTERN: &str = r"^[A-Za-z0-9]{1,15}$";
/// Preferred cleaned-text length band, inclusive.
pub const PREFERRED_LENGTH: std::ops::RangeInclusive<usize> = 3..=8;

static PRIMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PRIMARY_PATTERN).expect("valid primary pattern"));
static LENIENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LENIENT_PATTERN).expect("valid lenient pattern"));

/// One OCR output together with its cleaned form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OcrCandidate {
    pub strategy: String,
    pub raw_text: String,
    pub cleaned_text: String,
}

impl OcrCandidate {
    pub fn new(strategy: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        Self {
            strategy: strategy.into(),
            cleaned_text: clean(&raw_text),
            raw_text,
        }
    }
}

/// The winning text and the strategy that produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recognition {
    pub text: String,
    pub strategy: String,
}

/// Drops every character outside `[A-Za-z0-9]`.
pub fn clean(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_alphanumeric()).collect()
}

/// Picks the winner among `(strategy, raw_text)` pairs given in catalogue order.
pub fn select<S, T>(candidates: &[(S, T)]) -> Option<Recognition>
where
    S: AsRef<str>,
    T: AsRef<str>,
{
    let cleaned: Vec<OcrCandidate> = candidates
        .iter()
        .map(|(strategy, raw)| OcrCandidate::new(strategy.as_ref(), raw.as_ref()))
        .collect();
    select_cleaned(&cleaned)
}

pub fn select_cleaned(candidates: &[OcrCandidate]) -> Option<Recognition> {
    let mut survivors: Vec<&OcrCandidate> = candidates
        .iter()
        .filter(|c| PRIMARY.is_match(&c.cleaned_text))
        .collect();
    if survivors.is_empty() {
        survivors = candidates
            .iter()
            .filter(|c| LENIENT.is_match(&c.cleaned_text))
            .collect();
    }

    let preferred: Vec<&OcrCandidate> = survivors
        .iter()
        .copied()
        .filter(|c| PREFERRED_LENGTH.contains(&c.cleaned_text.len()))
        .collect();
    let pool = if preferred.is_empty() { survivors } else { preferred };

    // Longest wins; strict comparison keeps the earliest on ties
    let mut best: Option<&OcrCandidate> = None;
    for candidate in pool {
        if best.is_none_or(|b| candidate.cleaned_text.len() > b.cleaned_text.len()) {
            best = Some(candidate);
        }
    }

    best.map(|c| Recognition {
        text: c.cleaned_text.clone(),
        strategy: c.strategy.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recognition(text: &str, strategy: &str) -> Option<Recognition> {
        Some(Recognition {
            text: text.to_string(),
            strategy: strategy.to_string(),
        })
    }

    #[test]
    fn test_first_on_tie() {
        let candidates = [("Otsu", "ab12"), ("Blur", "a!b12"), ("Edge", "")];
        assert_eq!(select(&candidates), recognition("ab12", "Otsu"));
    }

    #[test]
    fn test_nothing_valid() {
        let candidates = [("A", ""), ("B", "!!!")];
        assert_eq!(select(&candidates), None);
    }

    #[test]
    fn test_lenient_fallback() {
        let candidates = [("A", "x"), ("B", "")];
        assert_eq!(select(&candidates), recognition("x", "A"));
    }

    #[test]
    fn test_longest_preferred_wins() {
        let candidates = [("a", "abc"), ("b", "abcdefg"), ("c", "abcde")];
        assert_eq!(select(&candidates), recognition("abcdefg", "b"));
    }

    #[test]
    fn test_preferred_band_beats_longer() {
        // 10 chars passes the primary filter but sits outside 3..=8
        let candidates = [("long", "abcdefghij"), ("short", "ab"), ("mid", "abcd")];
        assert_eq!(select(&candidates), recognition("abcd", "mid"));
    }

    #[test]
    fn test_outside_band_falls_back_to_longest() {
        let candidates = [("two", "ab"), ("ten", "abcdefghij"), ("nine", "abcdefghi")];
        assert_eq!(select(&candidates), recognition("abcdefghij", "ten"));
    }

    #[test]
    fn test_lenient_accepts_long_text() {
        let candidates = [("a", "abcdefghijklmno"), ("b", "abcdefghijklmnop")];
        assert_eq!(select(&candidates), recognition("abcdefghijklmno", "a"));
    }

    #[test]
    fn test_non_ascii_letters_dropped() {
        assert_eq!(clean("äbc12"), "bc12");

        let candidates = [("a", "äbc12")];
        let result = select(&candidates).unwrap();
        assert_eq!(result.text, "bc12");
        assert_eq!(result.strategy, "a");
    }

    #[test]
    fn test_deterministic() {
        let candidates = [("a", "xy 12"), ("b", "Q7-7q"), ("c", "zz"), ("d", "??")];
        let first = select(&candidates);
        for _ in 0..10 {
            assert_eq!(select(&candidates), first);
        }
    }

    #[test]
    fn test_clean_idempotent() {
        for raw in ["a!b 12", "", "  ", "X-Y_Z", "abc123", "ünï-cödé"] {
            let once = clean(raw);
            assert_eq!(clean(&once), once);
        }
        assert_eq!(clean("a!b 1_2\n"), "ab12");
    }

    #[test]
    fn test_never_leaves_preferred_band() {
        let pool = ["a", "ab", "abc", "abcd1234", "abcdefghi", "abcdefghijkl", "!!", "ab cd ef"];
        // Every ordered pair and triple drawn from the pool
        for a in pool {
            for b in pool {
                for c in pool {
                    let candidates = [("s1", a), ("s2", b), ("s3", c)];
                    let any_in_band = candidates.iter().any(|(_, t)| {
                        let cleaned = clean(t);
                        PREFERRED_LENGTH.contains(&cleaned.len()) && PRIMARY.is_match(&cleaned)
                    });
                    if any_in_band {
                        let winner = select(&candidates).unwrap();
                        assert!(PREFERRED_LENGTH.contains(&winner.text.len()), "{:?}", candidates);
                    }
                }
            }
        }
    }
}
