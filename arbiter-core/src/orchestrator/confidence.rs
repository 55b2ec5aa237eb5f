//! Heuristic confidence scoring for raw provider answers
//!
//! Deterministic by construction: the score depends only on the content and
//! the provider's success rate at scoring time.

use regex::Regex;
use std::sync::LazyLock;

const BASE: f64 = 0.7;
const LENGTH_BONUS: f64 = 0.1;
const LENGTH_THRESHOLD_CHARS: usize = 100;
const HEDGING_PENALTY: f64 = 0.05;
const UNCERTAINTY_PENALTY: f64 = 0.15;

pub const MIN_CONFIDENCE: f64 = 0.1;
pub const MAX_CONFIDENCE: f64 = 1.0;

static HEDGING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(however|although|but)\b").expect("hedging pattern is valid")
});

static UNCERTAINTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(not sure|uncertain|might)\b").expect("uncertainty pattern is valid")
});

/// Score `content` from a provider with the given success rate.
///
/// Starts at 0.7, +0.1 for content longer than 100 characters, -0.05 for
/// hedging connectives, -0.15 for explicit uncertainty, then scales by
/// `0.5 + 0.5 * success_rate` and clamps to [0.1, 1.0].
pub fn estimate_confidence(content: &str, provider_success_rate: f64) -> f64 {
    let mut score = BASE;
    if content.chars().count() > LENGTH_THRESHOLD_CHARS {
        score += LENGTH_BONUS;
    }
    if HEDGING.is_match(content) {
        score -= HEDGING_PENALTY;
    }
    if UNCERTAINTY.is_match(content) {
        score -= UNCERTAINTY_PENALTY;
    }

    let success_rate = if provider_success_rate.is_finite() {
        provider_success_rate.clamp(0.0, 1.0)
    } else {
        0.0
    };
    (score * (0.5 + 0.5 * success_rate)).clamp(MIN_CONFIDENCE, MAX_CONFIDENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_base_score_with_perfect_provider() {
        assert!(approx(estimate_confidence("Spending rose 4%.", 1.0), 0.7));
    }

    #[test]
    fn test_length_bonus() {
        let long = "a".repeat(101);
        assert!(approx(estimate_confidence(&long, 1.0), 0.8));
        let exact = "a".repeat(100);
        assert!(approx(estimate_confidence(&exact, 1.0), 0.7));
    }

    #[test]
    fn test_penalties_stack() {
        assert!(approx(estimate_confidence("Yes, however it varies.", 1.0), 0.65));
        assert!(approx(estimate_confidence("It might rise.", 1.0), 0.55));
        assert!(approx(
            estimate_confidence("I'm not sure, but it might.", 1.0),
            0.5
        ));
    }

    #[test]
    fn test_whole_word_matching() {
        // "butter" and "mighty" are not hedging or uncertainty words
        assert!(approx(estimate_confidence("Mighty butter prices.", 1.0), 0.7));
    }

    #[test]
    fn test_success_rate_scaling_and_floor() {
        assert!(approx(estimate_confidence("ok", 0.0), 0.35));
        assert!(approx(estimate_confidence("ok", 0.5), 0.525));
        assert!(estimate_confidence("it might, but uncertain", f64::NAN) >= MIN_CONFIDENCE);
    }
}
