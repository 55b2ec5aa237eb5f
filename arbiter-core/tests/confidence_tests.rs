//! Confidence heuristic and consensus vote properties

use arbiter_core::orchestrator::confidence::{MAX_CONFIDENCE, MIN_CONFIDENCE};
use arbiter_core::orchestrator::{estimate_confidence, vote, VoteSettings};
use arbiter_core::Response;
use proptest::prelude::*;

fn response(provider: &str, confidence: f64) -> Response {
    Response {
        content: format!("{} says hello", provider),
        provider_id: provider.to_string(),
        model: "m".to_string(),
        confidence,
        latency_ms: 50,
        tokens_used: None,
    }
}

#[test]
fn test_reference_vote_examples() {
    let close = vec![response("a", 0.81), response("b", 0.85), response("c", 0.83)];
    let result = vote(close, |_| 1.0, VoteSettings::default()).unwrap();
    assert!(result.consensus_achieved);
    assert!((result.confidence - 0.83).abs() < 1e-9);

    let apart = vec![response("a", 0.95), response("b", 0.40)];
    let result = vote(apart, |_| 1.0, VoteSettings::default()).unwrap();
    assert!(!result.consensus_achieved);
    assert_eq!(result.confidence, 0.95);
}

#[test]
fn test_spread_at_threshold_is_not_consensus() {
    let result = vote(
        vec![response("a", 0.75), response("b", 0.5)],
        |_| 1.0,
        VoteSettings {
            agreement_spread: 0.25,
            ..VoteSettings::default()
        },
    )
    .unwrap();
    assert!(!result.consensus_achieved);
}

proptest! {
    #[test]
    fn prop_confidence_bounded_and_deterministic(content in ".{0,300}", rate in 0.0f64..=1.0) {
        let first = estimate_confidence(&content, rate);
        let second = estimate_confidence(&content, rate);
        prop_assert_eq!(first.to_bits(), second.to_bits());
        prop_assert!((MIN_CONFIDENCE..=MAX_CONFIDENCE).contains(&first));
    }

    #[test]
    fn prop_confidence_monotone_in_success_rate(content in "[a-z ]{0,200}", low in 0.0f64..=1.0, high in 0.0f64..=1.0) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        prop_assert!(estimate_confidence(&content, low) <= estimate_confidence(&content, high));
    }

    #[test]
    fn prop_vote_ignores_input_order(confidences in prop::collection::vec(0.1f64..=1.0, 1..6)) {
        let responses: Vec<Response> = confidences
            .iter()
            .enumerate()
            .map(|(i, c)| response(&format!("p{}", i), *c))
            .collect();
        let mut reversed = responses.clone();
        reversed.reverse();

        let forward = vote(responses, |_| 1.0, VoteSettings::default()).unwrap();
        let backward = vote(reversed, |_| 1.0, VoteSettings::default()).unwrap();
        prop_assert_eq!(forward.selected_provider_id, backward.selected_provider_id);
        prop_assert_eq!(forward.consensus_achieved, backward.consensus_achieved);
        prop_assert_eq!(forward.confidence.to_bits(), backward.confidence.to_bits());
    }
}
