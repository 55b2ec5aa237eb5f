//! Weighted consensus vote over ensemble responses
//!
//! Each response scores `confidence * provider_weight`; the best score wins.
//! Agreement is measured by confidence spread, not by comparing the text.
//! The vote is a pure function of the response set: input order never
//! changes the outcome.

use crate::protocol::types::{truncate_chars, EnsembleResult, Response, VoteResult};
use std::cmp::Ordering;

/// Spread of confidences below which providers are considered in agreement
pub const DEFAULT_AGREEMENT_SPREAD: f64 = 0.2;

/// Vote tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoteSettings {
    pub agreement_spread: f64,
    /// Characters kept in each vote preview
    pub preview_chars: usize,
}

impl Default for VoteSettings {
    fn default() -> Self {
        Self {
            agreement_spread: DEFAULT_AGREEMENT_SPREAD,
            preview_chars: 100,
        }
    }
}

/// Pick a winner among `responses`; `None` when there is nothing to vote on.
///
/// `weight_of` maps a provider id to its voting weight.
pub fn vote<W>(responses: Vec<Response>, weight_of: W, settings: VoteSettings) -> Option<EnsembleResult>
where
    W: Fn(&str) -> f64,
{
    if responses.is_empty() {
        return None;
    }

    let voting_results: Vec<VoteResult> = responses
        .iter()
        .map(|r| VoteResult {
            provider_id: r.provider_id.clone(),
            vote_preview: truncate_chars(&r.content, settings.preview_chars),
            confidence: r.confidence,
        })
        .collect();

    if responses.len() == 1 {
        let winner = &responses[0];
        return Some(EnsembleResult {
            content: winner.content.clone(),
            consensus_achieved: false,
            confidence: winner.confidence,
            selected_provider_id: winner.provider_id.clone(),
            voting_results,
            responses,
        });
    }

    let winner = responses
        .iter()
        .map(|r| (r, r.confidence * weight_of(&r.provider_id)))
        .max_by(|(a, score_a), (b, score_b)| {
            score_a
                .partial_cmp(score_b)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.confidence.partial_cmp(&b.confidence).unwrap_or(Ordering::Equal))
                // Lower id wins remaining ties
                .then_with(|| b.provider_id.cmp(&a.provider_id))
        })
        .map(|(r, _)| r)?;

    // Sorted so the mean is bit-identical for any input order
    let mut confidences: Vec<f64> = responses.iter().map(|r| r.confidence).collect();
    confidences.sort_by(f64::total_cmp);
    let spread = confidences[confidences.len() - 1] - confidences[0];
    let consensus_achieved = spread < settings.agreement_spread;
    let confidence = if consensus_achieved {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    } else {
        winner.confidence
    };

    Some(EnsembleResult {
        content: winner.content.clone(),
        consensus_achieved,
        confidence,
        selected_provider_id: winner.provider_id.clone(),
        voting_results,
        responses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(provider: &str, confidence: f64) -> Response {
        Response {
            content: format!("answer from {}", provider),
            provider_id: provider.to_string(),
            model: "m".to_string(),
            confidence,
            latency_ms: 100,
            tokens_used: None,
        }
    }

    #[test]
    fn test_empty_set_has_no_result() {
        assert!(vote(Vec::new(), |_| 1.0, VoteSettings::default()).is_none());
    }

    #[test]
    fn test_single_response_wins_without_consensus() {
        let result = vote(vec![response("a", 0.9)], |_| 1.0, VoteSettings::default()).unwrap();
        assert!(!result.consensus_achieved);
        assert_eq!(result.selected_provider_id, "a");
        assert_eq!(result.confidence, 0.9);
        assert_eq!(result.voting_results.len(), 1);
    }

    #[test]
    fn test_close_confidences_reach_consensus_with_mean() {
        let responses = vec![response("a", 0.81), response("b", 0.85), response("c", 0.83)];
        let result = vote(responses, |_| 1.0, VoteSettings::default()).unwrap();

        assert!(result.consensus_achieved);
        assert!((result.confidence - 0.83).abs() < 1e-9);
        assert_eq!(result.selected_provider_id, "b");
        assert_eq!(result.responses.len(), 3);
    }

    #[test]
    fn test_wide_spread_uses_winner_confidence() {
        let responses = vec![response("a", 0.95), response("b", 0.40)];
        let result = vote(responses, |_| 1.0, VoteSettings::default()).unwrap();

        assert!(!result.consensus_achieved);
        assert_eq!(result.confidence, 0.95);
        assert_eq!(result.selected_provider_id, "a");
    }

    #[test]
    fn test_weight_can_overturn_confidence() {
        let responses = vec![response("slow", 0.9), response("fast", 0.8)];
        let weight = |id: &str| if id == "slow" { 0.25 } else { 1.0 };
        let result = vote(responses, weight, VoteSettings::default()).unwrap();

        assert_eq!(result.selected_provider_id, "fast");
        assert_eq!(result.content, "answer from fast");
        // Spread 0.1 < 0.2: mean is reported even though the weighted winner differs
        assert!(result.consensus_achieved);
        assert!((result.confidence - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_order_independent() {
        let forward = vec![response("a", 0.7), response("b", 0.7), response("c", 0.6)];
        let mut reversed = forward.clone();
        reversed.reverse();

        let first = vote(forward, |_| 1.0, VoteSettings::default()).unwrap();
        let second = vote(reversed, |_| 1.0, VoteSettings::default()).unwrap();
        assert_eq!(first.selected_provider_id, second.selected_provider_id);
        assert_eq!(first.selected_provider_id, "a");
        assert_eq!(first.confidence, second.confidence);
    }
}
