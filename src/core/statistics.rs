use std::time::Duration;

use crate::core::orchestrator::RunSummary;
use crate::core::ranking::RankedMatches;
use crate::models::MatchStatistics;

/// Score at or above which a match counts as high quality
pub const HIGH_QUALITY_THRESHOLD: f64 = 0.8;
/// Run confidence when any semantic result is present
pub const SEMANTIC_CONFIDENCE: f64 = 0.85;
/// Run confidence when every result came from the fallback scorer
pub const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Summarize a ranked run
///
/// `total_analyzed` and `average_score` cover the qualified results before
/// truncation; `high_quality_count` covers only the returned matches.
pub fn aggregate(ranked: &RankedMatches, run: &RunSummary, elapsed: Duration) -> MatchStatistics {
    let high_quality_count = ranked
        .matches
        .iter()
        .filter(|m| m.match_score >= HIGH_QUALITY_THRESHOLD)
        .count();

    let ai_confidence = if ranked.qualified_count == 0 {
        0.0
    } else if run.semantic_results > 0 {
        SEMANTIC_CONFIDENCE
    } else {
        FALLBACK_CONFIDENCE
    };

    MatchStatistics {
        total_analyzed: ranked.qualified_count,
        high_quality_count,
        average_score: round_to(ranked.qualified_average, 3),
        processing_seconds: round_to(elapsed.as_secs_f64(), 3),
        ai_confidence,
        fallback_mode: run.fallback_mode(),
        cancelled: run.cancelled,
    }
}

#[inline]
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::orchestrator::ScoringMode;
    use crate::core::ranking::assemble;
    use crate::models::{CandidateRecord, ScoreResult, ScoringMethod};

    fn result(id: &str, score: f64, method: ScoringMethod) -> ScoreResult {
        let candidate = CandidateRecord::new(id, "Idea").unwrap();
        ScoreResult::new(&candidate, score, vec![], None, method)
    }

    fn summary(semantic_results: usize, mode: ScoringMode) -> RunSummary {
        RunSummary {
            mode,
            attempted: semantic_results,
            primary_failures: 0,
            semantic_results,
            cancelled: false,
        }
    }

    #[test]
    fn test_high_quality_counts_returned_matches_only() {
        let results = vec![
            result("a", 0.95, ScoringMethod::Semantic),
            result("b", 0.9, ScoringMethod::Semantic),
            result("c", 0.85, ScoringMethod::Semantic),
            result("d", 0.7, ScoringMethod::Semantic),
        ];
        let ranked = assemble(results, 0.6, 2);

        let stats = aggregate(&ranked, &summary(4, ScoringMode::AiPreferred), Duration::from_millis(1500));

        assert_eq!(stats.total_analyzed, 4);
        assert_eq!(stats.high_quality_count, 2);
        assert_eq!(stats.average_score, 0.85);
        assert_eq!(stats.processing_seconds, 1.5);
        assert_eq!(stats.ai_confidence, SEMANTIC_CONFIDENCE);
        assert!(!stats.fallback_mode);
    }

    #[test]
    fn test_empty_run_has_zero_confidence() {
        let ranked = assemble(vec![result("a", 0.5, ScoringMethod::Semantic)], 0.9, 10);

        let stats = aggregate(&ranked, &summary(1, ScoringMode::AiPreferred), Duration::ZERO);

        assert_eq!(stats.total_analyzed, 0);
        assert_eq!(stats.high_quality_count, 0);
        assert_eq!(stats.average_score, 0.0);
        assert_eq!(stats.ai_confidence, 0.0);
    }

    #[test]
    fn test_fallback_run_confidence() {
        let ranked = assemble(vec![result("a", 0.7, ScoringMethod::Fallback)], 0.6, 10);

        let stats = aggregate(&ranked, &summary(0, ScoringMode::FallbackOnly), Duration::ZERO);

        assert_eq!(stats.ai_confidence, FALLBACK_CONFIDENCE);
        assert!(stats.fallback_mode);
    }
}
