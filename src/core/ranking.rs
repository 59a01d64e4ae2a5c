use crate::models::ScoreResult;

/// Default minimum score a match must reach
pub const DEFAULT_MIN_SCORE: f64 = 0.6;
/// Default number of matches returned
pub const DEFAULT_TOP_K: usize = 10;

/// Output of the ranking stage
#[derive(Debug, Clone, PartialEq)]
pub struct RankedMatches {
    /// Final list, best first, at most `top_k` long
    pub matches: Vec<ScoreResult>,
    /// Results that passed the threshold, before truncation
    pub qualified_count: usize,
    /// Mean score of the qualified results (0.0 when none)
    pub qualified_average: f64,
}

/// Threshold, sort and truncate scored results
///
/// Results below `min_score` are dropped, the rest sorted by score
/// descending. The sort is stable so ties keep their scoring order.
pub fn assemble(results: Vec<ScoreResult>, min_score: f64, top_k: usize) -> RankedMatches {
    let mut qualified: Vec<ScoreResult> = results
        .into_iter()
        .filter(|r| r.match_score >= min_score)
        .collect();

    qualified.sort_by(|a, b| {
        b.match_score
            .partial_cmp(&a.match_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let qualified_count = qualified.len();
    let qualified_average = if qualified_count > 0 {
        qualified.iter().map(|r| r.match_score).sum::<f64>() / qualified_count as f64
    } else {
        0.0
    };

    qualified.truncate(top_k);

    RankedMatches {
        matches: qualified,
        qualified_count,
        qualified_average,
    }
}
