use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::{
    orchestrator::ScoringOrchestrator,
    ranking::{assemble, DEFAULT_MIN_SCORE, DEFAULT_TOP_K},
    statistics::{aggregate, round_to},
};
use crate::models::{clamp_unit, MatchStatistics, PreferenceProfile, ScoreResult};
use crate::services::{CandidatePool, MatchSink};

/// Caller-supplied bounds on the returned matches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    pub top_k: usize,
    pub min_score: f64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            min_score: DEFAULT_MIN_SCORE,
        }
    }
}

/// Result of one matching run
#[derive(Debug, Clone)]
pub struct MatchResult {
    pub run_id: Uuid,
    pub matches: Vec<ScoreResult>,
    pub statistics: MatchStatistics,
}

/// Main matching engine
///
/// # Pipeline Stages
/// 1. Fetch the visible candidate pool
/// 2. Score every candidate (semantic first, fallback on failure)
/// 3. Threshold, rank and truncate
/// 4. Summarize the run and notify the optional sink
#[derive(Clone)]
pub struct Matcher {
    pool: Arc<dyn CandidatePool>,
    orchestrator: ScoringOrchestrator,
    sink: Option<Arc<dyn MatchSink>>,
}

impl Matcher {
    pub fn new(pool: Arc<dyn CandidatePool>, orchestrator: ScoringOrchestrator) -> Self {
        Self {
            pool,
            orchestrator,
            sink: None,
        }
    }

    /// Notify `sink` with the final matches of every run
    pub fn with_sink(mut self, sink: Arc<dyn MatchSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Find matches for a preference profile
    ///
    /// Always returns statistics: an unavailable pool yields an empty
    /// result with `total_analyzed = 0`.
    pub async fn find_matches(&self, profile: &PreferenceProfile, options: MatchOptions) -> MatchResult {
        self.find_matches_cancellable(profile, options, &CancellationToken::new())
            .await
    }

    /// Like [`Matcher::find_matches`], stopping early when `cancel` fires
    pub async fn find_matches_cancellable(
        &self,
        profile: &PreferenceProfile,
        options: MatchOptions,
        cancel: &CancellationToken,
    ) -> MatchResult {
        let started = Instant::now();
        let run_id = Uuid::new_v4();

        let candidates = match self.pool.fetch_visible_candidates().await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::error!("Match run {} aborted, candidate pool unavailable: {}", run_id, e);
                return MatchResult {
                    run_id,
                    matches: Vec::new(),
                    statistics: MatchStatistics::empty(round_to(started.elapsed().as_secs_f64(), 3)),
                };
            }
        };

        tracing::debug!("Match run {}: {} candidates in pool", run_id, candidates.len());

        let run = self
            .orchestrator
            .score_pool(&candidates, profile, cancel)
            .await;

        let ranked = assemble(run.results, clamp_unit(options.min_score), options.top_k);
        let statistics = aggregate(&ranked, &run.summary, started.elapsed());

        if let Some(sink) = &self.sink {
            if let Err(e) = sink.record(run_id, profile, &ranked.matches).await {
                tracing::warn!("Match sink failed for run {}: {}", run_id, e);
            }
        }

        tracing::info!(
            "Match run {}: returning {} of {} qualified matches in {:.3}s",
            run_id,
            ranked.matches.len(),
            statistics.total_analyzed,
            statistics.processing_seconds
        );

        MatchResult {
            run_id,
            matches: ranked.matches,
            statistics,
        }
    }
}
