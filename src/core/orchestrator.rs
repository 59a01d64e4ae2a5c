use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use tokio_util::sync::CancellationToken;

use crate::core::fallback::fallback_score;
use crate::core::semantic::SemanticScorer;
use crate::models::{CandidateRecord, PreferenceProfile, ScoreResult, ScoringMethod};

/// Which scorer the run is currently allowed to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ScoringMode {
    /// Semantic scorer first, fallback per failed candidate
    AiPreferred = 0,
    /// Fallback only for the remainder of the run (terminal)
    FallbackOnly = 1,
}

impl ScoringMode {
    fn from_u8(value: u8) -> Self {
        if value == ScoringMode::FallbackOnly as u8 {
            ScoringMode::FallbackOnly
        } else {
            ScoringMode::AiPreferred
        }
    }
}

/// Tuning for a scoring run
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Concurrent semantic calls in flight
    pub max_concurrency: usize,
    /// Failure share of attempted calls above which the run degrades
    pub failure_ratio: f64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            failure_ratio: 0.5,
        }
    }
}

const ATTEMPT_SHIFT: u32 = 32;
const FAILURE_MASK: u64 = (1 << ATTEMPT_SHIFT) - 1;

/// Per-run counters shared by the scoring workers.
///
/// `attempted` and `primary_failures` live in one `AtomicU64` (high and low
/// 32 bits) so every worker observes a consistent pair. The mode only moves
/// from `AiPreferred` to `FallbackOnly`, through a single compare-and-swap.
#[derive(Debug)]
pub struct RunState {
    counters: AtomicU64,
    mode: AtomicU8,
    pool_size: usize,
    failure_ratio: f64,
}

impl RunState {
    pub fn new(pool_size: usize, failure_ratio: f64, mode: ScoringMode) -> Self {
        Self {
            counters: AtomicU64::new(0),
            mode: AtomicU8::new(mode as u8),
            pool_size,
            failure_ratio,
        }
    }

    pub fn mode(&self) -> ScoringMode {
        ScoringMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    pub fn attempted(&self) -> usize {
        (self.counters.load(Ordering::Acquire) >> ATTEMPT_SHIFT) as usize
    }

    pub fn primary_failures(&self) -> usize {
        (self.counters.load(Ordering::Acquire) & FAILURE_MASK) as usize
    }

    /// Count one semantic attempt.
    ///
    /// Returns `true` only for the call that moved the run to
    /// [`ScoringMode::FallbackOnly`].
    pub fn record_attempt(&self, failed: bool) -> bool {
        let delta = (1u64 << ATTEMPT_SHIFT) | u64::from(failed);
        let now = self.counters.fetch_add(delta, Ordering::AcqRel) + delta;

        let attempted = (now >> ATTEMPT_SHIFT) as usize;
        let failures = (now & FAILURE_MASK) as usize;

        if !self.should_degrade(attempted, failures) {
            return false;
        }

        self.mode
            .compare_exchange(
                ScoringMode::AiPreferred as u8,
                ScoringMode::FallbackOnly as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// More than `failure_ratio` of attempts failed and attempts cover more
    /// than half of the pool
    #[inline]
    fn should_degrade(&self, attempted: usize, failures: usize) -> bool {
        failures as f64 > self.failure_ratio * attempted as f64 && attempted * 2 > self.pool_size
    }
}

/// Counters describing how a run went
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub mode: ScoringMode,
    pub attempted: usize,
    pub primary_failures: usize,
    pub semantic_results: usize,
    pub cancelled: bool,
}

impl RunSummary {
    pub fn fallback_mode(&self) -> bool {
        self.mode == ScoringMode::FallbackOnly
    }
}

/// Results of scoring a pool, in pool order
#[derive(Debug)]
pub struct OrchestratedRun {
    pub results: Vec<ScoreResult>,
    pub summary: RunSummary,
}

#[derive(Debug)]
enum CandidateOutcome {
    Scored(Option<ScoreResult>),
    /// Reached after the run degraded; re-scored by the fallback pass
    Deferred,
    Cancelled,
}

/// Scores every candidate with the semantic scorer, recovering each failure
/// with the fallback scorer and degrading the whole run to fallback-only
/// scoring once the semantic scorer looks unreliable
#[derive(Clone)]
pub struct ScoringOrchestrator {
    semantic: Option<SemanticScorer>,
    config: OrchestratorConfig,
}

impl ScoringOrchestrator {
    pub fn new(semantic: SemanticScorer, config: OrchestratorConfig) -> Self {
        Self {
            semantic: Some(semantic),
            config,
        }
    }

    /// Orchestrator without a semantic scorer; every run is fallback-only
    pub fn fallback_only() -> Self {
        Self {
            semantic: None,
            config: OrchestratorConfig::default(),
        }
    }

    /// Score `candidates` against `profile`.
    ///
    /// Never fails: semantic errors are recovered locally and a candidate
    /// rejected by both scorers is simply absent from the results. If
    /// `cancel` fires, candidates not yet started are skipped and the
    /// results gathered so far are returned.
    pub async fn score_pool(
        &self,
        candidates: &[CandidateRecord],
        profile: &PreferenceProfile,
        cancel: &CancellationToken,
    ) -> OrchestratedRun {
        let initial_mode = if self.semantic.is_some() {
            ScoringMode::AiPreferred
        } else {
            ScoringMode::FallbackOnly
        };
        let state = RunState::new(candidates.len(), self.config.failure_ratio, initial_mode);

        let outcomes: Vec<CandidateOutcome> = stream::iter(candidates)
            .map(|candidate| self.score_candidate(candidate, profile, &state, cancel))
            .buffered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let cancelled = outcomes
            .iter()
            .any(|outcome| matches!(outcome, CandidateOutcome::Cancelled));
        let mode = state.mode();

        let results: Vec<ScoreResult> = match mode {
            ScoringMode::AiPreferred => outcomes
                .into_iter()
                .filter_map(|outcome| match outcome {
                    CandidateOutcome::Scored(result) => result,
                    CandidateOutcome::Deferred | CandidateOutcome::Cancelled => None,
                })
                .collect(),
            // One consistent method for the whole run: partial semantic
            // results are discarded and every reached candidate re-scored.
            ScoringMode::FallbackOnly => candidates
                .iter()
                .zip(outcomes.iter())
                .filter(|(_, outcome)| !matches!(outcome, CandidateOutcome::Cancelled))
                .filter_map(|(candidate, _)| fallback_score(candidate, profile))
                .collect(),
        };

        let summary = RunSummary {
            mode,
            attempted: state.attempted(),
            primary_failures: state.primary_failures(),
            semantic_results: results
                .iter()
                .filter(|r| r.method == ScoringMethod::Semantic)
                .count(),
            cancelled,
        };

        tracing::info!(
            "Scored {} of {} candidates (mode: {:?}, attempted: {}, failures: {}, cancelled: {})",
            results.len(),
            candidates.len(),
            summary.mode,
            summary.attempted,
            summary.primary_failures,
            summary.cancelled
        );

        OrchestratedRun { results, summary }
    }

    async fn score_candidate(
        &self,
        candidate: &CandidateRecord,
        profile: &PreferenceProfile,
        state: &RunState,
        cancel: &CancellationToken,
    ) -> CandidateOutcome {
        if cancel.is_cancelled() {
            return CandidateOutcome::Cancelled;
        }

        let semantic = match (&self.semantic, state.mode()) {
            (Some(semantic), ScoringMode::AiPreferred) => semantic,
            _ => return CandidateOutcome::Deferred,
        };

        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => return CandidateOutcome::Cancelled,
            attempt = semantic.score(candidate, profile) => attempt,
        };

        match attempt {
            Ok(result) => {
                if state.record_attempt(false) {
                    log_degraded(state);
                }
                tracing::debug!(
                    "Semantic score for {}: {:.3}",
                    candidate.id,
                    result.match_score
                );
                CandidateOutcome::Scored(Some(result))
            }
            Err(e) => {
                tracing::warn!("Semantic scoring failed for {}: {}", candidate.id, e);

                if state.record_attempt(true) {
                    log_degraded(state);
                }

                CandidateOutcome::Scored(fallback_score(candidate, profile))
            }
        }
    }
}

fn log_degraded(state: &RunState) {
    tracing::warn!(
        "Semantic scorer unreliable ({} of {} attempts failed), switching run to fallback scoring",
        state.primary_failures(),
        state.attempted()
    );
}
