use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{PreferenceProfile, ScoreResult};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to record matches: {0}")]
    RecordFailed(String),
}

/// External destination for assembled match results.
///
/// Notified once per run after ranking; failures are logged by the caller
/// and never affect the returned matches.
#[async_trait]
pub trait MatchSink: Send + Sync {
    async fn record(
        &self,
        run_id: Uuid,
        profile: &PreferenceProfile,
        matches: &[ScoreResult],
    ) -> Result<(), SinkError>;
}

/// Sink that only logs a run summary
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[async_trait]
impl MatchSink for TracingSink {
    async fn record(
        &self,
        run_id: Uuid,
        profile: &PreferenceProfile,
        matches: &[ScoreResult],
    ) -> Result<(), SinkError> {
        let top = matches.first().map(|m| m.candidate_id.as_str()).unwrap_or("-");
        tracing::info!(
            "Match run {}: {} matches for industries {:?} (top: {})",
            run_id,
            matches.len(),
            profile.industries,
            top
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CandidateRecord, ScoringMethod};

    #[test]
    fn test_tracing_sink_accepts_any_run() {
        let candidate = CandidateRecord::new("c1", "Ledgerly").unwrap();
        let matches = vec![ScoreResult::new(&candidate, 0.9, vec![], None, ScoringMethod::Fallback)];

        let outcome = tokio_test::block_on(TracingSink.record(
            Uuid::new_v4(),
            &PreferenceProfile::default(),
            &matches,
        ));
        assert!(outcome.is_ok());

        let outcome = tokio_test::block_on(TracingSink.record(
            Uuid::new_v4(),
            &PreferenceProfile::default(),
            &[],
        ));
        assert!(outcome.is_ok());
    }
}
