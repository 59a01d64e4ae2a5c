use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::{CandidateRecord, PreferenceProfile, ScoreResult};

/// In-memory cache of semantic scores
///
/// Keyed by candidate id plus the preference fingerprint, so one profile
/// never sees a score computed for another. Entries expire after the
/// configured TTL so edited candidates are eventually re-scored.
pub struct ScoreCache {
    entries: moka::future::Cache<String, ScoreResult>,
    ttl_secs: u64,
}

impl ScoreCache {
    /// Create a new score cache
    pub fn new(capacity: u64, ttl_secs: u64) -> Self {
        let entries = moka::future::CacheBuilder::new(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { entries, ttl_secs }
    }

    /// Look up a cached score
    pub async fn get(
        &self,
        candidate: &CandidateRecord,
        profile: &PreferenceProfile,
    ) -> Option<ScoreResult> {
        let key = CacheKey::score(&candidate.id, profile);
        let hit = self.entries.get(&key).await;
        if hit.is_none() {
            tracing::trace!("Cache miss: {}", key);
        }
        hit
    }

    /// Store a score
    pub async fn insert(
        &self,
        candidate: &CandidateRecord,
        profile: &PreferenceProfile,
        result: ScoreResult,
    ) {
        let key = CacheKey::score(&candidate.id, profile);
        self.entries.insert(key.clone(), result).await;
        tracing::trace!("Cache set: {}", key);
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.entry_count(),
            ttl_secs: self.ttl_secs,
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub ttl_secs: u64,
}

/// Cache key builder
pub struct CacheKey;

impl CacheKey {
    /// Build a cache key for a candidate scored against a profile
    pub fn score(candidate_id: &str, profile: &PreferenceProfile) -> String {
        format!("score:{}:{}", candidate_id, profile.fingerprint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvestmentTimeline, RiskTolerance, ScoringMethod};

    fn profile(industry: &str) -> PreferenceProfile {
        PreferenceProfile::new(
            vec![industry],
            Vec::<String>::new(),
            None,
            None,
            Vec::<String>::new(),
            RiskTolerance::Medium,
            InvestmentTimeline::TwelveMonths,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_cache_set_get() {
        let cache = ScoreCache::new(100, 60);
        let candidate = CandidateRecord::new("c1", "Title").unwrap();
        let result = ScoreResult::new(&candidate, 0.8, vec![], None, ScoringMethod::Semantic);

        assert!(cache.get(&candidate, &profile("fintech")).await.is_none());

        cache.insert(&candidate, &profile("fintech"), result.clone()).await;

        assert_eq!(cache.get(&candidate, &profile("fintech")).await, Some(result));
        assert!(cache.get(&candidate, &profile("health")).await.is_none());

        cache.entries.run_pending_tasks().await;
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn test_cache_key_builder() {
        let key = CacheKey::score("c1", &profile("fintech"));
        assert!(key.starts_with(r#"score:c1:i=["fintech"]|"#));
    }
}
