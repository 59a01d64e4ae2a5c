// Integration tests for Pitch Match

use async_trait::async_trait;
use pitch_match::core::{
    GenerationError, MatchOptions, Matcher, OrchestratorConfig, ScoringOrchestrator, SemanticScorer,
    TextGenerator,
};
use pitch_match::models::{
    CandidateRecord, InvestmentTimeline, PreferenceProfile, RiskTolerance, ScoringMethod,
};
use pitch_match::services::{
    CandidatePool, ChatCompletionsGenerator, InMemoryCandidatePool, PoolError, ScoreCache,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Replies with a fixed score per candidate title; unknown titles fail
struct TitleScoreGenerator {
    scores: HashMap<String, f64>,
    calls: AtomicUsize,
    cancel_on_call: Option<(usize, CancellationToken)>,
}

impl TitleScoreGenerator {
    fn new(scores: &[(&str, f64)]) -> Self {
        Self {
            scores: scores.iter().map(|(t, s)| (t.to_string(), *s)).collect(),
            calls: AtomicUsize::new(0),
            cancel_on_call: None,
        }
    }

    fn cancelling_on(mut self, call: usize, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }
}

#[async_trait]
impl TextGenerator for TitleScoreGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((at, token)) = &self.cancel_on_call {
            if call == *at {
                token.cancel();
                tokio::time::sleep(Duration::from_secs(10)).await;
            }
        }

        self.scores
            .iter()
            .find(|(title, _)| prompt.contains(&format!("- Title: {}\n", title)))
            .map(|(_, score)| {
                format!(
                    r#"{{"match_score": {}, "highlights": ["Strong fit"], "traction": "Early revenue"}}"#,
                    score
                )
            })
            .ok_or_else(|| GenerationError::ApiError("service unavailable".to_string()))
    }
}

struct OfflinePool;

#[async_trait]
impl CandidatePool for OfflinePool {
    async fn fetch_visible_candidates(&self) -> Result<Vec<CandidateRecord>, PoolError> {
        Err(PoolError::Unavailable("connection refused".to_string()))
    }
}

fn create_test_preferences() -> PreferenceProfile {
    PreferenceProfile::new(
        ["fintech"],
        ["seed"],
        None,
        None,
        Vec::<String>::new(),
        RiskTolerance::Medium,
        InvestmentTimeline::TwelveMonths,
    )
    .unwrap()
}

fn create_test_candidates(titles: &[&str]) -> Vec<CandidateRecord> {
    titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            CandidateRecord::new(format!("idea-{}", i), *title)
                .unwrap()
                .with_category("FinTech")
                .with_stage("Seed")
                .with_description("Payments infrastructure for marketplaces")
        })
        .collect()
}

fn semantic_matcher(titles: &[&str], generator: Arc<TitleScoreGenerator>) -> Matcher {
    let orchestrator = ScoringOrchestrator::new(
        SemanticScorer::new(generator, Duration::from_secs(2)),
        OrchestratorConfig {
            max_concurrency: 2,
            failure_ratio: 0.5,
        },
    );
    let pool = InMemoryCandidatePool::new(create_test_candidates(titles));
    Matcher::new(Arc::new(pool), orchestrator)
}

#[tokio::test]
async fn test_integration_top_k_truncation() {
    let titles = ["Alpha", "Bravo", "Charlie", "Delta", "Echo"];
    let generator = Arc::new(TitleScoreGenerator::new(&[
        ("Alpha", 0.95),
        ("Bravo", 0.9),
        ("Charlie", 0.88),
        ("Delta", 0.7),
        ("Echo", 0.65),
    ]));
    let matcher = semantic_matcher(&titles, generator);

    let result = matcher
        .find_matches(
            &create_test_preferences(),
            MatchOptions {
                top_k: 2,
                min_score: 0.6,
            },
        )
        .await;

    let titles: Vec<_> = result.matches.iter().map(|m| m.title.as_str()).collect();
    assert_eq!(titles, vec!["Alpha", "Bravo"]);
    assert_eq!(result.statistics.total_analyzed, 5);
    assert_eq!(result.statistics.high_quality_count, 2);
    assert_eq!(result.statistics.ai_confidence, 0.85);
    assert!(!result.statistics.fallback_mode);
    assert!(result.matches.iter().all(|m| m.method == ScoringMethod::Semantic));
    assert_eq!(result.matches[0].traction, "Early revenue");
}

#[tokio::test]
async fn test_integration_high_threshold_returns_nothing() {
    let titles = ["Alpha", "Bravo", "Charlie"];
    let generator = Arc::new(TitleScoreGenerator::new(&[
        ("Alpha", 0.85),
        ("Bravo", 0.7),
        ("Charlie", 0.6),
    ]));
    let matcher = semantic_matcher(&titles, generator);

    let result = matcher
        .find_matches(
            &create_test_preferences(),
            MatchOptions {
                top_k: 10,
                min_score: 0.9,
            },
        )
        .await;

    assert!(result.matches.is_empty());
    assert_eq!(result.statistics.total_analyzed, 0);
    assert_eq!(result.statistics.average_score, 0.0);
    assert_eq!(result.statistics.ai_confidence, 0.0);
}

#[tokio::test]
async fn test_integration_unreliable_scorer_degrades_run() {
    let titles = ["Alpha", "Bravo", "Charlie", "Delta"];
    // Only one title scores; the rest fail
    let generator = Arc::new(TitleScoreGenerator::new(&[("Alpha", 0.99)]));
    let matcher = semantic_matcher(&titles, generator);

    let result = matcher
        .find_matches(&create_test_preferences(), MatchOptions::default())
        .await;

    assert!(result.statistics.fallback_mode);
    assert_eq!(result.statistics.ai_confidence, 0.5);
    assert_eq!(result.matches.len(), 4);
    // fintech + seed = 0.7 for every candidate
    for m in &result.matches {
        assert_eq!(m.method, ScoringMethod::Fallback);
        assert!((m.match_score - 0.7).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_integration_pool_failure() {
    let matcher = Matcher::new(Arc::new(OfflinePool), ScoringOrchestrator::fallback_only());

    let result = matcher
        .find_matches(&create_test_preferences(), MatchOptions::default())
        .await;

    assert!(result.matches.is_empty());
    assert_eq!(result.statistics.total_analyzed, 0);
    assert!(!result.statistics.cancelled);
}

#[tokio::test]
async fn test_integration_cancellation_keeps_completed_work() {
    let cancel = CancellationToken::new();
    let titles = ["Alpha", "Bravo", "Charlie", "Delta"];
    let generator = Arc::new(
        TitleScoreGenerator::new(&[
            ("Alpha", 0.9),
            ("Bravo", 0.9),
            ("Charlie", 0.9),
            ("Delta", 0.9),
        ])
        .cancelling_on(2, cancel.clone()),
    );

    let orchestrator = ScoringOrchestrator::new(
        SemanticScorer::new(generator.clone(), Duration::from_secs(2)),
        OrchestratorConfig {
            max_concurrency: 1,
            failure_ratio: 0.5,
        },
    );
    let matcher = Matcher::new(
        Arc::new(InMemoryCandidatePool::new(create_test_candidates(&titles))),
        orchestrator,
    );

    let result = matcher
        .find_matches_cancellable(&create_test_preferences(), MatchOptions::default(), &cancel)
        .await;

    assert!(result.statistics.cancelled);
    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].title, "Alpha");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_integration_cached_scores_skip_generator() {
    let titles = ["Alpha", "Bravo"];
    let generator = Arc::new(TitleScoreGenerator::new(&[("Alpha", 0.9), ("Bravo", 0.8)]));
    let cache = Arc::new(ScoreCache::new(100, 60));

    let orchestrator = ScoringOrchestrator::new(
        SemanticScorer::new(generator.clone(), Duration::from_secs(2)).with_cache(cache),
        OrchestratorConfig::default(),
    );
    let matcher = Matcher::new(
        Arc::new(InMemoryCandidatePool::new(create_test_candidates(&titles))),
        orchestrator,
    );
    let preferences = create_test_preferences();

    let first = matcher.find_matches(&preferences, MatchOptions::default()).await;
    let second = matcher.find_matches(&preferences, MatchOptions::default()).await;

    assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    assert_eq!(first.matches, second.matches);
}

#[tokio::test]
async fn test_integration_chat_completions_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "Sure!\n{\"match_score\": 0.91, \"highlights\": [\"Payments focus\"]}"
                    }
                }]
            })
            .to_string(),
        )
        .expect(3)
        .create_async()
        .await;

    let generator = ChatCompletionsGenerator::new(
        server.url(),
        "sk-test".to_string(),
        "gpt-4o-mini".to_string(),
        0.2,
        400,
        Duration::from_secs(5),
    )
    .unwrap();

    let orchestrator = ScoringOrchestrator::new(
        SemanticScorer::new(Arc::new(generator), Duration::from_secs(5)),
        OrchestratorConfig::default(),
    );
    let matcher = Matcher::new(
        Arc::new(InMemoryCandidatePool::new(create_test_candidates(&[
            "Alpha", "Bravo", "Charlie",
        ]))),
        orchestrator,
    );

    let result = matcher
        .find_matches(&create_test_preferences(), MatchOptions::default())
        .await;

    mock.assert_async().await;
    assert_eq!(result.matches.len(), 3);
    assert!(result.matches.iter().all(|m| m.match_score == 0.91));
    // Ties keep pool order
    let ids: Vec<_> = result.matches.iter().map(|m| m.candidate_id.as_str()).collect();
    assert_eq!(ids, vec!["idea-0", "idea-1", "idea-2"]);
}

#[tokio::test]
async fn test_integration_pool_from_json_documents() {
    let json = r#"[
        {"$id": "a1", "title": "Ledgerly", "category": "FinTech", "stage": "Seed",
         "description": "Bookkeeping", "targetMarket": "SMBs", "fundingNeeded": 150000},
        {"$id": "a2", "title": "   "},
        {"$id": "a3", "title": "Cellula", "category": "BioTech", "stage": "Series A"}
    ]"#;

    let pool = InMemoryCandidatePool::from_json(json).unwrap();
    assert_eq!(pool.len(), 2);

    let matcher = Matcher::new(Arc::new(pool), ScoringOrchestrator::fallback_only());
    let result = matcher
        .find_matches(&create_test_preferences(), MatchOptions::default())
        .await;

    assert_eq!(result.matches.len(), 1);
    assert_eq!(result.matches[0].candidate_id, "a1");
    assert_eq!(result.matches[0].target_market.as_deref(), Some("SMBs"));
    assert_eq!(result.matches[0].funding_needed, Some(150000.0));
}
