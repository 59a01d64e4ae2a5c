use async_trait::async_trait;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::models::{CandidateRecord, Highlight, PreferenceProfile, ScoreResult, ScoringMethod};
use crate::services::ScoreCache;

/// Errors returned by a text generator
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// A single semantic scoring attempt failed.
///
/// Always recovered inside the orchestrator.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Text generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Text generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("No JSON object found in reply")]
    MissingJson,

    #[error("Reply is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Reply has no match_score")]
    MissingScore,
}

/// External text-generation collaborator.
///
/// One call per candidate, no session state.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Scores candidates by asking a [`TextGenerator`] for a structured verdict
#[derive(Clone)]
pub struct SemanticScorer {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
    cache: Option<Arc<ScoreCache>>,
}

impl SemanticScorer {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self {
            generator,
            timeout,
            cache: None,
        }
    }

    /// Memoize successful scores in `cache`
    pub fn with_cache(mut self, cache: Arc<ScoreCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Score one candidate. Timeouts count as failures.
    pub async fn score(
        &self,
        candidate: &CandidateRecord,
        profile: &PreferenceProfile,
    ) -> Result<ScoreResult, ScoringError> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(candidate, profile).await {
                tracing::trace!("Semantic score cache hit: {}", candidate.id);
                return Ok(hit);
            }
        }

        let prompt = build_prompt(candidate, profile);

        let raw = tokio::time::timeout(self.timeout, self.generator.generate(&prompt))
            .await
            .map_err(|_| ScoringError::Timeout(self.timeout))??;

        let result = parse_response(&raw, candidate)?;

        if let Some(cache) = &self.cache {
            cache.insert(candidate, profile, result.clone()).await;
        }

        Ok(result)
    }
}

/// Describe the candidate and the preferences for the generator.
///
/// The weighting guidance is advisory; nothing enforces it on the reply.
pub fn build_prompt(candidate: &CandidateRecord, profile: &PreferenceProfile) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(
        "You are an experienced venture analyst. Rate how well the startup below \
         fits the investor's preferences.\n\n",
    );

    prompt.push_str("Investor preferences:\n");
    let _ = writeln!(prompt, "- Industries: {}", describe_set(&profile.industries));
    let _ = writeln!(prompt, "- Stages: {}", describe_set(&profile.stages));
    let _ = writeln!(
        prompt,
        "- Funding range: {}",
        describe_funding(profile.min_funding, profile.max_funding)
    );
    let _ = writeln!(
        prompt,
        "- Geography: {}",
        describe_set(&profile.geographic_preferences)
    );
    let _ = writeln!(prompt, "- Risk tolerance: {}", profile.risk_tolerance);
    let _ = writeln!(prompt, "- Investment timeline: {}", profile.investment_timeline);

    prompt.push_str("\nStartup:\n");
    let _ = writeln!(prompt, "- Title: {}", candidate.title);
    let _ = writeln!(prompt, "- Category: {}", or_unspecified(&candidate.category));
    let _ = writeln!(prompt, "- Stage: {}", or_unspecified(&candidate.stage));
    let _ = writeln!(prompt, "- Description: {}", or_unspecified(&candidate.description));
    let _ = writeln!(prompt, "- Problem: {}", candidate.problem.as_deref().unwrap_or("Not specified"));
    let _ = writeln!(prompt, "- Solution: {}", candidate.solution.as_deref().unwrap_or("Not specified"));
    let _ = writeln!(
        prompt,
        "- Target market: {}",
        candidate.target_market.as_deref().unwrap_or("Not specified")
    );
    if !candidate.tags.is_empty() {
        let _ = writeln!(prompt, "- Tags: {}", candidate.tags.join(", "));
    }
    if let Some(team_size) = candidate.team_size {
        let _ = writeln!(prompt, "- Team size: {}", team_size);
    }
    if let Some(funding) = candidate.funding_needed {
        let _ = writeln!(prompt, "- Funding needed: ${:.0}", funding);
    }
    if let Some(location) = &candidate.location {
        let _ = writeln!(prompt, "- Location: {}", location);
    }

    prompt.push_str(
        "\nWeigh the criteria as follows: category alignment 30%, stage alignment 25%, \
         market opportunity 20%, risk/return profile 15%, geography 10%.\n\n\
         Reply with a single JSON object and nothing else:\n\
         {\"match_score\": <number between 0 and 1>, \
         \"highlights\": [<short reasons the startup fits>], \
         \"traction\": <one sentence on traction, or \"Not specified\">}\n",
    );

    prompt
}

#[derive(Debug, Deserialize)]
struct SemanticReply {
    match_score: Option<f64>,
    #[serde(default)]
    highlights: Vec<ReplyHighlight>,
    #[serde(default)]
    traction: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReplyHighlight {
    Text(String),
    Scored { reason: String, score: Option<f64> },
}

/// Parse the first JSON object in `raw` into a semantic [`ScoreResult`]
pub fn parse_response(raw: &str, candidate: &CandidateRecord) -> Result<ScoreResult, ScoringError> {
    let json = extract_json_object(raw)?;

    let reply: SemanticReply =
        serde_json::from_value(json).map_err(|e| ScoringError::InvalidJson(e.to_string()))?;

    let match_score = reply.match_score.ok_or(ScoringError::MissingScore)?;

    let highlights = reply
        .highlights
        .into_iter()
        .map(|h| match h {
            ReplyHighlight::Text(reason) => (reason, match_score),
            ReplyHighlight::Scored { reason, score } => (reason, score.unwrap_or(match_score)),
        })
        .filter(|(reason, _)| !reason.trim().is_empty())
        .map(|(reason, score)| Highlight::new(reason.trim(), score))
        .collect();

    Ok(ScoreResult::new(
        candidate,
        match_score,
        highlights,
        reply.traction,
        ScoringMethod::Semantic,
    ))
}

/// First complete `{...}` value in `raw`, ignoring anything after it
fn extract_json_object(raw: &str) -> Result<serde_json::Value, ScoringError> {
    let start = raw.find('{').ok_or(ScoringError::MissingJson)?;
    let mut values =
        serde_json::Deserializer::from_str(&raw[start..]).into_iter::<serde_json::Value>();

    match values.next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(ScoringError::InvalidJson(e.to_string())),
        None => Err(ScoringError::MissingJson),
    }
}

fn describe_set(set: &std::collections::BTreeSet<String>) -> String {
    if set.is_empty() {
        "Any".to_string()
    } else {
        set.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

fn describe_funding(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("${:.0} - ${:.0}", min, max),
        (Some(min), None) => format!("at least ${:.0}", min),
        (None, Some(max)) => format!("up to ${:.0}", max),
        (None, None) => "Any".to_string(),
    }
}

fn or_unspecified(value: &str) -> &str {
    if value.is_empty() {
        "Not specified"
    } else {
        value
    }
}
