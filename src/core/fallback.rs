use std::collections::BTreeSet;

use crate::models::{CandidateRecord, Highlight, PreferenceProfile, ScoreResult, ScoringMethod};

/// Full credit for a category/industry match
pub const INDUSTRY_WEIGHT: f64 = 0.4;
/// Partial credit when the profile has no industry preference
pub const INDUSTRY_NEUTRAL: f64 = 0.2;
/// Full credit for a stage match
pub const STAGE_WEIGHT: f64 = 0.3;
/// Partial credit when the profile has no stage preference
pub const STAGE_NEUTRAL: f64 = 0.15;

/// Descriptions longer than this many characters count as detailed
pub const DETAILED_DESCRIPTION_CHARS: usize = 100;
const DESCRIPTION_INCREMENT: f64 = 0.1;
const PROBLEM_INCREMENT: f64 = 0.05;
const SOLUTION_INCREMENT: f64 = 0.05;
const TARGET_MARKET_INCREMENT: f64 = 0.05;
const TAGS_INCREMENT: f64 = 0.05;

/// Totals below this get the basic-information bonus
pub const RESCUE_THRESHOLD: f64 = 0.5;
pub const RESCUE_BONUS: f64 = 0.2;
pub const RESCUE_HIGHLIGHT: &str = "Basic startup information available";

/// Fallback results below this score are dropped
pub const FALLBACK_FLOOR: f64 = 0.2;

pub const DEFAULT_FALLBACK_HIGHLIGHTS: [(&str, f64); 2] = [
    ("Promising startup opportunity", 0.7),
    ("Good market potential", 0.65),
];

/// Deterministic heuristic score for a candidate
///
/// Scoring formula (capped at 1.0):
/// score = (
///     industry_term +      # 0.4 on match, 0.2 if no industry preference
///     stage_term +         # 0.3 on match, 0.15 if no stage preference
///     content_term +       # up to 0.3 for description, problem, solution, market, tags
///     rescue_bonus         # 0.2 if still below 0.5 with title and description
/// )
///
/// Returns `None` when the final score is below [`FALLBACK_FLOOR`]. The
/// result depends only on its inputs, so repeated calls are identical.
pub fn fallback_score(
    candidate: &CandidateRecord,
    profile: &PreferenceProfile,
) -> Option<ScoreResult> {
    let mut highlights = Vec::new();

    // Industry term
    let industry_score = match preference_term(&profile.industries, &candidate.category) {
        PreferenceMatch::Unconstrained => INDUSTRY_NEUTRAL,
        PreferenceMatch::Matched(industry) => {
            highlights.push(Highlight::new(
                format!("Matches your interest in {}", industry),
                0.9,
            ));
            INDUSTRY_WEIGHT
        }
        PreferenceMatch::Missed => 0.0,
    };

    // Stage term
    let stage_score = match preference_term(&profile.stages, &candidate.stage) {
        PreferenceMatch::Unconstrained => STAGE_NEUTRAL,
        PreferenceMatch::Matched(_) => {
            highlights.push(Highlight::new(
                format!("Stage fits your focus: {}", candidate.stage),
                0.85,
            ));
            STAGE_WEIGHT
        }
        PreferenceMatch::Missed => 0.0,
    };

    let content_score = content_term(candidate, &mut highlights);

    let mut total = industry_score + stage_score + content_score;

    if total < RESCUE_THRESHOLD && !candidate.title.is_empty() && !candidate.description.is_empty() {
        total += RESCUE_BONUS;
        highlights.push(Highlight::new(RESCUE_HIGHLIGHT, 0.6));
    }

    let total = total.min(1.0);

    if total < FALLBACK_FLOOR {
        tracing::trace!(
            "Fallback rejected {} with score {:.3}",
            candidate.id,
            total
        );
        return None;
    }

    if highlights.is_empty() {
        highlights.extend(
            DEFAULT_FALLBACK_HIGHLIGHTS
                .iter()
                .map(|(reason, score)| Highlight::new(*reason, *score)),
        );
    }

    Some(ScoreResult::new(
        candidate,
        total,
        highlights,
        None,
        ScoringMethod::Fallback,
    ))
}

#[derive(Debug, PartialEq)]
enum PreferenceMatch<'a> {
    Unconstrained,
    Matched(&'a str),
    Missed,
}

/// Case-insensitive substring match of `value` against any preferred term.
///
/// The candidate value must contain the preferred term, so "fintech"
/// matches "FinTech & Payments" but a category of "AI" does not match a
/// preference for "Retail". An empty `value` never matches.
#[inline]
fn preference_term<'a>(preferred: &'a BTreeSet<String>, value: &str) -> PreferenceMatch<'a> {
    if preferred.is_empty() {
        return PreferenceMatch::Unconstrained;
    }

    let value = value.to_lowercase();
    if value.is_empty() {
        return PreferenceMatch::Missed;
    }

    preferred
        .iter()
        .find(|term| {
            let term = term.to_lowercase();
            value.contains(&term)
        })
        .map(|term| PreferenceMatch::Matched(term.as_str()))
        .unwrap_or(PreferenceMatch::Missed)
}

/// Completeness credit, independent of the profile
#[inline]
fn content_term(candidate: &CandidateRecord, highlights: &mut Vec<Highlight>) -> f64 {
    let mut score = 0.0;

    if candidate.description.chars().count() > DETAILED_DESCRIPTION_CHARS {
        score += DESCRIPTION_INCREMENT;
        highlights.push(Highlight::new("Detailed business description", 0.7));
    }

    if candidate.problem.is_some() {
        score += PROBLEM_INCREMENT;
    }

    if candidate.solution.is_some() {
        score += SOLUTION_INCREMENT;
    }

    if candidate.problem.is_some() && candidate.solution.is_some() {
        highlights.push(Highlight::new("Clear problem and solution defined", 0.75));
    }

    if let Some(market) = &candidate.target_market {
        score += TARGET_MARKET_INCREMENT;
        highlights.push(Highlight::new(format!("Defined target market: {}", market), 0.65));
    }

    if !candidate.tags.is_empty() {
        score += TAGS_INCREMENT;
    }

    score
}
