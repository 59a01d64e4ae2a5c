use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default highlight attached to a score when the scorer produced none
pub const DEFAULT_HIGHLIGHT: &str = "Aligned with your investment preferences";

/// Traction text used when the scorer has nothing better to say
pub const DEFAULT_TRACTION: &str = "Not specified";

/// Errors raised while constructing profiles and candidates
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Candidate id must not be empty")]
    EmptyId,

    #[error("Candidate title must not be empty")]
    EmptyTitle,

    #[error("min_funding ({min}) is greater than max_funding ({max})")]
    FundingBounds { min: f64, max: f64 },

    #[error("Unknown risk tolerance: {0} (expected conservative, medium or aggressive)")]
    UnknownRiskTolerance(String),

    #[error("Unknown investment timeline: {0} (expected 3_months, 6_months, 12_months or 24_months)")]
    UnknownTimeline(String),
}

/// How much risk the requester is willing to take on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Medium,
    Aggressive,
}

impl RiskTolerance {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTolerance::Conservative => "conservative",
            RiskTolerance::Medium => "medium",
            RiskTolerance::Aggressive => "aggressive",
        }
    }
}

impl FromStr for RiskTolerance {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "conservative" => Ok(RiskTolerance::Conservative),
            "medium" => Ok(RiskTolerance::Medium),
            "aggressive" => Ok(RiskTolerance::Aggressive),
            _ => Err(ModelError::UnknownRiskTolerance(s.to_string())),
        }
    }
}

impl fmt::Display for RiskTolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Horizon over which the requester expects to invest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InvestmentTimeline {
    #[serde(rename = "3_months")]
    ThreeMonths,
    #[serde(rename = "6_months")]
    SixMonths,
    #[default]
    #[serde(rename = "12_months")]
    TwelveMonths,
    #[serde(rename = "24_months")]
    TwentyFourMonths,
}

impl InvestmentTimeline {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvestmentTimeline::ThreeMonths => "3_months",
            InvestmentTimeline::SixMonths => "6_months",
            InvestmentTimeline::TwelveMonths => "12_months",
            InvestmentTimeline::TwentyFourMonths => "24_months",
        }
    }
}

impl FromStr for InvestmentTimeline {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "3_months" => Ok(InvestmentTimeline::ThreeMonths),
            "6_months" => Ok(InvestmentTimeline::SixMonths),
            "12_months" => Ok(InvestmentTimeline::TwelveMonths),
            "24_months" => Ok(InvestmentTimeline::TwentyFourMonths),
            _ => Err(ModelError::UnknownTimeline(s.to_string())),
        }
    }
}

impl fmt::Display for InvestmentTimeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the requester is looking for.
///
/// Empty sets mean "no constraint". Built once per request through
/// [`PreferenceProfile::new`] or the `TryFrom` conversion from the request
/// payload and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PreferenceProfile {
    pub industries: BTreeSet<String>,
    pub stages: BTreeSet<String>,
    pub min_funding: Option<f64>,
    pub max_funding: Option<f64>,
    pub geographic_preferences: BTreeSet<String>,
    pub risk_tolerance: RiskTolerance,
    pub investment_timeline: InvestmentTimeline,
}

impl PreferenceProfile {
    pub fn new<I, S, J, T, G, U>(
        industries: I,
        stages: J,
        min_funding: Option<f64>,
        max_funding: Option<f64>,
        geographic_preferences: G,
        risk_tolerance: RiskTolerance,
        investment_timeline: InvestmentTimeline,
    ) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        J: IntoIterator<Item = T>,
        T: Into<String>,
        G: IntoIterator<Item = U>,
        U: Into<String>,
    {
        if let (Some(min), Some(max)) = (min_funding, max_funding) {
            if min > max {
                return Err(ModelError::FundingBounds { min, max });
            }
        }

        Ok(Self {
            industries: normalize_set(industries),
            stages: normalize_set(stages),
            min_funding,
            max_funding,
            geographic_preferences: normalize_set(geographic_preferences),
            risk_tolerance,
            investment_timeline,
        })
    }

    /// Stable textual key for the profile, used to key cached scores
    pub fn fingerprint(&self) -> String {
        format!(
            "i={}|s={}|f={:?}-{:?}|g={}|r={}|t={}",
            join_set(&self.industries),
            join_set(&self.stages),
            self.min_funding,
            self.max_funding,
            join_set(&self.geographic_preferences),
            self.risk_tolerance,
            self.investment_timeline,
        )
    }
}

fn normalize_set<I, S>(values: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values
        .into_iter()
        .map(|v| v.into().trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// JSON-encoded, lowercased members; quoting keeps separators inside
/// members from colliding with the fingerprint's own delimiters
fn join_set(set: &BTreeSet<String>) -> String {
    let lowered: BTreeSet<String> = set.iter().map(|s| s.to_lowercase()).collect();
    serde_json::to_string(&lowered).unwrap_or_default()
}

/// Raw candidate document as delivered by a candidate pool.
///
/// Field names accept both snake_case and the camelCase used by document
/// stores. Converted into a [`CandidateRecord`] at the pool boundary.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CandidateDocument {
    #[serde(alias = "$id", alias = "ideaId")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub problem: Option<String>,
    #[serde(default)]
    pub solution: Option<String>,
    #[serde(default, alias = "targetMarket")]
    pub target_market: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, alias = "teamSize")]
    pub team_size: Option<u32>,
    #[serde(default, alias = "fundingNeeded")]
    pub funding_needed: Option<f64>,
    #[serde(default)]
    pub location: Option<String>,
}

/// A scorable startup idea
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CandidateDocument")]
pub struct CandidateRecord {
    pub id: String,
    pub title: String,
    pub category: String,
    pub stage: String,
    pub description: String,
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub target_market: Option<String>,
    pub tags: Vec<String>,
    pub team_size: Option<u32>,
    pub funding_needed: Option<f64>,
    pub location: Option<String>,
}

impl CandidateRecord {
    /// Create a candidate with only the required fields set
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Result<Self, ModelError> {
        Self::try_from(CandidateDocument {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        })
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into().trim().to_string();
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = stage.into().trim().to_string();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into().trim().to_string();
        self
    }

    pub fn with_problem(mut self, problem: impl Into<String>) -> Self {
        self.problem = non_blank(Some(problem.into()));
        self
    }

    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = non_blank(Some(solution.into()));
        self
    }

    pub fn with_target_market(mut self, target_market: impl Into<String>) -> Self {
        self.target_market = non_blank(Some(target_market.into()));
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = clean_tags(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_funding_needed(mut self, funding_needed: f64) -> Self {
        self.funding_needed = Some(funding_needed);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = non_blank(Some(location.into()));
        self
    }
}

impl TryFrom<CandidateDocument> for CandidateRecord {
    type Error = ModelError;

    fn try_from(doc: CandidateDocument) -> Result<Self, Self::Error> {
        let id = doc.id.trim().to_string();
        if id.is_empty() {
            return Err(ModelError::EmptyId);
        }
        let title = doc.title.trim().to_string();
        if title.is_empty() {
            return Err(ModelError::EmptyTitle);
        }

        Ok(Self {
            id,
            title,
            category: non_blank(doc.category).unwrap_or_default(),
            stage: non_blank(doc.stage).unwrap_or_default(),
            description: non_blank(doc.description).unwrap_or_default(),
            problem: non_blank(doc.problem),
            solution: non_blank(doc.solution),
            target_market: non_blank(doc.target_market),
            tags: clean_tags(doc.tags),
            team_size: doc.team_size,
            funding_needed: doc.funding_needed,
            location: non_blank(doc.location),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Which scorer produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMethod {
    Semantic,
    Fallback,
}

/// One explanatory reason attached to a score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub reason: String,
    pub score: f64,
}

impl Highlight {
    pub fn new(reason: impl Into<String>, score: f64) -> Self {
        Self {
            reason: reason.into(),
            score: clamp_unit(score),
        }
    }
}

/// Scored candidate as returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub candidate_id: String,
    pub title: String,
    pub category: String,
    pub stage: String,
    pub description: String,
    pub match_score: f64,
    pub highlights: Vec<Highlight>,
    pub traction: String,
    #[serde(rename = "scoring_method")]
    pub method: ScoringMethod,
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub target_market: Option<String>,
    pub tags: Vec<String>,
    pub team_size: Option<u32>,
    pub funding_needed: Option<f64>,
    pub location: Option<String>,
}

impl ScoreResult {
    /// Build a result for `candidate`.
    ///
    /// `match_score` is clamped into `[0, 1]`; an empty highlight list gets
    /// [`DEFAULT_HIGHLIGHT`] and a missing traction gets [`DEFAULT_TRACTION`].
    pub fn new(
        candidate: &CandidateRecord,
        match_score: f64,
        mut highlights: Vec<Highlight>,
        traction: Option<String>,
        method: ScoringMethod,
    ) -> Self {
        let match_score = clamp_unit(match_score);
        if highlights.is_empty() {
            highlights.push(Highlight::new(DEFAULT_HIGHLIGHT, match_score));
        }

        Self {
            candidate_id: candidate.id.clone(),
            title: candidate.title.clone(),
            category: candidate.category.clone(),
            stage: candidate.stage.clone(),
            description: candidate.description.clone(),
            match_score,
            highlights,
            traction: non_blank(traction).unwrap_or_else(|| DEFAULT_TRACTION.to_string()),
            method,
            problem: candidate.problem.clone(),
            solution: candidate.solution.clone(),
            target_market: candidate.target_market.clone(),
            tags: candidate.tags.clone(),
            team_size: candidate.team_size,
            funding_needed: candidate.funding_needed,
            location: candidate.location.clone(),
        }
    }
}

/// Run-level summary returned alongside the matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchStatistics {
    pub total_analyzed: usize,
    pub high_quality_count: usize,
    pub average_score: f64,
    pub processing_seconds: f64,
    pub ai_confidence: f64,
    pub fallback_mode: bool,
    pub cancelled: bool,
}

impl MatchStatistics {
    /// Statistics for a run that produced nothing
    pub fn empty(processing_seconds: f64) -> Self {
        Self {
            total_analyzed: 0,
            high_quality_count: 0,
            average_score: 0.0,
            processing_seconds,
            ai_confidence: 0.0,
            fallback_mode: false,
            cancelled: false,
        }
    }
}

/// Clamp into `[0, 1]`, mapping NaN to zero
#[inline]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
