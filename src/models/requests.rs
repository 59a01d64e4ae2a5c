use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::domain::{InvestmentTimeline, ModelError, PreferenceProfile, RiskTolerance};

/// Request to find matching startup ideas
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FindMatchesRequest {
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub stages: Vec<String>,
    #[validate(range(min = 0.0))]
    #[serde(default, alias = "minFunding")]
    pub min_funding: Option<f64>,
    #[validate(range(min = 0.0))]
    #[serde(default, alias = "maxFunding")]
    pub max_funding: Option<f64>,
    #[serde(default, alias = "geographicPreferences")]
    pub geographic_preferences: Vec<String>,
    #[serde(default, alias = "riskTolerance")]
    pub risk_tolerance: Option<String>,
    #[serde(default, alias = "investmentTimeline")]
    pub investment_timeline: Option<String>,
    #[validate(range(min = 1))]
    #[serde(default, alias = "topK")]
    pub top_k: Option<usize>,
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default, alias = "minScore")]
    pub min_score: Option<f64>,
}

impl TryFrom<&FindMatchesRequest> for PreferenceProfile {
    type Error = ModelError;

    fn try_from(req: &FindMatchesRequest) -> Result<Self, Self::Error> {
        let risk_tolerance = match &req.risk_tolerance {
            Some(value) => value.parse()?,
            None => RiskTolerance::default(),
        };
        let investment_timeline = match &req.investment_timeline {
            Some(value) => value.parse()?,
            None => InvestmentTimeline::default(),
        };

        PreferenceProfile::new(
            req.industries.iter().cloned(),
            req.stages.iter().cloned(),
            req.min_funding,
            req.max_funding,
            req.geographic_preferences.iter().cloned(),
            risk_tolerance,
            investment_timeline,
        )
    }
}
