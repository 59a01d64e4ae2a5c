// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    clamp_unit, CandidateDocument, CandidateRecord, Highlight, InvestmentTimeline, MatchStatistics,
    ModelError, PreferenceProfile, RiskTolerance, ScoreResult, ScoringMethod, DEFAULT_HIGHLIGHT,
    DEFAULT_TRACTION,
};
pub use requests::FindMatchesRequest;
pub use responses::{ErrorResponse, FindMatchesResponse, HealthResponse};
