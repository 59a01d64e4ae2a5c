//! Pitch Match - preference-based startup matching engine
//!
//! Scores a pool of startup ideas against an investor's preference profile,
//! preferring an external semantic scorer and falling back to a
//! deterministic heuristic when it fails or becomes unreliable.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{fallback_score, MatchOptions, MatchResult, Matcher, ScoringOrchestrator, SemanticScorer, TextGenerator};
pub use models::{CandidateRecord, FindMatchesRequest, FindMatchesResponse, MatchStatistics, PreferenceProfile, ScoreResult};
