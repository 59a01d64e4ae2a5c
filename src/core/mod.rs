// Core algorithm exports
pub mod fallback;
pub mod matcher;
pub mod orchestrator;
pub mod ranking;
pub mod semantic;
pub mod statistics;

pub use fallback::fallback_score;
pub use matcher::{MatchOptions, MatchResult, Matcher};
pub use orchestrator::{OrchestratedRun, OrchestratorConfig, RunState, RunSummary, ScoringMode, ScoringOrchestrator};
pub use ranking::{assemble, RankedMatches, DEFAULT_MIN_SCORE, DEFAULT_TOP_K};
pub use semantic::{build_prompt, parse_response, GenerationError, ScoringError, SemanticScorer, TextGenerator};
pub use statistics::aggregate;
