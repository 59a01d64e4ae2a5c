// Service exports
pub mod cache;
pub mod document_store;
pub mod llm;
pub mod pool;
pub mod postgres;
pub mod sink;

pub use cache::{CacheKey, CacheStats, ScoreCache};
pub use document_store::HttpCandidatePool;
pub use llm::ChatCompletionsGenerator;
pub use pool::{CandidatePool, InMemoryCandidatePool, PoolError};
pub use postgres::PgCandidatePool;
pub use sink::{MatchSink, SinkError, TracingSink};
