use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CandidateDocument, CandidateRecord};

/// Errors that can occur while fetching the candidate pool
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Candidate pool unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Source of candidates eligible for matching.
///
/// Visibility and status filtering are the pool's responsibility.
#[async_trait]
pub trait CandidatePool: Send + Sync {
    async fn fetch_visible_candidates(&self) -> Result<Vec<CandidateRecord>, PoolError>;
}

/// Fixed, in-process candidate pool
#[derive(Debug, Clone, Default)]
pub struct InMemoryCandidatePool {
    candidates: Vec<CandidateRecord>,
}

impl InMemoryCandidatePool {
    pub fn new(candidates: Vec<CandidateRecord>) -> Self {
        Self { candidates }
    }

    /// Load a pool from a JSON array of candidate documents.
    ///
    /// Documents that fail validation are skipped.
    pub fn from_json(json: &str) -> Result<Self, PoolError> {
        let documents: Vec<CandidateDocument> = serde_json::from_str(json)
            .map_err(|e| PoolError::InvalidResponse(format!("Failed to parse candidates: {}", e)))?;

        Ok(Self::new(validate_documents(documents)))
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

#[async_trait]
impl CandidatePool for InMemoryCandidatePool {
    async fn fetch_visible_candidates(&self) -> Result<Vec<CandidateRecord>, PoolError> {
        Ok(self.candidates.clone())
    }
}

/// Convert raw documents into candidates, dropping invalid ones with a warning
pub(crate) fn validate_documents(documents: Vec<CandidateDocument>) -> Vec<CandidateRecord> {
    documents
        .into_iter()
        .filter_map(|doc| {
            let id = doc.id.clone();
            match CandidateRecord::try_from(doc) {
                Ok(candidate) => Some(candidate),
                Err(e) => {
                    tracing::warn!("Skipping invalid candidate {:?}: {}", id, e);
                    None
                }
            }
        })
        .collect()
}
