use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::time::Duration;

use crate::models::{CandidateDocument, CandidateRecord};
use crate::services::pool::{validate_documents, CandidatePool, PoolError};

const VISIBLE_CANDIDATES_QUERY: &str = r#"
    SELECT id::text AS id, title, category, stage, description,
           problem, solution, target_market, tags,
           team_size, funding_needed::float8 AS funding_needed, location
    FROM ideas
    WHERE visibility = 'public' AND status = 'active'
    ORDER BY created_at DESC
    LIMIT $1
"#;

/// Candidate pool reading published ideas from PostgreSQL
pub struct PgCandidatePool {
    pool: PgPool,
    limit: i64,
}

impl PgCandidatePool {
    /// Create a new PostgreSQL pool from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        limit: usize,
    ) -> Result<Self, PoolError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(600))
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool,
            limit: limit as i64,
        })
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PoolError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}

#[async_trait]
impl CandidatePool for PgCandidatePool {
    async fn fetch_visible_candidates(&self) -> Result<Vec<CandidateRecord>, PoolError> {
        let rows = sqlx::query(VISIBLE_CANDIDATES_QUERY)
            .bind(self.limit)
            .fetch_all(&self.pool)
            .await?;

        let documents = rows
            .iter()
            .map(row_to_document)
            .collect::<Result<Vec<_>, _>>()?;

        let candidates = validate_documents(documents);

        tracing::debug!("Loaded {} visible candidates from PostgreSQL", candidates.len());

        Ok(candidates)
    }
}

fn row_to_document(row: &PgRow) -> Result<CandidateDocument, sqlx::Error> {
    let team_size: Option<i32> = row.try_get("team_size")?;
    let tags: Option<Vec<String>> = row.try_get("tags")?;

    Ok(CandidateDocument {
        id: row.try_get("id")?,
        title: row.try_get::<Option<String>, _>("title")?.unwrap_or_default(),
        category: row.try_get("category")?,
        stage: row.try_get("stage")?,
        description: row.try_get("description")?,
        problem: row.try_get("problem")?,
        solution: row.try_get("solution")?,
        target_market: row.try_get("target_market")?,
        tags: tags.unwrap_or_default(),
        team_size: team_size.and_then(|n| u32::try_from(n).ok()),
        funding_needed: row.try_get("funding_needed")?,
        location: row.try_get("location")?,
    })
}
