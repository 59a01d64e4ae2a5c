use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::models::{CandidateDocument, CandidateRecord};
use crate::services::pool::{validate_documents, CandidatePool, PoolError};

/// Candidate pool backed by a REST document store
///
/// Fetches publicly visible, active idea documents from
/// `{base_url}/databases/{database_id}/collections/{collection}/documents`.
pub struct HttpCandidatePool {
    base_url: String,
    api_key: String,
    project_id: String,
    database_id: String,
    collection: String,
    page_size: usize,
    client: Client,
}

impl HttpCandidatePool {
    /// Create a new document store pool
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        database_id: String,
        collection: String,
        page_size: usize,
        timeout: Duration,
    ) -> Result<Self, PoolError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            project_id,
            database_id,
            collection,
            page_size,
            client,
        })
    }

    fn documents_url(&self) -> String {
        let queries = vec![
            "equal(\"visibility\", \"public\")".to_string(),
            "equal(\"status\", \"active\")".to_string(),
            format!("limit({})", self.page_size),
        ];

        // Build query array for the document store
        let queries_json = serde_json::to_string(&queries).unwrap_or_else(|_| "[]".to_string());

        format!(
            "{}/databases/{}/collections/{}/documents?query={}",
            self.base_url.trim_end_matches('/'),
            self.database_id,
            self.collection,
            urlencoding::encode(&queries_json)
        )
    }
}

#[async_trait]
impl CandidatePool for HttpCandidatePool {
    async fn fetch_visible_candidates(&self) -> Result<Vec<CandidateRecord>, PoolError> {
        let url = self.documents_url();

        tracing::debug!("Fetching candidates from: {}", url);

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", &self.api_key)
            .header("X-Project", &self.project_id)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_else(|_| "Unable to read body".to_string());
            tracing::error!("Failed to fetch candidates: {} - {}", status, body);
            return Err(PoolError::Unavailable(format!(
                "Document store returned {}",
                status
            )));
        }

        let json: Value = response.json().await?;

        let total = json.get("total").and_then(|t| t.as_u64()).unwrap_or(0);

        let documents = json
            .get("documents")
            .and_then(|d| d.as_array())
            .ok_or_else(|| PoolError::InvalidResponse("Missing documents array".into()))?;

        let parsed: Vec<CandidateDocument> = documents
            .iter()
            .filter_map(|doc| {
                let data = doc.get("data").unwrap_or(doc);
                match serde_json::from_value(data.clone()) {
                    Ok(parsed) => Some(parsed),
                    Err(e) => {
                        tracing::warn!("Skipping malformed candidate document: {}", e);
                        None
                    }
                }
            })
            .collect();

        let candidates = validate_documents(parsed);

        tracing::debug!("Fetched {} candidates (total: {})", candidates.len(), total);

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(base_url: String) -> HttpCandidatePool {
        HttpCandidatePool::new(
            base_url,
            "test_key".to_string(),
            "test_project".to_string(),
            "test_db".to_string(),
            "ideas".to_string(),
            100,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_documents_url() {
        let pool = pool("https://store.test/v1/".to_string());
        let url = pool.documents_url();

        assert!(url.starts_with("https://store.test/v1/databases/test_db/collections/ideas/documents?query="));
        assert!(url.contains("visibility"));
        assert!(!url.contains(' '));
    }

    #[tokio::test]
    async fn test_fetch_visible_candidates() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/databases/test_db/collections/ideas/documents")
            .match_query(mockito::Matcher::Any)
            .match_header("x-api-key", "test_key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "total": 3,
                    "documents": [
                        {"$id": "idea-1", "title": "Ledgerly", "category": "FinTech"},
                        {"data": {"id": "idea-2", "title": "Vitals", "targetMarket": "Clinics"}},
                        {"$id": "idea-3", "title": ""}
                    ]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let candidates = pool(server.url()).fetch_visible_candidates().await.unwrap();

        mock.assert_async().await;
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].id, "idea-1");
        assert_eq!(candidates[1].target_market.as_deref(), Some("Clinics"));
    }

    #[tokio::test]
    async fn test_fetch_reports_unavailable_store() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/databases/test_db/collections/ideas/documents")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = pool(server.url()).fetch_visible_candidates().await.unwrap_err();
        assert!(matches!(err, PoolError::Unavailable(_)));
    }
}
