pub mod error;

pub use error::{Result, TavilyError};

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

const TAVILY_API_URL: &str = "https://api.tavily.com/search";

pub struct TavilyClient {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest {
    api_key: String,
    query: String,
    search_depth: String,
    max_results: u32,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub raw_content: Option<String>,
}

impl TavilyClient {
    pub fn new(api_key: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            client,
            base_url: TAVILY_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }

    /// Advanced-depth search. `include_raw_content` pulls full page text for
    /// downstream credibility analysis.
    pub async fn search(
        &self,
        query: &str,
        max_results: u32,
        include_raw_content: bool,
    ) -> Result<SearchResponse> {
        info!(query, max_results, "Tavily search");

        let request = SearchRequest {
            api_key: self.api_key.clone(),
            query: query.to_string(),
            search_depth: "advanced".to_string(),
            max_results,
            include_answer: true,
            include_raw_content,
        };

        let resp = self.client.post(&self.base_url).json(&request).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(TavilyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let data: SearchResponse = resp.json().await.map_err(TavilyError::from)?;
        info!(query, count = data.results.len(), "Tavily search complete");
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parses_with_missing_fields() {
        let raw = r#"{"results":[{"url":"https://a.example","title":"A"}]}"#;
        let resp: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.results.len(), 1);
        assert_eq!(resp.results[0].content, "");
        assert!(resp.results[0].raw_content.is_none());
        assert!(resp.answer.is_none());
    }

    #[test]
    fn response_parses_empty_body() {
        let resp: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.results.is_empty());
    }
}
