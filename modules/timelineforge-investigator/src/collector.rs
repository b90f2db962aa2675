//! On-demand evidence search: one web search, then a per-result relevance
//! and credibility assessment. Results are returned to the caller, not
//! persisted; the client decides what to attach.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use timelineforge_common::{scoring, ForgeError, NEUTRAL_CREDIBILITY};

use crate::prompts::truncate;
use crate::traits::{Analyst, WebSearcher};

const RAW_CONTENT_LIMIT: usize = 5000;

pub struct EvidenceCollector {
    searcher: Arc<dyn WebSearcher>,
    analyst: Arc<dyn Analyst>,
}

/// One assessed search result.
#[derive(Debug, Clone, Serialize)]
pub struct CollectedEvidence {
    pub title: String,
    pub content: String,
    pub source_url: String,
    pub source_credibility: f64,
    pub supports_narrative: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CollectionOutcome {
    pub results: Vec<CollectedEvidence>,
    pub answer: Option<String>,
    pub query: String,
}

impl EvidenceCollector {
    pub fn new(searcher: Arc<dyn WebSearcher>, analyst: Arc<dyn Analyst>) -> Self {
        Self { searcher, analyst }
    }

    /// Search and assess. Assessment failures degrade individual results to a
    /// neutral score rather than failing the request; search failure fails it.
    pub async fn collect(
        &self,
        query: &str,
        event_title: &str,
        branch_name: Option<&str>,
        max_results: u32,
    ) -> Result<CollectionOutcome, ForgeError> {
        info!(query, event_title, "Evidence collection search");

        let (hits, answer) = self
            .searcher
            .search(&format!("{event_title} {query}"), max_results, true)
            .await?;

        info!(count = hits.len(), "Search results received");

        let mut results = Vec::with_capacity(hits.len());

        for hit in hits {
            let assessed = match self.analyst.assess_result(event_title, branch_name, &hit).await {
                Ok(report) => CollectedEvidence {
                    title: hit.title.clone(),
                    content: report
                        .summary
                        .unwrap_or_else(|| truncate(&hit.content, 500).to_string()),
                    source_url: hit.url.clone(),
                    source_credibility: scoring::clamp_credibility(report.credibility_score),
                    supports_narrative: report.supports_narrative,
                    raw_content: hit
                        .raw_content
                        .as_deref()
                        .map(|raw| truncate(raw, RAW_CONTENT_LIMIT).to_string()),
                },
                Err(e) => {
                    warn!(url = hit.url.as_str(), error = %e, "Result assessment failed, using neutral score");
                    CollectedEvidence {
                        title: hit.title.clone(),
                        content: truncate(&hit.content, 500).to_string(),
                        source_url: hit.url.clone(),
                        source_credibility: NEUTRAL_CREDIBILITY,
                        supports_narrative: None,
                        raw_content: None,
                    }
                }
            };
            results.push(assessed);
        }

        Ok(CollectionOutcome {
            results,
            answer,
            query: query.to_string(),
        })
    }
}
