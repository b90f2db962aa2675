// Trait abstractions for the pipeline's three dependencies.
//
// WebSearcher — external search API.
// Analyst — the model calls, one method per prompt shape.
// InvestigationStore — Postgres reads/writes the pipeline needs.
//
// These enable deterministic testing with the fixtures module: no network,
// no database, no Docker.

use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use gemini_client::Gemini;
use tavily_client::TavilyClient;
use timelineforge_common::{
    Branch, Event, EventStatus, Evidence, Hypothesis, HypothesisStatus, LogLevel,
};
use timelineforge_store::{NewBranch, NewEvidence, NewHypothesis, Store};

use crate::analysis::{
    CredibilityReport, EventAnalysis, HypothesisBatch, HypothesisEvaluation, RelevanceReport,
};
use crate::prompts;

/// One web search result, as the pipeline consumes it.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub content: String,
    pub raw_content: Option<String>,
}

// ---------------------------------------------------------------------------
// WebSearcher
// ---------------------------------------------------------------------------

#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Advanced-depth search. Returns hits plus the provider's synthesized answer.
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        include_raw_content: bool,
    ) -> Result<(Vec<SearchHit>, Option<String>)>;
}

#[async_trait]
impl WebSearcher for TavilyClient {
    async fn search(
        &self,
        query: &str,
        max_results: u32,
        include_raw_content: bool,
    ) -> Result<(Vec<SearchHit>, Option<String>)> {
        let resp = TavilyClient::search(self, query, max_results, include_raw_content).await?;
        let hits = resp
            .results
            .into_iter()
            .map(|r| SearchHit {
                url: r.url,
                title: r.title,
                content: r.content,
                raw_content: r.raw_content,
            })
            .collect();
        Ok((hits, resp.answer))
    }
}

// ---------------------------------------------------------------------------
// Analyst — model calls
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Analyst: Send + Sync {
    /// Phase 1: claims, parties, narratives and search queries for an event.
    /// Errors (including unparseable replies) are recovered by the caller
    /// with a default plan.
    async fn analyze_event(&self, title: &str, description: &str) -> Result<EventAnalysis>;

    /// Phase 2: credibility score and summary for one search result.
    async fn score_source(&self, hit: &SearchHit) -> Result<CredibilityReport>;

    /// Evidence collector: credibility plus narrative fit for one result.
    async fn assess_result(
        &self,
        event_title: &str,
        branch_name: Option<&str>,
        hit: &SearchHit,
    ) -> Result<RelevanceReport>;

    /// Phase 4: hypothesis candidates from collected evidence.
    async fn draft_hypotheses(
        &self,
        event_title: &str,
        evidence: &[(String, Option<String>)],
    ) -> Result<Vec<crate::analysis::HypothesisDraft>>;

    /// Hypothesis tester: verdict for a claim against fresh search hits.
    /// An unparseable reply yields the default inconclusive evaluation.
    async fn evaluate_hypothesis(
        &self,
        claim: &str,
        prediction: &str,
        hits: &[SearchHit],
    ) -> Result<HypothesisEvaluation>;
}

#[async_trait]
impl Analyst for Gemini {
    async fn analyze_event(&self, title: &str, description: &str) -> Result<EventAnalysis> {
        let reply = self.prompt(&prompts::event_analysis(title, description)).await?;
        gemini_client::json::extract_json(&reply)
            .ok_or_else(|| anyhow::anyhow!("no parseable analysis in reply"))
    }

    async fn score_source(&self, hit: &SearchHit) -> Result<CredibilityReport> {
        let reply = self.prompt(&prompts::source_credibility(hit)).await?;
        gemini_client::json::extract_json(&reply)
            .ok_or_else(|| anyhow::anyhow!("no parseable credibility report in reply"))
    }

    async fn assess_result(
        &self,
        event_title: &str,
        branch_name: Option<&str>,
        hit: &SearchHit,
    ) -> Result<RelevanceReport> {
        let report = self
            .extract(&prompts::result_relevance(event_title, branch_name, hit))
            .await?;
        Ok(report)
    }

    async fn draft_hypotheses(
        &self,
        event_title: &str,
        evidence: &[(String, Option<String>)],
    ) -> Result<Vec<crate::analysis::HypothesisDraft>> {
        let reply = self
            .prompt(&prompts::hypothesis_generation(event_title, evidence))
            .await?;
        let batch: HypothesisBatch = gemini_client::json::extract_json(&reply).unwrap_or_default();
        Ok(batch.hypotheses)
    }

    async fn evaluate_hypothesis(
        &self,
        claim: &str,
        prediction: &str,
        hits: &[SearchHit],
    ) -> Result<HypothesisEvaluation> {
        let reply = self
            .generate(&gemini_client::GenerateRequest::text(
                &prompts::hypothesis_evaluation(claim, prediction, hits),
                gemini_client::GenerationConfig::new(0.2, 2048),
            ))
            .await?;
        // Unparseable reply is not an error here: the verdict falls back to
        // inconclusive with zero impact.
        Ok(gemini_client::json::extract_json(&reply).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// InvestigationStore — persistence seam
// ---------------------------------------------------------------------------

#[async_trait]
pub trait InvestigationStore: Send + Sync {
    async fn get_event(&self, id: Uuid) -> Result<Option<Event>>;
    async fn update_event_progress(
        &self,
        id: Uuid,
        phase: i32,
        status: Option<EventStatus>,
    ) -> Result<()>;
    async fn list_active_events(&self) -> Result<Vec<Event>>;

    async fn branches_for_event(&self, event_id: Uuid) -> Result<Vec<Branch>>;
    async fn create_branch(&self, branch: NewBranch) -> Result<Branch>;
    async fn update_branch_confidence(&self, id: Uuid, score: f64) -> Result<()>;

    async fn evidence_urls(&self, event_id: Uuid) -> Result<HashSet<String>>;
    async fn insert_evidence(&self, evidence: NewEvidence) -> Result<Evidence>;
    async fn branch_credibility_scores(&self, branch_id: Uuid) -> Result<Vec<f64>>;

    async fn insert_hypothesis(&self, hypothesis: NewHypothesis) -> Result<Hypothesis>;
    async fn get_hypothesis_context(
        &self,
        id: Uuid,
    ) -> Result<Option<(Hypothesis, Branch, Event)>>;
    async fn set_hypothesis_status(&self, id: Uuid, status: HypothesisStatus) -> Result<()>;
    async fn update_hypothesis_result(
        &self,
        id: Uuid,
        status: HypothesisStatus,
        confidence_impact: f64,
        reasoning: Option<&str>,
    ) -> Result<()>;

    /// Append an audit entry. Infallible by contract: implementations absorb
    /// write failures.
    async fn log(
        &self,
        event_id: Uuid,
        phase: i32,
        action: &str,
        details: Option<serde_json::Value>,
        level: LogLevel,
    );
}

#[async_trait]
impl InvestigationStore for Store {
    async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(Store::get_event(self, id).await?)
    }

    async fn update_event_progress(
        &self,
        id: Uuid,
        phase: i32,
        status: Option<EventStatus>,
    ) -> Result<()> {
        Ok(Store::update_event_progress(self, id, phase, status).await?)
    }

    async fn list_active_events(&self) -> Result<Vec<Event>> {
        Ok(Store::list_active_events(self).await?)
    }

    async fn branches_for_event(&self, event_id: Uuid) -> Result<Vec<Branch>> {
        Ok(Store::branches_for_event(self, event_id).await?)
    }

    async fn create_branch(&self, branch: NewBranch) -> Result<Branch> {
        Ok(Store::create_branch(self, branch).await?)
    }

    async fn update_branch_confidence(&self, id: Uuid, score: f64) -> Result<()> {
        Ok(Store::update_branch_confidence(self, id, score).await?)
    }

    async fn evidence_urls(&self, event_id: Uuid) -> Result<HashSet<String>> {
        Ok(Store::evidence_urls(self, event_id).await?)
    }

    async fn insert_evidence(&self, evidence: NewEvidence) -> Result<Evidence> {
        Ok(Store::insert_evidence(self, evidence).await?)
    }

    async fn branch_credibility_scores(&self, branch_id: Uuid) -> Result<Vec<f64>> {
        Ok(Store::branch_credibility_scores(self, branch_id).await?)
    }

    async fn insert_hypothesis(&self, hypothesis: NewHypothesis) -> Result<Hypothesis> {
        Ok(Store::insert_hypothesis(self, hypothesis).await?)
    }

    async fn get_hypothesis_context(
        &self,
        id: Uuid,
    ) -> Result<Option<(Hypothesis, Branch, Event)>> {
        Ok(Store::get_hypothesis_context(self, id).await?)
    }

    async fn set_hypothesis_status(&self, id: Uuid, status: HypothesisStatus) -> Result<()> {
        Ok(Store::set_hypothesis_status(self, id, status).await?)
    }

    async fn update_hypothesis_result(
        &self,
        id: Uuid,
        status: HypothesisStatus,
        confidence_impact: f64,
        reasoning: Option<&str>,
    ) -> Result<()> {
        Ok(Store::update_hypothesis_result(self, id, status, confidence_impact, reasoning).await?)
    }

    async fn log(
        &self,
        event_id: Uuid,
        phase: i32,
        action: &str,
        details: Option<serde_json::Value>,
        level: LogLevel,
    ) {
        Store::log(self, event_id, phase, action, details, level).await
    }
}
