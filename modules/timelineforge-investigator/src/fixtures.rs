//! Fixture implementations for deterministic pipeline tests: an in-memory
//! store, canned searchers and a scripted analyst. No network, no database.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use timelineforge_common::{
    Branch, Event, EventStatus, Evidence, Hypothesis, HypothesisStatus, InvestigationLog,
    LogLevel, MAIN_BRANCH_COLOR, MAIN_BRANCH_NAME, TOTAL_PHASES,
};
use timelineforge_store::{NewBranch, NewEvidence, NewHypothesis};

use crate::analysis::{
    CredibilityReport, EventAnalysis, HypothesisDraft, HypothesisEvaluation, RelevanceReport,
};
use crate::traits::{Analyst, InvestigationStore, SearchHit, WebSearcher};

// --- MemoryStore ---

#[derive(Default)]
struct Inner {
    events: HashMap<Uuid, Event>,
    branches: Vec<Branch>,
    evidence: Vec<Evidence>,
    hypotheses: Vec<Hypothesis>,
    logs: Vec<InvestigationLog>,
}

/// In-memory stand-in for the Postgres store.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event with its main branch, the way event creation does.
    pub fn add_event(&self, user_id: Uuid, title: &str, description: &str) -> (Event, Branch) {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            description: description.to_string(),
            status: EventStatus::Idle,
            current_phase: 0,
            total_phases: TOTAL_PHASES,
            created_at: now,
            updated_at: now,
        };
        let main = Branch {
            id: Uuid::new_v4(),
            event_id: event.id,
            name: MAIN_BRANCH_NAME.to_string(),
            description: None,
            confidence_score: 50.0,
            color: MAIN_BRANCH_COLOR.to_string(),
            is_main: true,
            position_z: 0.0,
            created_at: now,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.events.insert(event.id, event.clone());
        inner.branches.push(main.clone());
        (event, main)
    }

    pub fn event(&self, id: Uuid) -> Option<Event> {
        self.inner.lock().unwrap().events.get(&id).cloned()
    }

    pub fn branches(&self) -> Vec<Branch> {
        self.inner.lock().unwrap().branches.clone()
    }

    pub fn evidence(&self) -> Vec<Evidence> {
        self.inner.lock().unwrap().evidence.clone()
    }

    pub fn hypotheses(&self) -> Vec<Hypothesis> {
        self.inner.lock().unwrap().hypotheses.clone()
    }

    pub fn logs(&self) -> Vec<InvestigationLog> {
        self.inner.lock().unwrap().logs.clone()
    }
}

#[async_trait]
impl InvestigationStore for MemoryStore {
    async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.event(id))
    }

    async fn update_event_progress(
        &self,
        id: Uuid,
        phase: i32,
        status: Option<EventStatus>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let event = inner
            .events
            .get_mut(&id)
            .ok_or_else(|| anyhow!("no such event {id}"))?;
        event.current_phase = phase;
        if let Some(status) = status {
            event.status = status;
        }
        event.updated_at = Utc::now();
        Ok(())
    }

    async fn list_active_events(&self) -> Result<Vec<Event>> {
        let inner = self.inner.lock().unwrap();
        let mut active: Vec<Event> = inner
            .events
            .values()
            .filter(|e| {
                matches!(e.status, EventStatus::Collecting | EventStatus::Analyzing)
            })
            .cloned()
            .collect();
        active.sort_by_key(|e| e.updated_at);
        Ok(active)
    }

    async fn branches_for_event(&self, event_id: Uuid) -> Result<Vec<Branch>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .branches
            .iter()
            .filter(|b| b.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn create_branch(&self, branch: NewBranch) -> Result<Branch> {
        let created = Branch {
            id: Uuid::new_v4(),
            event_id: branch.event_id,
            name: branch.name,
            description: branch.description,
            confidence_score: branch.confidence_score,
            color: branch.color,
            is_main: false,
            position_z: branch.position_z,
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().branches.push(created.clone());
        Ok(created)
    }

    async fn update_branch_confidence(&self, id: Uuid, score: f64) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let branch = inner
            .branches
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or_else(|| anyhow!("no such branch {id}"))?;
        branch.confidence_score = score;
        Ok(())
    }

    async fn evidence_urls(&self, event_id: Uuid) -> Result<HashSet<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .evidence
            .iter()
            .filter(|e| e.event_id == event_id)
            .filter_map(|e| e.source_url.clone())
            .collect())
    }

    async fn insert_evidence(&self, evidence: NewEvidence) -> Result<Evidence> {
        let created = Evidence {
            id: Uuid::new_v4(),
            event_id: evidence.event_id,
            branch_id: evidence.branch_id,
            title: evidence.title,
            content: evidence.content,
            evidence_type: evidence.evidence_type,
            source_url: evidence.source_url,
            source_credibility: evidence.source_credibility,
            ai_analysis: evidence.ai_analysis,
            parent_id: None,
            position_x: evidence.position_x,
            position_y: evidence.position_y,
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().evidence.push(created.clone());
        Ok(created)
    }

    async fn branch_credibility_scores(&self, branch_id: Uuid) -> Result<Vec<f64>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .evidence
            .iter()
            .filter(|e| e.branch_id == branch_id)
            .map(|e| e.source_credibility)
            .collect())
    }

    async fn insert_hypothesis(&self, hypothesis: NewHypothesis) -> Result<Hypothesis> {
        let now = Utc::now();
        let created = Hypothesis {
            id: Uuid::new_v4(),
            branch_id: hypothesis.branch_id,
            claim: hypothesis.claim,
            testable_prediction: hypothesis.testable_prediction,
            status: HypothesisStatus::Pending,
            confidence_impact: hypothesis.confidence_impact,
            reasoning: hypothesis.reasoning,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().unwrap().hypotheses.push(created.clone());
        Ok(created)
    }

    async fn get_hypothesis_context(
        &self,
        id: Uuid,
    ) -> Result<Option<(Hypothesis, Branch, Event)>> {
        let inner = self.inner.lock().unwrap();
        let Some(hypothesis) = inner.hypotheses.iter().find(|h| h.id == id).cloned() else {
            return Ok(None);
        };
        let branch = inner
            .branches
            .iter()
            .find(|b| b.id == hypothesis.branch_id)
            .cloned()
            .ok_or_else(|| anyhow!("hypothesis {id} has no branch"))?;
        let event = inner
            .events
            .get(&branch.event_id)
            .cloned()
            .ok_or_else(|| anyhow!("branch {} has no event", branch.id))?;
        Ok(Some((hypothesis, branch, event)))
    }

    async fn set_hypothesis_status(&self, id: Uuid, status: HypothesisStatus) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let hypothesis = inner
            .hypotheses
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| anyhow!("no such hypothesis {id}"))?;
        hypothesis.status = status;
        hypothesis.updated_at = Utc::now();
        Ok(())
    }

    async fn update_hypothesis_result(
        &self,
        id: Uuid,
        status: HypothesisStatus,
        confidence_impact: f64,
        reasoning: Option<&str>,
    ) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let hypothesis = inner
            .hypotheses
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| anyhow!("no such hypothesis {id}"))?;
        hypothesis.status = status;
        hypothesis.confidence_impact = confidence_impact;
        hypothesis.reasoning = reasoning.map(str::to_string);
        hypothesis.updated_at = Utc::now();
        Ok(())
    }

    async fn log(
        &self,
        event_id: Uuid,
        phase: i32,
        action: &str,
        details: Option<serde_json::Value>,
        level: LogLevel,
    ) {
        self.inner.lock().unwrap().logs.push(InvestigationLog {
            id: Uuid::new_v4(),
            event_id,
            phase,
            action: action.to_string(),
            details,
            level,
            created_at: Utc::now(),
        });
    }
}

// --- StaticSearcher ---

/// Canned search results, truncated to the requested count.
pub struct StaticSearcher {
    pub results: Vec<SearchHit>,
    pub answer: Option<String>,
}

impl StaticSearcher {
    pub fn new(results: Vec<SearchHit>) -> Self {
        Self {
            results,
            answer: None,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl WebSearcher for StaticSearcher {
    async fn search(
        &self,
        _query: &str,
        max_results: u32,
        _include_raw_content: bool,
    ) -> Result<(Vec<SearchHit>, Option<String>)> {
        let hits = self
            .results
            .iter()
            .take(max_results as usize)
            .cloned()
            .collect();
        Ok((hits, self.answer.clone()))
    }
}

/// Always fails, for exercising search-error propagation.
pub struct FailingSearcher;

#[async_trait]
impl WebSearcher for FailingSearcher {
    async fn search(
        &self,
        _query: &str,
        _max_results: u32,
        _include_raw_content: bool,
    ) -> Result<(Vec<SearchHit>, Option<String>)> {
        Err(anyhow!("search unavailable"))
    }
}

// --- ScriptedAnalyst ---

/// Scripted model replies. A `None` field makes the corresponding call fail,
/// exercising the caller's fallback path.
#[derive(Default)]
pub struct ScriptedAnalyst {
    pub analysis: Option<EventAnalysis>,
    pub credibility: Option<CredibilityReport>,
    pub relevance: Option<RelevanceReport>,
    pub hypotheses: Option<Vec<HypothesisDraft>>,
    pub evaluation: Option<HypothesisEvaluation>,
}

#[async_trait]
impl Analyst for ScriptedAnalyst {
    async fn analyze_event(&self, _title: &str, _description: &str) -> Result<EventAnalysis> {
        self.analysis
            .clone()
            .ok_or_else(|| anyhow!("scripted analyst: no analysis"))
    }

    async fn score_source(&self, _hit: &SearchHit) -> Result<CredibilityReport> {
        self.credibility
            .clone()
            .ok_or_else(|| anyhow!("scripted analyst: no credibility report"))
    }

    async fn assess_result(
        &self,
        _event_title: &str,
        _branch_name: Option<&str>,
        _hit: &SearchHit,
    ) -> Result<RelevanceReport> {
        self.relevance
            .clone()
            .ok_or_else(|| anyhow!("scripted analyst: no relevance report"))
    }

    async fn draft_hypotheses(
        &self,
        _event_title: &str,
        _evidence: &[(String, Option<String>)],
    ) -> Result<Vec<HypothesisDraft>> {
        self.hypotheses
            .clone()
            .ok_or_else(|| anyhow!("scripted analyst: no hypotheses"))
    }

    async fn evaluate_hypothesis(
        &self,
        _claim: &str,
        _prediction: &str,
        _hits: &[SearchHit],
    ) -> Result<HypothesisEvaluation> {
        self.evaluation
            .clone()
            .ok_or_else(|| anyhow!("scripted analyst: no evaluation"))
    }
}

/// A plausible search hit for tests.
pub fn hit(url: &str, title: &str) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        title: title.to_string(),
        content: format!("Reporting on {title}."),
        raw_content: None,
    }
}
