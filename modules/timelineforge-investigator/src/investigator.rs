//! The five-phase investigation orchestrator. Drives an event through
//! analysis, collection, branching, hypothesis generation and finalization,
//! persisting after every step so a crash mid-run leaves observable partial
//! progress.

use std::sync::Arc;

use anyhow::anyhow;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use timelineforge_common::{
    scoring, Branch, Event, EventStatus, EvidenceType, ForgeError, LogLevel, BRANCH_COLORS,
    NEUTRAL_CREDIBILITY,
};
use timelineforge_store::{NewBranch, NewEvidence, NewHypothesis};

use crate::analysis::{EventAnalysis, HypothesisDraft};
use crate::prompts::truncate;
use crate::traits::{Analyst, InvestigationStore, WebSearcher};

const MAX_QUERIES_PER_RUN: usize = 3;
const RESULTS_PER_QUERY: usize = 3;
const SEARCH_MAX_RESULTS: u32 = 5;
const MAX_NARRATIVE_BRANCHES: usize = 2;
const POSITION_X_STEP: f64 = 2.0;
const POSITION_Z_STEP: f64 = 4.0;

pub struct Investigator {
    store: Arc<dyn InvestigationStore>,
    searcher: Arc<dyn WebSearcher>,
    analyst: Arc<dyn Analyst>,
}

/// Stats from one orchestrator run.
#[derive(Debug, Default)]
pub struct InvestigationStats {
    pub queries_searched: u32,
    pub evidence_added: u32,
    pub evidence_skipped: u32,
    pub branches_created: u32,
    pub hypotheses_created: u32,
}

impl std::fmt::Display for InvestigationStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Investigation: {} queries searched, {} evidence added, {} skipped, {} branches created, {} hypotheses",
            self.queries_searched, self.evidence_added, self.evidence_skipped,
            self.branches_created, self.hypotheses_created,
        )
    }
}

impl Investigator {
    pub fn new(
        store: Arc<dyn InvestigationStore>,
        searcher: Arc<dyn WebSearcher>,
        analyst: Arc<dyn Analyst>,
    ) -> Self {
        Self {
            store,
            searcher,
            analyst,
        }
    }

    /// Drive the event through all five phases. Ownership is re-validated
    /// against `user_id` before any write. Partial progress persists on
    /// failure; the event keeps whatever phase and status it last wrote.
    pub async fn run(
        &self,
        event_id: Uuid,
        user_id: Uuid,
    ) -> Result<InvestigationStats, ForgeError> {
        let event = self
            .store
            .get_event(event_id)
            .await?
            .ok_or_else(|| ForgeError::NotFound("Event not found".to_string()))?;

        if event.user_id != user_id {
            return Err(ForgeError::Authorization("Access denied".to_string()));
        }

        info!(event_id = %event_id, title = event.title.as_str(), "Investigation starting");

        let branches = self.store.branches_for_event(event_id).await?;
        let main = branches
            .iter()
            .find(|b| b.is_main)
            .or_else(|| branches.first())
            .cloned()
            .ok_or_else(|| anyhow!("no branch found for event {event_id}"))?;

        let mut known_urls = self.store.evidence_urls(event_id).await?;
        let mut known_names: std::collections::HashSet<String> =
            branches.iter().map(|b| b.name.to_lowercase()).collect();

        let mut stats = InvestigationStats::default();

        let analysis = self.phase_analysis(&event).await?;
        let collected = self
            .phase_collection(&event, &main, &analysis, &mut known_urls, &mut stats)
            .await?;
        self.phase_branching(&event, &analysis, &mut known_names, &mut stats)
            .await?;
        self.phase_hypotheses(&event, &main, &analysis, &collected, &mut stats)
            .await?;
        self.phase_finalize(&event).await?;

        info!(event_id = %event_id, %stats, "Investigation complete");

        Ok(stats)
    }

    /// Phase 1: one model call over the event title and description.
    /// An unusable reply falls back to a single default query.
    async fn phase_analysis(&self, event: &Event) -> Result<EventAnalysis, ForgeError> {
        self.store
            .update_event_progress(event.id, 1, Some(EventStatus::Analyzing))
            .await?;
        self.store
            .log(event.id, 1, "Starting initial analysis of event", None, LogLevel::Info)
            .await;

        let analysis = match self.analyst.analyze_event(&event.title, &event.description).await {
            Ok(a) => a,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Event analysis failed, using default plan");
                self.store
                    .log(
                        event.id,
                        1,
                        "Analysis unusable, falling back to default query",
                        None,
                        LogLevel::Warning,
                    )
                    .await;
                EventAnalysis {
                    search_queries: vec![event.title.clone()],
                    ..EventAnalysis::default()
                }
            }
        };

        self.store
            .log(
                event.id,
                1,
                "Initial analysis complete",
                serde_json::to_value(&analysis).ok(),
                LogLevel::Info,
            )
            .await;

        Ok(analysis)
    }

    /// Phase 2: search, score, insert. Fully sequential; URL dedup against
    /// everything already stored for the event. Search failures abort the
    /// run; scoring failures degrade to a neutral score.
    async fn phase_collection(
        &self,
        event: &Event,
        main: &Branch,
        analysis: &EventAnalysis,
        known_urls: &mut std::collections::HashSet<String>,
        stats: &mut InvestigationStats,
    ) -> Result<Vec<(String, Option<String>)>, ForgeError> {
        self.store
            .update_event_progress(event.id, 2, Some(EventStatus::Collecting))
            .await?;
        self.store
            .log(event.id, 2, "Starting evidence collection", None, LogLevel::Info)
            .await;

        let queries: Vec<&String> = if analysis.search_queries.is_empty() {
            vec![&event.title]
        } else {
            analysis.search_queries.iter().take(MAX_QUERIES_PER_RUN).collect()
        };

        let mut collected = Vec::new();

        for query in queries {
            self.store
                .log(event.id, 2, &format!("Searching: {query}"), None, LogLevel::Info)
                .await;
            stats.queries_searched += 1;

            let (hits, _answer) = self
                .searcher
                .search(&format!("{} {}", event.title, query), SEARCH_MAX_RESULTS, false)
                .await?;

            for hit in hits.into_iter().take(RESULTS_PER_QUERY) {
                if known_urls.contains(&hit.url) {
                    info!(url = hit.url.as_str(), "Skipping existing evidence");
                    stats.evidence_skipped += 1;
                    continue;
                }

                let report = match self.analyst.score_source(&hit).await {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(url = hit.url.as_str(), error = %e, "Credibility scoring failed, using neutral score");
                        crate::analysis::CredibilityReport {
                            score: NEUTRAL_CREDIBILITY,
                            summary: Some(truncate(&hit.content, 300).to_string()),
                            key_claims: Vec::new(),
                        }
                    }
                };

                let content = report
                    .summary
                    .clone()
                    .or_else(|| Some(truncate(&hit.content, 500).to_string()));

                let evidence = self
                    .store
                    .insert_evidence(NewEvidence {
                        event_id: event.id,
                        branch_id: main.id,
                        title: hit.title.clone(),
                        content,
                        evidence_type: EvidenceType::Link,
                        source_url: Some(hit.url.clone()),
                        source_credibility: scoring::clamp_credibility(report.score),
                        ai_analysis: Some(json!({ "key_claims": report.key_claims })),
                        position_x: collected.len() as f64 * POSITION_X_STEP,
                        position_y: 0.0,
                    })
                    .await?;

                known_urls.insert(hit.url);
                stats.evidence_added += 1;
                self.store
                    .log(
                        event.id,
                        2,
                        &format!("Added evidence: {}...", truncate(&evidence.title, 50)),
                        None,
                        LogLevel::Info,
                    )
                    .await;
                collected.push((evidence.title, evidence.content));
            }
        }

        Ok(collected)
    }

    /// Phase 3: a branch per proposed narrative, capped at two, skipping
    /// names that already exist (case-insensitive exact match).
    async fn phase_branching(
        &self,
        event: &Event,
        analysis: &EventAnalysis,
        known_names: &mut std::collections::HashSet<String>,
        stats: &mut InvestigationStats,
    ) -> Result<(), ForgeError> {
        self.store.update_event_progress(event.id, 3, None).await?;
        self.store
            .log(event.id, 3, "Identifying competing narratives", None, LogLevel::Info)
            .await;

        for (i, narrative) in analysis.narratives.iter().take(MAX_NARRATIVE_BRANCHES).enumerate() {
            if known_names.contains(&narrative.name.to_lowercase()) {
                continue;
            }

            let branch = self
                .store
                .create_branch(NewBranch {
                    event_id: event.id,
                    name: narrative.name.clone(),
                    description: narrative.description.clone(),
                    confidence_score: NEUTRAL_CREDIBILITY,
                    color: BRANCH_COLORS[(i + 1) % BRANCH_COLORS.len()].to_string(),
                    position_z: (i + 1) as f64 * POSITION_Z_STEP,
                })
                .await?;

            known_names.insert(branch.name.to_lowercase());
            stats.branches_created += 1;
            self.store
                .log(
                    event.id,
                    3,
                    &format!("Created narrative branch: {}", branch.name),
                    None,
                    LogLevel::Info,
                )
                .await;
        }

        Ok(())
    }

    /// Phase 4: one model call over the evidence collected this run.
    /// Skipped entirely when nothing was collected; a reply with zero usable
    /// candidates synthesizes a single fallback hypothesis.
    async fn phase_hypotheses(
        &self,
        event: &Event,
        main: &Branch,
        analysis: &EventAnalysis,
        collected: &[(String, Option<String>)],
        stats: &mut InvestigationStats,
    ) -> Result<(), ForgeError> {
        self.store.update_event_progress(event.id, 4, None).await?;

        if collected.is_empty() {
            self.store
                .log(
                    event.id,
                    4,
                    "No evidence collected, skipping hypothesis generation",
                    None,
                    LogLevel::Warning,
                )
                .await;
            return Ok(());
        }

        self.store
            .log(event.id, 4, "Generating hypotheses", None, LogLevel::Info)
            .await;

        let mut drafts = self.analyst.draft_hypotheses(&event.title, collected).await?;

        if drafts.is_empty() {
            drafts.push(fallback_hypothesis(&event.title, analysis.narratives.len()));
            self.store
                .log(
                    event.id,
                    4,
                    "Model returned no hypotheses, synthesizing fallback",
                    None,
                    LogLevel::Warning,
                )
                .await;
        }

        for draft in drafts {
            let hypothesis = self
                .store
                .insert_hypothesis(NewHypothesis {
                    branch_id: main.id,
                    claim: draft.claim,
                    testable_prediction: draft.testable_prediction,
                    confidence_impact: 0.0,
                    reasoning: draft.evidence_needed,
                })
                .await?;

            stats.hypotheses_created += 1;
            self.store
                .log(
                    event.id,
                    4,
                    &format!("Generated hypothesis: {}...", truncate(&hypothesis.claim, 50)),
                    None,
                    LogLevel::Info,
                )
                .await;
        }

        Ok(())
    }

    /// Phase 5: mark complete and recompute every branch's confidence as the
    /// mean of its evidence credibility. Branches with no evidence keep their
    /// current score.
    async fn phase_finalize(&self, event: &Event) -> Result<(), ForgeError> {
        self.store
            .update_event_progress(event.id, 5, Some(EventStatus::Complete))
            .await?;
        self.store
            .log(event.id, 5, "Investigation complete", None, LogLevel::Info)
            .await;

        for branch in self.store.branches_for_event(event.id).await? {
            let scores = self.store.branch_credibility_scores(branch.id).await?;
            if let Some(mean) = scoring::mean_credibility(&scores) {
                self.store.update_branch_confidence(branch.id, mean).await?;
            }
        }

        Ok(())
    }
}

fn fallback_hypothesis(title: &str, narrative_count: usize) -> HypothesisDraft {
    HypothesisDraft {
        claim: format!("The collected evidence presents a consistent account of \"{title}\""),
        testable_prediction: Some(
            "Further independent sources will corroborate the evidence gathered so far".to_string(),
        ),
        evidence_needed: Some(format!(
            "Independent reporting distinguishing between the {narrative_count} candidate narratives"
        )),
    }
}
