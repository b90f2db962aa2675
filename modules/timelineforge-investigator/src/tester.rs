//! Re-tests a single hypothesis: fresh search on its prediction, model
//! verdict, then status and branch-confidence updates.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use timelineforge_common::{scoring, ForgeError, HypothesisStatus, LogLevel};

use crate::analysis::Verdict;
use crate::traits::{Analyst, InvestigationStore, WebSearcher};

const SEARCH_MAX_RESULTS: u32 = 5;
const TESTER_PHASE: i32 = 0;

pub struct HypothesisTester {
    store: Arc<dyn InvestigationStore>,
    searcher: Arc<dyn WebSearcher>,
    analyst: Arc<dyn Analyst>,
}

#[derive(Debug, Serialize)]
pub struct TestOutcome {
    pub hypothesis_id: Uuid,
    pub verdict: Verdict,
    pub confidence_impact: f64,
    pub reasoning: Option<String>,
}

impl HypothesisTester {
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

    /// Test one hypothesis. Ownership is checked before any write; a caller
    /// who does not own the hypothesis's event gets 403 with no rows touched.
    pub async fn test(&self, hypothesis_id: Uuid, user_id: Uuid) -> Result<TestOutcome, ForgeError> {
        let (hypothesis, branch, event) = self
            .store
            .get_hypothesis_context(hypothesis_id)
            .await?
            .ok_or_else(|| ForgeError::NotFound("Hypothesis not found".to_string()))?;

        if event.user_id != user_id {
            return Err(ForgeError::Authorization("Access denied".to_string()));
        }

        info!(hypothesis_id = %hypothesis_id, claim = hypothesis.claim.as_str(), "Testing hypothesis");

        self.store
            .set_hypothesis_status(hypothesis_id, HypothesisStatus::Testing)
            .await?;

        let prediction = hypothesis.testable_prediction.as_deref().unwrap_or(&hypothesis.claim);

        let (hits, _answer) = self
            .searcher
            .search(
                &format!("{} {}", event.title, prediction),
                SEARCH_MAX_RESULTS,
                false,
            )
            .await?;

        let evaluation = self
            .analyst
            .evaluate_hypothesis(&hypothesis.claim, prediction, &hits)
            .await?;

        self.store
            .update_hypothesis_result(
                hypothesis_id,
                evaluation.verdict.to_status(),
                evaluation.confidence_impact,
                evaluation.reasoning.as_deref(),
            )
            .await?;

        if evaluation.confidence_impact != 0.0 {
            let new_score = scoring::apply_impact(branch.confidence_score, evaluation.confidence_impact);
            self.store.update_branch_confidence(branch.id, new_score).await?;
        }

        self.store
            .log(
                event.id,
                TESTER_PHASE,
                &format!("Tested hypothesis: verdict {:?}", evaluation.verdict),
                serde_json::to_value(&TestOutcome {
                    hypothesis_id,
                    verdict: evaluation.verdict,
                    confidence_impact: evaluation.confidence_impact,
                    reasoning: evaluation.reasoning.clone(),
                })
                .ok(),
                LogLevel::Info,
            )
            .await;

        info!(
            hypothesis_id = %hypothesis_id,
            verdict = ?evaluation.verdict,
            impact = evaluation.confidence_impact,
            "Hypothesis tested"
        );

        Ok(TestOutcome {
            hypothesis_id,
            verdict: evaluation.verdict,
            confidence_impact: evaluation.confidence_impact,
            reasoning: evaluation.reasoning,
        })
    }
}
