//! Structured output types for the model calls in the pipeline. Every field
//! the model might omit carries a serde default; callers decide what a missing
//! or unparseable reply falls back to.

use serde::{Deserialize, Serialize};

use timelineforge_common::HypothesisStatus;

/// Phase-1 reply: claims, parties, candidate narratives and search queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventAnalysis {
    #[serde(default)]
    pub main_claims: Vec<String>,
    #[serde(default)]
    pub parties: Vec<String>,
    #[serde(default)]
    pub narratives: Vec<NarrativeSeed>,
    #[serde(default)]
    pub evidence_needed: Vec<String>,
    #[serde(default)]
    pub search_queries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeSeed {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Phase-2 reply: credibility score and summary for one search result.
#[derive(Debug, Clone, Deserialize)]
pub struct CredibilityReport {
    #[serde(default = "neutral_score")]
    pub score: f64,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub key_claims: Vec<String>,
}

fn neutral_score() -> f64 {
    timelineforge_common::scoring::NEUTRAL_CREDIBILITY
}

/// Evidence-collector reply: credibility plus narrative fit.
#[derive(Debug, Clone, Deserialize)]
pub struct RelevanceReport {
    #[serde(default = "neutral_score")]
    pub credibility_score: f64,
    #[serde(default)]
    pub supports_narrative: Option<bool>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Phase-4 reply wrapper.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HypothesisBatch {
    #[serde(default)]
    pub hypotheses: Vec<HypothesisDraft>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HypothesisDraft {
    pub claim: String,
    #[serde(default)]
    pub testable_prediction: Option<String>,
    #[serde(default)]
    pub evidence_needed: Option<String>,
}

/// Hypothesis-tester reply.
#[derive(Debug, Clone, Deserialize)]
pub struct HypothesisEvaluation {
    #[serde(default)]
    pub verdict: Verdict,
    #[serde(default)]
    pub confidence_impact: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub supporting_evidence: Vec<String>,
    #[serde(default)]
    pub refuting_evidence: Vec<String>,
}

impl Default for HypothesisEvaluation {
    fn default() -> Self {
        Self {
            verdict: Verdict::Inconclusive,
            confidence_impact: 0.0,
            reasoning: Some("Unable to evaluate".to_string()),
            supporting_evidence: Vec::new(),
            refuting_evidence: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Confirmed,
    Refuted,
    #[default]
    Inconclusive,
}

impl Verdict {
    /// Inconclusive sends the hypothesis back to the pending queue.
    pub fn to_status(self) -> HypothesisStatus {
        match self {
            Verdict::Confirmed => HypothesisStatus::Confirmed,
            Verdict::Refuted => HypothesisStatus::Refuted,
            Verdict::Inconclusive => HypothesisStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_tolerates_sparse_reply() {
        let parsed: EventAnalysis =
            serde_json::from_str(r#"{"search_queries": ["who was there"]}"#).unwrap();
        assert_eq!(parsed.search_queries, vec!["who was there"]);
        assert!(parsed.narratives.is_empty());
    }

    #[test]
    fn credibility_defaults_to_neutral() {
        let parsed: CredibilityReport = serde_json::from_str(r#"{"summary": "ok"}"#).unwrap();
        assert_eq!(parsed.score, 50.0);
        assert!(parsed.key_claims.is_empty());
    }

    #[test]
    fn verdict_maps_inconclusive_to_pending() {
        assert_eq!(Verdict::Inconclusive.to_status(), HypothesisStatus::Pending);
        assert_eq!(Verdict::Confirmed.to_status(), HypothesisStatus::Confirmed);
        assert_eq!(Verdict::Refuted.to_status(), HypothesisStatus::Refuted);
    }

    #[test]
    fn unknown_verdict_fails_parse() {
        let raw = r#"{"verdict": "maybe", "confidence_impact": 5}"#;
        assert!(serde_json::from_str::<HypothesisEvaluation>(raw).is_err());
    }
}
