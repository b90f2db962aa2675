//! Hypothesis tester behavior: verdict mapping, clamped impact application
//! and ownership enforcement.

use std::sync::Arc;

use uuid::Uuid;

use timelineforge_common::{ForgeError, HypothesisStatus};
use timelineforge_investigator::analysis::{HypothesisEvaluation, Verdict};
use timelineforge_investigator::fixtures::{hit, MemoryStore, ScriptedAnalyst, StaticSearcher};
use timelineforge_investigator::traits::InvestigationStore;
use timelineforge_investigator::HypothesisTester;
use timelineforge_store::NewHypothesis;

async fn seed_hypothesis(store: &MemoryStore, user: Uuid) -> (Uuid, Uuid) {
    let (_, main) = store.add_event(user, "Dam breach", "");
    let hypothesis = store
        .insert_hypothesis(NewHypothesis {
            branch_id: main.id,
            claim: "The spillway gate failed first".into(),
            testable_prediction: Some("Inspection records show a gate defect".into()),
            confidence_impact: 0.0,
            reasoning: None,
        })
        .await
        .unwrap();
    (hypothesis.id, main.id)
}

fn tester_with(
    store: Arc<MemoryStore>,
    evaluation: HypothesisEvaluation,
) -> HypothesisTester {
    let analyst = ScriptedAnalyst {
        evaluation: Some(evaluation),
        ..ScriptedAnalyst::default()
    };
    let searcher = StaticSearcher::new(vec![hit("https://gov.example/records", "Inspection records")]);
    HypothesisTester::new(store, Arc::new(searcher), Arc::new(analyst))
}

#[tokio::test]
async fn confirmed_verdict_applies_clamped_impact() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (hypothesis_id, branch_id) = seed_hypothesis(&store, user).await;

    // Branch starts at 50; push it near the ceiling first.
    store.update_branch_confidence(branch_id, 95.0).await.unwrap();

    let tester = tester_with(
        store.clone(),
        HypothesisEvaluation {
            verdict: Verdict::Confirmed,
            confidence_impact: 30.0,
            reasoning: Some("records match".into()),
            ..HypothesisEvaluation::default()
        },
    );

    let outcome = tester.test(hypothesis_id, user).await.unwrap();
    assert_eq!(outcome.verdict, Verdict::Confirmed);

    let hypothesis = store
        .hypotheses()
        .into_iter()
        .find(|h| h.id == hypothesis_id)
        .unwrap();
    assert_eq!(hypothesis.status, HypothesisStatus::Confirmed);
    assert_eq!(hypothesis.confidence_impact, 30.0);
    assert_eq!(hypothesis.reasoning.as_deref(), Some("records match"));

    // 95 + 30 clamps to 100.
    let branch = store.branches().into_iter().find(|b| b.id == branch_id).unwrap();
    assert_eq!(branch.confidence_score, 100.0);
}

#[tokio::test]
async fn refuted_verdict_lowers_branch_confidence() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (hypothesis_id, branch_id) = seed_hypothesis(&store, user).await;

    let tester = tester_with(
        store.clone(),
        HypothesisEvaluation {
            verdict: Verdict::Refuted,
            confidence_impact: -20.0,
            reasoning: Some("records contradict the claim".into()),
            ..HypothesisEvaluation::default()
        },
    );

    tester.test(hypothesis_id, user).await.unwrap();

    let hypothesis = store
        .hypotheses()
        .into_iter()
        .find(|h| h.id == hypothesis_id)
        .unwrap();
    assert_eq!(hypothesis.status, HypothesisStatus::Refuted);

    let branch = store.branches().into_iter().find(|b| b.id == branch_id).unwrap();
    assert_eq!(branch.confidence_score, 30.0);
}

#[tokio::test]
async fn inconclusive_verdict_returns_to_pending_without_touching_branch() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (hypothesis_id, branch_id) = seed_hypothesis(&store, user).await;

    let tester = tester_with(store.clone(), HypothesisEvaluation::default());
    let outcome = tester.test(hypothesis_id, user).await.unwrap();

    assert_eq!(outcome.verdict, Verdict::Inconclusive);
    assert_eq!(outcome.confidence_impact, 0.0);

    let hypothesis = store
        .hypotheses()
        .into_iter()
        .find(|h| h.id == hypothesis_id)
        .unwrap();
    assert_eq!(hypothesis.status, HypothesisStatus::Pending);

    let branch = store.branches().into_iter().find(|b| b.id == branch_id).unwrap();
    assert_eq!(branch.confidence_score, 50.0);
}

#[tokio::test]
async fn foreign_caller_modifies_nothing() {
    let owner = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (hypothesis_id, branch_id) = seed_hypothesis(&store, owner).await;

    let tester = tester_with(
        store.clone(),
        HypothesisEvaluation {
            verdict: Verdict::Confirmed,
            confidence_impact: 30.0,
            ..HypothesisEvaluation::default()
        },
    );

    let err = tester.test(hypothesis_id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ForgeError::Authorization(_)));

    let hypothesis = store
        .hypotheses()
        .into_iter()
        .find(|h| h.id == hypothesis_id)
        .unwrap();
    assert_eq!(hypothesis.status, HypothesisStatus::Pending);

    let branch = store.branches().into_iter().find(|b| b.id == branch_id).unwrap();
    assert_eq!(branch.confidence_score, 50.0);
}

#[tokio::test]
async fn missing_hypothesis_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let tester = tester_with(store, HypothesisEvaluation::default());

    let err = tester.test(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ForgeError::NotFound(_)));
}
