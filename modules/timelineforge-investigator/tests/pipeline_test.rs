//! Orchestrator tests against the in-memory fixtures: full runs, fallback
//! paths, dedup and partial-failure behavior.

use std::sync::Arc;

use uuid::Uuid;

use timelineforge_common::{EventStatus, ForgeError, HypothesisStatus, LogLevel};
use timelineforge_investigator::analysis::{
    CredibilityReport, EventAnalysis, HypothesisDraft, NarrativeSeed,
};
use timelineforge_investigator::fixtures::{
    hit, FailingSearcher, MemoryStore, ScriptedAnalyst, StaticSearcher,
};
use timelineforge_investigator::Investigator;

fn full_analyst() -> ScriptedAnalyst {
    ScriptedAnalyst {
        analysis: Some(EventAnalysis {
            main_claims: vec!["the dam failed at night".into()],
            parties: vec!["operator".into(), "regulator".into()],
            narratives: vec![
                NarrativeSeed {
                    name: "Maintenance failure".into(),
                    description: Some("Deferred maintenance caused the breach".into()),
                },
                NarrativeSeed {
                    name: "Extreme weather".into(),
                    description: Some("Rainfall exceeded design capacity".into()),
                },
            ],
            evidence_needed: vec!["inspection records".into()],
            search_queries: vec!["dam inspection report".into(), "rainfall records".into()],
        }),
        credibility: Some(CredibilityReport {
            score: 80.0,
            summary: Some("Official inspection summary".into()),
            key_claims: vec!["spillway gate failed".into()],
        }),
        hypotheses: Some(vec![HypothesisDraft {
            claim: "The spillway gate failed before the breach".into(),
            testable_prediction: Some("Inspection records show a gate defect".into()),
            evidence_needed: Some("Pre-incident inspection reports".into()),
        }]),
        ..ScriptedAnalyst::default()
    }
}

fn three_hits() -> StaticSearcher {
    StaticSearcher::new(vec![
        hit("https://news.example/a", "Dam breach investigated"),
        hit("https://gov.example/report", "Official inspection report"),
        hit("https://blog.example/opinion", "What really happened"),
    ])
}

#[tokio::test]
async fn full_run_completes_event() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (event, main) = store.add_event(user, "Dam breach", "Contested cause of the breach");

    let investigator = Investigator::new(
        store.clone(),
        Arc::new(three_hits()),
        Arc::new(full_analyst()),
    );

    let stats = investigator.run(event.id, user).await.unwrap();

    let done = store.event(event.id).unwrap();
    assert_eq!(done.status, EventStatus::Complete);
    assert_eq!(done.current_phase, 5);

    // Both queries return the same three hits; the second query's results
    // are all dedup'd by URL.
    assert_eq!(stats.queries_searched, 2);
    assert_eq!(stats.evidence_added, 3);
    assert_eq!(stats.evidence_skipped, 3);

    // Main branch plus the two narrative branches.
    let branches = store.branches();
    assert_eq!(branches.len(), 3);
    assert_eq!(stats.branches_created, 2);

    // All evidence landed on the main branch at score 80, so its confidence
    // becomes the mean; empty narrative branches keep their seed score.
    let main_after = branches.iter().find(|b| b.id == main.id).unwrap();
    assert_eq!(main_after.confidence_score, 80.0);
    for branch in branches.iter().filter(|b| !b.is_main) {
        assert_eq!(branch.confidence_score, 50.0);
    }

    let hypotheses = store.hypotheses();
    assert_eq!(hypotheses.len(), 1);
    assert_eq!(hypotheses[0].branch_id, main.id);
    assert_eq!(hypotheses[0].status, HypothesisStatus::Pending);
}

#[tokio::test]
async fn narrative_branches_get_cycled_colors_and_depth() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (event, _) = store.add_event(user, "Dam breach", "");

    let investigator = Investigator::new(
        store.clone(),
        Arc::new(StaticSearcher::empty()),
        Arc::new(full_analyst()),
    );
    investigator.run(event.id, user).await.unwrap();

    let mut created: Vec<_> = store.branches().into_iter().filter(|b| !b.is_main).collect();
    created.sort_by(|a, b| a.position_z.total_cmp(&b.position_z));

    assert_eq!(created[0].color, "#06b6d4");
    assert_eq!(created[0].position_z, 4.0);
    assert_eq!(created[1].color, "#22c55e");
    assert_eq!(created[1].position_z, 8.0);
}

#[tokio::test]
async fn unusable_analysis_falls_back_to_title_query() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (event, _) = store.add_event(user, "Test Event", "");

    // Analyst refuses everything except collection-phase needs.
    let analyst = ScriptedAnalyst {
        credibility: Some(CredibilityReport {
            score: 60.0,
            summary: None,
            key_claims: vec![],
        }),
        hypotheses: Some(vec![]),
        ..ScriptedAnalyst::default()
    };

    let searcher = StaticSearcher::new(vec![hit("https://a.example", "Coverage")]);
    let investigator = Investigator::new(store.clone(), Arc::new(searcher), Arc::new(analyst));

    let stats = investigator.run(event.id, user).await.unwrap();

    // One search using the title itself, no narrative branches.
    assert_eq!(stats.queries_searched, 1);
    assert_eq!(stats.evidence_added, 1);
    assert_eq!(stats.branches_created, 0);
    assert_eq!(store.event(event.id).unwrap().status, EventStatus::Complete);

    assert!(store
        .logs()
        .iter()
        .any(|l| l.level == LogLevel::Warning && l.phase == 1));
}

#[tokio::test]
async fn second_run_inserts_no_duplicate_urls() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (event, _) = store.add_event(user, "Dam breach", "");

    let investigator = Investigator::new(
        store.clone(),
        Arc::new(three_hits()),
        Arc::new(full_analyst()),
    );

    let first = investigator.run(event.id, user).await.unwrap();
    assert_eq!(first.evidence_added, 3);

    let second = investigator.run(event.id, user).await.unwrap();
    assert_eq!(second.evidence_added, 0);
    assert_eq!(second.evidence_skipped, 6);
    assert_eq!(store.evidence().len(), 3);

    // Branch names from the first run are also dedup'd case-insensitively.
    assert_eq!(second.branches_created, 0);
    assert_eq!(store.branches().len(), 3);
}

#[tokio::test]
async fn existing_branch_names_are_not_recreated() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (event, _) = store.add_event(user, "Dam breach", "");

    let analyst = ScriptedAnalyst {
        analysis: Some(EventAnalysis {
            narratives: vec![
                NarrativeSeed {
                    // Case-insensitive match against the seeded main branch.
                    name: "MAIN TIMELINE".into(),
                    description: None,
                },
                NarrativeSeed {
                    name: "Alternative account".into(),
                    description: None,
                },
            ],
            search_queries: vec!["q".into()],
            ..EventAnalysis::default()
        }),
        hypotheses: Some(vec![]),
        ..ScriptedAnalyst::default()
    };

    let investigator = Investigator::new(
        store.clone(),
        Arc::new(StaticSearcher::empty()),
        Arc::new(analyst),
    );
    let stats = investigator.run(event.id, user).await.unwrap();

    assert_eq!(stats.branches_created, 1);
    let names: Vec<String> = store.branches().into_iter().map(|b| b.name).collect();
    assert!(names.contains(&"Alternative account".to_string()));
}

#[tokio::test]
async fn no_evidence_skips_hypothesis_generation() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (event, _) = store.add_event(user, "Quiet event", "");

    // Hypotheses are scripted, but the phase must never ask for them.
    let investigator = Investigator::new(
        store.clone(),
        Arc::new(StaticSearcher::empty()),
        Arc::new(full_analyst()),
    );
    let stats = investigator.run(event.id, user).await.unwrap();

    assert_eq!(stats.evidence_added, 0);
    assert_eq!(stats.hypotheses_created, 0);
    assert!(store.hypotheses().is_empty());
    assert_eq!(store.event(event.id).unwrap().status, EventStatus::Complete);
}

#[tokio::test]
async fn empty_hypothesis_reply_synthesizes_fallback() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (event, main) = store.add_event(user, "Dam breach", "");

    let analyst = ScriptedAnalyst {
        hypotheses: Some(vec![]),
        ..full_analyst()
    };

    let investigator = Investigator::new(store.clone(), Arc::new(three_hits()), Arc::new(analyst));
    let stats = investigator.run(event.id, user).await.unwrap();

    assert_eq!(stats.hypotheses_created, 1);
    let hypotheses = store.hypotheses();
    assert_eq!(hypotheses.len(), 1);
    assert_eq!(hypotheses[0].branch_id, main.id);
    assert!(hypotheses[0].claim.contains("Dam breach"));
}

#[tokio::test]
async fn scoring_failure_degrades_to_neutral_credibility() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (event, _) = store.add_event(user, "Dam breach", "");

    let analyst = ScriptedAnalyst {
        credibility: None, // every scoring call fails
        hypotheses: Some(vec![]),
        ..full_analyst()
    };

    let searcher = StaticSearcher::new(vec![hit("https://a.example", "Coverage")]);
    let investigator = Investigator::new(store.clone(), Arc::new(searcher), Arc::new(analyst));
    investigator.run(event.id, user).await.unwrap();

    let evidence = store.evidence();
    assert_eq!(evidence.len(), 1);
    assert_eq!(evidence[0].source_credibility, 50.0);
}

#[tokio::test]
async fn out_of_range_scores_are_clamped_on_write() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (event, _) = store.add_event(user, "Dam breach", "");

    let analyst = ScriptedAnalyst {
        credibility: Some(CredibilityReport {
            score: 150.0,
            summary: None,
            key_claims: vec![],
        }),
        hypotheses: Some(vec![]),
        ..full_analyst()
    };

    let searcher = StaticSearcher::new(vec![hit("https://a.example", "Coverage")]);
    let investigator = Investigator::new(store.clone(), Arc::new(searcher), Arc::new(analyst));
    investigator.run(event.id, user).await.unwrap();

    assert_eq!(store.evidence()[0].source_credibility, 100.0);
}

#[tokio::test]
async fn search_failure_leaves_partial_progress() {
    let user = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (event, _) = store.add_event(user, "Dam breach", "");

    let investigator = Investigator::new(
        store.clone(),
        Arc::new(FailingSearcher),
        Arc::new(full_analyst()),
    );

    let err = investigator.run(event.id, user).await.unwrap_err();
    assert!(matches!(err, ForgeError::Anyhow(_)));

    // The run died in phase 2; the event keeps the state it last wrote.
    let stranded = store.event(event.id).unwrap();
    assert_eq!(stranded.current_phase, 2);
    assert_eq!(stranded.status, EventStatus::Collecting);
}

#[tokio::test]
async fn foreign_caller_is_rejected_before_any_write() {
    let owner = Uuid::new_v4();
    let store = Arc::new(MemoryStore::new());
    let (event, _) = store.add_event(owner, "Dam breach", "");

    let investigator = Investigator::new(
        store.clone(),
        Arc::new(three_hits()),
        Arc::new(full_analyst()),
    );

    let err = investigator.run(event.id, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ForgeError::Authorization(_)));

    let untouched = store.event(event.id).unwrap();
    assert_eq!(untouched.status, EventStatus::Idle);
    assert_eq!(untouched.current_phase, 0);
    assert!(store.logs().is_empty());
}

#[tokio::test]
async fn unknown_event_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let investigator = Investigator::new(
        store,
        Arc::new(StaticSearcher::empty()),
        Arc::new(ScriptedAnalyst::default()),
    );

    let err = investigator.run(Uuid::new_v4(), Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, ForgeError::NotFound(_)));
}
