//! Evidence collector: per-result assessment with graceful degradation.

use std::sync::Arc;

use timelineforge_common::ForgeError;
use timelineforge_investigator::analysis::RelevanceReport;
use timelineforge_investigator::fixtures::{hit, FailingSearcher, ScriptedAnalyst, StaticSearcher};
use timelineforge_investigator::EvidenceCollector;

#[tokio::test]
async fn assessed_results_carry_credibility_and_narrative_fit() {
    let analyst = ScriptedAnalyst {
        relevance: Some(RelevanceReport {
            credibility_score: 85.0,
            supports_narrative: Some(true),
            summary: Some("Corroborates the official account".into()),
        }),
        ..ScriptedAnalyst::default()
    };
    let searcher = StaticSearcher::new(vec![
        hit("https://gov.example/report", "Official report"),
        hit("https://news.example/a", "News coverage"),
    ]);

    let collector = EvidenceCollector::new(Arc::new(searcher), Arc::new(analyst));
    let outcome = collector
        .collect("inspection findings", "Dam breach", Some("Official account"), 5)
        .await
        .unwrap();

    assert_eq!(outcome.query, "inspection findings");
    assert_eq!(outcome.results.len(), 2);
    for result in &outcome.results {
        assert_eq!(result.source_credibility, 85.0);
        assert_eq!(result.supports_narrative, Some(true));
        assert_eq!(result.content, "Corroborates the official account");
    }
}

#[tokio::test]
async fn assessment_failure_degrades_to_neutral() {
    let searcher = StaticSearcher::new(vec![hit("https://a.example", "Coverage")]);
    let collector = EvidenceCollector::new(
        Arc::new(searcher),
        Arc::new(ScriptedAnalyst::default()), // every assessment fails
    );

    let outcome = collector.collect("anything", "Dam breach", None, 5).await.unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].source_credibility, 50.0);
    assert_eq!(outcome.results[0].supports_narrative, None);
}

#[tokio::test]
async fn out_of_range_assessment_is_clamped() {
    let analyst = ScriptedAnalyst {
        relevance: Some(RelevanceReport {
            credibility_score: -10.0,
            supports_narrative: None,
            summary: None,
        }),
        ..ScriptedAnalyst::default()
    };
    let searcher = StaticSearcher::new(vec![hit("https://a.example", "Coverage")]);
    let collector = EvidenceCollector::new(Arc::new(searcher), Arc::new(analyst));

    let outcome = collector.collect("q", "Event", None, 5).await.unwrap();
    assert_eq!(outcome.results[0].source_credibility, 0.0);
}

#[tokio::test]
async fn search_failure_fails_the_request() {
    let collector = EvidenceCollector::new(
        Arc::new(FailingSearcher),
        Arc::new(ScriptedAnalyst::default()),
    );

    let err = collector.collect("q", "Event", None, 5).await.unwrap_err();
    assert!(matches!(err, ForgeError::Anyhow(_)));
}
