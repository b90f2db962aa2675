//! Prompt builders for the investigation pipeline. Each returns the full text
//! sent as a single user turn; the expected JSON shape is spelled out inline
//! so replies parse into the types in [`crate::analysis`].

use crate::traits::SearchHit;

const CONTENT_SNIPPET_LEN: usize = 1500;
const SUMMARY_SNIPPET_LEN: usize = 100;
const EVIDENCE_SNIPPET_LEN: usize = 500;

/// Truncate on a char boundary; model context is budgeted per snippet.
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn event_analysis(title: &str, description: &str) -> String {
    format!(
        r#"Analyze this contested event and identify:
1. The main claims being made
2. Key parties involved
3. Potential competing narratives
4. What evidence would be needed to verify/refute claims

Event: {title}
Description: {description}

Respond with JSON:
{{
  "main_claims": ["claim1", "claim2"],
  "parties": ["party1", "party2"],
  "narratives": [{{"name": "narrative name", "description": "brief description"}}],
  "evidence_needed": ["type of evidence 1", "type of evidence 2"],
  "search_queries": ["search query 1", "search query 2", "search query 3"]
}}"#
    )
}

pub fn source_credibility(hit: &SearchHit) -> String {
    format!(
        r#"Rate the credibility of this source (0-100) and summarize key claims.
Source: {}
Title: {}
Content: {}

JSON response: {{"score": number, "summary": "string", "key_claims": ["claim1"]}}"#,
        hit.url,
        hit.title,
        truncate(&hit.content, CONTENT_SNIPPET_LEN),
    )
}

pub fn result_relevance(event_title: &str, branch_name: Option<&str>, hit: &SearchHit) -> String {
    let narrative_line = match branch_name {
        Some(name) => format!("Consider how it relates to this narrative: \"{name}\"\n"),
        None => String::new(),
    };

    format!(
        r#"Analyze this search result for an investigation into "{event_title}".
{narrative_line}
Source: {}
Title: {}
Content: {}

Provide a JSON response with:
{{
  "credibility_score": number (0-100 based on source reliability, citation quality, author expertise),
  "supports_narrative": boolean | null (true if supports, false if contradicts, null if neutral/unclear),
  "summary": "brief summary of the key claims or evidence"
}}"#,
        hit.url,
        hit.title,
        truncate(&hit.content, 2000),
    )
}

pub fn hypothesis_generation(event_title: &str, evidence: &[(String, Option<String>)]) -> String {
    let summaries = evidence
        .iter()
        .map(|(title, content)| {
            let snippet = content.as_deref().map(|c| truncate(c, SUMMARY_SNIPPET_LEN)).unwrap_or("");
            format!("- {title}: {snippet}")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Based on this evidence collected about "{event_title}", generate 3 testable hypotheses.

Evidence summaries:
{summaries}

For each hypothesis, provide:
1. A clear claim
2. A testable prediction
3. What evidence would confirm or refute it

JSON response:
{{
  "hypotheses": [
    {{"claim": "string", "testable_prediction": "string", "evidence_needed": "string"}}
  ]
}}"#
    )
}

pub fn hypothesis_evaluation(claim: &str, prediction: &str, hits: &[SearchHit]) -> String {
    let evidence = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "\n{}. {}\n   Source: {}\n   Content: {}\n",
                i + 1,
                hit.title,
                hit.url,
                truncate(&hit.content, EVIDENCE_SNIPPET_LEN),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Evaluate this hypothesis against the following evidence.

HYPOTHESIS:
Claim: {claim}
Testable Prediction: {prediction}

EVIDENCE FOUND:
{evidence}

Based on this evidence, determine:
1. Is the hypothesis CONFIRMED, REFUTED, or INCONCLUSIVE?
2. What is the confidence impact (-30 to +30)?
3. Which evidence supports or refutes it?

Respond with JSON:
{{
  "verdict": "confirmed" | "refuted" | "inconclusive",
  "confidence_impact": number,
  "reasoning": "detailed explanation",
  "supporting_evidence": ["title of supporting sources"],
  "refuting_evidence": ["title of refuting sources"]
}}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 5), "héllo");
        assert_eq!(truncate("short", 100), "short");
    }

    #[test]
    fn analysis_prompt_includes_event() {
        let prompt = event_analysis("Bridge collapse", "Night of March 3rd");
        assert!(prompt.contains("Event: Bridge collapse"));
        assert!(prompt.contains("search_queries"));
    }

    #[test]
    fn relevance_prompt_mentions_branch_when_given() {
        let hit = SearchHit {
            url: "https://a.example".into(),
            title: "A".into(),
            content: "text".into(),
            raw_content: None,
        };
        let with = result_relevance("Event", Some("Official account"), &hit);
        assert!(with.contains("Official account"));
        let without = result_relevance("Event", None, &hit);
        assert!(!without.contains("narrative:"));
    }
}
