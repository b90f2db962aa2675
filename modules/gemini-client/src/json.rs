//! Helpers for pulling JSON out of model replies. Models frequently wrap
//! structured output in markdown code fences or pad it with prose; callers
//! that need a typed value go through [`extract_json`] and decide what to do
//! on `None` (every call site has a documented fallback).

use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid regex"));

/// Locate the JSON payload in a model reply: a ```json fence if present,
/// otherwise the outermost brace-delimited span.
pub fn json_span(text: &str) -> Option<&str> {
    if let Some(cap) = FENCE_RE.captures(text) {
        return Some(cap.get(1).expect("fence capture group").as_str());
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Deserialize the JSON payload embedded in a model reply.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Option<T> {
    let span = json_span(text)?;
    serde_json::from_str(span).ok()
}
