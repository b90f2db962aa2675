/// Clamp a credibility score into the valid [0, 100] range.
/// LLM replies occasionally return out-of-range or fractional nonsense;
/// every write path goes through this.
pub fn clamp_credibility(score: f64) -> f64 {
    if score.is_nan() {
        return NEUTRAL_CREDIBILITY;
    }
    score.clamp(0.0, 100.0)
}

/// Score assigned when credibility analysis fails or returns nothing usable.
pub const NEUTRAL_CREDIBILITY: f64 = 50.0;

/// Mean of the evidence credibility scores in a branch.
/// Returns `None` for an empty branch — the caller leaves the existing
/// confidence untouched in that case.
pub fn mean_credibility(scores: &[f64]) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// Apply a signed confidence impact to a branch score, clamped to [0, 100].
pub fn apply_impact(score: f64, impact: f64) -> f64 {
    (score + impact).clamp(0.0, 100.0)
}
