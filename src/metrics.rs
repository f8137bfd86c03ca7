/// Metrics and telemetry
///
/// Prometheus-compatible counters for the engagement core:
/// submissions, spam triage, reactions, quiz attempts, badges, and
/// moderation actions.
use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, Encoder, IntCounter, IntCounterVec, TextEncoder};

lazy_static! {
    /// Voice submissions by triage outcome ("clean" / "suspect")
    pub static ref VOICE_SUBMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "voice_submissions_total",
        "Total accepted voice submissions",
        &["triage"]
    )
    .unwrap();

    /// Reaction toggles by effect ("set" / "removed")
    pub static ref REACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "reactions_total",
        "Total reaction toggles",
        &["effect"]
    )
    .unwrap();

    /// Quiz attempts by correctness ("correct" / "incorrect")
    pub static ref QUIZ_ATTEMPTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "quiz_attempts_total",
        "Total quiz attempts",
        &["result"]
    )
    .unwrap();

    /// Badges awarded
    pub static ref BADGES_AWARDED_TOTAL: IntCounter = register_int_counter!(
        "badges_awarded_total",
        "Total quiz badges awarded"
    )
    .unwrap();

    /// Moderation actions by type
    pub static ref MODERATION_ACTIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "moderation_actions_total",
        "Total moderation actions applied",
        &["action"]
    )
    .unwrap();
}

/// Render all registered metrics in Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_register_and_gather() {
        VOICE_SUBMISSIONS_TOTAL.with_label_values(&["clean"]).inc();
        MODERATION_ACTIONS_TOTAL.with_label_values(&["approve"]).inc();

        let output = gather();
        assert!(output.contains("voice_submissions_total"));
    }
}
