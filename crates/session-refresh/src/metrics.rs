//! Refresh counters
//!
//! - `session_refresh_total` (counter): label `outcome`
//!   (`success`, `rejected`, `timeout`, `network`, `missing_token`)
//! - `session_refresh_queued_total` (counter): callers that joined an open window
//! - `session_refresh_reused_total` (counter): 401s answered with a token that
//!   had already replaced the rejected one

/// Record the end of a coordination window.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("session_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a caller waiting on a refresh it did not start.
pub fn record_queued() {
    metrics::counter!("session_refresh_queued_total").increment(1);
}

/// Record a 401 resolved without a refresh call.
pub fn record_reused() {
    metrics::counter!("session_refresh_reused_total").increment(1);
}

/// Isolated recorder/handle pair; installing a global one would leak
/// counts between tests.
#[cfg(test)]
pub(crate) fn isolated_recorder() -> (
    metrics_exporter_prometheus::PrometheusRecorder,
    metrics_exporter_prometheus::PrometheusHandle,
) {
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    (recorder, handle)
}
