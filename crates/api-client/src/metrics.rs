//! Client-side auth retry counter
//!
//! - `api_auth_retries_total` (counter): label `outcome`
//!   (`success`, `failed_again`, `refresh_failed`)

/// Record what happened to a request after its first 401.
pub fn record_auth_retry(outcome: &'static str) {
    metrics::counter!("api_auth_retries_total", "outcome" => outcome).increment(1);
}

#[cfg(test)]
pub(crate) fn isolated_recorder() -> (
    metrics_exporter_prometheus::PrometheusRecorder,
    metrics_exporter_prometheus::PrometheusHandle,
) {
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    (recorder, handle)
}
