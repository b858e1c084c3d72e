//! Prometheus metrics exposition
//!
//! The engine records these through the `metrics` facade:
//!
//! - `snipe_attempts_total` (counter): label `outcome`
//! - `snipe_attempt_duration_seconds` (histogram): label `outcome`
//! - `snipe_races_total` (counter): label `result`

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Attempt latency buckets, 5ms up to the longest sane request timeout.
const ATTEMPT_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

fn builder() -> PrometheusBuilder {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("snipe_attempt_duration_seconds".to_string()),
            ATTEMPT_BUCKETS,
        )
        .expect("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
///
/// `snipe_attempt_duration_seconds` gets explicit buckets so it renders as a
/// histogram with `_bucket` lines rather than a summary.
pub fn install_recorder() -> PrometheusHandle {
    builder()
        .install_recorder()
        .expect("failed to install Prometheus recorder")
}
