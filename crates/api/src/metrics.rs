use anyhow::Result;
use metrics::describe_counter;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub fn describe() {
    describe_counter!(
        "rugwatch_reports_submitted_total",
        "Wallet report submissions accepted (new cases and duplicates)."
    );
    describe_counter!(
        "rugwatch_duplicate_reports_total",
        "Submissions that landed on an already-known wallet address."
    );
    describe_counter!(
        "rugwatch_reports_verified_total",
        "Moderation (verify) actions applied."
    );
    describe_counter!(
        "rugwatch_rate_limited_total",
        "Requests rejected by the per-client rate limiter."
    );
}

/// Install a global Prometheus recorder exactly once and return a handle for
/// rendering `/metrics`.
///
/// Note: `PrometheusBuilder::install_recorder` requires the caller to run
/// upkeep periodically. We run upkeep opportunistically on each `/metrics`
/// request.
pub fn init_global() -> Result<PrometheusHandle> {
    let handle = PROM_HANDLE.get_or_init(|| {
        // Descriptor registration is idempotent, so it's fine to call each time.
        describe();

        PrometheusBuilder::new()
            .install_recorder()
            .expect("failed to install Prometheus recorder")
    });

    Ok(handle.clone())
}
