use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::core::config::Settings;

static PROM_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

pub(crate) const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub(crate) const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";
pub(crate) const ACCESS_DENIED_TOTAL: &str = "engine_access_denied_total";
pub(crate) const LOCKED_TOTAL: &str = "engine_locked_total";
pub(crate) const DATA_INTEGRITY_TOTAL: &str = "engine_data_integrity_total";
pub(crate) const SUBMISSIONS_TOTAL: &str = "engine_submissions_total";
pub(crate) const REVIEWS_TOTAL: &str = "engine_reviews_total";
pub(crate) const PROGRESS_CACHE_TOTAL: &str = "engine_progress_cache_total";

pub(crate) fn init(settings: &Settings) -> anyhow::Result<()> {
    if !settings.telemetry().prometheus_enabled {
        return Ok(());
    }

    if PROM_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    let _ = PROM_HANDLE.set(handle);
    describe_engine_metrics();
    Ok(())
}

pub(crate) fn render() -> Option<String> {
    PROM_HANDLE.get().map(|handle| handle.render())
}

fn describe_engine_metrics() {
    metrics::describe_counter!(HTTP_REQUESTS_TOTAL, "HTTP requests by route template and status");
    metrics::describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "HTTP request latency by route template"
    );
    metrics::describe_counter!(ACCESS_DENIED_TOTAL, "Requests rejected for missing entitlement");
    metrics::describe_counter!(LOCKED_TOTAL, "Requests rejected by sequential unlocking");
    metrics::describe_counter!(
        DATA_INTEGRITY_TOTAL,
        "Content graph inconsistencies found while evaluating unlocks"
    );
    metrics::describe_counter!(SUBMISSIONS_TOTAL, "Accepted task submissions");
    metrics::describe_counter!(REVIEWS_TOTAL, "Manual submission reviews");
    metrics::describe_counter!(PROGRESS_CACHE_TOTAL, "Progress cache lookups by outcome");
}
