//! Prometheus metrics for the aggregation run
//!
//! Metric names live in one enum so call sites never spell out strings.
//! Recording is a no-op until `init_metrics` installs a recorder.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

use crate::common::constants::METRICS_ADDR_ENV;

static INIT: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Sources
    SourceRunsSuccess,
    SourceRunsError,
    SourceRawEvents,
    SourceDuration,

    // Date normalization
    DatesResolvedDeterministic,
    DatesResolvedByResolver,
    DatesUnresolved,
    DatesRolledOver,
    DatesExpanded,

    // Resolver
    ResolverCalls,
    ResolverFailures,
    ResolverDuration,

    // Consolidation
    ConsolidatedEvents,
    DuplicatesDropped,
    RunDuration,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricName::SourceRunsSuccess => "mms_source_runs_success_total",
            MetricName::SourceRunsError => "mms_source_runs_error_total",
            MetricName::SourceRawEvents => "mms_source_raw_events_total",
            MetricName::SourceDuration => "mms_source_duration_seconds",
            MetricName::DatesResolvedDeterministic => "mms_dates_resolved_deterministic_total",
            MetricName::DatesResolvedByResolver => "mms_dates_resolved_by_resolver_total",
            MetricName::DatesUnresolved => "mms_dates_unresolved_total",
            MetricName::DatesRolledOver => "mms_dates_rolled_over_total",
            MetricName::DatesExpanded => "mms_dates_expanded_total",
            MetricName::ResolverCalls => "mms_resolver_calls_total",
            MetricName::ResolverFailures => "mms_resolver_failures_total",
            MetricName::ResolverDuration => "mms_resolver_duration_seconds",
            MetricName::ConsolidatedEvents => "mms_consolidated_events",
            MetricName::DuplicatesDropped => "mms_duplicates_dropped_total",
            MetricName::RunDuration => "mms_run_duration_seconds",
        };
        write!(f, "{}", name)
    }
}

impl MetricName {
    pub fn as_str(&self) -> String {
        self.to_string()
    }
}

/// Install the Prometheus exporter when `MMS_METRICS_ADDR` is set.
///
/// Idempotent. Without the variable the `metrics` macros stay no-ops.
pub fn init_metrics() {
    INIT.call_once(|| {
        let addr_str = match std::env::var(METRICS_ADDR_ENV) {
            Ok(v) if !v.trim().is_empty() => v,
            _ => return,
        };

        let addr: SocketAddr = match addr_str.parse() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Invalid metrics addr '{}': {}", addr_str, e);
                return;
            }
        };

        let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
        match builder.install() {
            Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
            Err(e) => warn!("Prometheus exporter install failed: {}", e),
        }
    });
}

pub struct SourceMetrics;

impl SourceMetrics {
    pub fn record_success(source_id: &str, raw_events: usize, duration_secs: f64) {
        let source = source_id.to_string();
        ::metrics::counter!(MetricName::SourceRunsSuccess.as_str(), "source" => source.clone())
            .increment(1);
        ::metrics::counter!(MetricName::SourceRawEvents.as_str(), "source" => source.clone())
            .increment(raw_events as u64);
        ::metrics::histogram!(MetricName::SourceDuration.as_str(), "source" => source)
            .record(duration_secs);
    }

    pub fn record_error(source_id: &str) {
        ::metrics::counter!(MetricName::SourceRunsError.as_str(), "source" => source_id.to_string())
            .increment(1);
    }
}

pub struct DateMetrics;

impl DateMetrics {
    pub fn record_deterministic(source_id: &str) {
        ::metrics::counter!(
            MetricName::DatesResolvedDeterministic.as_str(),
            "source" => source_id.to_string()
        )
        .increment(1);
    }

    pub fn record_resolver_success(source_id: &str) {
        ::metrics::counter!(
            MetricName::DatesResolvedByResolver.as_str(),
            "source" => source_id.to_string()
        )
        .increment(1);
    }

    pub fn record_unresolved(source_id: &str, reason: &str) {
        ::metrics::counter!(
            MetricName::DatesUnresolved.as_str(),
            "source" => source_id.to_string(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }

    pub fn record_rollover() {
        ::metrics::counter!(MetricName::DatesRolledOver.as_str()).increment(1);
    }

    pub fn record_expansion() {
        ::metrics::counter!(MetricName::DatesExpanded.as_str()).increment(1);
    }
}

pub struct ResolverMetrics;

impl ResolverMetrics {
    pub fn record_call(duration_secs: f64, ok: bool) {
        ::metrics::counter!(MetricName::ResolverCalls.as_str()).increment(1);
        if !ok {
            ::metrics::counter!(MetricName::ResolverFailures.as_str()).increment(1);
        }
        ::metrics::histogram!(MetricName::ResolverDuration.as_str()).record(duration_secs);
    }
}

pub struct RunMetrics;

impl RunMetrics {
    pub fn record_consolidation(listed: usize, duplicates: usize) {
        ::metrics::gauge!(MetricName::ConsolidatedEvents.as_str()).set(listed as f64);
        ::metrics::counter!(MetricName::DuplicatesDropped.as_str()).increment(duplicates as u64);
    }

    pub fn record_run_duration(duration_secs: f64) {
        ::metrics::histogram!(MetricName::RunDuration.as_str()).record(duration_secs);
    }
}
