use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "specdoc_jobs_submitted_total",
            Unit::Count,
            "Total number of documentation jobs accepted and queued."
        );
        describe_counter!(
            "specdoc_jobs_completed_total",
            Unit::Count,
            "Total number of documentation jobs that completed."
        );
        describe_counter!(
            "specdoc_jobs_failed_total",
            Unit::Count,
            "Total number of documentation jobs that failed, labelled by step."
        );
        describe_counter!(
            "specdoc_jobs_cancelled_total",
            Unit::Count,
            "Total number of documentation jobs cancelled while queued or between steps."
        );
        describe_counter!(
            "specdoc_retries_total",
            Unit::Count,
            "Total number of retried upstream or storage calls, labelled by operation."
        );
        describe_counter!(
            "specdoc_jobs_purged_total",
            Unit::Count,
            "Total number of expired terminal jobs removed by the expiry sweep."
        );
        describe_histogram!(
            "specdoc_pipeline_step_ms",
            Unit::Milliseconds,
            "Pipeline step latency in milliseconds, labelled by step."
        );
    });
}
