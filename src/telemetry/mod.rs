//! Telemetry for workflow runs
//!
//! Logs go through `tracing`. Metrics are structured `tracing` events on the
//! `metrics` target, so any subscriber can pick them up without a separate
//! exporter.

use std::time::Instant;

/// Configuration for the telemetry system
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Name of the service
    pub service_name: String,
    /// Enable ANSI console output with targets
    pub enable_console: bool,
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "pm-workflows".to_string(),
            enable_console: true,
            log_level: "info".to_string(),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_telemetry(
    config: TelemetryConfig,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        );

    if config.enable_console {
        builder.with_target(true).with_ansi(true).try_init()?;
    } else {
        builder.with_ansi(false).try_init()?;
    }

    tracing::debug!("Telemetry initialized for {}", config.service_name);
    Ok(())
}

/// Add a single metric with tags to the telemetry system
pub fn add_metric(name: &str, value: f64, tags: &[(&str, String)]) {
    let tags_str = tags
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(",");

    tracing::info!(
        target: "metrics",
        metric_name = %name,
        metric_value = %value,
        metric_tags = %tags_str,
        "Recorded metric"
    );
}

/// Guard that reports how long an operation took when dropped
#[derive(Debug)]
pub struct SpanDuration {
    name: &'static str,
    start: Instant,
}

impl SpanDuration {
    /// Time elapsed so far
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for SpanDuration {
    fn drop(&mut self) {
        tracing::info!(
            target: "metrics",
            duration_ms = self.elapsed_ms(),
            operation = self.name,
            "Operation completed"
        );
    }
}

/// A span duration tracker for measuring operation durations
pub fn span_duration(name: &'static str) -> SpanDuration {
    SpanDuration {
        name,
        start: Instant::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_without_subscriber() {
        add_metric("workflow_fanout_size", 3.0, &[("process_id", "p".to_string())]);
        let guard = span_duration("test_operation");
        assert!(guard.elapsed_ms() >= 0.0);
    }

    #[test]
    fn test_default_config() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "pm-workflows");
        assert_eq!(config.log_level, "info");
    }
}
