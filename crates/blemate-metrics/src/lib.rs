//! Metrics for the BLE Mate driver.
//!
//! This crate declares every metric the driver records as a structured
//! [`Metric`] constant, so names and units live in one place. It re-exports
//! the `metrics` facade; install any recorder/exporter in the binary and call
//! [`describe_metrics`] once at startup.
//!
//! # Example
//!
//! ```rust
//! use blemate_metrics::{metric_defs, MetricLabels};
//!
//! let labels = MetricLabels::new("/dev/ttyUSB0").with_command("version");
//! metrics::counter!(metric_defs::COMMAND_SENT.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// How a metric is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
}

impl MetricKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use blemate_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const LINES: Metric = Metric::counter("blemate.test.lines")
///     .with_description("Lines seen")
///     .with_unit(Unit::Count)
///     .with_labels(&["port"]);
///
/// assert_eq!(LINES.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "blemate.command.sent").
    pub name: &'static str,
    /// The kind of metric.
    pub kind: MetricKind,
    /// Human-readable description.
    pub description: &'static str,
    /// Unit, if the value has one.
    pub unit: Option<Unit>,
    /// Expected label keys.
    pub labels: &'static [&'static str],
}

impl Metric {
    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Label keys every sample of this metric carries.
    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Hand name, unit and description to the installed recorder.
    pub fn describe(&self) {
        let Metric {
            name,
            kind,
            description,
            unit,
            ..
        } = *self;
        let unit = unit.unwrap_or(Unit::Count);
        match kind {
            MetricKind::Counter => {
                describe_counter!(name, unit, description);
            }
            MetricKind::Gauge => {
                describe_gauge!(name, unit, description);
            }
            MetricKind::Histogram => {
                describe_histogram!(name, unit, description);
            }
        }
    }
}

/// All metric definitions for the driver.
pub mod metric_defs {
    use super::{Metric, Unit};

    // ========================================================================
    // Command Metrics
    // ========================================================================

    /// Commands written to the module, resync lines excluded.
    ///
    /// Labels: port, command
    pub const COMMAND_SENT: Metric = Metric::counter("blemate.command.sent")
        .with_description("Commands written to the module")
        .with_unit(Unit::Count)
        .with_labels(&["port", "command"]);

    /// Final outcome of each command.
    ///
    /// Labels: port, command, outcome
    pub const COMMAND_OUTCOME: Metric = Metric::counter("blemate.command.outcome")
        .with_description("Commands finished, by outcome")
        .with_unit(Unit::Count)
        .with_labels(&["port", "command", "outcome"]);

    /// Wall-clock time from writing a command to its final outcome.
    ///
    /// Labels: port, command
    pub const COMMAND_DURATION: Metric = Metric::histogram("blemate.command.duration_ms")
        .with_description("Time from command write to outcome")
        .with_unit(Unit::Milliseconds)
        .with_labels(&["port", "command"]);

    /// Resync exchanges that got no line back in time.
    ///
    /// Labels: port
    pub const RESYNC_FAILED: Metric = Metric::counter("blemate.resync.failed")
        .with_description("Resync exchanges that timed out")
        .with_unit(Unit::Count)
        .with_labels(&["port"]);

    // ========================================================================
    // Line / Data Metrics
    // ========================================================================

    /// Completed lines received from the module.
    ///
    /// Labels: port
    pub const LINE_RECEIVED: Metric = Metric::counter("blemate.line.received")
        .with_description("Completed lines received from the module")
        .with_unit(Unit::Count)
        .with_labels(&["port"]);

    /// `SND` frames acknowledged by the module.
    ///
    /// Labels: port
    pub const DATA_FRAMES_SENT: Metric = Metric::counter("blemate.data.frames_sent")
        .with_description("Data frames acknowledged by the module")
        .with_unit(Unit::Count)
        .with_labels(&["port"]);

    /// Payload bytes carried by acknowledged frames.
    ///
    /// Labels: port
    pub const DATA_BYTES_SENT: Metric = Metric::counter("blemate.data.bytes_sent")
        .with_description("Payload bytes in acknowledged data frames")
        .with_unit(Unit::Bytes)
        .with_labels(&["port"]);

    /// Distinct addresses held after the last scan.
    ///
    /// Labels: port
    pub const REGISTRY_ADDRESSES: Metric = Metric::gauge("blemate.registry.addresses")
        .with_description("Distinct addresses found by the last scan")
        .with_unit(Unit::Count)
        .with_labels(&["port"]);

    /// All metrics, for [`crate::describe_metrics`].
    pub const ALL: &[&Metric] = &[
        &COMMAND_SENT,
        &COMMAND_OUTCOME,
        &COMMAND_DURATION,
        &RESYNC_FAILED,
        &LINE_RECEIVED,
        &DATA_FRAMES_SENT,
        &DATA_BYTES_SENT,
        &REGISTRY_ADDRESSES,
    ];
}

/// Labels identifying which driver instance (and command) a sample belongs to.
#[derive(Debug, Clone)]
pub struct MetricLabels {
    /// Port or endpoint the driver talks through.
    pub port: String,
    /// Command name, when the metric is per command.
    pub command: Option<&'static str>,
}

impl MetricLabels {
    /// Creates labels for the given port.
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            command: None,
        }
    }

    /// Returns a copy of these labels scoped to one command.
    pub fn with_command(&self, command: &'static str) -> Self {
        Self {
            port: self.port.clone(),
            command: Some(command),
        }
    }

    /// Key/value pairs for the `metrics` macros.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        let mut labels = vec![("port", self.port.clone())];
        if let Some(command) = self.command {
            labels.push(("command", command.to_string()));
        }
        labels
    }

    /// [`to_labels`](Self::to_labels) plus `extra`.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Describes all driver metrics.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_without_command() {
        let labels = MetricLabels::new("tcp://127.0.0.1:5000");
        assert_eq!(labels.to_labels(), vec![("port", "tcp://127.0.0.1:5000".to_string())]);
    }

    #[test]
    fn test_labels_with_command() {
        let labels = MetricLabels::new("/dev/ttyUSB0").with_command("scan_on");
        let label_vec = labels.to_labels();

        assert_eq!(label_vec.len(), 2);
        assert!(label_vec.contains(&("command", "scan_on".to_string())));
    }

    #[test]
    fn test_with_extra_labels() {
        let labels = MetricLabels::new("/dev/ttyUSB0").with_command("reset");
        let extended = labels.with(&[("outcome", "timeout".to_string())]);

        assert_eq!(extended.len(), 3);
        assert!(extended.contains(&("outcome", "timeout".to_string())));
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::COMMAND_SENT.name, "blemate.command.sent");
        assert_eq!(metric_defs::COMMAND_DURATION.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::COMMAND_DURATION.unit, Some(Unit::Milliseconds));
        assert_eq!(metric_defs::REGISTRY_ADDRESSES.kind, MetricKind::Gauge);
    }

    #[test]
    fn test_all_metrics_have_port_label() {
        for metric in metric_defs::ALL {
            assert!(metric.labels.contains(&"port"), "{} lacks port label", metric.name);
            assert!(!metric.description.is_empty());
        }
    }

    #[test]
    fn test_describe_without_recorder() {
        // No recorder installed: describing must be a no-op, not a panic.
        describe_metrics();
    }
}
