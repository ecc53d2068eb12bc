//! JSON documents for the observability endpoint.
//!
//! The HTTP layer maps three routes onto [`ObservabilityEndpoint`]:
//!
//! - read → [`ObservabilityEndpoint::report`]
//! - capture baseline (optional label) → [`ObservabilityEndpoint::capture_baseline`]
//! - clear (optionally including the baseline) → [`ObservabilityEndpoint::clear`]
//!
//! Authentication and transport are the caller's concern.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::baseline::{BaselineSnapshot, PerformanceComparison};
use super::collector::{DEFAULT_BASELINE_LABEL, MetricsCollector};
use super::stats::{MetricSample, MetricsSummary};
use crate::Result;

/// Full export of a [`MetricsCollector`].
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub summary: MetricsSummary,
    pub recent_metrics: Vec<MetricSample>,
    pub baseline: Option<BaselineSnapshot>,
    pub comparison: Option<PerformanceComparison>,
    pub timestamp: DateTime<Utc>,
}

/// Deployment facts included alongside the report.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReportConfig {
    pub cache_configured: bool,
    pub rate_limit_configured: bool,
}

#[derive(Debug, Clone, Serialize)]
struct ReportDocument {
    #[serde(flatten)]
    report: MetricsReport,
    config: ReportConfig,
}

#[derive(Debug, Clone, Serialize)]
struct CaptureDocument {
    success: bool,
    message: &'static str,
    baseline: BaselineSnapshot,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
struct ClearDocument {
    success: bool,
    message: &'static str,
    timestamp: DateTime<Utc>,
}

/// Read/capture/clear operations over a shared collector.
#[derive(Clone)]
pub struct ObservabilityEndpoint {
    collector: Arc<MetricsCollector>,
    config: ReportConfig,
}

impl ObservabilityEndpoint {
    pub fn new(collector: Arc<MetricsCollector>, config: ReportConfig) -> Self {
        Self { collector, config }
    }

    /// Summary, baseline, comparison and recent samples.
    pub fn report(&self) -> Result<serde_json::Value> {
        let document = ReportDocument {
            report: self.collector.export(),
            config: self.config,
        };
        Ok(serde_json::to_value(document)?)
    }

    /// Capture a baseline, defaulting the label to "Before Optimization".
    pub fn capture_baseline(&self, label: Option<&str>) -> Result<serde_json::Value> {
        let label = label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or(DEFAULT_BASELINE_LABEL);
        let document = CaptureDocument {
            success: true,
            message: "Baseline captured",
            baseline: self.collector.capture_baseline(label),
            timestamp: Utc::now(),
        };
        Ok(serde_json::to_value(document)?)
    }

    /// Clear samples, and the baseline too when `include_baseline` is set.
    pub fn clear(&self, include_baseline: bool) -> Result<serde_json::Value> {
        self.collector.clear();
        let message = if include_baseline {
            self.collector.clear_baseline();
            "Metrics and baseline cleared"
        } else {
            "Metrics cleared (baseline preserved)"
        };
        let document = ClearDocument {
            success: true,
            message,
            timestamp: Utc::now(),
        };
        Ok(serde_json::to_value(document)?)
    }
}
