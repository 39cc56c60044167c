//! Readiness reporting for the review queue and the search index.

use serde::Serialize;
use std::collections::BTreeMap;

/// Queue usage above which the review queue reports `Degraded`, in percent.
pub const QUEUE_DEGRADED_PCT: f64 = 80.0;

/// Status of one component, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Serving normally
    Healthy,
    /// Serving, but the queue is close to full or search is missing
    Degraded,
    /// Not serving: the aggregation worker has stopped
    Unhealthy,
}

impl HealthStatus {
    /// `true` for [`HealthStatus::Healthy`].
    #[must_use]
    pub const fn is_healthy(self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// `true` for [`HealthStatus::Degraded`].
    #[must_use]
    pub const fn is_degraded(self) -> bool {
        matches!(self, Self::Degraded)
    }

    /// `true` for [`HealthStatus::Unhealthy`].
    #[must_use]
    pub const fn is_unhealthy(self) -> bool {
        matches!(self, Self::Unhealthy)
    }
}

/// One component's status.
#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    /// `"ingest"` or `"search"`
    pub component: &'static str,
    /// Current status
    pub status: HealthStatus,
    /// Why the component is not healthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Gauges behind the status, e.g. `queue_depth`
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub details: BTreeMap<&'static str, String>,
}

impl HealthCheck {
    /// A healthy component with no details.
    #[must_use]
    pub const fn healthy(component: &'static str) -> Self {
        Self {
            component,
            status: HealthStatus::Healthy,
            message: None,
            details: BTreeMap::new(),
        }
    }

    /// A degraded component.
    #[must_use]
    pub fn degraded(component: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            message: Some(message.into()),
            ..Self::healthy(component)
        }
    }

    /// An unhealthy component.
    #[must_use]
    pub fn unhealthy(component: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            message: Some(message.into()),
            ..Self::healthy(component)
        }
    }

    fn detail(mut self, key: &'static str, value: impl ToString) -> Self {
        self.details.insert(key, value.to_string());
        self
    }
}

/// Catalog readiness: the worst component status plus every check.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Worst status across `checks`
    pub status: HealthStatus,
    /// Per-component checks
    pub checks: Vec<HealthCheck>,
    /// When the report was taken
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl HealthReport {
    /// Combine checks; an empty list is healthy.
    #[must_use]
    pub fn new(checks: Vec<HealthCheck>) -> Self {
        let status = checks
            .iter()
            .map(|c| c.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        Self {
            status,
            checks,
            timestamp: chrono::Utc::now(),
        }
    }

    /// `true` when every component is healthy.
    #[must_use]
    pub const fn is_healthy(&self) -> bool {
        self.status.is_healthy()
    }
}

/// Review queue check from its depth, capacity and worker state.
///
/// Unhealthy when the worker is gone, degraded when the queue is more than
/// [`QUEUE_DEGRADED_PCT`] full.
#[must_use]
pub fn ingest_health(depth: usize, capacity: usize, worker_running: bool) -> HealthCheck {
    // Queue sizes are far below f64's exact integer range
    #[allow(clippy::cast_precision_loss)]
    let usage = if capacity == 0 {
        100.0
    } else {
        depth as f64 * 100.0 / capacity as f64
    };

    let check = if !worker_running {
        HealthCheck::unhealthy("ingest", "Aggregation worker is not running")
    } else if usage > QUEUE_DEGRADED_PCT {
        HealthCheck::degraded("ingest", format!("Review queue is {usage:.0}% full"))
    } else {
        HealthCheck::healthy("ingest")
    };

    check
        .detail("queue_depth", depth)
        .detail("queue_capacity", capacity)
        .detail("queue_usage_pct", format!("{usage:.1}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_health_levels() {
        assert!(ingest_health(10, 100, true).status.is_healthy());
        assert!(ingest_health(80, 100, true).status.is_healthy());
        assert!(ingest_health(81, 100, true).status.is_degraded());
        assert!(ingest_health(0, 100, false).status.is_unhealthy());
    }

    #[test]
    fn ingest_health_reports_queue_gauges() {
        let check = ingest_health(45, 50, true);

        assert_eq!(check.details["queue_depth"], "45");
        assert_eq!(check.details["queue_capacity"], "50");
        assert_eq!(check.details["queue_usage_pct"], "90.0");
        assert_eq!(check.message.as_deref(), Some("Review queue is 90% full"));
    }

    #[test]
    fn report_takes_worst_status() {
        let report = HealthReport::new(vec![
            HealthCheck::healthy("search"),
            ingest_health(95, 100, true),
        ]);
        assert_eq!(report.status, HealthStatus::Degraded);
        assert!(!report.is_healthy());

        let report = HealthReport::new(vec![
            HealthCheck::degraded("search", "No search index configured"),
            ingest_health(0, 100, false),
        ]);
        assert_eq!(report.status, HealthStatus::Unhealthy);
    }

    #[test]
    fn empty_report_is_healthy() {
        assert!(HealthReport::new(Vec::new()).is_healthy());
    }
}
