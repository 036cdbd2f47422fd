//! Alert recording, severity and retention

use super::window::window_start;
use crate::models::{Alert, MetricKind};
use crate::store::{MetricsStore, PruneCounts, StoreError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Info => write!(f, "info"),
            AlertSeverity::Warning => write!(f, "warning"),
            AlertSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Severity from how far the observed value overshot its threshold
pub fn alert_severity(actual: f64, threshold: f64) -> AlertSeverity {
    if threshold <= 0.0 {
        return AlertSeverity::Critical;
    }
    let ratio = actual / threshold;
    if ratio >= 1.5 {
        AlertSeverity::Critical
    } else if ratio >= 1.2 {
        AlertSeverity::Warning
    } else {
        AlertSeverity::Info
    }
}

impl Alert {
    pub fn severity(&self) -> AlertSeverity {
        alert_severity(self.actual_value, self.threshold_value)
    }
}

/// Records alerts and prunes telemetry past retention
#[derive(Clone)]
pub struct AlertEngine {
    store: Arc<dyn MetricsStore>,
}

impl AlertEngine {
    pub fn new(store: Arc<dyn MetricsStore>) -> Self {
        Self { store }
    }

    /// Persist an alert. Cooldown is the caller's concern.
    pub fn record_alert(
        &self,
        metric: MetricKind,
        threshold: f64,
        actual: f64,
        duration_minutes: f64,
        now: DateTime<Utc>,
    ) -> Result<Alert, StoreError> {
        let alert = Alert {
            metric_type: metric,
            threshold_value: threshold,
            actual_value: actual,
            duration_minutes,
            created_at: now,
        };
        self.store.insert_alert(&alert)?;
        info!(
            metric = %metric,
            threshold,
            actual,
            severity = %alert.severity(),
            "recorded performance alert"
        );
        Ok(alert)
    }

    /// Delete samples and alerts older than `now - retention_days`.
    ///
    /// A retention reaching past the earliest representable instant
    /// deletes nothing.
    pub fn prune_old_data(
        &self,
        retention_days: i64,
        now: DateTime<Utc>,
    ) -> Result<PruneCounts, StoreError> {
        let cutoff = Duration::try_days(retention_days)
            .map_or(DateTime::<Utc>::MIN_UTC, |span| window_start(now, span));
        let counts = PruneCounts {
            samples: self.store.delete_samples_before(cutoff)?,
            alerts: self.store.delete_alerts_before(cutoff)?,
        };
        info!(
            samples = counts.samples,
            alerts = counts.alerts,
            retention_days,
            "pruned telemetry"
        );
        Ok(counts)
    }
}
