//! Performance and alert reports

use crate::config::Settings;
use crate::models::{round2, Alert, MetricKind, MetricSample};
use crate::store::{MetricsStore, StoreError};
use crate::telemetry::window::{self, Averages, Trend};
use crate::telemetry::AlertSeverity;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Window of the rolling averages in the summary
const AVERAGE_WINDOW_MINUTES: i64 = 10;
/// Window of the trend classification in the summary
const TREND_WINDOW_MINUTES: i64 = 60;
const SUMMARY_ALERTS: usize = 5;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trends {
    pub cpu: Trend,
    pub memory: Trend,
    pub event_loop: Trend,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleStatistics {
    pub total_samples: usize,
    pub oldest_sample: Option<DateTime<Utc>>,
    pub newest_sample: Option<DateTime<Utc>>,
}

/// Monitoring settings echoed back with the summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSettings {
    pub enabled: bool,
    pub interval_seconds: i64,
    pub cpu_threshold: f64,
    pub memory_threshold: f64,
    pub event_loop_threshold: f64,
    pub sustained_alert_duration: i64,
    pub alert_cooldown: i64,
    pub retention_days: i64,
}

impl From<&Settings> for MonitoringSettings {
    fn from(s: &Settings) -> Self {
        Self {
            enabled: s.performance_monitoring,
            interval_seconds: s.performance_interval,
            cpu_threshold: s.cpu_threshold,
            memory_threshold: s.memory_threshold,
            event_loop_threshold: s.event_loop_threshold,
            sustained_alert_duration: s.sustained_alert_duration,
            alert_cooldown: s.alert_cooldown,
            retention_days: s.db_retention_days,
        }
    }
}

/// An alert with its derived severity
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertView {
    pub metric_type: MetricKind,
    pub threshold_value: f64,
    pub actual_value: f64,
    pub duration_minutes: f64,
    pub severity: AlertSeverity,
    pub created_at: DateTime<Utc>,
}

impl From<&Alert> for AlertView {
    fn from(alert: &Alert) -> Self {
        Self {
            metric_type: alert.metric_type,
            threshold_value: alert.threshold_value,
            actual_value: round2(alert.actual_value),
            duration_minutes: round2(alert.duration_minutes),
            severity: alert.severity(),
            created_at: alert.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub current: Option<MetricSample>,
    pub averages: Averages,
    pub trends: Trends,
    pub recent_alerts: Vec<AlertView>,
    pub statistics: SampleStatistics,
    pub settings: MonitoringSettings,
}

pub fn performance_summary(
    store: &dyn MetricsStore,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<PerformanceSummary, StoreError> {
    let trend_window = Duration::minutes(TREND_WINDOW_MINUTES);
    let recent = store.samples_between(window::window_start(now, trend_window), now)?;
    let averages = window::averages(&recent, Duration::minutes(AVERAGE_WINDOW_MINUTES), now);
    let trend = |metric| window::trend(&recent, metric, trend_window, now);

    let all = store.samples_between(DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)?;

    Ok(PerformanceSummary {
        current: store.latest_sample()?,
        averages: Averages {
            cpu: round2(averages.cpu),
            memory: round2(averages.memory),
            event_loop: round2(averages.event_loop),
        },
        trends: Trends {
            cpu: trend(MetricKind::Cpu),
            memory: trend(MetricKind::Memory),
            event_loop: trend(MetricKind::EventLoop),
        },
        recent_alerts: store
            .recent_alerts(SUMMARY_ALERTS)?
            .iter()
            .map(AlertView::from)
            .collect(),
        statistics: SampleStatistics {
            total_samples: all.len(),
            oldest_sample: all.first().map(|s| s.timestamp),
            newest_sample: all.last().map(|s| s.timestamp),
        },
        settings: MonitoringSettings::from(settings),
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct PerformanceHistory {
    pub count: usize,
    /// Oldest first
    pub samples: Vec<MetricSample>,
}

/// The last `limit` samples in chronological order
pub fn performance_history(
    store: &dyn MetricsStore,
    limit: usize,
) -> Result<PerformanceHistory, StoreError> {
    let mut samples = store.recent_samples(limit)?;
    samples.reverse();
    Ok(PerformanceHistory {
        count: samples.len(),
        samples,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertListing {
    pub count: usize,
    /// Newest first
    pub alerts: Vec<AlertView>,
}

pub fn alert_listing(store: &dyn MetricsStore, limit: usize) -> Result<AlertListing, StoreError> {
    let alerts: Vec<AlertView> = store.recent_alerts(limit)?.iter().map(AlertView::from).collect();
    Ok(AlertListing {
        count: alerts.len(),
        alerts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn sample(cpu: f64, at: DateTime<Utc>) -> MetricSample {
        MetricSample {
            timestamp: at,
            cpu_percent: cpu,
            memory_percent: 40.0,
            memory_rss_bytes: 1 << 20,
            event_loop_lag_ms: 1.0,
        }
    }

    #[test]
    fn test_summary_of_empty_store() {
        let summary =
            performance_summary(&MemoryStore::new(), &Settings::default(), Utc::now()).unwrap();
        assert!(summary.current.is_none());
        assert_eq!(summary.statistics.total_samples, 0);
        assert_eq!(summary.trends.cpu, Trend::InsufficientData);
        assert_eq!(summary.averages, Averages::default());
        assert_eq!(summary.settings.cpu_threshold, 75.0);
    }

    #[test]
    fn test_summary_averages_recent_window() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert_sample(&sample(90.0, now - Duration::minutes(30))).unwrap();
        store.insert_sample(&sample(10.0, now - Duration::minutes(5))).unwrap();
        store.insert_sample(&sample(20.0, now - Duration::minutes(1))).unwrap();

        let summary = performance_summary(&store, &Settings::default(), now).unwrap();
        assert_eq!(summary.averages.cpu, 15.0);
        assert_eq!(summary.statistics.total_samples, 3);
        assert_eq!(summary.statistics.oldest_sample, Some(now - Duration::minutes(30)));
        assert_eq!(summary.current.unwrap().cpu_percent, 20.0);
    }

    #[test]
    fn test_history_is_chronological() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for i in 0..5 {
            store
                .insert_sample(&sample(i as f64, now - Duration::seconds(50 - i * 10)))
                .unwrap();
        }
        let history = performance_history(&store, 3).unwrap();
        let cpu: Vec<f64> = history.samples.iter().map(|s| s.cpu_percent).collect();
        assert_eq!(cpu, vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_alert_listing_carries_severity() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (actual, minutes_ago) in [(80.0, 10), (120.0, 5)] {
            store
                .insert_alert(&Alert {
                    metric_type: MetricKind::Cpu,
                    threshold_value: 75.0,
                    actual_value: actual,
                    duration_minutes: 5.0,
                    created_at: now - Duration::minutes(minutes_ago),
                })
                .unwrap();
        }
        let listing = alert_listing(&store, 10).unwrap();
        assert_eq!(listing.count, 2);
        assert_eq!(listing.alerts[0].severity, AlertSeverity::Critical);
        assert_eq!(listing.alerts[1].severity, AlertSeverity::Info);
    }
}
