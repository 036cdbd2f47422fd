//! The periodic telemetry loop
//!
//! Each tick samples the process, persists the sample, checks every enabled
//! metric for a sustained violation and records at most one alert per
//! metric per cooldown window. Retention pruning runs about once an hour.
//! Persistence failures are logged and never stop the loop.

use super::aggregator::TelemetryAggregator;
use super::alerts::AlertEngine;
use super::sampler::{measure_lag, ProcessProbe, Sampler};
use crate::config::{ConfigError, Settings};
use crate::models::{Alert, MetricKind, MetricSample};
use crate::store::{MetricsStore, PruneCounts};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Seconds between retention prunes while monitoring
const PRUNE_EVERY_SECS: i64 = 3600;

/// Monitor settings derived from `Settings`
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Sampling period; `None` disables sampling
    pub interval: Option<std::time::Duration>,
    /// Metrics being watched and their thresholds
    pub thresholds: Vec<(MetricKind, f64)>,
    pub sustained_duration: Duration,
    pub cooldown: Duration,
    /// `None` disables pruning
    pub retention_days: Option<i64>,
}

impl MonitorConfig {
    /// Build from settings, returning the problems that disabled a metric
    /// or pruning so the caller can report them once.
    pub fn from_settings(settings: &Settings) -> (Self, Vec<ConfigError>) {
        let interval = u64::try_from(settings.performance_interval)
            .ok()
            .filter(|&secs| secs > 0)
            .map(std::time::Duration::from_secs);

        let mut problems = Vec::new();
        let mut thresholds = Vec::new();
        for metric in MetricKind::ALL {
            let value = settings.threshold(metric);
            if value.is_nan() || value <= 0.0 {
                problems.push(ConfigError::InvalidThreshold { metric, value });
            } else {
                thresholds.push((metric, value));
            }
        }

        let retention_days = if settings.db_retention_days > 0 {
            Some(settings.db_retention_days)
        } else {
            problems.push(ConfigError::InvalidRetention(settings.db_retention_days));
            None
        };

        let config = Self {
            interval,
            thresholds,
            sustained_duration: seconds(settings.sustained_alert_duration),
            cooldown: seconds(settings.alert_cooldown),
            retention_days,
        };
        (config, problems)
    }
}

/// Non-negative seconds, saturating at the largest representable span
fn seconds(secs: i64) -> Duration {
    Duration::try_seconds(secs.max(0)).unwrap_or(Duration::MAX)
}

/// What one tick did
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub sample: Option<MetricSample>,
    pub persisted: bool,
    pub alerts: Vec<Alert>,
    pub pruned: Option<PruneCounts>,
}

pub struct Monitor<P: ProcessProbe> {
    store: Arc<dyn MetricsStore>,
    sampler: Sampler<P>,
    aggregator: TelemetryAggregator,
    alerts: AlertEngine,
    config: MonitorConfig,
    last_alert: HashMap<MetricKind, DateTime<Utc>>,
    last_prune: Option<DateTime<Utc>>,
}

impl<P: ProcessProbe> Monitor<P> {
    pub fn new(store: Arc<dyn MetricsStore>, probe: P, config: MonitorConfig) -> Self {
        Self {
            aggregator: TelemetryAggregator::new(store.clone()),
            alerts: AlertEngine::new(store.clone()),
            store,
            sampler: Sampler::new(probe),
            config,
            last_alert: HashMap::new(),
            last_prune: None,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Sample, persist and evaluate alerts once
    pub async fn tick(&mut self) -> TickReport {
        let lag = measure_lag().await;
        self.tick_at(lag, Utc::now())
    }

    /// One tick with an already-measured lag and a fixed clock
    pub fn tick_at(&mut self, lag_ms: f64, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        match self.sampler.sample_with_lag(lag_ms, now) {
            Some(sample) => {
                match self.store.insert_sample(&sample) {
                    Ok(()) => report.persisted = true,
                    Err(e) => warn!(error = %e, "failed to persist performance sample"),
                }
                debug!(
                    cpu = sample.cpu_percent,
                    memory = sample.memory_percent,
                    lag_ms = sample.event_loop_lag_ms,
                    "performance sample"
                );
                report.sample = Some(sample);
            }
            None => warn!("process readings unavailable, skipping sample"),
        }

        for (metric, threshold) in self.config.thresholds.clone() {
            if let Some(alert) = self.check_metric(metric, threshold, now) {
                report.alerts.push(alert);
            }
        }

        report.pruned = self.maybe_prune(now);
        report
    }

    fn check_metric(&mut self, metric: MetricKind, threshold: f64, now: DateTime<Utc>) -> Option<Alert> {
        let check = match self
            .aggregator
            .sustained(metric, threshold, self.config.sustained_duration, now)
        {
            Ok(check) => check,
            Err(e) => {
                warn!(metric = %metric, error = %e, "sustained check failed");
                return None;
            }
        };
        if !check.sustained {
            return None;
        }

        if let Some(last) = self.last_alert.get(&metric) {
            if now - *last < self.config.cooldown {
                debug!(metric = %metric, "alert suppressed by cooldown");
                return None;
            }
        }

        let minutes = self.config.sustained_duration.num_seconds() as f64 / 60.0;
        match self.alerts.record_alert(metric, threshold, check.mean, minutes, now) {
            Ok(alert) => {
                self.last_alert.insert(metric, now);
                Some(alert)
            }
            Err(e) => {
                warn!(metric = %metric, error = %e, "failed to record alert");
                None
            }
        }
    }

    fn maybe_prune(&mut self, now: DateTime<Utc>) -> Option<PruneCounts> {
        let days = self.config.retention_days?;
        if self
            .last_prune
            .is_some_and(|last| (now - last).num_seconds() < PRUNE_EVERY_SECS)
        {
            return None;
        }
        self.last_prune = Some(now);
        match self.alerts.prune_old_data(days, now) {
            Ok(counts) => Some(counts),
            Err(e) => {
                warn!(error = %e, "retention prune failed");
                None
            }
        }
    }

    /// Tick on the configured interval until `max_ticks` ticks have run or
    /// `shutdown` resolves. Returns the number of ticks taken.
    pub async fn run<F>(
        &mut self,
        max_ticks: Option<u64>,
        shutdown: F,
        mut on_tick: impl FnMut(&TickReport),
    ) -> u64
    where
        F: Future<Output = ()>,
    {
        let Some(period) = self.config.interval else {
            info!("performance sampling disabled (interval <= 0)");
            return 0;
        };

        info!(interval_secs = period.as_secs_f64(), "starting performance monitoring");
        self.sampler.reset();

        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(ticks, "performance monitoring stopped");
                    break;
                }
                _ = interval.tick() => {
                    let report = self.tick().await;
                    ticks += 1;
                    on_tick(&report);
                    if max_ticks.is_some_and(|max| ticks >= max) {
                        break;
                    }
                }
            }
        }
        ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::sampler::tests::ScriptedProbe;
    use crate::telemetry::sampler::ProcessReading;
    use crate::store::MemoryStore;

    fn config() -> MonitorConfig {
        let (config, problems) = MonitorConfig::from_settings(&Settings {
            memory_threshold: 50.0,
            sustained_alert_duration: 60,
            alert_cooldown: 600,
            ..Settings::default()
        });
        assert!(problems.is_empty());
        config
    }

    /// Readings at 90% memory with flat CPU time
    fn hot_probe(ticks: usize) -> ScriptedProbe {
        ScriptedProbe::new((0..ticks).map(|_| {
            Some(ProcessReading {
                cpu_time: std::time::Duration::from_secs(1),
                rss_bytes: 900,
                total_memory_bytes: 1000,
            })
        }))
    }

    #[test]
    fn test_from_settings_disables_bad_metrics() {
        let (config, problems) = MonitorConfig::from_settings(&Settings {
            cpu_threshold: 0.0,
            performance_interval: 0,
            db_retention_days: 0,
            ..Settings::default()
        });
        assert!(config.interval.is_none());
        assert!(config.retention_days.is_none());
        assert_eq!(config.thresholds.len(), 2);
        assert!(config.thresholds.iter().all(|(m, _)| *m != MetricKind::Cpu));
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn test_huge_durations_saturate() {
        let (config, problems) = MonitorConfig::from_settings(&Settings {
            memory_threshold: 50.0,
            sustained_alert_duration: i64::MAX,
            alert_cooldown: i64::MAX,
            db_retention_days: i64::MAX,
            ..Settings::default()
        });
        assert!(problems.is_empty());
        assert_eq!(config.sustained_duration, Duration::MAX);
        assert_eq!(config.cooldown, Duration::MAX);

        let store = Arc::new(MemoryStore::new());
        let mut monitor = Monitor::new(store.clone(), hot_probe(2), config);
        let start = Utc::now();
        let first = monitor.tick_at(1.0, start);
        assert_eq!(first.alerts.len(), 1);
        assert_eq!(first.pruned, Some(PruneCounts::default()));
        assert!(monitor.tick_at(1.0, start + Duration::hours(1)).alerts.is_empty());
    }

    #[test]
    fn test_sustained_violation_alerts_once_per_cooldown() {
        let store = Arc::new(MemoryStore::new());
        let mut monitor = Monitor::new(store.clone(), hot_probe(20), config());
        let start = Utc::now();

        let mut alerts = Vec::new();
        for i in 0..12 {
            let report = monitor.tick_at(1.0, start + Duration::seconds(i * 10));
            assert!(report.persisted);
            alerts.extend(report.alerts);
        }

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].metric_type, MetricKind::Memory);
        assert_eq!(alerts[0].actual_value, 90.0);
        assert_eq!(alerts[0].duration_minutes, 1.0);
        assert_eq!(store.counts().unwrap().alerts, 1);
        assert_eq!(store.counts().unwrap().samples, 12);
    }

    #[test]
    fn test_alert_repeats_after_cooldown() {
        let store = Arc::new(MemoryStore::new());
        let mut monitor = Monitor::new(store.clone(), hot_probe(5), config());
        let start = Utc::now();

        let first = monitor.tick_at(1.0, start);
        assert_eq!(first.alerts.len(), 1);
        let during = monitor.tick_at(1.0, start + Duration::seconds(300));
        assert!(during.alerts.is_empty());
        let after = monitor.tick_at(1.0, start + Duration::seconds(601));
        assert_eq!(after.alerts.len(), 1);
    }

    #[test]
    fn test_missing_readings_do_not_alert() {
        let store = Arc::new(MemoryStore::new());
        let mut monitor = Monitor::new(store.clone(), ScriptedProbe::new([None, None]), config());
        let report = monitor.tick_at(1.0, Utc::now());
        assert!(report.sample.is_none());
        assert!(!report.persisted);
        assert!(report.alerts.is_empty());
        assert_eq!(store.counts().unwrap().samples, 0);
    }

    #[test]
    fn test_prune_runs_hourly() {
        let store = Arc::new(MemoryStore::new());
        let mut monitor = Monitor::new(store, hot_probe(3), config());
        let start = Utc::now();
        assert!(monitor.tick_at(1.0, start).pruned.is_some());
        assert!(monitor.tick_at(1.0, start + Duration::minutes(5)).pruned.is_none());
        assert!(monitor.tick_at(1.0, start + Duration::minutes(61)).pruned.is_some());
    }

    #[tokio::test]
    async fn test_run_stops_after_max_ticks() {
        let store = Arc::new(MemoryStore::new());
        let mut config = config();
        config.interval = Some(std::time::Duration::from_millis(5));
        let mut monitor = Monitor::new(store.clone(), ScriptedProbe::steady(100, 1000, 3), config);

        let mut seen = 0;
        let ticks = monitor
            .run(Some(3), std::future::pending::<()>(), |_| seen += 1)
            .await;
        assert_eq!(ticks, 3);
        assert_eq!(seen, 3);
        assert_eq!(store.counts().unwrap().samples, 3);
    }

    #[tokio::test]
    async fn test_run_with_sampling_disabled_returns_immediately() {
        let store = Arc::new(MemoryStore::new());
        let mut config = config();
        config.interval = None;
        let mut monitor = Monitor::new(store, ScriptedProbe::new([]), config);
        assert_eq!(monitor.run(None, std::future::pending::<()>(), |_| {}).await, 0);
    }
}
