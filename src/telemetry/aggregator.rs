//! Store-backed telemetry queries

use super::window::{self, Averages, SustainedCheck, Trend};
use crate::models::MetricKind;
use crate::store::{MetricsStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One reading of a single metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Rolling averages, sustained checks and trends over persisted samples
#[derive(Clone)]
pub struct TelemetryAggregator {
    store: Arc<dyn MetricsStore>,
}

impl TelemetryAggregator {
    pub fn new(store: Arc<dyn MetricsStore>) -> Self {
        Self { store }
    }

    pub fn averages(&self, window: Duration, now: DateTime<Utc>) -> Result<Averages, StoreError> {
        let samples = self.store.samples_between(window::window_start(now, window), now)?;
        Ok(window::averages(&samples, window, now))
    }

    pub fn sustained(
        &self,
        metric: MetricKind,
        threshold: f64,
        duration: Duration,
        now: DateTime<Utc>,
    ) -> Result<SustainedCheck, StoreError> {
        let samples = self.store.samples_between(window::window_start(now, duration), now)?;
        Ok(window::sustained(&samples, metric, threshold, duration, now))
    }

    pub fn trend(
        &self,
        metric: MetricKind,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<Trend, StoreError> {
        let samples = self.store.samples_between(window::window_start(now, window), now)?;
        Ok(window::trend(&samples, metric, window, now))
    }

    /// Last `count` readings of one metric, newest first
    pub fn recent(&self, metric: MetricKind, count: usize) -> Result<Vec<MetricPoint>, StoreError> {
        Ok(self
            .store
            .recent_samples(count)?
            .iter()
            .map(|s| MetricPoint {
                timestamp: s.timestamp,
                value: metric.value_of(s),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricSample;
    use crate::store::MemoryStore;

    fn store_with(now: DateTime<Utc>, lag: &[f64]) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let n = lag.len() as i64;
        for (i, &v) in lag.iter().enumerate() {
            store
                .insert_sample(&MetricSample {
                    timestamp: now - Duration::seconds((n - i as i64) * 10),
                    cpu_percent: 5.0,
                    memory_percent: 30.0,
                    memory_rss_bytes: 4096,
                    event_loop_lag_ms: v,
                })
                .unwrap();
        }
        store
    }

    #[test]
    fn test_queries_read_persisted_samples() {
        let now = Utc::now();
        let store = store_with(now, &[10.0, 10.0, 10.0, 40.0, 40.0, 40.0]);
        let agg = TelemetryAggregator::new(store);

        let avg = agg.averages(Duration::minutes(10), now).unwrap();
        assert_eq!(avg.event_loop, 25.0);
        assert_eq!(
            agg.trend(MetricKind::EventLoop, Duration::hours(1), now).unwrap(),
            Trend::Increasing
        );
        assert!(!agg
            .sustained(MetricKind::EventLoop, 20.0, Duration::minutes(5), now)
            .unwrap()
            .sustained);
    }

    #[test]
    fn test_recent_is_newest_first() {
        let now = Utc::now();
        let agg = TelemetryAggregator::new(store_with(now, &[1.0, 2.0, 3.0]));
        let values: Vec<f64> = agg
            .recent(MetricKind::EventLoop, 2)
            .unwrap()
            .iter()
            .map(|p| p.value)
            .collect();
        assert_eq!(values, vec![3.0, 2.0]);
    }
}
