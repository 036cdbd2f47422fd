//! Rolling-window statistics over metric samples
//!
//! Everything here is a pure function of a sample slice and a reference
//! time, so the store-backed aggregator and the tests share one code path.

use crate::models::{MetricKind, MetricSample};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Share of in-window samples that must exceed the threshold
pub const SUSTAINED_RATIO: f64 = 0.8;

/// Relative change (percent) below which a trend is stable
pub const STABLE_CHANGE_PCT: f64 = 5.0;

/// Mean of each metric over a window
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Averages {
    pub cpu: f64,
    pub memory: f64,
    pub event_loop: f64,
}

impl Averages {
    pub fn get(&self, metric: MetricKind) -> f64 {
        match metric {
            MetricKind::Cpu => self.cpu,
            MetricKind::Memory => self.memory,
            MetricKind::EventLoop => self.event_loop,
        }
    }
}

/// Outcome of a sustained-threshold check
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SustainedCheck {
    pub sustained: bool,
    pub ratio: f64,
    pub total_readings: usize,
    pub exceeding_readings: usize,
    /// Mean of the metric over the window
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
    InsufficientData,
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
            Trend::InsufficientData => "insufficient_data",
        };
        f.write_str(s)
    }
}

/// `now - window`, saturating at the earliest representable instant
pub fn window_start(now: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(window).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Samples with `now - window <= timestamp <= now`, oldest first
pub fn in_window(samples: &[MetricSample], window: Duration, now: DateTime<Utc>) -> Vec<&MetricSample> {
    let from = window_start(now, window);
    let mut selected: Vec<&MetricSample> = samples
        .iter()
        .filter(|s| s.timestamp >= from && s.timestamp <= now)
        .collect();
    selected.sort_by_key(|s| s.timestamp);
    selected
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Per-metric means over the window; an empty window gives zeros
pub fn averages(samples: &[MetricSample], window: Duration, now: DateTime<Utc>) -> Averages {
    let selected = in_window(samples, window, now);
    Averages {
        cpu: mean(selected.iter().map(|s| s.cpu_percent)),
        memory: mean(selected.iter().map(|s| s.memory_percent)),
        event_loop: mean(selected.iter().map(|s| s.event_loop_lag_ms)),
    }
}

/// Whether `metric` stayed above `threshold` for most of `duration`.
///
/// Sustained means strictly more than 80% of the in-window samples exceed
/// the threshold; an empty window is never sustained.
pub fn sustained(
    samples: &[MetricSample],
    metric: MetricKind,
    threshold: f64,
    duration: Duration,
    now: DateTime<Utc>,
) -> SustainedCheck {
    let selected = in_window(samples, duration, now);
    let total_readings = selected.len();
    if total_readings == 0 {
        return SustainedCheck::default();
    }

    let exceeding_readings = selected
        .iter()
        .filter(|s| metric.value_of(s) > threshold)
        .count();
    let ratio = exceeding_readings as f64 / total_readings as f64;

    SustainedCheck {
        sustained: ratio > SUSTAINED_RATIO,
        ratio,
        total_readings,
        exceeding_readings,
        mean: mean(selected.iter().map(|s| metric.value_of(s))),
    }
}

/// Classify a series, oldest value first, by comparing its two halves
pub fn classify_trend(values: &[f64]) -> Trend {
    if values.len() < 2 {
        return Trend::InsufficientData;
    }

    let (first, second) = values.split_at(values.len() / 2);
    let first_mean = mean(first.iter().copied());
    let second_mean = mean(second.iter().copied());

    if first_mean == 0.0 {
        return if second_mean == 0.0 {
            Trend::Stable
        } else if second_mean > 0.0 {
            Trend::Increasing
        } else {
            Trend::Decreasing
        };
    }

    let change_pct = (second_mean - first_mean) / first_mean.abs() * 100.0;
    if change_pct.abs() < STABLE_CHANGE_PCT {
        Trend::Stable
    } else if change_pct > 0.0 {
        Trend::Increasing
    } else {
        Trend::Decreasing
    }
}

/// Trend of one metric over the window
pub fn trend(
    samples: &[MetricSample],
    metric: MetricKind,
    window: Duration,
    now: DateTime<Utc>,
) -> Trend {
    let values: Vec<f64> = in_window(samples, window, now)
        .into_iter()
        .map(|s| metric.value_of(s))
        .collect();
    classify_trend(&values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(now: DateTime<Utc>, cpu: &[f64]) -> Vec<MetricSample> {
        let n = cpu.len() as i64;
        cpu.iter()
            .enumerate()
            .map(|(i, &v)| MetricSample {
                timestamp: now - Duration::seconds((n - i as i64) * 10),
                cpu_percent: v,
                memory_percent: 50.0,
                memory_rss_bytes: 1024,
                event_loop_lag_ms: 2.0,
            })
            .collect()
    }

    #[test]
    fn test_sustained_needs_more_than_eighty_percent() {
        let now = Utc::now();
        let nine = series(now, &[90.0, 90.0, 90.0, 90.0, 90.0, 90.0, 90.0, 90.0, 90.0, 10.0]);
        let check = sustained(&nine, MetricKind::Cpu, 75.0, Duration::minutes(5), now);
        assert!(check.sustained);
        assert_eq!(check.exceeding_readings, 9);

        let eight = series(now, &[90.0, 90.0, 90.0, 90.0, 90.0, 90.0, 90.0, 90.0, 10.0, 10.0]);
        let check = sustained(&eight, MetricKind::Cpu, 75.0, Duration::minutes(5), now);
        assert!(!check.sustained);
        assert_eq!(check.ratio, 0.8);
    }

    #[test]
    fn test_empty_window_is_not_sustained() {
        let now = Utc::now();
        let old = series(now - Duration::hours(2), &[99.0, 99.0]);
        let check = sustained(&old, MetricKind::Cpu, 75.0, Duration::minutes(5), now);
        assert!(!check.sustained);
        assert_eq!(check.total_readings, 0);
    }

    #[test]
    fn test_equal_to_threshold_does_not_exceed() {
        let now = Utc::now();
        let flat = series(now, &[75.0; 5]);
        assert!(!sustained(&flat, MetricKind::Cpu, 75.0, Duration::minutes(5), now).sustained);
    }

    #[test]
    fn test_trend_classification() {
        assert_eq!(classify_trend(&[10.0, 10.0, 10.0, 20.0, 20.0, 20.0]), Trend::Increasing);
        assert_eq!(classify_trend(&[20.0, 20.0, 10.0, 10.0]), Trend::Decreasing);
        assert_eq!(classify_trend(&[100.0, 102.0, 101.0, 103.0]), Trend::Stable);
        assert_eq!(classify_trend(&[42.0]), Trend::InsufficientData);
        assert_eq!(classify_trend(&[]), Trend::InsufficientData);
    }

    #[test]
    fn test_trend_from_zero_baseline() {
        assert_eq!(classify_trend(&[0.0, 0.0, 0.0, 0.0]), Trend::Stable);
        assert_eq!(classify_trend(&[0.0, 0.0, 1.0, 3.0]), Trend::Increasing);
    }

    #[test]
    fn test_trend_uses_window_in_time_order() {
        let now = Utc::now();
        let mut samples = series(now, &[10.0, 10.0, 10.0, 20.0, 20.0, 20.0]);
        samples.reverse();
        assert_eq!(
            trend(&samples, MetricKind::Cpu, Duration::hours(1), now),
            Trend::Increasing
        );
        assert_eq!(
            trend(&samples, MetricKind::Memory, Duration::hours(1), now),
            Trend::Stable
        );
    }

    #[test]
    fn test_window_start_saturates() {
        let now = Utc::now();
        assert_eq!(window_start(now, Duration::minutes(5)), now - Duration::minutes(5));
        assert_eq!(window_start(now, Duration::MAX), DateTime::<Utc>::MIN_UTC);

        let samples = series(now, &[90.0, 90.0]);
        let check = sustained(&samples, MetricKind::Cpu, 75.0, Duration::MAX, now);
        assert!(check.sustained);
        assert_eq!(check.total_readings, 2);
    }

    #[test]
    fn test_averages() {
        let now = Utc::now();
        let samples = series(now, &[10.0, 20.0, 30.0]);
        let avg = averages(&samples, Duration::minutes(10), now);
        assert_eq!(avg.cpu, 20.0);
        assert_eq!(avg.memory, 50.0);
        assert_eq!(avg.event_loop, 2.0);
        assert_eq!(averages(&[], Duration::minutes(10), now), Averages::default());
    }
}
