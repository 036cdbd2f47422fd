//! Process-health sampling
//!
//! One sample per tick: CPU share since the previous tick, resident memory
//! as a share of system memory, and the latency of a single cooperative
//! yield to the async scheduler.

use crate::models::MetricSample;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Raw process readings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessReading {
    /// Accumulated CPU time of the process (user + system)
    pub cpu_time: Duration,
    pub rss_bytes: u64,
    pub total_memory_bytes: u64,
}

/// Source of process readings
pub trait ProcessProbe: Send {
    /// Current readings, or `None` when the process cannot be inspected
    fn read(&mut self) -> Option<ProcessReading>;
}

/// `ProcessProbe` for the current process, backed by sysinfo
///
/// sysinfo reports CPU usage as a share of one core since the previous
/// refresh; the probe integrates it over wall time into a running CPU time.
pub struct SysinfoProbe {
    system: System,
    pid: Option<Pid>,
    cpu_time: Duration,
    last_read: Option<Instant>,
}

impl SysinfoProbe {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
            cpu_time: Duration::ZERO,
            last_read: None,
        }
    }
}

impl Default for SysinfoProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessProbe for SysinfoProbe {
    fn read(&mut self) -> Option<ProcessReading> {
        let pid = self.pid?;
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_cpu().with_memory(),
        );
        self.system.refresh_memory();

        let process = self.system.process(pid)?;
        let now = Instant::now();
        if let Some(last) = self.last_read {
            let share = f64::from(process.cpu_usage()).max(0.0) / 100.0;
            let busy = now.duration_since(last).as_secs_f64() * share;
            self.cpu_time += Duration::try_from_secs_f64(busy).unwrap_or_default();
        }
        self.last_read = Some(now);

        Some(ProcessReading {
            cpu_time: self.cpu_time,
            rss_bytes: process.memory(),
            total_memory_bytes: self.system.total_memory(),
        })
    }
}

/// CPU share of wall time, clamped to [0, 100]
pub fn cpu_percent(cpu_delta: Duration, wall_delta: Duration) -> f64 {
    if wall_delta.is_zero() {
        return 0.0;
    }
    (cpu_delta.as_secs_f64() / wall_delta.as_secs_f64() * 100.0).clamp(0.0, 100.0)
}

/// Memory share of the system, clamped to [0, 100]
pub fn memory_percent(rss_bytes: u64, total_memory_bytes: u64) -> f64 {
    if total_memory_bytes == 0 {
        return 0.0;
    }
    (rss_bytes as f64 / total_memory_bytes as f64 * 100.0).clamp(0.0, 100.0)
}

/// Time taken by one cooperative yield to the scheduler, in milliseconds
pub async fn measure_lag() -> f64 {
    let start = Instant::now();
    tokio::task::yield_now().await;
    start.elapsed().as_secs_f64() * 1000.0
}

/// Turns probe readings into samples, keeping the CPU baseline between ticks
pub struct Sampler<P: ProcessProbe> {
    probe: P,
    baseline: Option<(Duration, Instant)>,
}

impl<P: ProcessProbe> Sampler<P> {
    pub fn new(probe: P) -> Self {
        Self {
            probe,
            baseline: None,
        }
    }

    /// Forget the CPU baseline; the next sample reports 0% CPU
    pub fn reset(&mut self) {
        self.baseline = None;
    }

    /// Take one sample from already-measured lag
    pub fn sample_with_lag(&mut self, lag_ms: f64, now: DateTime<Utc>) -> Option<MetricSample> {
        let reading = self.probe.read()?;
        let wall_now = Instant::now();

        let cpu = match self.baseline {
            Some((prev_cpu, prev_wall)) => cpu_percent(
                reading.cpu_time.saturating_sub(prev_cpu),
                wall_now.duration_since(prev_wall),
            ),
            None => 0.0,
        };
        self.baseline = Some((reading.cpu_time, wall_now));

        Some(MetricSample {
            timestamp: now,
            cpu_percent: cpu,
            memory_percent: memory_percent(reading.rss_bytes, reading.total_memory_bytes),
            memory_rss_bytes: reading.rss_bytes,
            event_loop_lag_ms: lag_ms.max(0.0),
        })
    }

    /// Take one sample, measuring lag with a single yield
    pub async fn sample(&mut self) -> Option<MetricSample> {
        let lag = measure_lag().await;
        self.sample_with_lag(lag, Utc::now())
    }
}
