//! Process telemetry
//!
//! The sampler reads the process once per tick; the aggregator answers
//! window questions (averages, sustained violations, trends) over persisted
//! samples; the alert engine records alerts and prunes old data; the monitor
//! ties them together on a timer.

mod aggregator;
mod alerts;
mod monitor;
mod sampler;
pub mod window;

pub use aggregator::{MetricPoint, TelemetryAggregator};
pub use alerts::{alert_severity, AlertEngine, AlertSeverity};
pub use monitor::{Monitor, MonitorConfig, TickReport};
pub use sampler::{
    cpu_percent, measure_lag, memory_percent, ProcessProbe, ProcessReading, Sampler, SysinfoProbe,
};
pub use window::{Averages, SustainedCheck, Trend};
