//! Telemetry commands: monitor, perf, alerts, prune

use super::Session;
use crate::reporters::{render_line, OutputFormat};
use crate::reports::{alert_listing, performance_history, performance_summary, TickView};
use crate::telemetry::{AlertEngine, Monitor, MonitorConfig, SysinfoProbe};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use console::style;
use std::time::Duration;
use tracing::warn;

/// Run the monitor command
pub fn run(session: &Session, ticks: Option<u64>, interval: Option<u64>, force: bool) -> Result<()> {
    if !session.settings.performance_monitoring && !force {
        println!(
            "{} Performance monitoring is disabled (performanceMonitoring = false). Use {} to run anyway.",
            style("[--]").dim(),
            style("--force").cyan()
        );
        return Ok(());
    }

    // problems were already reported when the session opened
    let (mut config, _) = MonitorConfig::from_settings(&session.settings);
    if let Some(secs) = interval {
        config.interval = Some(Duration::from_secs(secs)).filter(|d| !d.is_zero());
    }
    if config.interval.is_none() {
        bail!("Sampling interval must be positive; set performanceInterval or pass --interval");
    }

    if session.format == OutputFormat::Text {
        println!(
            "\nMonitoring process health. {}\n",
            style("Press Ctrl+C to stop").dim()
        );
    }

    let mut monitor = Monitor::new(session.store.clone(), SysinfoProbe::new(), config);
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let format = session.format;
    let mut count = 0u64;
    runtime.block_on(monitor.run(
        ticks,
        super::ctrl_c(),
        |report| {
            count += 1;
            match render_line(&TickView::new(count, report), format) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("failed to render tick: {}", e),
            }
        },
    ));
    Ok(())
}

/// Run the perf command
pub fn perf(session: &Session, history: Option<usize>) -> Result<()> {
    match history {
        Some(limit) => session.emit(&performance_history(&*session.store, limit)?),
        None => session.emit(&performance_summary(
            &*session.store,
            &session.settings,
            Utc::now(),
        )?),
    }
}

/// Run the alerts command
pub fn alerts(session: &Session, limit: usize) -> Result<()> {
    session.emit(&alert_listing(&*session.store, limit)?)
}

/// Run the prune command
pub fn prune(session: &Session, days: Option<i64>) -> Result<()> {
    let days = days.unwrap_or(session.settings.db_retention_days);
    if days <= 0 {
        bail!("Retention must be a positive number of days, got {}", days);
    }
    let counts = AlertEngine::new(session.store.clone()).prune_old_data(days, Utc::now())?;
    session.emit(&counts)
}
