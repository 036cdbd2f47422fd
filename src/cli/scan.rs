//! Scan and unit commands

use super::Session;
use crate::models::DetectionLevel;
use crate::reporters::OutputFormat;
use crate::reports::{unit_analysis, ScanView};
use crate::scan::{FlowFileCollector, Readiness, ReadinessGate, ScanError, Scanner, SourceCollector};
use anyhow::{bail, Context, Result};
use chrono::Utc;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Run the scan command
pub fn run(
    session: &Session,
    flows: &Path,
    level: Option<i64>,
    wait: bool,
    watch: bool,
) -> Result<()> {
    if !session.settings.code_analysis {
        println!(
            "{} Code analysis is disabled (codeAnalysis = false)",
            style("[--]").dim()
        );
        return Ok(());
    }

    let level = level
        .map(DetectionLevel::new)
        .unwrap_or(session.settings.detection_level);
    let collector = FlowFileCollector::new(flows);
    let scanner = Scanner::new(session.store.clone(), level);

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(async {
        wait_ready(&collector, wait)
            .await
            .with_context(|| format!("Flow export not available: {}", flows.display()))?;

        if !watch {
            return scan_once(session, &scanner, &collector);
        }

        let Some(period) = u64::try_from(session.settings.scan_interval)
            .ok()
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
        else {
            bail!(
                "scanInterval is {}; periodic scanning is disabled",
                session.settings.scan_interval
            );
        };

        info!(interval_secs = period.as_secs(), "watching flow export");
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let shutdown = super::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    if let Err(e) = scan_once(session, &scanner, &collector) {
                        warn!("scan failed: {:#}", e);
                    }
                }
            }
        }
        Ok(())
    })
}

/// Without `--wait` the export must be there on the first look
async fn wait_ready(collector: &FlowFileCollector, wait: bool) -> Result<(), ScanError> {
    let mut gate = if wait {
        ReadinessGate::default()
    } else {
        ReadinessGate::new(1, Duration::ZERO)
    };
    match gate.wait(|| collector.is_ready()).await {
        Readiness::Ready => Ok(()),
        _ => Err(ScanError::NotReady {
            attempts: gate.max_attempts(),
        }),
    }
}

fn scan_once(session: &Session, scanner: &Scanner, collector: &FlowFileCollector) -> Result<()> {
    let spinner = if session.format == OutputFormat::Text {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
                .template("{spinner:.green} {msg}")?,
        );
        spinner.set_message(format!("Scanning {}...", collector.path().display()));
        spinner.enable_steady_tick(Duration::from_millis(100));
        Some(spinner)
    } else {
        None
    };

    let pass = scanner.scan(collector);
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let pass = pass.with_context(|| format!("Scan of {} failed", collector.path().display()))?;

    session.emit(&ScanView::from(&pass))
}

/// Run the unit command
pub fn unit(session: &Session, flows: &Path, unit_id: &str) -> Result<()> {
    let collector = FlowFileCollector::new(flows);
    let Some(unit) = collector.find_unit(unit_id)? else {
        bail!(
            "Function node '{}' not found in {}",
            unit_id,
            flows.display()
        );
    };
    session.emit(&unit_analysis(&unit, &session.settings.grade_bands, Utc::now()))
}
