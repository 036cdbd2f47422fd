//! One scan pass: detect, score, persist, aggregate

use super::collector::{GroupInfo, SourceCollector, UnitSource};
use super::scheduler::ScanScheduler;
use super::ScanError;
use crate::detectors::{detect, lines_of_code};
use crate::models::{round2, DetectionLevel, GroupRecord, StatusHint, UnitRecord};
use crate::scoring::{aggregate_group, complexity_score, node_quality_score};
use crate::store::MetricsStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Detect and score one unit
pub fn analyze_unit(unit: &UnitSource, level: DetectionLevel, now: DateTime<Utc>) -> UnitRecord {
    let issues = detect(&unit.source, level);
    let lines = lines_of_code(&unit.source);
    UnitRecord {
        id: unit.id.clone(),
        group_id: unit.group_id.clone(),
        name: unit.name.clone(),
        lines_of_code: lines,
        complexity_score: round2(complexity_score(&unit.source)),
        quality_score: round2(node_quality_score(&issues, lines)),
        issues,
        created_at: now,
    }
}

/// A scored unit and its status feedback
#[derive(Debug, Clone)]
pub struct UnitOutcome {
    pub record: UnitRecord,
    pub status: StatusHint,
    pub persisted: bool,
}

/// Everything one pass produced
#[derive(Debug, Clone)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub level: DetectionLevel,
    pub groups_seen: usize,
    pub units: Vec<UnitOutcome>,
    pub groups: Vec<GroupRecord>,
    /// Units whose group is not in the export
    pub orphaned_units: usize,
    /// Units whose analysis panicked, with the panic message
    pub failed_units: Vec<(String, String)>,
    pub persist_failures: usize,
    pub duration_ms: u64,
}

impl PassReport {
    pub fn total_issues(&self) -> usize {
        self.units.iter().map(|u| u.record.issue_count()).sum()
    }
}

/// Runs scan passes against a store, one at a time
pub struct Scanner {
    store: Arc<dyn MetricsStore>,
    scheduler: ScanScheduler,
    level: DetectionLevel,
}

impl Scanner {
    pub fn new(store: Arc<dyn MetricsStore>, level: DetectionLevel) -> Self {
        Self {
            store,
            scheduler: ScanScheduler::new(),
            level,
        }
    }

    pub fn scheduler(&self) -> &ScanScheduler {
        &self.scheduler
    }

    /// Run one pass.
    ///
    /// Fails with `AlreadyRunning` if a pass is in flight, or with the
    /// collector's error before anything is persisted. Per-unit failures
    /// (panics, store errors) are logged and absorbed.
    pub fn scan(&self, collector: &dyn SourceCollector) -> Result<PassReport, ScanError> {
        let guard = self.scheduler.try_start()?;
        let start = Instant::now();
        let started_at = Utc::now();

        let groups = collector.groups()?;
        let sources = collector.units()?;
        debug!(groups = groups.len(), units = sources.len(), "collected sources");

        let index: HashMap<&str, usize> = groups
            .iter()
            .enumerate()
            .map(|(i, g)| (g.id.as_str(), i))
            .collect();
        let mut per_group: Vec<Vec<UnitRecord>> = vec![Vec::new(); groups.len()];

        let mut report = PassReport {
            started_at,
            level: self.level,
            groups_seen: groups.len(),
            units: Vec::with_capacity(sources.len()),
            groups: Vec::new(),
            orphaned_units: 0,
            failed_units: Vec::new(),
            persist_failures: 0,
            duration_ms: 0,
        };

        for unit in &sources {
            let Some(&slot) = index.get(unit.group_id.as_str()) else {
                debug!(unit = %unit.id, group = %unit.group_id, "unit has no known group, skipping");
                report.orphaned_units += 1;
                continue;
            };

            let record = match catch_unwind(AssertUnwindSafe(|| {
                analyze_unit(unit, self.level, Utc::now())
            })) {
                Ok(record) => record,
                Err(panic) => {
                    let msg = panic_message(panic.as_ref());
                    warn!(unit = %unit.id, "analysis panicked: {}", msg);
                    report.failed_units.push((unit.id.clone(), msg));
                    continue;
                }
            };

            let persisted = match self.store.insert_unit(&record) {
                Ok(()) => true,
                Err(e) => {
                    warn!(unit = %record.id, error = %e, "failed to persist unit record");
                    report.persist_failures += 1;
                    false
                }
            };

            per_group[slot].push(record.clone());
            report.units.push(UnitOutcome {
                status: StatusHint::from_issues(&record.issues),
                record,
                persisted,
            });
        }

        guard.completing();
        let now = Utc::now();
        for (GroupInfo { id, name }, units) in groups.iter().zip(&per_group) {
            let Some(group) = aggregate_group(id, name, units, now) else {
                continue;
            };
            if let Err(e) = self.store.insert_group(&group) {
                warn!(group = %group.id, error = %e, "failed to persist group record");
                report.persist_failures += 1;
            }
            report.groups.push(group);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            groups = report.groups.len(),
            units = report.units.len(),
            issues = report.total_issues(),
            level = %self.level,
            duration_ms = report.duration_ms,
            "scan pass completed"
        );
        Ok(report)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
