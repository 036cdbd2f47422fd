//! Views of a scan pass and a monitor tick

use super::AlertView;
use crate::models::{DetectionLevel, GroupRecord, MetricSample, StatusHint};
use crate::scan::PassReport;
use crate::store::PruneCounts;
use crate::telemetry::TickReport;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScannedUnit {
    pub id: String,
    pub name: String,
    pub group_id: String,
    pub quality_score: f64,
    pub complexity_score: f64,
    pub issues: usize,
    pub status: StatusHint,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedUnit {
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanView {
    pub started_at: DateTime<Utc>,
    pub detection_level: DetectionLevel,
    pub duration_ms: u64,
    pub groups_seen: usize,
    pub units_analyzed: usize,
    pub total_issues: usize,
    pub orphaned_units: usize,
    pub persist_failures: usize,
    pub failed_units: Vec<FailedUnit>,
    pub groups: Vec<GroupRecord>,
    pub units: Vec<ScannedUnit>,
}

impl From<&PassReport> for ScanView {
    fn from(pass: &PassReport) -> Self {
        Self {
            started_at: pass.started_at,
            detection_level: pass.level,
            duration_ms: pass.duration_ms,
            groups_seen: pass.groups_seen,
            units_analyzed: pass.units.len(),
            total_issues: pass.total_issues(),
            orphaned_units: pass.orphaned_units,
            persist_failures: pass.persist_failures,
            failed_units: pass
                .failed_units
                .iter()
                .map(|(id, reason)| FailedUnit {
                    id: id.clone(),
                    reason: reason.clone(),
                })
                .collect(),
            groups: pass.groups.clone(),
            units: pass
                .units
                .iter()
                .map(|u| ScannedUnit {
                    id: u.record.id.clone(),
                    name: u.record.name.clone(),
                    group_id: u.record.group_id.clone(),
                    quality_score: u.record.quality_score,
                    complexity_score: u.record.complexity_score,
                    issues: u.record.issue_count(),
                    status: u.status.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TickView {
    pub tick: u64,
    pub sample: Option<MetricSample>,
    pub persisted: bool,
    pub alerts: Vec<AlertView>,
    pub pruned: Option<PruneCounts>,
}

impl TickView {
    pub fn new(tick: u64, report: &TickReport) -> Self {
        Self {
            tick,
            sample: report.sample.clone(),
            persisted: report.persisted,
            alerts: report.alerts.iter().map(AlertView::from).collect(),
            pruned: report.pruned.clone(),
        }
    }
}
