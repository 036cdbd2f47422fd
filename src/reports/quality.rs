//! Code-quality reports

use crate::models::{round2, GroupRecord, Issue, IssueKind, IssueSummary, Severity, StatusHint};
use crate::models::{DetectionLevel, UnitRecord};
use crate::scan::{analyze_unit, UnitSource};
use crate::scoring::{Grade, GradeBands};
use crate::store::{MetricsStore, StoreError};
use crate::telemetry::window::window_start;
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Cross-group overview of the latest pass
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityOverview {
    pub average_quality_score: f64,
    pub quality_grade: Grade,
    pub total_issues: usize,
    pub total_flows: usize,
    pub total_function_nodes: usize,
    pub nodes_with_issues: usize,
    pub critical_issues: usize,
    /// Issues per unit
    pub technical_debt_ratio: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRow {
    pub id: String,
    pub name: String,
    pub quality_score: f64,
    pub quality_grade: Grade,
    pub total_issues: usize,
    pub nodes_with_issues: usize,
    pub nodes_with_critical_issues: usize,
    pub total_units: usize,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualitySummary {
    pub summary: QualityOverview,
    pub flows: Vec<GroupRow>,
}

/// Latest record per group, combined with a unit-count-weighted mean.
///
/// With no groups on record the average is 100: nothing scanned, nothing
/// wrong.
pub fn quality_summary(
    store: &dyn MetricsStore,
    bands: &GradeBands,
) -> Result<QualitySummary, StoreError> {
    let mut groups = store.latest_groups()?;
    groups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.name.cmp(&b.name)));

    let total_units: usize = groups.iter().map(|g| g.total_units).sum();
    let total_issues: usize = groups.iter().map(|g| g.total_issues).sum();
    let weighted: f64 = groups
        .iter()
        .map(|g| g.quality_score * g.total_units as f64)
        .sum();
    let average = if total_units > 0 {
        weighted / total_units as f64
    } else {
        100.0
    };
    let debt_ratio = if total_units > 0 {
        (total_issues as f64 / total_units as f64 * 1000.0).round() / 1000.0
    } else {
        0.0
    };

    let summary = QualityOverview {
        average_quality_score: round2(average),
        quality_grade: bands.grade(average),
        total_issues,
        total_flows: groups.len(),
        total_function_nodes: total_units,
        nodes_with_issues: groups.iter().map(|g| g.nodes_with_issues).sum(),
        critical_issues: groups.iter().map(|g| g.nodes_with_critical_issues).sum(),
        technical_debt_ratio: debt_ratio,
    };

    let flows = groups
        .iter()
        .map(|g| GroupRow {
            id: g.id.clone(),
            name: g.name.clone(),
            quality_score: round2(g.quality_score),
            quality_grade: bands.grade(g.quality_score),
            total_issues: g.total_issues,
            nodes_with_issues: g.nodes_with_issues,
            nodes_with_critical_issues: g.nodes_with_critical_issues,
            total_units: g.total_units,
            created_at: g.created_at,
        })
        .collect();

    Ok(QualitySummary { summary, flows })
}

/// One hour bucket of group records
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub hour: DateTime<Utc>,
    pub quality_score: f64,
    pub total_issues: usize,
    pub total_nodes: usize,
    pub active_flows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityHistory {
    pub hours: i64,
    pub history: Vec<HistoryPoint>,
}

/// Group records of the last `hours`, bucketed by hour, oldest first
pub fn quality_history(
    store: &dyn MetricsStore,
    hours: i64,
    now: DateTime<Utc>,
) -> Result<QualityHistory, StoreError> {
    let from = Duration::try_hours(hours)
        .map_or(DateTime::<Utc>::MIN_UTC, |span| window_start(now, span));
    let records = store.groups_between(from, now)?;

    let mut buckets: BTreeMap<DateTime<Utc>, Vec<&GroupRecord>> = BTreeMap::new();
    for record in &records {
        let hour = record
            .created_at
            .duration_trunc(Duration::hours(1))
            .unwrap_or(record.created_at);
        buckets.entry(hour).or_default().push(record);
    }

    let history = buckets
        .into_iter()
        .map(|(hour, records)| {
            let mean =
                records.iter().map(|r| r.quality_score).sum::<f64>() / records.len() as f64;
            HistoryPoint {
                hour,
                quality_score: round2(mean),
                total_issues: records.iter().map(|r| r.total_issues).sum(),
                total_nodes: records.iter().map(|r| r.total_units).sum(),
                active_flows: records.iter().map(|r| r.id.as_str()).collect::<BTreeSet<_>>().len(),
            }
        })
        .collect();

    Ok(QualityHistory { hours, history })
}

/// An issue with its severity spelled out
#[derive(Debug, Clone, Serialize)]
pub struct IssueView {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub message: String,
    pub line: Option<u32>,
    pub severity: Severity,
}

impl From<&Issue> for IssueView {
    fn from(issue: &Issue) -> Self {
        Self {
            kind: issue.kind,
            message: issue.message.clone(),
            line: issue.line,
            severity: issue.severity(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitDetail {
    pub id: String,
    pub name: String,
    pub issues_count: usize,
    pub quality_score: f64,
    pub complexity_score: f64,
    pub lines_of_code: usize,
    pub issues: Vec<IssueView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDetail {
    pub id: String,
    pub name: String,
    pub quality_score: f64,
    pub quality_grade: Grade,
    pub complexity_score: f64,
    pub total_issues: usize,
    pub nodes_with_issues: usize,
    pub critical_issues: usize,
    pub total_units: usize,
    pub issue_types: BTreeMap<IssueKind, usize>,
    pub last_updated: DateTime<Utc>,
    /// Latest record per unit, most issues first, then lowest quality
    pub units: Vec<UnitDetail>,
}

/// Latest group record plus its units' latest records
pub fn group_detail(
    store: &dyn MetricsStore,
    group_id: &str,
    bands: &GradeBands,
) -> Result<Option<GroupDetail>, StoreError> {
    let Some(group) = store.latest_group(group_id)? else {
        return Ok(None);
    };

    let mut units = store.latest_units(group_id)?;
    units.sort_by(|a, b| {
        b.issue_count()
            .cmp(&a.issue_count())
            .then_with(|| a.quality_score.total_cmp(&b.quality_score))
    });

    Ok(Some(GroupDetail {
        quality_grade: bands.grade(group.quality_score),
        units: units.iter().map(unit_detail).collect(),
        id: group.id,
        name: group.name,
        quality_score: group.quality_score,
        complexity_score: group.complexity_score,
        total_issues: group.total_issues,
        nodes_with_issues: group.nodes_with_issues,
        critical_issues: group.nodes_with_critical_issues,
        total_units: group.total_units,
        issue_types: group.issue_types,
        last_updated: group.created_at,
    }))
}

fn unit_detail(unit: &UnitRecord) -> UnitDetail {
    UnitDetail {
        id: unit.id.clone(),
        name: unit.name.clone(),
        issues_count: unit.issue_count(),
        quality_score: unit.quality_score,
        complexity_score: unit.complexity_score,
        lines_of_code: unit.lines_of_code,
        issues: unit.issues.iter().map(IssueView::from).collect(),
    }
}

/// Full-catalog analysis of one unit, computed fresh and not persisted
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitAnalysis {
    pub id: String,
    pub name: String,
    pub group_id: String,
    pub quality_score: f64,
    pub quality_grade: Grade,
    pub complexity_score: f64,
    pub lines_of_code: usize,
    pub total_issues: usize,
    pub issues: Vec<IssueView>,
    pub issues_by_severity: IssueSummary,
    pub status: StatusHint,
}

pub fn unit_analysis(unit: &UnitSource, bands: &GradeBands, now: DateTime<Utc>) -> UnitAnalysis {
    let record = analyze_unit(unit, DetectionLevel::STRICT, now);
    UnitAnalysis {
        quality_grade: bands.grade(record.quality_score),
        total_issues: record.issue_count(),
        issues: record.issues.iter().map(IssueView::from).collect(),
        issues_by_severity: IssueSummary::from_issues(&record.issues),
        status: StatusHint::from_issues(&record.issues),
        id: record.id,
        name: record.name,
        group_id: record.group_id,
        quality_score: record.quality_score,
        complexity_score: record.complexity_score,
        lines_of_code: record.lines_of_code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn group(id: &str, quality: f64, units: usize, issues: usize, at: DateTime<Utc>) -> GroupRecord {
        GroupRecord {
            id: id.into(),
            name: id.to_uppercase(),
            total_issues: issues,
            nodes_with_issues: issues.min(units),
            nodes_with_critical_issues: 0,
            total_units: units,
            issue_types: BTreeMap::new(),
            quality_score: quality,
            complexity_score: 1.0,
            created_at: at,
        }
    }

    fn unit(id: &str, quality: f64, issues: usize) -> UnitRecord {
        UnitRecord {
            id: id.into(),
            group_id: "g1".into(),
            name: id.into(),
            lines_of_code: 5,
            complexity_score: 1.0,
            quality_score: quality,
            issues: (0..issues)
                .map(|i| Issue::new(IssueKind::ConsoleLog, i as u32 + 1, ""))
                .collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_weights_by_unit_count() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert_group(&group("g1", 100.0, 3, 0, now)).unwrap();
        store.insert_group(&group("g2", 60.0, 1, 4, now)).unwrap();

        let report = quality_summary(&store, &GradeBands::default()).unwrap();
        assert_eq!(report.summary.average_quality_score, 90.0);
        assert_eq!(report.summary.quality_grade, Grade::A);
        assert_eq!(report.summary.total_function_nodes, 4);
        assert_eq!(report.summary.technical_debt_ratio, 1.0);
        assert_eq!(report.flows.len(), 2);
    }

    #[test]
    fn test_empty_summary_is_perfect() {
        let report = quality_summary(&MemoryStore::new(), &GradeBands::default()).unwrap();
        assert_eq!(report.summary.average_quality_score, 100.0);
        assert_eq!(report.summary.total_flows, 0);
        assert_eq!(report.summary.technical_debt_ratio, 0.0);
    }

    #[test]
    fn test_history_buckets_by_hour() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let hour = now.duration_trunc(Duration::hours(1)).unwrap();
        store.insert_group(&group("g1", 80.0, 2, 1, hour - Duration::minutes(50))).unwrap();
        store.insert_group(&group("g2", 40.0, 1, 3, hour - Duration::minutes(40))).unwrap();
        store.insert_group(&group("g1", 90.0, 2, 0, hour)).unwrap();
        store.insert_group(&group("g1", 10.0, 2, 9, now - Duration::hours(48))).unwrap();

        let history = quality_history(&store, 24, now).unwrap();
        assert_eq!(history.history.len(), 2);
        let first = &history.history[0];
        assert_eq!(first.quality_score, 60.0);
        assert_eq!(first.total_issues, 4);
        assert_eq!(first.active_flows, 2);
        assert_eq!(history.history[1].quality_score, 90.0);
    }

    #[test]
    fn test_history_with_huge_window_covers_everything() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert_group(&group("g1", 10.0, 2, 9, now - Duration::hours(48))).unwrap();
        store.insert_group(&group("g1", 90.0, 2, 0, now)).unwrap();

        let history = quality_history(&store, u32::MAX as i64, now).unwrap();
        assert_eq!(history.history.len(), 2);
        assert_eq!(quality_history(&store, i64::MAX, now).unwrap().history.len(), 2);
    }

    #[test]
    fn test_group_detail_orders_units() {
        let store = MemoryStore::new();
        store.insert_group(&group("g1", 70.0, 3, 3, Utc::now())).unwrap();
        for u in [unit("a", 90.0, 1), unit("b", 80.0, 2), unit("c", 70.0, 1)] {
            store.insert_unit(&u).unwrap();
        }

        let detail = group_detail(&store, "g1", &GradeBands::default()).unwrap().unwrap();
        let order: Vec<&str> = detail.units.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert_eq!(detail.units[0].issues[0].severity, Severity::Warning);
        assert!(group_detail(&store, "nope", &GradeBands::default()).unwrap().is_none());
    }

    #[test]
    fn test_unit_analysis_uses_full_catalog() {
        let source = UnitSource {
            group_id: "g1".into(),
            id: "n1".into(),
            name: "Fn".into(),
            source: "const spare = 1;\n\n\nreturn msg;".into(),
        };
        let analysis = unit_analysis(&source, &GradeBands::default(), Utc::now());
        assert_eq!(analysis.issues_by_severity.info, 2);
        assert_eq!(analysis.status.text, "Minor debug traits noticed");
    }
}
