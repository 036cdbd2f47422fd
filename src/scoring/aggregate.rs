//! Group-level aggregation of unit scores

use crate::models::{round2, GroupRecord, UnitRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Highest quality a group can score while any unit has a critical issue
pub const CRITICAL_GROUP_CAP: f64 = 50.0;

/// Combine one pass's unit records for a group.
///
/// Returns `None` for a group with no units; such groups are never
/// persisted.
pub fn aggregate_group(
    id: &str,
    name: &str,
    units: &[UnitRecord],
    now: DateTime<Utc>,
) -> Option<GroupRecord> {
    if units.is_empty() {
        return None;
    }

    let total_units = units.len();
    let total_issues = units.iter().map(UnitRecord::issue_count).sum();
    let nodes_with_issues = units.iter().filter(|u| !u.issues.is_empty()).count();
    let nodes_with_critical_issues = units.iter().filter(|u| u.has_critical()).count();

    let mut issue_types: BTreeMap<_, usize> = BTreeMap::new();
    for issue in units.iter().flat_map(|u| &u.issues) {
        *issue_types.entry(issue.kind).or_default() += 1;
    }

    let mut quality =
        units.iter().map(|u| u.quality_score).sum::<f64>() / total_units as f64;
    if nodes_with_critical_issues > 0 {
        quality = quality.min(CRITICAL_GROUP_CAP);
    }
    let complexity =
        units.iter().map(|u| u.complexity_score).sum::<f64>() / total_units as f64;

    Some(GroupRecord {
        id: id.to_string(),
        name: name.to_string(),
        total_issues,
        nodes_with_issues,
        nodes_with_critical_issues,
        total_units,
        issue_types,
        quality_score: round2(quality).max(0.0),
        complexity_score: round2(complexity),
        created_at: now,
    })
}
