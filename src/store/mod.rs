//! Append-only persistence for quality records and telemetry
//!
//! Four logs (units, groups, samples, alerts) keyed by a per-table
//! sequence number, values stored as JSON. Records are never updated:
//! "latest" means the highest sequence number for a key.
//!
//! Backends only implement the raw log operations; every typed query is
//! built on top of them here, so the redb file store and the in-memory
//! store answer identically.

mod memory;
mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::models::{Alert, GroupRecord, MetricSample, UnitRecord};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Default database file name
pub const DB_FILE_NAME: &str = "flowsentry.redb";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] redb::Error),

    #[error("failed to encode or decode record: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store lock poisoned")]
    Poisoned,
}

// redb reports each stage with its own error type; fold them all into one
macro_rules! impl_from_redb {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for StoreError {
                fn from(err: $ty) -> Self {
                    StoreError::Database(err.into())
                }
            }
        )*
    };
}

impl_from_redb!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError
);

/// The four record logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Units,
    Groups,
    Samples,
    Alerts,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::Units, Table::Groups, Table::Samples, Table::Alerts];

    pub fn name(self) -> &'static str {
        match self {
            Table::Units => "units",
            Table::Groups => "groups",
            Table::Samples => "samples",
            Table::Alerts => "alerts",
        }
    }
}

/// Row counts per table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub units: usize,
    pub groups: usize,
    pub samples: usize,
    pub alerts: usize,
}

impl StoreCounts {
    pub fn total(&self) -> usize {
        self.units + self.groups + self.samples + self.alerts
    }
}

/// Rows removed by a retention prune
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneCounts {
    pub samples: usize,
    pub alerts: usize,
}

/// Records that carry their own creation time
trait Timestamped {
    fn created_at(&self) -> DateTime<Utc>;
}

impl Timestamped for UnitRecord {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timestamped for GroupRecord {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timestamped for MetricSample {
    fn created_at(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for Alert {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Persistence contract for all record kinds.
///
/// Implementors provide the four raw log operations; the typed inserts,
/// latest-per-key lookups, time-range queries and delete-before operations
/// are provided methods.
pub trait MetricsStore: Send + Sync {
    /// Append a value, returning its sequence key
    fn append(&self, table: Table, value: &[u8]) -> Result<u64, StoreError>;

    /// All entries in ascending key order
    fn entries(&self, table: Table) -> Result<Vec<(u64, Vec<u8>)>, StoreError>;

    /// Remove the given keys, returning how many existed
    fn remove(&self, table: Table, keys: &[u64]) -> Result<usize, StoreError>;

    /// Drop every entry of every table
    fn clear(&self) -> Result<(), StoreError>;

    /// Visit values newest first until `visit` returns `Ok(false)`
    fn scan_back(
        &self,
        table: Table,
        visit: &mut dyn FnMut(&[u8]) -> Result<bool, StoreError>,
    ) -> Result<(), StoreError> {
        for (_, value) in self.entries(table)?.iter().rev() {
            if !visit(value.as_slice())? {
                break;
            }
        }
        Ok(())
    }

    fn count(&self, table: Table) -> Result<usize, StoreError> {
        Ok(self.entries(table)?.len())
    }

    // ==================== Inserts ====================

    fn insert_unit(&self, unit: &UnitRecord) -> Result<(), StoreError> {
        self.append(Table::Units, &serde_json::to_vec(unit)?)?;
        Ok(())
    }

    fn insert_group(&self, group: &GroupRecord) -> Result<(), StoreError> {
        self.append(Table::Groups, &serde_json::to_vec(group)?)?;
        Ok(())
    }

    fn insert_sample(&self, sample: &MetricSample) -> Result<(), StoreError> {
        self.append(Table::Samples, &serde_json::to_vec(sample)?)?;
        Ok(())
    }

    fn insert_alert(&self, alert: &Alert) -> Result<(), StoreError> {
        self.append(Table::Alerts, &serde_json::to_vec(alert)?)?;
        Ok(())
    }

    // ==================== Latest per key ====================

    fn latest_group(&self, group_id: &str) -> Result<Option<GroupRecord>, StoreError> {
        let groups: Vec<GroupRecord> = load(self, Table::Groups)?;
        Ok(groups.into_iter().rev().find(|g| g.id == group_id))
    }

    /// Most recent record of every group, ordered by group name
    fn latest_groups(&self) -> Result<Vec<GroupRecord>, StoreError> {
        let groups: Vec<GroupRecord> = load(self, Table::Groups)?;
        let mut latest = latest_by(groups, |g| g.id.clone());
        latest.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(latest)
    }

    fn latest_unit(&self, unit_id: &str) -> Result<Option<UnitRecord>, StoreError> {
        let units: Vec<UnitRecord> = load(self, Table::Units)?;
        Ok(units.into_iter().rev().find(|u| u.id == unit_id))
    }

    /// Most recent record of every unit in a group
    fn latest_units(&self, group_id: &str) -> Result<Vec<UnitRecord>, StoreError> {
        let units: Vec<UnitRecord> = load(self, Table::Units)?;
        let in_group = units.into_iter().filter(|u| u.group_id == group_id);
        Ok(latest_by(in_group, |u| u.id.clone()))
    }

    fn latest_sample(&self) -> Result<Option<MetricSample>, StoreError> {
        Ok(load_newest(self, Table::Samples, 1)?.pop())
    }

    // ==================== Time ranges ====================

    /// Group records created in `[from, to]`, oldest first
    fn groups_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<GroupRecord>, StoreError> {
        load_between(self, Table::Groups, from, to)
    }

    fn units_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UnitRecord>, StoreError> {
        load_between(self, Table::Units, from, to)
    }

    /// Samples taken in `[from, to]`, oldest first.
    ///
    /// Samples are appended in time order, so the walk stops at the first
    /// sample older than `from`.
    fn samples_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MetricSample>, StoreError> {
        let mut samples = Vec::new();
        self.scan_back(Table::Samples, &mut |bytes| {
            let sample: MetricSample = serde_json::from_slice(bytes)?;
            if sample.timestamp < from {
                return Ok(false);
            }
            if sample.timestamp <= to {
                samples.push(sample);
            }
            Ok(true)
        })?;
        samples.reverse();
        Ok(samples)
    }

    fn alerts_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Alert>, StoreError> {
        load_between(self, Table::Alerts, from, to)
    }

    /// The last `count` samples, newest first
    fn recent_samples(&self, count: usize) -> Result<Vec<MetricSample>, StoreError> {
        load_newest(self, Table::Samples, count)
    }

    /// The last `limit` alerts, newest first
    fn recent_alerts(&self, limit: usize) -> Result<Vec<Alert>, StoreError> {
        load_newest(self, Table::Alerts, limit)
    }

    // ==================== Retention ====================

    fn delete_units_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        delete_before::<UnitRecord, _>(self, Table::Units, cutoff)
    }

    fn delete_groups_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        delete_before::<GroupRecord, _>(self, Table::Groups, cutoff)
    }

    fn delete_samples_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        delete_before::<MetricSample, _>(self, Table::Samples, cutoff)
    }

    fn delete_alerts_before(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        delete_before::<Alert, _>(self, Table::Alerts, cutoff)
    }

    fn counts(&self) -> Result<StoreCounts, StoreError> {
        Ok(StoreCounts {
            units: self.count(Table::Units)?,
            groups: self.count(Table::Groups)?,
            samples: self.count(Table::Samples)?,
            alerts: self.count(Table::Alerts)?,
        })
    }
}

fn load<T: DeserializeOwned, S: MetricsStore + ?Sized>(
    store: &S,
    table: Table,
) -> Result<Vec<T>, StoreError> {
    store
        .entries(table)?
        .iter()
        .map(|(_, bytes)| serde_json::from_slice(bytes).map_err(StoreError::from))
        .collect()
}

/// The newest `count` records, newest first
fn load_newest<T: DeserializeOwned, S: MetricsStore + ?Sized>(
    store: &S,
    table: Table,
    count: usize,
) -> Result<Vec<T>, StoreError> {
    let mut records = Vec::new();
    if count == 0 {
        return Ok(records);
    }
    store.scan_back(table, &mut |bytes| {
        records.push(serde_json::from_slice(bytes)?);
        Ok(records.len() < count)
    })?;
    Ok(records)
}

fn load_between<T, S>(
    store: &S,
    table: Table,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned + Timestamped,
    S: MetricsStore + ?Sized,
{
    let mut records: Vec<T> = load(store, table)?;
    records.retain(|r| r.created_at() >= from && r.created_at() <= to);
    records.sort_by_key(|r| r.created_at());
    Ok(records)
}

fn delete_before<T, S>(store: &S, table: Table, cutoff: DateTime<Utc>) -> Result<usize, StoreError>
where
    T: DeserializeOwned + Timestamped,
    S: MetricsStore + ?Sized,
{
    let mut stale = Vec::new();
    for (key, bytes) in store.entries(table)? {
        let record: T = serde_json::from_slice(&bytes)?;
        if record.created_at() < cutoff {
            stale.push(key);
        }
    }
    if stale.is_empty() {
        return Ok(0);
    }
    store.remove(table, &stale)
}

/// Keep the last record per key, preserving first-seen key order
fn latest_by<T, K, F>(records: impl IntoIterator<Item = T>, key: F) -> Vec<T>
where
    K: std::hash::Hash + Eq,
    F: Fn(&T) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut latest: Vec<T> = Vec::new();
    for record in records {
        match index.get(&key(&record)) {
            Some(&slot) => latest[slot] = record,
            None => {
                index.insert(key(&record), latest.len());
                latest.push(record);
            }
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Issue, IssueKind, MetricKind};
    use chrono::Duration;
    use std::collections::BTreeMap;

    fn group(id: &str, quality: f64, at: DateTime<Utc>) -> GroupRecord {
        GroupRecord {
            id: id.to_string(),
            name: format!("Flow {id}"),
            total_issues: 2,
            nodes_with_issues: 1,
            nodes_with_critical_issues: 0,
            total_units: 3,
            issue_types: BTreeMap::from([(IssueKind::ConsoleLog, 2)]),
            quality_score: quality,
            complexity_score: 4.25,
            created_at: at,
        }
    }

    fn sample(at: DateTime<Utc>, cpu: f64) -> MetricSample {
        MetricSample {
            timestamp: at,
            cpu_percent: cpu,
            memory_percent: 40.0,
            memory_rss_bytes: 64 * 1024 * 1024,
            event_loop_lag_ms: 1.5,
        }
    }

    fn alert(at: DateTime<Utc>) -> Alert {
        Alert {
            metric_type: MetricKind::Cpu,
            threshold_value: 75.0,
            actual_value: 90.0,
            duration_minutes: 5.0,
            created_at: at,
        }
    }

    #[test]
    fn test_group_round_trip() {
        let store = MemoryStore::new();
        let record = group("g1", 87.5, Utc::now());
        store.insert_group(&record).unwrap();
        assert_eq!(store.latest_group("g1").unwrap(), Some(record));
        assert_eq!(store.latest_group("missing").unwrap(), None);
    }

    #[test]
    fn test_latest_wins_per_key() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store.insert_group(&group("g1", 60.0, now - Duration::minutes(5))).unwrap();
        store.insert_group(&group("g2", 70.0, now - Duration::minutes(4))).unwrap();
        store.insert_group(&group("g1", 80.0, now)).unwrap();

        let latest = store.latest_groups().unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].id, "g1");
        assert_eq!(latest[0].quality_score, 80.0);
        assert_eq!(store.counts().unwrap().groups, 3);
    }

    #[test]
    fn test_latest_units_by_group() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for (id, group_id, quality) in [("a", "g1", 50.0), ("b", "g1", 70.0), ("a", "g1", 90.0), ("c", "g2", 10.0)] {
            store
                .insert_unit(&UnitRecord {
                    id: id.to_string(),
                    group_id: group_id.to_string(),
                    name: id.to_string(),
                    lines_of_code: 4,
                    complexity_score: 1.0,
                    quality_score: quality,
                    issues: vec![Issue::new(IssueKind::ConsoleLog, 1, "")],
                    created_at: now,
                })
                .unwrap();
        }
        let units = store.latest_units("g1").unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].id, "a");
        assert_eq!(units[0].quality_score, 90.0);
        assert_eq!(store.latest_unit("c").unwrap().unwrap().group_id, "g2");
    }

    #[test]
    fn test_prune_removes_only_older_rows() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let cutoff = now - Duration::days(7);
        store.insert_sample(&sample(now - Duration::days(8), 10.0)).unwrap();
        store.insert_sample(&sample(now - Duration::days(6), 20.0)).unwrap();
        store.insert_sample(&sample(now, 30.0)).unwrap();
        store.insert_alert(&alert(now - Duration::days(10))).unwrap();
        store.insert_alert(&alert(now - Duration::hours(1))).unwrap();

        assert_eq!(store.delete_samples_before(cutoff).unwrap(), 1);
        assert_eq!(store.delete_alerts_before(cutoff).unwrap(), 1);

        let remaining = store.samples_between(cutoff, now).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|s| s.timestamp >= cutoff));
        assert_eq!(store.recent_alerts(10).unwrap().len(), 1);
    }

    #[test]
    fn test_recent_samples_newest_first() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for i in 0..5 {
            store.insert_sample(&sample(now + Duration::seconds(i), i as f64)).unwrap();
        }
        let recent = store.recent_samples(3).unwrap();
        let cpu: Vec<f64> = recent.iter().map(|s| s.cpu_percent).collect();
        assert_eq!(cpu, vec![4.0, 3.0, 2.0]);
        assert_eq!(store.latest_sample().unwrap().unwrap().cpu_percent, 4.0);
    }

    #[test]
    fn test_sample_window_stops_at_older_samples() {
        let store = MemoryStore::new();
        let now = Utc::now();
        // an undecodable row older than every window below
        store.append(Table::Samples, b"not json").unwrap();
        store.insert_sample(&sample(now - Duration::hours(2), 1.0)).unwrap();
        store.insert_sample(&sample(now - Duration::minutes(3), 2.0)).unwrap();
        store.insert_sample(&sample(now - Duration::minutes(1), 3.0)).unwrap();

        let window = store.samples_between(now - Duration::minutes(5), now).unwrap();
        let cpu: Vec<f64> = window.iter().map(|s| s.cpu_percent).collect();
        assert_eq!(cpu, vec![2.0, 3.0]);
        assert_eq!(store.recent_samples(3).unwrap().len(), 3);

        let everything = store.samples_between(DateTime::<Utc>::MIN_UTC, now);
        assert!(matches!(everything, Err(StoreError::Codec(_))));
    }

    #[test]
    fn test_recent_with_zero_limit_is_empty() {
        let store = MemoryStore::new();
        store.insert_alert(&alert(Utc::now())).unwrap();
        assert!(store.recent_alerts(0).unwrap().is_empty());
        assert_eq!(store.recent_alerts(5).unwrap().len(), 1);
    }

    #[test]
    fn test_clear_empties_every_table() {
        let store = MemoryStore::new();
        store.insert_group(&group("g1", 50.0, Utc::now())).unwrap();
        store.insert_sample(&sample(Utc::now(), 1.0)).unwrap();
        store.clear().unwrap();
        assert_eq!(store.counts().unwrap(), StoreCounts::default());
    }
}
