//! redb-backed store
//!
//! One table per record kind, `u64` sequence keys, JSON values. A table
//! that was never written reads as empty.

use super::{MetricsStore, StoreError, Table};
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::{Path, PathBuf};
use tracing::debug;

const UNITS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("units");
const GROUPS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("groups");
const SAMPLES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("samples");
const ALERTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("alerts");

fn definition(table: Table) -> TableDefinition<'static, u64, &'static [u8]> {
    match table {
        Table::Units => UNITS_TABLE,
        Table::Groups => GROUPS_TABLE,
        Table::Samples => SAMPLES_TABLE,
        Table::Alerts => ALERTS_TABLE,
    }
}

/// Persistent `MetricsStore` in a single redb file
pub struct RedbStore {
    db: Database,
    path: PathBuf,
}

impl RedbStore {
    /// Open (or create) the database file at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let db = Database::create(&path)?;
        debug!(path = %path.display(), "opened metrics store");
        Ok(Self { db, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsStore for RedbStore {
    fn append(&self, table: Table, value: &[u8]) -> Result<u64, StoreError> {
        let write_txn = self.db.begin_write()?;
        let key = {
            let mut log = write_txn.open_table(definition(table))?;
            let key = match log.last()? {
                Some((last, _)) => last.value() + 1,
                None => 0,
            };
            log.insert(key, value)?;
            key
        };
        write_txn.commit()?;
        Ok(key)
    }

    fn entries(&self, table: Table) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let log = match read_txn.open_table(definition(table)) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for item in log.range::<u64>(..)? {
            let (key, value) = item?;
            entries.push((key.value(), value.value().to_vec()));
        }
        Ok(entries)
    }

    fn scan_back(
        &self,
        table: Table,
        visit: &mut dyn FnMut(&[u8]) -> Result<bool, StoreError>,
    ) -> Result<(), StoreError> {
        let read_txn = self.db.begin_read()?;
        let log = match read_txn.open_table(definition(table)) {
            Ok(t) => t,
            Err(redb::TableError::TableDoesNotExist(_)) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for item in log.range::<u64>(..)?.rev() {
            let (_, value) = item?;
            if !visit(value.value())? {
                break;
            }
        }
        Ok(())
    }

    fn remove(&self, table: Table, keys: &[u64]) -> Result<usize, StoreError> {
        let write_txn = self.db.begin_write()?;
        let mut removed = 0;
        {
            let mut log = write_txn.open_table(definition(table))?;
            for key in keys {
                if log.remove(*key)?.is_some() {
                    removed += 1;
                }
            }
        }
        write_txn.commit()?;
        Ok(removed)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write()?;
        for table in Table::ALL {
            write_txn.delete_table(definition(table))?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn count(&self, table: Table) -> Result<usize, StoreError> {
        let read_txn = self.db.begin_read()?;
        match read_txn.open_table(definition(table)) {
            Ok(log) => Ok(log.len()? as usize),
            Err(redb::TableError::TableDoesNotExist(_)) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GroupRecord, IssueKind, MetricSample};
    use chrono::{DateTime, Duration, Utc};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn group(id: &str) -> GroupRecord {
        GroupRecord {
            id: id.to_string(),
            name: "Main".to_string(),
            total_issues: 1,
            nodes_with_issues: 1,
            nodes_with_critical_issues: 1,
            total_units: 2,
            issue_types: BTreeMap::from([(IssueKind::TopLevelReturn, 1)]),
            quality_score: 35.0,
            complexity_score: 2.5,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_fresh_database_reads_empty() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("fresh.redb")).unwrap();
        assert!(store.entries(Table::Samples).unwrap().is_empty());
        assert_eq!(store.count(Table::Alerts).unwrap(), 0);
        assert!(store.latest_group("g1").unwrap().is_none());
    }

    #[test]
    fn test_records_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.redb");
        let record = group("g1");
        {
            let store = RedbStore::open(&path).unwrap();
            store.insert_group(&record).unwrap();
        }
        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.latest_group("g1").unwrap(), Some(record));
    }

    #[test]
    fn test_sample_window_reads_only_recent_rows() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("store.redb")).unwrap();
        let now = Utc::now();
        store.append(Table::Samples, b"not json").unwrap();
        for (minutes_ago, cpu) in [(90, 1.0), (2, 2.0), (1, 3.0)] {
            store
                .insert_sample(&MetricSample {
                    timestamp: now - Duration::minutes(minutes_ago),
                    cpu_percent: cpu,
                    memory_percent: 20.0,
                    memory_rss_bytes: 2048,
                    event_loop_lag_ms: 0.5,
                })
                .unwrap();
        }

        let window = store.samples_between(now - Duration::minutes(10), now).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].cpu_percent, 2.0);
        assert_eq!(store.latest_sample().unwrap().unwrap().cpu_percent, 3.0);
        assert!(store.samples_between(DateTime::<Utc>::MIN_UTC, now).is_err());
        assert!(store.recent_alerts(5).unwrap().is_empty());
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("store.redb")).unwrap();
        let a = store.append(Table::Units, b"{}").unwrap();
        let b = store.append(Table::Units, b"{}").unwrap();
        assert_eq!(b, a + 1);
        assert_eq!(store.remove(Table::Units, &[a, 99]).unwrap(), 1);
        assert_eq!(store.count(Table::Units).unwrap(), 1);

        store.clear().unwrap();
        assert_eq!(store.count(Table::Units).unwrap(), 0);
    }
}
