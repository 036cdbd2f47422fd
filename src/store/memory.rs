//! In-memory store for tests and throwaway runs

use super::{MetricsStore, StoreError, Table};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Logs {
    tables: BTreeMap<Table, BTreeMap<u64, Vec<u8>>>,
    next_key: BTreeMap<Table, u64>,
}

/// Volatile `MetricsStore`; contents are lost on drop
#[derive(Default)]
pub struct MemoryStore {
    logs: Mutex<Logs>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Logs>, StoreError> {
        self.logs.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl MetricsStore for MemoryStore {
    fn append(&self, table: Table, value: &[u8]) -> Result<u64, StoreError> {
        let mut logs = self.lock()?;
        let next = logs.next_key.entry(table).or_insert(0);
        let key = *next;
        *next += 1;
        logs.tables.entry(table).or_default().insert(key, value.to_vec());
        Ok(key)
    }

    fn entries(&self, table: Table) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        let logs = self.lock()?;
        Ok(logs
            .tables
            .get(&table)
            .map(|t| t.iter().map(|(k, v)| (*k, v.clone())).collect())
            .unwrap_or_default())
    }

    fn scan_back(
        &self,
        table: Table,
        visit: &mut dyn FnMut(&[u8]) -> Result<bool, StoreError>,
    ) -> Result<(), StoreError> {
        let logs = self.lock()?;
        let Some(entries) = logs.tables.get(&table) else {
            return Ok(());
        };
        for value in entries.values().rev() {
            if !visit(value.as_slice())? {
                break;
            }
        }
        Ok(())
    }

    fn remove(&self, table: Table, keys: &[u64]) -> Result<usize, StoreError> {
        let mut logs = self.lock()?;
        let Some(entries) = logs.tables.get_mut(&table) else {
            return Ok(0);
        };
        Ok(keys.iter().filter(|k| entries.remove(*k).is_some()).count())
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.lock()?.tables.clear();
        Ok(())
    }

    fn count(&self, table: Table) -> Result<usize, StoreError> {
        Ok(self.lock()?.tables.get(&table).map_or(0, BTreeMap::len))
    }
}
