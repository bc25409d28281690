use super::{Store, StoreError};
use crate::record::{FlatRecord, Table};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// In-process tables with the same key and foreign-key rules as the real
/// schema. Backs `--dry-run` and the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: RefCell<BTreeMap<Table, Vec<FlatRecord>>>,
    writes: RefCell<BTreeMap<Table, usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self, table: Table) -> Vec<FlatRecord> {
        self.rows.borrow().get(&table).cloned().unwrap_or_default()
    }

    #[cfg(test)]
    pub fn len(&self, table: Table) -> usize {
        self.rows.borrow().get(&table).map(Vec::len).unwrap_or(0)
    }

    /// Number of successful writes to `table`, overwrites included.
    #[cfg(test)]
    pub fn writes(&self, table: Table) -> usize {
        self.writes.borrow().get(&table).copied().unwrap_or(0)
    }

    fn check_references(&self, record: &FlatRecord) -> Result<(), StoreError> {
        let rows = self.rows.borrow();
        for fk in record.table().foreign_keys() {
            let Some(wanted) = record.values_of(fk.columns) else {
                continue;
            };
            let found = rows
                .get(&fk.table)
                .into_iter()
                .flatten()
                .any(|row| row.values_of(fk.target).as_ref() == Some(&wanted));
            if !found {
                return Err(StoreError::ForeignKey {
                    table: record.table(),
                    detail: format!(
                        "key ({}) not present in table {}",
                        fk.columns.join(", "),
                        fk.table
                    ),
                });
            }
        }
        Ok(())
    }

    fn count_write(&self, table: Table) {
        *self.writes.borrow_mut().entry(table).or_default() += 1;
    }
}

impl Store for MemoryStore {
    async fn upsert(&self, record: &FlatRecord) -> Result<(), StoreError> {
        let table = record.table();
        if table.conflict_key().is_empty() {
            return self.insert(record).await;
        }

        let Some(key) = record.key() else {
            return Err(StoreError::Rejected {
                table,
                message: format!("null value in key ({})", table.conflict_key().join(", ")),
            });
        };
        self.check_references(record)?;

        {
            let mut tables = self.rows.borrow_mut();
            let rows = tables.entry(table).or_default();
            match rows.iter_mut().find(|row| row.key().as_ref() == Some(&key)) {
                Some(existing) => *existing = record.clone(),
                None => rows.push(record.clone()),
            }
        }

        self.count_write(table);
        Ok(())
    }

    async fn insert(&self, record: &FlatRecord) -> Result<(), StoreError> {
        self.check_references(record)?;
        self.rows
            .borrow_mut()
            .entry(record.table())
            .or_default()
            .push(record.clone());
        self.count_write(record.table());
        Ok(())
    }

    async fn select_all(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        Ok(self.rows(table).iter().map(FlatRecord::to_json).collect())
    }
}
