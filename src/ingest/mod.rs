pub mod apisports;
pub mod espn;
pub mod fields;

use crate::record::{FlatRecord, Table};
use crate::store::{Store, StoreError};
use anyhow::Result;
use fields::Column;
use log::{info, warn};
use serde_json::Value;
use sportsdb_api::client::HttpClient;
use sportsdb_api::extract::extract;
use std::collections::{BTreeMap, HashSet};

/// State owned by one ingestion run. Created fresh per invocation and passed
/// down explicitly.
#[derive(Debug, Default)]
pub struct RunContext {
    /// Team names already written during this run.
    pub seen_teams: HashSet<String>,
    pub stats: RunStats,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Debug, Default)]
pub struct RunStats {
    written: BTreeMap<Table, usize>,
    skipped: BTreeMap<Table, usize>,
}

impl RunStats {
    pub fn written(&self, table: Table) -> usize {
        self.written.get(&table).copied().unwrap_or(0)
    }

    pub fn skipped(&self, table: Table) -> usize {
        self.skipped.get(&table).copied().unwrap_or(0)
    }

    fn record_write(&mut self, table: Table) {
        *self.written.entry(table).or_default() += 1;
    }

    fn record_skip(&mut self, table: Table) {
        *self.skipped.entry(table).or_default() += 1;
    }

    pub fn log_summary(&self) {
        for table in Table::ALL {
            let (written, skipped) = (self.written(table), self.skipped(table));
            if written > 0 || skipped > 0 {
                info!("{table}: {written} upserted, {skipped} skipped");
            }
        }
    }
}

/// Extraction and submission steps shared by every source.
pub struct Pipeline<'a, S> {
    client: &'a HttpClient,
    store: &'a S,
}

impl<'a, S: Store> Pipeline<'a, S> {
    pub fn new(client: &'a HttpClient, store: &'a S) -> Self {
        Self { client, store }
    }

    pub fn client(&self) -> &HttpClient {
        self.client
    }

    /// Build a record for `table`: one extraction per mapped column, then
    /// the fixed values. Columns nobody maps stay `null`.
    pub async fn flatten(
        &self,
        table: Table,
        item: &Value,
        columns: &[Column],
        fixed: &[(&str, Value)],
    ) -> Result<FlatRecord> {
        let mut record = FlatRecord::new(table);
        for column in columns {
            let field = extract(self.client, item, &column.field).await?;
            record.set(column.name, column.format.apply(field))?;
        }
        for (name, value) in fixed {
            record.set(name, value.clone())?;
        }
        Ok(record)
    }

    /// Upsert an entity row. Rows missing part of their key are skipped;
    /// any store failure ends the run.
    pub async fn submit(&self, record: &FlatRecord, ctx: &mut RunContext) -> Result<bool> {
        let table = record.table();
        if record.key().is_none() {
            warn!("Skipping {table} row without a complete key: {}", record.to_json());
            ctx.stats.record_skip(table);
            return Ok(false);
        }

        self.store.upsert(record).await?;
        ctx.stats.record_write(table);
        Ok(true)
    }

    /// Upsert a relationship row. A missing parent row skips just this
    /// record; other failures end the run.
    pub async fn submit_relation(&self, record: &FlatRecord, ctx: &mut RunContext) -> Result<bool> {
        match self.submit(record, ctx).await {
            Err(e) => match e.downcast::<StoreError>() {
                Ok(err) if err.is_foreign_key() => {
                    warn!("Skipping row, parent not stored yet: {err}");
                    ctx.stats.record_skip(record.table());
                    Ok(false)
                }
                Ok(other) => Err(other.into()),
                Err(e) => Err(e),
            },
            ok => ok,
        }
    }
}
