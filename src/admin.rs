//! Maintenance commands: connectivity check, sample row, schema setup.

use crate::record::{FlatRecord, Table};
use crate::store::{Backend, Store};
use anyhow::{Result, bail};
use log::info;
use serde_json::Value;

/// Read back the small tables to prove the store is reachable.
pub async fn check<S: Store>(store: &S) -> Result<()> {
    for table in [Table::SampleData, Table::Users] {
        let rows = store.select_all(table).await?;
        info!("{table}: {} rows", rows.len());
        for row in &rows {
            info!("  {row}");
        }
    }
    Ok(())
}

/// Insert one `sample_data` row and return the table's contents afterwards.
pub async fn sample<S: Store>(store: &S, player_name: &str, player_sport: &str) -> Result<Vec<Value>> {
    let mut record = FlatRecord::new(Table::SampleData);
    record.set("player_name", player_name)?;
    record.set("player_sport", player_sport)?;
    store.insert(&record).await?;

    let rows = store.select_all(Table::SampleData).await?;
    info!("Inserted sample row, {} now in {}", rows.len(), Table::SampleData);
    Ok(rows)
}

pub async fn migrate(store: &Backend) -> Result<()> {
    match store {
        Backend::Postgres(pg) => Ok(pg.create_tables().await?),
        other => bail!(
            "migrate needs a direct postgres connection (INGEST_BACKEND=postgres), not {}",
            other.name()
        ),
    }
}
