mod memory;
mod postgres;
mod postgrest;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use postgrest::PostgrestStore;

use crate::config::{BackendKind, Config};
use crate::record::{FlatRecord, Table};
use log::info;
use serde_json::Value;
use std::fmt;

/// SQLSTATE for `foreign_key_violation`.
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Debug)]
pub enum StoreError {
    /// A referenced parent row does not exist (yet).
    ForeignKey { table: Table, detail: String },
    /// The backend answered but refused the write.
    Rejected { table: Table, message: String },
    Request(reqwest::Error, String),
    Database(sqlx::Error),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ForeignKey { table, detail } => {
                write!(f, "Foreign key violation on {table}: {detail}")
            }
            StoreError::Rejected { table, message } => write!(f, "Write to {table} rejected: {message}"),
            StoreError::Request(e, url) => write!(f, "Store request to {url} failed: {e}"),
            StoreError::Database(e) => write!(f, "Database error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Request(e, _) => Some(e),
            StoreError::Database(e) => Some(e),
            StoreError::ForeignKey { .. } | StoreError::Rejected { .. } => None,
        }
    }
}

impl StoreError {
    pub fn is_foreign_key(&self) -> bool {
        matches!(self, StoreError::ForeignKey { .. })
    }
}

/// Write side of the backing store.
///
/// Every write is independent: there is no batching and no transaction
/// spanning several records.
#[allow(async_fn_in_trait)]
pub trait Store {
    /// Insert, or overwrite the row sharing the table's conflict key.
    async fn upsert(&self, record: &FlatRecord) -> Result<(), StoreError>;

    /// Plain insert, for tables without a natural key.
    async fn insert(&self, record: &FlatRecord) -> Result<(), StoreError>;

    async fn select_all(&self, table: Table) -> Result<Vec<Value>, StoreError>;
}

/// The store picked by configuration.
#[derive(Debug)]
pub enum Backend {
    Postgrest(PostgrestStore),
    Postgres(PgStore),
    Memory(MemoryStore),
}

impl Backend {
    /// Open the configured store. A dry run always gets a fresh
    /// `MemoryStore`, whatever the configuration says.
    pub async fn open(config: &Config, dry_run: bool) -> anyhow::Result<Self> {
        let kind = if dry_run { BackendKind::Memory } else { config.backend };
        let backend = match kind {
            BackendKind::Postgrest => {
                let (url, key) = config.supabase()?;
                Backend::Postgrest(PostgrestStore::new(url, key, config.timeout))
            }
            BackendKind::Postgres => Backend::Postgres(PgStore::connect(config.postgres()?).await?),
            BackendKind::Memory => Backend::Memory(MemoryStore::new()),
        };
        info!("Using {} store", backend.name());
        Ok(backend)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Postgrest(_) => "postgrest",
            Backend::Postgres(_) => "postgres",
            Backend::Memory(_) => "in-memory",
        }
    }
}

impl Store for Backend {
    async fn upsert(&self, record: &FlatRecord) -> Result<(), StoreError> {
        match self {
            Backend::Postgrest(s) => s.upsert(record).await,
            Backend::Postgres(s) => s.upsert(record).await,
            Backend::Memory(s) => s.upsert(record).await,
        }
    }

    async fn insert(&self, record: &FlatRecord) -> Result<(), StoreError> {
        match self {
            Backend::Postgrest(s) => s.insert(record).await,
            Backend::Postgres(s) => s.insert(record).await,
            Backend::Memory(s) => s.insert(record).await,
        }
    }

    async fn select_all(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        match self {
            Backend::Postgrest(s) => s.select_all(table).await,
            Backend::Postgres(s) => s.select_all(table).await,
            Backend::Memory(s) => s.select_all(table).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let vars: HashMap<&str, &str> = pairs.iter().copied().collect();
        Config::from_vars(|key| vars.get(key).map(|v| (*v).to_owned())).unwrap()
    }

    #[tokio::test]
    async fn dry_run_always_uses_memory() {
        let backend = Backend::open(&config(&[]), true).await.unwrap();
        assert!(matches!(backend, Backend::Memory(_)));
    }

    #[tokio::test]
    async fn postgrest_needs_credentials() {
        assert!(Backend::open(&config(&[]), false).await.is_err());

        let backend = Backend::open(
            &config(&[("SUPABASE_URL", "https://demo.supabase.co"), ("SUPABASE_KEY", "anon")]),
            false,
        )
        .await
        .unwrap();
        assert_eq!(backend.name(), "postgrest");
    }

    #[tokio::test]
    async fn postgres_needs_connection_settings() {
        let result = Backend::open(&config(&[("INGEST_BACKEND", "postgres")]), false).await;
        assert!(result.is_err());
    }
}
