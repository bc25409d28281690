use super::{FOREIGN_KEY_VIOLATION, Store, StoreError};
use crate::config::PgSettings;
use crate::record::{FlatRecord, Table};
use anyhow::{Context, Result};
use log::info;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use sqlx::types::Json;
use std::time::Duration;

const SCHEMA: &str = include_str!("../../db/schema.sql");

/// Direct Postgres connection. Rows are handed over as one JSON object and
/// expanded server-side with `jsonb_populate_record`, so column types come
/// from the table definition.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(settings: &PgSettings) -> Result<Self> {
        let pool_options = PgPoolOptions::new()
            .max_connections(4)
            .acquire_timeout(settings.timeout)
            .idle_timeout(Duration::from_millis(30_000));

        let connect_options = PgConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database)
            .ssl_mode(PgSslMode::Prefer);

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .context("Failed to connect to the PostgreSQL database")?;

        Ok(Self { pool })
    }

    /// Create every table the ingesters write to, if missing.
    pub async fn create_tables(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Database)?;
        info!("Schema applied");
        Ok(())
    }

    async fn write(&self, record: &FlatRecord, merge: bool) -> Result<(), StoreError> {
        let table = record.table();
        sqlx::query(&write_statement(table, merge))
            .bind(Json(record.to_json()))
            .execute(&self.pool)
            .await
            .map_err(|e| classify(table, e))?;
        Ok(())
    }
}

impl Store for PgStore {
    async fn upsert(&self, record: &FlatRecord) -> Result<(), StoreError> {
        self.write(record, true).await
    }

    async fn insert(&self, record: &FlatRecord) -> Result<(), StoreError> {
        self.write(record, false).await
    }

    async fn select_all(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        let statement = format!("SELECT to_jsonb(t) FROM {} t", quote(table.name()));
        sqlx::query_scalar::<_, Value>(&statement)
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Database)
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn write_statement(table: Table, merge: bool) -> String {
    let name = quote(table.name());
    let columns = table
        .columns()
        .iter()
        .map(|c| quote(c))
        .collect::<Vec<String>>()
        .join(", ");

    let mut statement = format!(
        "INSERT INTO {name} ({columns}) SELECT {columns} FROM jsonb_populate_record(NULL::{name}, $1)"
    );

    let key = table.conflict_key();
    if merge && !key.is_empty() {
        let target = key.iter().map(|c| quote(c)).collect::<Vec<String>>().join(", ");
        let updates = table
            .columns()
            .iter()
            .filter(|c| !key.contains(*c))
            .map(|c| format!("{0} = EXCLUDED.{0}", quote(c)))
            .collect::<Vec<String>>();

        if updates.is_empty() {
            statement.push_str(&format!(" ON CONFLICT ({target}) DO NOTHING"));
        } else {
            statement.push_str(&format!(
                " ON CONFLICT ({target}) DO UPDATE SET {}",
                updates.join(", ")
            ));
        }
    }

    statement
}

fn classify(table: Table, error: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &error
        && db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION)
    {
        return StoreError::ForeignKey { table, detail: db.message().to_owned() };
    }
    StoreError::Database(error)
}
