use anyhow::{Result, anyhow};
use async_lock::RwLock;
use futures::future::BoxFuture;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::sync::Arc;
use std::time::Duration;

use super::types::{RowObject, SqlStore};

/// Connection owner and `SqlStore` implementation backed by Postgres.
///
/// Arbitrary statements go through the database's `execute_sql(text)`
/// function, which returns a JSON payload: an array of row objects for
/// reads, an object with `rowsAffected` for writes.
#[derive(Debug, Clone)]
pub struct DatabaseManager {
    pool: Arc<RwLock<Option<PgPool>>>,
}

impl DatabaseManager {
    pub fn new() -> Self {
        Self {
            pool: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn connect_with_options(&self, options: PgConnectOptions) -> Result<()> {
        let pool_opts = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5));

        let pool = pool_opts.connect_with(options).await?;

        let mut pool_guard = self.pool.write().await;
        *pool_guard = Some(pool);
        Ok(())
    }

    pub async fn disconnect(&self) -> Result<()> {
        let mut pool_guard = self.pool.write().await;
        if let Some(pool) = pool_guard.take() {
            pool.close().await;
            Ok(())
        } else {
            Err(anyhow!("No active database connection to disconnect"))
        }
    }

    pub async fn is_connected(&self) -> bool {
        let pool_guard = self.pool.read().await;
        if let Some(pool) = pool_guard.as_ref() {
            sqlx::query("SELECT 1").fetch_one(pool).await.is_ok()
        } else {
            false
        }
    }

    async fn execute_raw(&self, sql: String) -> Result<Value> {
        let pool_guard = self.pool.read().await;
        let pool = pool_guard
            .as_ref()
            .ok_or_else(|| anyhow!("Database not connected"))?;

        let payload: Value = sqlx::query_scalar("SELECT execute_sql($1)")
            .bind(&sql)
            .fetch_one(pool)
            .await?;

        Ok(payload)
    }

    async fn fetch_sample_row(&self, table: String) -> Result<Option<RowObject>> {
        if !is_valid_identifier(&table) {
            return Err(anyhow!("Invalid table name: {}", table));
        }

        let pool_guard = self.pool.read().await;
        let pool = pool_guard
            .as_ref()
            .ok_or_else(|| anyhow!("Database not connected"))?;

        let sql = format!("SELECT * FROM \"{}\" LIMIT 1", table);
        let row = sqlx::query(&sql).fetch_optional(pool).await?;

        Ok(row.map(|row| row_to_object(&row)))
    }
}

impl SqlStore for DatabaseManager {
    fn run_sql(&self, sql: String) -> BoxFuture<'static, Result<Value>> {
        let manager = self.clone();
        Box::pin(async move { manager.execute_raw(sql).await })
    }

    fn sample_row(&self, table: String) -> BoxFuture<'static, Result<Option<RowObject>>> {
        let manager = self.clone();
        Box::pin(async move { manager.fetch_sample_row(table).await })
    }
}

pub(crate) fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn row_to_object(row: &PgRow) -> RowObject {
    let mut object = RowObject::new();
    for (index, column) in row.columns().iter().enumerate() {
        object.insert(column.name().to_string(), decode_cell(row, index));
    }
    object
}

fn decode_cell(row: &PgRow, index: usize) -> Value {
    match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(_) => {}
        Err(_) => return Value::Null,
    }

    let type_name = row.columns()[index].type_info().name().to_string();
    match type_name.as_str() {
        "BOOL" => row
            .try_get::<bool, _>(index)
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "INT2" | "INT4" => row
            .try_get::<i32, _>(index)
            .map(|v| Value::from(v as i64))
            .unwrap_or(Value::Null),
        "INT8" => row
            .try_get::<i64, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "FLOAT4" => row
            .try_get::<f32, _>(index)
            .map(|v| Value::from(v as f64))
            .unwrap_or(Value::Null),
        "FLOAT8" => row
            .try_get::<f64, _>(index)
            .map(Value::from)
            .unwrap_or(Value::Null),
        "NUMERIC" => row
            .try_get::<rust_decimal::Decimal, _>(index)
            .map(|v| Value::String(v.to_string()))
            .unwrap_or(Value::Null),
        // Postgres can render most remaining types as text
        _ => row
            .try_get::<String, _>(index)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}
