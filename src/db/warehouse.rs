//! Warehouse client built on the sqlx `Any` driver
//!
//! One shared pool per process; every query checks out a fresh connection
//! and holds no state across calls. If `SQL_WAREHOUSE_URL` is not provided
//! the client falls back to an in-memory SQLite database so the service can
//! be started without any external dependencies.

use crate::db::identifier::{self, TableRef};
use crate::error::Result;
use itertools::Itertools;
use serde_json::Value;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Row};
use std::sync::Once;
use std::time::Duration;
use tracing::{debug, info};

pub const FALLBACK_URL: &str = "sqlite::memory:";
pub const NO_RESULT_SENTINEL: &str = "Query executed successfully with no result set.";

static INSTALL_DRIVERS: Once = Once::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Embedded SQLite; no catalog/schema concepts.
    Sqlite,
    /// Anything that speaks information_schema (PostgreSQL and friends).
    Generic,
}

/// Connection URL plus the catalog/schema defaults resolved once at
/// construction. Immutable thereafter.
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    pub url: String,
    pub kind: BackendKind,
    pub default_catalog: Option<String>,
    pub default_schema: Option<String>,
}

impl ConnectionDescriptor {
    pub fn resolve_table(&self, raw: &str) -> TableRef {
        identifier::resolve(
            raw,
            self.default_catalog.as_deref(),
            self.default_schema.as_deref(),
        )
    }

    /// Ensure a table name is fully qualified when the backend supports it.
    pub fn qualify_table(&self, raw: &str) -> String {
        self.resolve_table(raw).qualified()
    }
}

/// Ordered query output: column names plus rows of JSON values.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

pub struct WarehouseClient {
    pool: AnyPool,
    descriptor: ConnectionDescriptor,
}

impl WarehouseClient {
    /// Connect to the warehouse and resolve catalog/schema defaults.
    pub async fn connect(
        url: Option<String>,
        catalog_override: Option<String>,
        schema_override: Option<String>,
    ) -> Result<Self> {
        INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);

        let url = url.unwrap_or_else(|| FALLBACK_URL.to_string());
        let kind = if url.starts_with("sqlite") {
            BackendKind::Sqlite
        } else {
            BackendKind::Generic
        };

        // An in-memory SQLite database exists per connection, so the pool
        // must hand out the same one connection for it to persist.
        let max_connections = if kind == BackendKind::Sqlite && url.contains(":memory:") {
            1
        } else {
            10
        };

        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&url)
            .await?;

        // Test the connection
        sqlx::query("SELECT 1").execute(&pool).await?;

        let (default_catalog, default_schema) = match kind {
            BackendKind::Sqlite => (None, None),
            BackendKind::Generic => (
                Some(catalog_override.unwrap_or_else(|| "public".to_string())),
                Some(schema_override.unwrap_or_else(|| "public".to_string())),
            ),
        };

        info!(%url, ?kind, "connected to warehouse");

        Ok(Self {
            pool,
            descriptor: ConnectionDescriptor {
                url,
                kind,
                default_catalog,
                default_schema,
            },
        })
    }

    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    /// Execute one statement and return rows in column order.
    ///
    /// Parameters are bound through the driver, never interpolated into the
    /// statement text. Placeholder syntax follows the backend dialect.
    pub async fn query(&self, statement: &str, params: &[Value]) -> Result<QueryResult> {
        debug!(statement, param_count = params.len(), "executing statement");

        let mut query = sqlx::query(statement);
        for param in params {
            query = match param {
                Value::Null => query.bind(Option::<String>::None),
                Value::Bool(b) => query.bind(*b),
                Value::Number(n) if n.is_i64() => query.bind(n.as_i64().unwrap_or_default()),
                Value::Number(n) => query.bind(n.as_f64().unwrap_or_default()),
                Value::String(s) => query.bind(s.clone()),
                other => query.bind(other.to_string()),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;

        let columns = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => Vec::new(),
        };

        let rows = rows
            .iter()
            .map(|row| (0..row.columns().len()).map(|i| decode_value(row, i)).collect())
            .collect();

        Ok(QueryResult { columns, rows })
    }

    /// Execute a statement and render at most `max_rows` rows as Markdown.
    pub async fn query_markdown(
        &self,
        statement: &str,
        params: &[Value],
        max_rows: usize,
    ) -> Result<String> {
        let result = self.query(statement, params).await?;
        Ok(render_markdown(&result, max_rows))
    }
}

/// Render a result as a pipe-delimited Markdown table.
///
/// A zero-row result returns the fixed sentinel; a capped-to-zero body still
/// emits header and separator so the caller can tell the two cases apart.
pub fn render_markdown(result: &QueryResult, max_rows: usize) -> String {
    if result.is_empty() {
        return NO_RESULT_SENTINEL.to_string();
    }

    let header = result.columns.iter().join(" | ");
    let separator = result.columns.iter().map(|_| "---").join(" | ");
    let body = result
        .rows
        .iter()
        .take(max_rows)
        .map(|row| row.iter().map(|v| cell_text(v)).join(" | "))
        .join("\n");

    if body.is_empty() {
        format!("{}\n{}", header, separator)
    } else {
        format!("{}\n{}\n{}", header, separator, body)
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        _ => value_text(value),
    }
}

/// Natural text form of a cell value (no JSON quoting for strings).
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn decode_value(row: &AnyRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map(Value::from).unwrap_or(Value::Null);
    }
    Value::Null
}
