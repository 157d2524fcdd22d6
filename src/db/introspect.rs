//! Schema introspection
//!
//! Pulls column metadata for a resolved table and samples a handful of
//! distinct values per column. Lookups that fail for any reason (table
//! absent, permission error, introspection unsupported) come back as empty
//! collections, never as errors — callers treat an empty list as "no
//! visible columns".

use crate::db::identifier::{quote_identifier, TableRef};
use crate::db::warehouse::{value_text, BackendKind, QueryResult, WarehouseClient};
use crate::error::Result;
use serde_json::{json, Value};
use tracing::warn;

/// Upper bound on sampled distinct values per column.
pub const SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    /// "YES" / "NO" when the backend reports nullability.
    pub nullable: Option<String>,
    pub default: Option<String>,
    pub examples: Vec<String>,
}

pub struct SchemaIntrospector<'a> {
    client: &'a WarehouseClient,
}

impl<'a> SchemaIntrospector<'a> {
    pub fn new(client: &'a WarehouseClient) -> Self {
        Self { client }
    }

    /// Column metadata for a resolved table; empty on any failure.
    pub async fn describe_table(&self, table: &TableRef) -> Vec<ColumnDescriptor> {
        match self.fetch_columns(table).await {
            Ok(columns) => columns,
            Err(e) => {
                warn!(table = %table.qualified(), error = %e, "introspection failed, treating as no visible columns");
                Vec::new()
            }
        }
    }

    async fn fetch_columns(&self, table: &TableRef) -> Result<Vec<ColumnDescriptor>> {
        let result = match self.client.descriptor().kind {
            BackendKind::Sqlite => {
                let sql = format!("PRAGMA table_info({})", quote_identifier(&table.table));
                let result = self.client.query(&sql, &[]).await?;
                return Ok(pragma_columns(&result));
            }
            BackendKind::Generic => match table.schema.as_deref() {
                Some(schema) => {
                    self.client
                        .query(
                            "SELECT column_name, data_type, is_nullable, column_default \
                             FROM information_schema.columns \
                             WHERE table_name = $1 AND table_schema = $2 \
                             ORDER BY ordinal_position",
                            &[json!(table.table), json!(schema)],
                        )
                        .await?
                }
                None => {
                    self.client
                        .query(
                            "SELECT column_name, data_type, is_nullable, column_default \
                             FROM information_schema.columns \
                             WHERE table_name = $1 \
                             ORDER BY ordinal_position",
                            &[json!(table.table)],
                        )
                        .await?
                }
            },
        };

        Ok(information_schema_columns(&result))
    }

    /// Up to `limit` distinct non-null, non-empty values of one column.
    /// Query errors are swallowed; sampling is strictly best-effort.
    pub async fn sample_column_values(
        &self,
        table: &TableRef,
        column: &str,
        limit: usize,
    ) -> Vec<String> {
        let quoted = quote_identifier(column);
        let sql = format!(
            "SELECT DISTINCT {} AS value FROM {} WHERE {} IS NOT NULL LIMIT {}",
            quoted,
            table.qualified(),
            quoted,
            limit
        );

        let result = match self.client.query(&sql, &[]).await {
            Ok(result) => result,
            Err(e) => {
                warn!(table = %table.qualified(), column, error = %e, "value sampling failed");
                return Vec::new();
            }
        };

        result
            .rows
            .iter()
            .filter_map(|row| row.first())
            .map(value_text)
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Human-readable bullet outline of a table's columns.
    pub async fn build_table_summary(&self, table: &TableRef, label: &str) -> String {
        let qualified = table.qualified();
        let columns = self.describe_table(table).await;
        if columns.is_empty() {
            return format!("- {} {} (no columns visible)", label, qualified);
        }

        let mut lines = vec![format!("- {} {}", label, qualified)];
        for mut column in columns {
            column.examples = self
                .sample_column_values(table, &column.name, SAMPLE_LIMIT)
                .await;

            let mut line = format!("    • {} {}", column.name, column.data_type);
            if let Some(nullable) = &column.nullable {
                line.push_str(&format!(" (nullable={})", nullable));
            }
            if let Some(default) = &column.default {
                line.push_str(&format!(" default={}", default));
            }
            if !column.examples.is_empty() {
                line.push_str(&format!(" (examples: {})", column.examples.join(", ")));
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

/// Map `PRAGMA table_info` rows (cid, name, type, notnull, dflt_value, pk).
fn pragma_columns(result: &QueryResult) -> Vec<ColumnDescriptor> {
    let name_idx = result.column_index("name");
    let type_idx = result.column_index("type");
    let notnull_idx = result.column_index("notnull");
    let default_idx = result.column_index("dflt_value");

    result
        .rows
        .iter()
        .map(|row| {
            let notnull = notnull_idx
                .and_then(|i| row.get(i))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            ColumnDescriptor {
                name: cell(row, name_idx),
                data_type: cell(row, type_idx),
                nullable: Some(if notnull == 0 { "YES" } else { "NO" }.to_string()),
                default: optional_cell(row, default_idx),
                examples: Vec::new(),
            }
        })
        .collect()
}

/// Map `information_schema.columns` rows.
fn information_schema_columns(result: &QueryResult) -> Vec<ColumnDescriptor> {
    let name_idx = result.column_index("column_name");
    let type_idx = result.column_index("data_type");
    let nullable_idx = result.column_index("is_nullable");
    let default_idx = result.column_index("column_default");

    result
        .rows
        .iter()
        .map(|row| ColumnDescriptor {
            name: cell(row, name_idx),
            data_type: cell(row, type_idx),
            nullable: optional_cell(row, nullable_idx),
            default: optional_cell(row, default_idx),
            examples: Vec::new(),
        })
        .collect()
}

fn cell(row: &[Value], index: Option<usize>) -> String {
    index
        .and_then(|i| row.get(i))
        .map(value_text)
        .unwrap_or_default()
}

fn optional_cell(row: &[Value], index: Option<usize>) -> Option<String> {
    index
        .and_then(|i| row.get(i))
        .map(value_text)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::identifier::resolve;
    use crate::db::warehouse::FALLBACK_URL;

    async fn seeded_client() -> WarehouseClient {
        let client = WarehouseClient::connect(Some(FALLBACK_URL.to_string()), None, None)
            .await
            .expect("in-memory warehouse");
        client
            .query(
                "CREATE TABLE accounts (id INTEGER NOT NULL, region TEXT, tier TEXT DEFAULT 'basic')",
                &[],
            )
            .await
            .unwrap();
        client
            .query(
                "INSERT INTO accounts VALUES (1, 'emea', 'basic'), (2, 'apac', 'pro'), (3, NULL, 'pro')",
                &[],
            )
            .await
            .unwrap();
        client
    }

    #[tokio::test]
    async fn test_describe_table_reports_columns() {
        let client = seeded_client().await;
        let introspector = SchemaIntrospector::new(&client);
        let table = resolve("accounts", None, None);

        let columns = introspector.describe_table(&table).await;
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[0].name, "id");
        assert_eq!(columns[0].nullable.as_deref(), Some("NO"));
        assert_eq!(columns[1].nullable.as_deref(), Some("YES"));
        assert!(columns[2].default.as_deref().unwrap_or("").contains("basic"));
    }

    #[tokio::test]
    async fn test_describe_missing_table_is_empty_not_error() {
        let client = seeded_client().await;
        let introspector = SchemaIntrospector::new(&client);
        let table = resolve("does_not_exist", None, None);

        assert!(introspector.describe_table(&table).await.is_empty());
    }

    #[tokio::test]
    async fn test_sampling_skips_nulls_and_respects_limit() {
        let client = seeded_client().await;
        let introspector = SchemaIntrospector::new(&client);
        let table = resolve("accounts", None, None);

        let values = introspector.sample_column_values(&table, "region", 5).await;
        assert_eq!(values.len(), 2);
        assert!(values.contains(&"emea".to_string()));

        let capped = introspector.sample_column_values(&table, "id", 1).await;
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn test_sampling_failure_is_swallowed() {
        let client = seeded_client().await;
        let introspector = SchemaIntrospector::new(&client);
        let table = resolve("does_not_exist", None, None);

        let values = introspector.sample_column_values(&table, "region", 5).await;
        assert!(values.is_empty());
    }

    #[tokio::test]
    async fn test_summary_outline_and_miss_line() {
        let client = seeded_client().await;
        let introspector = SchemaIntrospector::new(&client);

        let table = resolve("accounts", None, None);
        let summary = introspector.build_table_summary(&table, "Table").await;
        assert!(summary.starts_with("- Table accounts"));
        assert!(summary.contains("• region"));
        assert!(summary.contains("(examples: "));

        let missing = resolve("ghost", None, None);
        let summary = introspector.build_table_summary(&missing, "Table").await;
        assert_eq!(summary, "- Table ghost (no columns visible)");
    }
}
