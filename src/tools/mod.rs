//! Fixed tool set exposed to the model
//!
//! Tools are a closed enumeration: arguments are validated into typed
//! records before execution, and dispatch is an exhaustive match, not a
//! name lookup in an open map. Invalid arguments never reach the backend.

pub mod report;

use crate::db::warehouse::{value_text, WarehouseClient};
use crate::db::SchemaIntrospector;
use crate::error::{AgentError, Result};
use crate::llm::ToolSchema;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Shared dependencies handed to every tool execution.
#[derive(Clone)]
pub struct ToolContext {
    pub warehouse: Arc<WarehouseClient>,
}

fn default_max_rows() -> usize {
    50
}

fn default_sample_rows() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct RunSqlArgs {
    pub statement: String,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

#[derive(Debug, Deserialize)]
pub struct DescribeTableArgs {
    pub table: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileTableArgs {
    pub table: String,
    #[serde(default = "default_sample_rows")]
    pub sample_rows: usize,
}

#[derive(Debug, Deserialize)]
pub struct ComposeHtmlReportArgs {
    pub title: String,
    /// Kept loose on purpose: entries that are not valid md/html blocks are
    /// silently dropped rather than rejected.
    pub blocks: Vec<Value>,
    #[serde(default)]
    pub css: Option<String>,
}

#[derive(Debug)]
pub enum ToolCall {
    RunSql(RunSqlArgs),
    DescribeTable(DescribeTableArgs),
    ProfileTable(ProfileTableArgs),
    ComposeHtmlReport(ComposeHtmlReportArgs),
}

impl ToolCall {
    /// Validate a named call's arguments into a typed record.
    pub fn parse(name: &str, arguments: &Value) -> Result<Self> {
        fn validated<T: serde::de::DeserializeOwned>(name: &str, arguments: &Value) -> Result<T> {
            serde_json::from_value(arguments.clone()).map_err(|e| {
                AgentError::ToolInput(format!("invalid arguments for '{}': {}", name, e))
            })
        }

        match name {
            "run_sql" => Ok(Self::RunSql(validated(name, arguments)?)),
            "describe_table" => Ok(Self::DescribeTable(validated(name, arguments)?)),
            "profile_table" => Ok(Self::ProfileTable(validated(name, arguments)?)),
            "compose_html_report" => Ok(Self::ComposeHtmlReport(validated(name, arguments)?)),
            other => Err(AgentError::ToolInput(format!("unknown tool '{}'", other))),
        }
    }

    /// Execute against the shared context; tools 1-3 read the backend,
    /// the report tool performs no I/O.
    pub async fn execute(&self, context: &ToolContext) -> Result<String> {
        match self {
            Self::RunSql(args) => {
                context
                    .warehouse
                    .query_markdown(&args.statement, &[], args.max_rows)
                    .await
            }
            Self::DescribeTable(args) => {
                let table = context.warehouse.descriptor().resolve_table(&args.table);
                let introspector = SchemaIntrospector::new(&context.warehouse);
                Ok(introspector.build_table_summary(&table, "Table").await)
            }
            Self::ProfileTable(args) => profile_table(context, args).await,
            Self::ComposeHtmlReport(args) => Ok(report::compose_html_report(
                &args.title,
                &args.blocks,
                args.css.as_deref(),
            )),
        }
    }

    /// Declared input schemas for all four tools.
    pub fn schemas() -> Vec<ToolSchema> {
        vec![
            ToolSchema {
                name: "run_sql".to_string(),
                description: "Execute SQL and return a Markdown table.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "statement": {
                            "type": "string",
                            "description": "SQL statement to execute"
                        },
                        "max_rows": {
                            "type": "integer",
                            "description": "Maximum number of rows to render (default 50)"
                        }
                    },
                    "required": ["statement"]
                }),
            },
            ToolSchema {
                name: "describe_table".to_string(),
                description: "Describe a table's columns, types and example values.".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "table": {
                            "type": "string",
                            "description": "Table name, optionally qualified as catalog.schema.table"
                        }
                    },
                    "required": ["table"]
                }),
            },
            ToolSchema {
                name: "profile_table".to_string(),
                description: "Profile a table (row count, schema, sample rows).".to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "table": {
                            "type": "string",
                            "description": "Table name, optionally qualified"
                        },
                        "sample_rows": {
                            "type": "integer",
                            "description": "Number of sample rows to include (default 5)"
                        }
                    },
                    "required": ["table"]
                }),
            },
            ToolSchema {
                name: "compose_html_report".to_string(),
                description: "Render a self-contained HTML document from Markdown/HTML blocks."
                    .to_string(),
                parameters: json!({
                    "type": "object",
                    "properties": {
                        "title": {
                            "type": "string",
                            "description": "Report title"
                        },
                        "blocks": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "kind": {
                                        "type": "string",
                                        "enum": ["md", "html"],
                                        "description": "Either 'md' or 'html'"
                                    },
                                    "content": {"type": "string"}
                                },
                                "required": ["kind", "content"]
                            },
                            "description": "Ordered report sections"
                        },
                        "css": {
                            "type": "string",
                            "description": "Optional stylesheet overriding the default"
                        }
                    },
                    "required": ["title", "blocks"]
                }),
            },
        ]
    }
}

async fn profile_table(context: &ToolContext, args: &ProfileTableArgs) -> Result<String> {
    let table = context.warehouse.descriptor().resolve_table(&args.table);
    let qualified = table.qualified();

    let count_result = context
        .warehouse
        .query(&format!("SELECT COUNT(*) AS row_count FROM {}", qualified), &[])
        .await?;
    // Non-integer counts pass through in their natural text form.
    let row_count = count_result
        .rows
        .first()
        .and_then(|row| row.first())
        .map(value_text)
        .unwrap_or_default();

    let introspector = SchemaIntrospector::new(&context.warehouse);
    let schema_summary = introspector.build_table_summary(&table, "Table").await;

    let sample_markdown = context
        .warehouse
        .query_markdown(
            &format!("SELECT * FROM {} LIMIT {}", qualified, args.sample_rows),
            &[],
            args.sample_rows,
        )
        .await?;

    Ok(format!(
        "**Profile: {}**\n\n- **Row count:** {}\n- **Schema:**\n{}\n\n- **Sample rows:**\n{}",
        qualified, row_count, schema_summary, sample_markdown
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::warehouse::FALLBACK_URL;

    #[test]
    fn test_parse_applies_defaults() {
        let call = ToolCall::parse("run_sql", &json!({"statement": "SELECT 1"})).unwrap();
        match call {
            ToolCall::RunSql(args) => {
                assert_eq!(args.statement, "SELECT 1");
                assert_eq!(args.max_rows, 50);
            }
            other => panic!("unexpected variant: {:?}", other),
        }
    }

    #[test]
    fn test_parse_rejects_missing_required_argument() {
        let err = ToolCall::parse("run_sql", &json!({"max_rows": 10})).unwrap_err();
        assert!(matches!(err, AgentError::ToolInput(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_tool() {
        let err = ToolCall::parse("drop_everything", &json!({})).unwrap_err();
        assert!(matches!(err, AgentError::ToolInput(_)));
    }

    async fn seeded_context() -> ToolContext {
        let client = WarehouseClient::connect(Some(FALLBACK_URL.to_string()), None, None)
            .await
            .expect("in-memory warehouse");
        client
            .query("CREATE TABLE orders (id INTEGER NOT NULL, amount REAL)", &[])
            .await
            .unwrap();
        client
            .query("INSERT INTO orders VALUES (1, 10.5), (2, 20.0), (3, NULL)", &[])
            .await
            .unwrap();
        ToolContext {
            warehouse: Arc::new(client),
        }
    }

    #[tokio::test]
    async fn test_run_sql_renders_markdown() {
        let context = seeded_context().await;
        let call = ToolCall::parse(
            "run_sql",
            &json!({"statement": "SELECT id FROM orders ORDER BY id", "max_rows": 2}),
        )
        .unwrap();
        let output = call.execute(&context).await.unwrap();
        assert!(output.starts_with("id\n---"));
        assert_eq!(output.lines().count(), 4);
    }

    #[tokio::test]
    async fn test_describe_table_tool_summarizes_columns() {
        let context = seeded_context().await;
        let call = ToolCall::parse("describe_table", &json!({"table": "orders"})).unwrap();
        let output = call.execute(&context).await.unwrap();
        assert!(output.starts_with("- Table orders"));
        assert!(output.contains("• amount"));
    }

    #[tokio::test]
    async fn test_profile_table_composes_all_sections() {
        let context = seeded_context().await;
        let call = ToolCall::parse("profile_table", &json!({"table": "orders", "sample_rows": 2}))
            .unwrap();
        let output = call.execute(&context).await.unwrap();
        assert!(output.starts_with("**Profile: orders**"));
        assert!(output.contains("- **Row count:** 3"));
        assert!(output.contains("- **Schema:**"));
        assert!(output.contains("- **Sample rows:**"));
    }

    #[tokio::test]
    async fn test_run_sql_failure_is_a_backend_error() {
        let context = seeded_context().await;
        let call = ToolCall::parse("run_sql", &json!({"statement": "SELECT nope FROM nowhere"}))
            .unwrap();
        let err = call.execute(&context).await.unwrap_err();
        assert!(matches!(err, AgentError::Backend(_)));
    }
}
