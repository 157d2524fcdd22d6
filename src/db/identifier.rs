//! Table identifier resolution
//!
//! Splits possibly partially-qualified dotted table references into
//! (catalog, schema, table) using the warehouse defaults. Pure string
//! handling, no I/O; an empty raw reference resolves to an empty table
//! segment and is left for the backend to reject.

/// A resolved (catalog, schema, table) reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub table: String,
}

impl TableRef {
    /// Dot-joined rendering containing only the non-empty segments.
    pub fn qualified(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(catalog) = self.catalog.as_deref() {
            if !catalog.is_empty() {
                parts.push(catalog);
            }
        }
        if let Some(schema) = self.schema.as_deref() {
            if !schema.is_empty() {
                parts.push(schema);
            }
        }
        parts.push(&self.table);
        parts.join(".")
    }
}

/// Split a raw dotted reference into a [`TableRef`].
///
/// Segments are trimmed and empty segments dropped before counting:
/// 3 segments are used verbatim, 2 borrow the default catalog, 1 borrows
/// both defaults.
pub fn resolve(raw: &str, default_catalog: Option<&str>, default_schema: Option<&str>) -> TableRef {
    let parts: Vec<&str> = raw
        .split('.')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();

    match parts.as_slice() {
        [catalog, schema, table, ..] => TableRef {
            catalog: Some((*catalog).to_string()),
            schema: Some((*schema).to_string()),
            table: (*table).to_string(),
        },
        [schema, table] => TableRef {
            catalog: default_catalog.map(str::to_string),
            schema: Some((*schema).to_string()),
            table: (*table).to_string(),
        },
        [table] => TableRef {
            catalog: default_catalog.map(str::to_string),
            schema: default_schema.map(str::to_string),
            table: (*table).to_string(),
        },
        [] => TableRef {
            catalog: default_catalog.map(str::to_string),
            schema: default_schema.map(str::to_string),
            table: String::new(),
        },
    }
}

/// Quote an identifier for embedding into generated SQL.
///
/// Internal double quotes are doubled so the value cannot break out of the
/// identifier context.
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}
