use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One result row as returned by the execution facility. Key order follows
/// column order (serde_json is built with `preserve_order`).
pub type RowObject = Map<String, Value>;

/// The two operations the authoring pipeline needs from the data store.
pub trait SqlStore: Send + Sync {
    /// Run arbitrary SQL through the generic execution facility and return
    /// the engine's raw payload: an array of row objects for reads, an
    /// object carrying `rowsAffected` for writes.
    fn run_sql(&self, sql: String) -> BoxFuture<'static, Result<Value>>;

    /// Fetch a single sample row from the named table, if any.
    fn sample_row(&self, table: String) -> BoxFuture<'static, Result<Option<RowObject>>>;
}

/// Coarse classification of a SQL statement by its leading keyword. Affects
/// only how the raw engine result is interpreted, never how it is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Other,
}

impl StatementKind {
    pub fn classify(sql: &str) -> Self {
        let keyword = sql
            .trim_start()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();

        match keyword.as_str() {
            "select" => Self::Select,
            "insert" => Self::Insert,
            "update" => Self::Update,
            "delete" => Self::Delete,
            _ => Self::Other,
        }
    }

    pub fn is_select(self) -> bool {
        self == Self::Select
    }
}

/// Uniform report for any executed statement.
///
/// For `select`, `rows` is present and `affected_count` equals the row
/// count. For every other kind `rows` is absent and `affected_count` is the
/// engine-reported count (0 when the engine does not report one).
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionReport {
    pub statement_kind: StatementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<RowObject>>,
    pub affected_count: u64,
    pub human_message: String,
    pub executed_at: DateTime<Utc>,
}

impl ExecutionReport {
    /// Column names derived from the first returned row, in column order.
    pub fn column_names(&self) -> Vec<String> {
        self.rows
            .as_deref()
            .and_then(|rows| rows.first())
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// Column metadata as exposed to prompts and the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
}

/// Ordered textual model of the database schema. Rebuilt wholesale on
/// demand and replaced atomically-by-reference, never patched in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDescription {
    pub tables: Vec<TableDescriptor>,
}

impl SchemaDescription {
    /// Flat textual form consumed by prompts: per-table column listings
    /// followed by example statements grounded in the actual table names.
    pub fn render(&self) -> String {
        let tables = self
            .tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|col| {
                        let nullable = if col.nullable { "nullable" } else { "not null" };
                        match &col.default {
                            Some(default) => {
                                format!("  - {} ({}, {}, {})", col.name, col.data_type, nullable, default)
                            }
                            None => format!("  - {} ({}, {})", col.name, col.data_type, nullable),
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("\n");

                format!("Table: {}\n{}", table.name, columns)
            })
            .collect::<Vec<_>>()
            .join("\n\n");

        match self.tables.first() {
            Some(table) => format!("{}\n\n{}", tables, example_queries(table)),
            None => tables,
        }
    }
}

fn example_queries(table: &TableDescriptor) -> String {
    // Columns the user would plausibly write to: everything but `id`.
    let writable: Vec<&str> = table
        .columns
        .iter()
        .filter(|col| col.name != "id")
        .map(|col| col.name.as_str())
        .collect();
    let placeholders = writable
        .iter()
        .map(|name| format!("'new_{}'", name))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Example queries you can suggest:\n\
         - SELECT * FROM {name};\n\
         - SELECT * FROM {name} WHERE {first} = 'some_value';\n\
         - INSERT INTO {name} ({cols}) VALUES ({vals});\n\
         - UPDATE {name} SET {first} = 'updated_value' WHERE id = 1;\n\
         - DELETE FROM {name} WHERE id = 1;\n\n\
         The user has a PostgreSQL database. Always use the lowercase table name '{name}' in your queries.",
        name = table.name,
        first = writable.first().copied().unwrap_or("id"),
        cols = writable.join(", "),
        vals = placeholders,
    )
}
