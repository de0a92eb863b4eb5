//! Best-effort schema introspection.
//!
//! This is a heuristic probe, not a catalog read: each table is described
//! from a single sample row, and anything that goes wrong degrades to a
//! known fallback descriptor set instead of failing the caller.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::{ColumnDescriptor, SchemaDescription, SqlStore, TableDescriptor};

pub struct SchemaIntrospector {
    store: Arc<dyn SqlStore>,
    /// Per-table fallback descriptors used when a table is empty or
    /// unreachable. Tables without an entry get the default set.
    fallbacks: HashMap<String, Vec<ColumnDescriptor>>,
}

impl SchemaIntrospector {
    pub fn new(store: Arc<dyn SqlStore>) -> Self {
        Self {
            store,
            fallbacks: HashMap::new(),
        }
    }

    /// Register a fallback descriptor set for one table.
    pub fn with_fallback(mut self, table: impl Into<String>, columns: Vec<ColumnDescriptor>) -> Self {
        self.fallbacks.insert(table.into(), columns);
        self
    }

    /// Describe the named tables. Never fails; individual tables degrade
    /// to their fallback descriptors.
    pub async fn describe_schema(&self, table_names: &[String]) -> SchemaDescription {
        let mut tables = Vec::with_capacity(table_names.len());

        for name in table_names {
            let columns = match self.store.sample_row(name.clone()).await {
                Ok(Some(row)) => row.keys().map(|key| derive_column(key)).collect(),
                Ok(None) => {
                    tracing::debug!(table = %name, "table empty, using fallback descriptors");
                    self.fallback_for(name)
                }
                Err(error) => {
                    tracing::debug!(table = %name, %error, "introspection degraded to fallback");
                    self.fallback_for(name)
                }
            };

            tables.push(TableDescriptor {
                name: name.clone(),
                columns,
            });
        }

        SchemaDescription { tables }
    }

    fn fallback_for(&self, table: &str) -> Vec<ColumnDescriptor> {
        self.fallbacks
            .get(table)
            .cloned()
            .unwrap_or_else(default_fallback_columns)
    }
}

/// Column heuristics for a sampled row: `integer` only for a column
/// literally named `id`, `text` otherwise; nullable unless named `id` or
/// `name`; `id` carries the auto-increment marker.
fn derive_column(name: &str) -> ColumnDescriptor {
    let is_id = name == "id";
    ColumnDescriptor {
        name: name.to_string(),
        data_type: if is_id { "integer" } else { "text" }.to_string(),
        nullable: !is_id && name != "name",
        default: is_id.then(|| "auto-increment".to_string()),
    }
}

/// The documented default fallback descriptor set.
pub fn default_fallback_columns() -> Vec<ColumnDescriptor> {
    vec![
        ColumnDescriptor {
            name: "id".to_string(),
            data_type: "integer".to_string(),
            nullable: false,
            default: Some("auto-increment".to_string()),
        },
        ColumnDescriptor {
            name: "name".to_string(),
            data_type: "text".to_string(),
            nullable: false,
            default: None,
        },
        ColumnDescriptor {
            name: "description".to_string(),
            data_type: "text".to_string(),
            nullable: true,
            default: None,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::types::RowObject;
    use anyhow::anyhow;
    use futures::future::BoxFuture;
    use serde_json::{Value, json};

    enum Probe {
        Row(Vec<(&'static str, Value)>),
        Empty,
        Failing,
    }

    struct ProbeStore {
        probe: Probe,
    }

    impl SqlStore for ProbeStore {
        fn run_sql(&self, _sql: String) -> BoxFuture<'static, anyhow::Result<Value>> {
            Box::pin(async move { Ok(Value::Null) })
        }

        fn sample_row(&self, _table: String) -> BoxFuture<'static, anyhow::Result<Option<RowObject>>> {
            let result = match &self.probe {
                Probe::Row(cells) => {
                    let mut row = RowObject::new();
                    for (key, value) in cells {
                        row.insert(key.to_string(), value.clone());
                    }
                    Ok(Some(row))
                }
                Probe::Empty => Ok(None),
                Probe::Failing => Err(anyhow!("permission denied for table")),
            };
            Box::pin(async move { result })
        }
    }

    fn introspector(probe: Probe) -> SchemaIntrospector {
        SchemaIntrospector::new(Arc::new(ProbeStore { probe }))
    }

    #[test]
    fn test_columns_derived_from_sample_row() {
        let introspector = introspector(Probe::Row(vec![
            ("id", json!(1)),
            ("name", json!("first")),
            ("created_at", json!("2026-01-01")),
        ]));

        let schema =
            smol::block_on(introspector.describe_schema(&["dummytable".to_string()]));

        let table = &schema.tables[0];
        assert_eq!(table.name, "dummytable");
        assert_eq!(
            table.columns,
            vec![
                ColumnDescriptor {
                    name: "id".to_string(),
                    data_type: "integer".to_string(),
                    nullable: false,
                    default: Some("auto-increment".to_string()),
                },
                ColumnDescriptor {
                    name: "name".to_string(),
                    data_type: "text".to_string(),
                    nullable: false,
                    default: None,
                },
                ColumnDescriptor {
                    name: "created_at".to_string(),
                    data_type: "text".to_string(),
                    nullable: true,
                    default: None,
                },
            ]
        );
    }

    #[test]
    fn test_empty_table_yields_fallback_verbatim() {
        let introspector = introspector(Probe::Empty);
        let schema =
            smol::block_on(introspector.describe_schema(&["dummytable".to_string()]));

        assert_eq!(schema.tables[0].columns, default_fallback_columns());
    }

    #[test]
    fn test_probe_failure_degrades_instead_of_propagating() {
        let introspector = introspector(Probe::Failing);
        let schema =
            smol::block_on(introspector.describe_schema(&["dummytable".to_string()]));

        assert_eq!(schema.tables[0].columns, default_fallback_columns());
    }

    #[test]
    fn test_custom_fallback_is_used_for_its_table() {
        let custom = vec![ColumnDescriptor {
            name: "sku".to_string(),
            data_type: "text".to_string(),
            nullable: false,
            default: None,
        }];
        let introspector = introspector(Probe::Empty).with_fallback("products", custom.clone());

        let schema = smol::block_on(
            introspector.describe_schema(&["products".to_string(), "orders".to_string()]),
        );

        assert_eq!(schema.tables[0].columns, custom);
        assert_eq!(schema.tables[1].columns, default_fallback_columns());
    }

    #[test]
    fn test_reintrospection_is_byte_identical() {
        let introspector = introspector(Probe::Row(vec![
            ("id", json!(1)),
            ("name", json!("x")),
            ("description", Value::Null),
        ]));
        let tables = vec!["dummytable".to_string()];

        let first = smol::block_on(introspector.describe_schema(&tables));
        let second = smol::block_on(introspector.describe_schema(&tables));

        assert_eq!(first, second);
        assert_eq!(first.render(), second.render());
    }
}
