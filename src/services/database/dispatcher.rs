//! Dispatch of arbitrary SQL text and normalization of the engine's
//! heterogeneous result shapes into a uniform report.

use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crate::error::{CoreError, CoreResult};

use super::types::{ExecutionReport, RowObject, SqlStore, StatementKind};

/// Actionable replacement for the raw engine failure when the execution
/// facility itself is missing.
const MISSING_FACILITY_MESSAGE: &str = "Database function not found. Please create the execute_sql \
     function in your database before running queries.";

pub struct QueryDispatcher {
    store: Arc<dyn SqlStore>,
}

impl QueryDispatcher {
    pub fn new(store: Arc<dyn SqlStore>) -> Self {
        Self { store }
    }

    /// Execute one statement and normalize the result.
    ///
    /// The statement kind only affects interpretation of the raw payload;
    /// every kind goes through the same generic execution call.
    pub async fn execute(&self, statement: &str) -> CoreResult<ExecutionReport> {
        let trimmed = statement.trim();
        if trimmed.is_empty() {
            return Err(CoreError::Validation("Query cannot be empty".to_string()));
        }

        let kind = StatementKind::classify(trimmed);
        let payload = self
            .store
            .run_sql(trimmed.to_string())
            .await
            .map_err(map_engine_error)?;

        tracing::debug!(?kind, "statement executed");
        Ok(normalize(kind, payload))
    }
}

fn map_engine_error(error: anyhow::Error) -> CoreError {
    let message = error.to_string();
    if message.contains("function") && message.contains("does not exist") {
        CoreError::Configuration(MISSING_FACILITY_MESSAGE.to_string())
    } else {
        CoreError::Execution(message)
    }
}

fn normalize(kind: StatementKind, payload: Value) -> ExecutionReport {
    if kind.is_select() {
        // Absent or non-array payloads normalize to an empty row set.
        let rows: Vec<RowObject> = payload
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default();
        let count = rows.len() as u64;

        return ExecutionReport {
            statement_kind: kind,
            rows: Some(rows),
            affected_count: count,
            human_message: format!("Query returned {} row(s)", count),
            executed_at: Utc::now(),
        };
    }

    let affected = payload
        .get("rowsAffected")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let human_message = match kind {
        StatementKind::Insert => format!("Inserted {} row(s) successfully", affected),
        StatementKind::Update => format!("Updated {} row(s) successfully", affected),
        StatementKind::Delete => format!("Deleted {} row(s) successfully", affected),
        _ => format!("Query executed successfully, {} row(s) affected", affected),
    };

    ExecutionReport {
        statement_kind: kind,
        rows: None,
        affected_count: affected,
        human_message,
        executed_at: Utc::now(),
    }
}
