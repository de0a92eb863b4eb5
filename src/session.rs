//! Workspace session wiring the authoring pipeline together.
//!
//! One `SqlSession` corresponds to one open editor: it owns the shared
//! rendered-schema state, the single-writer editor buffer, the completion
//! engine, the dispatcher, and the conversation.

use std::sync::{Arc, RwLock};

use async_channel::Sender;
use serde::Serialize;

use crate::error::CoreResult;
use crate::services::agent::LanguageModel;
use crate::services::chat::{ConversationManager, ConversationMessage};
use crate::services::database::{
    ExecutionReport, QueryDispatcher, RowObject, SchemaIntrospector, SqlStore,
    is_valid_identifier,
};
use crate::services::sql::{CompletionEngine, SuggestionEvent};

/// Column shape the UI renders; statement results only expose names, so
/// types are unknown.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// Rows and columns currently displayed by the results view.
#[derive(Debug, Clone, Serialize)]
pub struct TableSnapshot {
    pub rows: Vec<RowObject>,
    pub columns: Vec<SnapshotColumn>,
    pub row_count: usize,
}

pub struct SqlSession {
    dispatcher: QueryDispatcher,
    introspector: SchemaIntrospector,
    conversation: ConversationManager,
    completion: CompletionEngine,
    /// Tables the workspace displays and introspects.
    tables: Vec<String>,
    /// Rendered schema, replaced wholesale on every re-introspection.
    schema_text: Arc<RwLock<Option<Arc<String>>>>,
    /// Editor buffer model. Single writer: the user, or the fence-run
    /// path when reflecting assistant SQL back.
    buffer: Arc<RwLock<String>>,
}

impl SqlSession {
    pub fn new(
        store: Arc<dyn SqlStore>,
        model: Arc<dyn LanguageModel>,
        tables: Vec<String>,
        suggestions: Sender<SuggestionEvent>,
    ) -> Self {
        Self {
            dispatcher: QueryDispatcher::new(store.clone()),
            introspector: SchemaIntrospector::new(store),
            conversation: ConversationManager::new(model.clone()),
            completion: CompletionEngine::new(model, suggestions),
            tables,
            schema_text: Arc::new(RwLock::new(None)),
            buffer: Arc::new(RwLock::new(String::new())),
        }
    }

    pub fn conversation(&self) -> &ConversationManager {
        &self.conversation
    }

    pub fn completion(&self) -> &CompletionEngine {
        &self.completion
    }

    /// Re-introspect and replace the shared schema description. Returns
    /// the rendered text. Never fails; tables degrade individually.
    pub async fn refresh_schema(&self) -> Arc<String> {
        let description = self.introspector.describe_schema(&self.tables).await;
        let rendered = Arc::new(description.render());

        let mut guard = self.schema_text.write().unwrap();
        *guard = Some(rendered.clone());
        drop(guard);

        self.completion.set_schema(rendered.as_str().to_string());
        rendered
    }

    pub fn schema_text(&self) -> String {
        let guard = self.schema_text.read().unwrap();
        guard.as_deref().cloned().unwrap_or_default()
    }

    pub fn editor_buffer(&self) -> String {
        self.buffer.read().unwrap().clone()
    }

    /// A user edit: update the buffer and restart the completion debounce.
    pub fn edit(&self, text: String, cursor: usize) {
        *self.buffer.write().unwrap() = text.clone();
        self.completion.buffer_changed(text, cursor);
    }

    /// Execute a statement. Any successful non-select statement may have
    /// changed the schema, so the description is rebuilt.
    pub async fn execute(&self, statement: &str) -> CoreResult<ExecutionReport> {
        let report = self.dispatcher.execute(statement).await?;
        if !report.statement_kind.is_select() {
            self.refresh_schema().await;
        }
        Ok(report)
    }

    /// Execute whatever is currently in the editor.
    pub async fn execute_editor(&self) -> CoreResult<ExecutionReport> {
        let statement = self.editor_buffer();
        self.execute(&statement).await
    }

    /// Run an executable assistant fence: reflect it into the editor
    /// buffer, then dispatch it. This is the only feedback path from the
    /// conversation into the editor.
    pub async fn run_fence(&self, code: &str) -> CoreResult<ExecutionReport> {
        *self.buffer.write().unwrap() = code.to_string();
        self.execute(code).await
    }

    /// Materialize the UI-facing snapshot for a report: select results
    /// carry their own rows, anything else re-fetches the primary table.
    pub async fn snapshot_for(&self, report: &ExecutionReport) -> CoreResult<TableSnapshot> {
        if let Some(rows) = &report.rows {
            return Ok(snapshot_from_rows(rows.clone()));
        }

        // Table names come from configuration; apply the same identifier
        // guard the sample-row probe uses before splicing one into SQL.
        let Some(primary) = self
            .tables
            .first()
            .filter(|name| is_valid_identifier(name))
        else {
            return Ok(snapshot_from_rows(Vec::new()));
        };
        let refreshed = self
            .dispatcher
            .execute(&format!("SELECT * FROM \"{}\" ORDER BY id ASC", primary))
            .await?;
        Ok(snapshot_from_rows(refreshed.rows.unwrap_or_default()))
    }

    /// One conversation round trip: append the user turn, request the
    /// assistant turn against the current schema and buffer. A failed turn
    /// becomes an apologetic assistant notice instead of killing the thread.
    pub async fn send_chat(&self, text: &str) -> ConversationMessage {
        self.conversation.append_user_turn(text).await;

        let schema = self.schema_text();
        let buffer = self.editor_buffer();
        let current = (!buffer.trim().is_empty()).then_some(buffer.as_str());

        match self
            .conversation
            .request_assistant_turn(&schema, current)
            .await
        {
            Ok(message) => message,
            Err(error) => {
                tracing::warn!(%error, "assistant turn failed");
                self.conversation
                    .append_assistant_notice(
                        "Sorry, I encountered an error. Please make sure your API key is configured correctly.",
                    )
                    .await
            }
        }
    }
}

fn snapshot_from_rows(rows: Vec<RowObject>) -> TableSnapshot {
    let columns = rows
        .first()
        .map(|row| {
            row.keys()
                .map(|name| SnapshotColumn {
                    name: name.clone(),
                    data_type: "unknown".to_string(),
                    nullable: true,
                })
                .collect()
        })
        .unwrap_or_default();
    let row_count = rows.len();

    TableSnapshot {
        rows,
        columns,
        row_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::agent::Message;
    use crate::services::database::StatementKind;
    use anyhow::Result;
    use futures::future::BoxFuture;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Store fixture: selects return two rows, mutations report one
    /// affected row, and sample-row probes are counted.
    struct TinyStore {
        probes: AtomicUsize,
    }

    impl TinyStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                probes: AtomicUsize::new(0),
            })
        }
    }

    impl SqlStore for TinyStore {
        fn run_sql(&self, sql: String) -> BoxFuture<'static, Result<Value>> {
            Box::pin(async move {
                if StatementKind::classify(&sql).is_select() {
                    Ok(json!([
                        {"id": 1, "name": "a", "description": null},
                        {"id": 2, "name": "b", "description": "x"},
                    ]))
                } else {
                    Ok(json!({"rowsAffected": 1}))
                }
            })
        }

        fn sample_row(&self, _table: String) -> BoxFuture<'static, Result<Option<RowObject>>> {
            self.probes.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(None) })
        }
    }

    struct CannedModel(&'static str);

    impl LanguageModel for CannedModel {
        fn complete(&self, _system: String, _messages: Vec<Message>) -> BoxFuture<'static, Result<String>> {
            let reply = self.0;
            Box::pin(async move {
                if reply.is_empty() {
                    Err(anyhow::anyhow!("service unavailable"))
                } else {
                    Ok(reply.to_string())
                }
            })
        }
    }

    fn session(model: &'static str) -> (SqlSession, Arc<TinyStore>) {
        let store = TinyStore::new();
        let (tx, _rx) = async_channel::unbounded();
        let session = SqlSession::new(
            store.clone(),
            Arc::new(CannedModel(model)),
            vec!["dummytable".to_string()],
            tx,
        );
        (session, store)
    }

    #[test]
    fn test_mutation_triggers_schema_refresh() {
        smol::block_on(async {
            let (session, store) = session("ok");
            session.refresh_schema().await;
            assert_eq!(store.probes.load(Ordering::SeqCst), 1);

            session.execute("SELECT * FROM dummytable").await.unwrap();
            assert_eq!(store.probes.load(Ordering::SeqCst), 1);

            session
                .execute("DELETE FROM dummytable WHERE id = 1")
                .await
                .unwrap();
            assert_eq!(store.probes.load(Ordering::SeqCst), 2);
        });
    }

    #[test]
    fn test_run_fence_reflects_into_editor() {
        smol::block_on(async {
            let (session, _store) = session("ok");
            let report = session
                .run_fence("UPDATE dummytable SET name = 'John' WHERE id = 1;")
                .await
                .unwrap();

            assert_eq!(report.human_message, "Updated 1 row(s) successfully");
            assert_eq!(
                session.editor_buffer(),
                "UPDATE dummytable SET name = 'John' WHERE id = 1;"
            );
        });
    }

    #[test]
    fn test_snapshot_derives_columns_from_select() {
        smol::block_on(async {
            let (session, _store) = session("ok");
            let report = session.execute("SELECT * FROM dummytable").await.unwrap();
            let snapshot = session.snapshot_for(&report).await.unwrap();

            assert_eq!(snapshot.row_count, 2);
            let names: Vec<&str> = snapshot
                .columns
                .iter()
                .map(|column| column.name.as_str())
                .collect();
            assert_eq!(names, vec!["id", "name", "description"]);
        });
    }

    #[test]
    fn test_snapshot_refetches_after_mutation() {
        smol::block_on(async {
            let (session, _store) = session("ok");
            let report = session
                .execute("DELETE FROM dummytable WHERE id = 1")
                .await
                .unwrap();
            assert!(report.rows.is_none());

            let snapshot = session.snapshot_for(&report).await.unwrap();
            assert_eq!(snapshot.row_count, 2);
        });
    }

    #[test]
    fn test_snapshot_refetch_rejects_invalid_table_name() {
        smol::block_on(async {
            let store = TinyStore::new();
            let (tx, _rx) = async_channel::unbounded();
            let session = SqlSession::new(
                store.clone(),
                Arc::new(CannedModel("ok")),
                vec!["dummytable\"; DROP TABLE users".to_string()],
                tx,
            );

            let report = session
                .execute("DELETE FROM dummytable WHERE id = 1")
                .await
                .unwrap();
            // The unquotable table name must not be spliced into a refetch;
            // the snapshot degrades to empty instead.
            let snapshot = session.snapshot_for(&report).await.unwrap();
            assert_eq!(snapshot.row_count, 0);
            assert!(snapshot.columns.is_empty());
        });
    }

    #[test]
    fn test_failed_chat_turn_becomes_apologetic_notice() {
        smol::block_on(async {
            let (session, _store) = session("");
            let reply = session.send_chat("show me everything").await;

            assert!(reply.text.starts_with("Sorry, I encountered an error"));
            // User turn plus notice, ordinals intact.
            let history = session.conversation().history().await;
            assert_eq!(history.len(), 2);
            assert_eq!(history[1].ordinal, 2);
        });
    }
}
