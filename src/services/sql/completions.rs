//! Agent-powered inline completion engine.
//!
//! One engine instance serves one editor session. Keystrokes are coalesced
//! by a restartable debounce timer; each issued request carries a fresh id,
//! and only the response matching the most recently issued id is ever
//! surfaced. Earlier in-flight responses are inert: there is no server-side
//! cancellation, only client-side supersession.

use std::sync::{
    Arc, Mutex, RwLock,
    atomic::{AtomicU64, Ordering},
};
use std::time::Duration;

use async_channel::Sender;

use crate::services::agent::{LanguageModel, Message};
use crate::services::sql::prompts;

/// Default debounce duration for inline completions.
const DEFAULT_INLINE_COMPLETION_DEBOUNCE: Duration = Duration::from_millis(800);

/// A resolved completion for one request. `suggestion` is `None` when the
/// model produced nothing useful or the request failed; that clears any
/// displayed ghost text rather than raising an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionEvent {
    pub request_id: u64,
    pub suggestion: Option<String>,
}

#[derive(Clone)]
pub struct CompletionEngine {
    model: Arc<dyn LanguageModel>,
    schema: Arc<RwLock<Option<String>>>,
    /// Counter for generating unique request IDs
    request_counter: Arc<AtomicU64>,
    /// Track the latest request ID to ignore stale responses
    latest_request_id: Arc<AtomicU64>,
    debounce: Duration,
    /// Pending debounce timer; replacing the task drops (and thereby
    /// truly cancels) the previous timer.
    pending_timer: Arc<Mutex<Option<smol::Task<()>>>>,
    suggestions: Sender<SuggestionEvent>,
}

impl CompletionEngine {
    pub fn new(model: Arc<dyn LanguageModel>, suggestions: Sender<SuggestionEvent>) -> Self {
        Self {
            model,
            schema: Arc::new(RwLock::new(None)),
            request_counter: Arc::new(AtomicU64::new(0)),
            latest_request_id: Arc::new(AtomicU64::new(0)),
            debounce: DEFAULT_INLINE_COMPLETION_DEBOUNCE,
            pending_timer: Arc::new(Mutex::new(None)),
            suggestions,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Replace the schema snapshot used for subsequent requests.
    pub fn set_schema(&self, schema: String) {
        let mut guard = self.schema.write().unwrap();
        *guard = Some(schema);
    }

    fn schema_snapshot(&self) -> String {
        let guard = self.schema.read().unwrap();
        guard.clone().unwrap_or_default()
    }

    /// Notify the engine of a buffer change. Restarts the debounce timer;
    /// no request is issued until input quiesces for the full interval.
    pub fn buffer_changed(&self, buffer: String, cursor: usize) {
        let engine = self.clone();
        let timer = smol::spawn(async move {
            smol::Timer::after(engine.debounce).await;
            // Detach the request so a later keystroke cancels only the
            // timer, never an already-dispatched call.
            smol::spawn(engine.clone().issue_request(buffer, cursor)).detach();
        });

        let mut pending = self.pending_timer.lock().unwrap();
        *pending = Some(timer);
    }

    /// Manual trigger: bypasses the debounce timer and issues a request
    /// immediately under the same supersession discipline.
    pub fn trigger_now(&self, buffer: String, cursor: usize) {
        self.pending_timer.lock().unwrap().take();
        smol::spawn(self.clone().issue_request(buffer, cursor)).detach();
    }

    async fn issue_request(self, buffer: String, cursor: usize) {
        if buffer.trim().is_empty() {
            return;
        }

        let request_id = self.request_counter.fetch_add(1, Ordering::SeqCst) + 1;
        // The marker only advances: an older claim scheduled late must not
        // displace a newer request that already owns it.
        self.latest_request_id
            .fetch_max(request_id, Ordering::SeqCst);

        let system = prompts::completion_context(&self.schema_snapshot());
        let user = prompts::completion_user_message(&buffer, cursor);
        let outcome = self.model.complete(system, vec![Message::user(user)]).await;

        // Last request wins: anything issued after us owns the marker.
        if self.latest_request_id.load(Ordering::SeqCst) != request_id {
            tracing::debug!(request_id, "discarding stale completion response");
            return;
        }

        let suggestion = match outcome {
            Ok(raw) => {
                let normalized = normalize_suggestion(&raw, &buffer);
                (!normalized.is_empty()).then_some(normalized)
            }
            Err(error) => {
                // Service failures degrade to "no suggestion" so typing
                // is never interrupted.
                tracing::debug!(request_id, %error, "inline completion failed");
                None
            }
        };

        let _ = self
            .suggestions
            .send(SuggestionEvent {
                request_id,
                suggestion,
            })
            .await;
    }
}

/// One-shot completion fetch, shared by the engine and the autocomplete
/// endpoint. Returns the normalized suggestion, which may be empty.
pub async fn fetch_completion(
    model: &dyn LanguageModel,
    schema: &str,
    partial_query: &str,
    cursor_position: usize,
) -> anyhow::Result<String> {
    let system = prompts::completion_context(schema);
    let user = prompts::completion_user_message(partial_query, cursor_position);
    let raw = model.complete(system, vec![Message::user(user)]).await?;
    Ok(normalize_suggestion(&raw, partial_query))
}

/// Clean a raw model suggestion for insertion at the cursor: strip leading
/// quote/dash/asterisk decoration and trailing quotes/whitespace, drop the
/// caller's already-typed prefix (case-insensitive), and make sure a
/// non-empty suggestion starts with a separating space.
pub fn normalize_suggestion(raw: &str, typed: &str) -> String {
    let stripped = raw.trim_start_matches(['"', '-', '*']);
    let stripped = stripped.trim_end_matches(|c: char| c == '"' || c.is_whitespace());

    let mut out = if !typed.is_empty()
        && stripped.len() >= typed.len()
        && stripped
            .get(..typed.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(typed))
    {
        stripped[typed.len()..].to_string()
    } else {
        stripped.to_string()
    };

    if !out.is_empty() && !out.starts_with(' ') {
        out.insert(0, ' ');
    }
    out
}
