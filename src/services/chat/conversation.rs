//! Multi-turn conversation state for the assistant panel.

use std::sync::Arc;

use async_lock::Mutex;
use serde::Serialize;

use crate::error::{CoreError, CoreResult};
use crate::services::agent::{ChatRole, LanguageModel, Message};
use crate::services::sql::prompts;

/// One turn in the conversation. Ordinals are assigned by the manager at
/// append time and strictly increase by one per message, whatever order the
/// underlying network calls complete in.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationMessage {
    pub ordinal: u64,
    pub role: ChatRole,
    pub text: String,
}

struct History {
    next_ordinal: u64,
    messages: Vec<ConversationMessage>,
}

impl History {
    fn append(&mut self, role: ChatRole, text: String) -> ConversationMessage {
        let message = ConversationMessage {
            ordinal: self.next_ordinal,
            role,
            text,
        };
        self.next_ordinal += 1;
        self.messages.push(message.clone());
        message
    }
}

/// Append-only, ordered conversation log plus the assistant round trip.
///
/// The full history is sent on every assistant request, prefixed by a
/// freshly rebuilt system context, so schema and editor drift is always
/// reflected. History is unbounded, matching the product behavior.
#[derive(Clone)]
pub struct ConversationManager {
    model: Arc<dyn LanguageModel>,
    history: Arc<Mutex<History>>,
}

impl ConversationManager {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            history: Arc::new(Mutex::new(History {
                next_ordinal: 1,
                messages: Vec::new(),
            })),
        }
    }

    /// Append a user turn and return its ordinal.
    pub async fn append_user_turn(&self, text: impl Into<String>) -> u64 {
        let mut history = self.history.lock().await;
        history.append(ChatRole::User, text.into()).ordinal
    }

    /// Append an assistant-authored notice without a model round trip.
    /// Used to keep the thread alive when a turn fails.
    pub async fn append_assistant_notice(&self, text: impl Into<String>) -> ConversationMessage {
        let mut history = self.history.lock().await;
        history.append(ChatRole::Assistant, text.into())
    }

    pub async fn history(&self) -> Vec<ConversationMessage> {
        let history = self.history.lock().await;
        history.messages.clone()
    }

    /// Request the next assistant turn, grounded in the given schema and
    /// editor buffer. The reply is appended (ordinal assigned on arrival)
    /// and returned.
    pub async fn request_assistant_turn(
        &self,
        schema: &str,
        current_buffer: Option<&str>,
    ) -> CoreResult<ConversationMessage> {
        let snapshot: Vec<Message> = {
            let history = self.history.lock().await;
            history
                .messages
                .iter()
                .map(|message| match message.role {
                    ChatRole::User => Message::user(message.text.clone()),
                    ChatRole::Assistant => Message::assistant(message.text.clone()),
                })
                .collect()
        };

        // Rebuilt per request, never baked in.
        let system = prompts::conversation_context(schema, current_buffer);

        let reply = self
            .model
            .complete(system, snapshot)
            .await
            .map_err(|error| CoreError::Assistant(error.to_string()))?;

        if reply.trim().is_empty() {
            return Err(CoreError::Assistant(
                "No response from the language model".to_string(),
            ));
        }

        let mut history = self.history.lock().await;
        Ok(history.append(ChatRole::Assistant, reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use futures::future::BoxFuture;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    /// Fixture that records every system context and message list it is
    /// handed, and replies with a canned string.
    struct RecordingModel {
        reply: String,
        seen: Arc<StdMutex<Vec<(String, usize)>>>,
        delay: Duration,
    }

    impl RecordingModel {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Arc::new(StdMutex::new(Vec::new())),
                delay: Duration::ZERO,
            })
        }
    }

    impl LanguageModel for RecordingModel {
        fn complete(&self, system: String, messages: Vec<Message>) -> BoxFuture<'static, Result<String>> {
            self.seen.lock().unwrap().push((system, messages.len()));
            let reply = self.reply.clone();
            let delay = self.delay;
            Box::pin(async move {
                if !delay.is_zero() {
                    smol::Timer::after(delay).await;
                }
                Ok(reply)
            })
        }
    }

    #[test]
    fn test_ordinals_are_gap_free_across_roles() {
        smol::block_on(async {
            let model = RecordingModel::new("reply");
            let manager = ConversationManager::new(model);

            assert_eq!(manager.append_user_turn("one").await, 1);
            let reply = manager.request_assistant_turn("", None).await.unwrap();
            assert_eq!(reply.ordinal, 2);
            assert_eq!(manager.append_user_turn("two").await, 3);

            let ordinals: Vec<u64> = manager
                .history()
                .await
                .iter()
                .map(|message| message.ordinal)
                .collect();
            assert_eq!(ordinals, vec![1, 2, 3]);
        });
    }

    #[test]
    fn test_user_turn_appended_while_assistant_outstanding() {
        smol::block_on(async {
            let model = Arc::new(RecordingModel {
                reply: "slow reply".to_string(),
                seen: Arc::new(StdMutex::new(Vec::new())),
                delay: Duration::from_millis(50),
            });
            let manager = ConversationManager::new(model);

            manager.append_user_turn("first").await;
            let pending = {
                let manager = manager.clone();
                smol::spawn(async move { manager.request_assistant_turn("", None).await })
            };

            // Second user message lands while the assistant turn is in
            // flight; the reply still gets the next ordinal at arrival.
            smol::Timer::after(Duration::from_millis(10)).await;
            assert_eq!(manager.append_user_turn("second").await, 2);

            let reply = pending.await.unwrap();
            assert_eq!(reply.ordinal, 3);

            let ordinals: Vec<u64> = manager
                .history()
                .await
                .iter()
                .map(|message| message.ordinal)
                .collect();
            assert_eq!(ordinals, vec![1, 2, 3]);
        });
    }

    #[test]
    fn test_system_context_rebuilt_per_request() {
        smol::block_on(async {
            let model = RecordingModel::new("ok");
            let seen = model.seen.clone();
            let manager = ConversationManager::new(model);

            manager.append_user_turn("hello").await;
            manager
                .request_assistant_turn("Table: a", Some("SELECT 1;"))
                .await
                .unwrap();
            manager.append_user_turn("again").await;
            manager
                .request_assistant_turn("Table: b", None)
                .await
                .unwrap();

            let calls = seen.lock().unwrap();
            assert_eq!(calls.len(), 2);
            assert!(calls[0].0.contains("Table: a"));
            assert!(calls[0].0.contains("SELECT 1;"));
            assert!(calls[1].0.contains("Table: b"));
            assert!(calls[1].0.contains("No query currently in the editor"));
            // Full history, not just the newest turn.
            assert_eq!(calls[0].1, 1);
            assert_eq!(calls[1].1, 3);
        });
    }

    #[test]
    fn test_empty_reply_is_an_assistant_error() {
        smol::block_on(async {
            let model = RecordingModel::new("   ");
            let manager = ConversationManager::new(model);

            manager.append_user_turn("hello").await;
            let err = manager.request_assistant_turn("", None).await.unwrap_err();
            assert!(matches!(err, CoreError::Assistant(_)));

            // The failed turn appends nothing.
            assert_eq!(manager.history().await.len(), 1);
        });
    }
}
