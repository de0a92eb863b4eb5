//! Conversation endpoint.

use serde::{Deserialize, Serialize};

use crate::services::agent::{LanguageModel, Message};
use crate::services::sql::prompts;

use super::{HttpMethod, method_not_allowed};

/// Message shape on the wire: plain role string plus flat content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Option<Vec<WireMessage>>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub current_query: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<ChatPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatPayload {
    pub message: String,
}

impl ChatResponse {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

pub async fn handle_chat(
    method: HttpMethod,
    request: ChatRequest,
    model: &dyn LanguageModel,
) -> ChatResponse {
    if method != HttpMethod::Post {
        return ChatResponse::failure(method_not_allowed(method));
    }

    let Some(messages) = request.messages else {
        return ChatResponse::failure("Messages array is required");
    };

    let schema = request.schema.as_deref().unwrap_or_default();
    let system = prompts::conversation_context(schema, request.current_query.as_deref());

    let history: Vec<Message> = messages
        .iter()
        .map(|message| match message.role.as_str() {
            "user" => Message::user(message.content.clone()),
            _ => Message::assistant(message.content.clone()),
        })
        .collect();

    match model.complete(system, history).await {
        Ok(reply) if !reply.trim().is_empty() => ChatResponse {
            success: true,
            data: Some(ChatPayload { message: reply }),
            error: None,
        },
        Ok(_) => ChatResponse::failure("No response from the language model"),
        Err(error) => ChatResponse::failure(error.to_string()),
    }
}
