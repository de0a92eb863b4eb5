//! Inline-completion endpoint.

use serde::{Deserialize, Serialize};

use crate::services::agent::LanguageModel;
use crate::services::sql::fetch_completion;

use super::{HttpMethod, method_not_allowed};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutocompleteRequest {
    #[serde(default)]
    pub partial_query: String,
    #[serde(default)]
    pub cursor_position: usize,
    #[serde(default)]
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AutocompleteResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AutocompleteResponse {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            suggestion: None,
            error: Some(error.into()),
        }
    }
}

pub async fn handle_autocomplete(
    method: HttpMethod,
    request: AutocompleteRequest,
    model: &dyn LanguageModel,
) -> AutocompleteResponse {
    if method != HttpMethod::Post {
        return AutocompleteResponse::failure(method_not_allowed(method));
    }

    if request.partial_query.is_empty() {
        return AutocompleteResponse::failure("Partial query is required");
    }

    let schema = request.schema.as_deref().unwrap_or_default();
    match fetch_completion(
        model,
        schema,
        &request.partial_query,
        request.cursor_position,
    )
    .await
    {
        // An empty suggestion is a valid "nothing to suggest" result.
        Ok(suggestion) => AutocompleteResponse {
            success: true,
            suggestion: Some(suggestion),
            error: None,
        },
        Err(error) => AutocompleteResponse::failure(error.to_string()),
    }
}
