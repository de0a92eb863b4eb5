//! Arbitrary-SQL execution endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::services::database::QueryDispatcher;

use super::{HttpMethod, method_not_allowed};

#[derive(Debug, Clone, Deserialize)]
pub struct RunQueryRequest {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunQueryResponse {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            row_count: None,
            message: None,
            executed_at: None,
            error: Some(error.into()),
        }
    }
}

pub async fn handle_run_query(
    method: HttpMethod,
    request: RunQueryRequest,
    dispatcher: &QueryDispatcher,
) -> RunQueryResponse {
    if method != HttpMethod::Post {
        return RunQueryResponse::failure(method_not_allowed(method));
    }

    match dispatcher.execute(&request.query).await {
        Ok(report) => {
            let data = match &report.rows {
                Some(rows) => Value::Array(rows.iter().cloned().map(Value::Object).collect()),
                None => json!({ "rowsAffected": report.affected_count }),
            };
            RunQueryResponse {
                success: true,
                data: Some(data),
                row_count: Some(report.affected_count),
                message: Some(report.human_message),
                executed_at: Some(report.executed_at),
                error: None,
            }
        }
        Err(error) => RunQueryResponse::failure(error.to_string()),
    }
}
