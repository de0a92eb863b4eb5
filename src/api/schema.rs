//! Schema description endpoint.

use serde::Serialize;

use crate::services::database::SchemaIntrospector;

use super::{HttpMethod, method_not_allowed};

#[derive(Debug, Clone, Serialize)]
pub struct SchemaResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SchemaPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaPayload {
    pub schema_description: String,
}

pub async fn handle_get_schema(
    method: HttpMethod,
    introspector: &SchemaIntrospector,
    table_names: &[String],
) -> SchemaResponse {
    if method != HttpMethod::Get {
        return SchemaResponse {
            success: false,
            data: None,
            error: Some(method_not_allowed(method)),
        };
    }

    // Introspection degrades per table, so this endpoint cannot fail.
    let description = introspector.describe_schema(table_names).await;
    SchemaResponse {
        success: true,
        data: Some(SchemaPayload {
            schema_description: description.render(),
        }),
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::database::{RowObject, SqlStore};
    use anyhow::{Result, anyhow};
    use futures::future::BoxFuture;
    use serde_json::Value;
    use std::sync::Arc;

    struct UnreachableStore;

    impl SqlStore for UnreachableStore {
        fn run_sql(&self, _sql: String) -> BoxFuture<'static, Result<Value>> {
            Box::pin(async move { Err(anyhow!("unreachable")) })
        }

        fn sample_row(&self, _table: String) -> BoxFuture<'static, Result<Option<RowObject>>> {
            Box::pin(async move { Err(anyhow!("unreachable")) })
        }
    }

    #[test]
    fn test_degraded_store_still_yields_schema() {
        let introspector = SchemaIntrospector::new(Arc::new(UnreachableStore));
        let response = smol::block_on(handle_get_schema(
            HttpMethod::Get,
            &introspector,
            &["dummytable".to_string()],
        ));

        assert!(response.success);
        let description = response.data.unwrap().schema_description;
        assert!(description.contains("Table: dummytable"));
        assert!(description.contains("id (integer, not null, auto-increment)"));
    }

    #[test]
    fn test_rejects_post() {
        let introspector = SchemaIntrospector::new(Arc::new(UnreachableStore));
        let response = smol::block_on(handle_get_schema(HttpMethod::Post, &introspector, &[]));
        assert_eq!(response.error.as_deref(), Some("Method POST not allowed"));
    }
}
