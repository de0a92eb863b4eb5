//! External interface envelopes and handlers.
//!
//! Transport-agnostic counterparts of the workspace's HTTP endpoints: each
//! handler checks the method, validates input before any network call, and
//! always returns a structured `{success, ...}` envelope instead of
//! panicking across the boundary.

mod autocomplete;
mod chat;
mod run_query;
mod schema;

pub use autocomplete::{AutocompleteRequest, AutocompleteResponse, handle_autocomplete};
pub use chat::{ChatPayload, ChatRequest, ChatResponse, WireMessage, handle_chat};
pub use run_query::{RunQueryRequest, RunQueryResponse, handle_run_query};
pub use schema::{SchemaPayload, SchemaResponse, handle_get_schema};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        };
        write!(f, "{}", name)
    }
}

pub(crate) fn method_not_allowed(method: HttpMethod) -> String {
    format!("Method {} not allowed", method)
}
