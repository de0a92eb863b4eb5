//! SQL authoring support module.
//!
//! This module provides:
//! - `completions` - debounced, cancellable agent-powered inline completions
//! - `prompts` - system context assembly for completion and conversation requests

mod completions;
pub mod prompts;

pub use completions::{CompletionEngine, SuggestionEvent, fetch_completion, normalize_suggestion};
