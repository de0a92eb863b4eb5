//! Agent module for LLM-powered assistant functionality.
//!
//! This module provides:
//! - `client` - The Agent client for communicating with Anthropic's API
//! - `types` - Core message types and the `LanguageModel` seam

mod client;
mod types;

pub use client::{Agent, AgentBuilder};
pub use types::{ChatRole, ContentBlock, LanguageModel, Message};
