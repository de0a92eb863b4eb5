//! Conversation management for the assistant panel.
//!
//! This module provides:
//! - `conversation` - ordered, append-only message history and assistant turns
//! - `fences` - extraction of executable code fences from assistant replies

mod conversation;
mod fences;

pub use conversation::{ConversationManager, ConversationMessage};
pub use fences::{MessageSegment, executable_blocks, extract_segments};
