//! AI-assisted SQL authoring core.
//!
//! Pairs a relational data store with an LLM assistant: a schema
//! introspector that keeps a textual model of the database fresh, a
//! debounced and cancellable inline-completion engine, a query dispatcher
//! that normalizes heterogeneous execution results, and a conversation
//! manager whose prompts are re-grounded in the current schema and editor
//! buffer on every turn.
//!
//! The editor widget, the rendering layer, and the concrete transport are
//! external collaborators; they interact with the core through
//! [`session::SqlSession`], the [`api`] handlers, and the
//! [`services::agent::LanguageModel`] / [`services::database::SqlStore`]
//! seams.

pub mod api;
pub mod error;
pub mod services;
pub mod session;

pub use error::{CoreError, CoreResult};
pub use session::{SqlSession, TableSnapshot};
