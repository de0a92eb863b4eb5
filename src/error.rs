//! Error taxonomy for the authoring core.

use thiserror::Error;

/// Failures the core surfaces to its callers.
///
/// Two other failure classes exist but are deliberately not represented
/// here: stale completion responses are dropped silently by the engine,
/// and introspection failures degrade to fallback descriptors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Missing or empty required input. Raised before any network call.
    #[error("{0}")]
    Validation(String),

    /// The execution facility itself is missing or misconfigured. Carries
    /// an actionable message instead of the raw engine failure.
    #[error("{0}")]
    Configuration(String),

    /// The data store rejected or failed the statement. The engine's
    /// message is passed through verbatim.
    #[error("{0}")]
    Execution(String),

    /// The LLM service failed or yielded no usable content.
    #[error("{0}")]
    Assistant(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
