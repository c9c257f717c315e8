//! Error taxonomy shared across crates (§7).

use thiserror::Error;

/// Structured error codes a caller can match on, per §7's propagation policy:
/// no internal error crosses a public API boundary as a raw panic or an
/// unstructured string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DevacError {
    #[error("resolution timed out")]
    Timeout,

    #[error("module not found: {0}")]
    ModuleNotFound(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("circular dependency: {0}")]
    CircularDependency(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("hub error: {0}")]
    Hub(String),

    #[error("config error: {0}")]
    Config(String),
}

impl DevacError {
    /// The taxonomy code as it appears in `ResolutionResult.errors` and
    /// other structured-error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            DevacError::Timeout => "TIMEOUT",
            DevacError::ModuleNotFound(_) => "MODULE_NOT_FOUND",
            DevacError::ParseError(_) => "PARSE_ERROR",
            DevacError::CircularDependency(_) => "CIRCULAR_DEPENDENCY",
            DevacError::Internal(_) => "INTERNAL_ERROR",
            DevacError::Storage(_) => "STORAGE_ERROR",
            DevacError::Hub(_) => "HUB_ERROR",
            DevacError::Config(_) => "CONFIG_ERROR",
        }
    }
}
