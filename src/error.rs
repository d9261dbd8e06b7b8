//! Error types shared across the shell.

use thiserror::Error;

/// Failure reported by an external collaborator (auth provider, document
/// store, or role resolver). Providers reject with a `{code, message}` pair;
/// only the message is ever shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ProviderError {
    /// Machine-readable error code supplied by the provider.
    pub code: String,
    /// Human-readable message supplied by the provider.
    pub message: String,
}

impl ProviderError {
    /// Build a provider error from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Error raised while projecting a raw feed document into a display record.
///
/// Projection errors never propagate past the projector's callers: a
/// malformed document is treated exactly like a missing one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    /// The raw document could not be decoded into the expected shape.
    #[error("malformed document: {reason}")]
    Malformed {
        /// Decoder diagnostic for logging.
        reason: String,
    },
    /// A value could not be rendered for display.
    #[error("unrenderable field {field}")]
    Unrenderable {
        /// Name of the offending field.
        field: &'static str,
    },
}
