// src/infra/errors.rs — Error types for Deja Q

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DejaQError {
    // Index errors (programmer/config mistakes, propagate to the caller)
    #[error("Embedding dimension mismatch: index holds {expected}-d vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector index is not ready: no dimension established yet")]
    IndexNotReady,

    // Collaborator errors (recoverable at the pipeline boundary)
    #[error("{collaborator} unavailable: {message}")]
    CollaboratorUnavailable {
        collaborator: String,
        message: String,
        retriable: bool,
    },

    // Event errors (filtered silently, never surfaced to users)
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DejaQError {
    /// Shorthand for a collaborator failure.
    pub fn unavailable(
        collaborator: impl Into<String>,
        message: impl Into<String>,
        retriable: bool,
    ) -> Self {
        DejaQError::CollaboratorUnavailable {
            collaborator: collaborator.into(),
            message: message.into(),
            retriable,
        }
    }

    /// Whether the intake pipeline may absorb this error and keep going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DejaQError::CollaboratorUnavailable { .. })
    }

    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            DejaQError::CollaboratorUnavailable {
                retriable: true,
                ..
            }
        )
    }
}
