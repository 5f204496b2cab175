//! Error types for the Parley domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Parley operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    // --- Skill errors ---
    #[error("Skill error: {0}")]
    Skill(#[from] SkillError),

    // --- Speech recognition errors ---
    #[error("Speech recognition failed: {0}")]
    Recognition(String),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Evaluator lifecycle ---
    #[error("Evaluator is no longer running")]
    EvaluatorClosed,

    #[error("Evaluator queue is full")]
    QueueFull,

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the failure was caused by the network (used to pick a friendlier message).
    pub fn is_network_error(&self) -> bool {
        matches!(self, Error::Skill(SkillError::Network(_)))
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum SkillError {
    #[error("Skill execution failed: {skill_id}: {reason}")]
    ExecutionFailed { skill_id: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Skill {skill_id} received data of an unexpected type")]
    DataMismatch { skill_id: String },

    #[error("Skill {skill_id} panicked: {reason}")]
    Panicked { skill_id: String, reason: String },

    #[error("Skill unavailable: {0}")]
    Unavailable(String),
}

impl SkillError {
    /// Build a [`SkillError::Panicked`] from the payload of a caught panic.
    pub fn from_panic(skill_id: &str, payload: &(dyn std::any::Any + Send)) -> Self {
        SkillError::Panicked {
            skill_id: skill_id.to_string(),
            reason: panic_message(payload),
        }
    }
}

/// The message of a caught panic, when it carried one.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into())
}
