//! Error types for codeloop
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

use crate::llm::LlmError;

/// All error types that can occur in codeloop
#[derive(Debug, Error)]
pub enum CodeloopError {
    /// Configuration could not be loaded or failed validation
    #[error("Config error: {0}")]
    Config(String),

    /// Model client error
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Invalid state transition or operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Terminal read/write failed
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for codeloop operations
pub type Result<T> = std::result::Result<T, CodeloopError>;
