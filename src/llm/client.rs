//! Core model client trait and error types

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

/// Stateless model client - each call is independent (fresh context).
///
/// A call sends exactly one `user` turn. Anything the model needs from earlier
/// in the session (previous code, execution errors, human feedback) has to be
/// embedded in `prompt` by the caller.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a single prompt and return the model's text reply
    async fn query(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model identifier used for requests
    fn model(&self) -> &str;
}

/// Errors that can occur while talking to the model endpoint
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

/// Read an API key from the named environment variable.
///
/// Empty values count as missing.
pub fn api_key_from_env(env_var: &str) -> Result<String, LlmError> {
    match std::env::var(env_var) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(LlmError::MissingApiKey {
            env_var: env_var.to_string(),
        }),
    }
}

/// Load a `.env` file into the process environment.
///
/// `None` looks in the working directory and its parents. Variables that are
/// already set keep their values.
pub fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(path) => {
            log::info!("Loaded environment from {}", path.display());
            Some(path)
        }
        Err(e) => {
            log::debug!("No .env file loaded: {}", e);
            None
        }
    }
}

/// Parse a `retry-after` header value in seconds, defaulting to 60.
pub(crate) fn retry_after(headers: &reqwest::header::HeaderMap) -> Duration {
    let secs = headers
        .get("retry-after")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(60);
    Duration::from_secs(secs)
}
