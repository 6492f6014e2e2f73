//! Model client layer - single-turn text completion against hosted LLMs
//!
//! This module provides:
//! - ModelClient trait for API abstraction
//! - GeminiClient and AnthropicClient implementations
//! - ProviderClient for config-driven provider selection

pub mod anthropic;
pub mod client;
pub mod gemini;
pub mod provider;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{LlmError, ModelClient, api_key_from_env, load_env_file};
pub use gemini::{GeminiClient, GeminiConfig};
pub use provider::ProviderClient;
