//! Configuration system for codeloop.
//!
//! A single YAML file, every field defaulted, optionally overridden from the
//! command line.

pub use self::global::{AgentConfig, ArtifactConfig, Config, LlmConfig, PROJECT_CONFIG, Provider, SandboxConfig};

mod global;
