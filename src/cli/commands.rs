//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: interactive agent session (default)
//! - ask: one prompt, one reply
//! - config: print the effective configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{Config, Provider};

/// codeloop - generate, confirm, run and refine code with an LLM
#[derive(Parser, Debug)]
#[command(name = "codeloop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Model provider
    #[arg(long, global = true, value_enum)]
    pub provider: Option<Provider>,

    /// Model name
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Interpreter used to run generated code
    #[arg(long, global = true)]
    pub interpreter: Option<String>,

    /// Artifact log file
    #[arg(long, global = true)]
    pub artifact_log: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Default log filter: `--verbose` wins, then the config's `log-level`
    pub fn log_filter(&self, config: &Config) -> String {
        if self.verbose {
            return "debug".to_string();
        }
        config
            .log_level
            .as_deref()
            .map(str::trim)
            .filter(|level| !level.is_empty())
            .unwrap_or("info")
            .to_string()
    }

    /// Overlay command-line settings on a loaded config
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(provider) = self.provider {
            if provider != config.llm.provider {
                // Provider-specific settings from the file no longer apply
                config.llm.model = None;
                config.llm.api_key_env = None;
                config.llm.base_url = None;
            }
            config.llm.provider = provider;
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        if let Some(interpreter) = &self.interpreter {
            config.sandbox.interpreter = interpreter.clone();
        }
        if let Some(path) = &self.artifact_log {
            config.artifacts.path = path.clone();
        }
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start an interactive session (default)
    Run,

    /// Send a single prompt and print the reply
    Ask {
        /// Prompt text
        prompt: String,
    },

    /// Print the effective configuration as YAML
    Config,
}
