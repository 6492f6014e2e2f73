//! Global configuration.
//!
//! Loaded from an explicit path, .codeloop.yml, or ~/.config/codeloop/codeloop.yml

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CodeloopError, Result};
use crate::llm::{anthropic, gemini};

/// Project config file in the working directory.
pub const PROJECT_CONFIG: &str = ".codeloop.yml";

/// Global configuration for codeloop.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Default log filter when RUST_LOG is unset.
    pub log_level: Option<String>,

    /// Model provider settings.
    pub llm: LlmConfig,

    /// Interpreter used to run generated code.
    pub sandbox: SandboxConfig,

    /// Artifact log settings.
    pub artifacts: ArtifactConfig,

    /// Interactive loop settings.
    pub agent: AgentConfig,
}

impl Config {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. .codeloop.yml in current directory
    /// 3. ~/.config/codeloop/codeloop.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // Explicit path takes precedence
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let project_config = PathBuf::from(PROJECT_CONFIG);
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => return Ok(config),
                Err(e) => log::warn!("Failed to load {}: {}", PROJECT_CONFIG, e),
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("codeloop").join("codeloop.yml");
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => log::warn!("Failed to load {}: {}", user_config.display(), e),
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| CodeloopError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_yaml::from_str(&content)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.sandbox.interpreter.trim().is_empty() {
            return Err(CodeloopError::Config("sandbox.interpreter must not be empty".into()));
        }
        if self.sandbox.language.trim().is_empty() {
            return Err(CodeloopError::Config("sandbox.language must not be empty".into()));
        }
        if self.agent.exit_command.trim().is_empty() {
            return Err(CodeloopError::Config("agent.exit-command must not be empty".into()));
        }
        Ok(())
    }

    /// Render as YAML for `codeloop config`.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Hosted model providers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Gemini,
    Anthropic,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Model provider settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LlmConfig {
    pub provider: Provider,

    /// Model name; the provider's default when unset.
    pub model: Option<String>,

    /// Environment variable holding the API key.
    pub api_key_env: Option<String>,

    /// Endpoint override (tests, proxies).
    pub base_url: Option<String>,

    /// Output token cap (anthropic only).
    pub max_tokens: u32,

    /// HTTP client timeout. No timeout when unset.
    pub timeout_ms: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            model: None,
            api_key_env: None,
            base_url: None,
            max_tokens: anthropic::DEFAULT_MAX_TOKENS,
            timeout_ms: None,
        }
    }
}

impl LlmConfig {
    pub fn resolved_model(&self) -> String {
        self.model.clone().unwrap_or_else(|| match self.provider {
            Provider::Gemini => gemini::DEFAULT_MODEL.to_string(),
            Provider::Anthropic => anthropic::DEFAULT_MODEL.to_string(),
        })
    }

    pub fn resolved_api_key_env(&self) -> String {
        self.api_key_env.clone().unwrap_or_else(|| match self.provider {
            Provider::Gemini => "GEMINI_API_KEY".to_string(),
            Provider::Anthropic => "ANTHROPIC_API_KEY".to_string(),
        })
    }

    pub fn resolved_base_url(&self) -> String {
        self.base_url.clone().unwrap_or_else(|| match self.provider {
            Provider::Gemini => gemini::GEMINI_API_URL.to_string(),
            Provider::Anthropic => anthropic::ANTHROPIC_API_URL.to_string(),
        })
    }
}

/// Interpreter used to run generated code.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SandboxConfig {
    /// Interpreter program.
    pub interpreter: String,

    /// Arguments placed before the code.
    pub args: Vec<String>,

    /// Fence tag the extractor looks for (```python).
    pub language: String,

    /// Extra environment for the interpreter process.
    pub env: BTreeMap<String, String>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            args: vec!["-c".to_string()],
            language: "python".to_string(),
            // piped stdout would otherwise be block-buffered until exit
            env: BTreeMap::from([("PYTHONUNBUFFERED".to_string(), "1".to_string())]),
        }
    }
}

/// Artifact log settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ArtifactConfig {
    pub path: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("ai_generated_code.log"),
        }
    }
}

/// Interactive loop settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AgentConfig {
    /// Request that ends the session.
    pub exit_command: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            exit_command: "exit".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.llm.provider, Provider::Gemini);
        assert_eq!(config.llm.resolved_model(), "gemini-1.5-pro");
        assert_eq!(config.llm.resolved_api_key_env(), "GEMINI_API_KEY");
        assert!(config.llm.timeout_ms.is_none());
        assert_eq!(config.sandbox.interpreter, "python3");
        assert_eq!(config.sandbox.args, vec!["-c"]);
        assert_eq!(config.sandbox.language, "python");
        assert_eq!(config.sandbox.env.get("PYTHONUNBUFFERED").map(String::as_str), Some("1"));
        assert_eq!(config.artifacts.path, PathBuf::from("ai_generated_code.log"));
        assert_eq!(config.agent.exit_command, "exit");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_anthropic_provider_defaults() {
        let llm = LlmConfig {
            provider: Provider::Anthropic,
            ..Default::default()
        };
        assert_eq!(llm.resolved_model(), anthropic::DEFAULT_MODEL);
        assert_eq!(llm.resolved_api_key_env(), "ANTHROPIC_API_KEY");
        assert_eq!(llm.resolved_base_url(), anthropic::ANTHROPIC_API_URL);
    }

    #[test]
    fn test_load_from_file_partial() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("codeloop.yml");
        fs::write(
            &path,
            r#"
log-level: warn
llm:
  provider: anthropic
  model: claude-3-5-haiku-latest
  timeout-ms: 30000
sandbox:
  interpreter: /usr/bin/python3
artifacts:
  path: logs/code.log
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.log_level.as_deref(), Some("warn"));
        assert_eq!(config.llm.provider, Provider::Anthropic);
        assert_eq!(config.llm.resolved_model(), "claude-3-5-haiku-latest");
        assert_eq!(config.llm.timeout_ms, Some(30_000));
        assert_eq!(config.sandbox.interpreter, "/usr/bin/python3");
        // Unspecified fields keep their defaults
        assert_eq!(config.sandbox.args, vec!["-c"]);
        assert!(config.sandbox.env.contains_key("PYTHONUNBUFFERED"));
        assert_eq!(config.artifacts.path, PathBuf::from("logs/code.log"));
        assert_eq!(config.agent.exit_command, "exit");
    }

    #[test]
    fn test_load_missing_explicit_path() {
        let result = Config::load(Some(&PathBuf::from("/nonexistent/codeloop.yml")));
        assert!(matches!(result, Err(CodeloopError::Config(_))));
    }

    #[test]
    fn test_load_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yml");
        fs::write(&path, "llm: [unclosed").unwrap();
        assert!(matches!(Config::load(Some(&path)), Err(CodeloopError::Yaml(_))));
    }

    #[test]
    fn test_validate_rejects_empty_interpreter() {
        let mut config = Config::default();
        config.sandbox.interpreter = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_exit_command() {
        let mut config = Config::default();
        config.agent.exit_command = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_uses_kebab_case() {
        let yaml = Config::default().to_yaml().unwrap();
        assert!(yaml.contains("exit-command: exit"));
        assert!(yaml.contains("provider: gemini"));
        let reparsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(reparsed.sandbox.language, "python");
    }
}
