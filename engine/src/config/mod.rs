//! Configuration management
//!
//! This module handles loading, validation, and management of the Waypoint configuration.
//! Configuration is stored in TOML format at ~/.waypoint/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Workspace path, log level
//! - **llm**: Oracle provider selection and per-provider settings
//! - **agent**: Orchestration limits
//! - **tools**: Built-in capability enablement flags
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Canonicalizes paths to resolve symlinks and .. patterns
//! - Verifies workspace is a directory
//! - Creates workspace directory if it doesn't exist
//!
//! # Secrets
//!
//! API keys are never stored in the file. Cloud provider tables name the
//! environment variable the key is read from (`api_key_env`).
//!
//! # Examples
//!
//! ```no_run
//! use waypoint_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Workspace: {:?}", config.core.workspace);
//! println!("Provider: {}", config.llm.provider);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Providers `build_provider` knows how to construct
pub const SUPPORTED_PROVIDERS: [&str; 3] = ["ollama", "openai", "azure_openai"];

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Hosted-agent variables that take precedence over the file
pub const ENV_MODEL_TYPE: &str = "MODEL_TYPE";
pub const ENV_AZURE_INSTANCE: &str = "AZURE_OPENAI_INSTANCE_NAME";
pub const ENV_AZURE_DEPLOYMENT: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
pub const ENV_AZURE_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// Oracle provider configuration
    #[serde(default)]
    pub llm: LLMConfig,

    /// Orchestration limits
    #[serde(default)]
    pub agent: AgentConfig,

    /// Built-in capability enablement
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Workspace directory path (supports ~ expansion)
    pub workspace: PathBuf,

    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Oracle provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Active provider (ollama, openai, azure_openai)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// OpenAI provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,

    /// Azure OpenAI provider settings
    #[serde(default)]
    pub azure_openai: AzureOpenAIConfig,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,

    /// Environment variable holding the API key
    #[serde(default = "default_openai_key_env")]
    pub api_key_env: String,
}

/// Azure OpenAI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureOpenAIConfig {
    /// Azure resource name (`{instance}.openai.azure.com`)
    #[serde(default)]
    pub instance_name: String,

    /// Deployment name of the chat model
    #[serde(default)]
    pub deployment_name: String,

    /// REST API version
    #[serde(default = "default_azure_api_version")]
    pub api_version: String,

    /// Environment variable holding the API key
    #[serde(default = "default_azure_key_env")]
    pub api_key_env: String,

    /// Full endpoint override (private endpoints, proxies)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Orchestration limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Maximum number of executed steps before the run is forced to end
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

/// Built-in capability enablement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// read_file, write_file, list_directory
    #[serde(default = "default_true")]
    pub filesystem: bool,

    /// execute_command
    #[serde(default = "default_true")]
    pub execute_command: bool,

    /// get_environment_variable
    #[serde(default = "default_true")]
    pub environment: bool,

    /// get_pipeline_variable, set_pipeline_variable, get_pipeline_timeline
    #[serde(default = "default_true", alias = "pipeline_variables")]
    pub pipeline: bool,

    /// get_commit_info, get_pull_request_info, get_repository_info, get_branch_policy
    #[serde(default = "default_true")]
    pub git: bool,

    /// get_build_changes, get_build_info, get_test_results,
    /// check_artifact_exists, get_build_work_items
    #[serde(default = "default_true")]
    pub build: bool,

    /// send_notification
    #[serde(default = "default_true")]
    pub notification: bool,

    /// Wall-clock limit for a single shell command
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Per-request HTTP timeout for Azure DevOps REST calls
    #[serde(default = "default_devops_timeout")]
    pub devops_timeout_secs: u64,

    /// Echo `##vso[task.setvariable]` commands when a pipeline variable is set
    #[serde(default = "default_true")]
    pub emit_logging_commands: bool,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_request_timeout() -> u64 {
    300
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_azure_api_version() -> String {
    "2024-02-15-preview".to_string()
}

fn default_azure_key_env() -> String {
    "AZURE_OPENAI_API_KEY".to_string()
}

fn default_max_steps() -> usize {
    10
}

fn default_command_timeout() -> u64 {
    60
}

fn default_devops_timeout() -> u64 {
    30
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            request_timeout_secs: default_request_timeout(),
            ollama: OllamaConfig::default(),
            openai: OpenAIConfig::default(),
            azure_openai: AzureOpenAIConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            api_key_env: default_openai_key_env(),
        }
    }
}

impl Default for AzureOpenAIConfig {
    fn default() -> Self {
        Self {
            instance_name: String::new(),
            deployment_name: String::new(),
            api_version: default_azure_api_version(),
            api_key_env: default_azure_key_env(),
            base_url: None,
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            filesystem: true,
            execute_command: true,
            environment: true,
            pipeline: true,
            git: true,
            build: true,
            notification: true,
            command_timeout_secs: default_command_timeout(),
            devops_timeout_secs: default_devops_timeout(),
            emit_logging_commands: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.waypoint/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails (invalid paths, unknown provider, zero step limit)
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.apply_env_overrides(process_env);
        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();
        config.apply_env_overrides(process_env);
        config.validate_and_process()?;

        let toml_string = config.to_toml()?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Serialize the effective configuration
    pub fn to_toml(&self) -> Result<String, EngineError> {
        toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Get the default configuration file path (~/.waypoint/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".waypoint").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                workspace: PathBuf::from("~/.waypoint/workspace"),
                log_level: default_log_level(),
            },
            llm: LLMConfig::default(),
            agent: AgentConfig::default(),
            tools: ToolsConfig::default(),
        }
    }

    /// Overlay provider settings from the environment.
    ///
    /// `MODEL_TYPE` selects the provider (`AZURE_OPENAI` or `azure_openai`);
    /// the `AZURE_OPENAI_*` variables replace the `[llm.azure_openai]`
    /// values. Unset or empty variables leave the file's values alone.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = lookup(ENV_MODEL_TYPE) {
            self.llm.provider = provider.to_lowercase();
        }

        let azure = &mut self.llm.azure_openai;
        for (name, field) in [
            (ENV_AZURE_INSTANCE, &mut azure.instance_name),
            (ENV_AZURE_DEPLOYMENT, &mut azure.deployment_name),
            (ENV_AZURE_API_VERSION, &mut azure.api_version),
        ] {
            if let Some(value) = lookup(name) {
                debug!("{} overrides configured value", name);
                *field = value;
            }
        }
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates log level, provider and limits
    /// - Expands ~ in the workspace path
    /// - Canonicalizes the workspace, creating it if missing
    /// - Verifies workspace is a directory
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        if !VALID_LOG_LEVELS.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if !SUPPORTED_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid provider '{}'. Must be one of: {}",
                self.llm.provider,
                SUPPORTED_PROVIDERS.join(", ")
            )));
        }

        if self.llm.provider == "azure_openai"
            && self.llm.azure_openai.base_url.is_none()
            && (self.llm.azure_openai.instance_name.is_empty()
                || self.llm.azure_openai.deployment_name.is_empty())
        {
            return Err(EngineError::Config(
                "azure_openai requires instance_name and deployment_name".to_string(),
            ));
        }

        if self.llm.request_timeout_secs == 0 {
            return Err(EngineError::Config(
                "request_timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.agent.max_steps == 0 {
            return Err(EngineError::Config(
                "max_steps must be at least 1".to_string(),
            ));
        }

        if self.tools.command_timeout_secs == 0 {
            return Err(EngineError::Config(
                "command_timeout_secs must be at least 1".to_string(),
            ));
        }

        if self.tools.devops_timeout_secs == 0 {
            return Err(EngineError::Config(
                "devops_timeout_secs must be at least 1".to_string(),
            ));
        }

        self.core.workspace = expand_path(&self.core.workspace)?;
        self.core.workspace = canonicalize_or_create(&self.core.workspace)?;

        if !self.core.workspace.is_dir() {
            return Err(EngineError::Config(format!(
                "Workspace path is not a directory: {:?}",
                self.core.workspace
            )));
        }

        Ok(())
    }
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

/// Canonicalize path, creating it if it doesn't exist
fn canonicalize_or_create(path: &Path) -> Result<PathBuf, EngineError> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            EngineError::Config(format!("Failed to create directory {:?}: {}", path, e))
        })?;
    }

    path.canonicalize()
        .map_err(|e| EngineError::PathCanonicalization(path.to_path_buf(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.request_timeout_secs, 300);
        assert_eq!(config.agent.max_steps, 10);
        assert_eq!(config.tools.command_timeout_secs, 60);
        assert!(config.tools.filesystem);
        assert!(config.tools.pipeline);
        assert!(config.tools.git && config.tools.build && config.tools.notification);
        assert_eq!(config.tools.devops_timeout_secs, 30);
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let path = PathBuf::from("~/test");
        let expanded = expand_path(&path).unwrap();

        let home = dirs::home_dir().unwrap();
        assert_eq!(expanded, home.join("test"));
    }

    #[test]
    fn test_expand_path_without_tilde() {
        let path = PathBuf::from("/absolute/path");
        let expanded = expand_path(&path).unwrap();

        assert_eq!(expanded, path);
    }

    #[test]
    fn test_expand_path_tilde_only() {
        let expanded = expand_path(&PathBuf::from("~")).unwrap();
        assert_eq!(expanded, dirs::home_dir().unwrap());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.llm.provider, deserialized.llm.provider);
        assert_eq!(config.agent.max_steps, deserialized.agent.max_steps);
    }

    #[test]
    fn test_env_overrides_replace_azure_settings() {
        let vars: std::collections::HashMap<&str, &str> = [
            ("MODEL_TYPE", "AZURE_OPENAI"),
            ("AZURE_OPENAI_INSTANCE_NAME", "contoso"),
            ("AZURE_OPENAI_DEPLOYMENT_NAME", "planner-gpt4"),
            ("AZURE_OPENAI_API_VERSION", "2025-01-01-preview"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default_config();
        config.apply_env_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.llm.provider, "azure_openai");
        assert_eq!(config.llm.azure_openai.instance_name, "contoso");
        assert_eq!(config.llm.azure_openai.deployment_name, "planner-gpt4");
        assert_eq!(config.llm.azure_openai.api_version, "2025-01-01-preview");
    }

    #[test]
    fn test_env_overrides_keep_file_values_when_unset() {
        let mut config: Config = toml::from_str(
            "[core]\nworkspace = \"/tmp\"\n\n[llm]\nprovider = \"azure_openai\"\n\n[llm.azure_openai]\ninstance_name = \"fabrikam\"\ndeployment_name = \"gpt4o\"\n",
        )
        .unwrap();
        config.apply_env_overrides(|name| {
            (name == "AZURE_OPENAI_DEPLOYMENT_NAME").then(|| "gpt4o-mini".to_string())
        });

        assert_eq!(config.llm.provider, "azure_openai");
        assert_eq!(config.llm.azure_openai.instance_name, "fabrikam");
        assert_eq!(config.llm.azure_openai.deployment_name, "gpt4o-mini");
        assert_eq!(config.llm.azure_openai.api_version, "2024-02-15-preview");
    }

    #[test]
    fn test_minimal_toml_fills_defaults() {
        let config: Config = toml::from_str("[core]\nworkspace = \"/tmp\"\n").unwrap();
        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.ollama.base_url, "http://localhost:11434");
        assert_eq!(config.llm.openai.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.llm.azure_openai.api_key_env, "AZURE_OPENAI_API_KEY");
        assert_eq!(config.agent.max_steps, 10);
        assert!(config.tools.execute_command);
    }
}
