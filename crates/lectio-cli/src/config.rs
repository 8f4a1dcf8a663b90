//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use lectio_extractor::ExtractorConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub settings: Settings,

    /// Oracle provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Extraction pipeline tuning
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

/// Global CLI settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

/// Which oracle backend to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local Ollama server
    Ollama,
    /// Anthropic Messages API
    Anthropic,
}

/// Oracle provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Backend kind
    #[serde(default = "default_kind")]
    pub kind: ProviderKind,

    /// API endpoint; the provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Environment variable holding the API key (hosted providers only)
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Retry attempts per oracle call
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".lectio").join("config.toml"))
    }

    /// Load configuration from the default path or fall back to defaults.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load configuration from `path`, or defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.extractor.validate().map_err(CliError::Config)?;
        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, contents)?;
        Ok(())
    }
}

impl ProviderConfig {
    /// Apply command-line overrides.
    ///
    /// Switching provider kind drops the configured endpoint and model, which
    /// belong to the other backend.
    pub fn with_overrides(mut self, kind: Option<ProviderKind>, model: Option<String>) -> Self {
        if let Some(kind) = kind {
            if kind != self.kind {
                self.kind = kind;
                self.endpoint = None;
                self.model = default_model_for(kind);
            }
        }
        if let Some(model) = model {
            self.model = model;
        }
        self
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            endpoint: None,
            model: default_model(),
            api_key_env: default_api_key_env(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_model_for(kind: ProviderKind) -> String {
    match kind {
        ProviderKind::Ollama => "llama3.1".to_string(),
        ProviderKind::Anthropic => "claude-sonnet-4-5".to_string(),
    }
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

fn default_kind() -> ProviderKind {
    ProviderKind::Ollama
}

fn default_model() -> String {
    default_model_for(default_kind())
}

fn default_api_key_env() -> String {
    lectio_llm::anthropic::API_KEY_ENV.to_string()
}

fn default_max_retries() -> u32 {
    3
}
