//! Application configuration
//!
//! Configuration is loaded in the following priority order (highest to lowest):
//! 1. Environment variables (`SMELLSCOPE__SECTION__KEY`, e.g. `SMELLSCOPE__ANALYZER__TIMEOUT_MS=5000`)
//! 2. `PORT` (for parity with the web frontend's dev proxy)
//! 3. The configuration file: an explicit path, else `smellscope.toml`, else `.smellscope/config.toml`
//! 4. Default values
//!
//! # Configuration File Example
//!
//! ```toml
//! [server]
//! port = 5000
//!
//! [analyzer]
//! command = ["python3", "backend/code_smell_detector.py"]
//! timeout_ms = 20000
//!
//! [smells]
//! defaults_file = "config.yaml"
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration file names searched when no explicit path is given
const CONFIG_CANDIDATES: [&str; 2] = ["smellscope.toml", ".smellscope/config.toml"];

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// External analyzer process configuration
    pub analyzer: AnalyzerConfig,
    /// Per-request workspace configuration
    pub workspace: WorkspaceConfig,
    /// Smell registry defaults configuration
    pub smells: SmellsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server-specific configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Maximum accepted request body size in bytes
    pub max_body_bytes: usize,
}

/// External analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Program followed by leading arguments; staged file paths and the
    /// serialized smell config are appended at invocation time
    pub command: Vec<String>,
    /// Wall-clock limit for one analyzer run in milliseconds
    pub timeout_ms: u64,
    /// Upper bound on buffered analyzer stdout in bytes
    pub max_output_bytes: usize,
    /// Working directory for the analyzer (optional)
    pub working_dir: Option<PathBuf>,
}

/// Workspace staging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Root under which per-request workspaces are created
    /// (defaults to `<system temp>/smellscope`)
    pub scratch_root: Option<PathBuf>,
}

/// Smell registry defaults configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmellsConfig {
    /// Optional YAML/TOML file overriding the built-in enabled state per kind
    pub defaults_file: PathBuf,
    /// Reject request overrides naming kinds outside the registry
    pub reject_unknown: bool,
}

/// Log output format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format for development
    #[default]
    Pretty,
    /// Structured JSON format for production
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            max_body_bytes: 10 * 1024 * 1024, // 10 MB
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            command: vec!["python".to_string(), "code_smell_detector.py".to_string()],
            timeout_ms: 30000,
            max_output_bytes: 16 * 1024 * 1024, // 16 MB
            working_dir: None,
        }
    }
}

impl Default for SmellsConfig {
    fn default() -> Self {
        Self {
            defaults_file: PathBuf::from("config.yaml"),
            reject_unknown: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl WorkspaceConfig {
    /// Scratch root with the system temp fallback applied
    pub fn resolved_scratch_root(&self) -> PathBuf {
        self.scratch_root
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("smellscope"))
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Figment error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Figment(Box::new(err))
    }
}

impl AppConfig {
    /// Load configuration from defaults, the configuration file, and environment.
    ///
    /// An explicit `path` must exist; otherwise the first existing candidate
    /// (relative to the current directory) is used, if any.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Some(p.to_path_buf()),
            None => CONFIG_CANDIDATES
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists()),
        };

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));
        if let Some(file) = file.as_ref() {
            tracing::debug!(path = %file.display(), "Loading TOML configuration");
            figment = figment.merge(Toml::file(file));
        }

        let config: AppConfig = figment
            .merge(
                Env::raw()
                    .only(&["port"])
                    .map(|_| "server.port".into()),
            )
            .merge(Env::prefixed("SMELLSCOPE__").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::Invalid("Server port cannot be 0".into()));
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "Server body limit cannot be 0".into(),
            ));
        }

        if self.analyzer.command.is_empty() || self.analyzer.command[0].trim().is_empty() {
            return Err(ConfigError::Invalid(
                "Analyzer command cannot be empty".into(),
            ));
        }

        if self.analyzer.timeout_ms == 0 {
            return Err(ConfigError::Invalid("Analyzer timeout cannot be 0".into()));
        }

        if self.analyzer.max_output_bytes == 0 {
            return Err(ConfigError::Invalid(
                "Analyzer output limit cannot be 0".into(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level '{}', must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            )));
        }

        Ok(())
    }
}
