//! Configuration management for smellscope
//!
//! - `config`: the layered `AppConfig` (defaults, `smellscope.toml`, environment)
//! - `defaults`: the startup smell-defaults file read once at process start
//! - `logging`: tracing subscriber initialization

pub mod config;
pub mod defaults;
pub mod logging;

pub use config::{
    AnalyzerConfig, AppConfig, ConfigError, LogFormat, LoggingConfig, ServerConfig,
    SmellsConfig, WorkspaceConfig,
};
pub use defaults::{load_smell_defaults, DefaultsSource, LoadedDefaults};
