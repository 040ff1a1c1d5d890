//! CLI command handling for smellscope

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use smell_config::AppConfig;
use smell_foundation::{AnalysisRequest, ConfigOverrides, SourceFile};
use smell_pipeline::{AnalysisPipeline, SmellRegistry};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// The main CLI struct.
#[derive(Debug, Parser)]
#[command(name = "smellscope")]
#[command(about = "Detect code smells in submitted source files via an external analyzer")]
#[command(version)]
pub struct Cli {
    /// Configuration file (defaults to ./smellscope.toml or ./.smellscope/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to run; `serve` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// The available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to bind to (overrides configuration)
        #[arg(long)]
        port: Option<u16>,
        /// Host to bind to (overrides configuration)
        #[arg(long)]
        host: Option<String>,
    },
    /// Analyze local files once and print the JSON report
    Analyze {
        /// Files to analyze
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Only run these smell kinds (comma separated)
        #[arg(long, value_delimiter = ',')]
        only: Vec<String>,
        /// Skip these smell kinds (comma separated)
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
        /// Per-kind toggles, e.g. `--enable GodClass=false,MagicNumbers=true`
        #[arg(long, value_delimiter = ',', value_parser = parse_toggle)]
        enable: Vec<(String, bool)>,
    },
    /// Print the smell defaults in effect
    Smells,
}

/// Parse a `Kind=bool` toggle
fn parse_toggle(s: &str) -> Result<(String, bool), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KIND=true|false, got '{}'", s))?;
    let enabled = value
        .trim()
        .parse::<bool>()
        .map_err(|_| format!("invalid boolean '{}' for {}", value, name))?;
    Ok((name.trim().to_string(), enabled))
}

/// Dispatch a parsed command
pub async fn run(command: Commands, mut config: AppConfig) -> anyhow::Result<()> {
    match command {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            serve(config).await
        }
        Commands::Analyze {
            files,
            only,
            exclude,
            enable,
        } => {
            let request = build_request(&files, only, exclude, enable).await?;
            analyze(&config, request).await
        }
        Commands::Smells => {
            let registry = SmellRegistry::load(&config.smells.defaults_file);
            let snapshot = registry.snapshot();
            println!("{}", serde_json::to_string_pretty(&snapshot.config)?);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> anyhow::Result<()> {
    info!(
        host = %config.server.host,
        port = config.server.port,
        analyzer = ?config.analyzer.command,
        "Starting smellscope server"
    );
    let pipeline = AnalysisPipeline::from_config(&config)?;
    smell_transport::start_server(&config.server, pipeline).await?;
    Ok(())
}

async fn analyze(config: &AppConfig, request: AnalysisRequest) -> anyhow::Result<()> {
    let pipeline = AnalysisPipeline::from_config(config)?;
    match pipeline.run(request).await {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", serde_json::to_string_pretty(&e.to_body())?);
            bail!(e)
        }
    }
}

/// Read `paths` into a request, naming each file by its final path component
pub async fn build_request(
    paths: &[PathBuf],
    only: Vec<String>,
    exclude: Vec<String>,
    enable: Vec<(String, bool)>,
) -> anyhow::Result<AnalysisRequest> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        files.push(SourceFile::new(file_name(path)?, content));
    }

    let overrides = ConfigOverrides {
        enabled: (!enable.is_empty()).then(|| enable.into_iter().collect::<BTreeMap<_, _>>()),
        only: (!only.is_empty()).then_some(only),
        exclude: (!exclude.is_empty()).then_some(exclude),
    };

    Ok(AnalysisRequest {
        files,
        config: Some(overrides),
    })
}

fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("Not a file path: {}", path.display()))
}
