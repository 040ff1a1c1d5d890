//! Tracing setup
//!
//! Output always goes to stderr: `smellscope analyze` owns stdout for its JSON
//! report. `RUST_LOG` directives take precedence over `logging.level`, and
//! `LOG_FORMAT=json|pretty` overrides `logging.format`.

use crate::{AppConfig, LogFormat};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Install the global subscriber for `config`
pub fn initialize(config: &AppConfig) {
    let level = config.logging.level.parse().unwrap_or(tracing::Level::INFO);
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let format = std::env::var("LOG_FORMAT")
        .ok()
        .and_then(|value| parse_format(&value))
        .unwrap_or_else(|| config.logging.format.clone());

    let output = fmt::layer().with_writer(std::io::stderr);
    let output = match format {
        LogFormat::Json => output.json().boxed(),
        LogFormat::Pretty => output.pretty().boxed(),
    };

    tracing_subscriber::registry().with(filter).with(output).init();
}

fn parse_format(value: &str) -> Option<LogFormat> {
    match value.to_ascii_lowercase().as_str() {
        "json" => Some(LogFormat::Json),
        "pretty" | "human" => Some(LogFormat::Pretty),
        _ => None,
    }
}

/// Span carrying the request id through staging, invocation, and reconciliation
pub fn request_span(request_id: &str) -> tracing::Span {
    tracing::info_span!("analysis_request", request_id = %request_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("JSON"), Some(LogFormat::Json));
        assert_eq!(parse_format("human"), Some(LogFormat::Pretty));
        assert_eq!(parse_format("xml"), None);
    }
}
