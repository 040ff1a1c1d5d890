//! Startup smell defaults
//!
//! The defaults file maps smell names to their default enabled state:
//!
//! ```yaml
//! LongMethod: true
//! MagicNumbers: false
//! ```
//!
//! Values are merged over the built-in registry defaults (every kind enabled).
//! A missing file, an unreadable file, or a parse failure falls back to the
//! built-ins; none of these are fatal.

use smell_foundation::{SmellConfig, SmellKind};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Where the effective defaults came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultsSource {
    /// Built-in registry defaults
    Builtin,
    /// Built-ins overridden by the given file
    File(PathBuf),
}

/// Result of loading the defaults file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedDefaults {
    pub config: SmellConfig,
    pub source: DefaultsSource,
    /// Keys in the file that are not registry kinds
    pub ignored_keys: Vec<String>,
}

impl LoadedDefaults {
    fn builtin() -> Self {
        Self {
            config: SmellConfig::builtin(),
            source: DefaultsSource::Builtin,
            ignored_keys: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
enum DefaultsError {
    #[error("failed to read: {0}")]
    Read(#[from] std::io::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Load the smell defaults file, falling back to built-ins on any problem.
pub fn load_smell_defaults(path: &Path) -> LoadedDefaults {
    if !path.exists() {
        info!(
            path = %path.display(),
            "No smell defaults file found, using built-in defaults"
        );
        return LoadedDefaults::builtin();
    }

    let overrides = match read_overrides(path) {
        Ok(Some(map)) => map,
        Ok(None) => {
            info!(path = %path.display(), "Smell defaults file is empty, using built-in defaults");
            return LoadedDefaults::builtin();
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Failed to load smell defaults file, using built-in defaults"
            );
            return LoadedDefaults::builtin();
        }
    };

    let mut config = SmellConfig::builtin();
    let mut ignored_keys = Vec::new();
    for (name, enabled) in overrides {
        match name.parse::<SmellKind>() {
            Ok(kind) => config.set(kind, enabled),
            Err(_) => ignored_keys.push(name),
        }
    }

    if !ignored_keys.is_empty() {
        warn!(
            path = %path.display(),
            ignored = ?ignored_keys,
            "Smell defaults file names unknown kinds; ignoring them"
        );
    }
    debug!(active = ?config.active(), "Loaded smell defaults");

    LoadedDefaults {
        config,
        source: DefaultsSource::File(path.to_path_buf()),
        ignored_keys,
    }
}

fn read_overrides(path: &Path) -> Result<Option<BTreeMap<String, bool>>, DefaultsError> {
    let content = std::fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

    if is_toml {
        if content.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(toml::from_str(&content)?))
    } else {
        // An empty YAML document deserializes to None
        Ok(serde_yaml::from_str::<Option<BTreeMap<String, bool>>>(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_builtin() {
        let dir = tempdir().unwrap();
        let loaded = load_smell_defaults(&dir.path().join("config.yaml"));
        assert_eq!(loaded.source, DefaultsSource::Builtin);
        assert_eq!(loaded.config, SmellConfig::builtin());
    }

    #[test]
    fn test_yaml_overrides_merge_over_builtin() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "MagicNumbers: false\nGodClass: false\nBogus: true\n").unwrap();

        let loaded = load_smell_defaults(&path);
        assert_eq!(loaded.source, DefaultsSource::File(path.clone()));
        assert_eq!(loaded.ignored_keys, vec!["Bogus".to_string()]);
        assert_eq!(
            loaded.config.active(),
            vec![
                SmellKind::LongMethod,
                SmellKind::DuplicatedCode,
                SmellKind::LargeParameterList,
                SmellKind::FeatureEnvy,
            ]
        );
    }

    #[test]
    fn test_toml_by_extension() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("smells.toml");
        std::fs::write(&path, "FeatureEnvy = false\n").unwrap();

        let loaded = load_smell_defaults(&path);
        assert!(!loaded.config.is_enabled(SmellKind::FeatureEnvy));
        assert!(loaded.config.is_enabled(SmellKind::LongMethod));
    }

    #[test]
    fn test_parse_failure_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "LongMethod: [not, a, bool]\n").unwrap();

        let loaded = load_smell_defaults(&path);
        assert_eq!(loaded.source, DefaultsSource::Builtin);
        assert_eq!(loaded.config, SmellConfig::builtin());
    }

    #[test]
    fn test_empty_yaml_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "").unwrap();

        let loaded = load_smell_defaults(&path);
        assert_eq!(loaded.source, DefaultsSource::Builtin);
    }
}
