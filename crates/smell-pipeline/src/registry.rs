//! Process-wide smell defaults.
//!
//! The defaults are an immutable snapshot taken at startup. `reload` re-reads the
//! defaults file and swaps the snapshot atomically; requests already holding the
//! previous `Arc` keep resolving against it.

use smell_config::{load_smell_defaults, DefaultsSource, LoadedDefaults};
use smell_foundation::{SmellConfig, SmellKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tracing::info;

pub struct SmellRegistry {
    defaults_file: Option<PathBuf>,
    current: RwLock<Arc<LoadedDefaults>>,
}

impl SmellRegistry {
    /// Load defaults from `defaults_file`, falling back to built-ins.
    pub fn load(defaults_file: impl Into<PathBuf>) -> Self {
        let defaults_file = defaults_file.into();
        let loaded = load_smell_defaults(&defaults_file);
        info!(
            source = ?loaded.source,
            active = ?loaded.config.active(),
            "Smell registry initialized"
        );
        Self {
            defaults_file: Some(defaults_file),
            current: RwLock::new(Arc::new(loaded)),
        }
    }

    /// Fixed defaults with no backing file; `reload` keeps them unchanged.
    pub fn with_defaults(config: SmellConfig) -> Self {
        Self {
            defaults_file: None,
            current: RwLock::new(Arc::new(LoadedDefaults {
                config,
                source: DefaultsSource::Builtin,
                ignored_keys: Vec::new(),
            })),
        }
    }

    /// Every known kind, in registry order.
    pub fn kinds(&self) -> &'static [SmellKind] {
        &SmellKind::ALL
    }

    pub fn defaults_file(&self) -> Option<&Path> {
        self.defaults_file.as_deref()
    }

    /// Current defaults snapshot.
    pub fn snapshot(&self) -> Arc<LoadedDefaults> {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Re-read the defaults file and atomically replace the snapshot.
    pub fn reload(&self) -> Arc<LoadedDefaults> {
        let Some(path) = self.defaults_file.as_ref() else {
            return self.snapshot();
        };
        let loaded = Arc::new(load_smell_defaults(path));
        {
            let mut guard = match self.current.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *guard = loaded.clone();
        }
        info!(
            source = ?loaded.source,
            active = ?loaded.config.active(),
            "Smell defaults reloaded"
        );
        loaded
    }
}

impl Default for SmellRegistry {
    fn default() -> Self {
        Self::with_defaults(SmellConfig::builtin())
    }
}
