//! Configuration resolution.
//!
//! Precedence, applied in order:
//! 1. registry defaults
//! 2. `enabled` toggles (known kinds only)
//! 3. `only`, when non-empty, replaces everything: a kind is enabled iff listed
//! 4. otherwise `exclude` forces the listed known kinds off
//!
//! Names outside the registry are ignored here; `unknown_kinds` reports them so
//! callers can choose to reject the request instead.

use smell_foundation::{ConfigOverrides, SmellConfig, SmellKind};
use std::collections::BTreeSet;

/// Resolve the effective configuration. Pure and deterministic.
pub fn resolve(defaults: &SmellConfig, overrides: &ConfigOverrides) -> SmellConfig {
    let mut resolved = defaults.clone();

    if let Some(toggles) = overrides.enabled.as_ref() {
        for (name, enabled) in toggles {
            if let Ok(kind) = name.parse::<SmellKind>() {
                resolved.set(kind, *enabled);
            }
        }
    }

    let only = known(overrides.only.as_deref());
    if overrides.only.as_ref().is_some_and(|o| !o.is_empty()) {
        for kind in SmellKind::ALL {
            resolved.set(kind, only.contains(&kind));
        }
    } else {
        for kind in known(overrides.exclude.as_deref()) {
            resolved.set(kind, false);
        }
    }

    resolved
}

/// Names in any override list that are not registry kinds, sorted and deduplicated.
pub fn unknown_kinds(overrides: &ConfigOverrides) -> Vec<String> {
    let toggles = overrides.enabled.iter().flat_map(|t| t.keys());
    let lists = overrides
        .only
        .iter()
        .chain(overrides.exclude.iter())
        .flatten();

    toggles
        .chain(lists)
        .filter(|name| name.parse::<SmellKind>().is_err())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn known(names: Option<&[String]>) -> BTreeSet<SmellKind> {
    names
        .unwrap_or_default()
        .iter()
        .filter_map(|name| name.parse().ok())
        .collect()
}
