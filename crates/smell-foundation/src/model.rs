//! Smell registry kinds and the enabled/disabled mapping over them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// One category of code-quality issue the analyzer can detect.
///
/// Variant declaration order is the registry enumeration order; `Ord` follows it,
/// so ordered collections keyed by `SmellKind` iterate in registry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SmellKind {
    LongMethod,
    GodClass,
    DuplicatedCode,
    LargeParameterList,
    MagicNumbers,
    FeatureEnvy,
}

impl SmellKind {
    /// Every known kind, in registry order.
    pub const ALL: [SmellKind; 6] = [
        SmellKind::LongMethod,
        SmellKind::GodClass,
        SmellKind::DuplicatedCode,
        SmellKind::LargeParameterList,
        SmellKind::MagicNumbers,
        SmellKind::FeatureEnvy,
    ];

    /// Wire name of the kind (identical to the variant name).
    pub fn as_str(self) -> &'static str {
        match self {
            SmellKind::LongMethod => "LongMethod",
            SmellKind::GodClass => "GodClass",
            SmellKind::DuplicatedCode => "DuplicatedCode",
            SmellKind::LargeParameterList => "LargeParameterList",
            SmellKind::MagicNumbers => "MagicNumbers",
            SmellKind::FeatureEnvy => "FeatureEnvy",
        }
    }
}

impl fmt::Display for SmellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a name does not belong to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown smell kind '{0}'")]
pub struct UnknownSmell(pub String);

impl FromStr for SmellKind {
    type Err = UnknownSmell;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SmellKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownSmell(s.to_string()))
    }
}

/// Enabled/disabled state for every registry kind.
///
/// The mapping is total: it can only be built from a full registry baseline and
/// only mutated per kind, so its keys are always exactly `SmellKind::ALL`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SmellConfig(BTreeMap<SmellKind, bool>);

impl SmellConfig {
    /// Every kind set to `enabled`.
    pub fn all(enabled: bool) -> Self {
        Self(SmellKind::ALL.into_iter().map(|k| (k, enabled)).collect())
    }

    /// Built-in registry defaults: every kind enabled.
    pub fn builtin() -> Self {
        Self::all(true)
    }

    pub fn is_enabled(&self, kind: SmellKind) -> bool {
        self.0.get(&kind).copied().unwrap_or(false)
    }

    pub fn set(&mut self, kind: SmellKind, enabled: bool) {
        self.0.insert(kind, enabled);
    }

    /// Kinds whose value is `true`, in registry order.
    pub fn active(&self) -> Vec<SmellKind> {
        self.0
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SmellKind, bool)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }
}

impl Default for SmellConfig {
    fn default() -> Self {
        Self::builtin()
    }
}
