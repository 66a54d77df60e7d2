// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::ops::{BitOr, BitOrAssign};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Enabled matching strategies. Serialized as the raw bit value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct MatchingMode(u8);

impl MatchingMode {
    pub const NONE: Self = Self(0);
    pub const EXACT_MATCH: Self = Self(1);
    pub const MODEL_MAPPING: Self = Self(1 << 1);
    pub const MODEL_MATCHING: Self = Self(1 << 2);
    pub const ALL_MODES: Self = Self(0b111);

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn from_bits_truncate(bits: u8) -> Self {
        Self(bits & Self::ALL_MODES.0)
    }

    pub fn contains(self, flag: MatchingMode) -> bool {
        flag.0 != 0 && self.0 & flag.0 == flag.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, flag: MatchingMode) {
        self.0 |= flag.0;
    }

    pub fn remove(&mut self, flag: MatchingMode) {
        self.0 &= !flag.0;
    }

    fn flag_names(self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.contains(Self::EXACT_MATCH) {
            names.push("exact");
        }
        if self.contains(Self::MODEL_MAPPING) {
            names.push("mapping");
        }
        if self.contains(Self::MODEL_MATCHING) {
            names.push("matching");
        }
        names
    }
}

impl Default for MatchingMode {
    fn default() -> Self {
        Self::ALL_MODES
    }
}

impl From<u8> for MatchingMode {
    fn from(bits: u8) -> Self {
        Self::from_bits_truncate(bits)
    }
}

impl From<MatchingMode> for u8 {
    fn from(mode: MatchingMode) -> Self {
        mode.0
    }
}

impl BitOr for MatchingMode {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for MatchingMode {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for MatchingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.flag_names().join(","))
        }
    }
}

impl fmt::Debug for MatchingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MatchingMode({})", self)
    }
}

impl FromStr for MatchingMode {
    type Err = anyhow::Error;

    /// `all`, `none`, or a comma separated list of `exact`, `mapping`, `matching`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "all" => return Ok(Self::ALL_MODES),
            "none" | "" => return Ok(Self::NONE),
            _ => {}
        }

        let mut mode = Self::NONE;
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match part {
                "exact" => mode |= Self::EXACT_MATCH,
                "mapping" => mode |= Self::MODEL_MAPPING,
                "matching" | "algorithmic" => mode |= Self::MODEL_MATCHING,
                other => bail!("Unknown matching mode '{}'", other),
            }
        }
        Ok(mode)
    }
}

pub const DEFAULT_MINIMUM_SCORE: u32 = 30;

/// Matcher configuration. Every field has a default so older files keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherSetup {
    pub mode: MatchingMode,
    /// Distributors to prefer when algorithmic scores tie, best first.
    pub distributor_preferences: Vec<String>,
    /// Candidates scoring below this are never picked by the algorithmic strategy.
    pub minimum_score: u32,
    /// Derive a missing airline designator from an airline style callsign.
    pub airline_from_callsign: bool,
    /// Drop models the simulator failed to render from the model set.
    pub remove_failed_models: bool,
}

impl Default for MatcherSetup {
    fn default() -> Self {
        Self {
            mode: MatchingMode::ALL_MODES,
            distributor_preferences: Vec::new(),
            minimum_score: DEFAULT_MINIMUM_SCORE,
            airline_from_callsign: true,
            remove_failed_models: true,
        }
    }
}

impl MatcherSetup {
    pub fn with_mode(mut self, mode: MatchingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_distributor_preferences(mut self, distributors: &[&str]) -> Self {
        self.distributor_preferences = distributors.iter().map(|d| d.to_string()).collect();
        self
    }
}

impl fmt::Display for MatcherSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mode: '{}' minimum score: {} preferred distributors: [{}] airline from callsign: {}",
            self.mode,
            self.minimum_score,
            self.distributor_preferences.join(", "),
            self.airline_from_callsign
        )
    }
}

/// Persists a [`MatcherSetup`] as JSON.
#[derive(Debug, Clone)]
pub struct SetupStore {
    config_path: PathBuf,
}

impl SetupStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// `matcher_setup.json` in the platform config directory.
    pub fn default_location() -> Self {
        Self::new(crate::get_config_root().join("matcher_setup.json"))
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> Result<MatcherSetup> {
        if !self.config_path.exists() {
            log::debug!(
                "[Setup] No setup file at {:?}, using defaults",
                self.config_path
            );
            return Ok(MatcherSetup::default());
        }

        let content =
            fs::read_to_string(&self.config_path).context("Failed to read matcher_setup.json")?;
        serde_json::from_str(&content).context("Failed to parse matcher_setup.json")
    }

    pub fn save(&self, setup: &MatcherSetup) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).context("Failed to create config directory")?;
            }
        }

        let content = serde_json::to_string_pretty(setup).context("Failed to serialize setup")?;
        fs::write(&self.config_path, content).context("Failed to write matcher_setup.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_mode_flags() {
        let mode = MatchingMode::EXACT_MATCH | MatchingMode::MODEL_MATCHING;
        assert!(mode.contains(MatchingMode::EXACT_MATCH));
        assert!(!mode.contains(MatchingMode::MODEL_MAPPING));
        assert!(!mode.contains(MatchingMode::NONE));
        assert_eq!(mode.to_string(), "exact,matching");
        assert_eq!(MatchingMode::default(), MatchingMode::ALL_MODES);

        let mut mode = MatchingMode::ALL_MODES;
        mode.remove(MatchingMode::MODEL_MAPPING);
        assert_eq!(mode, MatchingMode::EXACT_MATCH | MatchingMode::MODEL_MATCHING);
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(
            "all".parse::<MatchingMode>().unwrap(),
            MatchingMode::ALL_MODES
        );
        assert_eq!("none".parse::<MatchingMode>().unwrap(), MatchingMode::NONE);
        assert_eq!(
            "Exact, mapping".parse::<MatchingMode>().unwrap(),
            MatchingMode::EXACT_MATCH | MatchingMode::MODEL_MAPPING
        );
        assert!("exact,fuzzy".parse::<MatchingMode>().is_err());
    }

    #[test]
    fn test_mode_serializes_as_bits_and_truncates() {
        assert_eq!(serde_json::to_string(&MatchingMode::ALL_MODES).unwrap(), "7");
        let mode: MatchingMode = serde_json::from_str("255").unwrap();
        assert_eq!(mode, MatchingMode::ALL_MODES);
    }

    #[test]
    fn test_setup_roundtrip_and_defaults() -> Result<()> {
        let dir = tempdir()?;
        let store = SetupStore::new(dir.path().join("cfg").join("matcher_setup.json"));
        assert_eq!(store.load()?, MatcherSetup::default());

        let setup = MatcherSetup::default()
            .with_mode(MatchingMode::MODEL_MATCHING)
            .with_distributor_preferences(&["BlueBell", "WoA"]);
        store.save(&setup)?;
        assert_eq!(store.load()?, setup);
        Ok(())
    }

    #[test]
    fn test_partial_setup_file_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("matcher_setup.json");
        fs::write(&path, r#"{ "minimum_score": 60 }"#)?;

        let setup = SetupStore::new(&path).load()?;
        assert_eq!(setup.minimum_score, 60);
        assert_eq!(setup.mode, MatchingMode::ALL_MODES);
        assert!(setup.airline_from_callsign);
        Ok(())
    }
}
