// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use super::{MappingProvider, ProviderError};
use crate::rules::MappingRule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CURRENT_RULE_CACHE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCacheFile {
    #[serde(default)]
    pub version: u32,
    pub saved_at: chrono::DateTime<chrono::Utc>,
    pub rules: Vec<MappingRule>,
}

/// Rules cached as JSON, e.g. a previously downloaded database view.
pub struct CachedRuleProvider {
    path: PathBuf,
    name: String,
    rules: Vec<MappingRule>,
    saved_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl CachedRuleProvider {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = format!("rule cache {}", path.display());
        Self {
            path,
            name,
            rules: Vec::new(),
            saved_at: None,
        }
    }

    pub fn default_path() -> PathBuf {
        crate::get_config_root().join("mapping_rules.json")
    }

    /// Timestamp of the cache content loaded by the last successful read.
    pub fn saved_at(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.saved_at
    }

    /// Writes `rules` to the cache file and makes them the current list.
    pub fn store(&mut self, rules: Vec<MappingRule>) -> Result<(), ProviderError> {
        let file = RuleCacheFile {
            version: CURRENT_RULE_CACHE_VERSION,
            saved_at: chrono::Utc::now(),
            rules,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        log::debug!(
            "[RuleCache] Stored {} rules in {:?}",
            file.rules.len(),
            self.path
        );

        self.saved_at = Some(file.saved_at);
        self.rules = file.rules;
        Ok(())
    }
}

impl MappingProvider for CachedRuleProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<usize, ProviderError> {
        if !self.path.exists() {
            return Err(ProviderError::NotFound(self.path.clone()));
        }
        let content = std::fs::read_to_string(&self.path)?;
        let file: RuleCacheFile = serde_json::from_str(&content)?;
        if file.version != CURRENT_RULE_CACHE_VERSION {
            return Err(ProviderError::Version {
                found: file.version,
                expected: CURRENT_RULE_CACHE_VERSION,
            });
        }

        log::info!(
            "[RuleCache] Read {} rules from {:?} (saved {})",
            file.rules.len(),
            self.path,
            file.saved_at
        );
        self.saved_at = Some(file.saved_at);
        self.rules = file.rules;
        Ok(self.rules.len())
    }

    fn mapping_list(&self) -> &[MappingRule] {
        &self.rules
    }
}
