// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use crate::model::AircraftModel;
use crate::model_set::{ModelSet, ModelSetReport};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CURRENT_CACHE_VERSION: u32 = 1;

/// A model set as cached on disk by whatever scanned the simulator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSetCache {
    #[serde(default)]
    pub version: u32,
    pub saved_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub simulator: String,
    pub models: Vec<AircraftModel>,
}

impl Default for ModelSetCache {
    fn default() -> Self {
        Self {
            version: CURRENT_CACHE_VERSION,
            saved_at: chrono::Utc::now(),
            simulator: String::new(),
            models: Vec::new(),
        }
    }
}

impl ModelSetCache {
    pub fn new(simulator: &str, models: Vec<AircraftModel>) -> Self {
        Self {
            simulator: simulator.to_string(),
            models,
            ..Default::default()
        }
    }

    /// Loads a cache file. Missing, unreadable or outdated files give an empty cache.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match serde_json::from_str::<ModelSetCache>(&content) {
                    Ok(cache) if cache.version == CURRENT_CACHE_VERSION => {
                        log::debug!(
                            "[ModelSetCache] Loaded {} models from {:?}",
                            cache.models.len(),
                            path
                        );
                        return cache;
                    }
                    Ok(cache) => {
                        log::warn!(
                            "[ModelSetCache] Ignoring cache {:?} with version {} (expected {})",
                            path,
                            cache.version,
                            CURRENT_CACHE_VERSION
                        );
                    }
                    Err(e) => log::error!("[ModelSetCache] JSON parse error for {:?}: {}", path, e),
                },
                Err(e) => log::error!("[ModelSetCache] Failed to read {:?}: {}", path, e),
            }
        }
        Self::default()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> PathBuf {
        crate::get_config_root().join("model_set_cache.json")
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn to_model_set(&self) -> (ModelSet, ModelSetReport) {
        ModelSet::from_models(self.models.iter().cloned())
    }
}
