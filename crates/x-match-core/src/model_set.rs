// SPDX-License-Identifier: MIT
// Copyright (c) 2020 Austin Goudge
// Copyright (c) 2026 StarTuz

use crate::model::{normalize_key, AircraftModel};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// What happened to the models handed to [`ModelSet::from_models`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelSetReport {
    pub accepted: usize,
    pub without_string: usize,
    pub excluded: Vec<String>,
    pub duplicates: Vec<String>,
}

impl ModelSetReport {
    pub fn removed_count(&self) -> usize {
        self.without_string + self.excluded.len() + self.duplicates.len()
    }

    pub(crate) fn log(&self) {
        if self.removed_count() > 0 {
            log::warn!(
                "[ModelSet] Removed models: without string {}, excluded {}, duplicates {}",
                self.without_string,
                self.excluded.len(),
                self.duplicates.len()
            );
        }
        if self.accepted == 0 {
            log::error!("[ModelSet] No models for matching, only the default model will be used");
        } else {
            log::info!("[ModelSet] {} models available for matching", self.accepted);
        }
    }
}

/// The installed models, unique by model string (case-insensitive).
///
/// Iteration order is the order the provider delivered the models in, which the
/// scoring tie-break relies on.
#[derive(Debug, Clone, Default)]
pub struct ModelSet {
    models: Vec<AircraftModel>,
    index: HashMap<String, usize>,
}

impl ModelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a clean set. Models without a model string, excluded models and
    /// case-insensitive duplicates are dropped; the first occurrence wins.
    pub fn from_models<I>(models: I) -> (Self, ModelSetReport)
    where
        I: IntoIterator<Item = AircraftModel>,
    {
        let mut set = ModelSet::new();
        let mut report = ModelSetReport::default();

        for model in models {
            if !model.has_model_string() {
                report.without_string += 1;
                continue;
            }
            if model.is_excluded() {
                report.excluded.push(model.model_string);
                continue;
            }
            let key = model.model_key();
            if set.index.contains_key(&key) {
                report.duplicates.push(model.model_string);
                continue;
            }
            set.index.insert(key, set.models.len());
            set.models.push(model);
        }

        report.accepted = set.models.len();
        (set, report)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn models(&self) -> &[AircraftModel] {
        &self.models
    }

    pub fn iter(&self) -> impl Iterator<Item = &AircraftModel> {
        self.models.iter()
    }

    pub fn find_by_model_string(&self, model_string: &str) -> Option<&AircraftModel> {
        self.index
            .get(&normalize_key(model_string))
            .map(|&idx| &self.models[idx])
    }

    pub fn contains_model_string(&self, model_string: &str) -> bool {
        self.index.contains_key(&normalize_key(model_string))
    }

    /// Model strings as stored, for [`crate::synchronizer::ModelSynchronizer`].
    pub fn model_names(&self) -> HashSet<String> {
        self.models.iter().map(|m| m.model_string.clone()).collect()
    }

    /// A copy of this set without the models whose [`AircraftModel::model_key`] is in `keys`.
    pub fn without_keys(&self, keys: &HashSet<String>) -> ModelSet {
        if keys.is_empty() {
            return self.clone();
        }
        let remaining = self
            .models
            .iter()
            .filter(|m| !keys.contains(&m.model_key()))
            .cloned();
        ModelSet::from_models(remaining).0
    }
}
